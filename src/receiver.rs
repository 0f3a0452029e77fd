// src/receiver.rs - UDP landmark listener feeding the frame buffer
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::buffer::LandmarkBuffer;
use crate::config::ListenerConfig;
use crate::landmarks;

// Pause after a socket error so a persistent failure doesn't spin the loop
const ERROR_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
pub struct ReceiverStats {
    pub packets: AtomicU64,
    pub accepted: AtomicU64,
    pub rejected: AtomicU64,
    pub transport_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub packets: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub transport_errors: u64,
}

impl ReceiverStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

pub struct ReceiverHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    buffer: LandmarkBuffer,
    stats: Arc<ReceiverStats>,
    task: JoinHandle<()>,
}

impl ReceiverHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the listener and wait for the socket to be released.
    /// Frames decoded after this point are never published.
    pub async fn shutdown(self) {
        self.buffer.close();
        if self.shutdown_tx.send(true).is_err() {
            tracing::debug!("Receiver task already finished");
        }
        match self.task.await {
            Ok(()) => tracing::info!("Landmark listener on {} closed", self.local_addr),
            Err(e) => tracing::warn!("Landmark listener did not shut down cleanly: {}", e),
        }
    }
}

/// Bind the listener and start receiving in the background.
pub async fn spawn(
    config: &ListenerConfig,
    buffer: LandmarkBuffer,
    verbose: bool,
) -> Result<ReceiverHandle> {
    let socket = UdpSocket::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind landmark listener on {}", config.bind_addr))?;
    let local_addr = socket.local_addr()?;
    tracing::info!("Listening for landmark packets on {}", local_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stats = Arc::new(ReceiverStats::default());
    let task = tokio::spawn(receive_loop(
        socket,
        buffer.clone(),
        Arc::clone(&stats),
        shutdown_rx,
        config.max_packet_size.max(1),
        verbose,
    ));

    Ok(ReceiverHandle {
        local_addr,
        shutdown_tx,
        buffer,
        stats,
        task,
    })
}

async fn receive_loop(
    socket: UdpSocket,
    buffer: LandmarkBuffer,
    stats: Arc<ReceiverStats>,
    mut shutdown_rx: watch::Receiver<bool>,
    max_packet_size: usize,
    verbose: bool,
) {
    let mut buf = vec![0u8; max_packet_size];

    loop {
        let received = tokio::select! {
            changed = shutdown_rx.changed() => {
                // Sender dropped counts as shutdown too
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
            received = socket.recv_from(&mut buf) => received,
        };

        let (len, from) = match received {
            Ok(r) => r,
            Err(e) => {
                stats.transport_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Landmark receive failed: {}", e);
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        };
        stats.packets.fetch_add(1, Ordering::Relaxed);

        match landmarks::decode(&buf[..len]) {
            Ok(frame) => {
                if buffer.publish(frame).is_some() {
                    stats.accepted.fetch_add(1, Ordering::Relaxed);
                    if verbose {
                        tracing::debug!("Frame from {} ({} bytes)", from, len);
                    }
                } else {
                    tracing::debug!("Dropping frame from {} received during shutdown", from);
                }
            }
            Err(e) => {
                stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Rejected {} byte packet from {}: {}", len, from, e);
            }
        }
    }
    // socket dropped here
}
