// src/bin/landmark_replay.rs - Sends a synthetic opening/closing hand over UDP
//
// Usage: landmark_replay [target_addr] [fps] [seconds]
use anyhow::{Context, Result};
use nalgebra::Vector3;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use hand_retarget::landmarks::{self, LandmarkFrame, LANDMARK_COUNT};

const DEFAULT_TARGET: &str = "127.0.0.1:6000";
const DEPTH_GAIN: f64 = 12.0;
const FINGERTIP_DEPTH_BOOST: f64 = 2.0;
const FINGERTIPS: [usize; 5] = [4, 8, 12, 16, 20];

/// Knuckle x offset from the wrist for thumb..pinky (normalized image coords)
const FINGER_X: [f64; 5] = [-0.09, -0.05, -0.01, 0.03, 0.07];

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let target = args.next().unwrap_or_else(|| DEFAULT_TARGET.to_string());
    let fps: f64 = match args.next() {
        Some(s) => s.parse().context("fps must be a number")?,
        None => 30.0,
    };
    let seconds: f64 = match args.next() {
        Some(s) => s.parse().context("seconds must be a number")?,
        None => 10.0,
    };
    if !(fps > 0.0) {
        anyhow::bail!("fps must be positive");
    }

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    tracing::info!("Sending synthetic landmarks to {} at {} fps for {}s", target, fps, seconds);

    let frame_duration = Duration::from_secs_f64(1.0 / fps);
    let start = Instant::now();
    let mut sent = 0u64;

    while start.elapsed().as_secs_f64() < seconds {
        let t = start.elapsed().as_secs_f64();
        let curl = 0.5 - 0.5 * (t * std::f64::consts::PI * 0.5).cos();

        let raw = synthetic_hand(curl, t);
        let frame = LandmarkFrame::new(preprocess_depth(&raw));
        let payload = landmarks::encode(&frame)?;

        if let Err(e) = socket.send_to(&payload, &target) {
            tracing::warn!("Send error: {}", e);
        } else {
            sent += 1;
        }

        std::thread::sleep(frame_duration);
    }

    tracing::info!("Sent {} frames", sent);
    Ok(())
}

/// Raw tracker-style landmarks: image x/y in [0, 1], z relative depth (smaller is closer).
fn synthetic_hand(curl: f64, t: f64) -> [Vector3<f64>; LANDMARK_COUNT] {
    let mut points = [Vector3::zeros(); LANDMARK_COUNT];
    let sway = 0.05 * (t * 0.7).sin();
    let wrist = Vector3::new(0.5 + sway, 0.8, 0.0);
    points[0] = wrist;

    for (finger, &x) in FINGER_X.iter().enumerate() {
        let start = 1 + finger * 4;
        let reach = if finger == 0 { 0.05 } else { 0.06 };
        for k in 0..4 {
            let straight_y = wrist.y - 0.12 - reach * k as f64;
            // Curling pulls joints back down and toward the camera
            let y = straight_y + curl * 0.03 * (k * k) as f64;
            let z = -curl * 0.0015 * k as f64;
            points[start + k] = Vector3::new(wrist.x + x * (1.0 + 0.1 * k as f64), y, z);
        }
    }
    points
}

/// Depth relative to the wrist, amplified, with extra weight on fingertips.
fn preprocess_depth(raw: &[Vector3<f64>; LANDMARK_COUNT]) -> [Vector3<f64>; LANDMARK_COUNT] {
    let wrist_z = raw[0].z;
    let mut out = *raw;
    for (i, p) in out.iter_mut().enumerate() {
        let mut depth = -(raw[i].z - wrist_z) * DEPTH_GAIN;
        if i > 0 && FINGERTIPS.contains(&i) {
            depth *= FINGERTIP_DEPTH_BOOST;
        }
        p.z = depth;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_depth_relative_to_wrist() {
        let mut raw = [Vector3::zeros(); LANDMARK_COUNT];
        raw[0].z = 0.1;
        raw[3].z = 0.05;
        raw[4].z = 0.05;
        let out = preprocess_depth(&raw);
        assert_eq!(out[0].z, 0.0);
        assert!((out[3].z - 0.6).abs() < 1e-12);
        assert!((out[4].z - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_open_hand_is_flat() {
        let raw = synthetic_hand(0.0, 0.0);
        assert!(raw.iter().all(|p| p.z == 0.0));
    }
}
