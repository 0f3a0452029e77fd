// src/main.rs
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::Level;

use hand_retarget::config::Config;
use hand_retarget::receiver;
use hand_retarget::{HandRig, HandSkeleton, LandmarkBuffer, RetargetEngine, VisibilityState};

const DEFAULT_CONFIG_PATH: &str = "hand_retarget.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Logging needs the verbose flag, so read the config before installing the subscriber
    let config = Config::load_or_default(&config_path);
    let verbose = config.as_ref().map(|c| c.app.verbose).unwrap_or(false);
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .init();
    let config = config?;
    if std::path::Path::new(&config_path).exists() {
        tracing::info!("Loaded config from {}", config_path);
    } else {
        tracing::info!("No config at {}, using defaults", config_path);
    }

    tracing::info!(
        "Config: scale={}, smoothing={}/s, curl_sensitivity={}, invert thumb={} fingers={}, timeout={}s",
        config.retarget.movement_scale,
        config.retarget.rotation_smoothing_rate,
        config.retarget.curl_sensitivity,
        config.retarget.invert_thumb,
        config.retarget.invert_fingers,
        config.visibility.timeout_secs
    );

    let buffer = LandmarkBuffer::new();
    let listener = receiver::spawn(&config.listener, buffer.clone(), config.app.verbose).await?;

    let mut skeleton = HandSkeleton::relaxed(config.retarget.joints_per_finger);
    let mut engine = RetargetEngine::new(&config.retarget, config.visibility.timeout_secs, &skeleton);

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / config.app.tick_hz as f64));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let status_interval = Duration::from_secs_f64(config.app.status_interval_secs);
    let mut last_tick = Instant::now();
    let mut last_status = Instant::now();
    let mut last_state = engine.state();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Shutting down...");
                break;
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                let state = engine.tick(&config.retarget, &buffer, &mut skeleton, dt);
                if state != last_state {
                    tracing::debug!("Visibility {:?} -> {:?}", last_state, state);
                    last_state = state;
                }

                if now.duration_since(last_status) >= status_interval {
                    last_status = now;
                    let frame_age = buffer.latest().map(|latest| now.saturating_duration_since(latest.received_at));
                    tracing::info!("{}", status_line(&skeleton, state, frame_age, &listener.stats()));
                }
            }
        }
    }

    listener.shutdown().await;
    Ok(())
}

fn status_line(
    skeleton: &HandSkeleton,
    state: VisibilityState,
    frame_age: Option<Duration>,
    stats: &receiver::StatsSnapshot,
) -> String {
    let p = skeleton.wrist_position();
    let (roll, pitch, yaw) = skeleton.wrist_rotation().euler_angles();
    let age = match frame_age {
        Some(age) => format!("{:.0}ms", age.as_secs_f64() * 1000.0),
        None => "never".to_string(),
    };
    format!(
        "{:?} | wrist pos ({:.3}, {:.3}, {:.3}) rot ({:.1}, {:.1}, {:.1})° | last frame {} | packets {} ok {} rejected {} transport errors {}",
        state,
        p.x,
        p.y,
        p.z,
        roll.to_degrees(),
        pitch.to_degrees(),
        yaw.to_degrees(),
        age,
        stats.packets,
        stats.accepted,
        stats.rejected,
        stats.transport_errors
    )
}
