// src/config.rs
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// A finger has four landmarks, so at most three consecutive pairs drive its joints.
pub const MAX_JOINTS_PER_FINGER: usize = 3;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub retarget: RetargetConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    /// Address the UDP listener binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Receive buffer size in bytes
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetargetConfig {
    /// Uniform scale applied to the wrist landmark to get the wrist position
    #[serde(default = "default_movement_scale")]
    pub movement_scale: f64,
    /// Base blend rate in 1/seconds
    #[serde(default = "default_rotation_smoothing_rate")]
    pub rotation_smoothing_rate: f64,
    #[serde(default = "default_wrist_smoothing_multiplier")]
    pub wrist_smoothing_multiplier: f64,
    #[serde(default = "default_curl_smoothing_multiplier")]
    pub curl_smoothing_multiplier: f64,
    /// Fraction of the base rate used while easing back to rest
    #[serde(default = "default_recovery_rate_factor")]
    pub recovery_rate_factor: f64,
    #[serde(default = "default_curl_sensitivity")]
    pub curl_sensitivity: f64,
    #[serde(default)]
    pub invert_thumb: bool,
    #[serde(default)]
    pub invert_fingers: bool,
    /// Joint count used to index recorded rest rotations
    #[serde(default = "default_joints_per_finger")]
    pub joints_per_finger: usize,
    #[serde(default)]
    pub curl: CurlProfile,
}

/// Empirically tuned curl constants, indexed by joint slot (base, middle, tip).
#[derive(Debug, Clone, Deserialize)]
pub struct CurlProfile {
    #[serde(default = "default_joint_scale")]
    pub joint_scale: [f64; 3],
    /// Maximum bend of the non-thumb fingers around their hinge axis
    #[serde(default = "default_finger_max_angle_deg")]
    pub finger_max_angle_deg: [f64; 3],
    /// Thumb per-axis coefficients (x, y, z) in degrees at full bend
    #[serde(default = "default_thumb_base_deg")]
    pub thumb_base_deg: [f64; 3],
    #[serde(default = "default_thumb_middle_deg")]
    pub thumb_middle_deg: [f64; 3],
    #[serde(default = "default_thumb_tip_deg")]
    pub thumb_tip_deg: [f64; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityConfig {
    /// Seconds without a valid frame before the hand counts as lost
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Debug-level logging and per-packet diagnostics
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: f64,
}

fn default_bind_addr() -> String { "0.0.0.0:6000".to_string() }
fn default_max_packet_size() -> usize { 65507 }
fn default_movement_scale() -> f64 { 1.0 }
fn default_rotation_smoothing_rate() -> f64 { 10.0 }
fn default_wrist_smoothing_multiplier() -> f64 { 1.0 }
fn default_curl_smoothing_multiplier() -> f64 { 1.5 }
fn default_recovery_rate_factor() -> f64 { 0.5 }
fn default_curl_sensitivity() -> f64 { 45.0 }
fn default_joints_per_finger() -> usize { 3 }
fn default_joint_scale() -> [f64; 3] { [1.0, 0.85, 0.7] }
fn default_finger_max_angle_deg() -> [f64; 3] { [70.0, 100.0, 80.0] }
fn default_thumb_base_deg() -> [f64; 3] { [20.0, 25.0, 45.0] }
fn default_thumb_middle_deg() -> [f64; 3] { [0.0, 10.0, 50.0] }
fn default_thumb_tip_deg() -> [f64; 3] { [0.0, 0.0, 60.0] }
fn default_timeout_secs() -> f64 { 0.5 }
fn default_tick_hz() -> u32 { 60 }
fn default_status_interval_secs() -> f64 { 1.0 }

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_packet_size: default_max_packet_size(),
        }
    }
}

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            movement_scale: default_movement_scale(),
            rotation_smoothing_rate: default_rotation_smoothing_rate(),
            wrist_smoothing_multiplier: default_wrist_smoothing_multiplier(),
            curl_smoothing_multiplier: default_curl_smoothing_multiplier(),
            recovery_rate_factor: default_recovery_rate_factor(),
            curl_sensitivity: default_curl_sensitivity(),
            invert_thumb: false,
            invert_fingers: false,
            joints_per_finger: default_joints_per_finger(),
            curl: CurlProfile::default(),
        }
    }
}

impl Default for CurlProfile {
    fn default() -> Self {
        Self {
            joint_scale: default_joint_scale(),
            finger_max_angle_deg: default_finger_max_angle_deg(),
            thumb_base_deg: default_thumb_base_deg(),
            thumb_middle_deg: default_thumb_middle_deg(),
            thumb_tip_deg: default_thumb_tip_deg(),
        }
    }
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            verbose: false,
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Missing file means defaults; a file that exists but is broken is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retarget.validate()?;
        check_scalar("visibility.timeout_secs", self.visibility.timeout_secs)?;
        check_scalar("app.status_interval_secs", self.app.status_interval_secs)?;
        if self.app.tick_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        Ok(())
    }
}

impl RetargetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("retarget.movement_scale", self.movement_scale),
            ("retarget.rotation_smoothing_rate", self.rotation_smoothing_rate),
            ("retarget.wrist_smoothing_multiplier", self.wrist_smoothing_multiplier),
            ("retarget.curl_smoothing_multiplier", self.curl_smoothing_multiplier),
            ("retarget.recovery_rate_factor", self.recovery_rate_factor),
            ("retarget.curl_sensitivity", self.curl_sensitivity),
        ];
        for (field, value) in scalars {
            check_scalar(field, value)?;
        }

        if self.joints_per_finger == 0 || self.joints_per_finger > MAX_JOINTS_PER_FINGER {
            return Err(ConfigError::JointsPerFinger {
                value: self.joints_per_finger,
                max: MAX_JOINTS_PER_FINGER,
            });
        }

        let curl = &self.curl;
        for value in curl.joint_scale {
            check_scalar("retarget.curl.joint_scale", value)?;
        }
        // Angles may be negative to flip a bend direction, but must be finite
        let angles = curl.finger_max_angle_deg.iter()
            .chain(curl.thumb_base_deg.iter())
            .chain(curl.thumb_middle_deg.iter())
            .chain(curl.thumb_tip_deg.iter());
        for &value in angles {
            if !value.is_finite() {
                return Err(ConfigError::InvalidScalar { field: "retarget.curl", value });
            }
        }
        Ok(())
    }
}

fn check_scalar(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidScalar { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retarget.joints_per_finger, 3);
        assert_eq!(config.visibility.timeout_secs, 0.5);
        assert_eq!(config.listener.bind_addr, "0.0.0.0:6000");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
            [retarget]
            curl_sensitivity = 30.0
            invert_thumb = true

            [retarget.curl]
            finger_max_angle_deg = [60.0, 90.0, 45.0]

            [app]
            verbose = true
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.retarget.curl_sensitivity, 30.0);
        assert!(config.retarget.invert_thumb);
        assert!(!config.retarget.invert_fingers);
        assert_eq!(config.retarget.curl.finger_max_angle_deg, [60.0, 90.0, 45.0]);
        assert_eq!(config.retarget.curl.joint_scale, default_joint_scale());
        assert_eq!(config.retarget.rotation_smoothing_rate, 10.0);
        assert!(config.app.verbose);
        assert_eq!(config.app.tick_hz, 60);
    }

    #[test]
    fn test_rejects_too_many_joints() {
        let mut config = Config::default();
        config.retarget.joints_per_finger = 4;
        assert_eq!(
            config.validate(),
            Err(ConfigError::JointsPerFinger { value: 4, max: 3 })
        );
    }

    #[test]
    fn test_rejects_negative_rate() {
        let mut config = Config::default();
        config.retarget.rotation_smoothing_rate = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScalar { field: "retarget.rotation_smoothing_rate", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let mut config = Config::default();
        config.app.tick_hz = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickRate));
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/hand_retarget.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.retarget.curl.thumb_tip_deg, [0.0, 0.0, 60.0]);
        assert_eq!(config.app.tick_hz, 60);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_or_default("/definitely/not/here/hand_retarget.toml").unwrap();
        assert_eq!(config.retarget.curl_sensitivity, 45.0);
    }
}
