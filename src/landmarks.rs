// src/landmarks.rs - Landmark frames and the JSON wire format
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

pub const LANDMARK_COUNT: usize = 21;

// MediaPipe hand landmark indices, base to tip within each finger
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const INDEX_MCP: usize = 5;
pub const MIDDLE_MCP: usize = 9;
pub const RING_MCP: usize = 13;
pub const PINKY_MCP: usize = 17;

/// One complete tracker sample. Only ever built with all 21 points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkFrame {
    points: [Vector3<f64>; LANDMARK_COUNT],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WirePacket {
    pub landmark: Vec<WirePoint>,
}

impl LandmarkFrame {
    pub fn new(points: [Vector3<f64>; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Partial frames are rejected rather than padded.
    pub fn from_slice(points: &[Vector3<f64>]) -> Result<Self, DecodeError> {
        if points.len() != LANDMARK_COUNT {
            return Err(DecodeError::PointCount {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(DecodeError::NonFinite { index });
        }

        let mut out = [Vector3::zeros(); LANDMARK_COUNT];
        out.copy_from_slice(points);
        Ok(Self { points: out })
    }

    pub fn point(&self, index: usize) -> Vector3<f64> {
        self.points[index]
    }

    pub fn wrist(&self) -> Vector3<f64> {
        self.points[WRIST]
    }

    pub fn to_packet(&self) -> WirePacket {
        WirePacket {
            landmark: self.points.iter()
                .map(|p| WirePoint { x: p.x, y: p.y, z: p.z })
                .collect(),
        }
    }
}

/// Parse a UDP payload of the form `{"landmark":[{"x":..,"y":..,"z":..}, ...]}`.
pub fn decode(bytes: &[u8]) -> Result<LandmarkFrame, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    let packet: WirePacket = serde_json::from_str(text)?;

    let points: Vec<Vector3<f64>> = packet.landmark.iter()
        .map(|p| Vector3::new(p.x, p.y, p.z))
        .collect();

    LandmarkFrame::from_slice(&points)
}

pub fn encode(frame: &LandmarkFrame) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&frame.to_packet())
}
