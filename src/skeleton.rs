// src/skeleton.rs - Hand joint hierarchy, host rig boundary and rest pose capture
use nalgebra::{UnitQuaternion, Vector3};

use crate::landmarks::{INDEX_MCP, MIDDLE_MCP, PINKY_MCP, RING_MCP, THUMB_CMC};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn index(self) -> usize {
        match self {
            Finger::Thumb => 0,
            Finger::Index => 1,
            Finger::Middle => 2,
            Finger::Ring => 3,
            Finger::Pinky => 4,
        }
    }

    /// Landmark index of the finger's base point.
    pub fn landmark_start(self) -> usize {
        match self {
            Finger::Thumb => THUMB_CMC,
            Finger::Index => INDEX_MCP,
            Finger::Middle => MIDDLE_MCP,
            Finger::Ring => RING_MCP,
            Finger::Pinky => PINKY_MCP,
        }
    }

    pub fn is_thumb(self) -> bool {
        self == Finger::Thumb
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

/// Host-side skeleton. Joints within a chain are ordered base to tip.
pub trait HandRig {
    fn chain_len(&self, finger: Finger) -> usize;
    fn local_rotation(&self, finger: Finger, joint: usize) -> Option<UnitQuaternion<f64>>;
    fn set_local_rotation(&mut self, finger: Finger, joint: usize, rotation: UnitQuaternion<f64>);

    fn wrist_position(&self) -> Vector3<f64>;
    fn set_wrist_position(&mut self, position: Vector3<f64>);
    fn wrist_rotation(&self) -> UnitQuaternion<f64>;
    fn set_wrist_rotation(&mut self, rotation: UnitQuaternion<f64>);
}

#[derive(Debug, Clone)]
pub struct Wrist {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

/// In-memory rig: a wrist plus five chains of local rotations.
#[derive(Debug, Clone)]
pub struct HandSkeleton {
    pub wrist: Wrist,
    chains: [Vec<UnitQuaternion<f64>>; 5],
}

impl HandSkeleton {
    /// Every joint starts at identity.
    pub fn new(joints_per_finger: usize) -> Self {
        Self {
            wrist: Wrist {
                position: Vector3::zeros(),
                rotation: UnitQuaternion::identity(),
            },
            chains: std::array::from_fn(|_| vec![UnitQuaternion::identity(); joints_per_finger]),
        }
    }

    /// A relaxed hand: fingers slightly flexed, thumb rolled towards the palm.
    pub fn relaxed(joints_per_finger: usize) -> Self {
        let mut skeleton = Self::new(joints_per_finger);
        for finger in Finger::ALL {
            let chain = &mut skeleton.chains[finger.index()];
            for (i, joint) in chain.iter_mut().enumerate() {
                *joint = if finger.is_thumb() {
                    UnitQuaternion::from_euler_angles(0.0, 0.15, 0.3 - 0.1 * i as f64)
                } else {
                    UnitQuaternion::from_euler_angles(0.1 + 0.05 * i as f64, 0.0, 0.0)
                };
            }
        }
        skeleton
    }

    /// Chains with explicit per-finger lengths, for rigs that differ from the config.
    pub fn with_chain_lengths(lengths: [usize; 5]) -> Self {
        let mut skeleton = Self::new(0);
        for (chain, len) in skeleton.chains.iter_mut().zip(lengths) {
            *chain = vec![UnitQuaternion::identity(); len];
        }
        skeleton
    }

    pub fn chain(&self, finger: Finger) -> &[UnitQuaternion<f64>] {
        &self.chains[finger.index()]
    }
}

impl HandRig for HandSkeleton {
    fn chain_len(&self, finger: Finger) -> usize {
        self.chains[finger.index()].len()
    }

    fn local_rotation(&self, finger: Finger, joint: usize) -> Option<UnitQuaternion<f64>> {
        self.chains[finger.index()].get(joint).copied()
    }

    fn set_local_rotation(&mut self, finger: Finger, joint: usize, rotation: UnitQuaternion<f64>) {
        if let Some(slot) = self.chains[finger.index()].get_mut(joint) {
            *slot = rotation;
        }
    }

    fn wrist_position(&self) -> Vector3<f64> {
        self.wrist.position
    }

    fn set_wrist_position(&mut self, position: Vector3<f64>) {
        self.wrist.position = position;
    }

    fn wrist_rotation(&self) -> UnitQuaternion<f64> {
        self.wrist.rotation
    }

    fn set_wrist_rotation(&mut self, rotation: UnitQuaternion<f64>) {
        self.wrist.rotation = rotation;
    }
}

/// Rest rotations recorded once at startup, laid out as
/// `finger.index() * joints_per_finger + joint`.
#[derive(Debug, Clone)]
pub struct RestPose {
    joints_per_finger: usize,
    rotations: Vec<Option<UnitQuaternion<f64>>>,
}

impl RestPose {
    pub fn capture<R: HandRig + ?Sized>(rig: &R, joints_per_finger: usize) -> Self {
        let mut rotations = Vec::with_capacity(Finger::ALL.len() * joints_per_finger);
        for finger in Finger::ALL {
            for joint in 0..joints_per_finger {
                rotations.push(rig.local_rotation(finger, joint));
            }
        }

        let pose = Self { joints_per_finger, rotations };
        for finger in Finger::ALL {
            let chain_len = rig.chain_len(finger);
            if chain_len != joints_per_finger {
                tracing::warn!(
                    "Rig {} chain has {} joints but {} rest slots are configured",
                    finger.name(),
                    chain_len,
                    joints_per_finger
                );
            }
        }
        pose
    }

    pub fn joints_per_finger(&self) -> usize {
        self.joints_per_finger
    }

    /// `None` when the joint falls outside the recorded slots.
    pub fn get(&self, finger: Finger, joint: usize) -> Option<UnitQuaternion<f64>> {
        if joint >= self.joints_per_finger {
            return None;
        }
        self.rotations
            .get(finger.index() * self.joints_per_finger + joint)
            .copied()
            .flatten()
    }
}
