// src/retarget.rs - Landmark to joint rotation retargeting, plus rest pose recovery
use nalgebra::{UnitQuaternion, Vector3};
use std::collections::HashSet;

use crate::buffer::LandmarkBuffer;
use crate::config::{CurlProfile, RetargetConfig, MAX_JOINTS_PER_FINGER};
use crate::landmarks::{LandmarkFrame, INDEX_MCP, MIDDLE_MCP, PINKY_MCP, WRIST};
use crate::skeleton::{Finger, HandRig, RestPose};
use crate::visibility::{VisibilityState, VisibilityTracker};

const DEGENERATE_EPSILON: f64 = 1e-9;

/// Spherical blend from `current` toward `target`. The factor is clamped to [0, 1];
/// the end points are returned exactly rather than through the slerp formula.
pub fn blend(
    current: &UnitQuaternion<f64>,
    target: &UnitQuaternion<f64>,
    factor: f64,
) -> UnitQuaternion<f64> {
    let t = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
    if t <= 0.0 {
        return *current;
    }
    if t >= 1.0 {
        return *target;
    }
    // try_slerp only fails when both are (numerically) the same rotation
    current.try_slerp(target, t, DEGENERATE_EPSILON).unwrap_or(*target)
}

/// Frame-rate independent blend factor, clamped to [0, 1].
fn smoothing_factor(rate: f64, delta_time: f64) -> f64 {
    let factor = rate * delta_time;
    if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) }
}

pub fn wrist_target_position(frame: &LandmarkFrame, movement_scale: f64) -> Vector3<f64> {
    frame.point(WRIST) * movement_scale
}

/// Direction from the wrist to the middle finger base.
pub fn palm_forward(frame: &LandmarkFrame) -> Option<Vector3<f64>> {
    (frame.point(MIDDLE_MCP) - frame.point(WRIST)).try_normalize(DEGENERATE_EPSILON)
}

/// Palm normal from the index-to-pinky knuckle line crossed with the forward
/// direction. Operand order fixes handedness.
pub fn palm_up(frame: &LandmarkFrame, forward: &Vector3<f64>) -> Option<Vector3<f64>> {
    let across = frame.point(INDEX_MCP) - frame.point(PINKY_MCP);
    across.cross(forward).try_normalize(DEGENERATE_EPSILON)
}

/// Look-at orientation whose +Z is the palm forward and +Y the palm up.
pub fn wrist_target_rotation(frame: &LandmarkFrame) -> Option<UnitQuaternion<f64>> {
    let forward = palm_forward(frame)?;
    let up = palm_up(frame, &forward)?;
    Some(UnitQuaternion::face_towards(&forward, &up))
}

/// Depth change across the `joint`-th landmark pair of a finger.
pub fn depth_delta(frame: &LandmarkFrame, finger: Finger, joint: usize) -> f64 {
    let start = finger.landmark_start();
    frame.point(start + joint + 1).z - frame.point(start + joint).z
}

/// Curl amount in [0, 1] from a depth change. The magnitude is taken after the
/// optional negation, so `invert` never changes the result; inversion reaches the
/// rig through the `direction` passed to [`bend_rotation`].
pub fn bend_factor(depth_delta: f64, sensitivity: f64, invert: bool) -> f64 {
    let delta = if invert { -depth_delta } else { depth_delta };
    (delta.abs() * sensitivity).clamp(0.0, 1.0)
}

/// Joint slot for the per-joint constants: 0 base, 1 middle, 2 tip.
fn joint_slot(joint: usize) -> usize {
    joint.min(MAX_JOINTS_PER_FINGER - 1)
}

/// Bend rotation relative to rest for one joint. `bend` is already scaled by the
/// joint weight; `direction` is +1 or -1.
pub fn bend_rotation(
    profile: &CurlProfile,
    finger: Finger,
    joint: usize,
    bend: f64,
    direction: f64,
) -> UnitQuaternion<f64> {
    let slot = joint_slot(joint);
    let amount = bend * direction;

    if finger.is_thumb() {
        let coeffs = match slot {
            0 => profile.thumb_base_deg,
            1 => profile.thumb_middle_deg,
            _ => profile.thumb_tip_deg,
        };
        UnitQuaternion::from_euler_angles(
            (coeffs[0] * amount).to_radians(),
            (coeffs[1] * amount).to_radians(),
            (coeffs[2] * amount).to_radians(),
        )
    } else {
        let angle = (profile.finger_max_angle_deg[slot] * amount).to_radians();
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle)
    }
}

/// Drives a [`HandRig`] from the landmark buffer once per tick.
///
/// While the visibility tracker reports `Tracking` the engine retargets the most
/// recent frame (the same frame is reused until a newer one arrives). Once it
/// reports `Lost`, finger joints ease back toward the rest pose recorded when the
/// engine was created, and the wrist holds its last tracked pose.
pub struct RetargetEngine {
    rest: RestPose,
    visibility: VisibilityTracker,
    current: Option<LandmarkFrame>,
    last_sequence: u64,
    bends: [[f64; MAX_JOINTS_PER_FINGER]; 5],
    reported_rest_gaps: HashSet<(Finger, usize)>,
}

impl RetargetEngine {
    /// Records the rig's rest pose. This is the only place it is captured.
    pub fn new<R: HandRig + ?Sized>(
        config: &RetargetConfig,
        visibility_timeout: f64,
        rig: &R,
    ) -> Self {
        let rest = RestPose::capture(rig, config.joints_per_finger);
        tracing::debug!(
            "Captured rest pose ({} joints per finger)",
            rest.joints_per_finger()
        );

        Self {
            rest,
            visibility: VisibilityTracker::new(visibility_timeout),
            current: None,
            last_sequence: 0,
            bends: [[0.0; MAX_JOINTS_PER_FINGER]; 5],
            reported_rest_gaps: HashSet::new(),
        }
    }

    pub fn rest_pose(&self) -> &RestPose {
        &self.rest
    }

    pub fn visibility(&self) -> &VisibilityTracker {
        &self.visibility
    }

    pub fn state(&self) -> VisibilityState {
        self.visibility.current_state()
    }

    /// Bend factor computed for a joint on the last retargeted frame.
    pub fn bend(&self, finger: Finger, joint: usize) -> f64 {
        self.bends[finger.index()].get(joint).copied().unwrap_or(0.0)
    }

    pub fn tick<R: HandRig + ?Sized>(
        &mut self,
        config: &RetargetConfig,
        buffer: &LandmarkBuffer,
        rig: &mut R,
        delta_time: f64,
    ) -> VisibilityState {
        // Elapsed time belongs to the gap before this tick, so a frame that
        // arrived during a long stall still counts as fresh.
        self.visibility.tick(delta_time);
        if let Some(latest) = buffer.latest_since(self.last_sequence) {
            self.last_sequence = latest.sequence;
            self.current = Some(latest.frame);
            self.visibility.on_frame_received();
        }

        let state = self.visibility.current_state();
        match state {
            VisibilityState::Tracking => {
                if let Some(frame) = self.current {
                    self.apply_frame(config, &frame, rig, delta_time);
                }
            }
            VisibilityState::Lost => self.recover_rest_pose(config, rig, delta_time),
        }
        state
    }

    /// Retarget the wrist and all five fingers toward one frame.
    pub fn apply_frame<R: HandRig + ?Sized>(
        &mut self,
        config: &RetargetConfig,
        frame: &LandmarkFrame,
        rig: &mut R,
        delta_time: f64,
    ) {
        self.retarget_wrist(config, frame, rig, delta_time);
        for finger in Finger::ALL {
            self.retarget_finger(config, frame, finger, rig, delta_time);
        }
    }

    pub fn retarget_wrist<R: HandRig + ?Sized>(
        &mut self,
        config: &RetargetConfig,
        frame: &LandmarkFrame,
        rig: &mut R,
        delta_time: f64,
    ) {
        let factor = smoothing_factor(
            config.rotation_smoothing_rate * config.wrist_smoothing_multiplier,
            delta_time,
        );

        let target_position = wrist_target_position(frame, config.movement_scale);
        let position = rig.wrist_position().lerp(&target_position, factor);
        rig.set_wrist_position(position);

        match wrist_target_rotation(frame) {
            Some(target) => {
                let rotation = blend(&rig.wrist_rotation(), &target, factor);
                rig.set_wrist_rotation(rotation);
            }
            None => tracing::debug!("Degenerate palm geometry, holding wrist rotation"),
        }
    }

    pub fn retarget_finger<R: HandRig + ?Sized>(
        &mut self,
        config: &RetargetConfig,
        frame: &LandmarkFrame,
        finger: Finger,
        rig: &mut R,
        delta_time: f64,
    ) {
        let invert = if finger.is_thumb() { config.invert_thumb } else { config.invert_fingers };
        let direction = if invert { -1.0 } else { 1.0 };
        let factor = smoothing_factor(
            config.rotation_smoothing_rate * config.curl_smoothing_multiplier,
            delta_time,
        );

        let joints = rig.chain_len(finger).min(MAX_JOINTS_PER_FINGER);
        for joint in 0..joints {
            let raw = bend_factor(depth_delta(frame, finger, joint), config.curl_sensitivity, invert);
            let bend = raw * config.curl.joint_scale[joint_slot(joint)];
            self.bends[finger.index()][joint] = bend;

            let bend_rot = bend_rotation(&config.curl, finger, joint, bend, direction);
            let target = match self.rest.get(finger, joint) {
                Some(rest) => rest * bend_rot,
                None => {
                    self.report_rest_gap(finger, joint);
                    bend_rot
                }
            };

            let Some(current) = rig.local_rotation(finger, joint) else {
                continue;
            };
            rig.set_local_rotation(finger, joint, blend(&current, &target, factor));
        }
    }

    /// Ease every finger joint toward its recorded rest rotation. The wrist is left alone.
    pub fn recover_rest_pose<R: HandRig + ?Sized>(
        &self,
        config: &RetargetConfig,
        rig: &mut R,
        delta_time: f64,
    ) {
        let factor = smoothing_factor(
            config.rotation_smoothing_rate * config.recovery_rate_factor,
            delta_time,
        );

        for finger in Finger::ALL {
            for joint in 0..rig.chain_len(finger) {
                let (Some(rest), Some(current)) =
                    (self.rest.get(finger, joint), rig.local_rotation(finger, joint))
                else {
                    continue;
                };
                rig.set_local_rotation(finger, joint, blend(&current, &rest, factor));
            }
        }
    }

    fn report_rest_gap(&mut self, finger: Finger, joint: usize) {
        if self.reported_rest_gaps.insert((finger, joint)) {
            tracing::warn!(
                "No rest rotation for {} joint {} (rest slots per finger: {}); using raw bend",
                finger.name(),
                joint,
                self.rest.joints_per_finger()
            );
        }
    }
}
