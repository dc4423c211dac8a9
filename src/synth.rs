//! Procedural clip synthesis.
//!
//! Pure functions: given a rig's rest pose, an optional live-pose override and
//! a pose target table, build a timed set of per-bone orientation keyframes.
//! Nothing here holds state, so a built clip can be discarded after one use.

use crate::bone::{
    same_orientation, BoneId, BoneMask, BoneTrack, Clip, PoseSnapshot, RestPose, RotationKeyframe,
};
use crate::pose_table::PoseTargetTable;
use glam::Quat;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use thiserror::Error;

/// Fraction of a MultiPhase clip spent reaching the prep pose
pub const PREP_FRACTION: f32 = 0.2;
/// Fraction of a MultiPhase clip at which the apex pose is reached
pub const APEX_FRACTION: f32 = 0.45;

/// Bones perturbed by PingPong breathing, with the per-unit-intensity offset (radians)
const BREATHING: [(BoneId, BreathAxis, f32); 8] = [
    (BoneId::Spine, BreathAxis::X, 0.04),
    (BoneId::Spine1, BreathAxis::X, 0.03),
    (BoneId::Spine2, BreathAxis::X, 0.02),
    (BoneId::LeftShoulder, BreathAxis::Z, 0.05),
    (BoneId::RightShoulder, BreathAxis::Z, -0.05),
    (BoneId::Head, BreathAxis::X, -0.04),
    (BoneId::LeftArm, BreathAxis::Z, 0.06),
    (BoneId::RightArm, BreathAxis::Z, -0.06),
];

#[derive(Debug, Clone, Copy)]
enum BreathAxis {
    X,
    Z,
}

impl BreathAxis {
    fn rotation(self, angle: f32) -> Quat {
        match self {
            BreathAxis::X => Quat::from_rotation_x(angle),
            BreathAxis::Z => Quat::from_rotation_z(angle),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SynthError {
    #[error("no rest pose available for clip '{0}'")]
    MissingRestPose(String),
    #[error("invalid duration {duration} for clip '{name}'")]
    InvalidDuration { name: String, duration: f32 },
}

/// Walk cycle shape. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WalkCycle {
    /// Thigh swing amplitude
    pub stride: f32,
    /// Extra thigh lift while the leg swings forward
    pub lift: f32,
    /// Calf bend while the leg swings forward
    pub knee_bend: f32,
    /// Foot flex amplitude
    pub foot_flex: f32,
    /// Spine yaw amplitude, opposite the leading leg
    pub spine_twist: f32,
    /// Keys per cycle (first and last coincide)
    pub samples: usize,
}

impl Default for WalkCycle {
    fn default() -> Self {
        Self {
            stride: 28.0,
            lift: 12.0,
            knee_bend: 35.0,
            foot_flex: 15.0,
            spine_twist: 6.0,
            samples: 17,
        }
    }
}

impl WalkCycle {
    /// Leg offsets at a phase angle: (thigh, calf, foot) rotations about X
    fn leg(&self, phase: f32) -> (Quat, Quat, Quat) {
        let forward = phase.cos().max(0.0);
        let thigh = -(self.stride * phase.sin()) - self.lift * forward;
        let calf = self.knee_bend * forward;
        let foot = self.foot_flex * phase.sin();
        (
            Quat::from_rotation_x(thigh.to_radians()),
            Quat::from_rotation_x(calf.to_radians()),
            Quat::from_rotation_x(foot.to_radians()),
        )
    }

    /// Offset rotation for a bone at a phase angle (left leg leads at phase 0)
    fn offset(&self, bone: BoneId, phase: f32) -> Option<Quat> {
        let right = phase + std::f32::consts::PI;
        match bone {
            BoneId::LeftUpLeg => Some(self.leg(phase).0),
            BoneId::LeftLeg => Some(self.leg(phase).1),
            BoneId::LeftFoot => Some(self.leg(phase).2),
            BoneId::RightUpLeg => Some(self.leg(right).0),
            BoneId::RightLeg => Some(self.leg(right).1),
            BoneId::RightFoot => Some(self.leg(right).2),
            BoneId::Spine => Some(Quat::from_rotation_y(
                (-self.spine_twist * phase.sin()).to_radians(),
            )),
            _ => None,
        }
    }
}

/// Interpolation pattern of a synthesized clip
#[derive(Debug, Clone, Copy)]
pub enum KeyframeShape<'a> {
    /// start → end (stance transitions and resets)
    Linear,
    /// base → peak → base, perturbing only the breathing bones
    PingPong { intensity: f32 },
    /// start → prep → apex → end (strikes)
    MultiPhase {
        prep: &'a PoseTargetTable,
        apex: &'a PoseTargetTable,
    },
    /// Phase-driven loop (walk cycle)
    Procedural(WalkCycle),
}

/// Everything `build_clip` needs
#[derive(Debug, Clone, Copy)]
pub struct ClipRequest<'a> {
    pub name: &'a str,
    /// Live pose to start from instead of the rest pose
    pub start: Option<&'a PoseSnapshot>,
    /// End / base orientations; bones without a target hold their start
    pub table: Option<&'a PoseTargetTable>,
    pub rest: Option<&'a RestPose>,
    pub duration: f32,
    pub shape: KeyframeShape<'a>,
}

/// Build a clip. Bones absent from the rig are skipped.
///
/// The result always has at least one track: when no bone moves, a
/// stationary track on the first rig bone is emitted instead.
pub fn build_clip(request: &ClipRequest) -> Result<Clip, SynthError> {
    let rest = request
        .rest
        .ok_or_else(|| SynthError::MissingRestPose(request.name.to_string()))?;
    let duration = request.duration;
    if !(duration.is_finite() && duration > 0.0) {
        return Err(SynthError::InvalidDuration {
            name: request.name.to_string(),
            duration,
        });
    }

    let present = rest.pose().present();
    let mut tracks = Vec::new();

    for bone in present.iter() {
        let Some(start) = start_rotation(request, rest, bone) else {
            continue;
        };
        let end = target_rotation(request.table, bone).unwrap_or(start);

        let keyframes = match request.shape {
            KeyframeShape::Linear => vec![key(0.0, start), key(duration, end)],
            KeyframeShape::PingPong { intensity } => {
                let peak = breathing_offset(bone, intensity).map_or(end, |offset| end * offset);
                vec![key(0.0, end), key(duration * 0.5, peak), key(duration, end)]
            }
            KeyframeShape::MultiPhase { prep, apex } => {
                let prep_q = prep.target(bone).unwrap_or(start);
                let apex_q = apex.target(bone).unwrap_or(prep_q);
                vec![
                    key(0.0, start),
                    key(duration * PREP_FRACTION, prep_q),
                    key(duration * APEX_FRACTION, apex_q),
                    key(duration, end),
                ]
            }
            KeyframeShape::Procedural(cycle) => walk_keys(&cycle, bone, end, duration),
        };

        if keyframes.iter().any(|kf| !same_orientation(kf.rotation, start)) {
            tracks.push(BoneTrack { bone, keyframes });
        }
    }

    if tracks.is_empty() {
        tracks.push(stationary_track(request, rest, present, duration));
    }

    Ok(Clip {
        name: request.name.to_string(),
        duration,
        tracks,
    })
}

fn key(time: f32, rotation: Quat) -> RotationKeyframe {
    RotationKeyframe { time, rotation }
}

fn start_rotation(request: &ClipRequest, rest: &RestPose, bone: BoneId) -> Option<Quat> {
    request
        .start
        .and_then(|live| live.rotation(bone))
        .or_else(|| rest.pose().rotation(bone))
}

fn target_rotation(table: Option<&PoseTargetTable>, bone: BoneId) -> Option<Quat> {
    table.and_then(|t| t.target(bone))
}

fn breathing_offset(bone: BoneId, intensity: f32) -> Option<Quat> {
    BREATHING
        .iter()
        .find(|(b, _, _)| *b == bone)
        .map(|(_, axis, amount)| axis.rotation(amount * intensity))
}

fn walk_keys(cycle: &WalkCycle, bone: BoneId, base: Quat, duration: f32) -> Vec<RotationKeyframe> {
    let samples = cycle.samples.max(2);
    (0..samples)
        .map(|i| {
            let s = i as f32 / (samples - 1) as f32;
            let rotation = cycle
                .offset(bone, s * TAU)
                .map_or(base, |offset| base * offset);
            key(s * duration, rotation)
        })
        .collect()
}

/// Degenerate fallback: a two-key track that holds the first rig bone still
fn stationary_track(
    request: &ClipRequest,
    rest: &RestPose,
    present: BoneMask,
    duration: f32,
) -> BoneTrack {
    let (bone, rotation) = present
        .iter()
        .next()
        .and_then(|bone| start_rotation(request, rest, bone).map(|q| (bone, q)))
        .unwrap_or((BoneId::Hips, Quat::IDENTITY));

    BoneTrack {
        bone,
        keyframes: vec![key(0.0, rotation), key(duration, rotation)],
    }
}
