use super::id::BoneId;
use glam::{EulerRot, Quat};
use serde::{Deserialize, Serialize};

// ============================================================================
// Authoring types
// ============================================================================

/// Euler rotation order, matching the convention of the rig's authoring tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum RotationOrder {
    #[default]
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

impl RotationOrder {
    fn euler_rot(self) -> EulerRot {
        match self {
            RotationOrder::XYZ => EulerRot::XYZ,
            RotationOrder::XZY => EulerRot::XZY,
            RotationOrder::YXZ => EulerRot::YXZ,
            RotationOrder::YZX => EulerRot::YZX,
            RotationOrder::ZXY => EulerRot::ZXY,
            RotationOrder::ZYX => EulerRot::ZYX,
        }
    }
}

/// Euler angles in degrees for JSON authoring (more intuitive than quaternions)
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct EulerAngles {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl EulerAngles {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Convert to quaternion. Angles are applied per axis in the given order.
    pub fn to_quat(&self, order: RotationOrder) -> Quat {
        let (a, b, c) = match order {
            RotationOrder::XYZ => (self.x, self.y, self.z),
            RotationOrder::XZY => (self.x, self.z, self.y),
            RotationOrder::YXZ => (self.y, self.x, self.z),
            RotationOrder::YZX => (self.y, self.z, self.x),
            RotationOrder::ZXY => (self.z, self.x, self.y),
            RotationOrder::ZYX => (self.z, self.y, self.x),
        };
        Quat::from_euler(
            order.euler_rot(),
            a.to_radians(),
            b.to_radians(),
            c.to_radians(),
        )
    }

    /// Convert from quaternion (XYZ order)
    pub fn from_quat(q: Quat) -> Self {
        let (x, y, z) = q.to_euler(EulerRot::XYZ);
        Self {
            x: x.to_degrees(),
            y: y.to_degrees(),
            z: z.to_degrees(),
        }
    }
}

// ============================================================================
// Clips
// ============================================================================

/// A keyframe of a single bone's local orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationKeyframe {
    pub time: f32,
    pub rotation: Quat,
}

/// Orientation keyframes of one bone, sorted by time
#[derive(Debug, Clone, PartialEq)]
pub struct BoneTrack {
    pub bone: BoneId,
    pub keyframes: Vec<RotationKeyframe>,
}

impl BoneTrack {
    /// Sample the track at a clip-local time, using slerp interpolation.
    /// Times outside the keyed range hold the first/last key.
    pub fn sample(&self, time: f32) -> Quat {
        let Some(first) = self.keyframes.first() else {
            return Quat::IDENTITY;
        };

        // Binary search for keyframe (using partition_point for efficiency)
        let next_idx = self.keyframes.partition_point(|kf| kf.time <= time);

        if next_idx == 0 {
            return first.rotation;
        }
        if next_idx >= self.keyframes.len() {
            return self.keyframes[self.keyframes.len() - 1].rotation;
        }

        let prev = &self.keyframes[next_idx - 1];
        let next = &self.keyframes[next_idx];
        let segment_duration = next.time - prev.time;
        let t = if segment_duration > 0.0 {
            (time - prev.time) / segment_duration
        } else {
            0.0
        };

        prev.rotation.slerp(next.rotation, t)
    }
}

/// Synthesized animation clip: per-bone orientation tracks.
///
/// Built on demand and consumed once by playback.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<BoneTrack>,
}

impl Clip {
    pub fn track(&self, bone: BoneId) -> Option<&BoneTrack> {
        self.tracks.iter().find(|t| t.bone == bone)
    }

    /// Convert to JSON string (Euler degrees per key, for inspection in the host)
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        let json = ClipJson {
            name: self.name.clone(),
            duration: self.duration,
            tracks: self
                .tracks
                .iter()
                .map(|track| TrackJson {
                    bone: track.bone.name().to_string(),
                    keyframes: track
                        .keyframes
                        .iter()
                        .map(|kf| KeyframeJson {
                            time: kf.time,
                            rotation: EulerAngles::from_quat(kf.rotation),
                        })
                        .collect(),
                })
                .collect(),
        };

        serde_json::to_string_pretty(&json)
    }
}

/// JSON format for keyframe
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyframeJson {
    pub time: f32,
    pub rotation: EulerAngles,
}

/// JSON format for a bone track
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackJson {
    pub bone: String,
    pub keyframes: Vec<KeyframeJson>,
}

/// JSON format for an exported clip
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClipJson {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<TrackJson>,
}
