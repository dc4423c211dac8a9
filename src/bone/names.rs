//! Canonical bone names shared by build.rs and the runtime rig mapping.
//!
//! This module is included by both the build script (pose table validation)
//! and the `bone` module, so it must not reference anything else in the crate.

// Some items are only used by build.rs
#![allow(dead_code)]

/// Canonical humanoid bone names, in `BoneId` order (parents before children).
pub const CANONICAL_BONE_NAMES: [&str; 22] = [
    "Hips",
    "Spine",
    "Spine1",
    "Spine2",
    "Neck",
    "Head",
    "LeftShoulder",
    "LeftArm",
    "LeftForeArm",
    "LeftHand",
    "RightShoulder",
    "RightArm",
    "RightForeArm",
    "RightHand",
    "LeftUpLeg",
    "LeftLeg",
    "LeftFoot",
    "LeftToeBase",
    "RightUpLeg",
    "RightLeg",
    "RightFoot",
    "RightToeBase",
];

/// Rotation orders accepted in pose table files.
pub const ROTATION_ORDERS: [&str; 6] = ["XYZ", "XZY", "YXZ", "YZX", "ZXY", "ZYX"];

/// Prefix used by common auto-rigging exports (`mixamorigHips`, `mixamorig:Hips`, `mixamorig1Hips`).
const RIG_PREFIX: &str = "mixamorig";

/// Strip a known auto-rigger prefix from a raw bone name.
pub fn strip_rig_prefix(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix(RIG_PREFIX) else {
        return raw;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.strip_prefix(':').unwrap_or(rest)
}

/// Resolve a raw rig bone name to its canonical name, if it has one.
pub fn canonical_bone_name(raw: &str) -> Option<&'static str> {
    let trimmed = strip_rig_prefix(raw.trim());
    CANONICAL_BONE_NAMES
        .iter()
        .copied()
        .find(|name| name.eq_ignore_ascii_case(trimmed))
}

/// Position of a canonical name in `CANONICAL_BONE_NAMES`.
pub fn canonical_index(raw: &str) -> Option<usize> {
    let name = canonical_bone_name(raw)?;
    CANONICAL_BONE_NAMES.iter().position(|n| *n == name)
}
