use super::id::{BoneId, EPSILON};
use super::mask::BoneMask;
use glam::Quat;

/// Orientation snapshot of the canonical bones of one rig.
///
/// Each slot stores a local rotation (relative to the bone's parent). Slots
/// whose bone is absent from the live rig are not `present` and are ignored by
/// every consumer. The type is `Copy`, so taking a snapshot of a live rig always
/// yields an independent value that later mutation of the rig cannot perturb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSnapshot {
    rotations: [Quat; BoneId::COUNT],
    present: BoneMask,
}

impl Default for PoseSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl PoseSnapshot {
    /// Snapshot with no bones present
    pub const fn empty() -> Self {
        Self {
            rotations: [Quat::IDENTITY; BoneId::COUNT],
            present: BoneMask::empty(),
        }
    }

    /// Snapshot with every canonical bone present at identity
    pub const fn identity() -> Self {
        Self {
            rotations: [Quat::IDENTITY; BoneId::COUNT],
            present: BoneMask::all(),
        }
    }

    /// Return a new snapshot with the bone rotation set (and marked present)
    pub fn with_rotation(self, bone: BoneId, rotation: Quat) -> Self {
        let mut new_pose = self;
        new_pose.rotations[bone.index()] = rotation;
        new_pose.present = new_pose.present.with(bone);
        new_pose
    }

    /// Rotation of a bone, if the rig has it
    #[inline]
    pub fn rotation(&self, bone: BoneId) -> Option<Quat> {
        self.present
            .contains(bone)
            .then(|| self.rotations[bone.index()])
    }

    #[inline]
    pub fn present(&self) -> BoneMask {
        self.present
    }

    /// True when both snapshots cover the same bones with matching orientations
    pub fn approx_eq(&self, other: &PoseSnapshot) -> bool {
        self.present == other.present
            && self.present.iter().all(|bone| {
                same_orientation(self.rotations[bone.index()], other.rotations[bone.index()])
            })
    }
}

/// Orientation equality up to quaternion double cover
#[inline]
pub fn same_orientation(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() >= 1.0 - EPSILON
}
