use super::id::BoneId;
use super::mask::BoneMask;
use super::pose::PoseSnapshot;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floats per bone in the flat transform layout: position xyz, rotation xyzw, scale xyz
pub const FLOATS_PER_TRANSFORM: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum RigError {
    #[error("rig has no bones")]
    Empty,
    #[error("duplicate bone name '{0}'")]
    DuplicateName(String),
    #[error("bone '{name}' (index {index}) has parent {parent}, which does not precede it")]
    ParentOrder {
        name: String,
        index: usize,
        parent: usize,
    },
    #[error("expected {expected} values for {field}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Local transform of a bone (relative to its parent)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    fn from_slice(v: &[f32]) -> Self {
        Self {
            position: Vec3::new(v[0], v[1], v[2]),
            rotation: Quat::from_xyzw(v[3], v[4], v[5], v[6]).normalize(),
            scale: Vec3::new(v[7], v[8], v[9]),
        }
    }
}

/// A named bone of a loaded rig
#[derive(Debug, Clone, PartialEq)]
pub struct RigBone {
    pub name: String,
    /// Index of the parent bone in the rig's bone list (None for roots)
    pub parent: Option<usize>,
    pub local: LocalTransform,
}

/// Authoritative per-bone transforms captured once at load.
///
/// Immutable for the lifetime of the character.
#[derive(Debug, Clone, PartialEq)]
pub struct RestPose {
    transforms: Vec<LocalTransform>,
    pose: PoseSnapshot,
}

impl RestPose {
    /// Rest orientations of the canonical bones the rig has
    #[inline]
    pub fn pose(&self) -> &PoseSnapshot {
        &self.pose
    }
}

/// Read/write view of a character's skeleton.
///
/// Bones keep the host's order. Bones whose names resolve to a canonical
/// humanoid slot are animated; the rest are carried untouched.
#[derive(Debug, Clone)]
pub struct Rig {
    bones: Vec<RigBone>,
    slots: [Option<usize>; BoneId::COUNT],
}

impl Rig {
    /// Build a rig from an ordered bone list.
    ///
    /// Names must be unique and every parent must precede its child.
    pub fn new(bones: Vec<RigBone>) -> Result<Self, RigError> {
        if bones.is_empty() {
            return Err(RigError::Empty);
        }

        let mut slots = [None; BoneId::COUNT];
        for (index, bone) in bones.iter().enumerate() {
            if bones[..index].iter().any(|b| b.name == bone.name) {
                return Err(RigError::DuplicateName(bone.name.clone()));
            }
            if let Some(parent) = bone.parent {
                if parent >= index {
                    return Err(RigError::ParentOrder {
                        name: bone.name.clone(),
                        index,
                        parent,
                    });
                }
            }
            match BoneId::from_name(&bone.name) {
                Some(id) if slots[id.index()].is_none() => slots[id.index()] = Some(index),
                Some(id) => log::debug!(
                    "Bone '{}' maps to {:?} which is already bound, carrying it unanimated",
                    bone.name,
                    id
                ),
                None => {}
            }
        }

        let rig = Self { bones, slots };
        log::info!(
            "Rig loaded: {} bones, {} canonical slots matched",
            rig.bones.len(),
            rig.present().len()
        );
        let missing: Vec<&str> = BoneId::ALL
            .iter()
            .filter(|b| rig.slots[b.index()].is_none())
            .map(|b| b.name())
            .collect();
        if !missing.is_empty() {
            log::debug!("Unmatched canonical slots: {}", missing.join(", "));
        }

        Ok(rig)
    }

    /// Build a rig from the flat arrays the host passes across the wasm boundary.
    /// A negative parent marks a root.
    pub fn from_flat(names: Vec<String>, parents: &[i32], transforms: &[f32]) -> Result<Self, RigError> {
        let count = names.len();
        if parents.len() != count {
            return Err(RigError::LengthMismatch {
                field: "parents",
                expected: count,
                actual: parents.len(),
            });
        }
        if transforms.len() != count * FLOATS_PER_TRANSFORM {
            return Err(RigError::LengthMismatch {
                field: "transforms",
                expected: count * FLOATS_PER_TRANSFORM,
                actual: transforms.len(),
            });
        }

        let bones = names
            .into_iter()
            .zip(parents)
            .zip(transforms.chunks_exact(FLOATS_PER_TRANSFORM))
            .map(|((name, &parent), values)| RigBone {
                name,
                parent: usize::try_from(parent).ok(),
                local: LocalTransform::from_slice(values),
            })
            .collect();

        Self::new(bones)
    }

    /// Minimal rig with every canonical bone at identity, in canonical order
    pub fn canonical() -> Self {
        let bones = BoneId::ALL
            .iter()
            .map(|b| RigBone {
                name: b.name().to_string(),
                parent: b.parent().map(BoneId::index),
                local: LocalTransform::IDENTITY,
            })
            .collect();
        let mut slots = [None; BoneId::COUNT];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = Some(i);
        }
        Self { bones, slots }
    }

    pub fn bones(&self) -> &[RigBone] {
        &self.bones
    }

    /// Canonical bones this rig has
    pub fn present(&self) -> BoneMask {
        BoneId::ALL
            .iter()
            .filter(|b| self.slots[b.index()].is_some())
            .fold(BoneMask::empty(), |mask, b| mask.with(*b))
    }

    /// Rig bone bound to a canonical slot
    pub fn bone(&self, id: BoneId) -> Option<&RigBone> {
        self.slots[id.index()].map(|i| &self.bones[i])
    }

    /// Deep copy of the current orientations of the canonical bones
    pub fn snapshot(&self) -> PoseSnapshot {
        BoneId::ALL
            .iter()
            .fold(PoseSnapshot::empty(), |pose, &id| match self.slots[id.index()] {
                Some(i) => pose.with_rotation(id, self.bones[i].local.rotation),
                None => pose,
            })
    }

    /// Write orientations from a pose. Bones the pose does not cover keep theirs.
    pub fn apply(&mut self, pose: &PoseSnapshot) {
        for id in pose.present().iter() {
            if let (Some(i), Some(q)) = (self.slots[id.index()], pose.rotation(id)) {
                self.bones[i].local.rotation = q;
            }
        }
    }

    /// Capture the rest pose (call once, at load)
    pub fn capture_rest(&self) -> RestPose {
        RestPose {
            transforms: self.bones.iter().map(|b| b.local).collect(),
            pose: self.snapshot(),
        }
    }

    /// Restore every bone's local transform from a rest pose of this rig
    pub fn reset_to(&mut self, rest: &RestPose) {
        if rest.transforms.len() != self.bones.len() {
            log::warn!(
                "Rest pose has {} transforms but rig has {} bones, skipping reset",
                rest.transforms.len(),
                self.bones.len()
            );
            return;
        }
        for (bone, transform) in self.bones.iter_mut().zip(&rest.transforms) {
            bone.local = *transform;
        }
    }

    /// Local orientations as xyzw quadruples, in rig order
    pub fn rotations_flat(&self) -> Vec<f32> {
        self.bones
            .iter()
            .flat_map(|b| b.local.rotation.to_array())
            .collect()
    }
}
