use super::names::{canonical_index, CANONICAL_BONE_NAMES};

/// Small epsilon for quaternion comparisons (radians)
pub const EPSILON: f32 = 1e-5;

/// Canonical humanoid bone slot.
/// Ordered for topological traversal (parents before children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BoneId {
    // Root
    Hips = 0,

    // Spine chain
    Spine = 1,
    Spine1 = 2,
    Spine2 = 3,
    Neck = 4,
    Head = 5,

    // Left arm chain
    LeftShoulder = 6, // clavicle
    LeftArm = 7,      // upper arm
    LeftForeArm = 8,
    LeftHand = 9,

    // Right arm chain
    RightShoulder = 10,
    RightArm = 11,
    RightForeArm = 12,
    RightHand = 13,

    // Left leg chain
    LeftUpLeg = 14, // thigh
    LeftLeg = 15,   // calf
    LeftFoot = 16,
    LeftToeBase = 17,

    // Right leg chain
    RightUpLeg = 18,
    RightLeg = 19,
    RightFoot = 20,
    RightToeBase = 21,
}

impl BoneId {
    /// Total number of canonical bones
    pub const COUNT: usize = 22;

    /// All bone IDs in topological order
    pub const ALL: [BoneId; Self::COUNT] = [
        BoneId::Hips,
        BoneId::Spine,
        BoneId::Spine1,
        BoneId::Spine2,
        BoneId::Neck,
        BoneId::Head,
        BoneId::LeftShoulder,
        BoneId::LeftArm,
        BoneId::LeftForeArm,
        BoneId::LeftHand,
        BoneId::RightShoulder,
        BoneId::RightArm,
        BoneId::RightForeArm,
        BoneId::RightHand,
        BoneId::LeftUpLeg,
        BoneId::LeftLeg,
        BoneId::LeftFoot,
        BoneId::LeftToeBase,
        BoneId::RightUpLeg,
        BoneId::RightLeg,
        BoneId::RightFoot,
        BoneId::RightToeBase,
    ];

    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Canonical name of this bone
    pub const fn name(self) -> &'static str {
        CANONICAL_BONE_NAMES[self.index()]
    }

    /// Parent slot in the canonical humanoid hierarchy (None for root)
    pub const fn parent(self) -> Option<BoneId> {
        use BoneId::*;
        match self {
            Hips => None,
            Spine | LeftUpLeg | RightUpLeg => Some(Hips),
            Spine1 => Some(Spine),
            Spine2 => Some(Spine1),
            Neck | LeftShoulder | RightShoulder => Some(Spine2),
            Head => Some(Neck),
            LeftArm => Some(LeftShoulder),
            LeftForeArm => Some(LeftArm),
            LeftHand => Some(LeftForeArm),
            RightArm => Some(RightShoulder),
            RightForeArm => Some(RightArm),
            RightHand => Some(RightForeArm),
            LeftLeg => Some(LeftUpLeg),
            LeftFoot => Some(LeftLeg),
            LeftToeBase => Some(LeftFoot),
            RightLeg => Some(RightUpLeg),
            RightFoot => Some(RightLeg),
            RightToeBase => Some(RightFoot),
        }
    }

    /// Resolve a raw rig or pose-table bone name (prefixes like `mixamorig:` are accepted)
    pub fn from_name(raw: &str) -> Option<BoneId> {
        canonical_index(raw).map(|i| Self::ALL[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_index_ordered() {
        for (i, bone) in BoneId::ALL.iter().enumerate() {
            assert_eq!(bone.index(), i);
            assert_eq!(BoneId::from_name(bone.name()), Some(*bone));
        }
    }

    #[test]
    fn test_parents_precede_children() {
        for bone in BoneId::ALL {
            if let Some(parent) = bone.parent() {
                assert!(parent < bone, "{:?} listed before its parent", bone);
            }
        }
    }

    #[test]
    fn test_rig_prefixes_resolve() {
        assert_eq!(BoneId::from_name("mixamorigHips"), Some(BoneId::Hips));
        assert_eq!(BoneId::from_name("mixamorig:LeftArm"), Some(BoneId::LeftArm));
        assert_eq!(
            BoneId::from_name("mixamorig1RightForeArm"),
            Some(BoneId::RightForeArm)
        );
        assert_eq!(BoneId::from_name("spine2"), Some(BoneId::Spine2));
        assert_eq!(BoneId::from_name("LeftHandIndex1"), None);
    }
}
