use super::id::BoneId;
use static_assertions::const_assert;

// One bit per canonical bone
const_assert!(BoneId::COUNT <= 32);

/// Bitset over canonical bones.
/// Bit i corresponds to the BoneId with index i.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BoneMask(u32);

impl BoneMask {
    /// No bones
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every canonical bone
    pub const fn all() -> Self {
        Self((1 << BoneId::COUNT) - 1)
    }

    /// Mask containing exactly the given bones
    pub const fn from_bones(bones: &[BoneId]) -> Self {
        let mut bits = 0u32;
        let mut i = 0;
        while i < bones.len() {
            bits |= 1 << bones[i].index();
            i += 1;
        }
        Self(bits)
    }

    #[inline]
    pub const fn contains(self, bone: BoneId) -> bool {
        (self.0 & (1 << bone.index())) != 0
    }

    /// Return new mask with the bone set
    #[inline]
    pub const fn with(self, bone: BoneId) -> Self {
        Self(self.0 | (1 << bone.index()))
    }

    /// Return new mask with the bone cleared
    #[inline]
    pub const fn without(self, bone: BoneId) -> Self {
        Self(self.0 & !(1 << bone.index()))
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate set bones in topological order
    pub fn iter(self) -> impl Iterator<Item = BoneId> {
        BoneId::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let mask = BoneMask::empty().with(BoneId::Head).with(BoneId::LeftArm);
        assert!(mask.contains(BoneId::Head));
        assert!(!mask.contains(BoneId::Hips));
        assert_eq!(mask.len(), 2);

        let mask = mask.without(BoneId::Head);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![BoneId::LeftArm]);
    }

    #[test]
    fn test_all_covers_every_bone() {
        let all = BoneMask::all();
        assert_eq!(all.len(), BoneId::COUNT);
        assert_eq!(
            BoneMask::from_bones(&BoneId::ALL),
            all,
            "from_bones(ALL) should equal all()"
        );
    }
}
