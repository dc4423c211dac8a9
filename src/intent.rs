use serde::{Deserialize, Serialize};

/// Per-tick input vocabulary, produced by a human input reader or the AI policy.
///
/// `punch`, `special` and `jump` are pulses: producers set them for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub move_left: bool,
    pub move_right: bool,
    pub duck: bool,
    pub block: bool,
    pub jump: bool,
    pub punch: bool,
    pub special: bool,
}

impl Intent {
    pub const MOVE_LEFT: u32 = 1;
    pub const MOVE_RIGHT: u32 = 1 << 1;
    pub const DUCK: u32 = 1 << 2;
    pub const BLOCK: u32 = 1 << 3;
    pub const JUMP: u32 = 1 << 4;
    pub const PUNCH: u32 = 1 << 5;
    pub const SPECIAL: u32 = 1 << 6;

    /// Decode the bit layout used across the wasm boundary (unknown bits ignored)
    pub fn from_bits(bits: u32) -> Self {
        Self {
            move_left: bits & Self::MOVE_LEFT != 0,
            move_right: bits & Self::MOVE_RIGHT != 0,
            duck: bits & Self::DUCK != 0,
            block: bits & Self::BLOCK != 0,
            jump: bits & Self::JUMP != 0,
            punch: bits & Self::PUNCH != 0,
            special: bits & Self::SPECIAL != 0,
        }
    }

    /// Horizontal direction: -1, 0 or 1 (opposite keys cancel)
    pub fn horizontal(self) -> f32 {
        match (self.move_left, self.move_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    /// Same intent with the single-tick pulses cleared
    pub fn without_pulses(self) -> Self {
        Self {
            jump: false,
            punch: false,
            special: false,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_layout() {
        let intent = Intent::from_bits(Intent::MOVE_RIGHT | Intent::PUNCH);
        assert!(intent.move_right && intent.punch);
        assert!(!intent.move_left && !intent.block);
        let all = Intent::from_bits(0x7f);
        assert!(all.move_left && all.move_right && all.duck && all.block);
        assert!(all.jump && all.punch && all.special);
        assert_eq!(Intent::from_bits(0xff00), Intent::default());
    }

    #[test]
    fn test_horizontal_cancels() {
        let both = Intent {
            move_left: true,
            move_right: true,
            ..Intent::default()
        };
        assert_eq!(both.horizontal(), 0.0);
        assert_eq!(Intent::from_bits(Intent::MOVE_LEFT).horizontal(), -1.0);
    }

    #[test]
    fn test_pulses_clear() {
        let intent = Intent::from_bits(0x7f).without_pulses();
        assert!(intent.move_left && intent.duck && intent.block);
        assert!(!intent.jump && !intent.punch && !intent.special);
    }
}
