//! System volume level clamped to `0..=100`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A volume percentage that is always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VolumeLevel(u8);

impl VolumeLevel {
    pub const MIN: VolumeLevel = VolumeLevel(0);
    pub const MAX: VolumeLevel = VolumeLevel(100);

    /// Creates a level, clamping values above 100.
    pub fn new(percent: u8) -> Self {
        Self(percent.min(Self::MAX.0))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Applies a signed step and clamps the result to `[0, 100]`.
    pub fn adjust(self, delta: i32) -> Self {
        let raw = i32::from(self.0).saturating_add(delta);
        Self(raw.clamp(i32::from(Self::MIN.0), i32::from(Self::MAX.0)) as u8)
    }
}

impl Default for VolumeLevel {
    fn default() -> Self {
        Self(50)
    }
}

impl fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_above_max() {
        assert_eq!(VolumeLevel::new(250), VolumeLevel::MAX);
    }

    #[test]
    fn test_adjust_up_clamps_at_100() {
        let level = VolumeLevel::new(95);
        assert_eq!(level.adjust(10).percent(), 100);
        assert_eq!(level.adjust(10).adjust(10).percent(), 100);
    }

    #[test]
    fn test_adjust_down_clamps_at_0() {
        assert_eq!(VolumeLevel::new(3).adjust(-10), VolumeLevel::MIN);
    }

    #[test]
    fn test_adjust_within_range() {
        assert_eq!(VolumeLevel::new(40).adjust(10).percent(), 50);
        assert_eq!(VolumeLevel::new(40).adjust(-10).percent(), 30);
    }

    #[test]
    fn test_adjust_does_not_overflow_on_extreme_delta() {
        assert_eq!(VolumeLevel::new(10).adjust(i32::MAX), VolumeLevel::MAX);
        assert_eq!(VolumeLevel::new(10).adjust(i32::MIN), VolumeLevel::MIN);
    }
}
