//! Status register
//!
//! Reading the status register clears the frame flag and releases the
//! interrupt line, which is why every transfer burst ends with one.

/// Status byte as returned by the VDP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Status(pub u8);

impl Status {
    /// Frame flag: set at the end of the active display
    pub const FRAME_BIT: u8 = 7;
    /// Fifth sprite on one line
    pub const FIFTH_SPRITE_BIT: u8 = 6;
    /// Two sprites overlap
    pub const COINCIDENCE_BIT: u8 = 5;
    /// Number of the fifth sprite
    pub const FIFTH_SPRITE_MASK: u8 = 0x1F;

    #[inline]
    pub const fn frame(self) -> bool {
        self.0 & (1 << Self::FRAME_BIT) != 0
    }

    #[inline]
    pub const fn fifth_sprite(self) -> bool {
        self.0 & (1 << Self::FIFTH_SPRITE_BIT) != 0
    }

    #[inline]
    pub const fn coincidence(self) -> bool {
        self.0 & (1 << Self::COINCIDENCE_BIT) != 0
    }

    /// Sprite number reported with the fifth-sprite flag
    #[inline]
    pub const fn fifth_sprite_number(self) -> u8 {
        self.0 & Self::FIFTH_SPRITE_MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_fields() {
        let status = Status(0b1101_0011);
        assert!(status.frame());
        assert!(status.fifth_sprite());
        assert!(!status.coincidence());
        assert_eq!(status.fifth_sprite_number(), 0x13);
    }

    #[test]
    fn test_status_clear() {
        let status = Status::default();
        assert!(!status.frame());
        assert!(!status.fifth_sprite());
        assert!(!status.coincidence());
        assert_eq!(status.fifth_sprite_number(), 0);
    }
}
