//! Palette and VRAM table entry layouts
//!
//! Packed entries are plain bytes with shift/mask accessors; nothing here
//! depends on how a compiler would lay out bit-fields.
//!
//! # Example
//!
//! ```
//! use tms99xx::tables::{Color, ColorPair, SpriteAttribute};
//!
//! let pair = ColorPair::new(Color::WHITE, Color::DARK_BLUE);
//! assert_eq!(pair.0, 0xF4);
//!
//! let sprite = SpriteAttribute::new(100, 40, 0, Color::LIGHT_RED);
//! assert_eq!(sprite.to_bytes(), [100, 40, 0, 0x09]);
//! ```

/// One of the 16 fixed palette entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Color(pub u8);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0);
    pub const BLACK: Color = Color(0x1);
    pub const MEDIUM_GREEN: Color = Color(0x2);
    pub const LIGHT_GREEN: Color = Color(0x3);
    pub const DARK_BLUE: Color = Color(0x4);
    pub const LIGHT_BLUE: Color = Color(0x5);
    pub const DARK_RED: Color = Color(0x6);
    pub const CYAN: Color = Color(0x7);
    pub const MEDIUM_RED: Color = Color(0x8);
    pub const LIGHT_RED: Color = Color(0x9);
    pub const DARK_YELLOW: Color = Color(0xA);
    pub const LIGHT_YELLOW: Color = Color(0xB);
    pub const DARK_GREEN: Color = Color(0xC);
    pub const MAGENTA: Color = Color(0xD);
    pub const GREY: Color = Color(0xE);
    pub const WHITE: Color = Color(0xF);

    /// Palette index, masked to four bits
    #[inline]
    pub const fn index(self) -> u8 {
        self.0 & ColorPair::NIBBLE_MASK
    }
}

/// Foreground/background nibble pair
///
/// Used by register 7 (text color / backdrop) and by every color table
/// entry (1-bits color / 0-bits color).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct ColorPair(pub u8);

impl ColorPair {
    /// Foreground nibble position
    pub const FOREGROUND_SHIFT: u8 = 4;
    /// Width of one color
    pub const NIBBLE_MASK: u8 = 0x0F;

    #[inline]
    pub const fn new(foreground: Color, background: Color) -> Self {
        ColorPair((foreground.index() << Self::FOREGROUND_SHIFT) | background.index())
    }

    #[inline]
    pub const fn foreground(self) -> Color {
        Color((self.0 >> Self::FOREGROUND_SHIFT) & Self::NIBBLE_MASK)
    }

    #[inline]
    pub const fn background(self) -> Color {
        Color(self.0 & Self::NIBBLE_MASK)
    }

    #[inline]
    pub const fn with_foreground(self, color: Color) -> Self {
        ColorPair((self.0 & Self::NIBBLE_MASK) | (color.index() << Self::FOREGROUND_SHIFT))
    }

    #[inline]
    pub const fn with_background(self, color: Color) -> Self {
        ColorPair((self.0 & !Self::NIBBLE_MASK) | color.index())
    }
}

/// Bytes per entry of each table
pub mod entry {
    /// Name table: one pattern number
    pub const NAME: u16 = 1;
    /// Color table: one [`ColorPair`](super::ColorPair)
    pub const COLOR: u16 = 1;
    /// Pattern generator: 8 rows
    pub const PATTERN: u16 = 8;
    /// Sprite attribute: y, x, name, early clock/color
    pub const SPRITE_ATTRIBUTE: u16 = 4;
    /// 8x8 sprite pattern
    pub const SPRITE_PATTERN_SMALL: u16 = 8;
    /// 16x16 sprite pattern
    pub const SPRITE_PATTERN_LARGE: u16 = 32;
}

/// Left or right 4x4 block of a multicolor pattern byte
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Multicolor (bitmap mode) pattern: 8 bytes, two 4x4 color blocks per byte
///
/// The left block color is the high nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MulticolorPattern(pub [u8; 8]);

impl MulticolorPattern {
    /// Block color at `row` (0-7)
    pub const fn block(&self, row: usize, side: Side) -> Color {
        let pair = ColorPair(self.0[row & 7]);
        match side {
            Side::Left => pair.foreground(),
            Side::Right => pair.background(),
        }
    }

    /// Set the block color at `row` (0-7)
    pub fn set_block(&mut self, row: usize, side: Side, color: Color) {
        let pair = ColorPair(self.0[row & 7]);
        self.0[row & 7] = match side {
            Side::Left => pair.with_foreground(color),
            Side::Right => pair.with_background(color),
        }
        .0;
    }
}

/// Sprite attribute table entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SpriteAttribute {
    /// Vertical position (one less than the first displayed line)
    pub y: u8,
    /// Horizontal position
    pub x: u8,
    /// Sprite pattern number
    pub name: u8,
    /// Early clock bit (7) and color (3..0)
    pub flags: u8,
}

impl SpriteAttribute {
    /// Early clock bit: shift the sprite 32 pixels left
    pub const EARLY_CLOCK_BIT: u8 = 7;
    /// Color bits
    pub const COLOR_MASK: u8 = 0x0F;
    /// A `y` of this value ends sprite processing for the frame
    pub const TERMINATOR: u8 = 0xD0;

    pub const fn new(y: u8, x: u8, name: u8, color: Color) -> Self {
        SpriteAttribute {
            y,
            x,
            name,
            flags: color.index(),
        }
    }

    /// Entry that stops the sprite list
    pub const fn terminator() -> Self {
        SpriteAttribute {
            y: Self::TERMINATOR,
            x: 0,
            name: 0,
            flags: 0,
        }
    }

    #[inline]
    pub const fn color(&self) -> Color {
        Color(self.flags & Self::COLOR_MASK)
    }

    #[inline]
    pub const fn early_clock(&self) -> bool {
        self.flags & (1 << Self::EARLY_CLOCK_BIT) != 0
    }

    pub fn set_color(&mut self, color: Color) {
        self.flags = (self.flags & !Self::COLOR_MASK) | color.index();
    }

    pub fn set_early_clock(&mut self, on: bool) {
        if on {
            self.flags |= 1 << Self::EARLY_CLOCK_BIT;
        } else {
            self.flags &= !(1 << Self::EARLY_CLOCK_BIT);
        }
    }

    /// Wire order: y, x, name, flags
    pub const fn to_bytes(&self) -> [u8; 4] {
        [self.y, self.x, self.name, self.flags]
    }

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        SpriteAttribute {
            y: bytes[0],
            x: bytes[1],
            name: bytes[2],
            flags: bytes[3],
        }
    }
}
