//! Register file layout and per-mode register derivation
//!
//! The VDP has eight write-only configuration registers. Registers 0 and 1
//! hold the mode bits and display flags, 2-6 hold table base addresses in a
//! table-specific pre-shifted form, and 7 holds the text/backdrop colors.

/// Register indices
pub mod reg {
    /// Mode register 0 (M3, external video)
    pub const MODE0: u8 = 0;
    /// Mode register 1 (16K, blank, IE, M1, M2, size, magnify)
    pub const MODE1: u8 = 1;
    /// Name table base
    pub const NAME_TABLE: u8 = 2;
    /// Color table base
    pub const COLOR_TABLE: u8 = 3;
    /// Pattern generator base
    pub const PATTERN_TABLE: u8 = 4;
    /// Sprite attribute table base
    pub const SPRITE_ATTRIBUTE: u8 = 5;
    /// Sprite pattern generator base
    pub const SPRITE_PATTERN: u8 = 6;
    /// Text color (high nibble) / backdrop color (low nibble)
    pub const COLOR: u8 = 7;
    /// Number of registers
    pub const COUNT: u8 = 8;
}

/// Register 0 bit positions
pub mod r0 {
    /// M3, graphics II
    pub const M3: u8 = 1;
    /// External video input
    pub const EXTVID: u8 = 0;
}

/// Register 1 bit positions
pub mod r1 {
    /// 4K/16K memory select
    pub const MEM_16K: u8 = 7;
    /// Blank (polarity depends on chip variant)
    pub const BLANK: u8 = 6;
    /// Frame interrupt enable
    pub const IRQ: u8 = 5;
    /// M1, text mode
    pub const M1: u8 = 4;
    /// M2, multicolor (bitmap) mode
    pub const M2: u8 = 3;
    /// 16x16 sprites
    pub const SPRITE_SIZE: u8 = 1;
    /// Sprite magnification
    pub const SPRITE_MAG: u8 = 0;
    /// Bits owned by the mode selection (M1, M2 and the reserved bit 2)
    pub const MODE_MASK: u8 = 0x1C;
}

/// Tag bits of the second framing byte
pub mod tag {
    /// Register write marker
    pub const REGISTER: u8 = 0x80;
    /// Address latch for a memory write
    pub const WRITE: u8 = 0x40;
    /// Address latch for a memory read
    pub const READ: u8 = 0x00;
    /// Address bits 13..8 carried in the high framing byte
    pub const ADDR_HIGH_MASK: u8 = 0x3F;
}

/// Size of video memory (16 KiB)
pub const VRAM_SIZE: usize = 1 << 14;

/// Address bits understood by the memory cursor
pub const ADDRESS_MASK: u16 = 0x3FFF;

/// Display mode
///
/// The discriminants are the mode codes the register derivation is built on:
/// bit 0 lands in register 0 as M3, bits 1 and 2 land in register 1 as M2
/// and M1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    /// 32x24 tiles, one color pair per 8 patterns
    GraphicsI = 0,
    /// 32x24 tiles, three pattern/color banks covering the screen
    GraphicsII = 1,
    /// Multicolor: 64x48 blocks of 4x4 pixels
    Bitmap = 2,
    /// 40x24 characters of 6x8, no sprites, no color table
    Text = 4,
}

impl Mode {
    /// Decode a raw mode code
    pub const fn from_code(code: u8) -> Option<Mode> {
        match code {
            0 => Some(Mode::GraphicsI),
            1 => Some(Mode::GraphicsII),
            2 => Some(Mode::Bitmap),
            4 => Some(Mode::Text),
            _ => None,
        }
    }

    /// Raw mode code
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Register 0 bits selected by this mode
    #[inline]
    pub const fn register0_bits(self) -> u8 {
        (self.code() << 1) & (1 << r0::M3)
    }

    /// Register 1 bits selected by this mode
    #[inline]
    pub const fn register1_bits(self) -> u8 {
        (self.code() & 0x06) << 2
    }

    /// Replace the mode bits of `register1`, keeping the caller's flags
    #[inline]
    pub const fn merge_register1(self, register1: u8) -> u8 {
        (register1 & !r1::MODE_MASK) | self.register1_bits()
    }

    /// Whether the mode reads a color table
    #[inline]
    pub const fn has_color_table(self) -> bool {
        !matches!(self, Mode::Text)
    }

    /// Whether the mode displays sprites
    #[inline]
    pub const fn has_sprites(self) -> bool {
        !matches!(self, Mode::Text)
    }
}

/// Sprite pattern size
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SpriteSize {
    /// 8x8 pixels, one pattern
    #[default]
    Small,
    /// 16x16 pixels, four consecutive patterns
    Large,
}

impl SpriteSize {
    /// Pixels per side before magnification
    pub const fn pixels(self) -> u8 {
        match self {
            SpriteSize::Small => 8,
            SpriteSize::Large => 16,
        }
    }

    /// Bytes of one sprite pattern
    pub const fn pattern_bytes(self) -> u16 {
        match self {
            SpriteSize::Small => 8,
            SpriteSize::Large => 32,
        }
    }
}

/// A VRAM table addressed through registers 2-6
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Name,
    Color,
    Pattern,
    SpriteAttribute,
    SpritePattern,
}

impl Table {
    /// Register that holds the table base
    pub const fn register(self) -> u8 {
        match self {
            Table::Name => reg::NAME_TABLE,
            Table::Color => reg::COLOR_TABLE,
            Table::Pattern => reg::PATTERN_TABLE,
            Table::SpriteAttribute => reg::SPRITE_ATTRIBUTE,
            Table::SpritePattern => reg::SPRITE_PATTERN,
        }
    }

    /// Right shift applied to the base address before it is sent
    pub const fn scale(self) -> u8 {
        match self {
            Table::Name => 10,
            Table::Color => 6,
            Table::Pattern => 11,
            Table::SpriteAttribute => 7,
            Table::SpritePattern => 11,
        }
    }
}

/// Base addresses of the five VRAM tables
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableAddresses {
    pub name: u16,
    pub color: u16,
    pub pattern: u16,
    pub sprite_attribute: u16,
    pub sprite_pattern: u16,
}

impl TableAddresses {
    /// Base address of `table`
    pub const fn get(&self, table: Table) -> u16 {
        match table {
            Table::Name => self.name,
            Table::Color => self.color,
            Table::Pattern => self.pattern,
            Table::SpriteAttribute => self.sprite_attribute,
            Table::SpritePattern => self.sprite_pattern,
        }
    }

    /// Register value for `table`'s base, outside the graphics II constraint
    pub const fn register_value(&self, table: Table) -> u8 {
        (self.get(table) >> table.scale()) as u8
    }
}

impl Default for TableAddresses {
    fn default() -> Self {
        TableAddresses {
            name: 0x3800,
            color: 0x2000,
            pattern: 0x0000,
            sprite_attribute: 0x3B00,
            sprite_pattern: 0x1800,
        }
    }
}

/// Graphics II color table register: only 0x0000 and 0x2000 are legal bases
pub const fn graphics2_color_register(base: u16) -> u8 {
    if base == 0 { 0x7F } else { 0xFF }
}

/// Graphics II pattern table register: only 0x0000 and 0x2000 are legal bases
pub const fn graphics2_pattern_register(base: u16) -> u8 {
    if base == 0 { 0x03 } else { 0x07 }
}

/// Ordered register writes that establish a display mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterPlan {
    writes: [(u8, u8); reg::COUNT as usize],
    len: usize,
}

impl RegisterPlan {
    /// Derive the writes for `mode`.
    ///
    /// `register0` and `register1` must already carry the mode bits. The plan
    /// always starts with registers 0, 1 and 2 and ends with register 7; text
    /// mode omits 3, 5 and 6, and graphics II replaces 3 and 4 by the two
    /// hardware-legal values.
    pub fn for_mode(mode: Mode, register0: u8, register1: u8, tables: &TableAddresses, color: u8) -> Self {
        let mut plan = RegisterPlan {
            writes: [(0, 0); reg::COUNT as usize],
            len: 0,
        };

        plan.push(reg::MODE0, register0);
        plan.push(reg::MODE1, register1);
        plan.push(reg::NAME_TABLE, tables.register_value(Table::Name));

        match mode {
            Mode::GraphicsII => {
                plan.push(reg::COLOR_TABLE, graphics2_color_register(tables.color));
                plan.push(reg::PATTERN_TABLE, graphics2_pattern_register(tables.pattern));
            }
            _ => {
                if mode.has_color_table() {
                    plan.push(reg::COLOR_TABLE, tables.register_value(Table::Color));
                }
                plan.push(reg::PATTERN_TABLE, tables.register_value(Table::Pattern));
            }
        }

        if mode.has_sprites() {
            plan.push(reg::SPRITE_ATTRIBUTE, tables.register_value(Table::SpriteAttribute));
            plan.push(reg::SPRITE_PATTERN, tables.register_value(Table::SpritePattern));
        }

        plan.push(reg::COLOR, color);
        plan
    }

    fn push(&mut self, index: u8, value: u8) {
        self.writes[self.len] = (index, value);
        self.len += 1;
    }

    /// Writes in issue order
    pub fn as_slice(&self) -> &[(u8, u8)] {
        &self.writes[..self.len]
    }

    /// Value planned for register `index`, if it is written at all
    pub fn value_of(&self, index: u8) -> Option<u8> {
        self.as_slice()
            .iter()
            .find(|(r, _)| *r == index)
            .map(|&(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plan(mode: Mode, tables: &TableAddresses) -> RegisterPlan {
        RegisterPlan::for_mode(
            mode,
            mode.register0_bits(),
            mode.merge_register1(0xC0),
            tables,
            0x4B,
        )
    }

    #[test]
    fn test_mode_bits() {
        assert_eq!(Mode::GraphicsI.register0_bits(), 0x00);
        assert_eq!(Mode::GraphicsII.register0_bits(), 0x02);
        assert_eq!(Mode::Bitmap.register0_bits(), 0x00);
        assert_eq!(Mode::Text.register0_bits(), 0x00);

        assert_eq!(Mode::GraphicsI.register1_bits(), 0x00);
        assert_eq!(Mode::GraphicsII.register1_bits(), 0x00);
        assert_eq!(Mode::Bitmap.register1_bits(), 0x08);
        assert_eq!(Mode::Text.register1_bits(), 0x10);
    }

    #[test]
    fn test_merge_register1_keeps_flags() {
        // All flag bits set, stale mode bits set
        assert_eq!(Mode::GraphicsI.merge_register1(0xFF), 0xE3);
        assert_eq!(Mode::Text.merge_register1(0xFF), 0xF3);
        assert_eq!(Mode::Bitmap.merge_register1(0x00), 0x08);
    }

    #[test]
    fn test_mode_from_code() {
        for mode in [Mode::GraphicsI, Mode::GraphicsII, Mode::Bitmap, Mode::Text] {
            assert_eq!(Mode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(Mode::from_code(3), None);
        assert_eq!(Mode::from_code(5), None);
    }

    #[test]
    fn test_default_table_register_values() {
        let tables = TableAddresses::default();
        assert_eq!(tables.register_value(Table::Name), 0x0E);
        assert_eq!(tables.register_value(Table::Color), 0x80);
        assert_eq!(tables.register_value(Table::Pattern), 0x00);
        assert_eq!(tables.register_value(Table::SpriteAttribute), 0x76);
        assert_eq!(tables.register_value(Table::SpritePattern), 0x03);
    }

    #[test]
    fn test_graphics1_plan() {
        let p = plan(Mode::GraphicsI, &TableAddresses::default());
        assert_eq!(
            p.as_slice(),
            &[
                (0, 0x00),
                (1, 0xC0),
                (2, 0x0E),
                (3, 0x80),
                (4, 0x00),
                (5, 0x76),
                (6, 0x03),
                (7, 0x4B),
            ]
        );
    }

    #[test]
    fn test_graphics2_forced_values_zero_base() {
        let tables = TableAddresses {
            color: 0x0000,
            pattern: 0x0000,
            ..TableAddresses::default()
        };
        let p = plan(Mode::GraphicsII, &tables);
        assert_eq!(p.value_of(reg::MODE0), Some(0x02));
        assert_eq!(p.value_of(reg::COLOR_TABLE), Some(0x7F));
        assert_eq!(p.value_of(reg::PATTERN_TABLE), Some(0x03));
    }

    #[test]
    fn test_graphics2_forced_values_nonzero_base() {
        // Arbitrary bases collapse onto the upper legal value
        let tables = TableAddresses {
            color: 0x1234,
            pattern: 0x0800,
            ..TableAddresses::default()
        };
        let p = plan(Mode::GraphicsII, &tables);
        assert_eq!(p.value_of(reg::COLOR_TABLE), Some(0xFF));
        assert_eq!(p.value_of(reg::PATTERN_TABLE), Some(0x07));
    }

    #[test]
    fn test_text_plan_skips_color_and_sprite_tables() {
        let p = plan(Mode::Text, &TableAddresses::default());
        let indices: Vec<u8> = p.as_slice().iter().map(|&(r, _)| r).collect();
        assert_eq!(indices, vec![0, 1, 2, 4, 7]);
        assert_eq!(p.value_of(reg::MODE1), Some(0xD0));
    }

    #[test]
    fn test_bitmap_plan_programs_every_register() {
        let p = plan(Mode::Bitmap, &TableAddresses::default());
        let indices: Vec<u8> = p.as_slice().iter().map(|&(r, _)| r).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(p.value_of(reg::MODE1), Some(0xC8));
    }

    #[test]
    fn test_color_register_always_last() {
        for mode in [Mode::GraphicsI, Mode::GraphicsII, Mode::Bitmap, Mode::Text] {
            let p = plan(mode, &TableAddresses::default());
            assert_eq!(p.as_slice().last(), Some(&(reg::COLOR, 0x4B)));
        }
    }

    #[test]
    fn test_sprite_size_geometry() {
        assert_eq!(SpriteSize::Small.pixels(), 8);
        assert_eq!(SpriteSize::Large.pixels(), 16);
        assert_eq!(SpriteSize::Large.pattern_bytes(), 32);
    }
}
