//! TMS99xx device state and configuration operations
//!
//! [`Tms99xx`] owns the bound bus plus mirrors of the write-only registers
//! the driver has to read-modify-write (register 0, register 1 and the color
//! register). Operations on an instance that was never bound, or whose
//! binding failed, do nothing and log a warning.

use crate::bus::Bus;
use crate::config::{BusTiming, PinMap, Ports, Variant};
use crate::port::{DelayUs, Port};
use crate::registers::{Mode, RegisterPlan, SpriteSize, Table, TableAddresses, r0, r1, reg};
use crate::status::Status;
use crate::tables::{Color, ColorPair};
use crate::transfer::Access;

/// Base address the hardware substitutes for graphics II's color and
/// pattern tables when the configured base is non-zero
const GRAPHICS2_UPPER_BASE: u16 = 0x2000;

/// One TMS9918A/9928A/9929A attached through bit-banged GPIO
#[derive(Debug)]
pub struct Tms99xx<P, D> {
    pub(crate) bus: Option<Bus<P>>,
    pub(crate) delay: D,
    pub(crate) variant: Variant,
    pub(crate) timing: BusTiming,
    tables: TableAddresses,
    mode: Option<Mode>,
    register0: u8,
    pub(crate) register1: u8,
    color: ColorPair,
}

impl<P: Port, D: DelayUs> Tms99xx<P, D> {
    /// Create an unbound instance. Call [`init_ports`](Self::init_ports)
    /// and [`init_device`](Self::init_device) before anything else.
    pub fn new(delay: D, variant: Variant, timing: BusTiming) -> Self {
        Tms99xx {
            bus: None,
            delay,
            variant,
            timing,
            tables: TableAddresses::default(),
            mode: None,
            register0: 0,
            register1: 1 << r1::MEM_16K,
            color: ColorPair::default(),
        }
    }

    /// Bind the port set and configure pin directions.
    ///
    /// A missing port or an invalid pin map leaves the instance unbound.
    pub fn init_ports(&mut self, ports: Ports<P>, pins: PinMap) {
        if let Err(err) = pins.validate() {
            log::warn!("VDP not bound: {err}");
            return;
        }
        match Bus::bind(ports, pins, self.variant.sequencing) {
            Ok(bus) => {
                log::debug!("VDP bound: {pins:?}, {:?}", self.variant);
                self.bus = Some(bus);
            }
            Err(err) => log::warn!("VDP not bound: {err}"),
        }
    }

    /// Bring the bus to idle, reset the chip and apply `mode`.
    ///
    /// `flags` becomes register 1 (its mode bits are replaced); the color
    /// register becomes `text_color` over `background`.
    pub fn init_device(&mut self, mode: Mode, flags: u8, text_color: Color, background: Color) {
        let Some(bus) = self.bus.as_ref() else {
            log::warn!("init_device on unbound VDP ignored");
            return;
        };
        bus.idle();
        self.color = ColorPair::new(text_color, background);
        self.reset();
        self.set_mode(mode, flags);
    }

    /// Pulse the reset line for the configured width
    pub fn reset(&mut self) {
        let Some(bus) = self.bus.as_ref() else {
            log::warn!("reset on unbound VDP ignored");
            return;
        };
        let us = self.timing.reset_pulse_us;
        bus.reset_pulse(|| self.delay.delay_us(us));
    }

    /// Switch to `mode` with `flags` as the new register 1 and program every
    /// register the mode uses
    pub fn set_mode(&mut self, mode: Mode, flags: u8) {
        let Some(bus) = self.bus.as_ref() else {
            log::warn!("set_mode on unbound VDP ignored");
            return;
        };
        self.mode = Some(mode);
        self.register0 = (self.register0 & !(1 << r0::M3)) | mode.register0_bits();
        self.register1 = mode.merge_register1(flags);

        let plan = RegisterPlan::for_mode(mode, self.register0, self.register1, &self.tables, self.color.0);
        log::debug!("applying {mode:?}: {:?}", plan.as_slice());
        for &(index, value) in plan.as_slice() {
            bus.write_register(index, value);
        }
    }

    /// Replace the table bases used by the next [`set_mode`](Self::set_mode)
    pub fn set_table_addresses(&mut self, tables: TableAddresses) {
        self.tables = tables;
    }

    /// Blank or show the display
    pub fn set_blank(&mut self, blank: bool) {
        let value = self.variant.blank_polarity.apply(self.register1, blank);
        self.update_register1(value);
    }

    /// Enable or disable the frame interrupt
    pub fn set_irq_enable(&mut self, enable: bool) {
        self.update_register1(with_bit(self.register1, r1::IRQ, enable));
    }

    pub fn set_sprite_size(&mut self, size: SpriteSize) {
        self.update_register1(with_bit(self.register1, r1::SPRITE_SIZE, size == SpriteSize::Large));
    }

    pub fn set_sprite_magnify(&mut self, magnify: bool) {
        self.update_register1(with_bit(self.register1, r1::SPRITE_MAG, magnify));
    }

    /// Text color in text mode (register 7 high nibble)
    pub fn set_text_color(&mut self, color: Color) {
        self.update_color(self.color.with_foreground(color));
    }

    /// Backdrop color (register 7 low nibble)
    pub fn set_background_color(&mut self, color: Color) {
        self.update_color(self.color.with_background(color));
    }

    /// Write a register directly. The mirrors are not updated.
    pub fn set_register(&mut self, index: u8, value: u8) {
        let Some(bus) = self.bus.as_ref() else {
            log::warn!("write to R{index} on unbound VDP ignored");
            return;
        };
        if index >= reg::COUNT {
            log::warn!("no register R{index}, write of {value:#04x} ignored");
            return;
        }
        bus.write_register(index, value);
    }

    /// Move the VDP's memory cursor. Addresses wrap at 16 KiB.
    pub fn set_memory_address(&mut self, address: u16, access: Access) {
        let Some(bus) = self.bus.as_ref() else {
            log::warn!("cursor move on unbound VDP ignored");
            return;
        };
        bus.latch_address(address, access);
    }

    /// Write `data` as consecutive `entry_size`-byte entries of `table`,
    /// starting at entry `first`. Returns the bytes written.
    ///
    /// In graphics II the color and pattern tables are addressed at the base
    /// the hardware actually uses.
    pub fn write_table_data(&mut self, table: Table, first: u16, entry_size: u16, data: &[u8]) -> usize {
        let address = self
            .table_base(table)
            .wrapping_add(first.wrapping_mul(entry_size));
        self.set_memory_address(address, Access::Write);
        self.write_memory(data)
    }

    /// Base address the chip reads `table` from in the current mode
    pub fn table_base(&self, table: Table) -> u16 {
        let base = self.tables.get(table);
        match (self.mode, table) {
            (Some(Mode::GraphicsII), Table::Color | Table::Pattern) => {
                if base == 0 { 0 } else { GRAPHICS2_UPPER_BASE }
            }
            _ => base,
        }
    }

    /// Read the status register, clearing the frame flag and the interrupt.
    /// Returns 0 when unbound.
    pub fn read_status(&mut self) -> u8 {
        match self.bus.as_ref() {
            Some(bus) => bus.read_status(),
            None => {
                log::warn!("status read on unbound VDP ignored");
                0
            }
        }
    }

    /// [`read_status`](Self::read_status), decoded
    pub fn status(&mut self) -> Status {
        Status(self.read_status())
    }

    pub fn is_bound(&self) -> bool {
        self.bus.is_some()
    }

    /// Mode last applied, if any
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn register0(&self) -> u8 {
        self.register0
    }

    pub fn register1(&self) -> u8 {
        self.register1
    }

    pub fn color(&self) -> ColorPair {
        self.color
    }

    pub fn tables(&self) -> &TableAddresses {
        &self.tables
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    /// Pin roles of the bound bus
    pub fn pins(&self) -> Option<&PinMap> {
        self.bus.as_ref().map(Bus::pins)
    }

    fn update_register1(&mut self, value: u8) {
        let Some(bus) = self.bus.as_ref() else {
            log::warn!("register 1 update on unbound VDP ignored");
            return;
        };
        self.register1 = value;
        bus.write_register(reg::MODE1, value);
    }

    fn update_color(&mut self, color: ColorPair) {
        let Some(bus) = self.bus.as_ref() else {
            log::warn!("color update on unbound VDP ignored");
            return;
        };
        self.color = color;
        bus.write_register(reg::COLOR, color.0);
    }
}

#[inline]
const fn with_bit(value: u8, bit: u8, on: bool) -> u8 {
    if on { value | (1 << bit) } else { value & !(1 << bit) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sequencing;
    use crate::sim::{BusEvent, CountingDelay, SimBus, SimPort};
    use crate::tables::{SpriteAttribute, entry};
    use pretty_assertions::assert_eq;

    const FLAGS: u8 = 0xC0;

    fn unbound() -> Tms99xx<SimPort<'static>, CountingDelay> {
        Tms99xx::new(CountingDelay::default(), Variant::TMS99XX, BusTiming::default())
    }

    fn bound(sim: &SimBus, variant: Variant) -> Tms99xx<SimPort<'_>, CountingDelay> {
        let mut vdp = Tms99xx::new(CountingDelay::default(), variant, BusTiming::default());
        vdp.init_ports(sim.ports(), PinMap::default());
        vdp
    }

    fn registers_written(sim: &SimBus) -> Vec<u8> {
        sim.events()
            .iter()
            .filter_map(|e| match e {
                BusEvent::Register { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_init_ports_binds() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let vdp = bound(&sim, Variant::TMS99XX);
        assert!(vdp.is_bound());
        assert_eq!(vdp.pins(), Some(&PinMap::default()));
    }

    #[test]
    fn test_init_ports_missing_port_leaves_unbound() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut ports = sim.ports();
        ports.data_in = None;
        let mut vdp = Tms99xx::new(CountingDelay::default(), Variant::TMS99XX, BusTiming::default());
        vdp.init_ports(ports, PinMap::default());
        assert!(!vdp.is_bound());
        assert!(sim.events().is_empty());
    }

    #[test]
    fn test_init_ports_rejects_bad_pins() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        sim.preset_directions(0xFF, 0xFF, 0x00);
        let mut vdp = Tms99xx::new(CountingDelay::default(), Variant::TMS99XX, BusTiming::default());
        vdp.init_ports(sim.ports(), PinMap::new(3, 3, 0, 1, 6));
        assert!(!vdp.is_bound());
        // Nothing was touched
        assert_eq!(sim.control_direction(), 0xFF);
    }

    #[test]
    fn test_init_device_sequence() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsI, FLAGS, Color::WHITE, Color::DARK_BLUE);

        assert_eq!(sim.events().first(), Some(&BusEvent::Reset));
        assert_eq!(registers_written(&sim), vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(sim.register(1), 0xC0);
        assert_eq!(sim.register(7), 0xF4);
        assert_eq!(vdp.mode(), Some(Mode::GraphicsI));
        assert_eq!(vdp.color(), ColorPair(0xF4));
        assert_eq!(vdp.delay.total_us, 3);
        assert!(!sim.mode_line());
        assert!(sim.faults().is_empty());
    }

    #[test]
    fn test_set_mode_graphics2_forced_tables() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsII, FLAGS, Color::WHITE, Color::BLACK);
        assert_eq!(sim.register(0), 0x02);
        // Default color base 0x2000 and pattern base 0x0000
        assert_eq!(sim.register(3), 0xFF);
        assert_eq!(sim.register(4), 0x03);

        vdp.set_table_addresses(TableAddresses {
            color: 0,
            pattern: 0x2000,
            ..TableAddresses::default()
        });
        vdp.set_mode(Mode::GraphicsII, FLAGS);
        assert_eq!(sim.register(3), 0x7F);
        assert_eq!(sim.register(4), 0x07);
        assert_eq!(vdp.table_base(Table::Color), 0x0000);
        assert_eq!(vdp.table_base(Table::Pattern), 0x2000);
    }

    #[test]
    fn test_set_mode_text_skips_tables() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsI, FLAGS, Color::WHITE, Color::BLACK);
        sim.clear_events();

        vdp.set_mode(Mode::Text, FLAGS);
        assert_eq!(registers_written(&sim), vec![0, 1, 2, 4, 7]);
        assert_eq!(sim.register(1), 0xD0);
        assert_eq!(vdp.register0(), 0x00);
    }

    #[test]
    fn test_set_mode_replaces_stale_mode_bits() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsII, FLAGS, Color::WHITE, Color::BLACK);
        vdp.set_mode(Mode::Bitmap, 0xFF);
        assert_eq!(vdp.register0(), 0x00);
        assert_eq!(vdp.register1(), 0xEB);
        assert_eq!(sim.register(1), 0xEB);
    }

    #[test]
    fn test_flag_setters_reprogram_register1() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsI, 0x80, Color::WHITE, Color::BLACK);

        vdp.set_blank(false);
        assert_eq!(sim.register(1), 0xC0);
        vdp.set_irq_enable(true);
        assert_eq!(sim.register(1), 0xE0);
        vdp.set_sprite_size(SpriteSize::Large);
        assert_eq!(sim.register(1), 0xE2);
        vdp.set_sprite_magnify(true);
        assert_eq!(sim.register(1), 0xE3);
        vdp.set_blank(true);
        assert_eq!(sim.register(1), 0xA3);
        vdp.set_irq_enable(false);
        vdp.set_sprite_size(SpriteSize::Small);
        vdp.set_sprite_magnify(false);
        assert_eq!(sim.register(1), 0x80);
        assert_eq!(vdp.register1(), 0x80);
    }

    #[test]
    fn test_blank_follows_variant_polarity() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS9928);
        let mut vdp = bound(&sim, Variant::TMS9928);
        vdp.init_device(Mode::GraphicsI, 0x80, Color::WHITE, Color::BLACK);
        vdp.set_blank(true);
        assert_eq!(sim.register(1), 0xC0);
        vdp.set_blank(false);
        assert_eq!(sim.register(1), 0x80);
    }

    #[test]
    fn test_color_setters() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::Text, FLAGS, Color::WHITE, Color::BLACK);
        vdp.set_text_color(Color::LIGHT_GREEN);
        assert_eq!(sim.register(7), 0x31);
        vdp.set_background_color(Color::DARK_BLUE);
        assert_eq!(sim.register(7), 0x34);
        assert_eq!(vdp.color().foreground(), Color::LIGHT_GREEN);
    }

    #[test]
    fn test_set_register_is_raw() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsI, FLAGS, Color::WHITE, Color::BLACK);
        sim.clear_events();

        vdp.set_register(1, 0x00);
        assert_eq!(sim.register(1), 0x00);
        assert_eq!(vdp.register1(), 0xC0);

        vdp.set_register(8, 0x12);
        assert_eq!(registers_written(&sim), vec![1]);
    }

    #[test]
    fn test_register_framing_every_index_and_byte() {
        for sequencing in [Sequencing::ModeFirst, Sequencing::StrobeFirst] {
            let variant = Variant {
                sequencing,
                ..Variant::TMS99XX
            };
            let sim = SimBus::new(PinMap::default(), variant);
            let mut vdp = bound(&sim, variant);
            vdp.init_device(Mode::GraphicsI, FLAGS, Color::WHITE, Color::BLACK);
            for index in 0..8u8 {
                for value in 0..=255u8 {
                    sim.clear_events();
                    vdp.set_register(index, value);
                    assert_eq!(sim.control_bytes(), vec![value, 0x80 | index]);
                    assert_eq!(sim.register(index), value);
                    assert!(!sim.mode_line());
                }
            }
            assert!(sim.faults().is_empty(), "{sequencing:?}");
        }
    }

    #[test]
    fn test_address_framing_both_directions() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsI, FLAGS, Color::WHITE, Color::BLACK);
        for address in (0..=0xFFFFu16).step_by(0x0123).chain([0x3FFF, 0x4000, 0xFFFF]) {
            for access in [Access::Read, Access::Write] {
                sim.clear_events();
                vdp.set_memory_address(address, access);
                let marker = if access == Access::Read { 0x00 } else { 0x40 };
                assert_eq!(
                    sim.control_bytes(),
                    vec![(address & 0xFF) as u8, marker | ((address >> 8) as u8 & 0x3F)]
                );
                assert_eq!(sim.address(), address & 0x3FFF);
            }
        }
    }

    #[test]
    fn test_write_table_data() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsI, FLAGS, Color::WHITE, Color::BLACK);

        let sprites = [
            SpriteAttribute::new(10, 20, 0, Color::LIGHT_RED),
            SpriteAttribute::terminator(),
        ];
        let bytes: Vec<u8> = sprites.iter().flat_map(SpriteAttribute::to_bytes).collect();
        let n = vdp.write_table_data(Table::SpriteAttribute, 2, entry::SPRITE_ATTRIBUTE, &bytes);
        assert_eq!(n, 8);
        assert_eq!(sim.vram(0x3B08..0x3B10), bytes);
    }

    #[test]
    fn test_status_clears_frame_flag() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut vdp = bound(&sim, Variant::TMS99XX);
        vdp.init_device(Mode::GraphicsI, FLAGS, Color::WHITE, Color::BLACK);
        sim.raise_frame();
        assert!(vdp.status().frame());
        assert!(!vdp.status().frame());
    }

    #[test]
    fn test_unbound_operations_are_noops() {
        let mut vdp = unbound();
        vdp.init_device(Mode::GraphicsII, FLAGS, Color::WHITE, Color::BLACK);
        vdp.reset();
        vdp.set_blank(true);
        vdp.set_irq_enable(true);
        vdp.set_sprite_size(SpriteSize::Large);
        vdp.set_sprite_magnify(true);
        vdp.set_text_color(Color::CYAN);
        vdp.set_background_color(Color::CYAN);
        vdp.set_register(1, 0xFF);
        vdp.set_memory_address(0x1234, Access::Write);
        assert_eq!(vdp.write_table_data(Table::Name, 0, entry::NAME, &[1, 2]), 0);
        vdp.clear_memory();
        assert_eq!(vdp.read_status(), 0);

        assert!(!vdp.is_bound());
        assert_eq!(vdp.mode(), None);
        assert_eq!(vdp.register1(), 0x80);
        assert_eq!(vdp.color(), ColorPair(0));
        assert_eq!(vdp.delay.calls, 0);
        assert_eq!(vdp.pins(), None);
    }
}
