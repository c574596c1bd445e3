//! Bit-banged bus engine
//!
//! Everything that moves a byte between host and VDP goes through [`Bus`]:
//! single-line control toggles, two-byte control framings (register writes
//! and address latches), data strobes, and the status read.

use crate::config::{PinMap, Ports, Sequencing};
use crate::error::{ConfigError, ConfigResult};
use crate::port::Port;
use crate::registers::{ADDRESS_MASK, tag};
use crate::transfer::Access;

/// Direction register value with every data line an input
pub(crate) const DIR_INPUT: u8 = 0xFF;
/// Direction register value with every data line an output
pub(crate) const DIR_OUTPUT: u8 = 0x00;

/// Ports and pin roles of one bound VDP
#[derive(Debug)]
pub(crate) struct Bus<P> {
    data_out: P,
    data_in: P,
    data_dir: P,
    control: P,
    interrupt: P,
    pins: PinMap,
    sequencing: Sequencing,
}

impl<P: Port> Bus<P> {
    /// Take the port set apart, configure directions and keep what the
    /// protocol needs at run time.
    ///
    /// Control lines become outputs, the interrupt line an input, and the
    /// data bus idles as an output.
    pub(crate) fn bind(ports: Ports<P>, pins: PinMap, sequencing: Sequencing) -> ConfigResult<Self> {
        let Ports {
            data_out,
            data_in,
            data_dir,
            control_out,
            control_dir,
            interrupt_in,
            interrupt_dir,
        } = ports;

        let data_out = data_out.ok_or(ConfigError::MissingPort("data output"))?;
        let data_in = data_in.ok_or(ConfigError::MissingPort("data input"))?;
        let data_dir = data_dir.ok_or(ConfigError::MissingPort("data direction"))?;
        let control = control_out.ok_or(ConfigError::MissingPort("control output"))?;
        let control_dir = control_dir.ok_or(ConfigError::MissingPort("control direction"))?;
        let interrupt = interrupt_in.ok_or(ConfigError::MissingPort("interrupt input"))?;
        let interrupt_dir = interrupt_dir.ok_or(ConfigError::MissingPort("interrupt direction"))?;

        let mask = pins.control_mask();
        control_dir.modify(|v| v & !mask);
        interrupt_dir.modify(|v| v | (1 << pins.interrupt));
        data_dir.write(DIR_OUTPUT);

        Ok(Bus {
            data_out,
            data_in,
            data_dir,
            control,
            interrupt,
            pins,
            sequencing,
        })
    }

    pub(crate) fn pins(&self) -> &PinMap {
        &self.pins
    }

    /// Drive one control line high, leaving the others alone
    #[inline]
    pub(crate) fn set_bit(&self, bit: u8) {
        self.control.modify(|v| v | (1 << bit));
    }

    /// Drive one control line low, leaving the others alone
    #[inline]
    pub(crate) fn clear_bit(&self, bit: u8) {
        self.control.modify(|v| v & !(1 << bit));
    }

    /// Put the bus in its idle state: data latch cleared, reset asserted,
    /// mode on the data port, both strobes released.
    pub(crate) fn idle(&self) {
        self.data_out.write(0x00);
        self.clear_bit(self.pins.reset);
        self.clear_bit(self.pins.mode);
        self.set_bit(self.pins.read_strobe);
        self.set_bit(self.pins.write_strobe);
    }

    /// Assert reset, hold it for `hold`, release it
    pub(crate) fn reset_pulse(&self, hold: impl FnOnce()) {
        self.clear_bit(self.pins.reset);
        hold();
        self.set_bit(self.pins.reset);
    }

    /// Emit a two-byte control framing
    pub(crate) fn write_control(&self, first: u8, second: u8) {
        match self.sequencing {
            Sequencing::ModeFirst => {
                self.set_bit(self.pins.mode);
                self.strobe_write(first);
                self.strobe_write(second);
                self.clear_bit(self.pins.mode);
            }
            Sequencing::StrobeFirst => {
                for byte in [first, second] {
                    self.data_out.write(byte);
                    self.clear_bit(self.pins.write_strobe);
                    self.set_bit(self.pins.mode);
                    self.set_bit(self.pins.write_strobe);
                    self.clear_bit(self.pins.mode);
                }
            }
        }
    }

    /// Write `value` into register `index` (caller guarantees 0-7)
    pub(crate) fn write_register(&self, index: u8, value: u8) {
        log::trace!("R{index} <- {value:#04x}");
        self.write_control(value, tag::REGISTER | index);
    }

    /// Latch the memory cursor
    pub(crate) fn latch_address(&self, address: u16, access: Access) {
        let address = address & ADDRESS_MASK;
        log::trace!("cursor <- {address:#06x} ({access:?})");
        self.write_control(
            (address & 0xFF) as u8,
            access.tag() | ((address >> 8) as u8 & tag::ADDR_HIGH_MASK),
        );
    }

    /// Place one byte on the bus and pulse the write strobe
    #[inline]
    pub(crate) fn strobe_write(&self, value: u8) {
        self.data_out.write(value);
        self.clear_bit(self.pins.write_strobe);
        self.set_bit(self.pins.write_strobe);
    }

    /// Pulse the read strobe and sample the bus while it is low
    #[inline]
    pub(crate) fn strobe_read(&self) -> u8 {
        self.clear_bit(self.pins.read_strobe);
        let value = self.data_in.read();
        self.set_bit(self.pins.read_strobe);
        value
    }

    /// Set the data bus direction, returning the previous setting
    pub(crate) fn set_direction(&self, dir: u8) -> u8 {
        let prior = self.data_dir.read();
        self.data_dir.write(dir);
        prior
    }

    /// Read the status register.
    ///
    /// The data bus is turned around for the read and put back the way it
    /// was found.
    pub(crate) fn read_status(&self) -> u8 {
        let prior = self.set_direction(DIR_INPUT);
        let value = match self.sequencing {
            Sequencing::ModeFirst => {
                self.set_bit(self.pins.mode);
                let value = self.strobe_read();
                self.clear_bit(self.pins.mode);
                value
            }
            Sequencing::StrobeFirst => {
                self.clear_bit(self.pins.read_strobe);
                self.set_bit(self.pins.mode);
                let value = self.data_in.read();
                self.set_bit(self.pins.read_strobe);
                self.clear_bit(self.pins.mode);
                value
            }
        };
        self.data_dir.write(prior);
        value
    }

    /// INT is active low
    #[inline]
    pub(crate) fn interrupt_pending(&self) -> bool {
        self.interrupt.read() & (1 << self.pins.interrupt) == 0
    }

    /// Spin until the frame interrupt opens the access window. No timeout.
    pub(crate) fn wait_for_interrupt(&self) {
        while !self.interrupt_pending() {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;
    use crate::sim::{BusEvent, SimBus};
    use pretty_assertions::assert_eq;

    fn bound(sim: &SimBus, sequencing: Sequencing) -> Bus<crate::sim::SimPort<'_>> {
        Bus::bind(sim.ports(), PinMap::default(), sequencing).unwrap()
    }

    #[test]
    fn test_bind_configures_directions() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        sim.preset_directions(0xFF, 0xFF, 0x00);
        let _bus = bound(&sim, Sequencing::ModeFirst);
        assert_eq!(sim.data_direction(), DIR_OUTPUT);
        // CSR=3, CSW=2, MODE=0, RESET=1 outputs; bits 4-7 untouched
        assert_eq!(sim.control_direction(), 0xF0);
        assert_eq!(sim.interrupt_direction(), 0x40);
    }

    #[test]
    fn test_bind_reports_missing_port() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let mut ports = sim.ports();
        ports.interrupt_dir = None;
        let err = Bus::bind(ports, PinMap::default(), Sequencing::ModeFirst).unwrap_err();
        assert_eq!(err, ConfigError::MissingPort("interrupt direction"));
    }

    #[test]
    fn test_set_and_clear_bit_preserve_neighbours() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let bus = bound(&sim, Sequencing::ModeFirst);
        bus.idle();
        let before = sim.control_latch();
        bus.set_bit(5);
        assert_eq!(sim.control_latch(), before | 0x20);
        bus.clear_bit(5);
        assert_eq!(sim.control_latch(), before);
    }

    #[test]
    fn test_idle_levels() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let bus = bound(&sim, Sequencing::ModeFirst);
        bus.idle();
        // CSR and CSW high, MODE and RESET low
        assert_eq!(sim.control_latch() & 0x0F, 0b1100);
        assert!(!sim.mode_line());
    }

    #[test]
    fn test_register_framing_both_sequencings() {
        for sequencing in [Sequencing::ModeFirst, Sequencing::StrobeFirst] {
            let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
            let bus = bound(&sim, sequencing);
            bus.idle();
            sim.clear_events();

            bus.write_register(5, 0x76);
            assert_eq!(sim.control_bytes(), vec![0x76, 0x85], "{sequencing:?}");
            assert_eq!(sim.register(5), 0x76);
            assert!(!sim.mode_line());
        }
    }

    #[test]
    fn test_mode_first_holds_mode_across_both_bytes() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let bus = bound(&sim, Sequencing::ModeFirst);
        bus.idle();
        sim.clear_events();
        bus.write_register(1, 0xE0);
        // Mode went high once and low once around two strobes
        assert_eq!(sim.mode_edges(), 2);
    }

    #[test]
    fn test_strobe_first_toggles_mode_per_byte() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let bus = bound(&sim, Sequencing::StrobeFirst);
        bus.idle();
        sim.clear_events();
        bus.write_register(1, 0xE0);
        assert_eq!(sim.mode_edges(), 4);
    }

    #[test]
    fn test_latch_address_masks_to_14_bits() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let bus = bound(&sim, Sequencing::ModeFirst);
        bus.idle();
        sim.clear_events();
        bus.latch_address(0xFFFF, Access::Write);
        assert_eq!(sim.control_bytes(), vec![0xFF, 0x7F]);
        assert_eq!(sim.address(), 0x3FFF);
    }

    #[test]
    fn test_status_read_restores_direction() {
        for sequencing in [Sequencing::ModeFirst, Sequencing::StrobeFirst] {
            let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
            let bus = bound(&sim, sequencing);
            bus.idle();
            sim.clear_events();
            sim.raise_frame();

            let status = bus.read_status();
            assert_eq!(status & 0x80, 0x80, "{sequencing:?}");
            assert_eq!(sim.data_direction(), DIR_OUTPUT);
            assert!(!sim.mode_line());
            assert_eq!(sim.events(), vec![BusEvent::Status(status)]);
            assert!(sim.faults().is_empty());
        }
    }

    #[test]
    fn test_interrupt_pending_is_active_low() {
        let sim = SimBus::new(PinMap::default(), Variant::TMS99XX);
        let bus = bound(&sim, Sequencing::ModeFirst);
        bus.idle();
        // Interrupt enabled, display blanked
        bus.write_register(1, 0x20);
        assert!(!bus.interrupt_pending());
        sim.raise_frame();
        assert!(bus.interrupt_pending());
        bus.read_status();
        assert!(!bus.interrupt_pending());
    }
}
