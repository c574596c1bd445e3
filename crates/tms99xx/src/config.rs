//! Bring-up configuration: pin roles, port set, chip variant and timing

use crate::error::{ConfigError, ConfigResult};
use crate::registers::r1;

/// Bit index of each VDP signal on its port
///
/// The strobes, mode and reset lines live on the control-output port; the
/// interrupt line lives on the interrupt-input port. Every index is 0-7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinMap {
    /// Active-low CSR (read strobe)
    pub read_strobe: u8,
    /// Active-low CSW (write strobe)
    pub write_strobe: u8,
    /// MODE: high selects the control port, low the data port
    pub mode: u8,
    /// Active-low RESET
    pub reset: u8,
    /// Active-low INT, on the interrupt-input port
    pub interrupt: u8,
}

impl PinMap {
    pub const fn new(read_strobe: u8, write_strobe: u8, mode: u8, reset: u8, interrupt: u8) -> Self {
        PinMap {
            read_strobe,
            write_strobe,
            mode,
            reset,
            interrupt,
        }
    }

    /// Check every index is a real bit and no two control roles share one
    pub fn validate(&self) -> ConfigResult<()> {
        let control = self.control_roles();
        let interrupt = ("interrupt", self.interrupt);
        for &(role, bit) in control.iter().chain(core::iter::once(&interrupt)) {
            if bit > 7 {
                return Err(ConfigError::out_of_range(role, bit));
            }
        }
        for (i, &(first, a)) in control.iter().enumerate() {
            for &(second, b) in &control[i + 1..] {
                if a == b {
                    return Err(ConfigError::conflict(first, second, a));
                }
            }
        }
        Ok(())
    }

    /// Mask of the four output lines on the control port
    pub(crate) fn control_mask(&self) -> u8 {
        self.control_roles()
            .iter()
            .fold(0, |mask, &(_, bit)| mask | (1 << bit))
    }

    fn control_roles(&self) -> [(&'static str, u8); 4] {
        [
            ("read strobe", self.read_strobe),
            ("write strobe", self.write_strobe),
            ("mode", self.mode),
            ("reset", self.reset),
        ]
    }
}

impl Default for PinMap {
    /// Reference board wiring: CSR=3, CSW=2, MODE=0, RESET=1, INT=6
    fn default() -> Self {
        PinMap::new(3, 2, 0, 1, 6)
    }
}

/// The registers the driver is bound to
///
/// Any entry left as `None` makes [`crate::Tms99xx::init_ports`] a no-op.
/// `data_in` may be the same register as `data_out` on parts whose output
/// latch reads back the pin levels.
///
/// Direction registers follow the PIC TRIS convention: a set bit is an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ports<P> {
    pub data_out: Option<P>,
    pub data_in: Option<P>,
    pub data_dir: Option<P>,
    pub control_out: Option<P>,
    pub control_dir: Option<P>,
    pub interrupt_in: Option<P>,
    pub interrupt_dir: Option<P>,
}

impl<P> Default for Ports<P> {
    fn default() -> Self {
        Ports {
            data_out: None,
            data_in: None,
            data_dir: None,
            control_out: None,
            control_dir: None,
            interrupt_in: None,
            interrupt_dir: None,
        }
    }
}

/// Order of the mode line relative to the strobe in a control framing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Sequencing {
    /// MODE is raised before the first strobe and held across the whole
    /// two-byte framing
    #[default]
    ModeFirst,
    /// Each byte pulls its strobe low first, raises MODE inside the pulse and
    /// drops it again after the strobe returns high
    StrobeFirst,
}

/// Meaning of the BLANK bit (register 1, bit 6)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlankPolarity {
    /// Bit set enables the display; clear blanks it
    #[default]
    SetEnablesDisplay,
    /// Bit set blanks the display
    SetBlanks,
}

impl BlankPolarity {
    /// Register 1 with the blank bit encoding `blank`
    pub const fn apply(self, register1: u8, blank: bool) -> u8 {
        let set = match self {
            BlankPolarity::SetEnablesDisplay => !blank,
            BlankPolarity::SetBlanks => blank,
        };
        if set {
            register1 | (1 << r1::BLANK)
        } else {
            register1 & !(1 << r1::BLANK)
        }
    }

    /// Whether `register1` leaves the display blanked
    pub const fn is_blanked(self, register1: u8) -> bool {
        let set = register1 & (1 << r1::BLANK) != 0;
        match self {
            BlankPolarity::SetEnablesDisplay => !set,
            BlankPolarity::SetBlanks => set,
        }
    }
}

/// Chip generation: bus sequencing plus blank-bit polarity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Variant {
    pub sequencing: Sequencing,
    pub blank_polarity: BlankPolarity,
}

impl Variant {
    /// TMS9918A/9928A/9929A wired through the TMS99XX driver generation
    pub const TMS99XX: Variant = Variant {
        sequencing: Sequencing::ModeFirst,
        blank_polarity: BlankPolarity::SetEnablesDisplay,
    };

    /// TMS9928 wired through the earlier driver generation
    pub const TMS9928: Variant = Variant {
        sequencing: Sequencing::StrobeFirst,
        blank_polarity: BlankPolarity::SetBlanks,
    };
}

/// Empirical timing constants
///
/// The defaults assume a 48 MHz host talking to a VDP on a 10.7 MHz crystal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusTiming {
    /// Worst-case gap between data bytes when transfers are not paced by
    /// the frame interrupt
    pub inter_byte_delay_us: u32,
    /// Bytes that fit in one access window after the frame interrupt
    pub window_budget: usize,
    /// Width of the reset pulse
    pub reset_pulse_us: u32,
}

impl Default for BusTiming {
    fn default() -> Self {
        BusTiming {
            inter_byte_delay_us: 8,
            window_budget: 1000,
            reset_pulse_us: 3,
        }
    }
}
