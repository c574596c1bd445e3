//! # tms99xx - TMS9918/9928/9929 VDP driver
//!
//! Drives a TI TMS99xx video display processor over a bit-banged 8-bit
//! parallel bus: one data port, four control lines (read strobe, write
//! strobe, mode, reset) and the frame interrupt line.
//!
//! ## Features
//!
//! - **Bring-up**: pin binding, reset pulse, full register programming
//! - **Modes**: Graphics I, Graphics II, multicolor and text, with the
//!   hardware-forced table bases of Graphics II applied automatically
//! - **Transfers**: bulk and cyclic reads/writes paced either by the frame
//!   interrupt (one access window per burst) or by a fixed per-byte delay
//! - **Tables**: explicit accessors for color pairs, multicolor patterns and
//!   sprite attributes
//! - **Simulation**: with the `sim` feature, a pin-level chip model that
//!   records every bus transaction
//!
//! ## Quick Start
//!
//! ```no_run
//! use tms99xx::prelude::*;
//!
//! # fn board() -> (Ports<MmioPort>, SpinDelay) { unimplemented!() }
//! let (ports, delay) = board();
//! let mut vdp = Tms99xx::new(delay, Variant::TMS99XX, BusTiming::default());
//! vdp.init_ports(ports, PinMap::default());
//! vdp.init_device(Mode::GraphicsI, 0xE0, Color::WHITE, Color::DARK_BLUE);
//!
//! vdp.clear_memory();
//! vdp.set_memory_address(0x3800, Access::Write);
//! let written = vdp.write_memory(b"HELLO");
//! assert_eq!(written, 5);
//! ```
//!
//! ## Modules
//!
//! - [`vdp`] - Device state, mode and register operations
//! - [`transfer`] - Window-aware memory transfers
//! - [`registers`] - Register layout and mode derivation
//! - [`tables`] - Palette and table entry layouts
//! - [`config`] - Pins, ports, chip variant and timing
//! - [`port`] - Register and delay traits

#![cfg_attr(not(any(test, feature = "sim")), no_std)]

mod bus;
pub mod config;
pub mod error;
pub mod port;
pub mod registers;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod status;
pub mod tables;
pub mod transfer;
pub mod vdp;

pub use config::{BlankPolarity, BusTiming, PinMap, Ports, Sequencing, Variant};
pub use error::{ConfigError, ConfigResult};
pub use port::{DelayUs, MmioPort, Port, SpinDelay};
pub use registers::{Mode, SpriteSize, Table, TableAddresses};
pub use status::Status;
pub use tables::{Color, ColorPair};
pub use transfer::{Access, Pacing, TransferRequest};
pub use vdp::Tms99xx;

/// Convenient re-exports for common usage
///
/// Import everything you need with:
/// ```
/// use tms99xx::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{BusTiming, PinMap, Ports, Variant};
    pub use crate::port::{DelayUs, MmioPort, Port, SpinDelay};
    pub use crate::registers::{Mode, SpriteSize, Table, TableAddresses};
    pub use crate::tables::{Color, ColorPair, SpriteAttribute};
    pub use crate::transfer::Access;
    pub use crate::vdp::Tms99xx;
}

/// Driver version information
pub mod version {
    /// Major version number
    pub const MAJOR: u8 = 0;
    /// Minor version number
    pub const MINOR: u8 = 1;
    /// Patch version number
    pub const PATCH: u8 = 0;
    /// Version as string
    pub const STRING: &str = "0.1.0";
}
