//! Configuration error types
//!
//! The operation catalog never returns these: a driver call with bad input
//! logs a warning and does nothing. They exist for bring-up code that wants
//! to reject a wiring description before handing it to the driver.

use thiserror::Error;

/// Wiring or port-set problem found while binding the driver
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{role} pin index {bit} is out of range (0-7)")]
    PinOutOfRange { role: &'static str, bit: u8 },

    #[error("{first} and {second} pins share control bit {bit}")]
    PinConflict {
        first: &'static str,
        second: &'static str,
        bit: u8,
    },

    #[error("{0} port is missing")]
    MissingPort(&'static str),
}

impl ConfigError {
    pub fn out_of_range(role: &'static str, bit: u8) -> Self {
        Self::PinOutOfRange { role, bit }
    }

    pub fn conflict(first: &'static str, second: &'static str, bit: u8) -> Self {
        Self::PinConflict { first, second, bit }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
