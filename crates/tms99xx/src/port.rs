//! Hardware seam: 8-bit port registers and blocking delays
//!
//! The driver never touches memory-mapped registers directly. Every latch,
//! pin-read and direction register it uses is a [`Port`], so the same code
//! runs against real special-function registers ([`MmioPort`]) and against
//! the bus-level chip model used by the tests.

/// One 8-bit I/O register.
///
/// This is an output latch, an input pin register, or a direction register.
/// Implementations over real hardware must use volatile accesses: the driver
/// relies on every read and write reaching the bus in program order.
pub trait Port {
    /// Read the current register value
    fn read(&self) -> u8;

    /// Write a new register value
    fn write(&self, value: u8);

    /// Read-modify-write the register
    #[inline]
    fn modify<F: FnOnce(u8) -> u8>(&self, f: F)
    where
        Self: Sized,
    {
        self.write(f(self.read()));
    }
}

impl<T: Port + ?Sized> Port for &T {
    #[inline]
    fn read(&self) -> u8 {
        (**self).read()
    }

    #[inline]
    fn write(&self, value: u8) {
        (**self).write(value);
    }
}

/// A memory-mapped 8-bit special-function register
///
/// # Example
///
/// ```no_run
/// use tms99xx::port::{MmioPort, Port};
///
/// // LATD on a PIC18F45K50
/// let latd = unsafe { MmioPort::new(0xF8C) };
/// latd.write(0x0F);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MmioPort(*mut u8);

impl MmioPort {
    /// Wrap a register address.
    ///
    /// # Safety
    ///
    /// `addr` must name a readable and writable byte-wide register that stays
    /// mapped for as long as the port (or any copy of it) is used.
    #[inline]
    pub const unsafe fn new(addr: usize) -> Self {
        MmioPort(addr as *mut u8)
    }

    /// Register address
    #[inline]
    pub fn addr(self) -> usize {
        self.0 as usize
    }
}

impl Port for MmioPort {
    #[inline]
    fn read(&self) -> u8 {
        unsafe { self.0.read_volatile() }
    }

    #[inline]
    fn write(&self, value: u8) {
        unsafe { self.0.write_volatile(value) }
    }
}

/// Blocking microsecond delay
pub trait DelayUs {
    /// Busy-wait for at least `us` microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: DelayUs + ?Sized> DelayUs for &mut T {
    #[inline]
    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us);
    }
}

/// Calibrated spin-loop delay
///
/// `loops_per_us` is the number of [`core::hint::spin_loop`] iterations
/// that take one microsecond on the target at its configured clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpinDelay {
    pub loops_per_us: u32,
}

impl SpinDelay {
    pub const fn new(loops_per_us: u32) -> Self {
        SpinDelay { loops_per_us }
    }
}

impl DelayUs for SpinDelay {
    fn delay_us(&mut self, us: u32) {
        for _ in 0..us.saturating_mul(self.loops_per_us) {
            core::hint::spin_loop();
        }
    }
}
