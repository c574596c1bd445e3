//! Window-aware video memory transfers
//!
//! The VDP only lets the host at video memory between its own refresh
//! fetches. With the frame interrupt enabled and the display on, a burst
//! waits for the interrupt and then moves at most one window's budget of
//! bytes; a short count is the normal way a long transfer is split, and the
//! caller continues by re-latching the cursor. Without interrupt pacing each
//! byte is followed by a worst-case delay instead.
//!
//! Every burst ends with a status read. It must come after the data: a
//! status read resets the control-port byte latch and acknowledges the
//! interrupt, and doing it first disturbs the address set up for the burst.

use crate::bus::DIR_INPUT;
use crate::config::{BlankPolarity, BusTiming};
use crate::port::{DelayUs, Port};
use crate::registers::{VRAM_SIZE, r1, tag};
use crate::vdp::Tms99xx;

/// Direction of a memory access
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    /// Marker carried in the high address byte
    #[inline]
    pub const fn tag(self) -> u8 {
        match self {
            Access::Read => tag::READ,
            Access::Write => tag::WRITE,
        }
    }
}

/// One burst: direction, byte count, and the period after which the source
/// (write) or destination (read) buffer wraps around
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub access: Access,
    pub len: usize,
    pub modulus: usize,
}

impl TransferRequest {
    pub const fn write(len: usize, modulus: usize) -> Self {
        TransferRequest {
            access: Access::Write,
            len,
            modulus,
        }
    }

    pub const fn read(len: usize, modulus: usize) -> Self {
        TransferRequest {
            access: Access::Read,
            len,
            modulus,
        }
    }
}

/// How a burst is kept inside the chip's access windows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Wait for the frame interrupt, then move at most `budget` bytes
    Interrupt { budget: usize },
    /// Sleep `us` after every byte
    Delay { us: u32 },
}

impl Pacing {
    /// Interrupt pacing needs the frame interrupt enabled and the display on
    pub fn select(register1: u8, polarity: BlankPolarity, timing: &BusTiming) -> Self {
        let irq = register1 & (1 << r1::IRQ) != 0;
        if irq && !polarity.is_blanked(register1) {
            Pacing::Interrupt {
                budget: timing.window_budget.max(1),
            }
        } else {
            Pacing::Delay {
                us: timing.inter_byte_delay_us,
            }
        }
    }
}

pub(crate) enum Burst<'a> {
    Out(&'a [u8]),
    In(&'a mut [u8]),
}

impl Burst<'_> {
    fn access(&self) -> Access {
        match self {
            Burst::Out(_) => Access::Write,
            Burst::In(_) => Access::Read,
        }
    }

    fn capacity(&self) -> usize {
        match self {
            Burst::Out(data) => data.len(),
            Burst::In(buf) => buf.len(),
        }
    }
}

/// Test pattern written across video memory by [`Tms99xx::self_test`]
pub const SELF_TEST_PATTERN: u8 = 0x55;
/// Read-back chunk used by [`Tms99xx::self_test`]
pub const SELF_TEST_CHUNK: usize = 256;

impl<P: Port, D: DelayUs> Tms99xx<P, D> {
    /// Pacing the next burst will use
    pub fn pacing(&self) -> Pacing {
        Pacing::select(self.register1, self.variant.blank_polarity, &self.timing)
    }

    /// Run one burst from the current cursor. Returns the bytes moved.
    pub(crate) fn burst(&mut self, request: TransferRequest, mut io: Burst<'_>) -> usize {
        let Some(bus) = self.bus.as_ref() else {
            log::warn!("{request:?} on unbound VDP ignored");
            return 0;
        };
        if request.len == 0 {
            return 0;
        }
        if request.modulus == 0 || request.modulus > io.capacity() || request.access != io.access() {
            log::warn!("{request:?} does not fit a {}-byte buffer, ignored", io.capacity());
            return 0;
        }

        let pacing = Pacing::select(self.register1, self.variant.blank_polarity, &self.timing);
        let count = match pacing {
            Pacing::Interrupt { budget } => request.len.min(budget),
            Pacing::Delay { .. } => request.len,
        };

        let prior = match io {
            Burst::In(_) => Some(bus.set_direction(DIR_INPUT)),
            Burst::Out(_) => None,
        };

        if let Pacing::Interrupt { .. } = pacing {
            bus.wait_for_interrupt();
        }

        for i in 0..count {
            match &mut io {
                Burst::Out(data) => bus.strobe_write(data[i % request.modulus]),
                Burst::In(buf) => buf[i % request.modulus] = bus.strobe_read(),
            }
            if let Pacing::Delay { us } = pacing {
                self.delay.delay_us(us);
            }
        }

        if let Some(dir) = prior {
            bus.set_direction(dir);
        }
        bus.read_status();

        if count < request.len {
            log::debug!(
                "access window exhausted after {count} of {} bytes",
                request.len
            );
        }
        count
    }

    /// Write `data` from the current cursor
    pub fn write_memory(&mut self, data: &[u8]) -> usize {
        self.burst(TransferRequest::write(data.len(), data.len()), Burst::Out(data))
    }

    /// Write `len` bytes from the current cursor, repeating `pattern`
    pub fn write_cyclic(&mut self, pattern: &[u8], len: usize) -> usize {
        self.burst(TransferRequest::write(len, pattern.len()), Burst::Out(pattern))
    }

    /// Write `len` copies of `value` from the current cursor
    pub fn write_constant(&mut self, value: u8, len: usize) -> usize {
        self.burst(TransferRequest::write(len, 1), Burst::Out(&[value]))
    }

    /// Fill `buf` from the current cursor
    pub fn read_memory(&mut self, buf: &mut [u8]) -> usize {
        let len = buf.len();
        self.burst(TransferRequest::read(len, len), Burst::In(buf))
    }

    /// Read `len` bytes from the current cursor into `buf`, wrapping around
    /// it; the last `buf.len()` bytes read are kept
    pub fn read_cyclic(&mut self, buf: &mut [u8], len: usize) -> usize {
        let modulus = buf.len();
        self.burst(TransferRequest::read(len, modulus), Burst::In(buf))
    }

    /// Fill `len` bytes starting at `start` with `value`, continuing across
    /// as many access windows as it takes
    pub fn fill_memory(&mut self, start: u16, value: u8, len: usize) -> usize {
        let mut done = 0;
        self.set_memory_address(start, Access::Write);
        while done < len {
            let n = self.write_constant(value, len - done);
            if n == 0 {
                break;
            }
            done += n;
            if done < len {
                self.set_memory_address(start.wrapping_add(done as u16), Access::Write);
            }
        }
        done
    }

    /// Zero all of video memory
    pub fn clear_memory(&mut self) {
        let done = self.fill_memory(0, 0x00, VRAM_SIZE);
        log::debug!("cleared {done} bytes of video memory");
    }

    /// Write [`SELF_TEST_PATTERN`] across video memory and read it back.
    ///
    /// Returns `false` on the first mismatch, or if the device is not bound.
    pub fn self_test(&mut self) -> bool {
        if self.bus.is_none() {
            log::warn!("self-test on unbound VDP ignored");
            return false;
        }
        if self.fill_memory(0, SELF_TEST_PATTERN, VRAM_SIZE) < VRAM_SIZE {
            return false;
        }

        let mut buf = [0u8; SELF_TEST_CHUNK];
        let mut done = 0;
        self.set_memory_address(0, Access::Read);
        while done < VRAM_SIZE {
            let want = SELF_TEST_CHUNK.min(VRAM_SIZE - done);
            let got = self.read_memory(&mut buf[..want]);
            if got == 0 {
                return false;
            }
            if let Some(offset) = buf[..got].iter().position(|&b| b != SELF_TEST_PATTERN) {
                log::debug!(
                    "self-test mismatch at {:#06x}: {:#04x}",
                    done + offset,
                    buf[offset]
                );
                return false;
            }
            done += got;
            if got < want && done < VRAM_SIZE {
                self.set_memory_address(done as u16, Access::Read);
            }
        }
        true
    }
}
