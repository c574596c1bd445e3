//! Pin-level VDP model for tests and bus tracing
//!
//! [`SimBus`] stands in for the seven GPIO registers a real board exposes.
//! Driver writes to the control register are decoded edge by edge the way
//! the chip sees them: a rising write strobe latches the data bus into the
//! control port or video memory depending on the mode line, and a rising
//! read strobe completes a status or memory read. Decoded traffic is kept
//! as a list of [`BusEvent`]s; protocol mistakes are kept as faults.
//!
//! Frame interrupts are raised after a few polls of the interrupt line while
//! the interrupt is enabled and the display is on. Each frame opens an
//! access window of [`SimBus::set_window`] bytes; data accesses made under
//! interrupt pacing outside a window are counted as violations.

use core::cell::RefCell;
use core::fmt;
use core::ops::Range;

use crate::config::{PinMap, Ports, Variant};
use crate::port::{DelayUs, Port};
use crate::registers::{ADDRESS_MASK, VRAM_SIZE, r1, reg, tag};
use crate::status::Status;
use crate::transfer::Access;

/// Control latch at power-up: both strobes released, everything else low
const IDLE_CONTROL: u8 = 0x0C;

/// Polls of the interrupt line before the next frame arrives
const DEFAULT_POLLS_PER_FRAME: u32 = 3;

/// One decoded bus transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// A byte written to the control port
    Control(u8),
    /// A completed register framing
    Register { index: u8, value: u8 },
    /// A completed cursor framing
    Address { address: u16, access: Access },
    DataWrite { address: u16, value: u8 },
    DataRead { address: u16, value: u8 },
    Status(u8),
    /// Reset line released
    Reset,
}

impl fmt::Display for BusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusEvent::Control(byte) => write!(f, "ctrl  {byte:#04x}"),
            BusEvent::Register { index, value } => write!(f, "R{index}    <- {value:#04x}"),
            BusEvent::Address { address, access } => {
                let dir = match access {
                    Access::Read => "read",
                    Access::Write => "write",
                };
                write!(f, "addr  {address:#06x} ({dir})")
            }
            BusEvent::DataWrite { address, value } => write!(f, "write {address:#06x} <- {value:#04x}"),
            BusEvent::DataRead { address, value } => write!(f, "read  {address:#06x} -> {value:#04x}"),
            BusEvent::Status(value) => write!(f, "status {value:#04x}"),
            BusEvent::Reset => write!(f, "reset"),
        }
    }
}

/// Which of the board's registers a [`SimPort`] stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortId {
    DataOut,
    DataIn,
    DataDir,
    Control,
    ControlDir,
    Interrupt,
    InterruptDir,
}

/// Handle to one simulated register
#[derive(Clone, Copy)]
pub struct SimPort<'a> {
    sim: &'a SimBus,
    id: PortId,
}

impl fmt::Debug for SimPort<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SimPort").field(&self.id).finish()
    }
}

impl Port for SimPort<'_> {
    fn read(&self) -> u8 {
        self.sim.chip.borrow_mut().port_read(self.id)
    }

    fn write(&self, value: u8) {
        self.sim.chip.borrow_mut().port_write(self.id, value);
    }
}

/// Records every delay request instead of sleeping
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountingDelay {
    pub calls: usize,
    pub total_us: u64,
}

impl DelayUs for CountingDelay {
    fn delay_us(&mut self, us: u32) {
        self.calls += 1;
        self.total_us += u64::from(us);
    }
}

#[derive(Debug)]
struct Chip {
    pins: PinMap,
    variant: Variant,

    data_out: u8,
    data_dir: u8,
    control: u8,
    control_dir: u8,
    interrupt_dir: u8,

    vram: Vec<u8>,
    stuck: Vec<(u16, u8)>,
    registers: [u8; reg::COUNT as usize],
    status: u8,
    first_write: Option<u8>,
    latched: u16,
    cursor: u16,
    pre_read: u8,
    pre_read_address: u16,
    strobe_value: Option<u8>,

    polls_per_frame: u32,
    polls: u32,
    frames: usize,
    window: usize,
    window_left: usize,
    violations: usize,

    mode_edges: usize,
    events: Vec<BusEvent>,
    faults: Vec<String>,
}

impl Chip {
    fn new(pins: PinMap, variant: Variant) -> Self {
        Chip {
            pins,
            variant,
            data_out: 0,
            data_dir: 0xFF,
            control: IDLE_CONTROL,
            control_dir: 0xFF,
            interrupt_dir: 0xFF,
            vram: vec![0; VRAM_SIZE],
            stuck: Vec::new(),
            registers: [0; reg::COUNT as usize],
            status: 0,
            first_write: None,
            latched: 0,
            cursor: 0,
            pre_read: 0,
            pre_read_address: 0,
            strobe_value: None,
            polls_per_frame: DEFAULT_POLLS_PER_FRAME,
            polls: 0,
            frames: 0,
            window: crate::config::BusTiming::default().window_budget,
            window_left: 0,
            violations: 0,
            mode_edges: 0,
            events: Vec::new(),
            faults: Vec::new(),
        }
    }

    fn line(&self, bit: u8) -> bool {
        self.control & (1 << bit) != 0
    }

    fn fetch(&self, address: u16) -> u8 {
        self.stuck
            .iter()
            .find(|&&(a, _)| a == address)
            .map_or(self.vram[address as usize], |&(_, v)| v)
    }

    fn interrupt_enabled(&self) -> bool {
        self.registers[reg::MODE1 as usize] & (1 << r1::IRQ) != 0
    }

    fn paced(&self) -> bool {
        let register1 = self.registers[reg::MODE1 as usize];
        self.interrupt_enabled() && !self.variant.blank_polarity.is_blanked(register1)
    }

    fn interrupt_asserted(&self) -> bool {
        Status(self.status).frame() && self.interrupt_enabled()
    }

    fn raise_frame(&mut self) {
        self.status |= 1 << Status::FRAME_BIT;
        self.frames += 1;
        self.window_left = self.window;
        self.polls = 0;
    }

    fn port_read(&mut self, id: PortId) -> u8 {
        match id {
            PortId::DataOut => self.data_out,
            PortId::DataIn => self.data_in_read(),
            PortId::DataDir => self.data_dir,
            PortId::Control => self.control,
            PortId::ControlDir => self.control_dir,
            PortId::Interrupt => {
                if self.paced() && !self.interrupt_asserted() {
                    self.polls += 1;
                    if self.polls >= self.polls_per_frame {
                        self.raise_frame();
                    }
                }
                let int = 1 << self.pins.interrupt;
                if self.interrupt_asserted() { !int } else { 0xFF }
            }
            PortId::InterruptDir => self.interrupt_dir,
        }
    }

    fn port_write(&mut self, id: PortId, value: u8) {
        match id {
            PortId::DataOut => self.data_out = value,
            PortId::DataIn => self.faults.push(format!("write of {value:#04x} to the data input register")),
            PortId::DataDir => self.data_dir = value,
            PortId::Control => self.control_write(value),
            PortId::ControlDir => self.control_dir = value,
            PortId::Interrupt => self.faults.push(format!("write of {value:#04x} to the interrupt input register")),
            PortId::InterruptDir => self.interrupt_dir = value,
        }
    }

    fn data_in_read(&mut self) -> u8 {
        if self.line(self.pins.read_strobe) {
            self.faults.push("data bus sampled with the read strobe released".to_string());
            return 0xFF;
        }
        if self.data_dir != 0xFF {
            self.faults.push(format!("data bus sampled with direction {:#04x}", self.data_dir));
        }
        let value = if self.line(self.pins.mode) { self.status } else { self.pre_read };
        self.strobe_value = Some(value);
        value
    }

    fn control_write(&mut self, value: u8) {
        let old = self.control;
        self.control = value;
        let rose = |bit: u8| old & (1 << bit) == 0 && value & (1 << bit) != 0;
        let changed = |bit: u8| (old ^ value) & (1 << bit) != 0;

        if changed(self.pins.mode) {
            self.mode_edges += 1;
        }
        if !self.line(self.pins.read_strobe) && !self.line(self.pins.write_strobe) {
            self.faults.push("both strobes asserted".to_string());
        }
        if rose(self.pins.reset) {
            self.reset();
        }
        if rose(self.pins.write_strobe) {
            self.write_cycle();
        }
        if rose(self.pins.read_strobe) {
            self.read_cycle();
        }
    }

    fn reset(&mut self) {
        self.registers = [0; reg::COUNT as usize];
        self.status = 0;
        self.first_write = None;
        self.events.push(BusEvent::Reset);
    }

    fn write_cycle(&mut self) {
        if self.data_dir != 0x00 {
            self.faults.push(format!("write strobe with data direction {:#04x}", self.data_dir));
        }
        let value = self.data_out;
        if self.line(self.pins.mode) {
            self.control_byte(value);
        } else {
            self.first_write = None;
            self.count_access();
            let address = self.cursor;
            self.vram[address as usize] = value;
            self.pre_read = value;
            self.cursor = (self.cursor + 1) & ADDRESS_MASK;
            self.events.push(BusEvent::DataWrite { address, value });
        }
    }

    fn control_byte(&mut self, value: u8) {
        self.events.push(BusEvent::Control(value));
        let Some(first) = self.first_write.take() else {
            self.first_write = Some(value);
            return;
        };
        if value & tag::REGISTER != 0 {
            let index = value & 0x07;
            self.registers[index as usize] = first;
            self.events.push(BusEvent::Register { index, value: first });
        } else {
            let address = (u16::from(value & tag::ADDR_HIGH_MASK) << 8) | u16::from(first);
            let access = if value & tag::WRITE != 0 { Access::Write } else { Access::Read };
            self.latched = address;
            self.cursor = address;
            if access == Access::Read {
                self.prefetch();
            }
            self.events.push(BusEvent::Address { address, access });
        }
    }

    fn prefetch(&mut self) {
        self.pre_read_address = self.cursor;
        self.pre_read = self.fetch(self.cursor);
        self.cursor = (self.cursor + 1) & ADDRESS_MASK;
    }

    fn read_cycle(&mut self) {
        if self.line(self.pins.mode) {
            let value = self.strobe_value.take().unwrap_or(self.status);
            self.status = 0;
            self.first_write = None;
            self.polls = 0;
            self.events.push(BusEvent::Status(value));
        } else {
            self.first_write = None;
            self.count_access();
            let value = self.strobe_value.take().unwrap_or(self.pre_read);
            let address = self.pre_read_address;
            self.prefetch();
            self.events.push(BusEvent::DataRead { address, value });
        }
    }

    fn count_access(&mut self) {
        if !self.paced() {
            return;
        }
        if self.window_left == 0 {
            self.violations += 1;
        } else {
            self.window_left -= 1;
        }
    }
}

/// Simulated board: seven GPIO registers wired to one VDP
#[derive(Debug)]
pub struct SimBus {
    chip: RefCell<Chip>,
}

impl SimBus {
    /// Board wired with `pins`, carrying a chip that follows `variant`'s
    /// blank polarity
    pub fn new(pins: PinMap, variant: Variant) -> Self {
        SimBus {
            chip: RefCell::new(Chip::new(pins, variant)),
        }
    }

    /// A complete port set for [`crate::Tms99xx::init_ports`]
    pub fn ports(&self) -> Ports<SimPort<'_>> {
        let port = |id| Some(SimPort { sim: self, id });
        Ports {
            data_out: port(PortId::DataOut),
            data_in: port(PortId::DataIn),
            data_dir: port(PortId::DataDir),
            control_out: port(PortId::Control),
            control_dir: port(PortId::ControlDir),
            interrupt_in: port(PortId::Interrupt),
            interrupt_dir: port(PortId::InterruptDir),
        }
    }

    /// Set the direction registers as if left by earlier firmware
    pub fn preset_directions(&self, data: u8, control: u8, interrupt: u8) {
        let mut chip = self.chip.borrow_mut();
        chip.data_dir = data;
        chip.control_dir = control;
        chip.interrupt_dir = interrupt;
    }

    /// Bytes per access window
    pub fn set_window(&self, bytes: usize) {
        self.chip.borrow_mut().window = bytes;
    }

    /// Interrupt polls before each frame
    pub fn set_polls_per_frame(&self, polls: u32) {
        self.chip.borrow_mut().polls_per_frame = polls.max(1);
    }

    /// Make `address` read back as `value` whatever is written to it
    pub fn stick(&self, address: u16, value: u8) {
        self.chip.borrow_mut().stuck.push((address & ADDRESS_MASK, value));
    }

    /// Set the frame flag and open an access window
    pub fn raise_frame(&self) {
        self.chip.borrow_mut().raise_frame();
    }

    pub fn data_direction(&self) -> u8 {
        self.chip.borrow().data_dir
    }

    pub fn control_direction(&self) -> u8 {
        self.chip.borrow().control_dir
    }

    pub fn interrupt_direction(&self) -> u8 {
        self.chip.borrow().interrupt_dir
    }

    pub fn control_latch(&self) -> u8 {
        self.chip.borrow().control
    }

    /// Mode line level (high selects the control port)
    pub fn mode_line(&self) -> bool {
        let chip = self.chip.borrow();
        chip.line(chip.pins.mode)
    }

    /// Mode line transitions since the last [`clear_events`](Self::clear_events)
    pub fn mode_edges(&self) -> usize {
        self.chip.borrow().mode_edges
    }

    pub fn register(&self, index: u8) -> u8 {
        self.chip.borrow().registers[usize::from(index & 0x07)]
    }

    /// Address set by the last cursor framing
    pub fn address(&self) -> u16 {
        self.chip.borrow().latched
    }

    /// Stored byte at `address`, ignoring stuck cells
    pub fn peek(&self, address: u16) -> u8 {
        self.chip.borrow().vram[usize::from(address & ADDRESS_MASK)]
    }

    pub fn vram(&self, range: Range<usize>) -> Vec<u8> {
        self.chip.borrow().vram[range].to_vec()
    }

    pub fn status(&self) -> Status {
        Status(self.chip.borrow().status)
    }

    pub fn frames(&self) -> usize {
        self.chip.borrow().frames
    }

    /// Paced data accesses made with no window open
    pub fn window_violations(&self) -> usize {
        self.chip.borrow().violations
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.chip.borrow().events.clone()
    }

    /// Raw bytes written to the control port, in order
    pub fn control_bytes(&self) -> Vec<u8> {
        self.chip
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Control(byte) => Some(*byte),
                _ => None,
            })
            .collect()
    }

    pub fn faults(&self) -> Vec<String> {
        self.chip.borrow().faults.clone()
    }

    /// Forget recorded events, faults and mode edges
    pub fn clear_events(&self) {
        let mut chip = self.chip.borrow_mut();
        chip.events.clear();
        chip.faults.clear();
        chip.mode_edges = 0;
    }
}
