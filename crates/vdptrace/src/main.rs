//! vdptrace - run the tms99xx driver against the simulated chip and print
//! the bus transcript
//!
//! Usage: vdptrace [OPTIONS] <operation>

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use std::process;
use tms99xx::registers::r1;
use tms99xx::sim::{BusEvent, CountingDelay, SimBus};
use tms99xx::transfer::SELF_TEST_PATTERN;
use tms99xx::{Access, BusTiming, Color, Mode, PinMap, Tms99xx, Variant};

/// Chip generation
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
enum Chip {
    /// Mode line held across control framings, bit 6 set enables display
    #[default]
    Tms99xx,
    /// Mode line raised inside each strobe, bit 6 set blanks display
    Tms9928,
}

impl From<Chip> for Variant {
    fn from(chip: Chip) -> Self {
        match chip {
            Chip::Tms99xx => Variant::TMS99XX,
            Chip::Tms9928 => Variant::TMS9928,
        }
    }
}

/// Display mode applied at bring-up
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
enum DisplayMode {
    #[default]
    Graphics1,
    Graphics2,
    /// Multicolor
    Bitmap,
    Text,
}

impl From<DisplayMode> for Mode {
    fn from(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Graphics1 => Mode::GraphicsI,
            DisplayMode::Graphics2 => Mode::GraphicsII,
            DisplayMode::Bitmap => Mode::Bitmap,
            DisplayMode::Text => Mode::Text,
        }
    }
}

/// What to do after bring-up
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
enum Operation {
    /// Bring-up only
    Init,
    /// Zero all of video memory
    Clear,
    /// Fill `--length` bytes at `--address` with `--value`
    Fill,
    /// Read `--length` bytes at `--address` and hex-dump them
    Dump,
    /// Pattern-fill and read back all of video memory
    SelfTest,
    /// Read the status register
    Status,
}

#[derive(Parser, Debug)]
#[command(name = "vdptrace")]
#[command(author = "TMS99xx Driver Team")]
#[command(version = "0.1.0")]
#[command(about = "Bus transcript of tms99xx driver operations on a simulated VDP", long_about = None)]
struct Args {
    /// Operation to trace
    #[arg(value_enum)]
    operation: Operation,

    /// Chip generation
    #[arg(short, long, value_enum, default_value = "tms99xx")]
    chip: Chip,

    /// Display mode
    #[arg(short, long, value_enum, default_value = "graphics1")]
    mode: DisplayMode,

    /// Enable the frame interrupt (transfers become interrupt paced)
    #[arg(long)]
    irq: bool,

    /// Leave the display blanked
    #[arg(long)]
    blank: bool,

    /// Pin indices as CSR,CSW,MODE,RESET,INT
    #[arg(long, default_value = "3,2,0,1,6")]
    pins: String,

    /// Bytes per access window
    #[arg(short, long, default_value = "1000")]
    budget: usize,

    /// Delay after each byte when not interrupt paced (microseconds)
    #[arg(long, default_value = "8")]
    delay_us: u32,

    /// Start address for fill and dump
    #[arg(short, long, default_value = "0", value_parser = parse_u16)]
    address: u16,

    /// Byte count for fill and dump
    #[arg(short, long, default_value = "16")]
    length: usize,

    /// Fill value
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    value: u8,

    /// Text color (0-15)
    #[arg(long, default_value = "15", value_parser = parse_u8)]
    text_color: u8,

    /// Backdrop color (0-15)
    #[arg(long, default_value = "4", value_parser = parse_u8)]
    background: u8,

    /// Make one video memory cell fail the self-test
    #[arg(long, value_parser = parse_u16)]
    corrupt: Option<u16>,

    /// Include the bring-up sequence in the transcript
    #[arg(long)]
    show_init: bool,

    /// Print only the summary
    #[arg(short, long)]
    quiet: bool,

    /// Verbose output (repeat for trace-level driver logging)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    if let Err(e) = run(&args) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn parse_number(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let n = parse_number(s).map_err(|e| e.to_string())?;
    u16::try_from(n).map_err(|_| format!("{s} does not fit in 16 bits"))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let n = parse_number(s).map_err(|e| e.to_string())?;
    u8::try_from(n).map_err(|_| format!("{s} does not fit in 8 bits"))
}

fn parse_pins(s: &str) -> anyhow::Result<PinMap> {
    let bits = s
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid pin list '{s}'"))?;
    let &[csr, csw, mode, reset, int] = bits.as_slice() else {
        bail!("expected 5 pin indices (CSR,CSW,MODE,RESET,INT), got {}", bits.len());
    };
    let pins = PinMap::new(csr, csw, mode, reset, int);
    pins.validate()?;
    Ok(pins)
}

/// Register 1 flags for bring-up: 16K, display per `--blank`, IE per `--irq`
fn register1_flags(variant: Variant, args: &Args) -> u8 {
    let flags = variant.blank_polarity.apply(1 << r1::MEM_16K, args.blank);
    if args.irq { flags | (1 << r1::IRQ) } else { flags }
}

/// What the traced operation produced
#[derive(Debug, PartialEq)]
enum Outcome {
    Done,
    Bytes(usize),
    Dump(Vec<u8>),
    SelfTest(bool),
    Status(tms99xx::Status),
}

fn run(args: &Args) -> anyhow::Result<()> {
    let pins = parse_pins(&args.pins)?;
    let variant = Variant::from(args.chip);
    let timing = BusTiming {
        inter_byte_delay_us: args.delay_us,
        window_budget: args.budget,
        ..BusTiming::default()
    };

    let sim = SimBus::new(pins, variant);
    sim.set_window(args.budget);
    if let Some(address) = args.corrupt {
        sim.stick(address, !SELF_TEST_PATTERN);
    }

    let mut delay = CountingDelay::default();
    let outcome = {
        let mut vdp = Tms99xx::new(&mut delay, variant, timing);
        vdp.init_ports(sim.ports(), pins);
        if !vdp.is_bound() {
            bail!("driver did not bind to the simulated ports");
        }
        vdp.init_device(
            args.mode.into(),
            register1_flags(variant, args),
            Color(args.text_color),
            Color(args.background),
        );
        if !args.show_init {
            sim.clear_events();
        }
        execute(&mut vdp, args)
    };

    let events = sim.events();
    if !args.quiet {
        for event in &events {
            println!("{event}");
        }
    }

    let writes = events.iter().filter(|e| matches!(e, BusEvent::DataWrite { .. })).count();
    let reads = events.iter().filter(|e| matches!(e, BusEvent::DataRead { .. })).count();
    println!(
        "{} events, {writes} data writes, {reads} data reads, {} frames, {} delays ({} us)",
        events.len(),
        sim.frames(),
        delay.calls,
        delay.total_us
    );

    match &outcome {
        Outcome::Done => {}
        Outcome::Bytes(n) => println!("transferred {n} bytes"),
        Outcome::Dump(bytes) => print_dump(args.address, bytes),
        Outcome::SelfTest(passed) => println!("self-test: {}", if *passed { "pass" } else { "FAIL" }),
        Outcome::Status(status) => println!(
            "status {:#04x}: frame={} fifth={} coincidence={} sprite={}",
            status.0,
            status.frame(),
            status.fifth_sprite(),
            status.coincidence(),
            status.fifth_sprite_number()
        ),
    }

    let faults = sim.faults();
    for fault in &faults {
        eprintln!("fault: {fault}");
    }
    if !faults.is_empty() {
        bail!("{} bus protocol faults", faults.len());
    }
    if sim.window_violations() > 0 {
        bail!("{} accesses outside an access window", sim.window_violations());
    }
    if outcome == Outcome::SelfTest(false) {
        bail!("video memory self-test failed");
    }
    Ok(())
}

fn execute<P, D>(vdp: &mut Tms99xx<P, D>, args: &Args) -> Outcome
where
    P: tms99xx::Port,
    D: tms99xx::DelayUs,
{
    match args.operation {
        Operation::Init => Outcome::Done,
        Operation::Clear => {
            vdp.clear_memory();
            Outcome::Done
        }
        Operation::Fill => Outcome::Bytes(vdp.fill_memory(args.address, args.value, args.length)),
        Operation::Dump => {
            let mut bytes = vec![0; args.length];
            let mut done = 0;
            while done < bytes.len() {
                vdp.set_memory_address(args.address.wrapping_add(done as u16), Access::Read);
                let n = vdp.read_memory(&mut bytes[done..]);
                if n == 0 {
                    break;
                }
                done += n;
            }
            bytes.truncate(done);
            Outcome::Dump(bytes)
        }
        Operation::SelfTest => Outcome::SelfTest(vdp.self_test()),
        Operation::Status => Outcome::Status(vdp.status()),
    }
}

fn print_dump(start: u16, bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let address = start.wrapping_add((row * 16) as u16) & 0x3FFF;
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{address:04x}: {}", hex.join(" "));
    }
}
