use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use yasnes::debug_flags::{self, parse_u32_hex_or_dec};
use yasnes::{BreakReason, Cartridge, Debugger, Emulator};

/// Headless SNES CPU runner.
#[derive(Parser, Debug)]
#[command(name = "yasnes", version)]
struct Args {
    /// ROM image (.sfc / .smc); also looked up under roms/
    rom: String,

    /// Maximum number of instructions to execute
    #[arg(short = 'n', long, default_value = "1000000", value_parser = parse_count)]
    instructions: usize,

    /// Dump memory after the run, as START:COUNT (repeatable)
    #[arg(long = "dump", value_parser = parse_range)]
    dumps: Vec<(u32, u32)>,

    /// Disassemble from START for COUNT instructions before running
    #[arg(long, value_parser = parse_range)]
    disassemble: Option<(u32, u32)>,
}

fn parse_count(s: &str) -> Result<usize, String> {
    parse_u32_hex_or_dec(s)
        .map(|n| n as usize)
        .ok_or_else(|| format!("invalid number: {}", s))
}

fn parse_range(s: &str) -> Result<(u32, u32), String> {
    let (start, count) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:COUNT, got {}", s))?;

    let start = parse_u32_hex_or_dec(start).ok_or_else(|| format!("invalid start: {}", start))?;
    let count = parse_u32_hex_or_dec(count).ok_or_else(|| format!("invalid count: {}", count))?;
    Ok((start & 0xff_ffff, count))
}

fn resolve_rom_path(arg: &str) -> Result<PathBuf, String> {
    let direct = PathBuf::from(arg);
    if direct.exists() {
        return Ok(direct);
    }

    fn with_ext(base: &Path) -> Option<PathBuf> {
        ["sfc", "smc"].iter().find_map(|ext| {
            let mut p = base.to_path_buf();
            if p.extension().is_none() {
                p.set_extension(ext);
            }
            p.exists().then_some(p)
        })
    }

    let in_roms = Path::new("roms").join(arg);
    if in_roms.exists() {
        return Ok(in_roms);
    }

    with_ext(&in_roms)
        .or_else(|| with_ext(&direct))
        .ok_or_else(|| format!("ROM not found: {}", arg))
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let quiet = debug_flags::quiet();

    let rom_path = match resolve_rom_path(&args.rom) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    };

    let cartridge = match Cartridge::load_from_file(&rom_path) {
        Ok(cart) => cart,
        Err(e) => {
            eprintln!("Failed to load ROM {}: {}", rom_path.display(), e);
            process::exit(1);
        }
    };

    if !quiet {
        println!("{}", cartridge.description());
    }

    let mut emulator = Emulator::with_cartridge(cartridge);

    if let Some((start, count)) = args.disassemble {
        let debugger = Debugger::new(&emulator);
        println!("{}", debugger.disassemble(start, count, emulator.cpu().state.mode));
    }

    let executed = emulator.run(args.instructions);

    if !quiet {
        println!(
            "executed {} instructions in {} master clocks",
            executed,
            emulator.master_clocks()
        );
    }
    println!("{}", emulator.cpu().describe_state());

    let cpu = emulator.cpu();
    if cpu.break_reason() != BreakReason::None {
        println!("break: {}: {}", cpu.break_reason(), cpu.break_message());
    }

    let debugger = Debugger::new(&emulator);
    if cpu.break_reason() != BreakReason::None && !quiet {
        println!("{}", debugger.disassemble_at_pc(1));
    }
    for (start, count) in args.dumps {
        println!("{}", debugger.dump(start, count));
    }
}
