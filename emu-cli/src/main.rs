use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use common::word::mask12;
use emu_lib::io::{ChannelSource, Device, StdoutSink, Teletype};
use emu_lib::{EmuError, Emulator};

use clap::Parser;
use log::warn;

// Interrupt polling happens inside run(); the slice size just bounds how
// often we look at the console's quit flag.
const CYCLES_PER_SLICE: usize = 50_000;

/// PDP-8 Emulator
///
/// Loads a BIN-format paper tape and runs it with the Teletype wired to
/// stdin/stdout. Ctrl-\ (followed by enter; stdin is line buffered)
/// quits.
#[derive(Parser)]
struct Args {
    /// BIN-format paper tape to load
    tape: PathBuf,

    /// Octal address at which to start executing
    #[arg(long, default_value = "200", value_parser = parse_octal)]
    pc: u16,

    /// Octal value for the switch register
    #[arg(long, default_value = "0", value_parser = parse_octal)]
    sr: u16,
}

fn parse_octal(s: &str) -> Result<u16, String> {
    u16::from_str_radix(s, 8).map_err(|err| format!("invalid octal value: {err}"))
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), EmuError> {
    let tty = Arc::new(Mutex::new(Teletype::new(
        Arc::new(ChannelSource::from_stdin()),
        Arc::new(StdoutSink),
    )));

    let mut emu = Emulator::new();
    emu.add_device(tty.clone())?;

    let load = emu.load_bin_image(File::open(&args.tape)?)?;
    if load.checksum_ok() {
        println!(" CHECKSUM OK: {:04o}", load.computed);
    } else {
        // MAINDEC tapes are known-good; run anyway and let the program
        // misbehave if the file really is damaged.
        warn!(
            "checksum fail: {:04o}, should be: {:04o}",
            load.computed, load.expected
        );
    }

    emu.set_pc(args.pc);
    emu.set_sr(args.sr);

    loop {
        let (halted, _) = emu.run(CYCLES_PER_SLICE)?;
        if halted {
            println!(
                " HLT  PC: {:04o}, LAC: {:05o}",
                mask12(emu.pc().wrapping_sub(1)),
                emu.lac()
            );
            break;
        }
        if tty.lock().unwrap().quit_requested() {
            println!("Quit");
            break;
        }
    }

    println!(" PC {:04o}", mask12(emu.pc().wrapping_sub(1)));
    tty.lock().unwrap().close();
    Ok(())
}
