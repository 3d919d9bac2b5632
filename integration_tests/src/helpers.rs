use std::sync::{Arc, Mutex};

use emu_lib::io::{PipeSink, PipeSource, Teletype};
use emu_lib::Emulator;

/// A fresh machine with a Teletype on piped console streams.
pub struct Machine {
    pub emu: Emulator,
    pub tty: Arc<Mutex<Teletype>>,
    pub console_in: Arc<PipeSource>,
    pub console_out: Arc<PipeSink>,
}

pub fn machine() -> Machine {
    let console_in = Arc::new(PipeSource::default());
    let console_out = Arc::new(PipeSink::default());
    let tty = Arc::new(Mutex::new(Teletype::new(
        console_in.clone(),
        console_out.clone(),
    )));
    let mut emu = Emulator::new();
    emu.add_device(tty.clone()).expect("register tty");
    Machine {
        emu,
        tty,
        console_in,
        console_out,
    }
}

/// Encode words as a RIM tape: leader, an address/data frame pair per
/// word, trailer.
pub fn rim_tape(words: &[(u16, u16)]) -> Vec<u8> {
    let mut tape = vec![0o200u8; 8];
    for &(addr, word) in words {
        tape.push(0o100 | ((addr >> 6) & 0o77) as u8);
        tape.push((addr & 0o77) as u8);
        tape.push(((word >> 6) & 0o77) as u8);
        tape.push((word & 0o77) as u8);
    }
    tape.extend([0o200u8; 8]);
    tape
}

/// Encode segments as a BIN tape: leader, then per segment an origin word
/// followed by its data words, then the checksum word and trailer.
pub fn bin_tape(segments: &[(u16, &[u16])]) -> Vec<u8> {
    let mut tape = vec![0o200u8; 8];
    let mut checksum: u16 = 0;
    for &(origin, words) in segments {
        tape.push(0o100 | ((origin >> 6) & 0o77) as u8);
        tape.push((origin & 0o77) as u8);
        for &word in words {
            let hi = ((word >> 6) & 0o77) as u8;
            let lo = (word & 0o77) as u8;
            tape.push(hi);
            tape.push(lo);
            checksum = (checksum + hi as u16 + lo as u16) & 0o7777;
        }
    }
    tape.push(((checksum >> 6) & 0o77) as u8);
    tape.push((checksum & 0o77) as u8);
    tape.extend([0o200u8; 8]);
    tape
}
