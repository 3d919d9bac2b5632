//! Paper-tape loaders: the RIM low-speed bootstrap, the CPU-driven BIN
//! load, and a host-side BIN parser for embedders that don't want to run
//! the loader program.

use std::io::{self, Read};
use std::sync::{Arc, Mutex};

use common::asm::HLT;
use common::constants::{BIN_LOADER_START, RIM_LOADER_START};
use common::word::mask12;

use crate::emulator::Emulator;
use crate::error::EmuError;
use crate::io::{ByteSource, Teletype};

use log::debug;

// DEC's low-speed-reader RIM loader, resident at 0o7756-0o7777. It reads
// frame pairs from the reader: an address word (bit 6 of the high frame
// set) selects where the following data word is deposited.
const RIM_LOADER: [u16; 18] = [
    0o6032, // 7756  KCC
    0o6031, // 7757  KSF
    0o5357, // 7760  JMP 7757
    0o6036, // 7761  KRB
    0o7106, // 7762  CLL RTL
    0o7006, // 7763  RTL
    0o7510, // 7764  SPA
    0o5357, // 7765  JMP 7757
    0o7006, // 7766  RTL
    0o6031, // 7767  KSF
    0o5367, // 7770  JMP 7767
    0o6034, // 7771  KRS
    0o7420, // 7772  SNL
    0o3776, // 7773  DCA I 7776
    0o3376, // 7774  DCA 7776
    0o5356, // 7775  JMP 7756
    0o0000, // 7776
    0o0000, // 7777
];

// Where the bootstrap sits when starved of input: KSF at 0o7757 about to
// run, or its JMP about to loop back.
const RIM_WAIT_PCS: [u16; 2] = [RIM_LOADER_START, 0o7760];

/// Outcome of a host-side BIN parse. MAINDEC tapes are known-good, so a
/// mismatch usually means a damaged file; the caller decides whether
/// that's fatal.
#[derive(Debug, Clone, Copy)]
pub struct BinLoad {
    pub computed: u16,
    pub expected: u16,
}

impl BinLoad {
    pub fn checksum_ok(&self) -> bool {
        self.computed == self.expected
    }
}

impl Emulator {
    /// Load a paper tape in RIM format by seeding the RIM bootstrap and
    /// letting the CPU run it against the reader.
    pub fn load_rim_tape(
        &mut self,
        tty: &Mutex<Teletype>,
        tape: Arc<dyn ByteSource>,
    ) -> Result<(), EmuError> {
        self.load_image(&RIM_LOADER, RIM_LOADER_START);

        {
            let mut tty = tty.lock().unwrap();
            tty.reader_attach_tape(tape);
            tty.reader_start();
        }
        self.set_pc(RIM_LOADER_START);

        while !tty.lock().unwrap().reader_is_eof() {
            self.run_loader_slice(100)?;
        }
        tty.lock().unwrap().reader_stop();

        // The loader may still be mid-word when EOF shows up; single-step
        // until it settles at the top of its wait loop.
        for _ in 0..10_000 {
            if RIM_WAIT_PCS.contains(&self.pc()) {
                break;
            }
            self.run_loader_slice(1)?;
        }

        if !tty.lock().unwrap().reader_is_eof() || !RIM_WAIT_PCS.contains(&self.pc()) {
            return Err(EmuError::RimLoaderStalled(self.pc()));
        }
        debug!("RIM load done, PC: {:04o}", self.pc());
        Ok(())
    }

    /// Load a paper tape in BIN format the way a real machine does: RIM-load
    /// the DEC BIN loader (`dec-08-lbaa`, supplied as `bin_loader`), then
    /// run it over the target tape. On success the loader halts with a
    /// clean checksum in AC.
    pub fn load_bin_tape(
        &mut self,
        tty: &Mutex<Teletype>,
        bin_loader: Arc<dyn ByteSource>,
        tape: Arc<dyn ByteSource>,
    ) -> Result<(), EmuError> {
        self.load_rim_tape(tty, bin_loader)?;

        {
            let mut tty = tty.lock().unwrap();
            tty.reader_attach_tape(tape);
            tty.reader_start();
        }
        self.set_pc(BIN_LOADER_START);
        // A 1 in the MSB of SR selects the low-speed (Teletype) reader.
        self.set_sr(0o7777);

        let (halted, _) = self.run(5_000_000)?;
        tty.lock().unwrap().reader_stop();

        if !halted || mask12(self.lac()) != 0 || self.ir() != HLT {
            return Err(EmuError::BinLoadFailed {
                pc: mask12(self.pc().wrapping_sub(1)),
                lac: self.lac(),
            });
        }
        Ok(())
    }

    fn run_loader_slice(&mut self, budget: usize) -> Result<(), EmuError> {
        let (halted, _) = self.run(budget)?;
        if halted {
            return Err(EmuError::UnexpectedHalt(mask12(self.pc().wrapping_sub(1))));
        }
        Ok(())
    }

    /// Parse a BIN-format tape on the host and deposit it straight into
    /// memory, without running the BIN loader program. The checksum is
    /// the 12-bit sum of each data byte (bytes, not words); the word just
    /// before the run-out records it.
    pub fn load_bin_image(&mut self, mut tape: impl Read) -> Result<BinLoad, EmuError> {
        let mut data = Vec::new();
        tape.read_to_end(&mut data)?;

        // Skip anything before the leader.
        let Some(leader) = data.iter().position(|&b| b == 0o200) else {
            return Ok(BinLoad {
                computed: 0,
                expected: 0,
            });
        };
        let mut i = leader + 1;

        let mut addr: u16 = 0;
        let mut checksum: u16 = 0;
        let mut word: u16;
        loop {
            let hi = *data.get(i).ok_or_else(truncated)?;
            i += 1;
            if hi & 0o200 != 0 {
                // Run-in between blocks
                continue;
            }
            let lo = *data.get(i).ok_or_else(truncated)?;
            i += 1;
            word = ((hi as u16) << 6) | (lo as u16 & 0o77);

            // Look ahead for the run-out; the word before it is the
            // checksum, not data.
            let next = *data.get(i).ok_or_else(truncated)?;
            if next & 0o200 != 0 {
                break;
            }

            if word & 0o10000 != 0 {
                // Bit 12 set: the word sets the load address.
                addr = mask12(word);
            } else {
                self.mem_write(addr, word);
                checksum = mask12(checksum + (word & 0o77));
                checksum = mask12(checksum + ((word & 0o7700) >> 6));
                addr = mask12(addr + 1);
            }
        }

        let load = BinLoad {
            computed: checksum,
            expected: mask12(word),
        };
        debug!(
            "BIN image parsed, checksum {:04o} (tape says {:04o})",
            load.computed, load.expected
        );
        Ok(load)
    }
}

fn truncated() -> EmuError {
    EmuError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "tape ends mid-frame",
    ))
}
