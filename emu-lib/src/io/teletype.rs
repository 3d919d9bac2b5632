//! ASR-33 Teletype: console keyboard and printer plus the low-speed
//! paper-tape reader and punch, as one IOT device pair.

use std::io;
use std::sync::Arc;

use common::asm::device_selector;
use common::constants::{DEV_TTY_KEYBOARD, DEV_TTY_PRINTER};
use common::word::mask12;

use crate::error::EmuError;
use crate::io::{ByteSink, ByteSource, Device, ReadByte};

use log::debug;

pub struct Teletype {
    console_in: Arc<dyn ByteSource>,
    console_out: Arc<dyn ByteSink>,
    reader_tape: Option<Arc<dyn ByteSource>>,
    punch_tape: Option<Arc<dyn ByteSink>>,

    reader_active: bool, // Input comes from the tape, not the console
    punch_active: bool,  // Output goes to the punch, not the console

    tti_ready: bool,
    tti_buffer: u8,
    reader_run: bool, // Armed to read one byte on the next poll
    reader_eof: bool,
    reader_pos: usize,
    tti_int_pending: bool,

    // The printer starts not-ready: TSF must not skip until something
    // has been printed. MAINDEC tapes depend on this.
    tto_ready: bool,
    tto_int_pending: bool,

    quit: bool, // Ctrl-\ seen on the console keyboard
}

impl Teletype {
    pub const DEVICE_NUMBERS: &'static [u16] = &[DEV_TTY_KEYBOARD, DEV_TTY_PRINTER];

    // Exit cleanly on Ctrl-\
    const QUIT_KEY: u8 = 0x1C;

    pub fn new(console_in: Arc<dyn ByteSource>, console_out: Arc<dyn ByteSink>) -> Self {
        Teletype {
            console_in,
            console_out,
            reader_tape: None,
            punch_tape: None,

            reader_active: false,
            punch_active: false,

            tti_ready: false,
            tti_buffer: 0,
            reader_run: false,
            reader_eof: false,
            reader_pos: 0,
            tti_int_pending: false,

            tto_ready: false,
            tto_int_pending: false,

            quit: false,
        }
    }

    /// Put a tape in the reader. Replaces any previous tape; rewinds the
    /// position count and clears end-of-tape.
    pub fn reader_attach_tape(&mut self, tape: Arc<dyn ByteSource>) {
        self.reader_tape = Some(tape);
        self.reader_pos = 0;
        self.reader_eof = false;
    }

    /// Switch input to the attached tape. Attaching alone feeds nothing.
    pub fn reader_start(&mut self) {
        self.reader_active = true;
    }

    /// Switch input back to the console keyboard.
    pub fn reader_stop(&mut self) {
        self.reader_active = false;
    }

    pub fn reader_is_eof(&self) -> bool {
        self.reader_eof
    }

    /// Bytes consumed from the currently attached tape.
    pub fn reader_pos(&self) -> usize {
        self.reader_pos
    }

    pub fn punch_attach(&mut self, tape: Arc<dyn ByteSink>) {
        self.punch_tape = Some(tape);
    }

    pub fn punch_start(&mut self) {
        self.punch_active = true;
    }

    pub fn punch_stop(&mut self) {
        self.punch_active = false;
    }

    /// Whether the console has asked the host to exit (Ctrl-\).
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    fn input(&self) -> &dyn ByteSource {
        if self.reader_active {
            if let Some(tape) = &self.reader_tape {
                return tape.as_ref();
            }
        }
        self.console_in.as_ref()
    }

    fn output(&self) -> &dyn ByteSink {
        if self.punch_active {
            if let Some(tape) = &self.punch_tape {
                return tape.as_ref();
            }
        }
        self.console_out.as_ref()
    }

    // Checks for activity on the device. Consumes at most one byte per
    // call so a program polling KSF between characters sees the ready
    // flag's edge and interrupt routines aren't starved.
    fn poll(&mut self) -> io::Result<()> {
        let want_byte = if self.reader_active {
            self.reader_run
        } else {
            !self.tti_ready
        };
        if want_byte {
            let status = self.input().read_byte()?;
            match status {
                ReadByte::Byte(val) => {
                    self.tti_buffer = val;
                    self.tti_ready = true;
                    self.reader_run = false;
                    self.tti_int_pending = true;
                    if self.reader_active {
                        self.reader_pos += 1;
                    } else if val == Self::QUIT_KEY {
                        debug!("console requested quit");
                        self.quit = true;
                    }
                }
                ReadByte::Eof => self.reader_eof = true,
                ReadByte::Empty => (),
            }
        }

        if self.tto_ready {
            self.tto_int_pending = true;
        }
        Ok(())
    }

    // Micro-ops combine and are executed from the low bit up.
    fn keyboard_iot(&mut self, ir: u16, mut pc: u16, mut lac: u16) -> (u16, u16) {
        if ir & 0o1 != 0 {
            // KSF - skip if ready
            if self.tti_ready {
                pc = mask12(pc + 1);
            }
        }
        if ir & 0o2 != 0 {
            // KCC - clear AC and flag, advance the reader
            lac &= 0o10000;
            self.tti_ready = false;
            self.reader_run = true;
        }
        if ir & 0o4 != 0 {
            // KRS - OR the buffer into AC without changing L. The
            // keyboard sets the eighth bit, the reader doesn't.
            let mut key = self.tti_buffer as u16;
            if !self.reader_active {
                key |= 0o200;
            }
            lac |= key & 0o377;
        }
        (pc, lac)
    }

    fn printer_iot(&mut self, ir: u16, mut pc: u16, lac: u16) -> io::Result<(u16, u16)> {
        if ir & 0o1 != 0 {
            // TSF - skip if ready
            if self.tto_ready {
                pc = mask12(pc + 1);
            }
        }
        if ir & 0o2 != 0 {
            // TCF - clear flag
            self.tto_ready = false;
            self.tto_int_pending = false;
        }
        if ir & 0o4 != 0 {
            // TPC - print static. The console prints 7 bits, the punch
            // perforates all 8.
            let val = if self.punch_active {
                (lac & 0o377) as u8
            } else {
                (lac & 0o177) as u8
            };
            self.output().write_byte(val)?;
            self.tto_ready = true;
        }
        Ok((pc, lac))
    }
}

impl Device for Teletype {
    fn device_numbers(&self) -> &[u16] {
        Self::DEVICE_NUMBERS
    }

    fn iot(&mut self, ir: u16, pc: u16, lac: u16) -> Result<(u16, u16), EmuError> {
        self.poll()?;
        match device_selector(ir) {
            DEV_TTY_KEYBOARD => Ok(self.keyboard_iot(ir, pc, lac)),
            DEV_TTY_PRINTER => Ok(self.printer_iot(ir, pc, lac)?),
            _ => Ok((pc, lac)),
        }
    }

    fn interrupt(&mut self) -> Result<bool, EmuError> {
        self.poll()?;
        let pending = self.tti_int_pending || self.tto_int_pending;
        self.tti_int_pending = false;
        self.tto_int_pending = false;
        Ok(pending)
    }

    fn close(&mut self) {
        // The caller owns the console streams; just let go of the tapes.
        self.reader_tape = None;
        self.punch_tape = None;
    }
}
