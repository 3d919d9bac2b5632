pub mod teletype;

use std::collections::VecDeque;
use std::io::{self, stdout, Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Mutex;
use std::thread;

use crate::error::EmuError;

pub use teletype::Teletype;

/// One poll of a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadByte {
    Byte(u8),
    /// Nothing available right now; more may arrive (a console idling).
    Empty,
    /// Nothing will ever arrive (a tape has run out).
    Eof,
}

/// A source of bytes for the Teletype: a console keyboard or a punched
/// tape in the reader. Sources must not block; a console with nothing
/// typed reports `Empty`.
pub trait ByteSource: Send + Sync {
    fn read_byte(&self) -> io::Result<ReadByte>;
}

/// A sink for Teletype output: the console printer or the tape punch.
pub trait ByteSink: Send + Sync {
    fn write_byte(&self, val: u8) -> io::Result<()>;
}

/// A device on the IOT bus.
pub trait Device: Send {
    /// The 6-bit selectors this device answers to. 0o0 is the CPU's own
    /// and may not be claimed.
    fn device_numbers(&self) -> &[u16];

    /// Execute an IOT. The device receives PC and LAC by value and
    /// returns the updated pair; it never holds a reference into the CPU.
    fn iot(&mut self, ir: u16, pc: u16, lac: u16) -> Result<(u16, u16), EmuError>;

    /// Whether the device is currently asserting an interrupt.
    fn interrupt(&mut self) -> Result<bool, EmuError>;

    /// Release external resources; idempotent. Streams supplied by the
    /// caller stay open, the caller owns their lifecycle.
    fn close(&mut self);
}

////////////////////////////////////////////////////////////////////////////////

/// A finite byte stream: the contents of a punched paper tape.
pub struct TapeSource {
    buf: Mutex<VecDeque<u8>>,
}

impl TapeSource {
    pub fn new(data: impl Into<VecDeque<u8>>) -> Self {
        TapeSource {
            buf: Mutex::new(data.into()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }
}

impl ByteSource for TapeSource {
    fn read_byte(&self) -> io::Result<ReadByte> {
        Ok(match self.buf.lock().unwrap().pop_front() {
            Some(val) => ReadByte::Byte(val),
            None => ReadByte::Eof,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Console-input test double; a drained pipe idles rather than ending.
#[derive(Default)]
pub struct PipeSource {
    buf: Mutex<VecDeque<u8>>,
}

impl PipeSource {
    pub fn push_input(&self, val: u8) {
        self.buf.lock().unwrap().push_back(val);
    }

    pub fn write_input(&self, vals: &[u8]) {
        for val in vals.iter() {
            self.push_input(*val);
        }
    }
}

impl ByteSource for PipeSource {
    fn read_byte(&self) -> io::Result<ReadByte> {
        Ok(match self.buf.lock().unwrap().pop_front() {
            Some(val) => ReadByte::Byte(val),
            None => ReadByte::Empty,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Default)]
pub struct PipeSink {
    buf: Mutex<VecDeque<u8>>,
}

impl PipeSink {
    pub fn take(&self) -> VecDeque<u8> {
        std::mem::take(&mut self.buf.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.buf.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().unwrap().is_empty()
    }

    pub fn pop_front(&self) -> Option<u8> {
        self.buf.lock().unwrap().pop_front()
    }
}

impl ByteSink for PipeSink {
    fn write_byte(&self, val: u8) -> io::Result<()> {
        self.buf.lock().unwrap().push_back(val);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Byte source fed by a channel. `from_stdin` spawns a reader thread so
/// the CPU never blocks waiting on the console.
pub struct ChannelSource {
    rx: Mutex<Receiver<u8>>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<u8>) -> Self {
        ChannelSource { rx: Mutex::new(rx) }
    }

    pub fn from_stdin() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = io::stdin();
            let mut buf = [0u8; 1];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(buf[0]).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self::new(rx)
    }
}

impl ByteSource for ChannelSource {
    fn read_byte(&self) -> io::Result<ReadByte> {
        Ok(match self.rx.lock().unwrap().try_recv() {
            Ok(val) => ReadByte::Byte(val),
            Err(TryRecvError::Empty) => ReadByte::Empty,
            Err(TryRecvError::Disconnected) => ReadByte::Eof,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Default, Clone, Copy)]
pub struct StdoutSink;

impl ByteSink for StdoutSink {
    fn write_byte(&self, val: u8) -> io::Result<()> {
        let mut out = stdout().lock();
        out.write_all(&[val])?;
        out.flush()
    }
}
