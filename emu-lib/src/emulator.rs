use std::sync::{Arc, Mutex};

use common::asm::{device_selector, Opcode, IR_INDIRECT_BIT, IR_OFFSET_MASK, IR_PAGE_BIT, PAGE_MASK};
use common::constants::*;
use common::word::{byte_swap, mask12, mask13, rotate_left, rotate_right};

use crate::error::EmuError;
use crate::io::Device;

use log::{debug, trace};

pub struct Emulator {
    mem: Vec<u16>, // MEM_SIZE 12-bit words
    pc: u16,
    ir: u16,
    sr: u16,
    lac: u16, // Accumulator; bit 12 is the Link flag
    mq: u16,
    ien: bool,         // Whether interrupts are enabled
    pending_ien: bool, // ION's effect is delayed by one instruction
    devices: Vec<Arc<Mutex<dyn Device>>>,
    device_numbers: Vec<u16>, // Selectors currently claimed
}

impl Emulator {
    pub fn new() -> Emulator {
        Emulator {
            mem: vec![0; MEM_SIZE],
            pc: 0o200,
            ir: 0,
            sr: 0,
            lac: 0,
            mq: 0,
            ien: false,
            pending_ien: false,
            devices: Vec::new(),
            device_numbers: Vec::new(),
        }
    }

    pub fn add_device(&mut self, device: Arc<Mutex<dyn Device>>) -> Result<(), EmuError> {
        let numbers = device.lock().unwrap().device_numbers().to_vec();
        for (i, n) in numbers.iter().enumerate() {
            if *n == DEV_CPU || self.device_numbers.contains(n) || numbers[..i].contains(n) {
                return Err(EmuError::DeviceConflict(*n));
            }
        }
        self.device_numbers.extend(numbers);
        self.devices.push(device);
        Ok(())
    }

    /// Execute up to `budget` instructions. Returns whether a HLT was
    /// executed and the budget left over; HLT is not an error.
    pub fn run(&mut self, budget: usize) -> Result<(bool, usize), EmuError> {
        let mut cycles = budget;
        let mut halted = false;

        while cycles > 0 {
            let (opcode, op_addr) = self.fetch();
            halted = self.execute(opcode, op_addr)?;
            if halted {
                break;
            }

            if self.ien {
                self.poll_interrupts()?;
            }

            // The effect of ION is delayed by one instruction.
            if self.pending_ien {
                self.ien = true;
                self.pending_ien = false;
            }

            cycles -= 1;
        }
        Ok((halted, cycles))
    }

    fn poll_interrupts(&mut self) -> Result<(), EmuError> {
        for i in 0..self.devices.len() {
            let device = self.devices[i].clone();
            if device.lock().unwrap().interrupt()? {
                self.mem[INTERRUPT_SAVE as usize] = self.pc;
                self.pc = INTERRUPT_VECTOR;
                self.ien = false;
                break;
            }
        }
        Ok(())
    }

    // Returns the opcode and, for memory-reference instructions, the
    // effective address.
    fn fetch(&mut self) -> (Opcode, u16) {
        self.ir = self.mem[self.pc as usize];
        let opcode = Opcode::from_ir(self.ir);
        let mut op_addr = 0;

        if opcode.has_operand() {
            op_addr = self.ir & IR_OFFSET_MASK;
            if self.ir & IR_PAGE_BIT != 0 {
                // Current page: the page of the instruction's own address.
                op_addr |= self.pc & PAGE_MASK;
            }

            if self.ir & IR_INDIRECT_BIT != 0 {
                // Auto-index registers pre-increment.
                if op_addr & AUTOINDEX_MASK == AUTOINDEX_BASE {
                    self.mem[op_addr as usize] = mask12(self.mem[op_addr as usize] + 1);
                }
                op_addr = self.mem[op_addr as usize];
            }
        }

        trace!("PC: {:04o}  IR: {:04o}  LAC: {:05o}", self.pc, self.ir, self.lac);

        self.pc = mask12(self.pc + 1);
        (opcode, op_addr)
    }

    // Returns whether a HLT was executed.
    fn execute(&mut self, opcode: Opcode, op_addr: u16) -> Result<bool, EmuError> {
        let addr = op_addr as usize;
        match opcode {
            Opcode::And => self.lac &= self.mem[addr] | 0o10000,
            Opcode::Tad => self.lac = mask13(self.lac + self.mem[addr]),
            Opcode::Isz => {
                self.mem[addr] = mask12(self.mem[addr] + 1);
                if self.mem[addr] == 0 {
                    self.pc = mask12(self.pc + 1);
                }
            }
            Opcode::Dca => {
                self.mem[addr] = mask12(self.lac);
                self.lac &= 0o10000;
            }
            Opcode::Jms => {
                self.mem[addr] = self.pc;
                self.pc = mask12(op_addr + 1);
            }
            Opcode::Jmp => self.pc = op_addr,
            Opcode::Iot => self.iot()?,
            Opcode::Opr => return Ok(self.opr()),
        }
        Ok(false)
    }

    fn iot(&mut self) -> Result<(), EmuError> {
        match device_selector(self.ir) {
            DEV_CPU => match self.ir & 0o7 {
                0o1 => self.pending_ien = true, // ION, delayed one instruction
                0o2 => self.ien = false,        // IOF is immediate
                _ => debug!("unhandled CPU IOT: {:04o}", self.ir),
            },
            _ => {
                // Broadcast; only the device claiming the selector acts.
                let (mut pc, mut lac) = (self.pc, self.lac);
                for device in &self.devices {
                    (pc, lac) = device.lock().unwrap().iot(self.ir, pc, lac)?;
                }
                self.pc = pc;
                self.lac = lac;
            }
        }
        Ok(())
    }

    // The microcoded operate instruction. Returns whether HLT was executed.
    fn opr(&mut self) -> bool {
        if self.ir & 0o400 == 0 {
            // Group 1
            if self.ir & 0o200 != 0 {
                // CLA
                self.lac &= 0o10000;
            }
            if self.ir & 0o100 != 0 {
                // CLL
                self.lac &= 0o7777;
            }
            if self.ir & 0o40 != 0 {
                // CMA
                self.lac ^= 0o7777;
            }
            if self.ir & 0o20 != 0 {
                // CML
                self.lac ^= 0o10000;
            }
            if self.ir & 0o1 != 0 {
                // IAC
                self.lac = mask13(self.lac + 1);
            }
            match self.ir & 0o16 {
                0o12 => self.lac = rotate_right(rotate_right(self.lac)), // RTR
                0o10 => self.lac = rotate_right(self.lac),               // RAR
                0o6 => self.lac = rotate_left(rotate_left(self.lac)),    // RTL
                0o4 => self.lac = rotate_left(self.lac),                 // RAL
                0o2 => self.lac = byte_swap(self.lac),                   // BSW
                // Other rotate-field combinations are undefined; leave
                // LAC alone.
                _ => (),
            }
        } else if self.ir & 0o1 == 0 {
            // Group 2
            // SMA, SZA, SNL; bit 3 inverts the sense, giving SPA/SNA/SZL.
            let cond = (self.ir & 0o100 != 0 && self.lac & 0o4000 != 0)
                || (self.ir & 0o40 != 0 && self.lac & 0o7777 == 0)
                || (self.ir & 0o20 != 0 && self.lac & 0o10000 != 0);
            if cond == (self.ir & 0o10 == 0) {
                self.pc = mask12(self.pc + 1);
            }
            if self.ir & 0o200 != 0 {
                // CLA
                self.lac &= 0o10000;
            }
            if self.ir & 0o4 != 0 {
                // OSR
                self.lac |= self.sr;
            }
            if self.ir & 0o2 != 0 {
                // HLT
                return true;
            }
        } else {
            // Group 3. MQ is saved first so MQA|MQL exchanges AC and MQ.
            let t = self.mq;
            if self.ir & 0o201 == 0o201 {
                // CLA
                self.lac &= 0o10000;
            }
            if self.ir & 0o21 == 0o21 {
                // MQL
                self.mq = self.lac & 0o7777;
                self.lac &= 0o10000;
            }
            if self.ir & 0o101 == 0o101 {
                // MQA
                self.lac |= t;
            }
        }
        false
    }

    ///////////////////////////////////////////////////////////////////////////

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = mask12(pc);
    }

    pub fn sr(&self) -> u16 {
        self.sr
    }

    pub fn set_sr(&mut self, sr: u16) {
        self.sr = mask12(sr);
    }

    pub fn ir(&self) -> u16 {
        self.ir
    }

    pub fn lac(&self) -> u16 {
        self.lac
    }

    pub fn mq(&self) -> u16 {
        self.mq
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.ien
    }

    pub fn mem_read(&self, addr: u16) -> u16 {
        self.mem[mask12(addr) as usize]
    }

    pub fn mem_write(&mut self, addr: u16, val: u16) {
        trace!("Mem: writing {val:04o} to {addr:04o}");
        self.mem[mask12(addr) as usize] = mask12(val);
    }

    pub fn load_image(&mut self, words: &[u16], start: u16) {
        for (word, addr) in words.iter().zip(start..) {
            self.mem_write(addr, *word);
        }
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}
