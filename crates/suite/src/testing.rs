//! Flat register file standing in for a board in unit tests.

use crate::hal::{Cpu, Registers};
use crate::regs;

#[derive(Debug)]
pub struct RegisterFile {
    pub mem: [u8; 0x200],
    /// Value returned (once) by the next TBIV read.
    pub tbiv: u16,
    pub gie: bool,
    pub relaxes: u32,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            mem: [0; 0x200],
            tbiv: 0,
            gie: false,
            relaxes: 0,
        }
    }
}

impl Registers for RegisterFile {
    fn read_u8(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write_u8(&mut self, addr: u16, value: u8) {
        self.mem[addr as usize] = value;
    }

    fn read_u16(&mut self, addr: u16) -> u16 {
        if addr == regs::TBIV {
            return core::mem::take(&mut self.tbiv);
        }
        let a = addr as usize;
        self.mem[a] as u16 | ((self.mem[a + 1] as u16) << 8)
    }
}

impl Cpu for RegisterFile {
    fn enable_interrupts(&mut self) {
        self.gie = true;
    }

    fn disable_interrupts(&mut self) {
        self.gie = false;
    }

    fn relax(&mut self) {
        self.relaxes += 1;
    }
}
