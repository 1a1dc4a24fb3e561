/// Byte-addressed access to memory-mapped peripheral registers.
///
/// Reads take `&mut self` because some registers (TBIV, URXBUF0) clear state
/// when read.
pub trait Registers {
    fn read_u8(&mut self, addr: u16) -> u8;
    fn write_u8(&mut self, addr: u16, value: u8);

    fn read_u16(&mut self, addr: u16) -> u16 {
        let b0 = self.read_u8(addr) as u16;
        let b1 = self.read_u8(addr.wrapping_add(1)) as u16;
        // Little Endian
        b0 | (b1 << 8)
    }

    fn write_u16(&mut self, addr: u16, value: u16) {
        self.write_u8(addr, (value & 0xFF) as u8);
        self.write_u8(addr.wrapping_add(1), (value >> 8) as u8);
    }

    /// `reg |= bits`
    fn set_bits_u8(&mut self, addr: u16, bits: u8) {
        let v = self.read_u8(addr);
        self.write_u8(addr, v | bits);
    }

    /// `reg |= bits`
    fn set_bits_u16(&mut self, addr: u16, bits: u16) {
        let v = self.read_u16(addr);
        self.write_u16(addr, v | bits);
    }
}

/// The CPU-side controls the suite needs on top of register access.
pub trait Cpu: Registers {
    /// `eint()`: set GIE.
    fn enable_interrupts(&mut self);
    /// `dint()`: clear GIE.
    fn disable_interrupts(&mut self);

    /// One iteration of a busy-wait loop.
    fn relax(&mut self) {
        core::hint::spin_loop();
    }

    /// `while (n-- > 0);`
    fn delay(&mut self, iterations: u32) {
        for _ in 0..iterations {
            self.relax();
        }
    }

    /// A simulated CPU that ran out of cycle budget reports itself halted so
    /// waits can give up instead of spinning on a frozen clock.
    fn is_halted(&self) -> bool {
        false
    }
}
