use cputest_suite::regs::{self, Tbcctl, Tbctl};

use crate::clock::{ClockSource, ClockTree, EdgeDivider};
use crate::interrupt::Vector;
use crate::{SimResult, SimulationError};

const CCR_BLOCKS: usize = 3;

/// Timer_B with three capture/compare blocks, compare mode only.
///
/// Local register offsets mirror the 0x180 block; TBIV (0x11E on the bus) is
/// routed to [`TimerB::TBIV_OFFSET`].
#[derive(Debug, Default, serde::Serialize)]
pub struct TimerB {
    tbctl: u16,
    cctl: [u16; CCR_BLOCKS],
    ccr: [u16; CCR_BLOCKS],
    tbr: u16,

    // Internal state
    edges: EdgeDivider,
    div_count: u8,
    counting_down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Stop,
    Up,
    Continuous,
    UpDown,
}

impl TimerB {
    pub const TBIV_OFFSET: u16 = 0x40;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> u16 {
        self.tbr
    }

    fn ctl(&self) -> Tbctl {
        Tbctl::from_bits_retain(self.tbctl)
    }

    fn mode(&self) -> Mode {
        match (self.ctl() & Tbctl::MC_MASK).bits() >> 4 {
            0 => Mode::Stop,
            1 => Mode::Up,
            2 => Mode::Continuous,
            _ => Mode::UpDown,
        }
    }

    fn source(&self) -> ClockSource {
        match (self.ctl() & Tbctl::TBSSEL_MASK).bits() >> 8 {
            1 => ClockSource::Aclk,
            2 => ClockSource::Smclk,
            _ => ClockSource::External,
        }
    }

    fn divider(&self) -> u8 {
        1 << ((self.ctl() & Tbctl::ID_MASK).bits() >> 6)
    }

    /// Largest TBR value for the configured counter length.
    fn max_count(&self) -> u16 {
        match (self.ctl() & Tbctl::CNTL_MASK).bits() >> 11 {
            0 => 0xFFFF,
            1 => 0x0FFF,
            2 => 0x03FF,
            _ => 0x00FF,
        }
    }

    fn up_target(&self) -> u16 {
        self.ccr[0].min(self.max_count())
    }

    fn flag(&self, block: usize) -> bool {
        let c = Tbcctl::from_bits_retain(self.cctl[block]);
        c.contains(Tbcctl::CCIFG | Tbcctl::CCIE)
    }

    /// Highest priority enabled TIMERB1 source, as its TBIV value.
    fn tbiv_source(&self) -> Option<u16> {
        if self.flag(1) {
            Some(regs::TBIV_CCR1)
        } else if self.flag(2) {
            Some(regs::TBIV_CCR2)
        } else if self.ctl().contains(Tbctl::TBIE | Tbctl::TBIFG) {
            Some(regs::TBIV_TBIFG)
        } else {
            None
        }
    }

    /// TBIV read: report and clear the highest pending source.
    fn take_tbiv(&mut self) -> u16 {
        let Some(value) = self.tbiv_source() else {
            return 0;
        };
        match value {
            regs::TBIV_CCR1 => self.cctl[1] &= !Tbcctl::CCIFG.bits(),
            regs::TBIV_CCR2 => self.cctl[2] &= !Tbcctl::CCIFG.bits(),
            _ => self.tbctl &= !Tbctl::TBIFG.bits(),
        }
        value
    }

    fn peek_reg(&self, offset: u16) -> u16 {
        match offset {
            0x00 => self.tbctl,
            0x02 | 0x04 | 0x06 => self.cctl[((offset - 0x02) / 2) as usize],
            0x10 => self.tbr,
            0x12 | 0x14 | 0x16 => self.ccr[((offset - 0x12) / 2) as usize],
            Self::TBIV_OFFSET => self.tbiv_source().unwrap_or(0),
            _ => 0,
        }
    }

    fn read_reg(&mut self, offset: u16) -> u16 {
        if offset == Self::TBIV_OFFSET {
            return self.take_tbiv();
        }
        self.peek_reg(offset)
    }

    fn write_reg(&mut self, offset: u16, value: u16) -> SimResult<()> {
        match offset {
            0x00 => {
                let ctl = Tbctl::from_bits_retain(value);
                if ctl.contains(Tbctl::TBCLR) {
                    self.tbr = 0;
                    self.div_count = 0;
                    self.counting_down = false;
                    self.edges.reset();
                }
                // TBCLR is self-clearing.
                self.tbctl = (ctl - Tbctl::TBCLR).bits();
                tracing::debug!(mode = ?self.mode(), source = ?self.source(), "TBCTL <= {:#06x}", value);
            }
            0x02 | 0x04 | 0x06 => {
                // CCI mirrors the input pin and cannot be written.
                self.cctl[((offset - 0x02) / 2) as usize] = value & !Tbcctl::CCI.bits();
            }
            0x10 => self.tbr = value & self.max_count(),
            0x12 | 0x14 | 0x16 => self.ccr[((offset - 0x12) / 2) as usize] = value,
            Self::TBIV_OFFSET => return Err(SimulationError::ReadOnly(regs::TBIV)),
            _ => {}
        }
        Ok(())
    }

    fn count(&mut self) {
        match self.mode() {
            Mode::Stop => return,
            // Up and up/down modes stall while TBCL0 is zero.
            Mode::Up | Mode::UpDown if self.up_target() == 0 => return,
            Mode::Continuous => {
                if self.tbr >= self.max_count() {
                    self.tbr = 0;
                    self.tbctl |= Tbctl::TBIFG.bits();
                } else {
                    self.tbr += 1;
                }
            }
            Mode::Up => {
                if self.tbr >= self.up_target() {
                    self.tbr = 0;
                    self.tbctl |= Tbctl::TBIFG.bits();
                } else {
                    self.tbr += 1;
                }
            }
            Mode::UpDown => {
                let target = self.up_target();
                if self.counting_down {
                    if self.tbr == 0 {
                        self.counting_down = false;
                        self.tbr = 1.min(target);
                    } else {
                        self.tbr -= 1;
                        if self.tbr == 0 {
                            self.tbctl |= Tbctl::TBIFG.bits();
                        }
                    }
                } else if self.tbr >= target {
                    self.counting_down = true;
                    self.tbr = self.tbr.saturating_sub(1);
                } else {
                    self.tbr += 1;
                }
            }
        }

        for block in 0..CCR_BLOCKS {
            let c = Tbcctl::from_bits_retain(self.cctl[block]);
            if !c.contains(Tbcctl::CAP) && self.tbr == self.ccr[block] {
                self.cctl[block] |= Tbcctl::CCIFG.bits();
            }
        }
    }
}

impl crate::Peripheral for TimerB {
    fn read(&mut self, offset: u16) -> SimResult<u8> {
        let reg_offset = offset & !1;
        if offset & 1 == 0 {
            Ok((self.read_reg(reg_offset) & 0xFF) as u8)
        } else {
            Ok((self.peek_reg(reg_offset) >> 8) as u8)
        }
    }

    fn write(&mut self, offset: u16, value: u8) -> SimResult<()> {
        let reg_offset = offset & !1;
        let shift = (offset & 1) * 8;
        let mut reg_val = self.peek_reg(reg_offset);
        reg_val &= !(0xFF << shift);
        reg_val |= (value as u16) << shift;
        self.write_reg(reg_offset, reg_val)
    }

    fn read_u16(&mut self, offset: u16) -> SimResult<u16> {
        Ok(self.read_reg(offset & !1))
    }

    fn write_u16(&mut self, offset: u16, value: u16) -> SimResult<()> {
        self.write_reg(offset & !1, value)
    }

    fn tick(&mut self, clocks: &ClockTree) {
        if self.mode() == Mode::Stop {
            return;
        }
        if !self.edges.step(clocks, self.source()) {
            return;
        }
        self.div_count += 1;
        if self.div_count < self.divider() {
            return;
        }
        self.div_count = 0;
        self.count();
    }

    fn vectors(&self) -> &'static [Vector] {
        &[Vector::TimerB0, Vector::TimerB1]
    }

    fn irq_pending(&self, vector: Vector) -> bool {
        match vector {
            Vector::TimerB0 => self.flag(0),
            Vector::TimerB1 => self.tbiv_source().is_some(),
            _ => false,
        }
    }

    fn acknowledge(&mut self, vector: Vector) {
        // Only the CCR0 flag resets on acceptance; TIMERB1 sources clear via TBIV.
        if vector == Vector::TimerB0 {
            self.cctl[0] &= !Tbcctl::CCIFG.bits();
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }
}
