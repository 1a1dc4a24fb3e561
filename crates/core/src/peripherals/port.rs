use cputest_suite::regs;

use crate::SimResult;

/// An 8-bit digital I/O port (P4 on the F1611).
#[derive(Debug, Default, serde::Serialize)]
pub struct Port {
    pins: u8, // level driven from outside
    out: u8,  // 0x01: PxOUT
    dir: u8,  // 0x02: PxDIR
    sel: u8,  // 0x03: PxSEL
}

impl Port {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the external side of the pins.
    pub fn set_pins(&mut self, level: u8) {
        self.pins = level;
    }

    pub fn dir(&self) -> u8 {
        self.dir
    }

    pub fn out(&self) -> u8 {
        self.out
    }

    /// PxIN: outputs read back what they drive.
    fn input(&self) -> u8 {
        (self.pins & !self.dir) | (self.out & self.dir)
    }
}

impl crate::Peripheral for Port {
    fn read(&mut self, offset: u16) -> SimResult<u8> {
        Ok(match offset {
            0x00 => self.input(),
            0x01 => self.out,
            0x02 => self.dir,
            0x03 => self.sel,
            _ => 0,
        })
    }

    fn write(&mut self, offset: u16, value: u8) -> SimResult<()> {
        match offset {
            0x00 => {
                return Err(crate::SimulationError::ReadOnly(regs::P4IN));
            }
            0x01 => self.out = value,
            0x02 => {
                tracing::debug!("P4DIR <= {:#04x}", value);
                self.dir = value;
            }
            0x03 => self.sel = value,
            _ => {}
        }
        Ok(())
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
