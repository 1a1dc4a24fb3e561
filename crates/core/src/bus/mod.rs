use std::collections::HashMap;

use cputest_config::BoardConfig;
use cputest_suite::{regs, Registers};

use crate::clock::ClockTree;
use crate::console::SerialConsole;
use crate::interrupt::Vector;
use crate::peripherals::port::Port;
use crate::peripherals::timer_b::TimerB;
use crate::peripherals::usart::{Usart, SFR_OFFSET};
use crate::{Peripheral, SimResult, SimulationError};

pub struct DeviceSlot {
    pub name: String,
    pub dev: Box<dyn Peripheral>,
}

/// One address range routed to a device. `offset` is the device-local offset
/// that `base` maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub base: u16,
    pub size: u16,
    pub device: usize,
    pub offset: u16,
}

impl Window {
    fn contains(&self, addr: u16) -> bool {
        addr >= self.base && (addr - self.base) < self.size
    }
}

pub struct SystemBus {
    pub devices: Vec<DeviceSlot>,
    pub windows: Vec<Window>,
    faults: Vec<SimulationError>,
}

impl std::fmt::Debug for SystemBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemBus")
            .field(
                "devices",
                &self.devices.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            )
            .field("windows", &self.windows)
            .field("faults", &self.faults)
            .finish()
    }
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// An empty bus with no devices mapped.
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            windows: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// The board the suite expects: Port 4, USART0 with its SFR bits, and
    /// Timer_B with its out-of-block TBIV register.
    pub fn msp430f1611(board: &BoardConfig, wire: SerialConsole) -> Self {
        let mut bus = Self::new();

        let port4 = bus.add_device("port4", Box::new(Port::new()));
        bus.map(port4, regs::P4IN, 4, 0);

        let usart0 = bus.add_device("usart0", Box::new(Usart::new(wire, board.rx_fifo_depth)));
        bus.map(usart0, regs::UCTL0, 8, 0);
        bus.map(usart0, regs::IE1, 6, SFR_OFFSET);

        let timer_b = bus.add_device("timer_b", Box::new(TimerB::new()));
        bus.map(timer_b, regs::TBCTL, 0x20, 0);
        bus.map(timer_b, regs::TBIV, 2, TimerB::TBIV_OFFSET);

        bus
    }

    pub fn add_device(&mut self, name: &str, dev: Box<dyn Peripheral>) -> usize {
        self.devices.push(DeviceSlot {
            name: name.to_string(),
            dev,
        });
        self.devices.len() - 1
    }

    pub fn map(&mut self, device: usize, base: u16, size: u16, offset: u16) {
        tracing::debug!(
            device = %self.devices[device].name,
            size,
            "mapping window at {:#06x}",
            base
        );
        self.windows.push(Window {
            base,
            size,
            device,
            offset,
        });
    }

    fn route(&self, addr: u16) -> SimResult<(usize, u16)> {
        self.windows
            .iter()
            .find(|w| w.contains(addr))
            .map(|w| (w.device, w.offset + (addr - w.base)))
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    pub fn try_read_u8(&mut self, addr: u16) -> SimResult<u8> {
        let (device, offset) = self.route(addr)?;
        self.devices[device].dev.read(offset)
    }

    pub fn try_write_u8(&mut self, addr: u16, value: u8) -> SimResult<()> {
        let (device, offset) = self.route(addr)?;
        self.devices[device].dev.write(offset, value)
    }

    /// Word access; both bytes must route to the same device.
    pub fn try_read_u16(&mut self, addr: u16) -> SimResult<u16> {
        let (device, offset) = self.route(addr)?;
        let (hi_device, _) = self.route(addr.wrapping_add(1))?;
        if hi_device != device {
            return Err(SimulationError::MemoryViolation(addr));
        }
        self.devices[device].dev.read_u16(offset)
    }

    pub fn try_write_u16(&mut self, addr: u16, value: u16) -> SimResult<()> {
        let (device, offset) = self.route(addr)?;
        let (hi_device, _) = self.route(addr.wrapping_add(1))?;
        if hi_device != device {
            return Err(SimulationError::MemoryViolation(addr));
        }
        self.devices[device].dev.write_u16(offset, value)
    }

    fn record_fault(&mut self, err: SimulationError) {
        tracing::warn!("Bus fault: {}", err);
        self.faults.push(err);
    }

    pub fn faults(&self) -> &[SimulationError] {
        &self.faults
    }

    pub fn tick(&mut self, clocks: &ClockTree) {
        for slot in &mut self.devices {
            slot.dev.tick(clocks);
        }
    }

    pub fn highest_pending(&self) -> Option<Vector> {
        self.devices
            .iter()
            .flat_map(|slot| {
                slot.dev
                    .vectors()
                    .iter()
                    .copied()
                    .filter(move |v| slot.dev.irq_pending(*v))
            })
            .max_by_key(|v| v.priority())
    }

    pub fn acknowledge(&mut self, vector: Vector) {
        for slot in &mut self.devices {
            if slot.dev.vectors().contains(&vector) {
                slot.dev.acknowledge(vector);
            }
        }
    }

    pub fn device<T: 'static>(&self, name: &str) -> Option<&T> {
        self.devices
            .iter()
            .find(|d| d.name == name)
            .and_then(|d| d.dev.as_any())
            .and_then(|any| any.downcast_ref::<T>())
    }

    pub fn device_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.devices
            .iter_mut()
            .find(|d| d.name == name)
            .and_then(|d| d.dev.as_any_mut())
            .and_then(|any| any.downcast_mut::<T>())
    }

    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.devices
            .iter()
            .map(|d| (d.name.clone(), d.dev.snapshot()))
            .collect()
    }
}

/// Unmapped accesses read as zero and are kept as faults for the run report.
impl Registers for SystemBus {
    fn read_u8(&mut self, addr: u16) -> u8 {
        self.try_read_u8(addr).unwrap_or_else(|e| {
            self.record_fault(e);
            0
        })
    }

    fn write_u8(&mut self, addr: u16, value: u8) {
        if let Err(e) = self.try_write_u8(addr, value) {
            self.record_fault(e);
        }
    }

    fn read_u16(&mut self, addr: u16) -> u16 {
        self.try_read_u16(addr).unwrap_or_else(|e| {
            self.record_fault(e);
            0
        })
    }

    fn write_u16(&mut self, addr: u16, value: u16) {
        if let Err(e) = self.try_write_u16(addr, value) {
            self.record_fault(e);
        }
    }
}
