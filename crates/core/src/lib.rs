//! Simulated MSP430F1611-class board for running the `cputest-suite` checks
//! on a host.

pub mod bus;
pub mod clock;
pub mod console;
pub mod harness;
pub mod interrupt;
pub mod metrics;
pub mod peripherals;
pub mod snapshot;
pub mod transcript;

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use cputest_config::{BoardConfig, StopReason};
use cputest_suite::{Cpu, Registers};

use crate::bus::SystemBus;
use crate::clock::ClockTree;
use crate::interrupt::Vector;

mod tests;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#06x}")]
    MemoryViolation(u16),
    #[error("Write to read-only register at {0:#06x}")]
    ReadOnly(u16),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self, _reason: StopReason) {}
    fn on_cycles(&self, _cycles: u64) {}
    fn on_interrupt(&self, _vector: Vector) {}
    fn on_register_access(&self, _addr: u16, _write: bool) {}
}

/// Trait representing a memory-mapped peripheral.
///
/// Offsets are device-local; the bus translates addresses. Word access
/// defaults to two byte accesses, low byte first.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&mut self, offset: u16) -> SimResult<u8>;
    fn write(&mut self, offset: u16, value: u8) -> SimResult<()>;

    fn read_u16(&mut self, offset: u16) -> SimResult<u16> {
        let lo = self.read(offset)? as u16;
        let hi = self.read(offset + 1)? as u16;
        Ok(lo | (hi << 8))
    }

    fn write_u16(&mut self, offset: u16, value: u16) -> SimResult<()> {
        self.write(offset, (value & 0xFF) as u8)?;
        self.write(offset + 1, (value >> 8) as u8)
    }

    /// Advance by one MCLK cycle.
    fn tick(&mut self, _clocks: &ClockTree) {}

    /// Vectors this device can raise.
    fn vectors(&self) -> &'static [Vector] {
        &[]
    }

    /// Level of the interrupt request line for `vector`.
    fn irq_pending(&self, _vector: Vector) -> bool {
        false
    }

    /// The CPU accepted `vector`; flags that auto-reset on acceptance clear here.
    fn acknowledge(&mut self, _vector: Vector) {}

    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

/// Interrupt service routine bound to a vector. It sees the bus only, so
/// handlers cannot re-enter the dispatcher.
pub type IsrHandler = Box<dyn FnMut(&mut SystemBus) + Send>;

/// Handlers dispatched back-to-back at one instruction boundary before the
/// main flow gets to run again.
const MAX_DISPATCH_PER_BOUNDARY: usize = 16;

pub struct Machine {
    pub bus: SystemBus,
    pub clocks: ClockTree,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    handlers: BTreeMap<Vector, IsrHandler>,
    gie: bool,
    cycles: u64,
    max_cycles: Option<u64>,
    cycles_per_poll: u32,
    cycles_per_delay: u32,
    stop: Option<StopReason>,
    interrupts: u64,
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("bus", &self.bus)
            .field("clocks", &self.clocks)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("gie", &self.gie)
            .field("cycles", &self.cycles)
            .field("stop", &self.stop)
            .finish()
    }
}

impl Machine {
    pub fn new(bus: SystemBus, board: &BoardConfig) -> Self {
        Self {
            bus,
            clocks: ClockTree::from(board),
            observers: Vec::new(),
            handlers: BTreeMap::new(),
            gie: false,
            cycles: 0,
            max_cycles: None,
            cycles_per_poll: board.cycles_per_poll.max(1),
            cycles_per_delay: board.cycles_per_delay,
            stop: None,
            interrupts: 0,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// Installs the service routine for `vector`, replacing any previous one.
    pub fn attach<F>(&mut self, vector: Vector, handler: F)
    where
        F: FnMut(&mut SystemBus) + Send + 'static,
    {
        tracing::debug!(%vector, "attaching interrupt handler");
        self.handlers.insert(vector, Box::new(handler));
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn interrupts_serviced(&self) -> u64 {
        self.interrupts
    }

    pub fn gie(&self) -> bool {
        self.gie
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    fn halt(&mut self, reason: StopReason) {
        if self.stop.is_none() {
            if reason == StopReason::Exit {
                tracing::info!(cycles = self.cycles, "simulation finished");
            } else {
                tracing::warn!(?reason, cycles = self.cycles, "simulation halted");
            }
            self.stop = Some(reason);
            for observer in &self.observers {
                observer.on_simulation_stop(reason);
            }
        }
    }

    /// Runs `cycles` MCLK cycles, servicing interrupts at every boundary.
    pub fn advance(&mut self, cycles: u64) {
        let mut ran = 0;
        for _ in 0..cycles {
            if self.stop.is_some() {
                break;
            }
            if let Some(max) = self.max_cycles {
                if self.cycles >= max {
                    self.halt(StopReason::MaxCycles);
                    break;
                }
            }
            self.bus.tick(&self.clocks);
            self.cycles += 1;
            ran += 1;
            self.service_interrupts();
        }
        for observer in &self.observers {
            observer.on_cycles(ran);
        }
    }

    /// Dispatches pending interrupts while GIE is set, highest priority first.
    pub fn service_interrupts(&mut self) {
        for _ in 0..MAX_DISPATCH_PER_BOUNDARY {
            if !self.gie || self.stop.is_some() {
                return;
            }
            let Some(vector) = self.bus.highest_pending() else {
                return;
            };
            self.bus.acknowledge(vector);
            self.interrupts += 1;
            for observer in &self.observers {
                observer.on_interrupt(vector);
            }

            let Some(handler) = self.handlers.get_mut(&vector) else {
                tracing::error!(%vector, "interrupt with no handler installed");
                self.halt(StopReason::UnhandledInterrupt);
                return;
            };
            tracing::trace!(%vector, cycles = self.cycles, "entering isr");
            // Entry clears GIE; RETI restores the saved status register.
            self.gie = false;
            handler(&mut self.bus);
            self.gie = true;
        }
    }

    pub fn snapshot(&self) -> snapshot::MachineSnapshot {
        snapshot::MachineSnapshot {
            cycles: self.cycles,
            gie: self.gie,
            interrupts: self.interrupts,
            stop_reason: self.stop,
            peripherals: self.bus.snapshot(),
        }
    }
}

impl Registers for Machine {
    fn read_u8(&mut self, addr: u16) -> u8 {
        for observer in &self.observers {
            observer.on_register_access(addr, false);
        }
        self.bus.read_u8(addr)
    }

    fn write_u8(&mut self, addr: u16, value: u8) {
        for observer in &self.observers {
            observer.on_register_access(addr, true);
        }
        self.bus.write_u8(addr, value);
        self.service_interrupts();
    }

    fn read_u16(&mut self, addr: u16) -> u16 {
        for observer in &self.observers {
            observer.on_register_access(addr, false);
        }
        self.bus.read_u16(addr)
    }

    fn write_u16(&mut self, addr: u16, value: u16) {
        for observer in &self.observers {
            observer.on_register_access(addr, true);
        }
        self.bus.write_u16(addr, value);
        self.service_interrupts();
    }
}

impl Cpu for Machine {
    fn enable_interrupts(&mut self) {
        self.gie = true;
        self.service_interrupts();
    }

    fn disable_interrupts(&mut self) {
        self.gie = false;
    }

    fn relax(&mut self) {
        self.advance(self.cycles_per_poll as u64);
    }

    fn delay(&mut self, iterations: u32) {
        self.advance(iterations as u64 * self.cycles_per_delay as u64);
    }

    fn is_halted(&self) -> bool {
        self.stop.is_some()
    }
}
