//! Compiler/CPU validation checks for MSP430-class microcontrollers.
//!
//! The suite is a flat list of assertion-style checks printed to a console,
//! plus two interrupt-driven peripheral exercises (USART0 transmit complete
//! and Timer_B compare capture). It only talks to hardware through
//! [`hal::Registers`] and [`hal::Cpu`], so the same code runs on a board or
//! on the simulator in `cputest-core`.

#![cfg_attr(not(test), no_std)]

pub mod bitfield;
pub mod checks;
pub mod fmtbuf;
pub mod hal;
pub mod isr;
pub mod regs;
pub mod report;
pub mod suite;
pub mod wait;

#[cfg(test)]
mod testing;

pub use hal::{Cpu, Registers};
pub use isr::{CaptureLog, TxCompletion, CAPTURE_SAMPLES, CAPTURE_STEP};
pub use report::{Reporter, Summary, EXIT_MARKER};
pub use suite::{CaseSet, Options, Suite, UnknownCase};
pub use wait::{WaitBudget, WaitOutcome};

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteError {
    /// The console rejected output.
    Console,
}

impl fmt::Display for SuiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuiteError::Console => f.write_str("console write failed"),
        }
    }
}

impl From<fmt::Error> for SuiteError {
    fn from(_: fmt::Error) -> Self {
        SuiteError::Console
    }
}
