use core::fmt::Write;
use core::str::FromStr;

use bitflags::bitflags;

use crate::checks;
use crate::hal::Cpu;
use crate::isr::{CaptureLog, TxCompletion};
use crate::regs;
use crate::report::{Reporter, Summary};
use crate::wait::WaitBudget;
use crate::SuiteError;

bitflags! {
    /// Which check groups a run includes. Groups always run in this order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CaseSet: u16 {
        const ARITHMETIC = 1 << 0;
        const INTEGERS = 1 << 1;
        const FLOATS = 1 << 2;
        const STRINGS = 1 << 3;
        const BITFIELDS = 1 << 4;
        const FUNCTIONS = 1 << 5;
        const MODULO = 1 << 6;
        const USART = 1 << 7;
        const TIMER = 1 << 8;
    }
}

impl Default for CaseSet {
    fn default() -> Self {
        Self::all()
    }
}

const CASE_NAMES: [(&str, CaseSet); 9] = [
    ("arithmetic", CaseSet::ARITHMETIC),
    ("integers", CaseSet::INTEGERS),
    ("floats", CaseSet::FLOATS),
    ("strings", CaseSet::STRINGS),
    ("bitfields", CaseSet::BITFIELDS),
    ("functions", CaseSet::FUNCTIONS),
    ("modulo", CaseSet::MODULO),
    ("usart", CaseSet::USART),
    ("timer", CaseSet::TIMER),
];

impl CaseSet {
    /// Names accepted by `FromStr`, in run order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        CASE_NAMES.iter().map(|(name, _)| *name)
    }
}

/// Unrecognised case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCase;

impl core::fmt::Display for UnknownCase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown test case name")
    }
}

impl FromStr for CaseSet {
    type Err = UnknownCase;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim();
        if v.eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        CASE_NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(v))
            .map(|(_, set)| *set)
            .ok_or(UnknownCase)
    }
}

/// Run-wide knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub cases: CaseSet,
    pub budget: WaitBudget,
}

/// Hardware setup done before any check: 115200 baud from a 2.4576 MHz
/// SMCLK on USART0, then global interrupts on.
pub fn setup<C: Cpu + ?Sized>(cpu: &mut C) {
    cpu.write_u8(regs::UBR00, 0x15);
    cpu.write_u8(regs::UBR10, 0x00);
    cpu.write_u8(regs::UMCTL0, 0x00);
    cpu.enable_interrupts();
}

/// The whole validation run.
#[derive(Debug, Clone, Copy)]
pub struct Suite<'a> {
    pub capture: &'a CaptureLog,
    pub tx: &'a TxCompletion,
    pub options: Options,
}

impl<'a> Suite<'a> {
    pub fn new(capture: &'a CaptureLog, tx: &'a TxCompletion) -> Self {
        Self {
            capture,
            tx,
            options: Options::default(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Runs setup, the selected cases and the `EXIT` marker.
    pub fn run<C, W>(&self, cpu: &mut C, out: W) -> Result<Summary, SuiteError>
    where
        C: Cpu + ?Sized,
        W: Write,
    {
        let cases = self.options.cases;
        let budget = self.options.budget;
        let mut r = Reporter::new(out);

        setup(cpu);
        tracing::info!(cases = cases.bits(), "starting validation run");

        if cases.contains(CaseSet::ARITHMETIC) {
            checks::arithmetic::run(&mut r)?;
        }
        if cases.contains(CaseSet::INTEGERS) {
            checks::integers::run(&mut r)?;
        }
        if cases.contains(CaseSet::FLOATS) {
            checks::floats::run(&mut r)?;
        }
        if cases.contains(CaseSet::STRINGS) {
            checks::strings::run(&mut r)?;
        }
        if cases.contains(CaseSet::BITFIELDS) {
            checks::bitfields::run(cpu, &mut r)?;
        }
        if cases.contains(CaseSet::FUNCTIONS) {
            checks::functions::run(&mut r)?;
        }
        if cases.contains(CaseSet::MODULO) {
            checks::modulo::run(&mut r)?;
        }
        if cases.contains(CaseSet::USART) {
            checks::usart::run(cpu, &mut r, self.tx, budget)?;
        }
        if cases.contains(CaseSet::TIMER) {
            checks::timer::run(cpu, &mut r, self.capture, budget)?;
        }

        let summary = r.finish()?;
        tracing::info!(
            passed = summary.passed,
            failed = summary.failed,
            "validation run finished"
        );
        Ok(summary)
    }
}
