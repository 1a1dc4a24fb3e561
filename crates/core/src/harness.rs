//! Runs the validation suite on a simulated board built from a run script.

use std::sync::Arc;

use cputest_config::{BoardConfig, RunAssertion, RunLimits, RunScript, StopReason};
use cputest_suite::{CaptureLog, CaseSet, Options, Suite, TxCompletion, WaitBudget};
use serde::Serialize;

use crate::bus::SystemBus;
use crate::console::SerialConsole;
use crate::interrupt::Vector;
use crate::metrics::PerformanceMetrics;
use crate::transcript::{CheckRecord, Transcript};
use crate::{Machine, SimulationError};

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stop_reason: StopReason,
    pub cases: u32,
    pub passed: u32,
    pub failed: u32,
    pub checks: Vec<CheckRecord>,
    /// Timer_B capture times, in capture order.
    pub samples: Vec<u16>,
    pub tx_interrupts: u16,
    pub cycles: u64,
    pub interrupts: u64,
    pub faults: Vec<SimulationError>,
    pub transcript: String,
}

impl RunReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.stop_reason == StopReason::Exit
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssertionResult {
    pub assertion: RunAssertion,
    pub passed: bool,
    pub detail: String,
}

pub struct Harness {
    machine: Machine,
    console: SerialConsole,
    capture: Arc<CaptureLog>,
    tx: Arc<TxCompletion>,
    options: Options,
    metrics: Arc<PerformanceMetrics>,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("machine", &self.machine)
            .field("options", &self.options)
            .finish()
    }
}

impl Harness {
    pub fn from_script(script: &RunScript, echo_stdout: bool) -> anyhow::Result<Self> {
        let cases = script.case_set()?;
        Ok(Self::new(&script.board, &script.limits, cases, echo_stdout))
    }

    pub fn new(board: &BoardConfig, limits: &RunLimits, cases: CaseSet, echo_stdout: bool) -> Self {
        let console = SerialConsole::new(echo_stdout);
        let bus = SystemBus::msp430f1611(board, console.clone());
        let mut machine = Machine::new(bus, board).with_max_cycles(limits.max_cycles);

        let capture = Arc::new(CaptureLog::new());
        let tx = Arc::new(TxCompletion::new());

        let log = Arc::clone(&capture);
        machine.attach(Vector::TimerB1, move |bus| log.on_timer_b1(bus));

        let done = Arc::clone(&tx);
        let mut wire = console.clone();
        machine.attach(Vector::Usart0Tx, move |bus| done.on_usart0_tx(bus, &mut wire));

        let metrics = Arc::new(PerformanceMetrics::new());
        machine.observers.push(metrics.clone());

        let options = Options {
            cases,
            budget: WaitBudget {
                max_polls: limits.max_polls,
            },
        };

        Self {
            machine,
            console,
            capture,
            tx,
            options,
            metrics,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn console(&self) -> &SerialConsole {
        &self.console
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn run(&mut self) -> RunReport {
        for observer in &self.machine.observers {
            observer.on_simulation_start();
        }
        tracing::info!(
            cases = self.options.cases.bits(),
            max_polls = ?self.options.budget.max_polls,
            "starting suite on simulated board"
        );

        let suite = Suite::new(&self.capture, &self.tx).with_options(self.options);
        let result = suite.run(&mut self.machine, self.console.clone());

        let text = self.console.text();
        let transcript = Transcript::parse(&text);
        let summary = match result {
            Ok(summary) => {
                self.machine.halt(StopReason::Exit);
                (summary.cases, summary.passed, summary.failed)
            }
            Err(e) => {
                tracing::error!("suite aborted: {}", e);
                self.machine.halt(StopReason::ConsoleError);
                (
                    transcript.cases.len() as u32,
                    transcript.passed() as u32,
                    transcript.failed() as u32,
                )
            }
        };

        let (times, n) = self.capture.samples();
        RunReport {
            stop_reason: self.machine.stop_reason().unwrap_or(StopReason::Exit),
            cases: summary.0,
            passed: summary.1,
            failed: summary.2,
            checks: transcript.checks,
            samples: times[..n].to_vec(),
            tx_interrupts: self.tx.count(),
            cycles: self.machine.cycles(),
            interrupts: self.machine.interrupts_serviced(),
            faults: self.machine.bus.faults().to_vec(),
            transcript: text,
        }
    }
}

/// Checks a finished run against script assertions.
pub fn evaluate(report: &RunReport, assertions: &[RunAssertion]) -> Vec<AssertionResult> {
    assertions
        .iter()
        .map(|assertion| {
            let (passed, detail) = match assertion {
                RunAssertion::OutputContains(a) => (
                    report.transcript.contains(&a.output_contains),
                    format!("output contains {:?}", a.output_contains),
                ),
                RunAssertion::MaxFailures(a) => (
                    report.failed <= a.max_failures,
                    format!("{} failed checks (max {})", report.failed, a.max_failures),
                ),
                RunAssertion::MinSamples(a) => (
                    report.samples.len() >= a.min_samples,
                    format!(
                        "{} capture samples (min {})",
                        report.samples.len(),
                        a.min_samples
                    ),
                ),
                RunAssertion::ExpectedStopReason(a) => (
                    report.stop_reason == a.expected_stop_reason,
                    format!(
                        "stop reason {:?} (expected {:?})",
                        report.stop_reason, a.expected_stop_reason
                    ),
                ),
            };
            if !passed {
                tracing::warn!("assertion failed: {}", detail);
            }
            AssertionResult {
                assertion: assertion.clone(),
                passed,
                detail,
            }
        })
        .collect()
}
