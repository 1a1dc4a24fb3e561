use core::fmt::{self, Write};

use crate::SuiteError;

/// Separator printed ahead of every test case header.
pub const CASE_SEPARATOR: &str = "-------------";
/// Final line of every run.
pub const EXIT_MARKER: &str = "EXIT";

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub cases: u32,
    pub passed: u32,
    pub failed: u32,
}

impl Summary {
    pub fn checks(&self) -> u32 {
        self.passed + self.failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Writes the pass/fail transcript to a console.
///
/// ```text
/// -------------
/// TEST 1: Arithmetic Operations
/// OK: (a << b) == 4 passed at crates/suite/src/checks/arithmetic.rs:12
/// ```
#[derive(Debug)]
pub struct Reporter<W: Write> {
    out: W,
    case_id: u32,
    summary: Summary,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            case_id: 0,
            summary: Summary::default(),
        }
    }

    pub fn case_id(&self) -> u32 {
        self.case_id
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn test_case(&mut self, description: &str) -> Result<(), SuiteError> {
        self.case_id += 1;
        self.summary.cases += 1;
        tracing::debug!(case = self.case_id, description, "test case");
        writeln!(self.out, "{}", CASE_SEPARATOR)?;
        writeln!(self.out, "TEST {}: {}", self.case_id, description)?;
        Ok(())
    }

    /// Records one check. Returns `passed` so callers can branch on it.
    pub fn check(
        &mut self,
        passed: bool,
        text: &str,
        file: &str,
        line: u32,
    ) -> Result<bool, SuiteError> {
        if passed {
            self.summary.passed += 1;
            writeln!(self.out, "OK: {} passed at {}:{}", text, file, line)?;
        } else {
            self.summary.failed += 1;
            tracing::warn!(case = self.case_id, text, file, line, "check failed");
            writeln!(self.out, "FAIL: {} failed at {}:{}", text, file, line)?;
        }
        Ok(passed)
    }

    /// Free-form console output (progress lines, sample dumps).
    pub fn print(&mut self, args: fmt::Arguments<'_>) -> Result<(), SuiteError> {
        self.out.write_fmt(args)?;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<Summary, SuiteError> {
        writeln!(self.out, "{}", EXIT_MARKER)?;
        Ok(self.summary)
    }
}

/// `assertTrue(expr)`: the expression text doubles as the check label.
#[macro_export]
macro_rules! assert_true {
    ($r:expr, $($cond:tt)+) => {
        $r.check($($cond)+, stringify!($($cond)+), file!(), line!())
    };
}

/// `assertFalse(expr)`: reported as `!(expr)`.
#[macro_export]
macro_rules! assert_false {
    ($r:expr, $($cond:tt)+) => {
        $r.check(
            !($($cond)+),
            concat!("!(", stringify!($($cond)+), ")"),
            file!(),
            line!(),
        )
    };
}

/// `assertTrue2(text, expr)`
#[macro_export]
macro_rules! assert_true2 {
    ($r:expr, $text:expr, $($cond:tt)+) => {
        $r.check($($cond)+, $text, file!(), line!())
    };
}

/// `assertFalse2(text, expr)`
#[macro_export]
macro_rules! assert_false2 {
    ($r:expr, $text:expr, $($cond:tt)+) => {
        $r.check(!($($cond)+), $text, file!(), line!())
    };
}

/// `printf` onto the reporter's console.
#[macro_export]
macro_rules! console {
    ($r:expr, $($arg:tt)*) => {
        $r.print(format_args!($($arg)*))
    };
}
