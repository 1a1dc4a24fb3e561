//! Reads a console transcript back into structured check results.
//!
//! Lines other than case headers, check lines and the exit marker are
//! program output and are skipped. Bytes the USART put on the wire can land
//! in front of a line, so markers are searched for, not anchored.

use cputest_suite::EXIT_MARKER;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRecord {
    /// 0 for checks printed before the first case header.
    pub case_id: u32,
    pub case: String,
    pub status: CheckStatus,
    pub text: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    pub cases: Vec<CaseRecord>,
    pub checks: Vec<CheckRecord>,
    pub exited: bool,
}

impl Transcript {
    pub fn parse(text: &str) -> Self {
        let mut out = Transcript::default();
        for line in text.lines() {
            if let Some((id, name)) = parse_header(line) {
                out.cases.push(CaseRecord {
                    id,
                    name: name.to_string(),
                });
            } else if let Some((status, body)) = parse_check(line) {
                let Some((text, file, line_no)) = split_location(body, status) else {
                    tracing::debug!(line, "malformed check line");
                    continue;
                };
                let (case_id, case) = out
                    .cases
                    .last()
                    .map(|c| (c.id, c.name.clone()))
                    .unwrap_or_default();
                out.checks.push(CheckRecord {
                    case_id,
                    case,
                    status,
                    text: text.to_string(),
                    file: file.to_string(),
                    line: line_no,
                });
            } else if line.trim_end() == EXIT_MARKER {
                out.exited = true;
            }
        }
        out
    }

    pub fn passed(&self) -> usize {
        self.count(CheckStatus::Pass)
    }

    pub fn failed(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckRecord> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}

fn parse_header(line: &str) -> Option<(u32, &str)> {
    let rest = &line[line.find("TEST ")? + 5..];
    let (id, name) = rest.split_once(": ")?;
    Some((id.parse().ok()?, name.trim_end()))
}

fn parse_check(line: &str) -> Option<(CheckStatus, &str)> {
    if let Some(pos) = line.find("FAIL: ") {
        return Some((CheckStatus::Fail, &line[pos + 6..]));
    }
    let pos = line.find("OK: ")?;
    Some((CheckStatus::Pass, &line[pos + 4..]))
}

fn split_location(body: &str, status: CheckStatus) -> Option<(&str, &str, u32)> {
    let sep = match status {
        CheckStatus::Pass => " passed at ",
        CheckStatus::Fail => " failed at ",
    };
    let (text, location) = body.trim_end().rsplit_once(sep)?;
    let (file, line) = location.rsplit_once(':')?;
    Some((text, file, line.parse().ok()?))
}
