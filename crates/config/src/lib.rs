use anyhow::{Context, Result};
use cputest_suite::CaseSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hard ceiling on simulated cycles a script may request.
pub const MAX_ALLOWED_CYCLES: u64 = 1_000_000_000;

/// Clock tree and timing of the simulated board.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct BoardConfig {
    pub mclk_hz: u64,
    pub smclk_hz: u64,
    pub aclk_hz: u64,
    /// Simulated cycles spent by one busy-wait iteration of the main loop.
    pub cycles_per_poll: u32,
    /// Cycles per iteration of a `while (n-- > 0);` delay loop.
    pub cycles_per_delay: u32,
    /// Capacity of the USART0 receive FIFO fed by the host.
    pub rx_fifo_depth: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            mclk_hz: 2_457_600,
            smclk_hz: 2_457_600,
            aclk_hz: 32_768,
            cycles_per_poll: 1_000,
            cycles_per_delay: 3,
            rx_fifo_depth: 16,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    /// Busy-wait iterations before a peripheral check gives up. Omitted
    /// means [`DEFAULT_MAX_POLLS`]; an explicit `null` waits forever, as the
    /// hardware loop does.
    #[serde(default = "default_max_polls")]
    pub max_polls: Option<u32>,
    pub max_cycles: u64,
}

/// Poll budget used when a script does not set `max_polls`.
pub const DEFAULT_MAX_POLLS: u32 = 100_000;

fn default_max_polls() -> Option<u32> {
    Some(DEFAULT_MAX_POLLS)
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_polls: default_max_polls(),
            max_cycles: 50_000_000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The suite printed its `EXIT` marker.
    Exit,
    MaxCycles,
    UnhandledInterrupt,
    ConsoleError,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputContainsAssertion {
    pub output_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MaxFailuresAssertion {
    pub max_failures: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MinSamplesAssertion {
    pub min_samples: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RunAssertion {
    OutputContains(OutputContainsAssertion),
    MaxFailures(MaxFailuresAssertion),
    MinSamples(MinSamplesAssertion),
    ExpectedStopReason(StopReasonAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunScript {
    pub schema_version: String,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub limits: RunLimits,
    /// Case names to run; empty runs everything.
    #[serde(default)]
    pub cases: Vec<String>,
    #[serde(default)]
    pub assertions: Vec<RunAssertion>,
}

impl Default for RunScript {
    fn default() -> Self {
        Self {
            schema_version: "1.0".to_string(),
            board: BoardConfig::default(),
            limits: RunLimits::default(),
            cases: Vec::new(),
            assertions: Vec::new(),
        }
    }
}

impl RunScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open run script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse run script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self = serde_yaml::from_str(yaml).context("Failed to parse run script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        let b = &self.board;
        if b.mclk_hz == 0 || b.smclk_hz == 0 || b.aclk_hz == 0 {
            anyhow::bail!("Board clocks must be non-zero");
        }
        if b.smclk_hz > b.mclk_hz || b.aclk_hz > b.mclk_hz {
            anyhow::bail!(
                "Board clocks 'smclk_hz' and 'aclk_hz' cannot exceed 'mclk_hz' ({})",
                b.mclk_hz
            );
        }
        if b.cycles_per_poll == 0 {
            anyhow::bail!("Board 'cycles_per_poll' must be greater than zero");
        }
        if b.rx_fifo_depth == 0 {
            anyhow::bail!("Board 'rx_fifo_depth' must be greater than zero");
        }

        if self.limits.max_cycles == 0 {
            anyhow::bail!("Limit 'max_cycles' must be greater than zero");
        }
        if self.limits.max_cycles > MAX_ALLOWED_CYCLES {
            anyhow::bail!(
                "Limit 'max_cycles' ({}) exceeds the allowed maximum of {}",
                self.limits.max_cycles,
                MAX_ALLOWED_CYCLES
            );
        }

        self.case_set()?;
        Ok(())
    }

    /// Resolves `cases` into the set the suite runs.
    pub fn case_set(&self) -> Result<CaseSet> {
        if self.cases.is_empty() {
            return Ok(CaseSet::all());
        }
        self.cases.iter().try_fold(CaseSet::empty(), |acc, name| {
            let set: CaseSet = name.parse().map_err(|_| {
                anyhow::anyhow!(
                    "Unknown case '{}'. Known cases: {}",
                    name,
                    CaseSet::names().collect::<Vec<_>>().join(", ")
                )
            })?;
            Ok(acc | set)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
board:
  aclk_hz: 32768
  cycles_per_poll: 500
limits:
  max_polls: 2000
  max_cycles: 1000000
cases: [arithmetic, timer]
assertions:
  - output_contains: "EXIT"
  - max_failures: 0
  - min_samples: 10
  - expected_stop_reason: exit
"#;
        let script = RunScript::from_yaml(yaml).unwrap();
        assert_eq!(script.board.cycles_per_poll, 500);
        assert_eq!(script.board.mclk_hz, 2_457_600);
        assert_eq!(script.limits.max_polls, Some(2000));
        assert_eq!(script.assertions.len(), 4);
        assert_eq!(
            script.assertions[3],
            RunAssertion::ExpectedStopReason(StopReasonAssertion {
                expected_stop_reason: StopReason::Exit
            })
        );
        assert_eq!(
            script.case_set().unwrap(),
            CaseSet::ARITHMETIC | CaseSet::TIMER
        );
    }

    #[test]
    fn test_minimal_script_uses_defaults() {
        let script = RunScript::from_yaml("schema_version: \"1.0\"\n").unwrap();
        assert_eq!(script.board, BoardConfig::default());
        assert_eq!(script.limits, RunLimits::default());
        assert_eq!(script.case_set().unwrap(), CaseSet::all());
    }

    #[test]
    fn test_omitted_max_polls_keeps_default_budget() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_cycles: 1000
"#;
        let script = RunScript::from_yaml(yaml).unwrap();
        assert_eq!(script.limits.max_polls, Some(DEFAULT_MAX_POLLS));
        assert_eq!(script.limits.max_polls, RunLimits::default().max_polls);
    }

    #[test]
    fn test_null_max_polls_means_unbounded() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_polls: null
  max_cycles: 1000
"#;
        let script = RunScript::from_yaml(yaml).unwrap();
        assert_eq!(script.limits.max_polls, None);
    }

    #[test]
    fn test_invalid_version() {
        let err = RunScript::from_yaml("schema_version: \"2.0\"\n").unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_unknown_case() {
        let yaml = r#"
schema_version: "1.0"
cases: [timer, scheduler]
"#;
        let err = RunScript::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Unknown case 'scheduler'"));
    }

    #[test]
    fn test_clock_faster_than_mclk() {
        let yaml = r#"
schema_version: "1.0"
board:
  mclk_hz: 1000000
  smclk_hz: 8000000
"#;
        let err = RunScript::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("cannot exceed"));
    }

    #[test]
    fn test_max_cycles_guard() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_cycles: 2000000000
"#;
        let err = RunScript::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("max_cycles"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
schema_version: "1.0"
board:
  cpu_mhz: 8
"#;
        assert!(RunScript::from_yaml(yaml).is_err());
    }
}
