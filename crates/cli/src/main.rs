use clap::{Parser, Subcommand};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use cputest_config::{BoardConfig, RunAssertion, RunLimits, RunScript, StopReason};
use cputest_core::harness::{evaluate, AssertionResult, Harness, RunReport};
use cputest_core::transcript::{CheckRecord, CheckStatus};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compiler/CPU validation suite on a simulated MSP430F1611",
    long_about = None
)]
struct Cli {
    /// Enable debug-level tracing of register and interrupt activity
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the suite and print the transcript.
    Run(RunArgs),

    /// Deterministic, CI-friendly mode driven by a run script (YAML).
    Test(TestArgs),
}

/// Overrides shared by both modes.
#[derive(clap::Args, Debug)]
struct Overrides {
    /// Busy-wait iterations before a peripheral check gives up
    #[arg(long)]
    max_polls: Option<u32>,

    /// Simulated cycles before the board halts
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Comma-separated case names (default: all)
    #[arg(long, value_delimiter = ',')]
    cases: Vec<String>,

    /// Capture the transcript without echoing it to stdout
    #[arg(long)]
    no_stdout: bool,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to a run script (YAML); defaults are used when absent
    #[arg(short = 'c', long)]
    script: Option<PathBuf>,

    /// Write a machine snapshot (JSON) after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the run script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Directory to write artifacts (result.json, junit.xml, transcript.log, snapshot.json)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Optional path to write a JUnit XML report for CI systems
    #[arg(long)]
    junit: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    stop_reason: StopReason,
    cases: u32,
    passed: u32,
    failed: u32,
    cycles: u64,
    interrupts: u64,
    tx_interrupts: u16,
    samples: Vec<u16>,
    faults: Vec<String>,
    limits: RunLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    assertions: Vec<AssertionResult>,
    checks: Vec<CheckRecord>,
    transcript_sha256: String,
    config: TestConfig,
}

#[derive(Debug, Serialize)]
struct ConfigErrorResult {
    result_schema_version: String,
    status: String,
    message: String,
    script: PathBuf,
}

#[derive(Debug, Serialize, Clone)]
struct TestConfig {
    script: Option<PathBuf>,
    cases: Vec<String>,
    board: BoardConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag.
    // Logs go to stderr; stdout carries the transcript.
    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run_suite(args),
        Commands::Test(args) => run_test(args),
    }
}

fn load_script(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<RunScript> {
    let mut script = match path {
        Some(p) => {
            info!("Loading run script: {:?}", p);
            RunScript::from_file(p)?
        }
        None => RunScript::default(),
    };

    if overrides.max_polls.is_some() {
        script.limits.max_polls = overrides.max_polls;
    }
    if let Some(max_cycles) = overrides.max_cycles {
        script.limits.max_cycles = max_cycles;
    }
    if !overrides.cases.is_empty() {
        script.cases = overrides.cases.clone();
    }
    script.validate()?;
    Ok(script)
}

fn run_suite(args: RunArgs) -> ExitCode {
    let script = match load_script(args.script.as_deref(), &args.overrides) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut harness = match Harness::from_script(&script, !args.overrides.no_stdout) {
        Ok(h) => h,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let start = Instant::now();
    let report = harness.run();
    report_metrics(&harness, &report, start.elapsed());

    if let Some(path) = &args.snapshot {
        if let Err(e) = write_json(path, &harness.machine().snapshot()) {
            error!("Failed to write snapshot {:?}: {:#}", path, e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
        info!("Snapshot written to {:?}", path);
    }

    if report.stop_reason != StopReason::Exit {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else if report.failed > 0 {
        ExitCode::from(EXIT_ASSERT_FAIL)
    } else {
        ExitCode::from(EXIT_PASS)
    }
}

fn report_metrics(harness: &Harness, report: &RunReport, elapsed: Duration) {
    info!(
        "{} cases, {} checks passed, {} failed",
        report.cases, report.passed, report.failed
    );
    for check in report.checks.iter().filter(|c| c.status == CheckStatus::Fail) {
        warn!(
            "FAILED in '{}': {} ({}:{})",
            check.case, check.text, check.file, check.line
        );
    }
    for fault in &report.faults {
        warn!("Bus fault: {}", fault);
    }
    let metrics = harness.metrics();
    info!(
        "Stop reason: {:?} after {} cycles, {} interrupts ({} register writes)",
        report.stop_reason,
        report.cycles,
        report.interrupts,
        metrics.get_register_writes()
    );
    info!(
        "Simulated {:.0} cycles/s in {:.3}s",
        metrics.get_cps(),
        elapsed.as_secs_f64()
    );
}

fn run_test(args: TestArgs) -> ExitCode {
    let script = match load_script(Some(args.script.as_path()), &args.overrides) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut harness = match Harness::from_script(&script, !args.overrides.no_stdout) {
        Ok(h) => h,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let start = Instant::now();
    let report = harness.run();
    let duration = start.elapsed();
    report_metrics(&harness, &report, duration);

    let assertion_results = evaluate(&report, &script.assertions);
    let expected_stop_matched = assertion_results
        .iter()
        .any(|a| matches!(a.assertion, RunAssertion::ExpectedStopReason(_)) && a.passed);

    // Without assertions the run must finish cleanly with every check passing.
    let all_passed = if script.assertions.is_empty() {
        report.failed == 0
    } else {
        assertion_results.iter().all(|a| a.passed)
    };
    let abnormal_stop = report.stop_reason != StopReason::Exit && !expected_stop_matched;

    let status = if abnormal_stop {
        "error"
    } else if !all_passed {
        "fail"
    } else {
        "pass"
    };

    let mut hasher = Sha256::new();
    hasher.update(report.transcript.as_bytes());
    let transcript_sha256 = format!("{:x}", hasher.finalize());

    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        stop_reason: report.stop_reason,
        cases: report.cases,
        passed: report.passed,
        failed: report.failed,
        cycles: report.cycles,
        interrupts: report.interrupts,
        tx_interrupts: report.tx_interrupts,
        samples: report.samples.clone(),
        faults: report.faults.iter().map(|f| f.to_string()).collect(),
        limits: script.limits.clone(),
        message: abnormal_stop
            .then(|| format!("run stopped early: {:?}", report.stop_reason)),
        assertions: assertion_results,
        checks: report.checks.clone(),
        transcript_sha256,
        config: TestConfig {
            script: Some(args.script.clone()),
            cases: script.cases.clone(),
            board: script.board.clone(),
        },
    };
    write_outputs(&args, &harness, &report, &result, duration);

    match status {
        "error" => ExitCode::from(EXIT_RUNTIME_ERROR),
        "fail" => ExitCode::from(EXIT_ASSERT_FAIL),
        _ => ExitCode::from(EXIT_PASS),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let f = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(f, value)?;
    Ok(())
}

fn write_outputs(
    args: &TestArgs,
    harness: &Harness,
    report: &RunReport,
    result: &TestResult,
    duration: Duration,
) {
    if let Some(output_dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            error!("Failed to create output directory {:?}: {}", output_dir, e);
        } else {
            if let Err(e) = write_json(&output_dir.join("result.json"), result) {
                error!("Failed to write result.json: {:#}", e);
            }

            if let Err(e) = write_json(
                &output_dir.join("snapshot.json"),
                &harness.machine().snapshot(),
            ) {
                error!("Failed to write snapshot.json: {:#}", e);
            }

            let transcript_path = output_dir.join("transcript.log");
            if let Err(e) = std::fs::write(&transcript_path, report.transcript.as_bytes()) {
                error!("Failed to write transcript.log: {}", e);
            }

            let junit_path = output_dir.join("junit.xml");
            if let Err(e) = write_junit_xml(&junit_path, result, duration) {
                error!("Failed to write junit.xml: {}", e);
            }
        }
    }

    if let Some(junit_path) = &args.junit {
        if let Some(parent) = junit_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = write_junit_xml(junit_path, result, duration) {
            error!("Failed to write JUnit report {:?}: {}", junit_path, e);
        }
    }
}

fn write_config_error_outputs(args: &TestArgs, message: String) {
    let result = ConfigErrorResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: "error".to_string(),
        message,
        script: args.script.clone(),
    };

    if let Some(output_dir) = &args.output_dir {
        if let Err(e) = write_json(&output_dir.join("result.json"), &result) {
            error!("Failed to write result.json: {:#}", e);
        }
    }

    let junit_targets = args
        .output_dir
        .as_ref()
        .map(|d| d.join("junit.xml"))
        .into_iter()
        .chain(args.junit.clone());
    for path in junit_targets {
        let xml = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                "\n",
                r#"<testsuite name="cputest" tests="1" failures="0" errors="1" time="0.000000">"#,
                "\n",
                "  <testcase classname=\"cputest\" name=\"config\" time=\"0.000000\">\n",
                "    <error message=\"config error\">{}</error>\n",
                "  </testcase>\n",
                "</testsuite>\n"
            ),
            xml_escape(&result.message)
        );
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&path, xml) {
            error!("Failed to write JUnit report {:?}: {}", path, e);
        }
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn assertion_short_name(assertion: &RunAssertion) -> String {
    match assertion {
        RunAssertion::OutputContains(a) => format!("output_contains {:?}", a.output_contains),
        RunAssertion::MaxFailures(a) => format!("max_failures {}", a.max_failures),
        RunAssertion::MinSamples(a) => format!("min_samples {}", a.min_samples),
        RunAssertion::ExpectedStopReason(a) => {
            format!("expected_stop_reason {:?}", a.expected_stop_reason)
        }
    }
}

fn write_junit_xml(path: &Path, result: &TestResult, duration: Duration) -> std::io::Result<()> {
    let time_secs = duration.as_secs_f64();
    let mut tests: u64 = 0;
    let mut failures: u64 = 0;
    let mut errors: u64 = 0;
    let mut testcases = String::new();

    // A top-level "run" testcase carries abnormal stops.
    tests += 1;
    testcases.push_str(&format!(
        "  <testcase classname=\"cputest\" name=\"run\" time=\"{:.6}\">\n",
        time_secs
    ));
    if result.status == "error" {
        errors += 1;
        testcases.push_str(&format!(
            "    <error message=\"runtime error\">{}</error>\n",
            xml_escape(result.message.as_deref().unwrap_or("run stopped early"))
        ));
    }
    testcases.push_str("  </testcase>\n");

    // One testcase per suite check, grouped by case.
    for check in &result.checks {
        tests += 1;
        let name = format!("{} ({}:{})", check.text, check.file, check.line);
        testcases.push_str(&format!(
            "  <testcase classname=\"{}\" name=\"{}\" time=\"0.000000\">\n",
            xml_escape(&check.case),
            xml_escape(&name)
        ));
        if check.status == CheckStatus::Fail {
            failures += 1;
            testcases.push_str(&format!(
                "    <failure message=\"check failed\">{}</failure>\n",
                xml_escape(&name)
            ));
        }
        testcases.push_str("  </testcase>\n");
    }

    for (idx, a) in result.assertions.iter().enumerate() {
        tests += 1;
        let name = format!(
            "assertion {}: {}",
            idx + 1,
            assertion_short_name(&a.assertion)
        );
        testcases.push_str(&format!(
            "  <testcase classname=\"cputest.assertions\" name=\"{}\" time=\"0.000000\">\n",
            xml_escape(&name)
        ));
        if !a.passed {
            failures += 1;
            testcases.push_str(&format!(
                "    <failure message=\"assertion failed\">{}</failure>\n",
                xml_escape(&a.detail)
            ));
        }
        testcases.push_str("  </testcase>\n");
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuite name="cputest" tests="{}" failures="{}" errors="{}" time="{:.6}">"#,
        tests, failures, errors, time_secs
    ));
    xml.push('\n');
    xml.push_str("  <properties>\n");
    xml.push_str(&format!(
        "    <property name=\"result_schema_version\" value=\"{}\"/>\n",
        xml_escape(RESULT_SCHEMA_VERSION)
    ));
    xml.push_str(&format!(
        "    <property name=\"stop_reason\" value=\"{}\"/>\n",
        xml_escape(&format!("{:?}", result.stop_reason))
    ));
    xml.push_str(&format!(
        "    <property name=\"transcript_sha256\" value=\"{}\"/>\n",
        xml_escape(&result.transcript_sha256)
    ));
    xml.push_str("  </properties>\n");
    xml.push_str(&testcases);
    xml.push_str("</testsuite>\n");

    std::fs::write(path, xml)
}
