use cputest_config::{RunAssertion, RunScript, StopReason};
use cputest_core::harness::{evaluate, Harness};
use cputest_core::transcript::CheckStatus;

fn script(yaml: &str) -> RunScript {
    RunScript::from_yaml(yaml).expect("valid script")
}

#[test]
fn test_full_run_passes_on_default_board() {
    let mut harness = Harness::from_script(&RunScript::default(), false).unwrap();
    let report = harness.run();

    assert_eq!(report.stop_reason, StopReason::Exit);
    assert_eq!(report.cases, 9);
    assert_eq!(report.failed, 0, "transcript:\n{}", report.transcript);
    assert_eq!(report.passed, 41);
    assert!(report.all_passed());
    assert!(report.faults.is_empty());

    let expected: Vec<u16> = (1..=10).map(|i| i * 100).collect();
    assert_eq!(report.samples, expected);

    assert_eq!(report.tx_interrupts, 2);
    assert_eq!(report.transcript.matches("*IRQ: Flags:0 33").count(), 2);
    assert!(report.transcript.contains("a*IRQ: Flags:0 33\n"));
    assert!(report.transcript.contains("Trigg time 10 => 1000\n"));
    assert!(report.transcript.contains("TEST 9: Timer Capture\n"));
    assert!(report.transcript.ends_with("EXIT\n"));

    assert_eq!(report.checks.len(), 41);
    assert!(report.checks.iter().all(|c| c.status == CheckStatus::Pass));
    assert_eq!(harness.metrics().get_interrupts(), report.interrupts);
}

#[test]
fn test_bounded_wait_reports_failure_and_continues() {
    let mut harness = Harness::from_script(
        &script(
            r#"
schema_version: "1.0"
limits:
  max_polls: 3
  max_cycles: 1000000
cases: [timer]
"#,
        ),
        false,
    )
    .unwrap();
    let report = harness.run();

    assert_eq!(report.stop_reason, StopReason::Exit);
    assert_eq!(report.cases, 1);
    assert_eq!(report.failed, 1);
    assert!(report.samples.is_empty());
    assert_eq!(report.transcript.matches("waiting for timer...0").count(), 3);
    assert!(report
        .transcript
        .contains("FAIL: timer capture complete failed at"));
    assert!(report.transcript.ends_with("EXIT\n"));
}

#[test]
fn test_cycle_limit_halts_but_transcript_completes() {
    let mut harness = Harness::from_script(
        &script(
            r#"
schema_version: "1.0"
limits:
  max_cycles: 5000
"#,
        ),
        false,
    )
    .unwrap();
    let report = harness.run();

    assert_eq!(report.stop_reason, StopReason::MaxCycles);
    assert_eq!(report.cycles, 5000);
    assert!(report.failed >= 1);
    assert!(!report.all_passed());
    assert!(report.transcript.ends_with("EXIT\n"));
}

#[test]
fn test_assertions_are_evaluated() {
    let s = script(
        r#"
schema_version: "1.0"
cases: [arithmetic, modulo, timer]
assertions:
  - output_contains: "Trigg time 1 => 100"
  - max_failures: 0
  - min_samples: 10
  - expected_stop_reason: exit
  - output_contains: "Bit USART Operations"
"#,
    );
    let mut harness = Harness::from_script(&s, false).unwrap();
    let report = harness.run();
    let results = evaluate(&report, &s.assertions);

    assert_eq!(results.len(), 5);
    assert!(results[..4].iter().all(|r| r.passed));
    assert!(!results[4].passed);
    assert!(matches!(
        results[4].assertion,
        RunAssertion::OutputContains(_)
    ));
}
