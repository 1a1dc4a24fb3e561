use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("cputest-tests")
        .join(format!("{}-{}", prefix, nonce));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn write_script(dir: &std::path::Path, contents: &str) -> PathBuf {
    let path = dir.join("script.yaml");
    std::fs::write(&path, contents).expect("Failed to write script");
    path
}

fn cputest(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_cputest"))
        .args(args)
        .output()
        .expect("Failed to execute cputest")
}

#[test]
fn test_cli_help_lists_modes() {
    let output = cputest(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run"));
    assert!(stdout.contains("test"));
}

#[test]
fn test_cli_run_prints_transcript() {
    let output = cputest(&["run", "--cases", "arithmetic,bitfields"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("TEST 1: Arithmetic Operations"));
    assert!(stdout.contains("OK: p4dir == 100 passed at"));
    assert!(!stdout.contains("FAIL:"));
    assert!(stdout.ends_with("EXIT\n"));
}

#[test]
fn test_cli_run_writes_snapshot() {
    let dir = temp_dir("snapshot");
    let snapshot_path = dir.join("snapshot.json");

    let output = cputest(&[
        "run",
        "--cases",
        "timer",
        "--no-stdout",
        "--snapshot",
        snapshot_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot["stop_reason"], "exit");
    assert!(snapshot["cycles"].as_u64().unwrap() > 0);
    assert!(snapshot["peripherals"]["timer_b"].is_object());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_run_failed_check_exits_1() {
    let output = cputest(&["run", "--cases", "timer", "--max-polls", "2", "--no-stdout"]);
    assert_eq!(output.status.code(), Some(1)); // EXIT_ASSERT_FAIL
}

#[test]
fn test_cli_run_cycle_limit_exits_3() {
    let output = cputest(&["run", "--cases", "timer", "--max-cycles", "2000", "--no-stdout"]);
    assert_eq!(output.status.code(), Some(3)); // EXIT_RUNTIME_ERROR
}

#[test]
fn test_cli_test_mode_outputs() {
    let dir = temp_dir("outputs");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
limits:
  max_polls: 1000
  max_cycles: 5000000
assertions:
  - output_contains: "Trigg time 10 => 1000"
  - max_failures: 0
  - min_samples: 10
  - expected_stop_reason: exit
"#,
    );
    let output_dir = dir.join("artifacts");

    let output = cputest(&[
        "test",
        "--script",
        script.to_str().unwrap(),
        "--no-stdout",
        "--output-dir",
        output_dir.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let junit = std::fs::read_to_string(output_dir.join("junit.xml")).unwrap();
    assert!(junit.contains("<testsuite name=\"cputest\""));
    assert!(junit.contains("classname=\"Timer Capture\""));
    assert!(!junit.contains("<failure"));

    let transcript = std::fs::read_to_string(output_dir.join("transcript.log")).unwrap();
    assert!(transcript.ends_with("EXIT\n"));
    assert!(output_dir.join("snapshot.json").exists());

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("result.json")).unwrap())
            .unwrap();
    assert_eq!(result["status"], "pass");
    assert_eq!(result["stop_reason"], "exit");
    assert_eq!(result["failed"], 0);
    assert_eq!(result["samples"].as_array().unwrap().len(), 10);
    assert_eq!(result["transcript_sha256"].as_str().unwrap().len(), 64);
    assert_eq!(result["assertions"].as_array().unwrap().len(), 4);
    assert!(result["config"]["script"]
        .as_str()
        .unwrap()
        .ends_with("script.yaml"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_junit_flag_writes_file() {
    let dir = temp_dir("junit");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
cases: [modulo]
assertions:
  - max_failures: 0
"#,
    );
    let junit_path = dir.join("reports").join("junit.xml");

    let output = cputest(&[
        "test",
        "--script",
        script.to_str().unwrap(),
        "--no-stdout",
        "--junit",
        junit_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let junit = std::fs::read_to_string(&junit_path).unwrap();
    assert!(junit.contains("<testcase"));
    assert!(junit.contains("assertion 1: max_failures 0"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_assertion_fail() {
    let dir = temp_dir("assert-fail");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
cases: [arithmetic]
assertions:
  - output_contains: "ThisTextWillNeverBeFound"
"#,
    );

    let output = cputest(&["test", "--script", script.to_str().unwrap(), "--no-stdout"]);
    assert_eq!(output.status.code(), Some(1)); // EXIT_ASSERT_FAIL

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_bounded_wait_fails_check() {
    let dir = temp_dir("bounded");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
cases: [timer]
"#,
    );

    let output = cputest(&[
        "test",
        "--script",
        script.to_str().unwrap(),
        "--max-polls",
        "2",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FAIL: timer capture complete failed at"));
    assert!(stdout.ends_with("EXIT\n"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_cycle_limit_is_runtime_error() {
    let dir = temp_dir("max-cycles");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
limits:
  max_cycles: 2000
cases: [timer]
"#,
    );

    let output = cputest(&["test", "--script", script.to_str().unwrap(), "--no-stdout"]);
    assert_eq!(output.status.code(), Some(3)); // EXIT_RUNTIME_ERROR

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_expected_stop_reason_accepts_halt() {
    let dir = temp_dir("expected-halt");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
limits:
  max_cycles: 2000
cases: [timer]
assertions:
  - expected_stop_reason: max_cycles
"#,
    );

    let output = cputest(&["test", "--script", script.to_str().unwrap(), "--no-stdout"]);
    assert!(output.status.success());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_config_errors() {
    let dir = temp_dir("config-error");
    let script = write_script(
        &dir,
        r#"
schema_version: "1.0"
limits:
  max_cycles: 2000000000
"#,
    );
    let output_dir = dir.join("artifacts");

    let output = cputest(&[
        "test",
        "--script",
        script.to_str().unwrap(),
        "--output-dir",
        output_dir.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("result.json")).unwrap())
            .unwrap();
    assert_eq!(result["status"], "error");
    assert!(result["message"]
        .as_str()
        .unwrap()
        .contains("exceeds the allowed maximum"));
    let junit = std::fs::read_to_string(output_dir.join("junit.xml")).unwrap();
    assert!(junit.contains("errors=\"1\""));

    let output = cputest(&["test", "--script", dir.join("missing.yaml").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));

    let output = cputest(&["run", "--cases", "nosuchcase"]);
    assert_eq!(output.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}
