//! Runs the report-calc binary and checks what a calling workflow sees:
//! exit codes, the JSON report on standard output and saved rule files.

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn report_calc(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_report-calc"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run report-calc")
}

fn write_rules(dir: &Path, rules: Value) -> String {
    let path = dir.join("rules.json");
    let file = json!({"sections": [{"name": "processing", "rules": rules}]});
    fs::write(&path, file.to_string()).unwrap();
    path.display().to_string()
}

#[rstest]
#[case(json!([["store", 1, "report/a"]]), 0)]
#[case(json!([["fail", "report/job", "\"not enough\""]]), 1)]
#[case(json!([["exit", 1]]), 1)]
#[case(json!([["exit", 2, "\"again\""]]), 2)]
#[case(json!([["if", 7, ["store", 1, "report/a"]]]), 1)]
fn test_exit_codes(#[case] rules: Value, #[case] expected: i32) {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path(), rules);
    let output = report_calc(dir.path(), &["-r", &rules]);
    assert_eq!(output.status.code(), Some(expected));
    if expected != 0 {
        assert!(!output.stderr.is_empty());
    }
}

#[test]
fn test_json_report_on_stdout() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(
        dir.path(),
        json!([["store", ["report/job/status", "==", "\"ok\""], "report/checks/clean"]]),
    );
    let output = report_calc(dir.path(), &["-r", &rules, "-o", "-"]);
    assert_eq!(output.status.code(), Some(0));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["title"], json!("Report Calc"));
    assert_eq!(report["job"]["status"], json!("ok"));
    assert_eq!(report["checks"], json!({"clean": true}));
}

#[test]
fn test_json_and_html_report_files() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path(), json!([["store", 42, "report/answer"]]));
    let output = report_calc(
        dir.path(),
        &["-r", &rules, "-o", "report.json", "-H", "report.html"],
    );
    assert_eq!(output.status.code(), Some(0));

    let report: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["answer"], json!(42));
    let html = fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.contains("<title>Report Summary</title>"));
    assert!(html.contains("Output folder:"));
}

#[test]
fn test_unknown_section_fails_the_job() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path(), json!([]));
    let output = report_calc(dir.path(), &["-r", &rules, "-e", "qc", "-o", "-"]);
    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["job"]["status"], json!("FAIL"));
}

#[test]
fn test_custom_rules_are_applied_and_saved() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(
        dir.path(),
        json!([["store", 1, "report/a"], ["store", ["report/a", "+", "report/b"], "report/c"]]),
    );
    fs::write(
        dir.path().join("custom.json"),
        json!([{"row": "processing:0", "rules": "store(2 report/b)"}]).to_string(),
    )
    .unwrap();

    let output = report_calc(
        dir.path(),
        &["-r", &rules, "-c", "custom.json", "-s", "saved.json", "-o", "-"],
    );
    assert_eq!(output.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["c"], json!(3));

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("saved.json")).unwrap())
            .unwrap();
    assert_eq!(
        saved["sections"][0]["rules"],
        json!([
            ["store", 1, "report/a"],
            ["store", 2, "report/b"],
            ["store", ["report/a", "+", "report/b"], "report/c"]
        ])
    );
}

#[test]
fn test_input_files_are_readable_by_name() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("counts.txt"), "reads\t250\n").unwrap();
    let rules = write_rules(
        dir.path(),
        json!([[
            "store",
            ["regexp", ["readFileByName", "\"counts\""], "\"reads\\t(?P<value>\\d+)\""],
            "report/reads"
        ]]),
    );
    let output = report_calc(
        dir.path(),
        &["-r", &rules, "-i", "counts.txt:counts:txt", "-o", "-"],
    );
    assert_eq!(output.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["reads"], json!(250));
}

#[test]
fn test_functions_lists_usage() {
    let dir = TempDir::new().unwrap();
    let output = report_calc(dir.path(), &["--functions"]);
    assert_eq!(output.status.code(), Some(0));
    let listing = String::from_utf8(output.stdout).unwrap();
    assert!(listing.contains("statisticN("));
    assert!(listing.contains("iif(conditional, true_exp, false_exp)"));
}
