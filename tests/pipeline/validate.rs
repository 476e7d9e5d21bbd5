use std::fs;

use panacea::{
    cli::Command,
    commands::{execute, run_extract, run_validate},
    state::{RunReport, StateStore},
};

use crate::support::{PANACEA_A, PANACEA_B, Workspace};

#[tokio::test]
async fn given_fresh_extract_when_validate_then_every_check_passes() {
    let workspace = Workspace::new("validate");
    let a = workspace.write("panacea_a.txt", PANACEA_A);
    let b = workspace.write("panacea_b.txt", PANACEA_B);
    let out_dir = workspace.root.join("out");
    let ctx = workspace.context();

    run_extract(&ctx, &[a, b], &out_dir, None, None)
        .await
        .expect("extract should succeed");

    let validation = run_validate(&ctx, &out_dir).expect("validate should run");
    assert!(validation.passed, "{validation:?}");
    assert_eq!(validation.checks.len(), 5);
    assert_eq!(validation.run_id, ctx.run_id);
}

#[tokio::test]
async fn given_deleted_output_when_validate_then_written_files_check_fails() {
    let workspace = Workspace::new("validate-missing");
    let a = workspace.write("panacea_a.txt", PANACEA_A);
    let out_dir = workspace.root.join("out");
    let ctx = workspace.context();

    run_extract(&ctx, &[a], &out_dir, None, None)
        .await
        .expect("extract should succeed");
    fs::remove_file(out_dir.join("technical_001.txt")).expect("remove output");

    let validation = run_validate(&ctx, &out_dir).expect("validate should run");
    assert!(!validation.passed);
    let check = validation
        .check("written_files_exist")
        .expect("check should be present");
    assert!(!check.passed);
    assert!(check.detail.contains("technical_001.txt"));

    let err = execute(&ctx, Command::Validate { out_dir })
        .await
        .expect_err("failed validation exits with an error");
    assert!(err.to_string().contains("validation failed"));
}

#[tokio::test]
async fn given_later_run_or_tampered_counts_when_validate_then_matching_checks_fail() {
    let workspace = Workspace::new("validate-tampered");
    let a = workspace.write("panacea_a.txt", PANACEA_A);
    let out_dir = workspace.root.join("out");
    let ctx = workspace.context();

    run_extract(&ctx, &[a], &out_dir, None, None)
        .await
        .expect("extract should succeed");

    let mut report = RunReport::read(&out_dir).expect("report");
    report.counters.dialogues_found += 1;
    report
        .category_counts
        .insert("general".to_string(), 10);
    report.write(&out_dir).expect("rewrite report");

    StateStore::new(ctx.config.state.state_path.clone())
        .record_run("someone-else", "2026-01-01T00:00:00Z", &[])
        .expect("another run");

    let validation = run_validate(&ctx, &out_dir).expect("validate should run");
    for name in [
        "run_id_matches_state",
        "dialogue_counts_balance",
        "category_counts_sum_to_kept",
    ] {
        assert!(
            !validation.check(name).expect("check present").passed,
            "{name} should fail"
        );
    }
    assert!(validation.check("written_files_exist").expect("check").passed);
    assert!(
        validation
            .check("state_counters_cover_report")
            .expect("check")
            .passed
    );
}

#[test]
fn given_out_dir_without_report_when_validate_then_error_names_report_path() {
    let workspace = Workspace::new("validate-none");
    let err = run_validate(&workspace.context(), &workspace.root).expect_err("no report");
    assert!(err.to_string().contains("report.json"));
}
