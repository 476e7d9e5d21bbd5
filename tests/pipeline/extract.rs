use std::fs;

use panacea::{
    commands::run_extract,
    config::Config,
    corpus::{Dialogue, ExtractionPipeline, Segmenter, SourceText, pipeline::DIALOGUES_JSON},
    state::{RunReport, StateStore},
};

use crate::support::{PANACEA_A, PANACEA_B, Workspace};

#[test]
fn given_overlapping_sources_when_pipeline_runs_then_first_occurrence_wins_and_counts_balance() {
    let pipeline = ExtractionPipeline::from_config(&Config::default()).expect("pipeline");
    let extraction = pipeline.run(&[
        SourceText::new("panacea_a.txt", PANACEA_A),
        SourceText::new("panacea_b.txt", PANACEA_B),
    ]);

    let counters = &extraction.counters;
    assert_eq!(counters.files, 2);
    assert_eq!(counters.dialogues_found, 5);
    assert_eq!(counters.dialogues_kept, 4);
    assert_eq!(counters.duplicates, 1);
    assert_eq!(counters.unfocused, 0);
    assert_eq!(counters.turns, 8);
    assert_eq!(counters.unattributed_lines, 1);
    assert_eq!(counters.redactions, 1);

    let technical: Vec<&Dialogue> = extraction
        .dialogues
        .iter()
        .filter(|dialogue| dialogue.category == "technical")
        .collect();
    assert_eq!(technical.len(), 1);
    assert_eq!(technical[0].source, "panacea_a.txt");

    assert_eq!(extraction.category_counts["philosophy"], 1);
    assert_eq!(extraction.category_counts["emotional"], 1);
    assert_eq!(extraction.category_counts["general"], 1);
    assert_eq!(extraction.category_counts["identity"], 0);
    assert!(
        extraction
            .dialogues
            .iter()
            .all(|dialogue| dialogue.digest.len() == 64)
    );
    assert!(
        extraction
            .dialogues
            .iter()
            .flat_map(|dialogue| &dialogue.turns)
            .all(|turn| !turn.text.contains("sk-abcdef"))
    );
}

#[test]
fn given_redaction_disabled_when_pipeline_runs_then_secrets_pass_through() {
    let mut config = Config::default();
    config.redaction.enabled = false;
    let pipeline = ExtractionPipeline::from_config(&config).expect("pipeline");

    let extraction = pipeline.run(&[SourceText::new("panacea_b.txt", PANACEA_B)]);
    assert_eq!(extraction.counters.redactions, 0);
    assert!(extraction.dialogues[1].turns[1].text.contains("sk-abcdef"));
}

#[tokio::test]
async fn given_corpus_files_when_extract_then_outputs_report_and_state_are_written() {
    let workspace = Workspace::new("extract");
    let a = workspace.write("corpus/panacea_a.txt", PANACEA_A);
    let b = workspace.write("corpus/panacea_b.txt", PANACEA_B);
    let out_dir = workspace.root.join("out");
    let ctx = workspace.context();

    let report = run_extract(&ctx, &[a.clone(), b], &out_dir, None, None)
        .await
        .expect("extract should succeed");

    assert_eq!(report.command, "extract");
    assert_eq!(report.run_id, ctx.run_id);
    assert_eq!(report.counters.dialogues_kept, 4);
    assert_eq!(report.inputs[0], a.display().to_string());

    let mut names: Vec<String> = report
        .written_files
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "dialogues.json",
            "emotional_001.txt",
            "general_001.txt",
            "philosophy_001.txt",
            "technical_001.txt",
        ]
    );

    let technical = fs::read_to_string(out_dir.join("technical_001.txt")).expect("technical file");
    assert!(technical.starts_with("### "));
    assert!(technical.contains("User: Can you write code in Rust?"));

    let indexed: Vec<Dialogue> = serde_json::from_str(
        &fs::read_to_string(out_dir.join(DIALOGUES_JSON)).expect("dialogue index"),
    )
    .expect("dialogue index should parse");
    assert_eq!(indexed.len(), 4);

    let persisted = RunReport::read(&out_dir).expect("report should be readable");
    assert_eq!(persisted, report);

    let state = StateStore::new(ctx.config.state.state_path.clone())
        .load()
        .expect("state should load")
        .expect("state should exist");
    assert_eq!(state.cycles_completed, 1);
    assert_eq!(state.files_processed, 2);
    assert_eq!(state.last_run_id.as_deref(), Some(ctx.run_id.as_str()));
    assert_eq!(state.file_digests.len(), 2);
}

#[tokio::test]
async fn given_written_output_when_segmented_again_then_dialogues_round_trip() {
    let workspace = Workspace::new("extract-reread");
    let a = workspace.write("panacea_a.txt", PANACEA_A);
    let out_dir = workspace.root.join("out");
    let ctx = workspace.context();

    run_extract(&ctx, &[a], &out_dir, Some(0), None)
        .await
        .expect("extract should succeed");

    let segmenter = Segmenter::new(&ctx.config.segmentation).expect("segmenter");
    let philosophy =
        fs::read_to_string(out_dir.join("philosophy_001.txt")).expect("philosophy file");
    let segmentation = segmenter.segment("philosophy_001.txt", &philosophy);
    assert_eq!(segmentation.dialogues.len(), 1);
    assert_eq!(segmentation.unattributed_lines, 0);
    assert_eq!(
        segmentation.dialogues[0].turns[1].text,
        "Truth is what remains when every mirror is removed."
    );
}

#[tokio::test]
async fn given_small_per_file_window_when_extract_then_category_files_are_chunked() {
    let workspace = Workspace::new("extract-chunked");
    let body = (0..5)
        .map(|index| format!("User: question {index} about code\nAI: answer {index}\n"))
        .collect::<Vec<_>>()
        .join("---\n");
    let input = workspace.write("panacea_many.txt", &body);
    let out_dir = workspace.root.join("out");

    let report = run_extract(&workspace.context(), &[input], &out_dir, Some(2), None)
        .await
        .expect("extract should succeed");

    assert_eq!(report.category_counts["technical"], 5);
    for name in ["technical_001.txt", "technical_002.txt", "technical_003.txt"] {
        assert!(out_dir.join(name).exists(), "{name} should exist");
    }
    assert!(!out_dir.join("technical_004.txt").exists());
}

#[tokio::test]
async fn given_focus_keywords_when_extract_then_only_matching_dialogues_are_kept() {
    let workspace = Workspace::new("focus");
    let a = workspace.write("panacea_a.txt", PANACEA_A);
    let b = workspace.write("panacea_b.txt", PANACEA_B);
    let out_dir = workspace.root.join("focused");

    let report = run_extract(
        &workspace.context(),
        &[a, b],
        &out_dir,
        None,
        Some(&["truth".to_string()]),
    )
    .await
    .expect("focus should succeed");

    assert_eq!(report.command, "focus");
    assert_eq!(report.counters.dialogues_found, 5);
    assert_eq!(report.counters.dialogues_kept, 1);
    assert_eq!(report.counters.unfocused, 4);
    assert_eq!(report.counters.duplicates, 0);
    assert_eq!(report.category_counts["philosophy"], 1);
}

#[tokio::test]
async fn given_missing_input_when_extract_then_error_names_the_path() {
    let workspace = Workspace::new("extract-missing");
    let missing = workspace.root.join("nope.txt");

    let err = run_extract(
        &workspace.context(),
        &[missing],
        &workspace.root.join("out"),
        None,
        None,
    )
    .await
    .expect_err("missing input must fail");
    assert!(err.to_string().contains("nope.txt"), "unexpected error: {err}");
}
