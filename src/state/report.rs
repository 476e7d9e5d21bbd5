use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    corpus::pipeline::ExtractionCounters,
    error::{CorpusResult, io_error, serialization_error},
    state::store::ProcessingState,
};

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: String,
    pub command: String,
    pub inputs: Vec<String>,
    pub counters: ExtractionCounters,
    pub category_counts: BTreeMap<String, usize>,
    pub written_files: Vec<PathBuf>,
}

impl RunReport {
    pub fn path_in(out_dir: &Path) -> PathBuf {
        out_dir.join(REPORT_FILE)
    }

    pub fn write(&self, out_dir: &Path) -> CorpusResult<PathBuf> {
        let path = Self::path_in(out_dir);
        let body =
            serde_json::to_vec_pretty(self).map_err(|err| serialization_error(&path, err))?;
        fs::write(&path, body).map_err(|err| io_error("failed to write report", &path, err))?;
        Ok(path)
    }

    pub fn read(out_dir: &Path) -> CorpusResult<Self> {
        let path = Self::path_in(out_dir);
        let content = fs::read_to_string(&path)
            .map_err(|err| io_error("failed to read report", &path, err))?;
        serde_json::from_str(&content).map_err(|err| serialization_error(&path, err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: String,
    pub passed: bool,
    pub checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|check| check.name == name)
    }
}

fn check(name: &str, passed: bool, detail: String) -> ValidationCheck {
    ValidationCheck {
        name: name.to_string(),
        passed,
        detail,
    }
}

/// Cross-checks a run report against the processing state and the files it
/// claims to have written. Relative written paths resolve against `out_dir`.
pub fn validate(report: &RunReport, state: &ProcessingState, out_dir: &Path) -> ValidationReport {
    let counters = &report.counters;
    let mut checks = Vec::with_capacity(5);

    checks.push(check(
        "run_id_matches_state",
        state.last_run_id.as_deref() == Some(report.run_id.as_str()),
        format!(
            "report run_id={} state last_run_id={}",
            report.run_id,
            state.last_run_id.as_deref().unwrap_or("<none>")
        ),
    ));

    let accounted = counters.dialogues_kept + counters.duplicates + counters.unfocused;
    checks.push(check(
        "dialogue_counts_balance",
        counters.dialogues_found == accounted,
        format!(
            "found={} kept={} duplicates={} unfocused={}",
            counters.dialogues_found,
            counters.dialogues_kept,
            counters.duplicates,
            counters.unfocused
        ),
    ));

    let category_total: usize = report.category_counts.values().sum();
    checks.push(check(
        "category_counts_sum_to_kept",
        category_total == counters.dialogues_kept,
        format!(
            "category total={} kept={}",
            category_total, counters.dialogues_kept
        ),
    ));

    let missing: Vec<String> = report
        .written_files
        .iter()
        .map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                out_dir.join(path)
            }
        })
        .filter(|path| !path.exists())
        .map(|path| path.display().to_string())
        .collect();
    checks.push(check(
        "written_files_exist",
        missing.is_empty(),
        if missing.is_empty() {
            format!("{} files present", report.written_files.len())
        } else {
            format!("missing: {}", missing.join(", "))
        },
    ));

    checks.push(check(
        "state_counters_cover_report",
        state.files_processed >= counters.files as u64 && state.cycles_completed >= 1,
        format!(
            "state files_processed={} cycles_completed={} report files={}",
            state.files_processed, state.cycles_completed, counters.files
        ),
    ));

    ValidationReport {
        run_id: report.run_id.clone(),
        passed: checks.iter().all(|check| check.passed),
        checks,
    }
}
