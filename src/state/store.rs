use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{
    CorpusError, CorpusResult, invalid_argument, io_error, serialization_error,
};

const STATE_VERSION: u64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    #[serde(default)]
    pub manual_processing: bool,
    #[serde(default)]
    pub files_processed: u64,
    #[serde(default)]
    pub cycles_completed: u64,
    #[serde(default)]
    pub last_run_id: Option<String>,
    #[serde(default)]
    pub last_run_at: Option<String>,
    /// Input path to content digest, as of the latest run that touched it.
    #[serde(default)]
    pub file_digests: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedProcessingState {
    version: u64,
    state: ProcessingState,
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> CorpusResult<Option<ProcessingState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error("failed to read state", &self.path, err)),
        };

        let parsed: PersistedProcessingState = serde_json::from_str(&content)
            .map_err(|err| serialization_error(&self.path, err))?;
        if parsed.version != STATE_VERSION {
            return Err(CorpusError::UnsupportedStateVersion {
                version: parsed.version,
                path: self.path.clone(),
            });
        }

        Ok(Some(parsed.state))
    }

    pub fn load_or_default(&self) -> CorpusResult<ProcessingState> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Temp file, fsync, then rename over the previous state.
    pub fn save(&self, state: &ProcessingState) -> CorpusResult<()> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|err| io_error("failed to create state directory", parent, err))?;

        let persisted = PersistedProcessingState {
            version: STATE_VERSION,
            state: state.clone(),
        };

        let tmp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&tmp_path)
            .map_err(|err| io_error("failed to create state temp file", &tmp_path, err))?;
        {
            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, &persisted)
                .map_err(|err| serialization_error(&tmp_path, err))?;
            writer
                .write_all(b"\n")
                .map_err(|err| io_error("failed to finalize state", &tmp_path, err))?;
            writer
                .flush()
                .map_err(|err| io_error("failed to flush state", &tmp_path, err))?;
        }
        file.sync_all()
            .map_err(|err| io_error("failed to sync state temp file", &tmp_path, err))?;

        fs::rename(&tmp_path, &self.path)
            .map_err(|err| io_error("failed to replace state", &self.path, err))?;

        if let Ok(parent_file) = fs::File::open(parent) {
            let _ = parent_file.sync_all();
        }

        Ok(())
    }

    /// Counts one completed cycle over `files` (path, digest) and persists it.
    pub fn record_run(
        &self,
        run_id: &str,
        at: &str,
        files: &[(String, String)],
    ) -> CorpusResult<ProcessingState> {
        if run_id.trim().is_empty() {
            return Err(invalid_argument("run id cannot be empty"));
        }

        let mut state = self.load_or_default()?;
        state.cycles_completed += 1;
        state.files_processed += files.len() as u64;
        state.last_run_id = Some(run_id.to_string());
        state.last_run_at = Some(at.to_string());
        for (path, digest) in files {
            state.file_digests.insert(path.clone(), digest.clone());
        }
        self.save(&state)?;

        tracing::debug!(
            target: "state",
            path = %self.path.display(),
            cycles_completed = state.cycles_completed,
            files_processed = state.files_processed,
            "run_recorded"
        );
        Ok(state)
    }

    pub fn set_manual_processing(&self, enabled: bool) -> CorpusResult<ProcessingState> {
        let mut state = self.load_or_default()?;
        state.manual_processing = enabled;
        self.save(&state)?;
        Ok(state)
    }
}
