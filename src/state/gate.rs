use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, CorpusResult, io_error, serialization_error};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRecord {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// The flag file disables every automated command for as long as it exists.
/// Its body is informational; an empty or unparsable file still gates.
#[derive(Debug, Clone)]
pub struct AutomationGate {
    flag_path: PathBuf,
}

impl AutomationGate {
    pub fn new(flag_path: PathBuf) -> Self {
        Self { flag_path }
    }

    pub fn flag_path(&self) -> &Path {
        &self.flag_path
    }

    pub fn is_engaged(&self) -> bool {
        self.flag_path.exists()
    }

    pub fn record(&self) -> Option<FlagRecord> {
        let content = fs::read_to_string(&self.flag_path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn check(&self) -> CorpusResult<()> {
        if self.is_engaged() {
            tracing::warn!(
                target: "state.gate",
                flag_path = %self.flag_path.display(),
                "automation_disabled"
            );
            return Err(CorpusError::AutomationDisabled {
                path: self.flag_path.clone(),
            });
        }
        Ok(())
    }

    pub fn engage(&self, reason: Option<String>, created_at: String) -> CorpusResult<()> {
        if let Some(parent) = self
            .flag_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)
                .map_err(|err| io_error("failed to create flag directory", parent, err))?;
        }

        let record = FlagRecord {
            reason,
            created_at: Some(created_at),
        };
        let body = serde_json::to_vec_pretty(&record)
            .map_err(|err| serialization_error(&self.flag_path, err))?;
        fs::write(&self.flag_path, body)
            .map_err(|err| io_error("failed to write flag file", &self.flag_path, err))?;
        tracing::info!(target: "state.gate", flag_path = %self.flag_path.display(), "automation_gate_engaged");
        Ok(())
    }

    /// Returns whether a flag file was actually removed.
    pub fn release(&self) -> CorpusResult<bool> {
        match fs::remove_file(&self.flag_path) {
            Ok(()) => {
                tracing::info!(target: "state.gate", flag_path = %self.flag_path.display(), "automation_gate_released");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_error("failed to remove flag file", &self.flag_path, err)),
        }
    }
}
