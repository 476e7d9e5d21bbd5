use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    pub text: String,
    /// 1-based source line where the turn starts.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialogue {
    pub source: String,
    pub index: usize,
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub category: String,
}

impl Dialogue {
    pub fn new(source: impl Into<String>, index: usize, turns: Vec<Turn>) -> Self {
        Self {
            source: source.into(),
            index,
            turns,
            digest: String::new(),
            category: String::new(),
        }
    }

    /// `speaker: text` per turn, joined by newlines.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker, turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A loaded input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub path: PathBuf,
    pub text: String,
}

impl SourceText {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn label(&self) -> String {
        self.path.display().to_string()
    }
}
