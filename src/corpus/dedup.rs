use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::corpus::types::Dialogue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Md5,
}

/// Lowercases and collapses whitespace runs so that formatting noise does not
/// defeat deduplication.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn digest_raw(&self, bytes: &[u8]) -> String {
        match self.algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                format!("{:x}", hasher.finalize())
            }
            HashAlgorithm::Md5 => format!("{:x}", md5::compute(bytes)),
        }
    }

    pub fn digest_text(&self, text: &str) -> String {
        self.digest_raw(normalize(text).as_bytes())
    }

    pub fn digest_dialogue(&self, dialogue: &Dialogue) -> String {
        self.digest_text(&dialogue.render())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    duplicates: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a digest is offered.
    pub fn insert(&mut self, digest: &str) -> bool {
        if self.seen.contains(digest) {
            self.duplicates += 1;
            return false;
        }
        self.seen.insert(digest.to_string());
        true
    }

    pub fn unique(&self) -> usize {
        self.seen.len()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
