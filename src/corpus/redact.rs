use std::borrow::Cow;

use regex::{Regex, bytes};

use crate::error::{CorpusResult, invalid_config};

pub const REDACTED: &str = "[REDACTED]";

const BUILTIN_PATTERNS: &[&str] = &[
    r"\bsk-(?:proj-|ant-)?[A-Za-z0-9_-]{20,}",
    r"\b(?:ghp|gho|ghs|ghu|ghr)_[A-Za-z0-9]{30,}",
    r"\bgithub_pat_[A-Za-z0-9_]{40,}",
    r"\bhf_[A-Za-z0-9]{30,}",
    r"\bAKIA[0-9A-Z]{16}\b",
    r"\bxox[abpr]-[A-Za-z0-9-]{10,}",
    r"(?i)\bbearer\s+[A-Za-z0-9._~+/-]{16,}=*",
];

#[derive(Debug, Clone)]
pub struct Redaction<'a> {
    pub text: Cow<'a, str>,
    pub replacements: usize,
}

/// Redaction over raw file contents, which need not be UTF-8.
#[derive(Debug, Clone)]
pub struct ByteRedaction<'a> {
    pub bytes: Cow<'a, [u8]>,
    pub replacements: usize,
}

#[derive(Debug, Clone)]
pub struct SecretRedactor {
    patterns: Vec<Regex>,
    byte_patterns: Vec<bytes::Regex>,
}

impl SecretRedactor {
    pub fn new(extra_patterns: &[String]) -> CorpusResult<Self> {
        let capacity = BUILTIN_PATTERNS.len() + extra_patterns.len();
        let mut patterns = Vec::with_capacity(capacity);
        let mut byte_patterns = Vec::with_capacity(capacity);
        for pattern in BUILTIN_PATTERNS {
            let invalid =
                |err: regex::Error| invalid_config(format!("builtin pattern {pattern}: {err}"));
            patterns.push(Regex::new(pattern).map_err(invalid)?);
            byte_patterns.push(bytes::Regex::new(pattern).map_err(invalid)?);
        }
        for pattern in extra_patterns {
            let invalid = |err: regex::Error| {
                invalid_config(format!(
                    "redaction.extra_patterns entry '{pattern}' is invalid: {err}"
                ))
            };
            patterns.push(Regex::new(pattern).map_err(invalid)?);
            byte_patterns.push(bytes::Regex::new(pattern).map_err(invalid)?);
        }
        Ok(Self {
            patterns,
            byte_patterns,
        })
    }

    pub fn redact<'a>(&self, text: &'a str) -> Redaction<'a> {
        let mut current: Cow<'a, str> = Cow::Borrowed(text);
        let mut replacements = 0;
        for pattern in &self.patterns {
            let hits = pattern.find_iter(&current).count();
            if hits == 0 {
                continue;
            }
            replacements += hits;
            current = Cow::Owned(pattern.replace_all(&current, REDACTED).into_owned());
        }
        Redaction {
            text: current,
            replacements,
        }
    }

    /// Same patterns as `redact`; bytes outside a match are copied through
    /// untouched.
    pub fn redact_bytes<'a>(&self, input: &'a [u8]) -> ByteRedaction<'a> {
        let mut current: Cow<'a, [u8]> = Cow::Borrowed(input);
        let mut replacements = 0;
        for pattern in &self.byte_patterns {
            let hits = pattern.find_iter(&current).count();
            if hits == 0 {
                continue;
            }
            replacements += hits;
            current = Cow::Owned(
                pattern
                    .replace_all(&current, REDACTED.as_bytes())
                    .into_owned(),
            );
        }
        ByteRedaction {
            bytes: current,
            replacements,
        }
    }
}
