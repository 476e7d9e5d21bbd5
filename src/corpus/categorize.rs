use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    config::CategoriesConfig,
    error::{CorpusResult, invalid_config},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    pub category: String,
    pub score: usize,
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Builds one case-insensitive alternation out of `keywords`. A keyword gets
/// a `\b` only on the sides where it starts or ends with a word character,
/// so `c++` and `.net` still match.
pub(crate) fn keyword_regex(keywords: &[String]) -> CorpusResult<Option<Regex>> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|keyword| keyword.trim())
        .filter(|keyword| !keyword.is_empty())
        .map(|keyword| {
            let body = keyword
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let lead = if keyword.starts_with(is_word_char) { r"\b" } else { "" };
            let trail = if keyword.ends_with(is_word_char) { r"\b" } else { "" };
            format!("{lead}{body}{trail}")
        })
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }

    let pattern = format!("(?:{})", alternatives.join("|"));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|err| invalid_config(format!("failed to compile keywords: {err}")))
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<(String, Regex)>,
    fallback: String,
}

impl Categorizer {
    pub fn new(config: &CategoriesConfig) -> CorpusResult<Self> {
        if config.fallback.trim().is_empty() {
            return Err(invalid_config("categories.fallback cannot be empty"));
        }

        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            let name = rule.name.trim();
            if name.is_empty() {
                return Err(invalid_config("category name cannot be empty"));
            }
            if name == config.fallback || rules.iter().any(|(existing, _)| existing == name) {
                return Err(invalid_config(format!("category '{name}' is declared twice")));
            }
            let regex = keyword_regex(&rule.keywords)?.ok_or_else(|| {
                invalid_config(format!("category '{name}' has no usable keywords"))
            })?;
            rules.push((name.to_string(), regex));
        }

        Ok(Self {
            rules,
            fallback: config.fallback.clone(),
        })
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// All category names, declaration order, fallback last.
    pub fn labels(&self) -> Vec<String> {
        self.rules
            .iter()
            .map(|(name, _)| name.clone())
            .chain(std::iter::once(self.fallback.clone()))
            .collect()
    }

    pub fn scores(&self, text: &str) -> Vec<(String, usize)> {
        self.rules
            .iter()
            .map(|(name, regex)| (name.clone(), regex.find_iter(text).count()))
            .collect()
    }

    pub fn categorize(&self, text: &str) -> CategoryMatch {
        let mut best: Option<(&str, usize)> = None;
        for (name, regex) in &self.rules {
            let score = regex.find_iter(text).count();
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((name.as_str(), score));
            }
        }

        match best {
            Some((name, score)) => CategoryMatch {
                category: name.to_string(),
                score,
            },
            None => CategoryMatch {
                category: self.fallback.clone(),
                score: 0,
            },
        }
    }
}
