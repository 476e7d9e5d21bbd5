use regex::Regex;

use crate::{
    corpus::{categorize::keyword_regex, types::Dialogue},
    error::{CorpusResult, invalid_argument},
};

/// Keeps dialogues that mention at least one focus keyword.
#[derive(Debug, Clone)]
pub struct FocusFilter {
    matcher: Regex,
    keywords: Vec<String>,
}

impl FocusFilter {
    pub fn new(keywords: &[String]) -> CorpusResult<Self> {
        let matcher = keyword_regex(keywords)?
            .ok_or_else(|| invalid_argument("focus requires at least one keyword"))?;
        Ok(Self {
            matcher,
            keywords: keywords
                .iter()
                .map(|keyword| keyword.trim().to_string())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn matches(&self, dialogue: &Dialogue) -> bool {
        dialogue
            .turns
            .iter()
            .any(|turn| self.matcher.is_match(&turn.text))
    }
}
