use regex::{Regex, RegexBuilder};

use crate::{
    config::SegmentationConfig,
    corpus::types::{Dialogue, Turn},
    error::{CorpusResult, invalid_config},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    pub dialogues: Vec<Dialogue>,
    /// Lines that appeared before any speaker in their dialogue.
    pub unattributed_lines: usize,
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    speaker_line: Regex,
    separator_line: Regex,
    speakers: Vec<String>,
    min_turns: usize,
}

impl Segmenter {
    pub fn new(config: &SegmentationConfig) -> CorpusResult<Self> {
        let speakers: Vec<String> = config
            .speakers
            .iter()
            .map(|speaker| speaker.trim().to_string())
            .filter(|speaker| !speaker.is_empty())
            .collect();
        if speakers.is_empty() {
            return Err(invalid_config("segmentation.speakers cannot be empty"));
        }

        // Longest labels first so "A" is never tried ahead of "AI" or "Assistant".
        let mut alternatives: Vec<&String> = speakers.iter().collect();
        alternatives.sort_by(|lhs, rhs| rhs.len().cmp(&lhs.len()));
        let alternation = alternatives
            .iter()
            .map(|speaker| regex::escape(speaker))
            .collect::<Vec<_>>()
            .join("|");

        let speaker_pattern = format!(
            r"^\s*(?:>\s*)?(?:\*\*|__)?(?P<speaker>{alternation})(?:\*\*|__)?\s*:(?:\*\*|__)?\s*(?P<text>.*)$"
        );
        let speaker_line = RegexBuilder::new(&speaker_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|err| invalid_config(format!("failed to build speaker pattern: {err}")))?;
        let separator_line = Regex::new(&config.separator_pattern).map_err(|err| {
            invalid_config(format!(
                "segmentation.separator_pattern '{}' is invalid: {err}",
                config.separator_pattern
            ))
        })?;

        Ok(Self {
            speaker_line,
            separator_line,
            speakers,
            min_turns: config.min_turns.max(1),
        })
    }

    fn canonical_speaker(&self, matched: &str) -> String {
        self.speakers
            .iter()
            .find(|speaker| speaker.to_lowercase() == matched.to_lowercase())
            .cloned()
            .unwrap_or_else(|| matched.to_string())
    }

    pub fn segment(&self, source: &str, text: &str) -> Segmentation {
        let mut builder = DialogueBuilder::new(source, self.min_turns);
        let mut in_fence = false;

        for (offset, line) in text.lines().enumerate() {
            let line_no = offset + 1;
            // Fenced code stays inside its turn, headings and labels included.
            let fence = is_code_fence(line);
            if in_fence || fence {
                in_fence ^= fence;
                builder.continue_turn(line);
                continue;
            }

            if self.separator_line.is_match(line) {
                builder.close_dialogue();
                continue;
            }

            if let Some(captures) = self.speaker_line.captures(line) {
                let speaker = self.canonical_speaker(&captures["speaker"]);
                builder.start_turn(speaker, &captures["text"], line_no);
                continue;
            }

            builder.continue_turn(line);
        }

        let segmentation = builder.finish();
        tracing::debug!(
            target: "corpus.segment",
            source = source,
            dialogues = segmentation.dialogues.len(),
            unattributed_lines = segmentation.unattributed_lines,
            "segmented_source"
        );
        segmentation
    }
}

fn is_code_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

struct DialogueBuilder<'a> {
    source: &'a str,
    min_turns: usize,
    dialogues: Vec<Dialogue>,
    turns: Vec<Turn>,
    current: Option<Turn>,
    unattributed_lines: usize,
}

impl<'a> DialogueBuilder<'a> {
    fn new(source: &'a str, min_turns: usize) -> Self {
        Self {
            source,
            min_turns,
            dialogues: Vec::new(),
            turns: Vec::new(),
            current: None,
            unattributed_lines: 0,
        }
    }

    fn start_turn(&mut self, speaker: String, text: &str, line: usize) {
        self.close_turn();
        self.current = Some(Turn {
            speaker,
            text: text.to_string(),
            line,
        });
    }

    fn continue_turn(&mut self, line: &str) {
        match self.current.as_mut() {
            Some(turn) => {
                turn.text.push('\n');
                turn.text.push_str(line);
            }
            None if !line.trim().is_empty() => self.unattributed_lines += 1,
            None => {}
        }
    }

    fn close_turn(&mut self) {
        if let Some(mut turn) = self.current.take() {
            turn.text = turn.text.trim().to_string();
            self.turns.push(turn);
        }
    }

    fn close_dialogue(&mut self) {
        self.close_turn();
        let turns = std::mem::take(&mut self.turns);
        if turns.len() >= self.min_turns {
            let index = self.dialogues.len();
            self.dialogues
                .push(Dialogue::new(self.source.to_string(), index, turns));
        }
    }

    fn finish(mut self) -> Segmentation {
        self.close_dialogue();
        Segmentation {
            dialogues: self.dialogues,
            unattributed_lines: self.unattributed_lines,
        }
    }
}
