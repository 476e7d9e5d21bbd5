use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    corpus::{
        categorize::Categorizer,
        chunk::chunk_sequence,
        dedup::{ContentHasher, Deduplicator, normalize},
        focus::FocusFilter,
        redact::SecretRedactor,
        segment::Segmenter,
        types::{Dialogue, SourceText, Turn},
    },
    error::{CorpusResult, io_error, serialization_error},
};

pub const DIALOGUES_JSON: &str = "dialogues.json";
const PART_WIDTH: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionCounters {
    pub files: usize,
    pub dialogues_found: usize,
    pub dialogues_kept: usize,
    pub duplicates: usize,
    pub unfocused: usize,
    pub turns: usize,
    pub unattributed_lines: usize,
    pub redactions: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub dialogues: Vec<Dialogue>,
    pub category_counts: BTreeMap<String, usize>,
    pub counters: ExtractionCounters,
}

pub struct ExtractionPipeline {
    segmenter: Segmenter,
    redactor: Option<SecretRedactor>,
    hasher: ContentHasher,
    categorizer: Categorizer,
    focus: Option<FocusFilter>,
}

impl ExtractionPipeline {
    pub fn from_config(config: &Config) -> CorpusResult<Self> {
        let redactor = if config.redaction.enabled {
            Some(SecretRedactor::new(&config.redaction.extra_patterns)?)
        } else {
            None
        };

        Ok(Self {
            segmenter: Segmenter::new(&config.segmentation)?,
            redactor,
            hasher: ContentHasher::new(config.dedup.algorithm),
            categorizer: Categorizer::new(&config.categories)?,
            focus: None,
        })
    }

    pub fn with_focus(mut self, focus: FocusFilter) -> Self {
        self.focus = Some(focus);
        self
    }

    pub fn hasher(&self) -> ContentHasher {
        self.hasher
    }

    /// Dedup spans all sources; the first occurrence in input order wins.
    pub fn run(&self, sources: &[SourceText]) -> Extraction {
        let mut extraction = Extraction {
            category_counts: self
                .categorizer
                .labels()
                .into_iter()
                .map(|label| (label, 0))
                .collect(),
            ..Extraction::default()
        };
        let mut dedup = Deduplicator::new();

        for source in sources {
            let label = source.label();
            let segmentation = self.segmenter.segment(&label, &source.text);
            let counters = &mut extraction.counters;
            counters.files += 1;
            counters.unattributed_lines += segmentation.unattributed_lines;

            for mut dialogue in segmentation.dialogues {
                counters.dialogues_found += 1;
                if let Some(redactor) = &self.redactor {
                    for turn in &mut dialogue.turns {
                        let redaction = redactor.redact(&turn.text);
                        if redaction.replacements > 0 {
                            counters.redactions += redaction.replacements;
                            turn.text = redaction.text.into_owned();
                        }
                    }
                }

                if let Some(focus) = &self.focus
                    && !focus.matches(&dialogue)
                {
                    counters.unfocused += 1;
                    continue;
                }

                dialogue.digest = self.hasher.digest_dialogue(&dialogue);
                if !dedup.insert(&dialogue.digest) {
                    counters.duplicates += 1;
                    continue;
                }

                let text = dialogue
                    .turns
                    .iter()
                    .map(|turn| turn.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                dialogue.category = self.categorizer.categorize(&text).category;
                *extraction
                    .category_counts
                    .entry(dialogue.category.clone())
                    .or_insert(0) += 1;

                counters.dialogues_kept += 1;
                counters.turns += dialogue.turns.len();
                extraction.dialogues.push(dialogue);
            }
        }

        tracing::info!(
            target: "corpus.pipeline",
            files = extraction.counters.files,
            dialogues_found = extraction.counters.dialogues_found,
            dialogues_kept = extraction.counters.dialogues_kept,
            duplicates = extraction.counters.duplicates,
            unfocused = extraction.counters.unfocused,
            redactions = extraction.counters.redactions,
            "extraction_completed"
        );
        extraction
    }
}

/// Header line placed before each written dialogue. It doubles as a
/// separator when the output is segmented again.
pub fn dialogue_heading(dialogue: &Dialogue) -> String {
    format!("### {} [{}]", dialogue.source, dialogue.index)
}

pub fn render_dialogues<'a>(dialogues: impl IntoIterator<Item = &'a Dialogue>) -> String {
    let mut out = String::new();
    for dialogue in dialogues {
        out.push_str(&dialogue_heading(dialogue));
        out.push('\n');
        out.push_str(&dialogue.render());
        out.push_str("\n\n");
    }
    out
}

/// Writes `<category>_<NNN>.txt` files plus `dialogues.json` under `out_dir`
/// and returns every written path.
pub async fn write_extraction(
    out_dir: &Path,
    extraction: &Extraction,
    dialogues_per_file: usize,
) -> CorpusResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|err| io_error("failed to create output directory", out_dir, err))?;

    let mut by_category: BTreeMap<&str, Vec<&Dialogue>> = BTreeMap::new();
    for dialogue in &extraction.dialogues {
        by_category
            .entry(dialogue.category.as_str())
            .or_default()
            .push(dialogue);
    }

    let mut written = Vec::new();
    for (category, dialogues) in by_category {
        let window = if dialogues_per_file == 0 {
            dialogues.len()
        } else {
            dialogues_per_file
        };
        for (offset, chunk) in chunk_sequence(&dialogues, window)?.into_iter().enumerate() {
            let path = out_dir.join(format!(
                "{category}_{:0width$}.txt",
                offset + 1,
                width = PART_WIDTH
            ));
            tokio::fs::write(&path, render_dialogues(chunk))
                .await
                .map_err(|err| io_error("failed to write dialogue file", &path, err))?;
            written.push(path);
        }
    }

    let json_path = out_dir.join(DIALOGUES_JSON);
    let json = serde_json::to_vec_pretty(&extraction.dialogues)
        .map_err(|err| serialization_error(&json_path, err))?;
    tokio::fs::write(&json_path, json)
        .await
        .map_err(|err| io_error("failed to write dialogue index", &json_path, err))?;
    written.push(json_path);

    tracing::debug!(
        target: "corpus.pipeline",
        out_dir = %out_dir.display(),
        files = written.len(),
        "extraction_written"
    );
    Ok(written)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeCounters {
    pub dialogues: usize,
    pub turns_kept: usize,
    pub turns_duplicate: usize,
    pub turns_short: usize,
    pub redactions: usize,
}

#[derive(Debug, Clone)]
pub struct Optimization {
    pub text: String,
    pub counters: OptimizeCounters,
}

/// Turn-level cleanup: drops turns that are shorter than `min_turn_chars`
/// once normalized, and turns whose normalized text was already seen.
/// Dialogue boundaries survive as `---` lines.
pub fn optimize_text(
    source: &SourceText,
    segmenter: &Segmenter,
    hasher: ContentHasher,
    redactor: Option<&SecretRedactor>,
    min_turn_chars: usize,
    dedup: &mut Deduplicator,
) -> Optimization {
    let segmentation = segmenter.segment(&source.label(), &source.text);
    let mut counters = OptimizeCounters::default();
    let mut kept_dialogues: Vec<Vec<Turn>> = Vec::new();

    for dialogue in segmentation.dialogues {
        let mut kept = Vec::new();
        for mut turn in dialogue.turns {
            if let Some(redactor) = redactor {
                let redaction = redactor.redact(&turn.text);
                counters.redactions += redaction.replacements;
                turn.text = redaction.text.into_owned();
            }

            let normalized = normalize(&turn.text);
            if normalized.chars().count() < min_turn_chars {
                counters.turns_short += 1;
                continue;
            }
            if !dedup.insert(&hasher.digest_raw(normalized.as_bytes())) {
                counters.turns_duplicate += 1;
                continue;
            }
            kept.push(turn);
        }
        if !kept.is_empty() {
            counters.turns_kept += kept.len();
            kept_dialogues.push(kept);
        }
    }
    counters.dialogues = kept_dialogues.len();

    let text = kept_dialogues
        .iter()
        .map(|turns| {
            turns
                .iter()
                .map(|turn| format!("{}: {}", turn.speaker, turn.text))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n---\n");

    Optimization {
        text: if text.is_empty() { text } else { text + "\n" },
        counters,
    }
}
