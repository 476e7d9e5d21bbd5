use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::corpus::{categorize::CategoryRule, dedup::HashAlgorithm};

pub const DEFAULT_CONFIG_FILE: &str = "panacea.jsonc";
const DEFAULT_SCHEMA_FILE: &str = "panacea.schema.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub categories: CategoriesConfig,
    #[serde(default)]
    pub focus: FocusConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
    #[serde(default)]
    pub state: StateConfig,
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/panacea")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

fn default_speakers() -> Vec<String> {
    [
        "User",
        "Human",
        "Assistant",
        "AI",
        "ChatGPT",
        "Claude",
        "GPT",
        "Gemini",
        "Grok",
        "Q",
        "A",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_separator_pattern() -> String {
    r"^\s*(?:-{3,}|={3,}|\*{3,}|#{1,6}\s+\S.*)\s*$".to_string()
}

fn default_min_turns() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_speakers")]
    pub speakers: Vec<String>,
    #[serde(default = "default_separator_pattern")]
    pub separator_pattern: String,
    #[serde(default = "default_min_turns")]
    pub min_turns: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            speakers: default_speakers(),
            separator_pattern: default_separator_pattern(),
            min_turns: default_min_turns(),
        }
    }
}

fn default_min_turn_chars() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    #[serde(default = "default_min_turn_chars")]
    pub min_turn_chars: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            min_turn_chars: default_min_turn_chars(),
        }
    }
}

fn default_category_rules() -> Vec<CategoryRule> {
    fn rule(name: &str, keywords: &[&str]) -> CategoryRule {
        CategoryRule {
            name: name.to_string(),
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        }
    }

    vec![
        rule(
            "philosophy",
            &[
                "truth",
                "consciousness",
                "meaning",
                "existence",
                "reality",
                "paradox",
                "wisdom",
            ],
        ),
        rule(
            "technical",
            &[
                "code",
                "algorithm",
                "function",
                "system",
                "data",
                "model",
                "python",
                "rust",
            ],
        ),
        rule(
            "emotional",
            &["feel", "feeling", "fear", "love", "pain", "trust", "hope"],
        ),
        rule(
            "identity",
            &["identity", "self", "who am i", "mirror", "name", "persona"],
        ),
    ]
}

fn default_fallback_category() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesConfig {
    #[serde(default = "default_category_rules")]
    pub rules: Vec<CategoryRule>,
    #[serde(default = "default_fallback_category")]
    pub fallback: String,
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            rules: default_category_rules(),
            fallback: default_fallback_category(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocusConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_split_max_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_split_max_bytes")]
    pub max_bytes: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_split_max_bytes(),
        }
    }
}

fn default_dialogues_per_file() -> usize {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_dialogues_per_file")]
    pub dialogues_per_file: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dialogues_per_file: default_dialogues_per_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    #[serde(default = "default_enabled_true")]
    pub enabled: bool,
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_patterns: Vec::new(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./state/panacea_state.json")
}

fn default_flag_path() -> PathBuf {
    PathBuf::from("./state/automation.disabled")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_flag_path")]
    pub flag_path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            flag_path: default_flag_path(),
        }
    }
}

impl Config {
    /// Loads `config_path`, or falls back to defaults when the path was not
    /// given explicitly and nothing exists there.
    pub fn load_or_default(config_path: &Path, explicit: bool) -> Result<Self> {
        if !explicit && !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load(config_path)
    }

    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize panacea config")?;

        if !config.state.state_path.is_absolute() {
            config.state.state_path = config_base.join(&config.state.state_path);
        }
        if !config.state.flag_path.is_absolute() {
            config.state.flag_path = config_base.join(&config.state.flag_path);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join(DEFAULT_SCHEMA_FILE);
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or {DEFAULT_SCHEMA_FILE} next to it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
