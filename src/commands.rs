use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use futures_util::future::try_join_all;
use serde::Serialize;
use tracing::Instrument;

use crate::{
    cli::{Command, RedactTarget, USAGE},
    config::Config,
    corpus::{
        ContentHasher, Deduplicator, FocusFilter, Segmenter, SourceText,
        chunk::{part_file_name, split_by_size},
        pipeline::{ExtractionPipeline, OptimizeCounters, optimize_text, write_extraction},
        redact::SecretRedactor,
    },
    error::io_error,
    state::{
        AutomationGate, FlagRecord, ProcessingState, RunReport, StateStore, ValidationReport,
        now_rfc3339, validate,
    },
};

pub struct CommandContext {
    pub config: Config,
    pub run_id: String,
}

impl CommandContext {
    pub fn new(config: Config, run_id: impl Into<String>) -> Self {
        Self {
            config,
            run_id: run_id.into(),
        }
    }

    pub fn gate(&self) -> AutomationGate {
        AutomationGate::new(self.config.state.flag_path.clone())
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(self.config.state.state_path.clone())
    }

    fn hasher(&self) -> ContentHasher {
        ContentHasher::new(self.config.dedup.algorithm)
    }

    fn redactor(&self) -> Result<Option<SecretRedactor>> {
        if !self.config.redaction.enabled {
            return Ok(None);
        }
        Ok(Some(SecretRedactor::new(
            &self.config.redaction.extra_patterns,
        )?))
    }
}

/// Runs `command` inside a `command` span carrying the run id, so every log
/// line written during the command can be traced back to its run.
pub async fn execute(ctx: &CommandContext, command: Command) -> Result<()> {
    let span = tracing::info_span!("command", command = command.name(), run_id = %ctx.run_id);
    dispatch(ctx, command).instrument(span).await
}

async fn dispatch(ctx: &CommandContext, command: Command) -> Result<()> {
    if command.is_automated() {
        ctx.gate().check()?;
    }
    tracing::info!(target: "commands", "command_started");

    match command {
        Command::Extract {
            inputs,
            out_dir,
            per_file,
        } => {
            let report = run_extract(ctx, &inputs, &out_dir, per_file, None).await?;
            print_json(&report)?;
        }
        Command::Focus {
            inputs,
            out_dir,
            keywords,
        } => {
            let keywords = if keywords.is_empty() {
                ctx.config.focus.keywords.clone()
            } else {
                keywords
            };
            let report = run_extract(ctx, &inputs, &out_dir, None, Some(&keywords)).await?;
            print_json(&report)?;
        }
        Command::Optimize { input, out } => {
            let counters = run_optimize(ctx, &input, &out).await?;
            print_json(&counters)?;
        }
        Command::Split {
            input,
            max_bytes,
            out_dir,
        } => {
            for path in run_split(ctx, &input, max_bytes, out_dir.as_deref()).await? {
                println!("{}", path.display());
            }
        }
        Command::Redact { input, target } => {
            let replacements = run_redact(ctx, &input, &target).await?;
            eprintln!("{replacements} secret(s) redacted in {}", input.display());
        }
        Command::ListFiles { dir } => {
            for (path, size) in list_corpus_files(&dir)? {
                println!("{size:>12}  {}", path.display());
            }
        }
        Command::Status => print_json(&status(ctx)?)?,
        Command::Lock { reason } => {
            lock(ctx, reason)?;
            println!(
                "automation disabled: {}",
                ctx.config.state.flag_path.display()
            );
        }
        Command::Unlock => {
            let removed = unlock(ctx)?;
            println!(
                "automation enabled{}",
                if removed { "" } else { " (flag was not set)" }
            );
        }
        Command::Validate { out_dir } => {
            let validation = run_validate(ctx, &out_dir)?;
            print_json(&validation)?;
            if !validation.passed {
                return Err(anyhow!(
                    "validation failed for run {} in {}",
                    validation.run_id,
                    out_dir.display()
                ));
            }
        }
        Command::Help => println!("{USAGE}"),
    }

    tracing::info!(target: "commands", "command_finished");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render output as json")?
    );
    Ok(())
}

async fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    Ok(tokio::fs::read(path)
        .await
        .map_err(|err| io_error("failed to read input", path, err))?)
}

/// Segmentation works on text, so invalid UTF-8 is replaced here. Commands
/// that write the input back out use `read_bytes` instead.
async fn read_source(path: PathBuf) -> Result<(SourceText, Vec<u8>)> {
    let bytes = read_bytes(&path).await?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok((SourceText::new(path, text), bytes))
}

/// Reads every input concurrently; results keep input order.
pub async fn read_sources(
    inputs: &[PathBuf],
    hasher: ContentHasher,
) -> Result<(Vec<SourceText>, Vec<(String, String)>)> {
    let loaded = try_join_all(inputs.iter().cloned().map(read_source)).await?;

    let mut sources = Vec::with_capacity(loaded.len());
    let mut digests = Vec::with_capacity(loaded.len());
    for (source, bytes) in loaded {
        digests.push((source.label(), hasher.digest_raw(&bytes)));
        sources.push(source);
    }
    Ok((sources, digests))
}

pub async fn run_extract(
    ctx: &CommandContext,
    inputs: &[PathBuf],
    out_dir: &Path,
    per_file: Option<usize>,
    focus_keywords: Option<&[String]>,
) -> Result<RunReport> {
    let mut pipeline = ExtractionPipeline::from_config(&ctx.config)?;
    let command = match focus_keywords {
        Some(keywords) => {
            pipeline = pipeline.with_focus(FocusFilter::new(keywords)?);
            "focus"
        }
        None => "extract",
    };

    let (sources, digests) = read_sources(inputs, pipeline.hasher()).await?;
    let extraction = pipeline.run(&sources);
    let written = write_extraction(
        out_dir,
        &extraction,
        per_file.unwrap_or(ctx.config.output.dialogues_per_file),
    )
    .await?;

    let generated_at = now_rfc3339();
    ctx.store().record_run(&ctx.run_id, &generated_at, &digests)?;

    let report = RunReport {
        run_id: ctx.run_id.clone(),
        generated_at,
        command: command.to_string(),
        inputs: digests.iter().map(|(path, _)| path.clone()).collect(),
        counters: extraction.counters,
        category_counts: extraction.category_counts,
        written_files: written
            .iter()
            .map(|path| path.strip_prefix(out_dir).unwrap_or(path).to_path_buf())
            .collect(),
    };
    report.write(out_dir)?;
    Ok(report)
}

pub async fn run_optimize(
    ctx: &CommandContext,
    input: &Path,
    out: &Path,
) -> Result<OptimizeCounters> {
    let segmenter = Segmenter::new(&ctx.config.segmentation)?;
    let redactor = ctx.redactor()?;
    let hasher = ctx.hasher();

    let (source, bytes) = read_source(input.to_path_buf()).await?;
    let mut dedup = Deduplicator::new();
    let optimization = optimize_text(
        &source,
        &segmenter,
        hasher,
        redactor.as_ref(),
        ctx.config.dedup.min_turn_chars,
        &mut dedup,
    );

    write_file(out, optimization.text.as_bytes()).await?;
    ctx.store().record_run(
        &ctx.run_id,
        &now_rfc3339(),
        &[(source.label(), hasher.digest_raw(&bytes))],
    )?;

    tracing::info!(
        target: "commands",
        input = %input.display(),
        out = %out.display(),
        turns_kept = optimization.counters.turns_kept,
        turns_duplicate = optimization.counters.turns_duplicate,
        turns_short = optimization.counters.turns_short,
        "optimize_completed"
    );
    Ok(optimization.counters)
}

pub async fn run_split(
    ctx: &CommandContext,
    input: &Path,
    max_bytes: Option<usize>,
    out_dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let max_bytes = max_bytes.unwrap_or(ctx.config.split.max_bytes);
    let bytes = read_bytes(input).await?;
    let parts = split_by_size(&bytes, max_bytes)?;

    let out_dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("input {} has no file name", input.display()))?;
    let ext = input
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned());
    let width = parts.len().to_string().len().max(3);

    let mut written = Vec::with_capacity(parts.len());
    for (offset, part) in parts.iter().enumerate() {
        let path = out_dir.join(part_file_name(&stem, ext.as_deref(), offset + 1, width));
        write_file(&path, part).await?;
        written.push(path);
    }

    ctx.store().record_run(
        &ctx.run_id,
        &now_rfc3339(),
        &[(input.display().to_string(), ctx.hasher().digest_raw(&bytes))],
    )?;
    tracing::info!(
        target: "commands",
        input = %input.display(),
        parts = written.len(),
        max_bytes,
        "split_completed"
    );
    Ok(written)
}

pub async fn run_redact(ctx: &CommandContext, input: &Path, target: &RedactTarget) -> Result<usize> {
    let redactor = SecretRedactor::new(&ctx.config.redaction.extra_patterns)?;
    let bytes = read_bytes(input).await?;
    let redaction = redactor.redact_bytes(&bytes);

    match target {
        RedactTarget::Stdout => std::io::stdout()
            .write_all(&redaction.bytes)
            .context("failed to write redacted text to stdout")?,
        RedactTarget::File(path) => write_file(path, &redaction.bytes).await?,
        RedactTarget::InPlace => {
            if redaction.replacements > 0 {
                write_file(input, &redaction.bytes).await?;
            }
        }
    }
    Ok(redaction.replacements)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| io_error("failed to create directory", parent, err))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|err| io_error("failed to write output", path, err))?;
    Ok(())
}

/// `*.txt` files under `dir` whose name mentions "panacea"; every `*.txt`
/// file when none does. Sorted by path.
pub fn list_corpus_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?;

    let mut text_files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        let is_txt = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if !is_txt {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("failed to stat {}", path.display()))?;
        if metadata.is_file() {
            text_files.push((path, metadata.len()));
        }
    }
    text_files.sort();

    let panacea_files: Vec<(PathBuf, u64)> = text_files
        .iter()
        .filter(|(path, _)| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().to_lowercase().contains("panacea"))
        })
        .cloned()
        .collect();
    if panacea_files.is_empty() {
        Ok(text_files)
    } else {
        Ok(panacea_files)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub automation_disabled: bool,
    pub flag_path: PathBuf,
    pub flag: Option<FlagRecord>,
    pub state_path: PathBuf,
    pub state: ProcessingState,
}

pub fn status(ctx: &CommandContext) -> Result<StatusReport> {
    let gate = ctx.gate();
    let store = ctx.store();
    Ok(StatusReport {
        automation_disabled: gate.is_engaged(),
        flag_path: gate.flag_path().to_path_buf(),
        flag: gate.record(),
        state_path: store.path().to_path_buf(),
        state: store.load_or_default()?,
    })
}

pub fn lock(ctx: &CommandContext, reason: Option<String>) -> Result<()> {
    ctx.gate().engage(reason, now_rfc3339())?;
    ctx.store().set_manual_processing(true)?;
    Ok(())
}

pub fn unlock(ctx: &CommandContext) -> Result<bool> {
    let removed = ctx.gate().release()?;
    ctx.store().set_manual_processing(false)?;
    Ok(removed)
}

pub fn run_validate(ctx: &CommandContext, out_dir: &Path) -> Result<ValidationReport> {
    let report = RunReport::read(out_dir)?;
    let state = ctx.store().load_or_default()?;
    let validation = validate(&report, &state, out_dir);
    for check in validation.checks.iter().filter(|check| !check.passed) {
        tracing::warn!(
            target: "commands",
            check = %check.name,
            detail = %check.detail,
            "validation_check_failed"
        );
    }
    Ok(validation)
}
