use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

use crate::config::DEFAULT_CONFIG_FILE;

pub const USAGE: &str = "usage: panacea [--config <path>] <command>
commands:
  extract <input>... --out <dir> [--per-file <n>]
  optimize <input> --out <file>
  focus <input>... --out <dir> [--keyword <k>]...
  split <input> [--max-bytes <n>] [--out-dir <dir>]
  redact <input> [--out <file> | --in-place]
  list-files [<dir>]      (alias --list-files)
  status                  (alias --status)
  lock [--reason <text>]
  unlock
  validate --out <dir>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedactTarget {
    Stdout,
    File(PathBuf),
    InPlace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Extract {
        inputs: Vec<PathBuf>,
        out_dir: PathBuf,
        per_file: Option<usize>,
    },
    Optimize {
        input: PathBuf,
        out: PathBuf,
    },
    Focus {
        inputs: Vec<PathBuf>,
        out_dir: PathBuf,
        keywords: Vec<String>,
    },
    Split {
        input: PathBuf,
        max_bytes: Option<usize>,
        out_dir: Option<PathBuf>,
    },
    Redact {
        input: PathBuf,
        target: RedactTarget,
    },
    ListFiles {
        dir: PathBuf,
    },
    Status,
    Lock {
        reason: Option<String>,
    },
    Unlock,
    Validate {
        out_dir: PathBuf,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config_path: PathBuf,
    /// Whether `--config` was given; an explicit path must exist.
    pub config_explicit: bool,
    pub command: Command,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Extract { .. } => "extract",
            Command::Optimize { .. } => "optimize",
            Command::Focus { .. } => "focus",
            Command::Split { .. } => "split",
            Command::Redact { .. } => "redact",
            Command::ListFiles { .. } => "list-files",
            Command::Status => "status",
            Command::Lock { .. } => "lock",
            Command::Unlock => "unlock",
            Command::Validate { .. } => "validate",
            Command::Help => "help",
        }
    }

    /// Commands that process corpora without a human in the loop.
    pub fn is_automated(&self) -> bool {
        matches!(
            self,
            Command::Extract { .. }
                | Command::Optimize { .. }
                | Command::Focus { .. }
                | Command::Split { .. }
        )
    }
}

pub fn invocation_from_args() -> Result<Invocation> {
    parse_cli_args(env::args().skip(1))
}

pub fn parse_cli_args<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut rest = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--config" {
            let value = args
                .next()
                .ok_or_else(|| anyhow!("missing value for --config"))?;
            config_path = Some(PathBuf::from(value));
        } else {
            rest.push(arg);
        }
    }

    let command = parse_command(rest)?;
    Ok(Invocation {
        config_explicit: config_path.is_some(),
        config_path: config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        command,
    })
}

fn parse_command(args: Vec<String>) -> Result<Command> {
    let mut args = args.into_iter();
    let Some(name) = args.next() else {
        return Ok(Command::Help);
    };

    let mut parser = ArgParser {
        command: name.clone(),
        args,
    };
    match name.as_str() {
        "extract" => {
            let mut inputs = Vec::new();
            let mut out_dir = None;
            let mut per_file = None;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--out" => out_dir = Some(PathBuf::from(parser.value("--out")?)),
                    "--per-file" => per_file = Some(parser.number("--per-file")?),
                    other => inputs.push(parser.positional(other)?),
                }
            }
            Ok(Command::Extract {
                inputs: parser.require_inputs(inputs)?,
                out_dir: parser.require(out_dir, "--out")?,
                per_file,
            })
        }
        "optimize" => {
            let mut input = None;
            let mut out = None;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--out" => out = Some(PathBuf::from(parser.value("--out")?)),
                    other => parser.single(&mut input, other)?,
                }
            }
            Ok(Command::Optimize {
                input: parser.require(input, "<input>")?,
                out: parser.require(out, "--out")?,
            })
        }
        "focus" => {
            let mut inputs = Vec::new();
            let mut out_dir = None;
            let mut keywords = Vec::new();
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--out" => out_dir = Some(PathBuf::from(parser.value("--out")?)),
                    "--keyword" => keywords.push(parser.value("--keyword")?),
                    other => inputs.push(parser.positional(other)?),
                }
            }
            Ok(Command::Focus {
                inputs: parser.require_inputs(inputs)?,
                out_dir: parser.require(out_dir, "--out")?,
                keywords,
            })
        }
        "split" => {
            let mut input = None;
            let mut max_bytes = None;
            let mut out_dir = None;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--max-bytes" => max_bytes = Some(parser.number("--max-bytes")?),
                    "--out-dir" => out_dir = Some(PathBuf::from(parser.value("--out-dir")?)),
                    other => parser.single(&mut input, other)?,
                }
            }
            Ok(Command::Split {
                input: parser.require(input, "<input>")?,
                max_bytes,
                out_dir,
            })
        }
        "redact" => {
            let mut input = None;
            let mut target = RedactTarget::Stdout;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--out" => target = RedactTarget::File(PathBuf::from(parser.value("--out")?)),
                    "--in-place" => target = RedactTarget::InPlace,
                    other => parser.single(&mut input, other)?,
                }
            }
            Ok(Command::Redact {
                input: parser.require(input, "<input>")?,
                target,
            })
        }
        "list-files" | "--list-files" => {
            let mut dir = None;
            while let Some(arg) = parser.next() {
                parser.single(&mut dir, &arg)?;
            }
            Ok(Command::ListFiles {
                dir: dir.unwrap_or_else(|| PathBuf::from(".")),
            })
        }
        "status" | "--status" => {
            parser.finish()?;
            Ok(Command::Status)
        }
        "lock" => {
            let mut reason = None;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--reason" => reason = Some(parser.value("--reason")?),
                    other => return Err(parser.unknown(other)),
                }
            }
            Ok(Command::Lock { reason })
        }
        "unlock" => {
            parser.finish()?;
            Ok(Command::Unlock)
        }
        "validate" => {
            let mut out_dir = None;
            while let Some(arg) = parser.next() {
                match arg.as_str() {
                    "--out" => out_dir = Some(PathBuf::from(parser.value("--out")?)),
                    other => return Err(parser.unknown(other)),
                }
            }
            Ok(Command::Validate {
                out_dir: parser.require(out_dir, "--out")?,
            })
        }
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(anyhow!("unknown command: {other}. {USAGE}")),
    }
}

struct ArgParser<I> {
    command: String,
    args: I,
}

impl<I> ArgParser<I>
where
    I: Iterator<Item = String>,
{
    fn next(&mut self) -> Option<String> {
        self.args.next()
    }

    fn value(&mut self, flag: &str) -> Result<String> {
        self.args
            .next()
            .ok_or_else(|| anyhow!("missing value for {flag}"))
    }

    fn number(&mut self, flag: &str) -> Result<usize> {
        let value = self.value(flag)?;
        value
            .parse()
            .map_err(|_| anyhow!("{flag} expects a non-negative integer, got '{value}'"))
    }

    fn unknown(&self, arg: &str) -> anyhow::Error {
        anyhow!("unknown argument for {}: {arg}. {USAGE}", self.command)
    }

    fn positional(&self, arg: &str) -> Result<PathBuf> {
        if arg.starts_with("--") {
            return Err(self.unknown(arg));
        }
        Ok(PathBuf::from(arg))
    }

    fn single(&self, slot: &mut Option<PathBuf>, arg: &str) -> Result<()> {
        let path = self.positional(arg)?;
        if slot.is_some() {
            return Err(anyhow!(
                "{} takes a single input, got extra '{arg}'",
                self.command
            ));
        }
        *slot = Some(path);
        Ok(())
    }

    fn require<T>(&self, value: Option<T>, what: &str) -> Result<T> {
        value.ok_or_else(|| anyhow!("{} requires {what}. {USAGE}", self.command))
    }

    fn require_inputs(&self, inputs: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
        if inputs.is_empty() {
            return Err(anyhow!(
                "{} requires at least one <input>. {USAGE}",
                self.command
            ));
        }
        Ok(inputs)
    }

    fn finish(&mut self) -> Result<()> {
        match self.args.next() {
            Some(extra) => Err(self.unknown(&extra)),
            None => Ok(()),
        }
    }
}
