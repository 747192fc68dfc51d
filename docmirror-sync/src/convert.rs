//! Production [`Converter`] implementations.
//!
//! - [`PassthroughConverter`] handles text formats natively.
//! - [`CommandConverter`] shells out to a configured program.
//! - [`RoutingConverter`] picks between the two by source extension.

use std::path::{Path, PathBuf};
use std::process::Command;

use docmirror_core::ConverterConfig;

use crate::mirror::{ConversionOutcome, Converter, ConverterError};

/// Source extensions converted without an external program.
pub const TEXT_EXTENSIONS: &[&str] = &["md", "txt", "csv"];

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConverterError {
    ConverterError::Io {
        path: path.into(),
        source,
    }
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Write `content` to `path` through a `.tmp` sibling, creating parents.
fn write_output(path: &Path, content: &[u8]) -> Result<(), ConverterError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.docmirror.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Passthrough
// ---------------------------------------------------------------------------

/// Copies UTF-8 text sources into Markdown.
///
/// Line endings are normalised to LF. CSV is wrapped in a fenced block so it
/// renders verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConverter;

impl PassthroughConverter {
    pub fn handles(source: &Path) -> bool {
        TEXT_EXTENSIONS.contains(&lowercase_extension(source).as_str())
    }
}

impl Converter for PassthroughConverter {
    fn convert(&self, source: &Path, output: &Path) -> Result<ConversionOutcome, ConverterError> {
        let bytes = match std::fs::read(source) {
            Ok(bytes) => bytes,
            Err(err) => {
                return Ok(ConversionOutcome::Failed {
                    error: format!("cannot read source: {err}"),
                })
            }
        };
        let Ok(text) = String::from_utf8(bytes) else {
            return Ok(ConversionOutcome::Failed {
                error: "source is not valid UTF-8 text".to_string(),
            });
        };

        let mut body = text.replace("\r\n", "\n");
        if lowercase_extension(source) == "csv" {
            if !body.ends_with('\n') {
                body.push('\n');
            }
            body = format!("```csv\n{body}```\n");
        }

        write_output(output, body.as_bytes())?;
        tracing::info!("wrote: {}", output.display());
        Ok(ConversionOutcome::Success {
            output: output.to_path_buf(),
        })
    }
}

// ---------------------------------------------------------------------------
// External command
// ---------------------------------------------------------------------------

/// Runs `program args...` once per document.
///
/// `{input}` and `{output}` in `args` are replaced with the source and output
/// paths. Without an `{output}` argument the program's stdout becomes the
/// Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn writes_output_itself(&self) -> bool {
        self.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER))
    }

    fn expand_args(&self, source: &Path, output: &Path) -> Vec<String> {
        let input = source.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

impl Converter for CommandConverter {
    fn convert(&self, source: &Path, output: &Path) -> Result<ConversionOutcome, ConverterError> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let run = Command::new(&self.program)
            .args(self.expand_args(source, output))
            .output()
            .map_err(|e| ConverterError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !run.status.success() {
            let stderr = String::from_utf8_lossy(&run.stderr).trim().to_string();
            let error = if stderr.is_empty() {
                format!("{} exited with {}", self.program, run.status)
            } else {
                format!("{} exited with {}: {stderr}", self.program, run.status)
            };
            return Ok(ConversionOutcome::Failed { error });
        }

        if self.writes_output_itself() {
            if !output.is_file() {
                return Ok(ConversionOutcome::Failed {
                    error: format!("{} reported success but wrote no output", self.program),
                });
            }
        } else {
            write_output(output, &run.stdout)?;
        }

        tracing::info!("wrote: {}", output.display());
        Ok(ConversionOutcome::Success {
            output: output.to_path_buf(),
        })
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Text formats go through [`PassthroughConverter`], everything else through
/// the configured [`CommandConverter`].
#[derive(Debug, Clone, Default)]
pub struct RoutingConverter {
    passthrough: PassthroughConverter,
    command: Option<CommandConverter>,
}

impl RoutingConverter {
    pub fn new(command: Option<CommandConverter>) -> Self {
        Self {
            passthrough: PassthroughConverter,
            command,
        }
    }

    pub fn from_config(config: Option<&ConverterConfig>) -> Self {
        Self::new(config.map(CommandConverter::from_config))
    }
}

impl Converter for RoutingConverter {
    fn convert(&self, source: &Path, output: &Path) -> Result<ConversionOutcome, ConverterError> {
        if PassthroughConverter::handles(source) {
            return self.passthrough.convert(source, output);
        }
        match &self.command {
            Some(command) => command.convert(source, output),
            None => Ok(ConversionOutcome::Failed {
                error: format!(
                    "no converter configured for .{} files; set `converter.program` in docmirror.yaml",
                    lowercase_extension(source)
                ),
            }),
        }
    }
}
