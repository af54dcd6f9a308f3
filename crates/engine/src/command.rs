//! Engine backed by an external program.
//!
//! Each invocation spawns the configured command once:
//!
//! - the resolved parameters are written to stdin as JSON,
//! - `VIDGEN_OUTPUT_PATH` names the file the program must write,
//! - `VIDGEN_MODEL_BASE` points at the model directory,
//! - stdout lines of the form `progress <fraction>` are forwarded to the
//!   progress callback; any other line is logged at debug level.
//!
//! A non-zero exit status or a missing output file is a [`GenerationError`],
//! and a failed run leaves nothing behind in the scratch directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use vidgen_core::generation::GenerationParams;

use crate::engine::{GenerationEngine, GenerationError, ProgressFn};

/// Environment variable carrying the expected output path.
pub const OUTPUT_PATH_ENV: &str = "VIDGEN_OUTPUT_PATH";

/// Environment variable carrying the model directory.
pub const MODEL_BASE_ENV: &str = "VIDGEN_MODEL_BASE";

/// Prefix of a progress line on the engine's stdout.
const PROGRESS_PREFIX: &str = "progress ";

/// How much of stderr to keep in a failure message.
const STDERR_TAIL_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct CommandEngineConfig {
    /// Program to run for each job.
    pub program: String,
    /// Extra arguments passed before anything else.
    pub args: Vec<String>,
    /// Model weights directory; must exist for the engine to load.
    pub model_base: PathBuf,
    /// Scratch directory for in-progress outputs.
    pub work_dir: PathBuf,
}

pub struct CommandEngine {
    config: CommandEngineConfig,
}

impl CommandEngine {
    pub fn new(config: CommandEngineConfig) -> Self {
        Self { config }
    }

    fn output_path(&self) -> PathBuf {
        self.config
            .work_dir
            .join(format!("{}.partial.mp4", uuid::Uuid::new_v4().simple()))
    }
}

/// Parse a `progress <fraction>` line.
pub fn parse_progress_line(line: &str) -> Option<f64> {
    line.trim()
        .strip_prefix(PROGRESS_PREFIX)?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Keep the last `max` characters of `s`.
fn tail(s: &str, max: usize) -> &str {
    let s = s.trim();
    match s.char_indices().rev().nth(max.saturating_sub(1)) {
        Some((idx, _)) if s.chars().count() > max => &s[idx..],
        _ => s,
    }
}

#[async_trait]
impl GenerationEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    async fn load(&self) -> Result<(), GenerationError> {
        let model_base = &self.config.model_base;
        match tokio::fs::metadata(model_base).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return Err(GenerationError::Load(format!(
                    "Model directory not found: {}",
                    model_base.display()
                )));
            }
        }
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        Ok(())
    }

    async fn invoke(
        &self,
        params: &GenerationParams,
        on_progress: ProgressFn,
    ) -> Result<PathBuf, GenerationError> {
        let output_path = self.output_path();
        match self.run(params, on_progress, &output_path).await {
            Ok(()) => Ok(output_path),
            Err(e) => {
                remove_partial(&output_path).await;
                Err(e)
            }
        }
    }
}

impl CommandEngine {
    /// Run the program once, leaving its output at `output_path`.
    async fn run(
        &self,
        params: &GenerationParams,
        on_progress: ProgressFn,
        output_path: &Path,
    ) -> Result<(), GenerationError> {
        let payload = serde_json::to_vec(params)
            .map_err(|e| GenerationError::Failed(format!("Failed to encode parameters: {e}")))?;

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .env(OUTPUT_PATH_ENV, output_path)
            .env(MODEL_BASE_ENV, &self.config.model_base)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                GenerationError::Failed(format!(
                    "Failed to start engine '{}': {e}",
                    self.config.program
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that ignores stdin may close it early; that is fine.
            if let Err(e) = stdin.write_all(&payload).await {
                tracing::debug!(error = %e, "Engine closed stdin before reading parameters");
            }
        }

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    tracing::debug!(error = %e, "Failed to read engine stderr");
                }
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        if let Some(stdout) = child.stdout.take() {
            // Split on raw bytes: engine output is not guaranteed to be UTF-8.
            let mut lines = BufReader::new(stdout).split(b'\n');
            while let Some(raw) = lines.next_segment().await? {
                let line = String::from_utf8_lossy(&raw);
                match parse_progress_line(&line) {
                    Some(fraction) => on_progress(fraction),
                    None => tracing::debug!(line = %line, "engine output"),
                }
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let code = status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(GenerationError::Failed(format!(
                "engine exited with status {code}: {}",
                tail(&stderr, STDERR_TAIL_CHARS)
            )));
        }

        if !file_exists(output_path).await {
            return Err(GenerationError::Failed(
                "engine finished without producing an output file".to_string(),
            ));
        }

        Ok(())
    }
}

/// Delete whatever a failed run left behind.
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial engine output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial engine output");
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
