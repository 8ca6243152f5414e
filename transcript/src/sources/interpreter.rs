//! Interpreter bridge: runs the transcript script in an external interpreter.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::*;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::error::{cancelled, stage_error, Error, ErrorKind, StageErrorKind};
use crate::traits::process::{ProcessCommand, ProcessOutput, ProcessRunner};
use crate::traits::source::Source;
use crate::types::cue::Cue;
use crate::types::transcript::{SourceKind, TranscriptRequest};

/// Executables tried after the configured override, in order.
pub const DEFAULT_INTERPRETERS: [&str; 3] = ["python3", "python", "py"];

pub const DEFAULT_SCRIPT_NAME: &str = "fetch_transcript.py";

/// Languages appended to every request's own preference.
pub const DEFAULT_EXTRA_LANGUAGES: [&str; 5] = ["en", "en-US", "en-GB", "en-IN", "hi"];

#[derive(Debug, Clone)]
pub struct InterpreterSettings {
    /// Tried before `interpreters` when set (`PYTHON_BIN`).
    pub interpreter_override: Option<String>,
    pub interpreters: Vec<String>,
    /// Directory holding the script; also the working directory of the child.
    pub scripts_dir: PathBuf,
    pub script_name: String,
    pub extra_languages: Vec<String>,
    /// Bound on one spawn-and-wait.
    pub timeout: Duration,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            interpreter_override: None,
            interpreters: DEFAULT_INTERPRETERS.iter().map(|s| s.to_string()).collect(),
            scripts_dir: PathBuf::from("scripts"),
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
            extra_languages: DEFAULT_EXTRA_LANGUAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout: Duration::from_secs(45),
        }
    }
}

impl InterpreterSettings {
    /// Ordered executables to try: the override first, blanks and duplicates removed.
    pub fn candidates(&self) -> Vec<String> {
        dedupe(
            self.interpreter_override
                .iter()
                .chain(self.interpreters.iter())
                .map(String::as_str),
        )
    }
}

fn dedupe<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for item in items.map(str::trim).filter(|item| !item.is_empty()) {
        if !unique.iter().any(|existing| existing == item) {
            unique.push(item.to_string());
        }
    }
    unique
}

/// `ProcessRunner` backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        command: &ProcessCommand,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, Error> {
        let mut child = spawn(command).map_err(|e| Error {
            source: Some(format!("Failed to spawn {}: {}", command.program, e).into()),
            error_kind: ErrorKind::Stage(StageErrorKind::Spawn),
        })?;
        trace!("Spawned {} (pid {:?})", command.program, child.id());

        let interrupted = tokio::select! {
            biased;
            _ = cancel.cancelled() => cancelled(),
            _ = tokio::time::sleep(command.timeout) => stage_error(
                StageErrorKind::Timeout,
                &format!("{} timed out after {:?}", command.program, command.timeout),
            ),
            output = wait_with_output(&mut child) => {
                return output.map_err(|e| Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::Stage(StageErrorKind::ExitStatus),
                });
            }
        };

        if let Err(e) = child.kill().await {
            warn!("Failed to kill {}: {}", command.program, e);
        }
        Err(interrupted)
    }
}

fn spawn(command: &ProcessCommand) -> std::io::Result<Child> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &command.working_dir {
        cmd.current_dir(dir);
    }
    cmd.spawn()
}

async fn wait_with_output(child: &mut Child) -> std::io::Result<ProcessOutput> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (status, stdout, stderr) =
        tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
    Ok(ProcessOutput {
        status_code: status?.code(),
        stdout: stdout?,
        stderr: stderr?,
    })
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Finds a working interpreter and runs a script with it.
pub struct InterpreterBridge {
    runner: Box<dyn ProcessRunner>,
    settings: InterpreterSettings,
}

impl InterpreterBridge {
    pub fn new(settings: InterpreterSettings) -> Self {
        Self::with_runner(Box::new(TokioProcessRunner), settings)
    }

    pub fn with_runner(runner: Box<dyn ProcessRunner>, settings: InterpreterSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &InterpreterSettings {
        &self.settings
    }

    /// Run `script_name` from the scripts directory with the first candidate
    /// interpreter that spawns and exits with status 0.
    ///
    /// A spawn error or nonzero exit moves on to the next candidate. A timeout or
    /// cancellation ends the call immediately.
    pub async fn run_interpreter(
        &self,
        script_name: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, Error> {
        let candidates = self.settings.candidates();
        let mut last_error: Option<(StageErrorKind, String)> = None;

        for program in &candidates {
            let command = ProcessCommand {
                program: program.clone(),
                args: std::iter::once(script_name.to_string())
                    .chain(args.iter().cloned())
                    .collect(),
                working_dir: Some(self.settings.scripts_dir.clone()),
                timeout: self.settings.timeout,
            };

            match self.runner.run(&command, cancel).await {
                Ok(output) if output.success() => return Ok(output),
                Ok(output) => {
                    let stderr = output.stderr.trim();
                    let message = if stderr.is_empty() {
                        format!("{} exited with status {:?}", program, output.status_code)
                    } else {
                        format!("{}: {}", program, stderr)
                    };
                    debug!("Interpreter candidate failed: {}", message);
                    last_error = Some((StageErrorKind::ExitStatus, message));
                }
                Err(e) if e.error_kind == ErrorKind::Stage(StageErrorKind::Spawn) => {
                    debug!("Interpreter candidate unavailable: {}", e);
                    last_error = Some((StageErrorKind::Spawn, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        let (kind, last) = last_error
            .unwrap_or((StageErrorKind::Spawn, "no interpreter candidates".to_string()));
        Err(stage_error(
            kind,
            &format!(
                "Failed to run script {:?}. Tried: {}. Last error: {}",
                script_name,
                candidates.join(", "),
                last
            ),
        ))
    }
}

/// Second escalation stage: the transcript script run out of process.
pub struct InterpreterSource {
    bridge: InterpreterBridge,
}

impl InterpreterSource {
    pub fn new(bridge: InterpreterBridge) -> Self {
        Self { bridge }
    }

    fn languages(&self, request: &TranscriptRequest) -> String {
        dedupe(
            request
                .language_preference
                .iter()
                .chain(self.bridge.settings().extra_languages.iter())
                .map(String::as_str),
        )
        .join(",")
    }
}

#[async_trait]
impl Source for InterpreterSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Interpreter
    }

    async fn attempt(
        &self,
        request: &TranscriptRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, Error> {
        let args = [request.watch_url(), self.languages(request)];
        let script = self.bridge.settings().script_name.clone();
        let output = self.bridge.run_interpreter(&script, &args, cancel).await?;
        parse_script_output(&output.stdout)
    }
}

/// Interpret the script's stdout: a JSON array of cues, or `{"error": ...}`.
pub fn parse_script_output(stdout: &str) -> Result<Vec<String>, Error> {
    let value: Value = serde_json::from_str(stdout.trim()).map_err(|e| Error {
        source: Some(format!("Script returned invalid JSON: {}", e).into()),
        error_kind: ErrorKind::Stage(StageErrorKind::InvalidResponse),
    })?;

    match value {
        Value::Array(_) => {
            let cues: Vec<Cue> = serde_json::from_value(value)?;
            let fragments: Vec<String> = cues
                .into_iter()
                .map(|cue| cue.text)
                .filter(|text| !text.trim().is_empty())
                .collect();
            if fragments.is_empty() {
                return Err(stage_error(
                    StageErrorKind::EmptyResult,
                    "Script returned no transcript entries",
                ));
            }
            Ok(fragments)
        }
        Value::Object(map) if map.contains_key("error") => {
            let message = match &map["error"] {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            };
            Err(stage_error(StageErrorKind::Upstream, &message))
        }
        _ => Err(stage_error(
            StageErrorKind::InvalidResponse,
            "Script output is neither a transcript list nor an error object",
        )),
    }
}
