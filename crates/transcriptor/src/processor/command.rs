//! Awaitable external process invocation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::error::EngineError;

/// Directories always searched first when resolving engine binaries.
const BASE_PATH: &str = "/usr/bin:/bin:/usr/local/bin";
const DEFAULT_LOCALE: &str = "en_US.UTF-8";

/// Keep at most this many trailing stderr lines for diagnostics.
const STDERR_TAIL_LINES: usize = 40;

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Converts a non-zero exit into [`EngineError::NonZeroExit`].
    pub fn into_result(self, program: &str) -> Result<CommandOutput, EngineError> {
        if self.success() {
            Ok(self)
        } else {
            Err(EngineError::NonZeroExit {
                program: program.to_string(),
                code: self.code(),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// One external invocation: program, arguments and an optional deadline.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Short program name for logs and error messages.
    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("command")
            .to_string()
    }

    /// Shell-ish rendering used in debug logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Environment overrides applied to every engine process.
pub fn engine_env() -> Vec<(&'static str, String)> {
    let path = match std::env::var("PATH") {
        Ok(existing) if !existing.is_empty() => format!("{}:{}", BASE_PATH, existing),
        _ => BASE_PATH.to_string(),
    };
    let locale = |name: &str| {
        std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
    };

    vec![
        ("PATH", path),
        ("LANG", locale("LANG")),
        ("LC_ALL", locale("LC_ALL")),
        ("PYTHONUTF8", "1".to_string()),
    ]
}

/// Runs `spec` to completion, streaming its output into the log.
///
/// A non-zero exit is *not* an error here; callers inspect
/// [`CommandOutput::status`]. Errors are reserved for spawn failures and
/// deadline expiry, in which case the child is killed.
pub async fn run_command(spec: &CommandSpec) -> Result<CommandOutput, EngineError> {
    let program = spec.display_name();
    debug!(command = %spec.command_line(), "Spawning process");

    let mut cmd = TokioCommand::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.current_dir {
        cmd.current_dir(dir);
    }
    for (key, value) in engine_env() {
        cmd.env(key, value);
    }

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|e| EngineError::Spawn {
        program: program.clone(),
        source: e,
    })?;

    let stderr_pipe = child.stderr.take();
    let stdout_pipe = child.stdout.take();

    let stderr_task = async {
        let mut tail: Vec<String> = Vec::new();
        if let Some(stderr) = stderr_pipe {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(program = %program, "stderr: {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            }
        }
        tail
    };

    let stdout_task = async {
        let mut collected = Vec::new();
        if let Some(stdout) = stdout_pipe {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(program = %program, "stdout: {}", line);
                collected.push(line);
            }
        }
        collected
    };

    let run = async {
        let (stderr_lines, stdout_lines) = tokio::join!(stderr_task, stdout_task);
        let status = child.wait().await;
        (status, stderr_lines, stdout_lines)
    };

    let finished = match spec.timeout {
        Some(limit) => tokio::time::timeout(limit, run).await.ok(),
        None => Some(run.await),
    };

    // On expiry the child is dropped on return, and kill_on_drop terminates it.
    let Some((status, stderr_lines, stdout_lines)) = finished else {
        let after = spec.timeout.unwrap_or_default();
        warn!(program = %program, timeout_secs = after.as_secs(), "Process timed out, killing it");
        return Err(EngineError::TimedOut { program, after });
    };

    let status = status.map_err(|e| EngineError::Wait {
        program: program.clone(),
        source: e,
    })?;

    let duration = started.elapsed();
    debug!(
        program = %program,
        code = status.code().unwrap_or(-1),
        duration_ms = duration.as_millis() as u64,
        "Process exited"
    );

    Ok(CommandOutput {
        status,
        stdout: stdout_lines.join("\n"),
        stderr: stderr_lines.join("\n"),
        duration,
    })
}
