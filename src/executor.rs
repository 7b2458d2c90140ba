//! External process execution with live output streaming.
//!
//! Native builds can run for many minutes with sparse output; the executor
//! forwards every line of the child's stdout and stderr as it arrives so
//! silence in the terminal means silence from the tool, not a stalled pipe.
//! It blocks the calling stage until the process exits.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::environment::ExecutionEnvironment;
use crate::error::{BuildError, Result};
use crate::models::Platform;

/// A single external process call: program, arguments, working directory.
/// The environment is supplied separately at execution time.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
}

impl CommandInvocation {
    pub fn new<P, I, A, D>(program: P, args: I, dir: D) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
        D: Into<PathBuf>,
    {
        CommandInvocation {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: dir.into(),
        }
    }

    /// The full command line, for diagnostics.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a non-fatal probe run.
#[derive(Debug)]
pub struct ProbeOutput {
    pub code: i32,
    pub stdout: String,
}

/// Matches ninja/gn step counters like `[582/12041]`.
static STEP_PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*(\d+)/(\d+)\]").expect("step progress pattern is valid"));

fn base_command(invocation: &CommandInvocation, env: &ExecutionEnvironment, platform: &Platform) -> Command {
    // depot_tools entry points on Windows are batch scripts; they only run
    // through the command interpreter. Decided once per platform, not per
    // command.
    let mut command = if platform.uses_shell_indirection {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&invocation.program).args(&invocation.args);
        c
    } else {
        let mut c = Command::new(&invocation.program);
        c.args(&invocation.args);
        c
    };
    command.current_dir(&invocation.dir);
    command.env_clear();
    for (key, value) in env.vars() {
        command.env(key, value);
    }
    command
}

fn classify_spawn_error(e: std::io::Error, invocation: &CommandInvocation) -> BuildError {
    if e.kind() == std::io::ErrorKind::NotFound {
        BuildError::ExecutableNotFound {
            command: invocation.program.clone(),
            dir: invocation.dir.clone(),
        }
    } else {
        BuildError::Io(e)
    }
}

fn forward_line(line: &str, steps_seen: &mut u64) {
    println!("{line}");

    // Coarse progress checkpoints so long compiles show movement in the
    // orchestrator log, not just in the forwarded stream.
    if let Some(caps) = STEP_PROGRESS.captures(line) {
        if let (Ok(done), Ok(total)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) {
            *steps_seen += 1;
            if total > 0 && *steps_seen % 100 == 0 {
                log::info!("build progress: {done} of {total} steps");
            }
        }
    }
}

/// Run an invocation, forwarding its merged stdout/stderr line-by-line to
/// this process's stdout. Blocks until the child exits.
///
/// # Errors
/// * `ExecutableNotFound` if the program cannot be started
/// * `CommandFailed` (carrying the child's exit code) on nonzero exit
pub async fn execute(
    invocation: &CommandInvocation,
    env: &ExecutionEnvironment,
    platform: &Platform,
) -> Result<()> {
    log::info!(
        "running `{}` in {}",
        invocation.command_line(),
        invocation.dir.display()
    );

    let mut command = base_command(invocation, env, platform);
    command.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| classify_spawn_error(e, invocation))?;

    let stdout = child.stdout.take().ok_or_else(|| {
        BuildError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "child stdout pipe missing",
        ))
    })?;
    let stderr = child.stderr.take().ok_or_else(|| {
        BuildError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "child stderr pipe missing",
        ))
    })?;

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut stdout_closed = false;
    let mut stderr_closed = false;
    let mut steps_seen = 0u64;

    // Merge both streams line-by-line as data arrives on either.
    while !(stdout_closed && stderr_closed) {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_closed => match line {
                Ok(Some(line)) => forward_line(&line, &mut steps_seen),
                Ok(None) => stdout_closed = true,
                Err(e) => {
                    log::warn!("stdout read error: {e}");
                    stdout_closed = true;
                }
            },
            line = stderr_lines.next_line(), if !stderr_closed => match line {
                Ok(Some(line)) => forward_line(&line, &mut steps_seen),
                Ok(None) => stderr_closed = true,
                Err(e) => {
                    log::warn!("stderr read error: {e}");
                    stderr_closed = true;
                }
            },
        }
    }

    let status = child.wait().await?;
    if status.success() {
        log::debug!("`{}` finished successfully", invocation.command_line());
        Ok(())
    } else {
        let code = status.code().unwrap_or(-1);
        log::error!(
            "command `{}` failed with exit code {} (in {})",
            invocation.command_line(),
            code,
            invocation.dir.display()
        );
        Err(BuildError::CommandFailed {
            command: invocation.command_line(),
            dir: invocation.dir.clone(),
            code,
        })
    }
}

/// Run an invocation quietly, capturing stdout. A nonzero exit is *not* an
/// error here: callers use this for existence probes whose "not found" exit
/// code is an expected answer, and classify the code themselves.
pub async fn probe(
    invocation: &CommandInvocation,
    env: &ExecutionEnvironment,
    platform: &Platform,
) -> Result<ProbeOutput> {
    log::debug!(
        "probing `{}` in {}",
        invocation.command_line(),
        invocation.dir.display()
    );

    let mut command = base_command(invocation, env, platform);
    command.stdout(Stdio::piped()).stderr(Stdio::null());

    let output = command
        .output()
        .await
        .map_err(|e| classify_spawn_error(e, invocation))?;

    Ok(ProbeOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
    })
}

/// Convenience: invocation against a working directory with string args.
pub fn invocation(program: &str, args: &[&str], dir: &Path) -> CommandInvocation {
    CommandInvocation::new(program, args.iter().copied(), dir)
}
