// src/system/executor.rs

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Failure to run an external program.
#[derive(Error, Debug)]
pub enum ExternalToolError {
    /// The program could not be started.
    #[error("Command '{command}' could not be executed: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The program ran and exited unsuccessfully.
    #[error("Command '{command}' exited with a non-zero error code ({}).", exit_code_label(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// Stdout was not UTF-8.
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8 {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Runs an external program to completion and hands back its standard output.
///
/// Implementations never retry: tool invocations are not assumed to be safe to repeat.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs `program` with `args` in `cwd`. A non-zero exit is an error.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
    ) -> Result<String, ExternalToolError>;
}

/// Spawns real processes through `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// A runner that spawns real processes.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    /// Executes a command and captures its standard output.
    /// Stderr is captured too and only surfaced through the log when the command fails.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
    ) -> Result<String, ExternalToolError> {
        let command_line = render_command_line(program, args);
        let clean_cwd = dunce::simplified(cwd);
        log::debug!("Running '{}' in '{}'", command_line, clean_cwd.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(clean_cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                log::error!("Failed to spawn '{}': {}", command_line, e);
                ExternalToolError::Spawn {
                    command: command_line.clone(),
                    source: e,
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            log::error!("'{}' failed:\n{}", command_line, stderr.trim_end());
            return Err(ExternalToolError::NonZeroExit {
                command: command_line,
                code: output.status.code(),
                stderr,
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ExternalToolError::InvalidUtf8 {
            command: command_line,
            source: e,
        })
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "terminated by signal".to_string(),
    }
}

fn render_command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
