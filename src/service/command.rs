//! Subprocess execution with captured output

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Captured output of a finished process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Executable not found: {program}")]
    NotFound { program: String },

    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` exited with code {code:?}")]
    Failed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// A program invocation: argv plus optional stdin
#[derive(Debug, Clone)]
pub struct CommandSpec<'a> {
    program: &'a str,
    args: Vec<String>,
    stdin: Option<String>,
}

impl<'a> CommandSpec<'a> {
    pub fn new(program: &'a str) -> Self {
        Self {
            program,
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Printable command line (stdin contents are never included)
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion; a non-zero exit status is an error
    pub async fn run(&self) -> Result<CommandOutput, CommandError> {
        let command_line = self.display();
        let start_time = std::time::Instant::now();

        let mut command = Command::new(self.program);
        command
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::NotFound {
                program: self.program.to_string(),
            },
            _ => CommandError::Spawn {
                command: command_line.clone(),
                source: e,
            },
        })?;

        if let (Some(input), Some(mut pipe)) = (&self.stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| CommandError::Spawn {
                    command: command_line.clone(),
                    source: e,
                })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CommandError::Spawn {
                command: command_line.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        tracing::debug!(
            command = %command_line,
            stderr_bytes = output.stderr.len(),
            code = ?output.status.code(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "Command finished"
        );

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: command_line,
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(CommandOutput { stdout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_omits_stdin() {
        let spec = CommandSpec::new("docker")
            .arg("login")
            .arg("--password-stdin")
            .stdin("secret");
        assert_eq!(spec.display(), "docker login --password-stdin");
    }

    #[tokio::test]
    async fn test_missing_program_is_not_found() {
        let err = CommandSpec::new("definitely-not-a-real-program-4711")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_stdin() {
        let output = CommandSpec::new("cat").stdin("hello").run().await.unwrap();
        assert_eq!(output.stdout, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let err = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo out; echo err >&2; exit 3")
            .run()
            .await
            .unwrap_err();
        match err {
            CommandError::Failed {
                code,
                stdout,
                stderr,
                ..
            } => {
                assert_eq!(code, Some(3));
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "err");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
