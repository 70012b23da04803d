use std::fmt::Display;
use std::path::Path;
use std::process::Stdio;
use std::{ffi::OsStr, process::Output};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as BaseCommand;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn command: {command}")]
    Spawn {
        command: String,
        #[source]
        error: tokio::io::Error,
    },

    #[error("failed to write to stdin of command: {command}")]
    Stdin {
        command: String,
        #[source]
        error: tokio::io::Error,
    },

    #[error("command failed: {command}\n{stderr}")]
    Failure { command: String, stderr: String },
}

/// Thin wrapper over a tokio subprocess that renders as the command line it
/// runs and folds a non-zero exit into an error carrying stderr.
#[derive(Debug)]
pub struct Command {
    cmd: BaseCommand,
    stdout: bool,
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cmd = self.cmd.as_std();
        let program = cmd.get_program().to_string_lossy();
        let args = cmd
            .get_args()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        if args.is_empty() {
            write!(f, "{program}")
        } else {
            write!(f, "{program} {args}")
        }
    }
}

impl Command {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            cmd: BaseCommand::new(program),
            stdout: false,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.cmd.arg(arg);
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.cmd.args(args);
        self
    }

    pub fn env<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.cmd.env(key, value);
        self
    }

    pub fn current_dir<P: AsRef<Path>>(&mut self, dir: P) -> &mut Command {
        self.cmd.current_dir(dir);
        self
    }

    /// Inherit stdout instead of capturing it (long builds are nicer to
    /// watch live).
    pub fn stdout(&mut self, stdout: bool) -> &mut Command {
        self.stdout = stdout;
        self
    }

    pub async fn output(&mut self) -> Result<Output, CommandError> {
        self.cmd
            .stdin(Stdio::null())
            .stdout(if self.stdout {
                Stdio::inherit()
            } else {
                Stdio::piped()
            })
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|error| CommandError::Spawn {
                command: self.to_string(),
                error,
            })
    }

    pub async fn run(&mut self) -> Result<Output, CommandError> {
        self.output().await.and_then(|out| {
            if out.status.success() {
                Ok(out)
            } else {
                Err(CommandError::Failure {
                    command: self.to_string(),
                    stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                })
            }
        })
    }

    /// Run with the given bytes fed over stdin. Used for secrets that must
    /// not appear in the argument list.
    pub async fn run_with_input(&mut self, input: &[u8]) -> Result<Output, CommandError> {
        let mut child = self
            .cmd
            .stdin(Stdio::piped())
            .stdout(if self.stdout {
                Stdio::inherit()
            } else {
                Stdio::piped()
            })
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| CommandError::Spawn {
                command: self.to_string(),
                error,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .await
                .map_err(|error| CommandError::Stdin {
                    command: self.to_string(),
                    error,
                })?;
            // Close stdin so the child sees EOF.
            drop(stdin);
        }

        let out = child
            .wait_with_output()
            .await
            .map_err(|error| CommandError::Spawn {
                command: self.to_string(),
                error,
            })?;

        if out.status.success() {
            Ok(out)
        } else {
            Err(CommandError::Failure {
                command: self.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            })
        }
    }
}
