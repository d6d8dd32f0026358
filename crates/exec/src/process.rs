//! Process spawning and concurrent stream draining.

use std::{
    ffi::OsString,
    io::Write as _,
    path::{Path, PathBuf},
    process::Stdio,
};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use workspace_utils::text::TextDecoder;

use crate::progress::{ProgressSender, parse_progress_line};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("executable not found or not runnable: {0}")]
    NotAvailable(String),
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write to child stdin: {0}")]
    Stdin(std::io::Error),
    #[error("i/o error on process streams: {0}")]
    Io(#[from] std::io::Error),
}

/// The immutable result of one finished invocation: the sole handoff point
/// from the process layer to the parsers and the error classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Exit code, or -1 when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// What to do with a running process when its cancellation token fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelMode {
    /// Terminate the process immediately.
    #[default]
    Kill,
    /// Signal only; let the process exit on its own.
    AllowToFinish,
}

/// Spawns one external process per invocation with redirected stdio.
///
/// Both output streams are drained concurrently; a full pipe buffer on one
/// stream can never block the producer from writing the other. Cancellation
/// is cooperative and still waits for the drains, so output buffered before
/// the cancel is never lost.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: PathBuf,
    decoder: TextDecoder,
}

impl CommandRunner {
    pub fn new(program: PathBuf, decoder: TextDecoder) -> Self {
        Self { program, decoder }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn decoder(&self) -> TextDecoder {
        self.decoder
    }

    /// Synchronous invocation: blocks the calling thread until exit.
    pub fn run(
        &self,
        workdir: Option<&Path>,
        argv: &[OsString],
        envs: &[(OsString, OsString)],
        stdin: Option<&[u8]>,
    ) -> Result<ExecOutcome, ExecError> {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(argv);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::trace!(program = %self.program.display(), ?argv, ?workdir, "spawning process");

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if let Some(input) = stdin
            && let Some(mut child_stdin) = child.stdin.take()
        {
            child_stdin.write_all(input).map_err(ExecError::Stdin)?;
        }

        // wait_with_output drains both pipes concurrently before reaping.
        let out = child.wait_with_output()?;
        Ok(self.outcome(out.status.code().unwrap_or(-1), &out.stdout, &out.stderr))
    }

    /// Asynchronous invocation with optional progress forwarding and
    /// cooperative cancellation.
    ///
    /// Each stderr line is fed through the progress decoder as it arrives.
    /// When `cancel` fires, `mode` decides between killing the process and
    /// letting it finish; either way both drain tasks run to EOF first.
    pub async fn run_streaming(
        &self,
        workdir: Option<&Path>,
        argv: &[OsString],
        envs: &[(OsString, OsString)],
        progress: Option<ProgressSender>,
        cancel: Option<CancellationToken>,
        mode: CancelMode,
    ) -> Result<ExecOutcome, ExecError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(argv);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::trace!(program = %self.program.display(), ?argv, ?workdir, "spawning process (async)");

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("child stderr was not captured"))?;

        let stdout_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await.map(|_| buf)
        });

        let decoder = self.decoder;
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut collected = Vec::new();
            let mut line = Vec::new();
            loop {
                line.clear();
                let n = reader.read_until(b'\n', &mut line).await?;
                if n == 0 {
                    break;
                }
                collected.extend_from_slice(&line);
                if let Some(tx) = &progress {
                    let text = decoder.decode(&line);
                    // A closed receiver just means nobody is listening anymore.
                    let _ = tx.send(parse_progress_line(text.trim_end_matches(['\r', '\n'])));
                }
            }
            Ok::<_, std::io::Error>(collected)
        });

        let status = match cancel {
            Some(token) => {
                tokio::select! {
                    status = child.wait() => status?,
                    _ = token.cancelled() => {
                        if mode == CancelMode::Kill {
                            tracing::debug!(program = %self.program.display(), "cancellation requested, killing process");
                            let _ = child.start_kill();
                        } else {
                            tracing::debug!(program = %self.program.display(), "cancellation requested, allowing process to finish");
                        }
                        child.wait().await?
                    }
                }
            }
            None => child.wait().await?,
        };

        // Both drains run to EOF even after a kill, so already-buffered
        // output is consumed before the outcome is assembled.
        let stdout_bytes = stdout_task.await.map_err(std::io::Error::other)??;
        let stderr_bytes = stderr_task.await.map_err(std::io::Error::other)??;

        Ok(self.outcome(
            status.code().unwrap_or(-1),
            &stdout_bytes,
            &stderr_bytes,
        ))
    }

    fn outcome(&self, exit_code: i32, stdout: &[u8], stderr: &[u8]) -> ExecOutcome {
        ExecOutcome {
            exit_code,
            stdout: self.decoder.decode(stdout),
            stderr: self.decoder.decode(stderr),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::progress::ProgressEvent;

    fn sh() -> CommandRunner {
        CommandRunner::new(PathBuf::from("/bin/sh"), TextDecoder::default())
    }

    fn argv(script: &str) -> Vec<OsString> {
        vec![OsString::from("-c"), OsString::from(script)]
    }

    #[test]
    fn sync_captures_both_streams_and_exit_code() {
        let out = sh()
            .run(None, &argv("printf out; printf err 1>&2; exit 3"), &[], None)
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout, "out");
        assert_eq!(out.stderr, "err");
        assert!(!out.success());
    }

    #[test]
    fn sync_pipes_stdin() {
        let out = sh()
            .run(None, &argv("cat"), &[], Some(b"through"))
            .unwrap();
        assert_eq!(out.stdout, "through");
    }

    #[test]
    fn spawn_failure_is_typed() {
        let runner = CommandRunner::new(
            PathBuf::from("/definitely/not/a/binary"),
            TextDecoder::default(),
        );
        assert!(matches!(
            runner.run(None, &[], &[], None),
            Err(ExecError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn async_forwards_progress_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let out = sh()
            .run_streaming(
                None,
                &argv("printf 'Counting objects:  50%% (1/2)\\n' 1>&2"),
                &[],
                Some(tx),
                None,
                CancelMode::Kill,
            )
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::Range {
                stage: "Counting objects".to_string(),
                current: 1,
                max: 2,
            })
        );
    }

    #[tokio::test]
    async fn kill_keeps_buffered_output() {
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        });
        // `exec` keeps the sleep in the spawned pid so the kill reaches it
        // and the pipes close immediately.
        let out = sh()
            .run_streaming(
                None,
                &argv("echo early; exec sleep 30"),
                &[],
                None,
                Some(token),
                CancelMode::Kill,
            )
            .await
            .unwrap();
        assert_eq!(out.stdout, "early\n");
        assert_ne!(out.exit_code, 0);
    }

    #[tokio::test]
    async fn allow_to_finish_waits_for_exit() {
        let token = CancellationToken::new();
        token.cancel();
        let out = sh()
            .run_streaming(
                None,
                &argv("sleep 0.2; echo done"),
                &[],
                None,
                Some(token),
                CancelMode::AllowToFinish,
            )
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "done\n");
    }
}
