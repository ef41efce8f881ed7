#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Running programs with captured output and an optional deadline.

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Stdio,
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, BufReader},
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};
use tracing::debug;

/// Errors raised while running a subprocess.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that was being started.
        program: String,
        /// Underlying OS error.
        source:  std::io::Error,
    },
    /// The process outlived its deadline and was killed.
    #[error("process timed out after {limit:?}")]
    TimedOut {
        /// Deadline that was exceeded.
        limit: Duration,
    },
    /// Waiting on the process or reading its pipes failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done when the error happened.
        context: &'static str,
        /// Underlying OS error.
        source:  std::io::Error,
    },
}

/// Sends `SIGKILL` to every process in the group led by `pgid`.
#[cfg(unix)]
fn signal_group(pgid: u32) {
    use nix::{
        errno::Errno,
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL)
        && e != Errno::ESRCH
    {
        debug!("failed to kill process group {pgid}: {e}");
    }
}

/// Process groups are a unix notion; elsewhere only the child is killed.
#[cfg(not(unix))]
fn signal_group(_pgid: u32) {}

/// Drop guard that terminates a spawned child process, and everything it
/// started, if the caller bails out before reaping it.
struct ChildDropGuard {
    /// The spawned child.
    child: Option<Child>,
    /// Process group led by the child.
    group: Option<u32>,
}

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        let group = child.id();
        Self {
            child: Some(child),
            group,
        }
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> Result<&mut Child, ProcessError> {
        self.child.as_mut().ok_or(ProcessError::Io {
            context: "child process already taken from guard",
            source:  std::io::ErrorKind::NotFound.into(),
        })
    }

    /// Kills whatever is left of the child's process group.
    fn kill_group(&mut self) {
        if let Some(pgid) = self.group.take() {
            signal_group(pgid);
        }
    }

    /// Kills the child and its group, then waits for the child so no zombie
    /// is left behind.
    async fn kill(mut self) {
        self.kill_group();
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.kill().await
        {
            debug!("failed to kill timed out child: {e}");
        }
    }

    /// Prevents the guard from killing anything on drop.
    fn disarm(mut self) {
        self.child = None;
        self.group = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        self.kill_group();
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: std::process::ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl Collected {
    /// Stdout decoded lossily as UTF-8.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stderr decoded lossily as UTF-8.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Spawns a task that drains a pipe into memory.
fn drain<R>(pipe: R, context: &'static str) -> JoinHandle<Result<Vec<u8>, ProcessError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|source| ProcessError::Io { context, source })?;
        Ok(buf)
    })
}

/// Awaits a pipe-draining task.
async fn join_drain(
    task: JoinHandle<Result<Vec<u8>, ProcessError>>,
    context: &'static str,
) -> Result<Vec<u8>, ProcessError> {
    task.await.map_err(|e| ProcessError::Io {
        context,
        source: std::io::Error::other(e),
    })?
}

/// Runs a program with stdin closed and collects stdout/stderr.
///
/// The program runs in its own process group. Once it exits, anything it
/// left running is killed so the pipes close. `deadline` bounds the whole
/// run, pipe draining included; when it elapses the group is killed and the
/// child reaped before [`ProcessError::TimedOut`] is returned.
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    cwd: Option<&Path>,
    env: &[(OsString, OsString)],
    deadline: Option<Duration>,
) -> Result<Collected, ProcessError> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    let mut guard = ChildDropGuard::new(child);

    let stdout = guard.child_mut()?.stdout.take().ok_or(ProcessError::Io {
        context: "missing stdout pipe",
        source:  std::io::ErrorKind::BrokenPipe.into(),
    })?;
    let stderr = guard.child_mut()?.stderr.take().ok_or(ProcessError::Io {
        context: "missing stderr pipe",
        source:  std::io::ErrorKind::BrokenPipe.into(),
    })?;

    let out_task = drain(stdout, "failed to read stdout");
    let err_task = drain(stderr, "failed to read stderr");
    let out_abort = out_task.abort_handle();
    let err_abort = err_task.abort_handle();

    let collect = async {
        let status = guard
            .child_mut()?
            .wait()
            .await
            .map_err(|source| ProcessError::Io {
                context: "failed to wait on process",
                source,
            })?;
        // Stray descendants keep the pipes open.
        guard.kill_group();
        let stdout = join_drain(out_task, "stdout task join error").await?;
        let stderr = join_drain(err_task, "stderr task join error").await?;
        Ok::<Collected, ProcessError>(Collected {
            status,
            stdout,
            stderr,
        })
    };

    let finished = match deadline {
        Some(limit) => timeout(limit, collect).await.ok(),
        None => Some(collect.await),
    };

    match finished {
        Some(Ok(collected)) => {
            guard.disarm();
            Ok(collected)
        }
        Some(Err(e)) => Err(e),
        None => {
            out_abort.abort();
            err_abort.abort();
            guard.kill().await;
            Err(ProcessError::TimedOut {
                limit: deadline.unwrap_or_default(),
            })
        }
    }
}
