use std::{
    ffi::{OsStr, OsString},
    fmt,
    process::Stdio,
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader},
    process::Command,
    time::timeout,
};
use tracing::debug;

/// A program and its arguments, built up the same way as `tokio::process::Command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// The argument following `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .windows(2)
            .find(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_os_str())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Whether the child's stdout/stderr are collected or passed through to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Piped,
    Inherit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// `-1` when the process was terminated by a signal
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Every way a subprocess call can end. Runners return this instead of erroring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed(CommandResult),
    TimedOut { after: Duration },
    SpawnError(String),
}

impl CommandOutcome {
    /// True only for a completed process with exit status 0.
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Completed(result) if result.success())
    }
}

#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, command: &CommandLine, limit: Duration, capture: Capture)
    -> CommandOutcome;

    /// Like [`CommandRunner::run`] with piped output, handing each stdout line
    /// to `on_line` as soon as it is read.
    async fn run_streaming(
        &self,
        command: &CommandLine,
        limit: Duration,
        on_line: &mut dyn FnMut(&str),
    ) -> CommandOutcome;
}

/// Runs commands as real child processes on the tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        command: &CommandLine,
        limit: Duration,
        capture: Capture,
    ) -> CommandOutcome {
        execute(command, limit, capture, &mut |_| {}).await
    }

    async fn run_streaming(
        &self,
        command: &CommandLine,
        limit: Duration,
        on_line: &mut dyn FnMut(&str),
    ) -> CommandOutcome {
        execute(command, limit, Capture::Piped, on_line).await
    }
}

async fn execute(
    command: &CommandLine,
    limit: Duration,
    capture: Capture,
    on_line: &mut dyn FnMut(&str),
) -> CommandOutcome {
    debug!(%command, timeout_secs = limit.as_secs(), "running command");

    let (stdout, stderr) = match capture {
        Capture::Piped => (Stdio::piped(), Stdio::piped()),
        Capture::Inherit => (Stdio::inherit(), Stdio::inherit()),
    };

    let mut child = match Command::new(command.program())
        .args(command.get_args())
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return CommandOutcome::SpawnError(format!(
                "Failed to start {}: {}",
                command.program().to_string_lossy(),
                e
            ));
        }
    };

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let waited = timeout(limit, async {
        let (stdout, stderr) =
            tokio::join!(read_lines(stdout_pipe, on_line), read_all(stderr_pipe));
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, stdout?, stderr?))
    })
    .await;

    match waited {
        Ok(Ok((status, stdout, stderr))) => {
            let exit_status = status.code().unwrap_or(-1);
            debug!(%command, exit_status, "command finished");
            CommandOutcome::Completed(CommandResult {
                exit_status,
                stdout,
                stderr,
            })
        }
        Ok(Err(e)) => CommandOutcome::SpawnError(format!(
            "I/O error while running {}: {}",
            command.program().to_string_lossy(),
            e
        )),
        Err(_) => {
            let _ = child.kill().await;
            debug!(%command, "command timed out");
            CommandOutcome::TimedOut { after: limit }
        }
    }
}

async fn read_lines<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    on_line: &mut dyn FnMut(&str),
) -> std::io::Result<String> {
    let Some(pipe) = pipe else {
        return Ok(String::new());
    };

    let mut reader = BufReader::new(pipe);
    let mut collected = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\r', '\n']));
        collected.push_str(&line);
    }
    Ok(collected)
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<String> {
    let Some(mut pipe) = pipe else {
        return Ok(String::new());
    };

    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
