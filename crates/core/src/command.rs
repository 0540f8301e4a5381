use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::args;
use crate::config::LoggingOptions;
use crate::error::{HlsError, Result};
use crate::log::{ProcessLog, RotatingLog};

/// A ready-to-run transcoder invocation.
///
/// Produced by [`CommandBuilder::build_invocation`](crate::CommandBuilder::build_invocation).
/// The caller owns it and decides when (and whether) to launch it; process
/// supervision is not handled here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    program: PathBuf,
    args: Vec<String>,
    output_dir: PathBuf,
}

impl CommandDescriptor {
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            output_dir: output_dir.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the HLS playlist the command writes.
    pub fn playlist_path(&self) -> PathBuf {
        PathBuf::from(args::playlist_path(&self.output_dir))
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }

    /// Build a [`Command`] for the executable and arguments.
    ///
    /// Stdio is left at the standard defaults; use [`spawn_with_log`](Self::spawn_with_log)
    /// to route output into a process log.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Launch the transcoder with inherited stdio.
    pub fn spawn(&self) -> Result<Child> {
        self.launch(self.command())
    }

    /// Launch the transcoder, writing its stdout and stderr to the rotating
    /// log `<logging.directory>/<name>.log`. Output is discarded when logging
    /// is disabled.
    ///
    /// Output is copied into the log by one thread per stream; they finish
    /// when the child closes its pipes, and [`LoggedChild::wait`] joins them.
    pub fn spawn_with_log(&self, logging: &LoggingOptions, name: &str) -> Result<LoggedChild> {
        let mut cmd = self.command();
        cmd.stdin(Stdio::null());
        let Some(log) = ProcessLog::open(logging, name)? else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
            return Ok(LoggedChild {
                child: self.launch(cmd)?,
                pumps: Vec::new(),
            });
        };

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = self.launch(cmd)?;
        let log = Arc::new(Mutex::new(log));
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(pump(stdout, log.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(pump(stderr, log));
        }
        Ok(LoggedChild { child, pumps })
    }

    fn launch(&self, mut cmd: Command) -> Result<Child> {
        let child = cmd.spawn().map_err(|source| HlsError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        tracing::info!(
            program = %self.program.display(),
            pid = child.id(),
            output = %self.output_dir.display(),
            "transcoder started"
        );
        Ok(child)
    }
}

/// Copy everything `reader` produces into the shared log.
fn pump(mut reader: impl Read + Send + 'static, log: Arc<Mutex<RotatingLog>>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read transcoder output");
                    break;
                }
            };
            let mut log = log.lock();
            if let Err(e) = log.write_all(&buf[..n]).and_then(|()| log.flush()) {
                tracing::warn!(
                    log = %log.path().display(),
                    error = %e,
                    "failed to write process log"
                );
                break;
            }
        }
    })
}

/// A transcoder launched by [`CommandDescriptor::spawn_with_log`].
#[derive(Debug)]
pub struct LoggedChild {
    child: Child,
    pumps: Vec<JoinHandle<()>>,
}

impl LoggedChild {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The underlying process, e.g. to poll it with `try_wait`.
    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    pub fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    /// Wait for the transcoder to exit and for its output to reach the log.
    pub fn wait(mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait()?;
        for pump in self.pumps.drain(..) {
            if pump.join().is_err() {
                tracing::warn!(pid = self.child.id(), "process log writer panicked");
            }
        }
        Ok(status)
    }
}

/// Shell-safe rendering of one argument.
///
/// Arguments made only of characters no POSIX shell treats specially are
/// left bare; everything else is single-quoted.
fn shell_quote(arg: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c);
    if !arg.is_empty() && arg.chars().all(safe) {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

impl fmt::Display for CommandDescriptor {
    /// Renders the command so it can be pasted into a POSIX shell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> CommandDescriptor {
        CommandDescriptor::new(
            "ffmpeg",
            vec![
                "-i".to_string(),
                "rtsp://cam/live stream".to_string(),
                "/tmp/out/index.m3u8".to_string(),
            ],
            "/tmp/out",
        )
    }

    #[test]
    fn command_carries_program_and_args() {
        let desc = descriptor();
        let cmd = desc.command();
        assert_eq!(cmd.get_program(), "ffmpeg");
        let args: Vec<_> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, desc.args());
    }

    #[test]
    fn display_quotes_whitespace() {
        assert_eq!(
            descriptor().to_string(),
            "ffmpeg -i 'rtsp://cam/live stream' /tmp/out/index.m3u8"
        );
    }

    #[test]
    fn display_quotes_shell_metacharacters() {
        let desc = CommandDescriptor::new(
            "ffmpeg",
            vec![
                "-i".to_string(),
                "rtsp://cam/Streaming?channel=1&subtype=0".to_string(),
                "-x264opts".to_string(),
                "keyint=30:no-scenecut".to_string(),
                "/tmp/o/%d.ts".to_string(),
                "it's;$(x)|`y`".to_string(),
                String::new(),
            ],
            "/tmp/o",
        );
        assert_eq!(
            desc.to_string(),
            "ffmpeg -i 'rtsp://cam/Streaming?channel=1&subtype=0' -x264opts \
             keyint=30:no-scenecut /tmp/o/%d.ts 'it'\\''s;$(x)|`y`' ''"
        );
    }

    #[cfg(unix)]
    #[test]
    fn display_round_trips_through_sh() {
        let desc = CommandDescriptor::new(
            "printf",
            vec![
                "%s\\n".to_string(),
                "rtsp://cam/Streaming?channel=1&subtype=0".to_string(),
                "a b'c".to_string(),
            ],
            "/tmp/o",
        );
        let output = Command::new("sh")
            .arg("-c")
            .arg(desc.to_string())
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            "rtsp://cam/Streaming?channel=1&subtype=0\na b'c\n"
        );
    }

    #[test]
    fn playlist_path_under_output_dir() {
        assert_eq!(
            descriptor().playlist_path(),
            PathBuf::from("/tmp/out/index.m3u8")
        );
    }

    #[test]
    fn spawn_missing_executable_reports_program() {
        let desc = CommandDescriptor::new("/nonexistent/transcoder-bin", Vec::new(), "/tmp/out");
        match desc.spawn() {
            Err(HlsError::Spawn { program, .. }) => {
                assert_eq!(program, PathBuf::from("/nonexistent/transcoder-bin"));
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }
}
