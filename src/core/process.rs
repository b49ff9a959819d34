//! Child process streaming
//!
//! Spawns a command with piped stdout/stderr and pumps each stream through
//! its own reader thread. With a prefix configured, every stream gets a
//! [`LineBuffer`] and each rendered line is labeled before it reaches the
//! sink; otherwise bytes pass through untouched.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::line_buffer::{FlushTimeout, LineBuffer};
use crate::ui::{ColorCycler, LinePrefixer};

const READ_CHUNK: usize = 4096;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to stream child {stream}: {source}")]
    Stream {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Reader thread for child {0} panicked")]
    ReaderPanicked(&'static str),

    #[error("Failed to wait for child: {0}")]
    Wait(#[source] io::Error),

    #[error("Process exited with {}", describe_exit(.code))]
    NonZeroExit {
        code: Option<i32>,
        output: Box<SpawnOutput>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code: {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Where the child's output ends up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    /// Forward to this process's stdout/stderr as it arrives
    #[default]
    Inherit,
    /// Accumulate and return in [`SpawnOutput`]
    Collect,
}

#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Label for every line; `None` streams raw bytes
    pub prefix: Option<String>,
    pub stdio: StdioMode,
    pub flush_timeout: FlushTimeout,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

/// Result of a finished child
#[derive(Debug, Clone)]
pub struct SpawnOutput {
    pub status: Option<ExitStatus>,
    /// Collected stdout, `None` when inherited
    pub stdout: Option<String>,
    /// Collected stderr, `None` when inherited
    pub stderr: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn name(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Destination of one child stream
#[derive(Debug, Clone)]
enum Sink {
    Inherit(StreamKind),
    Collect(Arc<Mutex<Vec<u8>>>),
}

impl Sink {
    fn new(mode: StdioMode, kind: StreamKind) -> Self {
        match mode {
            StdioMode::Inherit => Sink::Inherit(kind),
            StdioMode::Collect => Sink::Collect(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Sink::Inherit(StreamKind::Stdout) => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            Sink::Inherit(StreamKind::Stderr) => io::stderr().lock().write_all(bytes),
            Sink::Collect(buffer) => {
                buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    fn into_collected(self) -> Option<String> {
        match self {
            Sink::Inherit(_) => None,
            Sink::Collect(buffer) => {
                let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}

/// Run `command` to completion, streaming its output.
///
/// A label color is drawn from `palette` only when a prefix is set; stdout
/// and stderr of one child share it.
pub fn spawn_streaming(
    command: &str,
    args: &[String],
    options: &SpawnOptions,
    palette: &mut ColorCycler,
) -> Result<SpawnOutput> {
    let prefixer = options
        .prefix
        .as_ref()
        .map(|label| LinePrefixer::new(label.clone(), palette.next_color()));

    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .envs(options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some(ref cwd) = options.cwd {
        cmd.current_dir(cwd);
    }

    tracing::info!("Spawning {} {:?}", command, args);
    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        command: command.to_string(),
        source,
    })?;

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(pump(stdout, StreamKind::Stdout, options, prefixer.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(pump(stderr, StreamKind::Stderr, options, prefixer));
    }

    let mut stdout = None;
    let mut stderr = None;
    let mut first_error = None;
    for (kind, reader) in readers {
        let result = reader
            .join()
            .unwrap_or_else(|_| Err(ProcessError::ReaderPanicked(kind.name())));
        match (kind, result) {
            (StreamKind::Stdout, Ok(collected)) => stdout = collected,
            (StreamKind::Stderr, Ok(collected)) => stderr = collected,
            (_, Err(e)) => {
                tracing::error!("{}", e);
                first_error.get_or_insert(e);
            }
        }
    }

    let status = child.wait().map_err(ProcessError::Wait)?;
    tracing::info!("{} exited: {}", command, status);

    if let Some(e) = first_error {
        return Err(e);
    }

    let output = SpawnOutput {
        status: Some(status),
        stdout,
        stderr,
    };
    if !status.success() {
        return Err(ProcessError::NonZeroExit {
            code: status.code(),
            output: Box::new(output),
        });
    }
    Ok(output)
}

/// Start a reader thread that copies `source` into its sink
fn pump<R>(
    mut source: R,
    kind: StreamKind,
    options: &SpawnOptions,
    prefixer: Option<LinePrefixer>,
) -> (StreamKind, JoinHandle<Result<Option<String>>>)
where
    R: Read + Send + 'static,
{
    let sink = Sink::new(options.stdio, kind);
    let timeout = options.flush_timeout;

    let handle = thread::spawn(move || -> Result<Option<String>> {
        let mut lines = prefixer.map(|prefixer| {
            let sink = sink.clone();
            LineBuffer::new(
                move |line| {
                    if let Err(e) = sink.write_all(prefixer.decorate(&line).as_bytes()) {
                        tracing::warn!("Dropped line from child {}: {}", kind.name(), e);
                    }
                },
                timeout,
            )
        });

        let mut buffer = vec![0u8; READ_CHUNK];
        loop {
            match source.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => match lines.as_mut() {
                    Some(lines) => lines.write(&buffer[..n]),
                    None => sink.write_all(&buffer[..n]).map_err(|source| {
                        ProcessError::Stream {
                            stream: kind.name(),
                            source,
                        }
                    })?,
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(ProcessError::Stream {
                        stream: kind.name(),
                        source,
                    })
                }
            }
        }

        if let Some(mut lines) = lines {
            lines.flush();
            lines.dispose();
        }
        Ok(sink.into_collected())
    });

    (kind, handle)
}
