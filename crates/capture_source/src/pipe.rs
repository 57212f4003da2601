use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use crate::reader::{BoundedLineReader, LineEvent};
use crate::{CaptureError, CaptureSource, Record};

/// Capture backend reading one record per stdout line of a child process.
pub struct PipeSource {
    child: Child,
    reader: BoundedLineReader<ChildStdout>,
    label: String,
    stopped: bool,
    reaped: bool,
}

impl PipeSource {
    /// Spawns `argv` with stdout piped. The first element is the program; a
    /// bare name is resolved through `PATH` by the OS.
    pub fn spawn(argv: &[String]) -> Result<Self, CaptureError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(CaptureError::EmptyCommand);
        };
        if program.is_empty() {
            return Err(CaptureError::EmptyCommand);
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| CaptureError::Spawn {
            binary: PathBuf::from(program),
            source,
        })?;
        let stdout = child.stdout.take().ok_or(CaptureError::MissingStdout)?;

        let label = Path::new(program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone());

        Ok(Self {
            child,
            reader: BoundedLineReader::new(stdout),
            label,
            stopped: false,
            reaped: false,
        })
    }
}

impl CaptureSource for PipeSource {
    async fn next(&mut self) -> Result<Option<Record>, CaptureError> {
        loop {
            match self.reader.next_event().await {
                Ok(Some(LineEvent::Line(payload))) => return Ok(Some(Record::line(payload))),
                Ok(Some(LineEvent::TooLong { observed_bytes })) => {
                    warn!(
                        command = %self.label,
                        observed_bytes,
                        "discarding over-long output line"
                    );
                }
                Ok(None) => {
                    if !self.reaped {
                        self.reaped = true;
                        match self.child.wait().await {
                            Ok(status) => {
                                debug!(command = %self.label, %status, "capture process exited")
                            }
                            Err(error) => {
                                warn!(command = %self.label, %error, "failed to reap capture process")
                            }
                        }
                    }
                    return Ok(None);
                }
                Err(source) if self.stopped => {
                    debug!(command = %self.label, %source, "stdout closed during stop");
                    return Ok(None);
                }
                Err(source) => return Err(CaptureError::Read(source)),
            }
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(error) = self.child.start_kill() {
            debug!(command = %self.label, %error, "capture process already gone");
        }
    }

    fn describe(&self) -> &str {
        &self.label
    }
}
