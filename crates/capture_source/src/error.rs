use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or driving a capture backend.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("command line is empty")]
    EmptyCommand,
    #[error("failed to spawn capture process (binary={binary:?}): {source}")]
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },
    #[error("internal error: missing stdout pipe")]
    MissingStdout,
    #[error("failed reading capture stream: {0}")]
    Read(std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
    #[cfg(feature = "live-capture")]
    #[error("capture device {0:?} not found")]
    DeviceNotFound(String),
    #[cfg(feature = "live-capture")]
    #[error("unable to open capture device {device:?}: {source}")]
    DeviceOpenFailed {
        device: String,
        source: pcap::Error,
    },
    #[cfg(feature = "live-capture")]
    #[error("capture filter {filter:?} rejected: {source}")]
    FilterRejected {
        filter: String,
        source: pcap::Error,
    },
}
