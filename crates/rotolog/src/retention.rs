use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::RetentionPolicy;

/// Errors from a retention sweep. All of these are best-effort territory:
/// the caller logs them and ingestion continues.
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("failed to scan {dir:?}: {source}")]
    Scan {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove {path:?}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What one `enforce` invocation did.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Directory within the bound; nothing to do.
    UnderLimit { total_bytes: u64 },
    /// Over the bound, but the oldest file is the active one; never deleted.
    ActiveIsOldest { total_bytes: u64 },
    /// The oldest non-active file was deleted.
    Removed {
        path: PathBuf,
        bytes: u64,
        total_bytes: u64,
    },
    /// The chosen file vanished before deletion; treated as success.
    TargetVanished { path: PathBuf },
}

/// Bounds the directory size by at most one deletion.
///
/// Scans `dir` non-recursively and sums regular-file sizes. If the total
/// exceeds `max_bytes`, the file with the earliest modification time among
/// all files is the candidate; if that is `active`, nothing is deleted.
/// Deleting one candidate per invocation bounds eviction work per rotation;
/// the directory converges downward over successive rotations rather than in
/// one pass.
pub fn enforce(
    dir: &Path,
    max_bytes: u64,
    active: Option<&Path>,
) -> Result<Outcome, RetentionError> {
    let scan_err = |source| RetentionError::Scan {
        dir: dir.to_path_buf(),
        source,
    };

    let mut total_bytes: u64 = 0;
    let mut oldest: Option<(PathBuf, SystemTime, u64)> = None;

    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            // Vanished between listing and stat: skip it.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => return Err(scan_err(source)),
        };
        if !metadata.is_file() {
            continue;
        }
        total_bytes += metadata.len();
        let modified = metadata.modified().map_err(scan_err)?;
        let is_older = oldest
            .as_ref()
            .map_or(true, |(_, current, _)| modified < *current);
        if is_older {
            oldest = Some((entry.path(), modified, metadata.len()));
        }
    }

    if total_bytes <= max_bytes {
        return Ok(Outcome::UnderLimit { total_bytes });
    }

    let Some((path, _, bytes)) = oldest else {
        return Ok(Outcome::UnderLimit { total_bytes });
    };

    if active.is_some_and(|active| active == path) {
        return Ok(Outcome::ActiveIsOldest { total_bytes });
    }

    match fs::remove_file(&path) {
        Ok(()) => Ok(Outcome::Removed {
            path,
            bytes,
            total_bytes,
        }),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            Ok(Outcome::TargetVanished { path })
        }
        Err(source) => Err(RetentionError::Remove { path, source }),
    }
}

/// Spawns retention sweeps as detached tasks, at most one in flight.
///
/// Rotations can outpace sweeps; a skipped trigger is fine because retention
/// is best-effort and the next rotation fires again.
#[derive(Debug, Clone)]
pub struct RetentionTrigger {
    dir: PathBuf,
    policy: RetentionPolicy,
    in_flight: Arc<AtomicBool>,
}

impl RetentionTrigger {
    pub fn new(dir: PathBuf, policy: RetentionPolicy) -> Self {
        Self {
            dir,
            policy,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fire-and-forget sweep with `active` exempt from deletion. The outcome
    /// is observed only through logging, never by the writer.
    pub fn spawn_enforce(&self, active: PathBuf) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("retention sweep already in flight; skipping");
            return;
        }

        let dir = self.dir.clone();
        let max_bytes = self.policy.max_dir_bytes();
        let in_flight = self.in_flight.clone();
        tokio::spawn(async move {
            let outcome =
                tokio::task::spawn_blocking(move || enforce(&dir, max_bytes, Some(&active))).await;
            match outcome {
                Ok(Ok(Outcome::UnderLimit { total_bytes })) => {
                    debug!(total_bytes, "retention: directory within bound");
                }
                Ok(Ok(Outcome::ActiveIsOldest { total_bytes })) => {
                    debug!(total_bytes, "retention: oldest file is active; skipping");
                }
                Ok(Ok(Outcome::Removed {
                    path,
                    bytes,
                    total_bytes,
                })) => {
                    info!(path = %path.display(), bytes, total_bytes, "retention: removed oldest file");
                }
                Ok(Ok(Outcome::TargetVanished { path })) => {
                    debug!(path = %path.display(), "retention: target vanished before deletion");
                }
                Ok(Err(error)) => warn!(%error, "retention sweep failed"),
                Err(error) => warn!(%error, "retention task aborted"),
            }
            in_flight.store(false, Ordering::Release);
        });
    }
}
