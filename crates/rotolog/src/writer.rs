use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use capture_source::Record;
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::format::{RecordEncoder, RecordFormat};
use crate::name::stamp_name;
use crate::retention::RetentionTrigger;
use crate::RotationPolicy;

const DEFAULT_CREATE_RETRY_COOLDOWN: Duration = Duration::from_secs(5);

/// Counters reported when the writer closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub records_written: u64,
    /// Records lost to write failures or a broken output directory. Data
    /// loss is observable here and in the log, never silent.
    pub records_dropped: u64,
    pub files_completed: u64,
}

struct ActiveFile {
    path: PathBuf,
    encoder: Box<dyn RecordEncoder + Send>,
    record_count: u64,
}

/// Consumes records in order and writes them into rotated, timestamp-named
/// files.
///
/// The writer is a two-state machine: Idle (no active file) and Writing. The
/// first record after start or a rotation opens a new file; every record is
/// flushed to stable storage as soon as it is written; reaching the rotation
/// quota closes the file. Opening a file also fires the retention trigger,
/// with the new file exempt from deletion.
///
/// Failures never stall the pipeline: a write error completes the current
/// file at its current count and the next record starts a new one; a
/// file-create failure enters a degraded state that drops records (counted)
/// and retries creation only after a cooldown, so a permanently broken
/// directory costs one warning instead of one failed syscall per record.
pub struct RotatingWriter {
    dir: PathBuf,
    source_name: String,
    format: Box<dyn RecordFormat>,
    rotation: RotationPolicy,
    retention: RetentionTrigger,
    active: Option<ActiveFile>,
    last_stamp: Option<DateTime<Local>>,
    degraded_until: Option<Instant>,
    create_retry_cooldown: Duration,
    stats: WriterStats,
}

impl RotatingWriter {
    pub fn new(
        dir: PathBuf,
        source_name: String,
        format: Box<dyn RecordFormat>,
        rotation: RotationPolicy,
        retention: RetentionTrigger,
    ) -> Self {
        Self {
            dir,
            source_name,
            format,
            rotation,
            retention,
            active: None,
            last_stamp: None,
            degraded_until: None,
            create_retry_cooldown: DEFAULT_CREATE_RETRY_COOLDOWN,
            stats: WriterStats::default(),
        }
    }

    /// Writes one record. Errors are absorbed here: they are logged and
    /// reflected in the counters, and the writer keeps accepting records.
    pub fn append(&mut self, record: &Record) {
        if self.active.is_none() && !self.open_next_file() {
            self.stats.records_dropped += 1;
            return;
        }
        let Some(active) = self.active.as_mut() else {
            self.stats.records_dropped += 1;
            return;
        };

        match active
            .encoder
            .append(record)
            .and_then(|()| active.encoder.sync())
        {
            Ok(()) => {
                active.record_count += 1;
                let full = active.record_count >= self.rotation.records_per_file();
                self.stats.records_written += 1;
                if full {
                    self.finish_active("quota reached");
                }
            }
            Err(error) => {
                let path = active.path.clone();
                self.stats.records_dropped += 1;
                warn!(path = %path.display(), %error, "write failed; rotating early");
                self.finish_active("write error");
            }
        }
    }

    /// Shutdown transition: flushes and closes the active file regardless of
    /// its record count and returns the final counters.
    pub fn close(&mut self) -> WriterStats {
        if self.active.is_some() {
            self.finish_active("shutdown");
        }
        self.stats
    }

    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Path of the file currently being written, if any.
    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|active| active.path.as_path())
    }

    fn open_next_file(&mut self) -> bool {
        if let Some(until) = self.degraded_until {
            if Instant::now() < until {
                return false;
            }
        }

        let stamp = self.next_stamp();
        let file_name = stamp_name(&self.source_name, stamp, self.format.extension());
        let path = self.dir.join(file_name);

        let opened = File::options()
            .write(true)
            .create_new(true)
            .open(&path)
            .and_then(|file| self.format.open(file));
        match opened {
            Ok(encoder) => {
                debug!(path = %path.display(), "opened capture file");
                self.degraded_until = None;
                self.retention.spawn_enforce(path.clone());
                self.active = Some(ActiveFile {
                    path,
                    encoder,
                    record_count: 0,
                });
                true
            }
            Err(error) => {
                if self.degraded_until.is_none() {
                    warn!(
                        dir = %self.dir.display(),
                        %error,
                        "cannot create capture file; dropping records until the directory recovers"
                    );
                } else {
                    debug!(dir = %self.dir.display(), %error, "capture directory still unavailable");
                }
                self.degraded_until = Some(Instant::now() + self.create_retry_cooldown);
                false
            }
        }
    }

    fn finish_active(&mut self, cause: &'static str) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if let Err(error) = active.encoder.sync() {
            warn!(path = %active.path.display(), %error, "final flush failed");
        }
        self.stats.files_completed += 1;
        info!(
            path = %active.path.display(),
            records = active.record_count,
            cause,
            "completed capture file"
        );
        // Dropping the encoder closes the file; the file is no longer exempt
        // from retention.
    }

    fn next_stamp(&mut self) -> DateTime<Local> {
        let mut stamp = Local::now();
        if let Some(last) = self.last_stamp {
            // Same-second rotations must neither collide nor regress.
            if stamp.timestamp() <= last.timestamp() {
                stamp = last + chrono::Duration::seconds(1);
            }
        }
        self.last_stamp = Some(stamp);
        stamp
    }
}
