//! Session wiring: capture driver → bounded channel → writer driver.
//!
//! Two tasks run for the life of a session. The capture driver owns the
//! backend and produces into the channel; the writer driver owns the
//! rotating writer and all filesystem writes. The channel is the only shared
//! structure between them and the sole synchronization point; dropping the
//! sender is the end-of-stream sentinel, so the writer driver blocks on
//! `recv` instead of polling a flag.

use capture_source::{CaptureSource, Record};
use rotolog::{RotatingWriter, WriterStats};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

/// Queue depth between the capture driver and the writer driver: deep enough
/// to absorb write-latency jitter. The producer blocks when the queue is
/// full; records are never dropped to keep up with a slow disk.
pub const CHANNEL_CAPACITY: usize = 100;

/// Aggregate counters reported when a session drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Records handed from the capture backend to the writer.
    pub records_forwarded: u64,
    /// True when the capture backend ended with a terminal error rather than
    /// end-of-stream.
    pub capture_failed: bool,
    pub writer: WriterStats,
}

/// Runs one capture session to completion.
///
/// The shutdown watch flipping (or its sender dropping) makes the capture
/// driver call `stop()` on the backend and drain it to end-of-stream; the
/// closing channel then lets the writer driver close the active file. Both
/// drivers are joined before returning, so the backend's resources are
/// released and the last file is flushed and closed before the caller exits.
pub async fn run<S>(
    source: S,
    writer: RotatingWriter,
    shutdown: watch::Receiver<bool>,
) -> SessionStats
where
    S: CaptureSource + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Record>(CHANNEL_CAPACITY);

    let capture = tokio::spawn(drive_capture(source, tx, shutdown));
    let write = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(record) = rx.recv().await {
            writer.append(&record);
        }
        writer.close()
    });

    let (records_forwarded, capture_failed) = match capture.await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            error!(%join_error, "capture driver panicked");
            (0, true)
        }
    };
    let writer_stats = match write.await {
        Ok(stats) => stats,
        Err(join_error) => {
            error!(%join_error, "writer driver panicked");
            WriterStats::default()
        }
    };

    SessionStats {
        records_forwarded,
        capture_failed,
        writer: writer_stats,
    }
}

async fn drive_capture<S>(
    mut source: S,
    tx: mpsc::Sender<Record>,
    mut shutdown: watch::Receiver<bool>,
) -> (u64, bool)
where
    S: CaptureSource,
{
    let mut forwarded = 0u64;
    let mut stopping = false;
    loop {
        let next = if stopping {
            source.next().await
        } else {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!(source = source.describe(), "stop requested; draining capture backend");
                    source.stop();
                    stopping = true;
                    continue;
                }
                next = source.next() => next,
            }
        };
        match next {
            Ok(Some(record)) => {
                if tx.send(record).await.is_err() {
                    // The writer driver is gone; without a consumer the
                    // session cannot honor its no-drop contract.
                    error!(source = source.describe(), "writer stopped consuming; aborting capture");
                    return (forwarded, true);
                }
                forwarded += 1;
            }
            Ok(None) => return (forwarded, false),
            Err(capture_error) => {
                error!(source = source.describe(), %capture_error, "capture backend failed");
                return (forwarded, true);
            }
        }
    }
    // The source drops with this task, releasing the backend's OS resources
    // exactly once.
}
