use std::future::Future;

use crate::{CaptureError, Record};

/// Capability interface shared by the capture backends.
///
/// `next` resolving to `Ok(None)` is end-of-stream. `stop` is idempotent and
/// must eventually drive `next` to end-of-stream: the backend stops
/// producing, `next` drains whatever was already buffered, then yields
/// `Ok(None)`.
///
/// `next` must be cancel-safe: dropping the returned future never loses a
/// partially-read record, so a driver may race it against a shutdown signal
/// in a `select!`.
pub trait CaptureSource: Send {
    /// Blocks until the next record, end-of-stream, or a terminal backend
    /// error. After a terminal error the backend's resources are released
    /// when the source drops.
    fn next(&mut self) -> impl Future<Output = Result<Option<Record>, CaptureError>> + Send;

    /// Requests the backend to stop producing. Idempotent.
    fn stop(&mut self);

    /// Operator-facing label: the captured program's name or the interface
    /// name. Also used as the output file-name prefix.
    fn describe(&self) -> &str;
}
