#![forbid(unsafe_code)]
//! Rotating, size-retained record files.
//!
//! [`RotatingWriter`] consumes [`capture_source::Record`]s in order,
//! serializes each through a [`RecordFormat`], flushes to stable storage
//! immediately, and rotates to a new timestamp-named file once the
//! per-file record quota is reached. [`retention::enforce`] bounds the total
//! directory size by deleting the least-recently-modified non-active file,
//! one candidate per invocation, triggered as a detached task via
//! [`RetentionTrigger`].

mod format;
mod name;
mod policy;
pub mod retention;
mod writer;

pub use format::{LineFormat, PcapFormat, RecordEncoder, RecordFormat};
pub use name::stamp_name;
pub use policy::{PolicyError, RetentionPolicy, RotationPolicy};
pub use retention::{enforce, Outcome, RetentionError, RetentionTrigger};
pub use writer::{RotatingWriter, WriterStats};

// The pcap link-type identifier callers need when building a [`PcapFormat`].
pub use pcap_file::DataLink;
