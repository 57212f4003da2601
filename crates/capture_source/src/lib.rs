#![forbid(unsafe_code)]
//! Capture backends for pipewrap.
//!
//! A capture backend produces a lazy, unbounded, ordered stream of
//! [`Record`]s behind the [`CaptureSource`] capability interface. Two
//! backends exist: [`PipeSource`] wraps a child process's stdout as one
//! record per logical line, and (behind the `live-capture` feature)
//! [`LiveSource`] yields one record per packet captured from a live network
//! interface.
//!
//! Backends own their OS resources (child process, capture handle) and
//! release them exactly once: on `stop()` followed by the final drain, or
//! when the source is dropped.

mod error;
mod pipe;
mod reader;
mod record;
mod source;

#[cfg(feature = "live-capture")]
mod live;

pub use error::CaptureError;
pub use pipe::PipeSource;
pub use reader::{BoundedLineReader, LineEvent, DEFAULT_MAX_LINE_BYTES};
pub use record::{PacketMeta, Record};
pub use source::CaptureSource;

#[cfg(feature = "live-capture")]
pub use live::{LiveConfig, LiveSource};
