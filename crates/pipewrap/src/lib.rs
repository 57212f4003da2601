#![forbid(unsafe_code)]
//! Capture a record stream into bounded, rotated, size-retained files.
//!
//! The binary wires a [`capture_source::CaptureSource`] backend through a
//! bounded channel into a [`rotolog::RotatingWriter`], supervised by a
//! single-shot shutdown coordinator: the first interrupt stops capture,
//! drains the channel, flushes and closes the active file, then the process
//! exits. See the `session` module for the concurrency contract.

pub mod cli;
pub mod commands;
pub mod exit;
pub mod session;
pub mod shutdown;
