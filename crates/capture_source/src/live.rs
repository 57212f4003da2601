use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{CaptureError, CaptureSource, Record};

const SNAPSHOT_LEN: i32 = 1024;
// The handle must wake periodically so a pending receive can observe stop().
const POLL_TIMEOUT_MS: i32 = 500;
const HANDOFF_SLOTS: usize = 64;

/// Parameters for opening a live-interface capture.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub interface: String,
    /// Optional BPF filter expression, compiled at open time.
    pub filter: Option<String>,
    pub promiscuous: bool,
}

impl LiveConfig {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            filter: None,
            promiscuous: false,
        }
    }
}

/// Capture backend yielding one record per packet from a live interface.
///
/// The pcap handle lives on a dedicated thread; packets are handed off
/// through a small bounded queue. `stop()` raises a flag the thread checks
/// on every poll-timeout tick; the thread then drops the handle (the single
/// release of the OS resource) and the closing queue unblocks a pending
/// `next()` with end-of-stream.
pub struct LiveSource {
    rx: mpsc::Receiver<Record>,
    stop_flag: Arc<AtomicBool>,
    label: String,
    datalink: i32,
}

impl LiveSource {
    pub fn open(config: LiveConfig) -> Result<Self, CaptureError> {
        let devices = pcap::Device::list().map_err(|source| CaptureError::DeviceOpenFailed {
            device: config.interface.clone(),
            source,
        })?;
        if !devices.iter().any(|device| device.name == config.interface) {
            return Err(CaptureError::DeviceNotFound(config.interface));
        }

        let inactive = pcap::Capture::from_device(config.interface.as_str()).map_err(|source| {
            CaptureError::DeviceOpenFailed {
                device: config.interface.clone(),
                source,
            }
        })?;
        let mut capture = inactive
            .snaplen(SNAPSHOT_LEN)
            .promisc(config.promiscuous)
            .timeout(POLL_TIMEOUT_MS)
            .open()
            .map_err(|source| CaptureError::DeviceOpenFailed {
                device: config.interface.clone(),
                source,
            })?;
        if let Some(filter) = &config.filter {
            capture
                .filter(filter, true)
                .map_err(|source| CaptureError::FilterRejected {
                    filter: filter.clone(),
                    source,
                })?;
        }

        let datalink = capture.get_datalink().0;
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(HANDOFF_SLOTS);

        let flag = stop_flag.clone();
        let interface = config.interface.clone();
        std::thread::Builder::new()
            .name("live-capture".into())
            .spawn(move || capture_loop(capture, tx, flag, interface))
            .map_err(|error| CaptureError::Internal(format!("capture thread: {error}")))?;

        Ok(Self {
            rx,
            stop_flag,
            label: config.interface,
            datalink,
        })
    }

    /// Link type reported by the handle, for the capture-file global header.
    pub fn datalink(&self) -> i32 {
        self.datalink
    }

    /// Snapshot length the handle captures with, for the file global header.
    pub fn snaplen(&self) -> u32 {
        SNAPSHOT_LEN as u32
    }
}

fn capture_loop(
    mut capture: pcap::Capture<pcap::Active>,
    tx: mpsc::Sender<Record>,
    stop: Arc<AtomicBool>,
    interface: String,
) {
    loop {
        if stop.load(Ordering::Acquire) {
            debug!(%interface, "live capture stopped");
            break;
        }
        match capture.next_packet() {
            Ok(packet) => {
                let header = *packet.header;
                let received_at = UNIX_EPOCH
                    + Duration::new(
                        header.ts.tv_sec.max(0) as u64,
                        (header.ts.tv_usec.max(0) as u32).saturating_mul(1000),
                    );
                let record = Record::packet(packet.data.to_vec(), received_at, header.len);
                if tx.blocking_send(record).is_err() {
                    // Receiver gone: the source was dropped.
                    break;
                }
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(error) => {
                warn!(%interface, %error, "live capture ended");
                break;
            }
        }
    }
    // The handle drops here, closing the device exactly once.
}

impl CaptureSource for LiveSource {
    async fn next(&mut self) -> Result<Option<Record>, CaptureError> {
        Ok(self.rx.recv().await)
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    fn describe(&self) -> &str {
        &self.label
    }
}

impl Drop for LiveSource {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_device_is_rejected_up_front() {
        // Device enumeration itself may be denied in restricted environments;
        // either way an unknown interface must not open.
        let result = LiveSource::open(LiveConfig::new("pipewrap-no-such-interface-x9q"));
        assert!(matches!(
            result,
            Err(CaptureError::DeviceNotFound(_)) | Err(CaptureError::DeviceOpenFailed { .. })
        ));
    }
}
