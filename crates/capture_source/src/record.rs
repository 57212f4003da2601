use std::time::SystemTime;

/// One unit of captured data: an opaque payload plus capture metadata.
///
/// Records are immutable once produced. They are owned by the backend until
/// handed to the session channel, then owned by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Opaque payload bytes. A line's payload excludes the newline.
    pub payload: Vec<u8>,
    /// Arrival timestamp. For packets this is the capture timestamp
    /// reported by the handle, not the hand-off time.
    pub received_at: SystemTime,
    /// Wire metadata, present only for packet records.
    pub packet: Option<PacketMeta>,
}

/// Wire metadata carried by packet records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketMeta {
    /// Length of the packet as seen on the wire.
    pub wire_len: u32,
    /// Bytes actually captured; at most `wire_len` under a snapshot limit.
    pub captured_len: u32,
}

impl Record {
    /// A line record stamped with the current time.
    pub fn line(payload: Vec<u8>) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
            packet: None,
        }
    }

    /// A packet record carrying the handle's capture timestamp and wire
    /// length; the captured length is the payload length.
    pub fn packet(payload: Vec<u8>, received_at: SystemTime, wire_len: u32) -> Self {
        let captured_len = payload.len() as u32;
        Self {
            payload,
            received_at,
            packet: Some(PacketMeta {
                wire_len,
                captured_len,
            }),
        }
    }
}
