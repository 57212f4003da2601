use std::fs::File;
use std::io::{self, Write};
use std::time::UNIX_EPOCH;

use capture_source::Record;
use pcap_file::pcap::{PcapHeader, PcapPacket, PcapWriter};
use pcap_file::{DataLink, PcapError};

/// On-disk encoding seam between the rotating writer and a backend's record
/// layout.
pub trait RecordFormat: Send {
    /// Extension appended after the timestamp in file names, if any.
    fn extension(&self) -> Option<&'static str>;

    /// Starts encoding into a freshly created file, writing the format's
    /// file header (if it has one) before any record.
    fn open(&self, file: File) -> io::Result<Box<dyn RecordEncoder + Send>>;
}

/// Per-file encoder owned by the active file.
pub trait RecordEncoder: Send {
    fn append(&mut self, record: &Record) -> io::Result<()>;

    /// Flushes appended records to stable storage.
    fn sync(&mut self) -> io::Result<()>;
}

/// Plain text lines: payload bytes followed by a newline, no file header.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl RecordFormat for LineFormat {
    fn extension(&self) -> Option<&'static str> {
        None
    }

    fn open(&self, file: File) -> io::Result<Box<dyn RecordEncoder + Send>> {
        Ok(Box::new(LineEncoder { file }))
    }
}

struct LineEncoder {
    file: File,
}

impl RecordEncoder for LineEncoder {
    fn append(&mut self, record: &Record) -> io::Result<()> {
        self.file.write_all(&record.payload)?;
        self.file.write_all(b"\n")
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }
}

/// Standard pcap container: every file starts with the global header
/// (snapshot length, link type) and each record carries its own timestamp,
/// captured length, and original length ahead of the payload.
#[derive(Debug, Clone, Copy)]
pub struct PcapFormat {
    snaplen: u32,
    datalink: DataLink,
}

impl PcapFormat {
    pub fn new(snaplen: u32, datalink: DataLink) -> Self {
        Self { snaplen, datalink }
    }
}

impl RecordFormat for PcapFormat {
    fn extension(&self) -> Option<&'static str> {
        Some("pcap")
    }

    fn open(&self, file: File) -> io::Result<Box<dyn RecordEncoder + Send>> {
        // Second handle to the same open file so sync() can reach it while
        // the pcap writer owns the primary one.
        let sync_handle = file.try_clone()?;
        let header = PcapHeader {
            snaplen: self.snaplen,
            datalink: self.datalink,
            ..Default::default()
        };
        let writer = PcapWriter::with_header(file, header).map_err(into_io)?;
        Ok(Box::new(PcapEncoder {
            writer,
            sync_handle,
        }))
    }
}

struct PcapEncoder {
    writer: PcapWriter<File>,
    sync_handle: File,
}

impl RecordEncoder for PcapEncoder {
    fn append(&mut self, record: &Record) -> io::Result<()> {
        let timestamp = record
            .received_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let orig_len = record
            .packet
            .map_or(record.payload.len() as u32, |meta| meta.wire_len);
        let packet = PcapPacket::new(timestamp, orig_len, &record.payload);
        self.writer.write_packet(&packet).map_err(into_io)?;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_handle.sync_data()
    }
}

fn into_io(error: PcapError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, error)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pcap_file::pcap::PcapReader;

    use super::*;

    #[test]
    fn line_format_appends_newline_per_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lines");
        let file = File::create(&path).expect("create");

        let mut encoder = LineFormat.open(file).expect("open");
        encoder.append(&Record::line(b"a".to_vec())).expect("a");
        encoder.append(&Record::line(b"b".to_vec())).expect("b");
        encoder.sync().expect("sync");
        drop(encoder);

        assert_eq!(std::fs::read(&path).expect("read"), b"a\nb\n");
    }

    #[test]
    fn pcap_format_round_trips_through_a_standard_reader() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("capture.pcap");
        let file = File::create(&path).expect("create");

        let format = PcapFormat::new(1024, DataLink::ETHERNET);
        let ts = UNIX_EPOCH + Duration::new(1_700_000_000, 123_000);
        let mut encoder = format.open(file).expect("open");
        encoder
            .append(&Record::packet(vec![0xAA; 60], ts, 1500))
            .expect("first");
        encoder
            .append(&Record::packet(vec![0xBB; 42], ts + Duration::from_secs(1), 42))
            .expect("second");
        encoder.sync().expect("sync");
        drop(encoder);

        let mut reader = PcapReader::new(File::open(&path).expect("reopen")).expect("header");
        assert_eq!(reader.header().snaplen, 1024);
        assert_eq!(reader.header().datalink, DataLink::ETHERNET);

        let first = reader.next_packet().expect("some").expect("ok");
        assert_eq!(first.data.as_ref(), &[0xAA; 60][..]);
        assert_eq!(first.orig_len, 1500);
        assert_eq!(first.timestamp, Duration::new(1_700_000_000, 123_000));

        let second = reader.next_packet().expect("some").expect("ok");
        assert_eq!(second.data.as_ref(), &[0xBB; 42][..]);
        assert_eq!(second.orig_len, 42);

        assert!(reader.next_packet().is_none());
    }

    #[test]
    fn non_packet_record_falls_back_to_payload_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fallback.pcap");
        let file = File::create(&path).expect("create");

        let mut encoder = PcapFormat::new(1024, DataLink::ETHERNET)
            .open(file)
            .expect("open");
        encoder.append(&Record::line(b"abcd".to_vec())).expect("append");
        drop(encoder);

        let mut reader = PcapReader::new(File::open(&path).expect("reopen")).expect("header");
        let packet = reader.next_packet().expect("some").expect("ok");
        assert_eq!(packet.orig_len, 4);
    }
}
