//! End-to-end pipeline flows against a real child process.

#![cfg(unix)]

use std::path::Path;

use capture_source::{CaptureSource, PipeSource};
use rotolog::{LineFormat, RetentionPolicy, RetentionTrigger, RotatingWriter, RotationPolicy};
use tokio::sync::watch;

use pipewrap::session;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn writer_for(dir: &Path, source: &PipeSource, records_per_file: u64) -> RotatingWriter {
    RotatingWriter::new(
        dir.to_path_buf(),
        source.describe().to_string(),
        Box::new(LineFormat),
        RotationPolicy::new(records_per_file).expect("policy"),
        RetentionTrigger::new(dir.to_path_buf(), RetentionPolicy::from_megabytes(100)),
    )
}

fn lines_per_file(dir: &Path) -> Vec<(String, Vec<String>)> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let lines = std::fs::read_to_string(dir.join(&name))
                .expect("read")
                .lines()
                .map(str::to_string)
                .collect();
            (name, lines)
        })
        .collect()
}

#[tokio::test]
async fn seq_output_rotates_into_bounded_files_and_drains() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = PipeSource::spawn(&argv(&["seq", "1", "7"])).expect("spawn");
    let writer = writer_for(dir.path(), &source, 3);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let stats = session::run(source, writer, shutdown_rx).await;

    assert!(!stats.capture_failed);
    assert_eq!(stats.records_forwarded, 7);
    assert_eq!(stats.writer.records_written, 7);
    assert_eq!(stats.writer.records_dropped, 0);
    assert_eq!(stats.writer.files_completed, 3);

    let files = lines_per_file(dir.path());
    assert_eq!(files.len(), 3);
    for (name, _) in &files {
        assert!(name.starts_with("seq."), "unexpected file name {name}");
    }
    let contents: Vec<Vec<String>> = files.into_iter().map(|(_, lines)| lines).collect();
    assert_eq!(
        contents,
        vec![
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
            vec!["4".to_string(), "5".to_string(), "6".to_string()],
            vec!["7".to_string()],
        ]
    );
}

#[tokio::test]
async fn long_running_child_is_stopped_by_the_shutdown_signal() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Emits nothing and would run for 30 seconds if not stopped.
    let source = PipeSource::spawn(&argv(&["sleep", "30"])).expect("spawn");
    let writer = writer_for(dir.path(), &source, 3);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let session = tokio::spawn(session::run(source, writer, shutdown_rx));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    shutdown_tx.send(true).expect("signal");

    let stats = tokio::time::timeout(std::time::Duration::from_secs(5), session)
        .await
        .expect("session must drain promptly after stop")
        .expect("join");

    assert!(!stats.capture_failed);
    assert_eq!(stats.records_forwarded, 0);
    assert_eq!(stats.writer.files_completed, 0);
    assert!(lines_per_file(dir.path()).is_empty());
}

#[tokio::test]
async fn ordering_holds_across_many_rotations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = PipeSource::spawn(&argv(&["seq", "1", "200"])).expect("spawn");
    let writer = writer_for(dir.path(), &source, 16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let stats = session::run(source, writer, shutdown_rx).await;
    assert_eq!(stats.records_forwarded, 200);

    let concatenated: Vec<String> = lines_per_file(dir.path())
        .into_iter()
        .flat_map(|(_, lines)| lines)
        .collect();
    let expected: Vec<String> = (1..=200).map(|n| n.to_string()).collect();
    assert_eq!(concatenated, expected);
}
