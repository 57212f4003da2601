use chrono::{DateTime, Local};

/// Builds the output file name `<source>.<YYYYMMDDHHMMSS>[.<ext>]`.
///
/// The stamp is local time to second resolution; the writer guarantees
/// stamps are strictly increasing across the files of one session.
pub fn stamp_name(source: &str, at: DateTime<Local>, extension: Option<&str>) -> String {
    let stamp = at.format("%Y%m%d%H%M%S");
    match extension {
        Some(ext) => format!("{source}.{stamp}.{ext}"),
        None => format!("{source}.{stamp}"),
    }
}
