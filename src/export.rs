//! History export: a JSON array for network clients and a CSV track log.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::DateTime;
use tracing::info;

use crate::error::NavError;
use crate::fix::{FilteredFix, RawFix, Timestamp};
use crate::history::HistoryEntry;

pub const CSV_HEADER: [&str; 10] = [
    "timestamp",
    "date_time",
    "raw_lat",
    "raw_lon",
    "raw_speed",
    "raw_course",
    "filtered_lat",
    "filtered_lon",
    "filtered_speed",
    "filtered_course",
];

/// `[{"timestamp":…,"raw":{"lat":…,"lon":…,"speed":…,"course":…},"filtered":{…}}, …]`
pub fn history_json(entries: &[HistoryEntry]) -> Result<String, NavError> {
    Ok(serde_json::to_string(entries)?)
}

pub fn write_history_json<W: Write>(writer: W, entries: &[HistoryEntry]) -> Result<(), NavError> {
    serde_json::to_writer_pretty(writer, entries)?;
    Ok(())
}

/// `MM/DD/YYYY HH:MM:SS` in UTC; empty if the timestamp is out of range.
fn date_time(timestamp: Timestamp) -> String {
    DateTime::from_timestamp(timestamp.floor() as i64, 0)
        .map(|dt| dt.format("%m/%d/%Y %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// One row per logged fix pair, flushed after every row so a power cut loses
/// at most the row being written.
pub struct CsvLogger<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvLogger<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, NavError> {
        let logger = Self::from_writer(File::create(path.as_ref())?)?;
        info!("logging track to {}", path.as_ref().display());
        Ok(logger)
    }
}

impl<W: Write> CsvLogger<W> {
    pub fn from_writer(inner: W) -> Result<Self, NavError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn log(&mut self, raw: &RawFix, filtered: &FilteredFix) -> Result<(), NavError> {
        self.writer.write_record(&[
            format!("{:.0}", raw.timestamp.floor()),
            date_time(raw.timestamp),
            format!("{:.6}", raw.latitude),
            format!("{:.6}", raw.longitude),
            format!("{:.2}", raw.speed),
            format!("{:.2}", raw.course),
            format!("{:.6}", filtered.latitude),
            format!("{:.6}", filtered.longitude),
            format!("{:.2}", filtered.speed),
            format!("{:.2}", filtered.course),
        ])?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn log_entry(&mut self, entry: &HistoryEntry) -> Result<(), NavError> {
        self.log(&entry.raw, &entry.filtered)
    }

    pub fn into_inner(self) -> Result<W, NavError> {
        self.writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }
}
