//! Roster and attendance CSV files.
//!
//! Both files are append-only. The header row is written lazily: only when
//! the file is empty (or does not exist yet) at the time of the first
//! append.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
}

/// One enrolled person: `Name,Course,Batch,Face Data Path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Batch")]
    pub batch: String,
    #[serde(rename = "Face Data Path")]
    pub data_path: String,
}

/// One attendance row: `Name,Date,Time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
}

/// Append one record, emitting the header only for an empty file.
fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<(), RecordError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let write_header = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}

/// The roster file (`student_info.csv` by default).
pub struct Roster {
    path: PathBuf,
}

impl Roster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, entry: &RosterEntry) -> Result<(), RecordError> {
        append_record(&self.path, entry)
    }

    /// All enrolled people; an absent file reads as empty.
    pub fn entries(&self) -> Result<Vec<RosterEntry>, RecordError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut entries = Vec::new();
        for row in reader.deserialize() {
            entries.push(row?);
        }
        Ok(entries)
    }
}

/// Destination for attendance rows; the loop tests substitute a fake.
pub trait RecordSink {
    fn record(&mut self, name: &str) -> Result<(), RecordError>;
}

/// The attendance file (`attendance.csv` by default). Each record carries
/// the local date and time at the moment of writing.
pub struct AttendanceLog {
    path: PathBuf,
}

impl AttendanceLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for AttendanceLog {
    fn record(&mut self, name: &str) -> Result<(), RecordError> {
        let now = chrono::Local::now();
        append_record(
            &self.path,
            &AttendanceEntry {
                name: name.to_string(),
                date: now.format("%Y-%m-%d").to_string(),
                time: now.format("%H:%M:%S").to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            course: "CS".to_string(),
            batch: "2026".to_string(),
            data_path: format!("face_data/{name}"),
        }
    }

    #[test]
    fn header_written_once_for_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        let roster = Roster::new(&path);

        roster.append(&entry("alice")).unwrap();
        roster.append(&entry("bob")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Name,Course,Batch,Face Data Path");
        assert!(lines[1].starts_with("alice,"));
        assert!(lines[2].starts_with("bob,"));
    }

    #[test]
    fn no_header_appended_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(&path, "Name,Course,Batch,Face Data Path\nold,CS,2025,face_data/old\n")
            .unwrap();

        Roster::new(&path).append(&entry("new")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Name,Course").count(), 1);
        assert!(content.contains("new,CS"));
    }

    #[test]
    fn roster_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Roster::new(dir.path().join("roster.csv"));
        roster.append(&entry("alice")).unwrap();

        let entries = roster.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "alice");
        assert_eq!(entries[0].data_path, "face_data/alice");
    }

    #[test]
    fn absent_roster_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Roster::new(dir.path().join("missing.csv"));
        assert!(roster.entries().unwrap().is_empty());
    }

    #[test]
    fn attendance_rows_carry_date_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        let mut log = AttendanceLog::new(&path);
        log.record("alice").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Name,Date,Time");
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[0], "alice");
        // Date like 2026-08-25, time like 14:03:09
        assert_eq!(fields[1].len(), 10);
        assert_eq!(fields[2].len(), 8);
    }

    #[test]
    fn repeated_records_append_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        let mut log = AttendanceLog::new(&path);
        log.record("alice").unwrap();
        log.record("alice").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("Name,Date,Time").count(), 1);
    }
}
