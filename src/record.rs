//! Raw log records as exported by the table: one CSV line per message,
//! newest first.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::ReaderBuilder;

use crate::error::{LedgerError, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// One line of the log, still untyped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// 1-based line in the source file.
    pub line: usize,
    pub message: String,
    pub timestamp: String,
}

impl LogRecord {
    pub fn new(line: usize, message: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Parses the timestamp field. Only called for records that classify
    /// into an event, so a header line never reaches this.
    pub fn parsed_timestamp(&self) -> Result<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|_| LedgerError::MalformedEvent {
                line: self.line,
                field: "timestamp",
                record: self.message.clone(),
            })
    }
}

/// Reads every record from `reader` and returns them oldest first.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<LogRecord>> {
    let mut csv = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in csv.records().enumerate() {
        let row = row.map_err(|source| LedgerError::UnreadableRecord {
            line: source
                .position()
                .map_or(index + 1, |pos| pos.line() as usize),
            source,
        })?;
        let line = row.position().map_or(index + 1, |pos| pos.line() as usize);
        let message = row.get(0).unwrap_or_default();
        let timestamp = row.get(1).unwrap_or_default();
        records.push(LogRecord::new(line, message, timestamp));
    }
    records.reverse();
    Ok(records)
}

/// Opens `path` and reads it with [`read_records`].
pub fn read_log(path: &Path) -> Result<Vec<LogRecord>> {
    let file = File::open(path).map_err(|source| LedgerError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    read_records(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_come_back_oldest_first_with_source_lines() {
        let raw = "entry,at,order\n\
                   \"\"\"Bob @ b2\"\" checks\",2024-03-01T20:00:05.000Z,2\n\
                   \"\"\"Bob @ b2\"\" bets 20\",2024-03-01T20:00:01.500Z,1\n";
        let records = read_records(raw.as_bytes()).expect("readable");

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].message, "\"Bob @ b2\" bets 20");
        assert_eq!(records[0].line, 3);
        assert_eq!(records[2].message, "entry");
        assert_eq!(records[2].line, 1);
    }

    #[test]
    fn timestamp_keeps_milliseconds() {
        let record = LogRecord::new(4, "x", "2024-03-01T20:00:01.250Z");
        let at = record.parsed_timestamp().expect("valid timestamp");
        assert_eq!(at.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn bad_timestamp_is_a_malformed_event() {
        let record = LogRecord::new(9, "\"Bob @ b2\" folds", "yesterday");
        let err = record.parsed_timestamp().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MalformedEvent {
                line: 9,
                field: "timestamp",
                ..
            }
        ));
    }

    #[test]
    fn invalid_utf8_is_an_unreadable_record() {
        let mut raw = b"\"\"\"Bob @ b2\"\" checks\",2024-03-01T20:00:05.000Z,2\n".to_vec();
        raw.extend_from_slice(b"\xff\xfe folds,2024-03-01T20:00:06.000Z,3\n");
        let err = read_records(raw.as_slice()).unwrap_err();
        assert!(matches!(err, LedgerError::UnreadableRecord { line: 2, .. }), "{err:?}");
    }

    #[test]
    fn missing_file_is_input_unavailable() {
        let err = read_log(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LedgerError::InputUnavailable { .. }));
    }
}
