//! Column extraction
//!
//! Turns already-typed records (one JSON object per minute, one numeric field
//! per subject) into a [`Table`]. The subject set is taken from the numeric
//! fields of the first record; every later record is checked against it once
//! here so downstream stages can index readings by column.

use crate::error::ComputeError;
use crate::types::{SubjectId, Table};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::path::Path;

/// One input row as parsed from JSON
pub type Record = Map<String, Value>;

/// Encoding of a table file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// A JSON array of row objects
    Json,
    /// Newline-delimited JSON, one row object per line
    Ndjson,
}

impl TableFormat {
    /// Guess the format from a file extension, defaulting to a JSON array
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ndjson") | Some("jsonl") => TableFormat::Ndjson,
            _ => TableFormat::Json,
        }
    }
}

/// Ordered subject ids present as numeric fields of the first record.
///
/// An empty input yields an empty set.
pub fn extract_subjects(records: &[Record]) -> Vec<SubjectId> {
    records
        .first()
        .map(|first| {
            first
                .iter()
                .filter(|(_, value)| value.is_number())
                .map(|(key, _)| SubjectId::new(key.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

/// Adapter for converting parsed records into tables
pub struct TableAdapter;

impl TableAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<Record>, ComputeError> {
        let records: Vec<Record> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Record>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    pub fn parse(input: &str, format: TableFormat) -> Result<Vec<Record>, ComputeError> {
        match format {
            TableFormat::Json => Self::parse_array(input),
            TableFormat::Ndjson => Self::parse_ndjson(input),
        }
    }

    /// Parse and convert in one step
    pub fn parse_table(input: &str, format: TableFormat) -> Result<Table, ComputeError> {
        let records = Self::parse(input, format)?;
        Self::to_table(&records)
    }

    /// Convert records to a column-aligned table.
    ///
    /// A `null` reading becomes NaN and counts as missing. A record missing a subject, or holding a
    /// non-numeric value for one, is rejected.
    pub fn to_table(records: &[Record]) -> Result<Table, ComputeError> {
        let subjects = extract_subjects(records);
        if subjects.is_empty() {
            warn!("table has no numeric subject columns ({} rows)", records.len());
        }

        let mut rows = Vec::with_capacity(records.len());
        for (row_idx, record) in records.iter().enumerate() {
            let mut row = Vec::with_capacity(subjects.len());
            for subject in &subjects {
                row.push(reading(record, row_idx, subject)?);
            }
            rows.push(row);
        }

        debug!(
            "extracted {} subjects over {} rows",
            subjects.len(),
            rows.len()
        );

        Table::new(subjects, rows)
    }

    /// Check every record against the subject set of the first one
    pub fn validate_records(records: &[Record]) -> Vec<RecordIssue> {
        let subjects = extract_subjects(records);
        records
            .iter()
            .enumerate()
            .flat_map(|(row_idx, record)| {
                subjects.iter().filter_map(move |subject| {
                    reading(record, row_idx, subject).err().map(|error| RecordIssue {
                        index: row_idx,
                        subject: subject.clone(),
                        error,
                    })
                })
            })
            .collect()
    }
}

/// A record that does not match the table's subject set
#[derive(Debug)]
pub struct RecordIssue {
    pub index: usize,
    pub subject: SubjectId,
    pub error: ComputeError,
}

fn reading(record: &Record, row: usize, subject: &SubjectId) -> Result<f64, ComputeError> {
    match record.get(subject.as_str()) {
        Some(Value::Null) => Ok(f64::NAN),
        Some(value) => value.as_f64().ok_or_else(|| ComputeError::NonNumericReading {
            row,
            subject: subject.to_string(),
        }),
        None => Err(ComputeError::SchemaMismatch {
            row,
            subject: subject.to_string(),
        }),
    }
}
