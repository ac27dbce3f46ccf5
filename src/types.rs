//! Core types for the Vivarium Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: subject tables, per-subject extrema, series of points and the
//! cohort-level report handed to a renderer.

use crate::config::TransformConfig;
use crate::error::ComputeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of one tracked animal (one numeric column of a table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Sex of a cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

/// One of the four input datasets of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    FemaleActivity,
    MaleActivity,
    FemaleTemperature,
    MaleTemperature,
}

impl Dataset {
    /// All datasets in load order
    pub const ALL: [Dataset; 4] = [
        Dataset::FemaleActivity,
        Dataset::MaleActivity,
        Dataset::FemaleTemperature,
        Dataset::MaleTemperature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::FemaleActivity => "female_activity",
            Dataset::MaleActivity => "male_activity",
            Dataset::FemaleTemperature => "female_temperature",
            Dataset::MaleTemperature => "male_temperature",
        }
    }

    /// File stem used for the dataset inside a data directory
    pub fn file_stem(&self) -> &'static str {
        match self {
            Dataset::FemaleActivity => "Female_Act",
            Dataset::MaleActivity => "Male_Act",
            Dataset::FemaleTemperature => "Female_Temp",
            Dataset::MaleTemperature => "Male_Temp",
        }
    }

    pub fn sex(&self) -> Sex {
        match self {
            Dataset::FemaleActivity | Dataset::FemaleTemperature => Sex::Female,
            Dataset::MaleActivity | Dataset::MaleTemperature => Sex::Male,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minute-indexed readings for a set of subjects.
///
/// Every row holds one reading per subject, aligned with `subjects()`.
/// Row `i` is minute `i` of the recording. A missing reading is NaN.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    subjects: Vec<SubjectId>,
    rows: Vec<Vec<f64>>,
}

impl Table {
    /// Build a table from column-aligned rows.
    ///
    /// Fails on the first row whose width differs from the subject count.
    pub fn new(subjects: Vec<SubjectId>, rows: Vec<Vec<f64>>) -> Result<Self, ComputeError> {
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != subjects.len())
        {
            return Err(ComputeError::RowWidth {
                row,
                expected: subjects.len(),
                found: found.len(),
            });
        }
        Ok(Self { subjects, rows })
    }

    pub fn subjects(&self) -> &[SubjectId] {
        &self.subjects
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, minute: usize) -> Option<&[f64]> {
        self.rows.get(minute).map(Vec::as_slice)
    }

    /// Number of rows (minutes)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn subject_index(&self, subject: &SubjectId) -> Option<usize> {
        self.subjects.iter().position(|s| s == subject)
    }

    /// Readings of one subject, in minute order
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index).copied())
    }
}

/// Maximum reading per subject across a whole table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectExtrema {
    pub(crate) subjects: Vec<SubjectId>,
    #[serde(deserialize_with = "nan_or_null_vec")]
    pub(crate) maxima: Vec<f64>,
}

impl SubjectExtrema {
    pub fn get(&self, subject: &SubjectId) -> Option<f64> {
        self.subjects
            .iter()
            .position(|s| s == subject)
            .and_then(|i| self.maxima.get(i).copied())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubjectId, f64)> {
        self.subjects.iter().zip(self.maxima.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// What the index of a point counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Elapsed minutes since recording start
    Minute,
    /// Hour of day, 0-23
    Hour,
    /// Day of recording, 1-based
    Day,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Minute => "minute",
            Axis::Hour => "hour",
            Axis::Day => "day",
        }
    }
}

/// A single plotted value. Undefined values are NaN and encode as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub index: usize,
    #[serde(deserialize_with = "nan_or_null")]
    pub value: f64,
}

impl Point {
    pub fn new(index: usize, value: f64) -> Self {
        Self { index, value }
    }
}

/// Ordered sequence of points along one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub axis: Axis,
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(axis: Axis, points: Vec<Point>) -> Self {
        Self { axis, points }
    }

    /// Build a series whose indices are the positions of `values`
    pub fn from_values(axis: Axis, values: impl IntoIterator<Item = f64>) -> Self {
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| Point::new(i, v))
            .collect();
        Self { axis, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Minimum and maximum over defined values, `None` if there are none
    pub fn extent(&self) -> Option<(f64, f64)> {
        self.values()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Position of the first NaN point, if any
    pub fn first_undefined(&self) -> Option<usize> {
        self.points.iter().position(|p| p.value.is_nan())
    }
}

/// Sum of all readings of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectTotal {
    pub subject: SubjectId,
    pub sex: Sex,
    pub total: f64,
}

/// Co-located activity and temperature reading for one subject-minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityTemperaturePair {
    pub activity: f64,
    pub temperature: f64,
}

/// The four tables of one recording, loaded together
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CohortTables {
    pub female_activity: Table,
    pub male_activity: Table,
    pub female_temperature: Table,
    pub male_temperature: Table,
}

impl CohortTables {
    pub fn get(&self, dataset: Dataset) -> &Table {
        match dataset {
            Dataset::FemaleActivity => &self.female_activity,
            Dataset::MaleActivity => &self.male_activity,
            Dataset::FemaleTemperature => &self.female_temperature,
            Dataset::MaleTemperature => &self.male_temperature,
        }
    }
}

/// One view computed for both sexes, side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SexPair<T> {
    pub female: T,
    pub male: T,
}

/// Every plot-ready series derived from a cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortReport {
    /// Normalized activity, smoothed by the trailing moving average
    pub activity: SexPair<Series>,
    /// Mean raw activity per hour of day
    pub hourly_activity: SexPair<Series>,
    /// Mean raw activity per recording day
    pub daily_activity: SexPair<Series>,
    /// Mean temperature per minute
    pub temperature: SexPair<Series>,
    /// Total activity per animal, females first
    pub subject_totals: Vec<SubjectTotal>,
    /// Female activity against female temperature, per subject-minute
    pub activity_temperature: Vec<ActivityTemperaturePair>,
    /// Minute offsets of estrus days
    pub estrus_minutes: Vec<usize>,
}

pub(crate) fn nan_or_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

fn nan_or_null_vec<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Producer metadata attached to encoded payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Encoded cohort report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub format_version: String,
    pub producer: Producer,
    pub computed_at_utc: String,
    pub config: TransformConfig,
    pub report: CohortReport,
}

/// Encoded single series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPayload {
    pub format_version: String,
    pub producer: Producer,
    pub computed_at_utc: String,
    pub view: String,
    pub series: Series,
}
