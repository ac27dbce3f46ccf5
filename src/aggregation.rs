//! Row and periodic aggregation
//!
//! This module collapses per-subject readings into scalar series:
//! - Per-minute cross-subject means (temperature path)
//! - Hour-of-day profiles pooled over every recording day
//! - Per-day means of the per-minute means
//! - Per-subject totals and activity/temperature pairs
//!
//! Missing readings (NaN in a table) are skipped. A bucket left with no
//! readings is NaN; nothing here substitutes a fallback value.

use crate::config::{RecordingLayout, HOURS_PER_DAY};
use crate::types::{ActivityTemperaturePair, Axis, Point, Series, Sex, SubjectTotal, Table};
use log::{debug, warn};

/// Arithmetic mean; NaN for an empty slice and whenever any value is NaN
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of the defined values only; NaN when none is defined
pub(crate) fn mean_present(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    sum / count as f64
}

/// Unweighted mean of each row's present readings, one point per minute
pub fn row_mean_series(table: &Table) -> Series {
    Series::from_values(Axis::Minute, table.rows().iter().map(|row| mean_present(row)))
}

/// Mean of every reading falling in each hour of day, pooled across days and subjects.
///
/// Always yields one point per hour of day. Minutes past the end of the table
/// are skipped, so a short table produces partial or undefined buckets.
pub fn hourly_profile(table: &Table, layout: &RecordingLayout) -> Series {
    warn_if_short(table, layout);
    let minutes_per_hour = layout.minutes_per_hour();

    let points = (0..HOURS_PER_DAY)
        .map(|hour| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for day in 0..layout.days {
                let start = day
                    .saturating_mul(layout.minutes_per_day)
                    .saturating_add(hour * minutes_per_hour);
                if start >= table.len() {
                    break;
                }
                let end = start.saturating_add(minutes_per_hour).min(table.len());
                for row in &table.rows()[start..end] {
                    for reading in row.iter().filter(|v| !v.is_nan()) {
                        sum += reading;
                        count += 1;
                    }
                }
            }
            Point::new(hour, sum / count as f64)
        })
        .collect();

    debug!("hourly profile over {} days", layout.days);
    Series::new(Axis::Hour, points)
}

/// Mean of the per-minute cross-subject means within each recording day.
///
/// Points are indexed by 1-based day number. Minutes with no present reading
/// do not count toward their day.
pub fn daily_means(table: &Table, layout: &RecordingLayout) -> Series {
    warn_if_short(table, layout);

    let points = (0..layout.days)
        .map(|day| {
            let start = day.saturating_mul(layout.minutes_per_day).min(table.len());
            let end = (day + 1)
                .saturating_mul(layout.minutes_per_day)
                .min(table.len());
            let row_means: Vec<f64> = table.rows()[start..end]
                .iter()
                .map(|row| mean_present(row))
                .collect();
            Point::new(day + 1, mean_present(&row_means))
        })
        .collect();

    Series::new(Axis::Day, points)
}

/// Sum of each subject's readings over the whole table, in column order.
///
/// Missing (NaN) readings are skipped.
pub fn subject_totals(table: &Table, sex: Sex) -> Vec<SubjectTotal> {
    table
        .subjects()
        .iter()
        .enumerate()
        .map(|(idx, subject)| SubjectTotal {
            subject: subject.clone(),
            sex,
            total: table.column(idx).filter(|v| !v.is_nan()).sum(),
        })
        .collect()
}

/// Pair activity and temperature readings of the same subject and minute.
///
/// Covers the minutes present in both tables and the subjects of the activity
/// table; a pair is emitted only when both readings are defined.
pub fn activity_temperature_pairs(
    activity: &Table,
    temperature: &Table,
) -> Vec<ActivityTemperaturePair> {
    let columns: Vec<(usize, usize)> = activity
        .subjects()
        .iter()
        .enumerate()
        .filter_map(|(a_idx, subject)| {
            temperature
                .subject_index(subject)
                .map(|t_idx| (a_idx, t_idx))
        })
        .collect();

    activity
        .rows()
        .iter()
        .zip(temperature.rows())
        .flat_map(|(a_row, t_row)| {
            columns.iter().filter_map(move |&(a_idx, t_idx)| {
                let activity = a_row[a_idx];
                let temperature = t_row[t_idx];
                if activity.is_nan() || temperature.is_nan() {
                    None
                } else {
                    Some(ActivityTemperaturePair {
                        activity,
                        temperature,
                    })
                }
            })
        })
        .collect()
}

fn warn_if_short(table: &Table, layout: &RecordingLayout) {
    if table.len() < layout.total_minutes() {
        warn!(
            "table has {} rows, fewer than the {} a {}-day recording needs; buckets will be partial",
            table.len(),
            layout.total_minutes(),
            layout.days
        );
    }
}
