//! Temporal smoothing
//!
//! Trailing moving average: point `i` becomes the mean of input points
//! `[max(0, i - window), i]`. The window narrows near the start instead of
//! padding, and never looks ahead.

use crate::aggregation::mean;
use crate::types::{Point, Series};

/// Smooth a series with a trailing window of `window` preceding points.
///
/// Length, axis and indices are preserved. A window of 0 returns the input
/// values unchanged.
pub fn moving_average(series: &Series, window: usize) -> Series {
    let values: Vec<f64> = series.values().collect();

    let points = series
        .points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let start = i.saturating_sub(window);
            Point::new(point.index, mean(&values[start..=i]))
        })
        .collect();

    Series::new(series.axis, points)
}
