//! Per-subject normalization
//!
//! Activity readings are rescaled per subject by that subject's own maximum so
//! animals with different baseline activity contribute equally, then averaged
//! across subjects for each minute.
//! - Maxima are computed once per table
//! - Missing readings are left out of their minute's mean
//! - Zero maxima are not guarded; the resulting NaN/infinity propagates

use crate::aggregation::mean;
use crate::types::{Axis, Series, SubjectExtrema, Table};
use log::debug;

/// Normalizer for activity tables
pub struct Normalizer;

impl Normalizer {
    /// Maximum reading of every subject across the whole table.
    ///
    /// NaN readings are skipped; a subject with no defined reading has a NaN maximum.
    pub fn extrema(table: &Table) -> SubjectExtrema {
        let maxima = (0..table.subjects().len())
            .map(|idx| table.column(idx).fold(f64::NAN, f64::max))
            .collect();

        SubjectExtrema {
            subjects: table.subjects().to_vec(),
            maxima,
        }
    }

    /// Mean across subjects of `reading / subject_max`, one point per minute
    pub fn normalized_mean_series(table: &Table) -> Series {
        let extrema = Self::extrema(table);
        Self::normalize_with(table, &extrema)
    }

    // `extrema` must come from `table`, so maxima line up with row columns
    fn normalize_with(table: &Table, extrema: &SubjectExtrema) -> Series {
        debug!(
            "normalizing {} rows against {} subject maxima",
            table.len(),
            extrema.len()
        );

        let values = table.rows().iter().map(|row| {
            let scaled: Vec<f64> = row
                .iter()
                .zip(extrema.maxima.iter())
                .filter(|(reading, _)| !reading.is_nan())
                .map(|(reading, max)| reading / max)
                .collect();
            mean(&scaled)
        });

        Series::from_values(Axis::Minute, values)
    }
}
