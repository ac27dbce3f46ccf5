//! Property-based tests for the transformation stages.
//!
//! These tests verify invariants that must hold for all inputs.

use proptest::prelude::*;
use vivarium_flux::aggregation::{daily_means, hourly_profile, row_mean_series};
use vivarium_flux::normalizer::Normalizer;
use vivarium_flux::smoothing::moving_average;
use vivarium_flux::types::{Axis, Series, SubjectId, Table};
use vivarium_flux::RecordingLayout;

// ============================================================================
// Proptest Strategies
// ============================================================================

/// Generate a non-negative activity count.
fn activity_count() -> impl Strategy<Value = f64> {
    0.0f64..500.0
}

/// Generate a table of non-negative readings with `subjects` columns.
fn activity_table(
    subjects: impl Strategy<Value = usize>,
    rows: std::ops::RangeInclusive<usize>,
) -> impl Strategy<Value = Table> {
    subjects.prop_flat_map(move |width| {
        prop::collection::vec(prop::collection::vec(activity_count(), width), rows.clone())
            .prop_map(move |rows| {
                let ids = (0..width).map(|i| SubjectId::new(format!("S{}", i))).collect();
                Table::new(ids, rows).unwrap()
            })
    })
}

/// Same as `activity_table` with every subject reaching a positive maximum.
fn positive_max_table() -> impl Strategy<Value = Table> {
    activity_table(1usize..=6, 1..=40).prop_filter("every subject max must be positive", |t| {
        (0..t.subjects().len()).all(|i| t.column(i).any(|v| v > 0.0))
    })
}

/// Generate a minute series of finite values.
fn minute_series(max_len: usize) -> impl Strategy<Value = Series> {
    prop::collection::vec(-100.0f64..100.0, 0..=max_len)
        .prop_map(|values| Series::from_values(Axis::Minute, values))
}

// ============================================================================
// Normalization Property Tests
// ============================================================================

proptest! {
    /// Normalized values lie in [0, 1] for non-negative readings.
    #[test]
    fn normalized_within_unit_interval(table in positive_max_table()) {
        let series = Normalizer::normalized_mean_series(&table);

        prop_assert_eq!(series.len(), table.len());
        for point in &series.points {
            prop_assert!(
                (0.0..=1.0 + 1e-12).contains(&point.value),
                "value out of range at minute {}: {}", point.index, point.value
            );
        }
    }

    /// Each subject maximum bounds all of that subject's readings.
    #[test]
    fn extrema_bound_readings(table in positive_max_table()) {
        let extrema = Normalizer::extrema(&table);
        for (idx, subject) in table.subjects().iter().enumerate() {
            let max = extrema.get(subject).unwrap();
            prop_assert!(table.column(idx).all(|v| v <= max));
        }
    }
}

// ============================================================================
// Aggregation Property Tests
// ============================================================================

proptest! {
    /// Row mean at minute i depends only on row i.
    #[test]
    fn row_mean_is_local(
        table in activity_table(1usize..=5, 2..=30),
        replacement in activity_count(),
    ) {
        let before = row_mean_series(&table);

        // Overwrite the last row; every earlier point must be unchanged
        let mut rows = table.rows().to_vec();
        let last = rows.len() - 1;
        for v in rows[last].iter_mut() {
            *v = replacement;
        }
        let changed = Table::new(table.subjects().to_vec(), rows).unwrap();
        let after = row_mean_series(&changed);

        for i in 0..last {
            prop_assert_eq!(before.points[i], after.points[i]);
        }

        let row = table.row(0).unwrap();
        let expected = row.iter().sum::<f64>() / row.len() as f64;
        prop_assert!((before.points[0].value - expected).abs() < 1e-9);
    }

    /// Periodic views always have a fixed number of points.
    #[test]
    fn periodic_cardinality(table in activity_table(1usize..=3, 0..=60)) {
        let layout = RecordingLayout { days: 3, minutes_per_day: 24 };

        prop_assert_eq!(hourly_profile(&table, &layout).len(), 24);
        prop_assert_eq!(daily_means(&table, &layout).len(), 3);
    }
}

// ============================================================================
// Smoothing Property Tests
// ============================================================================

proptest! {
    /// Smoothing preserves length for any window.
    #[test]
    fn smoothing_preserves_length(series in minute_series(80), window in 0usize..100) {
        prop_assert_eq!(moving_average(&series, window).len(), series.len());
    }

    /// Window 0 returns the input unchanged.
    #[test]
    fn smoothing_window_zero_identity(series in minute_series(80)) {
        prop_assert_eq!(moving_average(&series, 0), series);
    }

    /// Smoothed values stay within the range of the input.
    #[test]
    fn smoothing_within_extent(series in minute_series(80), window in 1usize..40) {
        let smoothed = moving_average(&series, window);
        if let Some((lo, hi)) = series.extent() {
            for v in smoothed.values() {
                prop_assert!(v >= lo - 1e-9 && v <= hi + 1e-9);
            }
        }
    }

    /// Point i never depends on later points.
    #[test]
    fn smoothing_has_no_lookahead(
        series in minute_series(40).prop_filter("need two points", |s| s.len() >= 2),
        window in 1usize..10,
        bump in 1.0f64..50.0,
    ) {
        let mut changed = series.clone();
        let last = changed.points.len() - 1;
        changed.points[last].value += bump;

        let a = moving_average(&series, window);
        let b = moving_average(&changed, window);
        for i in 0..last {
            prop_assert_eq!(a.points[i], b.points[i]);
        }
    }
}
