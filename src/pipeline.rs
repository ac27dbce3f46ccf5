//! Pipeline orchestration
//!
//! This module provides the public API for Vivarium Flux.
//! It runs tables through the transformation stages and assembles the
//! plot-ready series for every view of a cohort.

use crate::aggregation::{
    activity_temperature_pairs, daily_means, hourly_profile, row_mean_series, subject_totals,
};
use crate::config::{TransformConfig, UndefinedPolicy};
use crate::error::ComputeError;
use crate::normalizer::Normalizer;
use crate::smoothing::moving_average;
use crate::types::{CohortReport, CohortTables, Dataset, Series, SexPair, Table};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A way of turning one table into one series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Normalized activity smoothed by the trailing moving average
    SmoothedActivity,
    /// Normalized activity, unsmoothed
    Activity,
    /// Per-minute mean of raw readings
    Temperature,
    /// Raw readings pooled by hour of day
    Hourly,
    /// Per-minute means averaged per recording day
    Daily,
}

impl View {
    pub const ALL: [View; 5] = [
        View::SmoothedActivity,
        View::Activity,
        View::Temperature,
        View::Hourly,
        View::Daily,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::SmoothedActivity => "smoothed_activity",
            View::Activity => "activity",
            View::Temperature => "temperature",
            View::Hourly => "hourly",
            View::Daily => "daily",
        }
    }
}

impl FromStr for View {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .iter()
            .copied()
            .find(|view| view.as_str() == s)
            .ok_or_else(|| ComputeError::InvalidConfig(format!("unknown view: {}", s)))
    }
}

/// Normalized, smoothed activity for one activity table.
///
/// # Example
/// ```ignore
/// let series = activity_series(&female_activity, 30);
/// assert_eq!(series.len(), female_activity.len());
/// ```
pub fn activity_series(table: &Table, window: usize) -> Series {
    let normalized = Normalizer::normalized_mean_series(table);
    moving_average(&normalized, window)
}

/// Per-minute mean temperature for one temperature table
pub fn temperature_series(table: &Table) -> Series {
    row_mean_series(table)
}

/// Run every view of a cohort with the given configuration
pub fn process_cohort(
    tables: &CohortTables,
    config: &TransformConfig,
) -> Result<CohortReport, ComputeError> {
    SeriesTransformer::new(*config)?.process_cohort(tables)
}

/// Transformer bound to one configuration.
///
/// Holds no state besides the configuration, so it can be reused for any
/// number of tables.
#[derive(Debug, Clone, Default)]
pub struct SeriesTransformer {
    config: TransformConfig,
}

impl SeriesTransformer {
    /// Create a transformer, rejecting an invalid layout
    pub fn new(config: TransformConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Transform one table into the series of a view
    pub fn transform(&self, table: &Table, view: View) -> Result<Series, ComputeError> {
        let series = match view {
            View::SmoothedActivity => activity_series(table, self.config.window),
            View::Activity => Normalizer::normalized_mean_series(table),
            View::Temperature => temperature_series(table),
            View::Hourly => hourly_profile(table, &self.config.layout),
            View::Daily => daily_means(table, &self.config.layout),
        };

        debug!("{} view: {} points", view.as_str(), series.len());
        self.check_defined(series, view)
    }

    /// Compute every view of a cohort, female and male side by side
    pub fn process_cohort(&self, tables: &CohortTables) -> Result<CohortReport, ComputeError> {
        info!(
            "processing cohort: {} female / {} male activity rows, window {}",
            tables.female_activity.len(),
            tables.male_activity.len(),
            self.config.window
        );

        let activity = self.pair(tables, View::SmoothedActivity, |t| {
            (&t.female_activity, &t.male_activity)
        })?;
        let hourly_activity =
            self.pair(tables, View::Hourly, |t| (&t.female_activity, &t.male_activity))?;
        let daily_activity =
            self.pair(tables, View::Daily, |t| (&t.female_activity, &t.male_activity))?;
        let temperature = self.pair(tables, View::Temperature, |t| {
            (&t.female_temperature, &t.male_temperature)
        })?;

        let totals = [Dataset::FemaleActivity, Dataset::MaleActivity]
            .into_iter()
            .flat_map(|dataset| subject_totals(tables.get(dataset), dataset.sex()))
            .collect();

        let pairs =
            activity_temperature_pairs(&tables.female_activity, &tables.female_temperature);

        Ok(CohortReport {
            activity,
            hourly_activity,
            daily_activity,
            temperature,
            subject_totals: totals,
            activity_temperature: pairs,
            estrus_minutes: self.config.layout.estrus_minutes(),
        })
    }

    fn pair<'a>(
        &self,
        tables: &'a CohortTables,
        view: View,
        select: impl Fn(&'a CohortTables) -> (&'a Table, &'a Table),
    ) -> Result<SexPair<Series>, ComputeError> {
        let (female, male) = select(tables);
        Ok(SexPair {
            female: self.transform(female, view)?,
            male: self.transform(male, view)?,
        })
    }

    fn check_defined(&self, series: Series, view: View) -> Result<Series, ComputeError> {
        match self.config.undefined_policy {
            UndefinedPolicy::Propagate => Ok(series),
            UndefinedPolicy::Reject => match series.first_undefined() {
                Some(pos) => Err(ComputeError::UndefinedValue {
                    view: view.as_str().to_string(),
                    index: series.points[pos].index,
                }),
                None => Ok(series),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordingLayout;
    use crate::types::{Axis, Sex, SubjectId};

    fn table(subjects: &[&str], rows: Vec<Vec<f64>>) -> Table {
        Table::new(subjects.iter().map(|s| SubjectId::from(*s)).collect(), rows).unwrap()
    }

    fn small_config() -> TransformConfig {
        TransformConfig::default()
            .with_window(2)
            .with_layout(RecordingLayout {
                days: 2,
                minutes_per_day: 24,
            })
    }

    fn constant_table(subjects: &[&str], value: f64, rows: usize) -> Table {
        table(subjects, vec![vec![value; subjects.len()]; rows])
    }

    fn sample_cohort() -> CohortTables {
        CohortTables {
            female_activity: constant_table(&["F1", "F2"], 4.0, 48),
            male_activity: constant_table(&["M1"], 2.0, 48),
            female_temperature: constant_table(&["F1", "F2"], 37.0, 48),
            male_temperature: constant_table(&["M1"], 36.5, 48),
        }
    }

    #[test]
    fn test_activity_series_normalizes_then_smooths() {
        let t = table(&["A", "B"], vec![vec![10.0, 20.0], vec![20.0, 10.0], vec![0.0, 0.0]]);
        let series = activity_series(&t, 1);

        let values: Vec<f64> = series.values().collect();
        assert!((values[0] - 0.75).abs() < 1e-12);
        assert!((values[1] - 0.75).abs() < 1e-12);
        assert!((values[2] - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_transform_views() {
        let transformer = SeriesTransformer::new(small_config()).unwrap();
        let t = constant_table(&["A"], 3.0, 48);

        let hourly = transformer.transform(&t, View::Hourly).unwrap();
        assert_eq!(hourly.axis, Axis::Hour);
        assert_eq!(hourly.len(), 24);

        let daily = transformer.transform(&t, View::Daily).unwrap();
        assert_eq!(daily.axis, Axis::Day);
        assert_eq!(daily.len(), 2);
        assert!(daily.values().all(|v| v == 3.0));

        let temperature = transformer.transform(&t, View::Temperature).unwrap();
        assert_eq!(temperature.len(), 48);

        let activity = transformer.transform(&t, View::Activity).unwrap();
        assert!(activity.values().all(|v| v == 1.0));
    }

    #[test]
    fn test_view_from_str() {
        assert_eq!("hourly".parse::<View>().unwrap(), View::Hourly);
        assert_eq!(
            "smoothed_activity".parse::<View>().unwrap(),
            View::SmoothedActivity
        );
        assert!("weekly".parse::<View>().is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TransformConfig::default().with_layout(RecordingLayout {
            days: 1,
            minutes_per_day: 25,
        });
        assert!(SeriesTransformer::new(config).is_err());
    }

    #[test]
    fn test_reject_policy() {
        let config = small_config().with_undefined_policy(UndefinedPolicy::Reject);
        let transformer = SeriesTransformer::new(config).unwrap();
        let t = constant_table(&["A"], 3.0, 10);

        // second day has no rows
        match transformer.transform(&t, View::Daily) {
            Err(ComputeError::UndefinedValue { view, index }) => {
                assert_eq!(view, "daily");
                assert_eq!(index, 2);
            }
            other => panic!("expected undefined value, got {:?}", other),
        }

        assert!(transformer.transform(&t, View::Temperature).is_ok());
    }

    #[test]
    fn test_propagate_policy_keeps_nan() {
        let transformer = SeriesTransformer::new(small_config()).unwrap();
        let t = constant_table(&["A"], 3.0, 10);

        let daily = transformer.transform(&t, View::Daily).unwrap();
        assert!(daily.points[1].value.is_nan());
    }

    #[test]
    fn test_process_cohort() {
        let report = process_cohort(&sample_cohort(), &small_config()).unwrap();

        assert_eq!(report.activity.female.len(), 48);
        assert_eq!(report.activity.male.len(), 48);
        assert_eq!(report.hourly_activity.female.len(), 24);
        assert_eq!(report.daily_activity.male.len(), 2);
        assert!(report.temperature.male.values().all(|v| v == 36.5));

        let subjects: Vec<&str> = report
            .subject_totals
            .iter()
            .map(|t| t.subject.as_str())
            .collect();
        assert_eq!(subjects, vec!["F1", "F2", "M1"]);
        assert_eq!(report.subject_totals[0].total, 4.0 * 48.0);
        assert_eq!(report.subject_totals[2].sex, Sex::Male);

        assert_eq!(report.activity_temperature.len(), 2 * 48);
        assert_eq!(report.estrus_minutes, vec![24]);
    }
}
