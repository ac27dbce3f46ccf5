//! Transformation configuration
//!
//! Everything a transformation depends on besides the input table is passed in
//! through [`TransformConfig`]; no stage reads ambient state.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Default trailing window of the moving average, in points
pub const DEFAULT_SMOOTHING_WINDOW: usize = 30;

/// Default number of recorded days
pub const DEFAULT_RECORDING_DAYS: usize = 14;

/// Minutes in one recording day
pub const MINUTES_PER_DAY: usize = 1440;

/// Hour-of-day buckets per day
pub const HOURS_PER_DAY: usize = 24;

/// Longest recording a layout may describe
pub const MAX_RECORDING_DAYS: usize = 366;

/// Zero-based estrus days: every 4 days starting from the second day
pub const ESTRUS_DAYS: [usize; 4] = [1, 5, 9, 13];

/// Layout of a recording: contiguous minutes grouped into whole days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingLayout {
    pub days: usize,
    pub minutes_per_day: usize,
}

impl Default for RecordingLayout {
    fn default() -> Self {
        Self {
            days: DEFAULT_RECORDING_DAYS,
            minutes_per_day: MINUTES_PER_DAY,
        }
    }
}

impl RecordingLayout {
    pub fn minutes_per_hour(&self) -> usize {
        self.minutes_per_day / HOURS_PER_DAY
    }

    /// Rows a table needs to fill every periodic bucket
    pub fn total_minutes(&self) -> usize {
        self.days.saturating_mul(self.minutes_per_day)
    }

    /// Minute offsets of the estrus days that fall inside the recording
    pub fn estrus_minutes(&self) -> Vec<usize> {
        ESTRUS_DAYS
            .iter()
            .filter(|&&day| day < self.days)
            .filter_map(|&day| day.checked_mul(self.minutes_per_day))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.days == 0 || self.days > MAX_RECORDING_DAYS {
            return Err(ComputeError::InvalidConfig(format!(
                "days must be between 1 and {}, got {}",
                MAX_RECORDING_DAYS, self.days
            )));
        }
        if self.minutes_per_day == 0 || self.minutes_per_day % HOURS_PER_DAY != 0 {
            return Err(ComputeError::InvalidConfig(format!(
                "minutes_per_day must be a positive multiple of {}, got {}",
                HOURS_PER_DAY, self.minutes_per_day
            )));
        }
        if self.days.checked_mul(self.minutes_per_day).is_none() {
            return Err(ComputeError::InvalidConfig(format!(
                "{} days of {} minutes exceed the addressable row count",
                self.days, self.minutes_per_day
            )));
        }
        Ok(())
    }
}

/// How undefined (NaN) output values are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedPolicy {
    /// Keep NaN values in the output; they encode as `null`
    #[default]
    Propagate,
    /// Fail with `ComputeError::UndefinedValue` on the first NaN
    Reject,
}

/// Configuration for a transformation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Trailing moving-average window
    pub window: usize,
    pub layout: RecordingLayout,
    pub undefined_policy: UndefinedPolicy,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_SMOOTHING_WINDOW,
            layout: RecordingLayout::default(),
            undefined_policy: UndefinedPolicy::default(),
        }
    }
}

impl TransformConfig {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_layout(mut self, layout: RecordingLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_undefined_policy(mut self, policy: UndefinedPolicy) -> Self {
        self.undefined_policy = policy;
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: TransformConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        self.layout.validate()
    }
}
