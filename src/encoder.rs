//! Payload encoding
//!
//! This module wraps computed series and cohort reports in a JSON payload with
//! producer and timing metadata, ready to hand to a renderer.
//! Undefined (NaN) values encode as `null`.

use crate::config::TransformConfig;
use crate::error::ComputeError;
use crate::pipeline::View;
use crate::types::{CohortReport, Producer, ReportPayload, Series, SeriesPayload};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use uuid::Uuid;

/// Current payload format version
pub const FORMAT_VERSION: &str = "1.0.0";

/// Encoder for producing report payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: FLUX_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    /// Wrap a cohort report together with the configuration that produced it
    pub fn encode_report(&self, report: CohortReport, config: &TransformConfig) -> ReportPayload {
        ReportPayload {
            format_version: FORMAT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            config: *config,
            report,
        }
    }

    /// Wrap a single series
    pub fn encode_series(&self, series: Series, view: View) -> SeriesPayload {
        SeriesPayload {
            format_version: FORMAT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            view: view.as_str().to_string(),
            series,
        }
    }

    /// Encode a cohort report to a JSON string
    pub fn report_to_json(
        &self,
        report: CohortReport,
        config: &TransformConfig,
    ) -> Result<String, ComputeError> {
        let payload = self.encode_report(report, config);
        serde_json::to_string(&payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Encode a single series to a JSON string
    pub fn series_to_json(&self, series: Series, view: View) -> Result<String, ComputeError> {
        let payload = self.encode_series(series, view);
        serde_json::to_string(&payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
