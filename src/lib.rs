//! Vivarium Flux - Transformation pipeline for rodent activity and temperature recordings
//!
//! Flux turns minute-by-minute per-animal readings into plot-ready series
//! through a deterministic pipeline: column extraction → per-subject
//! normalization → row and periodic aggregation → trailing smoothing.
//!
//! ## Modules
//!
//! - **Activity path**: normalize each animal by its maximum, average, smooth
//! - **Temperature path**: plain per-minute mean across animals
//! - **Periodic views**: hour-of-day profiles and per-day means

pub mod aggregation;
pub mod config;
pub mod encoder;
pub mod error;
pub mod extraction;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod smoothing;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{RecordingLayout, TransformConfig, UndefinedPolicy};
pub use error::ComputeError;
pub use extraction::{extract_subjects, TableAdapter, TableFormat};
pub use loader::{load_cohort, DatasetSource, DirectorySource};
pub use pipeline::{activity_series, process_cohort, temperature_series, SeriesTransformer, View};
pub use types::{CohortReport, CohortTables, Dataset, Point, Series, SubjectId, Table};

/// Flux version embedded in all payloads
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for payloads
pub const PRODUCER_NAME: &str = "vivarium-flux";
