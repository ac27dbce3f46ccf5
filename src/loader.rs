//! Dataset loading
//!
//! The four tables of a recording are loaded concurrently and joined before
//! any transformation starts. If one load fails the whole cohort fails and
//! nothing downstream runs.

use crate::error::ComputeError;
use crate::extraction::{TableAdapter, TableFormat};
use crate::types::{CohortTables, Dataset, Table};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

/// Source the datasets of a recording are loaded from
pub trait DatasetSource {
    /// Load and convert one dataset
    fn load(&self, dataset: Dataset) -> Result<Table, ComputeError>;
}

/// Datasets stored as `<stem>.json` or `<stem>.ndjson` files in one directory.
///
/// Stems are `Female_Act`, `Male_Act`, `Female_Temp` and `Male_Temp`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding a dataset, if one exists
    pub fn path_for(&self, dataset: Dataset) -> Option<PathBuf> {
        ["json", "ndjson", "jsonl"]
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", dataset.file_stem(), ext)))
            .find(|path| path.is_file())
    }
}

impl DatasetSource for DirectorySource {
    fn load(&self, dataset: Dataset) -> Result<Table, ComputeError> {
        let path = self.path_for(dataset).ok_or_else(|| ComputeError::DatasetLoad {
            dataset: dataset.to_string(),
            message: format!(
                "no {}.json or {}.ndjson in {}",
                dataset.file_stem(),
                dataset.file_stem(),
                self.dir.display()
            ),
        })?;

        debug!("loading {} from {}", dataset, path.display());
        let input = fs::read_to_string(&path)?;
        TableAdapter::parse_table(&input, TableFormat::from_path(&path))
    }
}

/// Load all four datasets concurrently and wait for every one of them.
///
/// Returns the first failure in dataset order, tagged with the dataset name.
pub fn load_cohort<S>(source: &S) -> Result<CohortTables, ComputeError>
where
    S: DatasetSource + Sync,
{
    let results: Vec<(Dataset, Result<Table, ComputeError>)> = thread::scope(|scope| {
        let handles: Vec<_> = Dataset::ALL
            .iter()
            .map(|&dataset| (dataset, scope.spawn(move || source.load(dataset))))
            .collect();

        handles
            .into_iter()
            .map(|(dataset, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(ComputeError::DatasetLoad {
                        dataset: dataset.to_string(),
                        message: "loader thread panicked".to_string(),
                    })
                });
                (dataset, result)
            })
            .collect()
    });

    let mut tables = CohortTables::default();
    for (dataset, result) in results {
        let table = result.map_err(|e| match e {
            ComputeError::DatasetLoad { .. } => e,
            other => ComputeError::DatasetLoad {
                dataset: dataset.to_string(),
                message: other.to_string(),
            },
        })?;

        let slot = match dataset {
            Dataset::FemaleActivity => &mut tables.female_activity,
            Dataset::MaleActivity => &mut tables.male_activity,
            Dataset::FemaleTemperature => &mut tables.female_temperature,
            Dataset::MaleTemperature => &mut tables.male_temperature,
        };
        *slot = table;
    }

    info!(
        "loaded cohort: {} female / {} male activity rows",
        tables.female_activity.len(),
        tables.male_activity.len()
    );
    Ok(tables)
}
