//! Tabular Dataset
//!
//! Owns one mutable in-memory table loaded from and persisted to an
//! external source. Every read or mutation holds the dataset's own
//! exclusive lock for the duration of the operation; the lock is
//! per-instance and never shared across datasets, so independent datasets
//! can load and save concurrently.
//!
//! State machine: Unloaded -> Loading -> Loaded. A failed load leaves the
//! dataset Unloaded (retry is permitted); there is no Failed state. Any
//! operation other than `load` while not Loaded fails with `DataNotLoaded`.

pub mod io;
pub mod table;


use std::collections::HashMap;
use std::path::Path;

use chrono::Local;
use parking_lot::Mutex;

use crate::classifier;
use crate::config::{DataFormat, DatasetDescriptor};
use crate::error::{Error, Result};

pub use table::{Row, Table, Value};

/// Column stamped by `add_load_date`.
pub const LOAD_DATE_COL: &str = "load_date";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Unloaded,
    Loading,
    Loaded,
}

struct DatasetState {
    phase: LoadPhase,
    table: Table,
}

pub struct TabularDataset {
    descriptor: DatasetDescriptor,
    state: Mutex<DatasetState>,
}

impl TabularDataset {
    pub fn new(descriptor: DatasetDescriptor) -> Self {
        Self {
            descriptor,
            state: Mutex::new(DatasetState {
                phase: LoadPhase::Unloaded,
                table: Table::new(),
            }),
        }
    }

    /// Construct and, if the descriptor says so, load immediately.
    pub fn open(descriptor: DatasetDescriptor) -> Result<Self> {
        let eager = descriptor.eager_load;
        let dataset = Self::new(descriptor);
        if eager {
            dataset.load()?;
        }
        Ok(dataset)
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().phase == LoadPhase::Loaded
    }

    /// Read the configured source into the table and validate mandatory
    /// columns. On any failure the dataset returns to Unloaded and the
    /// error propagates.
    pub fn load(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.phase = LoadPhase::Loading;

        let result = self.read_source();
        match result {
            Ok(loaded) => {
                if let Err(e) = self.check_mandatory(&loaded) {
                    state.phase = LoadPhase::Unloaded;
                    return Err(e);
                }
                log::info!(
                    "dataset '{}': loaded {} row(s), {} column(s)",
                    self.descriptor.id,
                    loaded.row_count(),
                    loaded.columns().len()
                );
                state.table = loaded;
                state.phase = LoadPhase::Loaded;
                Ok(())
            }
            Err(e) => {
                state.phase = LoadPhase::Unloaded;
                Err(e)
            }
        }
    }

    fn read_source(&self) -> Result<Table> {
        let path = self.descriptor.input_path();
        match self.descriptor.input_format {
            DataFormat::Csv => io::read_csv(&self.descriptor, path),
            DataFormat::Json => io::read_json(&self.descriptor, path),
            DataFormat::Log => classifier::parse_source(&self.descriptor, path),
        }
    }

    fn check_mandatory(&self, table: &Table) -> Result<()> {
        let missing: Vec<String> = self
            .descriptor
            .mandatory_columns
            .iter()
            .filter(|c| !table.has_column(c))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MandatoryFieldsMissing {
                dataset_id: self.descriptor.id.clone(),
                missing,
            })
        }
    }

    /// Re-validate mandatory columns against the loaded table.
    pub fn validate_mandatory_fields(&self) -> Result<()> {
        let state = self.state.lock();
        if state.phase != LoadPhase::Loaded {
            return Err(self.not_loaded());
        }
        self.check_mandatory(&state.table)
    }

    fn not_loaded(&self) -> Error {
        Error::DataNotLoaded {
            dataset_id: self.descriptor.id.clone(),
        }
    }

    /// Persist the table to `path` (or the configured output path) in the
    /// configured output format. Writing is all-or-nothing.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let state = self.state.lock();
        if state.phase != LoadPhase::Loaded {
            return Err(self.not_loaded());
        }
        let destination = path.unwrap_or_else(|| self.descriptor.output_path());
        io::save_table(
            &self.descriptor,
            &state.table,
            destination,
            self.descriptor.output_format,
        )?;
        log::info!(
            "dataset '{}': saved {} row(s) to '{}'",
            self.descriptor.id,
            state.table.row_count(),
            destination.display()
        );
        Ok(())
    }

    /// Return, in row order, the `return_col` value of every row whose
    /// value in each pattern column is a member of the corresponding
    /// accepted set. Null cells match only if `Value::Null` is explicitly
    /// accepted for that column; null results are dropped.
    pub fn search(
        &self,
        pattern: &HashMap<String, Vec<Value>>,
        return_col: &str,
    ) -> Result<Vec<Value>> {
        let state = self.state.lock();
        if state.phase != LoadPhase::Loaded {
            return Err(self.not_loaded());
        }

        let mut missing: Vec<String> = pattern
            .keys()
            .filter(|c| !state.table.has_column(c))
            .cloned()
            .collect();
        if !state.table.has_column(return_col) {
            missing.push(return_col.to_string());
        }
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(Error::SearchColumnsMissing {
                dataset_id: self.descriptor.id.clone(),
                missing,
            });
        }

        let mut results = Vec::new();
        for i in 0..state.table.row_count() {
            let matches = pattern
                .iter()
                .all(|(column, accepted)| accepted.contains(state.table.get(i, column)));
            if matches {
                let value = state.table.get(i, return_col);
                if !value.is_null() {
                    results.push(value.clone());
                }
            }
        }
        Ok(results)
    }

    /// Stamp every row with the current local date.
    pub fn add_load_date(&self, column: &str, date_format: &str) -> Result<()> {
        let stamp = Local::now().format(date_format).to_string();
        self.apply(|table| {
            table.set_column(column, |_| Value::Str(stamp.clone()));
            Ok(())
        })
    }

    /// Run a closure over the table under the dataset lock. This is how
    /// the scoring engine reaches the table.
    pub fn apply<R>(&self, f: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        let mut state = self.state.lock();
        if state.phase != LoadPhase::Loaded {
            return Err(self.not_loaded());
        }
        f(&mut state.table)
    }

    /// Read-only variant of `apply`.
    pub fn inspect<R>(&self, f: impl FnOnce(&Table) -> R) -> Result<R> {
        let state = self.state.lock();
        if state.phase != LoadPhase::Loaded {
            return Err(self.not_loaded());
        }
        Ok(f(&state.table))
    }
}
