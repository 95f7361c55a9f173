//! Pipeline
//!
//! Composition of the whole classify-score-correlate flow: load a raw log
//! source into a dataset, run the scoring engine over it, persist the
//! result. Load and save can be dispatched through the task pool so the
//! caller's thread is never blocked on I/O; the pool swallows unit errors
//! (they are logged and kept in the handle slot), so after a pooled phase
//! the pipeline checks the dataset state out-of-band.

use std::sync::Arc;

use crate::dataset::{TabularDataset, DEFAULT_DATE_FORMAT, LOAD_DATE_COL};
use crate::error::{Error, Result};
use crate::pool::TaskPool;
use crate::scoring::{RiskScoringEngine, ScoringConfig};

/// Per-run concurrency switches. The I/O phases go through the pool only
/// when asked to; everything else runs on the caller's thread.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub pooled_load: bool,
    pub pooled_save: bool,
    /// Stamp every row with the load date before scoring.
    pub stamp_load_date: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            pooled_load: true,
            pooled_save: true,
            stamp_load_date: true,
        }
    }
}

pub struct Pipeline {
    pool: Arc<TaskPool>,
    engine: RiskScoringEngine,
}

impl Pipeline {
    pub fn new(pool: Arc<TaskPool>, config: ScoringConfig) -> Self {
        Self {
            pool,
            engine: RiskScoringEngine::new(config),
        }
    }

    /// Load, score, persist. Configuration errors (unsupported format,
    /// unscored pattern) abort; UNKNOWN-classified rows are expected data
    /// and flow through scoring.
    pub fn run(&self, dataset: &Arc<TabularDataset>, options: PipelineOptions) -> Result<()> {
        self.load_phase(dataset, options.pooled_load)?;

        if options.stamp_load_date {
            dataset.add_load_date(LOAD_DATE_COL, DEFAULT_DATE_FORMAT)?;
        }

        log::info!("dataset '{}': scoring events", dataset.id());
        dataset.apply(|table| self.engine.run_all(table))?;

        self.save_phase(dataset, options.pooled_save)
    }

    fn load_phase(&self, dataset: &Arc<TabularDataset>, pooled: bool) -> Result<()> {
        if pooled {
            let worker = Arc::clone(dataset);
            self.pool
                .submit(format!("load '{}'", dataset.id()), move || worker.load());
            // Barrier: nothing past this point may touch the table before
            // the load unit has finished.
            self.pool.wait_all();
            // The pool only signals completion; probe the dataset state to
            // learn whether the load actually succeeded.
            if !dataset.is_loaded() {
                return Err(Error::DataNotLoaded {
                    dataset_id: dataset.id().to_string(),
                });
            }
            Ok(())
        } else {
            dataset.load()
        }
    }

    fn save_phase(&self, dataset: &Arc<TabularDataset>, pooled: bool) -> Result<()> {
        if pooled {
            let worker = Arc::clone(dataset);
            let handle = self
                .pool
                .submit(format!("save '{}'", dataset.id()), move || worker.save(None));
            self.pool.wait_all();
            // Surface the stored outcome so a synchronous caller still
            // learns about a failed save.
            handle.result().unwrap_or(Ok(()))
        } else {
            dataset.save(None)
        }
    }
}
