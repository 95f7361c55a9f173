//! authrisk — OpenSSH authentication log risk analyzer
//!
//! An in-process batch pipeline over a bounded, memory-resident event set:
//! ingest line-oriented OpenSSH log records, classify each line against an
//! ordered set of structural patterns, derive a risk score per event, and
//! correlate brute-force attempts with later successful logins for the
//! same identity to escalate risk.
//!
//! The crate is a library invoked by a thin driver; there is no network
//! surface, no persistence engine, and no query language.

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod scoring;

pub use classifier::{classify, ParsedEvent, UNKNOWN_PATTERN};
pub use config::{CsvOptions, DataFormat, DatasetDescriptor};
pub use dataset::{TabularDataset, Table, Value};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOptions};
pub use pool::{TaskPool, DEFAULT_WORKERS};
pub use scoring::{RiskScoringEngine, ScoringConfig};
