//! Dataset configuration
//!
//! A `DatasetDescriptor` is built once by the driver and never mutated.
//! It tells a `TabularDataset` where its data lives, how it is encoded,
//! which columns must be present after a load, and whether the dataset
//! should be loaded eagerly on construction.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Supported data format tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Delimited tabular file with one header row.
    Csv,
    /// JSON array of objects.
    Json,
    /// Line-oriented OpenSSH authentication log, parsed by the classifier.
    Log,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Json => "json",
            DataFormat::Log => "log",
        }
    }

    /// Parse a format tag, mapping unknown tags to `UnsupportedFormat`.
    pub fn parse_tag(dataset_id: &str, tag: &str) -> crate::error::Result<Self> {
        tag.parse().map_err(|format| Error::UnsupportedFormat {
            dataset_id: dataset_id.to_string(),
            format,
        })
    }
}

impl FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            "log" | "opensshlog" => Ok(DataFormat::Log),
            other => Err(other.to_string()),
        }
    }
}

/// CSV encoding parameters. Output is always fully quoted UTF-8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
        }
    }
}

/// Immutable per-dataset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Identity string used in log lines and error messages.
    pub id: String,

    pub input_path: PathBuf,
    pub input_format: DataFormat,

    pub output_path: PathBuf,
    pub output_format: DataFormat,

    /// Columns that must be present after a successful load.
    pub mandatory_columns: Vec<String>,

    /// Load immediately on construction instead of on first use.
    pub eager_load: bool,

    pub csv: CsvOptions,
}

impl DatasetDescriptor {
    pub fn new(
        id: impl Into<String>,
        input_path: impl Into<PathBuf>,
        input_format: DataFormat,
        output_path: impl Into<PathBuf>,
        output_format: DataFormat,
        mandatory_columns: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            input_path: input_path.into(),
            input_format,
            output_path: output_path.into(),
            output_format,
            mandatory_columns,
            eager_load: false,
            csv: CsvOptions::default(),
        }
    }

    pub fn with_eager_load(mut self, eager: bool) -> Self {
        self.eager_load = eager;
        self
    }

    pub fn with_csv_options(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}
