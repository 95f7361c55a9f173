//! Tabular codecs and atomic persistence
//!
//! CSV input is read with one header row and everything string-typed
//! (empty cells become nulls); JSON input is an array of objects. Output
//! fully replaces the destination: the table is written to a temporary
//! file next to the destination and renamed into place, so a failed save
//! never leaves partial content behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::config::{DataFormat, DatasetDescriptor};
use crate::dataset::table::{Table, Value};
use crate::error::{Error, Result};

/// Validate that a source path exists and is a regular file.
pub fn check_source(descriptor: &DatasetDescriptor, path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::SourceNotFound {
            dataset_id: descriptor.id.clone(),
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(Error::SourceNotAFile {
            dataset_id: descriptor.id.clone(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn invalid_source(descriptor: &DatasetDescriptor, path: &Path, reason: String) -> Error {
    Error::EmptyOrInvalidSource {
        dataset_id: descriptor.id.clone(),
        path: path.to_path_buf(),
        reason,
    }
}

/// Read a delimited file into a table. All cells come back as strings,
/// except empty cells which become nulls.
pub fn read_csv(descriptor: &DatasetDescriptor, path: &Path) -> Result<Table> {
    check_source(descriptor, path)?;

    let file =
        File::open(path).map_err(|e| invalid_source(descriptor, path, e.to_string()))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(descriptor.csv.delimiter)
        .quote(descriptor.csv.quote)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| invalid_source(descriptor, path, e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(invalid_source(
            descriptor,
            path,
            "no header row".to_string(),
        ));
    }

    let mut table = Table::new();
    for record in reader.records() {
        let record = record.map_err(|e| invalid_source(descriptor, path, e.to_string()))?;
        let mut pairs = Vec::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = match record.get(i) {
                Some("") | None => Value::Null,
                Some(cell) => Value::Str(cell.to_string()),
            };
            pairs.push((header.clone(), value));
        }
        table.push_row_ordered(pairs);
    }
    Ok(table)
}

/// Read a JSON array of objects into a table.
pub fn read_json(descriptor: &DatasetDescriptor, path: &Path) -> Result<Table> {
    check_source(descriptor, path)?;

    let file =
        File::open(path).map_err(|e| invalid_source(descriptor, path, e.to_string()))?;
    let parsed: serde_json::Value = serde_json::from_reader(io::BufReader::new(file))
        .map_err(|e| invalid_source(descriptor, path, e.to_string()))?;

    let records = parsed.as_array().ok_or_else(|| {
        invalid_source(descriptor, path, "expected a JSON array of objects".to_string())
    })?;

    let mut table = Table::new();
    for record in records {
        let object = record.as_object().ok_or_else(|| {
            invalid_source(descriptor, path, "array element is not an object".to_string())
        })?;
        let mut pairs = Vec::with_capacity(object.len());
        for (key, value) in object {
            pairs.push((key.clone(), json_to_value(value)));
        }
        table.push_row_ordered(pairs);
    }
    Ok(table)
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        other => Value::Str(other.to_string()),
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::json!(n),
        Value::Float(f) => serde_json::json!(f),
        Value::Str(s) => serde_json::Value::String(s.clone()),
    }
}

fn write_csv<W: Write>(descriptor: &DatasetDescriptor, table: &Table, out: W) -> io::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(descriptor.csv.delimiter)
        .quote(descriptor.csv.quote)
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(out);

    writer.write_record(table.columns())?;
    for i in 0..table.row_count() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|c| table.get(i, c).render())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()
}

fn write_json<W: Write>(table: &Table, mut out: W) -> io::Result<()> {
    let records: Vec<serde_json::Value> = (0..table.row_count())
        .map(|i| {
            let object: serde_json::Map<String, serde_json::Value> = table
                .columns()
                .iter()
                .map(|c| (c.clone(), value_to_json(table.get(i, c))))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();
    let json = serde_json::to_string_pretty(&records)?;
    out.write_all(json.as_bytes())
}

/// Persist a table, fully replacing the destination. Writes to a temp file
/// in the destination's directory and renames, so partial output is never
/// left in place on failure.
pub fn save_table(
    descriptor: &DatasetDescriptor,
    table: &Table,
    path: &Path,
    format: DataFormat,
) -> Result<()> {
    if format == DataFormat::Log {
        // Log is an input-only format; there is no log writer.
        return Err(Error::UnsupportedFormat {
            dataset_id: descriptor.id.clone(),
            format: format.as_str().to_string(),
        });
    }

    if path.exists() && !path.is_file() {
        return Err(Error::InvalidDestination {
            dataset_id: descriptor.id.clone(),
            path: path.to_path_buf(),
        });
    }

    let unwritable = |reason: String| Error::DestinationUnwritable {
        dataset_id: descriptor.id.clone(),
        path: path.to_path_buf(),
        reason,
    };

    let parent = match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(unwritable("no parent directory".to_string())),
    };
    if !parent.is_dir() {
        return Err(unwritable("parent directory does not exist".to_string()));
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| unwritable("invalid destination file name".to_string()))?;
    let tmp_path = parent.join(format!(".{}.tmp", file_name));

    let result = (|| -> io::Result<()> {
        let file = File::create(&tmp_path)?;
        match format {
            DataFormat::Csv => write_csv(descriptor, table, file)?,
            DataFormat::Json => write_json(table, file)?,
            DataFormat::Log => unreachable!("rejected above"),
        }
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(unwritable(e.to_string()));
    }
    Ok(())
}
