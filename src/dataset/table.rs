//! In-memory tabular model
//!
//! A `Table` is an ordered sequence of rows; each row maps a column name to
//! a `Value`. The column list is the union of keys seen across rows, in
//! first-seen order. An absent cell reads as `Value::Null`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single cell value. Data loaded from delimited files is always
/// string-typed (empty cells become `Null`); columns written by the
/// scoring engine carry native ints and bools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric cells as whole seconds. Floats round to the nearest integer;
    /// non-finite or out-of-range floats read as non-numeric.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) => {
                if !f.is_finite() {
                    return None;
                }
                let rounded = f.round();
                if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
                    return None;
                }
                Some(rounded as i64)
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Cell text for delimited output; `Null` renders as the empty string.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

pub type Row = HashMap<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Append a row, registering any new column names in first-seen order.
    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            if !self.has_column(key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Append a row from (column, value) pairs, preserving pair order for
    /// first-seen column registration.
    pub fn push_row_ordered(&mut self, pairs: Vec<(String, Value)>) {
        let mut row = Row::with_capacity(pairs.len());
        for (key, value) in pairs {
            if !self.has_column(&key) {
                self.columns.push(key.clone());
            }
            row.insert(key, value);
        }
        self.rows.push(row);
    }

    /// Cell accessor; absent cells read as `Null`.
    pub fn get(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Value::Null)
    }

    /// Set one cell, registering the column if it is new.
    pub fn set(&mut self, row: usize, column: &str, value: Value) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        if let Some(r) = self.rows.get_mut(row) {
            r.insert(column.to_string(), value);
        }
    }

    /// Set a whole column from a per-row closure. Registers the column.
    pub fn set_column<F>(&mut self, column: &str, mut f: F)
    where
        F: FnMut(&Row) -> Value,
    {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        for row in &mut self.rows {
            let value = f(row);
            row.insert(column.to_string(), value);
        }
    }

    /// Stable ascending sort by a numeric column. Rows whose value is not
    /// numeric (or absent) sort last; ties keep their original order.
    pub fn sort_by_numeric_column(&mut self, column: &str) {
        let mut indices: Vec<usize> = (0..self.rows.len()).collect();
        indices.sort_by_key(|&i| match self.get(i, column).as_i64() {
            Some(v) => (0u8, v),
            None => (1u8, 0),
        });
        let mut reordered = Vec::with_capacity(self.rows.len());
        let mut rows = std::mem::take(&mut self.rows);
        // Drain in index order without cloning rows.
        let mut slots: Vec<Option<Row>> = rows.drain(..).map(Some).collect();
        for i in indices {
            if let Some(row) = slots[i].take() {
                reordered.push(row);
            }
        }
        self.rows = reordered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_keep_first_seen_order() {
        let mut table = Table::new();
        table.push_row_ordered(vec![
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
        ]);
        table.push_row_ordered(vec![
            ("b".to_string(), Value::Int(3)),
            ("c".to_string(), Value::Int(4)),
        ]);
        assert_eq!(table.columns(), ["a", "b", "c"]);
        assert!(table.get(1, "a").is_null());
    }

    #[test]
    fn float_cells_round_to_seconds_and_reject_non_finite() {
        assert_eq!(Value::Float(1699999999.6).as_i64(), Some(1700000000));
        assert_eq!(Value::Float(-0.4).as_i64(), Some(0));
        assert_eq!(Value::Float(f64::NAN).as_i64(), None);
        assert_eq!(Value::Float(f64::INFINITY).as_i64(), None);
        assert_eq!(Value::Float(1e300).as_i64(), None);
    }

    #[test]
    fn numeric_sort_is_stable_with_nulls_last() {
        let mut table = Table::new();
        for (tag, ts) in [("x", Some(30)), ("y", None), ("z", Some(10)), ("w", Some(10))] {
            let ts_value = ts.map(Value::Int).unwrap_or(Value::Null);
            table.push_row_ordered(vec![
                ("tag".to_string(), Value::from(tag)),
                ("ts".to_string(), ts_value),
            ]);
        }
        table.sort_by_numeric_column("ts");
        let tags: Vec<&str> = (0..4)
            .map(|i| table.get(i, "tag").as_str().unwrap())
            .collect();
        assert_eq!(tags, ["z", "w", "x", "y"]);
    }
}
