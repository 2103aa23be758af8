// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! A small column-ordered table of JSON cells.
//!
//! Columns keep the order in which they were first seen across the input
//! records. Cells are `serde_json::Value` so numbers stay numbers and absent
//! fields show up as `null`.

use crate::{Result, StatError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from JSON objects. Columns are the union of all keys.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Appends a row. Short rows are padded with nulls, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Replaces string cells of `column` found in `mapping`; everything else is kept.
    pub fn replace_values(&mut self, column: &str, mapping: &HashMap<String, String>) -> Result<usize> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| StatError::MissingColumn(column.to_string()))?;

        let mut replaced = 0;
        for row in &mut self.rows {
            if let Value::String(code) = &row[idx] {
                if let Some(label) = mapping.get(code) {
                    row[idx] = Value::String(label.clone());
                    replaced += 1;
                }
            }
        }
        Ok(replaced)
    }

    /// Renames columns in one step. Every lookup uses the names as they were
    /// before the call, so `a -> b` and `b -> c` never chain into `a -> c`.
    pub fn rename_columns(&mut self, renames: &HashMap<String, String>) {
        self.columns = self
            .columns
            .iter()
            .map(|c| renames.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect();
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(cell_text))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Plain-text rendering with a leading row index, columns padded to width.
    pub fn render(&self) -> String {
        let index_width = self.rows.len().saturating_sub(1).to_string().len();
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        out.push_str(&" ".repeat(index_width));
        for (name, w) in self.columns.iter().zip(&widths) {
            out.push_str("  ");
            out.push_str(&pad_left(name, *w));
        }
        out.push('\n');

        for (i, row) in cells.iter().enumerate() {
            out.push_str(&pad_right(&i.to_string(), index_width));
            for (cell, w) in row.iter().zip(&widths) {
                out.push_str("  ");
                out.push_str(&pad_left(cell, *w));
            }
            out.push('\n');
        }
        out
    }
}

/// Display text of a cell: strings unquoted, null as `NaN`.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NaN".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pad_left(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{}{}", " ".repeat(width.saturating_sub(len)), s)
}

fn pad_right(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{}{}", s, " ".repeat(width.saturating_sub(len)))
}
