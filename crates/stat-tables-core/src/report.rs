// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::table::Table;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "table" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}' (expected text, csv or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// A finished table plus where and when it came from.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub fetched_at: DateTime<Utc>,
    pub table: Table,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title: &'a str,
    fetched_at: DateTime<Utc>,
    columns: &'a [String],
    rows: Vec<Map<String, Value>>,
}

impl Report {
    pub fn new(title: impl Into<String>, table: Table) -> Self {
        Self {
            title: title.into(),
            fetched_at: Utc::now(),
            table,
        }
    }

    pub fn write_to<W: Write>(&self, mut out: W, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Text => {
                write!(out, "{}", self.table.render())?;
                writeln!(
                    out,
                    "\n[{} rows x {} columns] {} ({})",
                    self.table.len(),
                    self.table.columns().len(),
                    self.title,
                    self.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
                )?;
            }
            OutputFormat::Csv => self.table.write_csv(out)?,
            OutputFormat::Json => {
                let doc = JsonReport {
                    title: &self.title,
                    fetched_at: self.fetched_at,
                    columns: self.table.columns(),
                    rows: self.table.to_records(),
                };
                serde_json::to_writer_pretty(&mut out, &doc)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}
