// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

pub mod config;
pub mod estat;
pub mod http;
pub mod normalize;
pub mod report;
pub mod table;
pub mod weather;

use std::path::PathBuf;
use thiserror::Error;

/// Environment variable that relocates the config root (used heavily by tests).
pub const CONFIG_DIR_ENV: &str = "STAT_TABLES_CONFIG_DIR";

#[derive(Error, Debug)]
pub enum StatError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("API reported status {status}: {message}")]
    Api { status: i64, message: String },
    #[error("Unexpected response shape: missing or invalid `{0}`")]
    UnexpectedShape(String),
    #[error("Column `{0}` not found in table")]
    MissingColumn(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = StatError> = std::result::Result<T, E>;

/// Returns the directory holding `config.json`.
///
/// `STAT_TABLES_CONFIG_DIR` wins when set; otherwise the platform config
/// directory, falling back to the working directory.
pub fn get_config_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("org", "stat-tables", "stat-tables")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
