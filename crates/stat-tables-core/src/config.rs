// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ESTAT_APP_ID_ENV: &str = "ESTAT_APP_ID";
pub const OWM_APP_ID_ENV: &str = "OWM_APP_ID";

pub const DEFAULT_STATS_ENDPOINT: &str = "https://api.e-stat.go.jp/rest/3.0/app/json/getStatsData";
pub const DEFAULT_WEATHER_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

/// New farmer survey (新規就農者調査).
pub const DEFAULT_STATS_DATA_ID: &str = "0002110241";
pub const DEFAULT_LIMIT: u32 = 60;

pub const DEFAULT_CITIES: [&str; 13] = [
    "Sapporo",
    "Kushiro",
    "Sendai",
    "Niigata",
    "Tokyo",
    "Kanazawa",
    "Hiroshima",
    "Nagoya",
    "Osaka",
    "Kochi",
    "Fukushima",
    "Kagoshima",
    "Naha",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsApiConfig {
    /// e-Stat application ID (`appId`).
    pub credential: String,
    pub endpoint: String,
    pub limit: u32,
    /// `J` or `E`.
    pub language: String,
    pub stats_data_id: String,
    pub timeout_secs: u64,
}

impl Default for StatsApiConfig {
    fn default() -> Self {
        Self {
            credential: String::new(),
            endpoint: DEFAULT_STATS_ENDPOINT.to_string(),
            limit: DEFAULT_LIMIT,
            language: "J".to_string(),
            stats_data_id: DEFAULT_STATS_DATA_ID.to_string(),
            timeout_secs: crate::http::DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherApiConfig {
    /// OpenWeatherMap API key (`appid`).
    pub credential: String,
    pub endpoint: String,
    pub units: String,
    pub language: String,
    /// Appended to every city as `<city>,<country>`.
    pub country: String,
    pub cities: Vec<String>,
    pub timeout_secs: u64,
    /// Concurrent requests; 1 keeps the loop strictly sequential.
    pub jobs: usize,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            credential: String::new(),
            endpoint: DEFAULT_WEATHER_ENDPOINT.to_string(),
            units: "metric".to_string(),
            language: "ja".to_string(),
            country: "JP".to_string(),
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            timeout_secs: crate::http::DEFAULT_TIMEOUT_SECS,
            jobs: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stats: StatsApiConfig,
    pub weather: WeatherApiConfig,
}

impl AppConfig {
    /// Overrides credentials from `ESTAT_APP_ID` / `OWM_APP_ID` when set.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ESTAT_APP_ID_ENV).filter(|k| !k.trim().is_empty()) {
            self.stats.credential = key;
        }
        if let Some(key) = lookup(OWM_APP_ID_ENV).filter(|k| !k.trim().is_empty()) {
            self.weather.credential = key;
        }
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Copy with credentials masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.stats.credential = mask(&copy.stats.credential);
        copy.weather.credential = mask(&copy.weather.credential);
        copy
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        let tail: String = secret
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", tail)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::in_dir(&crate::get_config_root())
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config_path: dir.join("config.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reads `config.json`; a missing file means defaults.
    pub fn load(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            log::debug!(
                "No config file, using defaults — config_path={}",
                self.config_path.display()
            );
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read {}", self.config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.config_path.display()))
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let content = config.to_pretty_json()?;

        fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_api_contract() {
        let config = AppConfig::default();
        assert_eq!(config.stats.limit, 60);
        assert_eq!(config.stats.language, "J");
        assert_eq!(config.weather.units, "metric");
        assert_eq!(config.weather.language, "ja");
        assert_eq!(config.weather.cities.len(), 13);
        assert_eq!(config.weather.cities[1], "Kushiro");
        assert_eq!(config.weather.jobs, 1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"stats": {"limit": 10}, "weather": {"cities": ["Naha"]}}"#)
                .unwrap();
        assert_eq!(config.stats.limit, 10);
        assert_eq!(config.stats.endpoint, DEFAULT_STATS_ENDPOINT);
        assert_eq!(config.weather.cities, vec!["Naha".to_string()]);
        assert_eq!(config.weather.country, "JP");
    }

    #[test]
    fn test_env_overrides_credentials() {
        let env = HashMap::from([
            (ESTAT_APP_ID_ENV, "estat-key".to_string()),
            (OWM_APP_ID_ENV, "   ".to_string()),
        ]);
        let mut config = AppConfig::default();
        config.weather.credential = "from-file".to_string();

        config.apply_env_with(|k| env.get(k).cloned());

        assert_eq!(config.stats.credential, "estat-key");
        assert_eq!(config.weather.credential, "from-file");
    }

    #[test]
    fn test_redacted_masks_all_but_tail() {
        let mut config = AppConfig::default();
        config.stats.credential = "f4d64065649092f8".to_string();
        let shown = config.redacted();
        assert_eq!(shown.stats.credential, "****92f8");
        assert_eq!(shown.weather.credential, "");
    }
}
