// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::config::WeatherApiConfig;
use crate::http::{HttpSource, JsonSource};
use crate::table::Table;
use crate::{Result, StatError};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Placed in every data column of a city whose request failed.
pub const ERROR_SENTINEL: &str = "Error";

pub const COLUMN_CITY: &str = "地域";
pub const COLUMN_TEMP_MIN: &str = "最低気温(°C)";
pub const COLUMN_TEMP_MAX: &str = "最高気温(°C)";
pub const COLUMN_WEATHER: &str = "天気";

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    main: OwmMain,
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityWeather {
    /// Name as resolved by the API, not necessarily the query string.
    pub city: String,
    pub temp_min: f64,
    pub temp_max: f64,
    pub description: String,
}

impl CityWeather {
    pub fn from_json(body: Value) -> Result<Self> {
        let parsed: OwmResponse = serde_json::from_value(body)
            .map_err(|e| StatError::UnexpectedShape(format!("name/main/weather ({})", e)))?;
        let description = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| StatError::UnexpectedShape("weather[0].description".to_string()))?;

        Ok(Self {
            city: parsed.name,
            temp_min: parsed.main.temp_min,
            temp_max: parsed.main.temp_max,
            description,
        })
    }
}

/// What happened for one requested city.
#[derive(Debug)]
pub struct CityOutcome {
    /// The city as it was requested.
    pub city: String,
    pub result: Result<CityWeather>,
}

impl CityOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn row(&self) -> Vec<Value> {
        match &self.result {
            Ok(w) => vec![
                Value::from(w.city.clone()),
                Value::from(w.temp_min),
                Value::from(w.temp_max),
                Value::from(w.description.clone()),
            ],
            Err(_) => vec![
                Value::from(self.city.clone()),
                Value::from(ERROR_SENTINEL),
                Value::from(ERROR_SENTINEL),
                Value::from(ERROR_SENTINEL),
            ],
        }
    }
}

pub fn weather_columns() -> Vec<String> {
    [COLUMN_CITY, COLUMN_TEMP_MIN, COLUMN_TEMP_MAX, COLUMN_WEATHER]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

pub fn outcomes_to_table(outcomes: &[CityOutcome]) -> Table {
    let mut table = Table::new(weather_columns());
    for outcome in outcomes {
        table.push_row(outcome.row());
    }
    table
}

pub struct WeatherEngine<S: JsonSource = HttpSource> {
    source: S,
    config: WeatherApiConfig,
}

impl WeatherEngine<HttpSource> {
    pub fn new(config: WeatherApiConfig) -> Result<Self> {
        let source = HttpSource::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_source(source, config))
    }
}

impl<S: JsonSource> WeatherEngine<S> {
    pub fn with_source(source: S, config: WeatherApiConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn query_params(&self, city: &str) -> Vec<(&'static str, String)> {
        let q = if self.config.country.is_empty() {
            city.to_string()
        } else {
            format!("{},{}", city, self.config.country)
        };
        vec![
            ("q", q),
            ("appid", self.config.credential.clone()),
            ("units", self.config.units.clone()),
            ("lang", self.config.language.clone()),
        ]
    }

    /// One GET for one city, no retry.
    pub fn fetch_city(&self, city: &str) -> Result<CityWeather> {
        let body = self
            .source
            .get_json(&self.config.endpoint, &self.query_params(city))?;
        CityWeather::from_json(body)
    }

    fn outcome(&self, city: &str) -> CityOutcome {
        let result = self.fetch_city(city);
        match &result {
            Ok(w) => debug!(
                "Weather fetched — city={} resolved={} min={} max={}",
                city, w.city, w.temp_min, w.temp_max
            ),
            Err(e) => error!("Failed to get data for {}: {}", city, e),
        }
        CityOutcome {
            city: city.to_string(),
            result,
        }
    }

    /// Fetches every city, one outcome per city in input order.
    ///
    /// A failing city never stops the others. Only a missing credential
    /// fails the whole call, since every request would be rejected anyway.
    pub fn collect(&self, cities: &[String]) -> Result<Vec<CityOutcome>> {
        if self.config.credential.trim().is_empty() {
            return Err(StatError::Config(
                "OpenWeatherMap credential is empty; set OWM_APP_ID or weather.credential"
                    .to_string(),
            ));
        }

        info!(
            "Fetching weather — cities={} jobs={}",
            cities.len(),
            self.config.jobs
        );

        let outcomes = if self.config.jobs > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.jobs)
                .build()
            {
                Ok(pool) => pool.install(|| {
                    cities
                        .par_iter()
                        .map(|city| self.outcome(city))
                        .collect::<Vec<_>>()
                }),
                Err(e) => {
                    warn!("Could not start worker pool, fetching sequentially: {}", e);
                    cities.iter().map(|city| self.outcome(city)).collect()
                }
            }
        } else {
            cities.iter().map(|city| self.outcome(city)).collect()
        };

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        if failed > 0 {
            warn!("Weather fetch finished with {} of {} cities failed", failed, cities.len());
        }
        Ok(outcomes)
    }

    pub fn collect_table(&self, cities: &[String]) -> Result<Table> {
        Ok(outcomes_to_table(&self.collect(cities)?))
    }
}
