// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Client for the e-Stat `getStatsData` endpoint.
//!
//! Response layout (only the parts we read):
//!
//! - `GET_STATS_DATA.RESULT.{STATUS,ERROR_MSG}`: 0 ok, 1 ok but no data,
//!   2 ok with ignored parameters, 100+ errors
//! - `GET_STATS_DATA.STATISTICAL_DATA.DATA_INF.VALUE`: observation records,
//!   one object or an array
//! - `GET_STATS_DATA.STATISTICAL_DATA.CLASS_INF.CLASS_OBJ`: dimension
//!   metadata, one object or an array; each `CLASS` is again one or many

use crate::config::StatsApiConfig;
use crate::http::{HttpSource, JsonSource};
use crate::table::Table;
use crate::{Result, StatError};
use log::{debug, error, info};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

const ROOT: &str = "GET_STATS_DATA";
const RESULT_PATH: [&str; 2] = [ROOT, "RESULT"];
const VALUE_PATH: [&str; 4] = [ROOT, "STATISTICAL_DATA", "DATA_INF", "VALUE"];
const CLASS_OBJ_PATH: [&str; 4] = [ROOT, "STATISTICAL_DATA", "CLASS_INF", "CLASS_OBJ"];

const STATUS_NO_DATA: i64 = 1;
const FIRST_ERROR_STATUS: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    OneOrMany::deserialize(deserializer).map(OneOrMany::into_vec)
}

/// One code/label pair of a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEntry {
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@level", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(rename = "@unit", default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "@parentCode", default, skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
}

/// Metadata for one dimension (`CLASS_OBJ` element).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassObj {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "CLASS", deserialize_with = "one_or_many")]
    pub classes: Vec<ClassEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiResult {
    #[serde(rename = "STATUS", deserialize_with = "lenient_i64")]
    status: i64,
    #[serde(rename = "ERROR_MSG", default)]
    error_msg: String,
}

/// e-Stat sends STATUS as a number, but tolerate "0" too.
fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom("STATUS is not an integer")),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "unexpected STATUS value {}",
            other
        ))),
    }
}

/// Walks `path` through nested objects, naming the first missing segment.
fn navigate<'a>(doc: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut current = doc;
    for (depth, key) in path.iter().enumerate() {
        current = current
            .get(key)
            .ok_or_else(|| StatError::UnexpectedShape(path[..=depth].join(".")))?;
    }
    Ok(current)
}

/// A parsed `getStatsData` response body.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsDocument {
    body: Value,
}

impl StatsDocument {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// `RESULT.STATUS`, if the response carries one.
    pub fn status(&self) -> Option<i64> {
        let result = navigate(&self.body, &RESULT_PATH).ok()?;
        ApiResult::deserialize(result).ok().map(|r| r.status)
    }

    /// Fails when e-Stat reported an error status inside a 2xx response.
    pub fn check_status(&self) -> Result<()> {
        let Ok(result) = navigate(&self.body, &RESULT_PATH) else {
            return Ok(());
        };
        let result = ApiResult::deserialize(result)
            .map_err(|_| StatError::UnexpectedShape(RESULT_PATH.join(".")))?;
        if result.status >= FIRST_ERROR_STATUS {
            return Err(StatError::Api {
                status: result.status,
                message: result.error_msg,
            });
        }
        Ok(())
    }

    /// Observation records as a table, still coded.
    pub fn records(&self) -> Result<Table> {
        let value = match navigate(&self.body, &VALUE_PATH) {
            Ok(v) => v,
            // "no matching data" responses omit DATA_INF entirely
            Err(_) if self.status() == Some(STATUS_NO_DATA) => return Ok(Table::default()),
            Err(e) => return Err(e),
        };
        let records = OneOrMany::<Map<String, Value>>::deserialize(value)
            .map_err(|_| StatError::UnexpectedShape(VALUE_PATH.join(".")))?
            .into_vec();
        debug!("Extracted observation records — count={}", records.len());
        Ok(Table::from_records(&records))
    }

    /// Dimension metadata in response order.
    pub fn class_objects(&self) -> Result<Vec<ClassObj>> {
        let value = match navigate(&self.body, &CLASS_OBJ_PATH) {
            Ok(v) => v,
            Err(_) if self.status() == Some(STATUS_NO_DATA) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        OneOrMany::<ClassObj>::deserialize(value)
            .map(OneOrMany::into_vec)
            .map_err(|e| {
                StatError::UnexpectedShape(format!("{} ({})", CLASS_OBJ_PATH.join("."), e))
            })
    }

    /// Records with codes replaced by labels and columns renamed.
    pub fn normalized_table(&self) -> Result<Table> {
        let mut table = self.records()?;
        let classes = self.class_objects()?;
        crate::normalize::normalize(&mut table, &classes)?;
        Ok(table)
    }
}

pub struct StatsEngine<S: JsonSource = HttpSource> {
    source: S,
    config: StatsApiConfig,
}

impl StatsEngine<HttpSource> {
    pub fn new(config: StatsApiConfig) -> Result<Self> {
        let source = HttpSource::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_source(source, config))
    }
}

impl<S: JsonSource> StatsEngine<S> {
    pub fn with_source(source: S, config: StatsApiConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn query_params(&self, stats_data_id: &str, limit: u32) -> Vec<(&'static str, String)> {
        vec![
            ("appId", self.config.credential.clone()),
            ("statsDataId", stats_data_id.to_string()),
            ("metaGetFlg", "Y".to_string()),
            ("cntGetFlg", "N".to_string()),
            ("explanationGetFlg", "Y".to_string()),
            ("annotationGetFlg", "Y".to_string()),
            ("sectionHeaderFlg", "1".to_string()),
            ("replaceSpChars", "0".to_string()),
            ("limit", limit.to_string()),
            ("lang", self.config.language.clone()),
        ]
    }

    /// One GET, no retry. Every failure comes back as an error.
    pub fn try_fetch(&self, stats_data_id: &str, limit: u32) -> Result<StatsDocument> {
        if self.config.credential.trim().is_empty() {
            return Err(StatError::Config(
                "e-Stat credential is empty; set ESTAT_APP_ID or stats.credential".to_string(),
            ));
        }

        info!(
            "Fetching statistics — stats_data_id={} limit={}",
            stats_data_id, limit
        );
        let params = self.query_params(stats_data_id, limit);
        let body = self.source.get_json(&self.config.endpoint, &params)?;
        let doc = StatsDocument::new(body);
        doc.check_status()?;
        Ok(doc)
    }

    /// Like [`try_fetch`](Self::try_fetch), but a transport or HTTP failure
    /// is logged and becomes `Ok(None)`.
    pub fn fetch_stats_data(&self, stats_data_id: &str, limit: u32) -> Result<Option<StatsDocument>> {
        match self.try_fetch(stats_data_id, limit) {
            Ok(doc) => Ok(Some(doc)),
            Err(e @ (StatError::Transport { .. } | StatError::Status { .. })) => {
                error!("API request failed: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_obj_single_and_list_shapes() {
        let single: ClassObj = serde_json::from_value(json!({
            "@id": "cat01",
            "@name": "区分",
            "CLASS": {"@code": "01", "@name": "Hokkaido"}
        }))
        .unwrap();
        let list: ClassObj = serde_json::from_value(json!({
            "@id": "cat01",
            "@name": "区分",
            "CLASS": [{"@code": "01", "@name": "Hokkaido"}]
        }))
        .unwrap();
        assert_eq!(single, list);
        assert_eq!(single.classes[0].code, "01");
    }

    #[test]
    fn test_class_entry_optional_fields() {
        let entry: ClassEntry = serde_json::from_value(json!({
            "@code": "110",
            "@name": "49歳以下",
            "@level": "2",
            "@parentCode": "100"
        }))
        .unwrap();
        assert_eq!(entry.level.as_deref(), Some("2"));
        assert_eq!(entry.parent_code.as_deref(), Some("100"));
        assert_eq!(entry.unit, None);
    }

    #[test]
    fn test_navigate_names_missing_segment() {
        let doc = json!({"GET_STATS_DATA": {"STATISTICAL_DATA": {}}});
        let err = navigate(&doc, &VALUE_PATH).unwrap_err();
        match err {
            StatError::UnexpectedShape(path) => {
                assert_eq!(path, "GET_STATS_DATA.STATISTICAL_DATA.DATA_INF")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_single_record_value() {
        let doc = StatsDocument::new(json!({
            "GET_STATS_DATA": {"STATISTICAL_DATA": {"DATA_INF": {
                "VALUE": {"@cat01": "01", "@unit": "人", "$": "5"}
            }}}
        }));
        let table = doc.records().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns(), &["@cat01", "@unit", "$"]);
    }

    #[test]
    fn test_status_as_string() {
        let doc = StatsDocument::new(json!({
            "GET_STATS_DATA": {"RESULT": {"STATUS": "100", "ERROR_MSG": "bad appId"}}
        }));
        assert_eq!(doc.status(), Some(100));
        assert!(matches!(doc.check_status(), Err(StatError::Api { status: 100, .. })));
    }

    #[test]
    fn test_no_data_status_yields_empty_table() {
        let doc = StatsDocument::new(json!({
            "GET_STATS_DATA": {"RESULT": {"STATUS": 1, "ERROR_MSG": "正常に終了しましたが、該当データはありませんでした。"}}
        }));
        assert!(doc.check_status().is_ok());
        assert!(doc.records().unwrap().is_empty());
        assert!(doc.class_objects().unwrap().is_empty());
    }
}
