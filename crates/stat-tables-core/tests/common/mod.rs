#![allow(dead_code)]

use serde_json::Value;
use stat_tables_core::http::JsonSource;
use stat_tables_core::{Result, StatError};
use std::collections::HashMap;
use std::sync::Mutex;

pub type Responder = Box<dyn Fn(&HashMap<String, String>) -> Result<Value> + Send + Sync>;

/// Canned `JsonSource` that remembers every request it saw.
pub struct FakeSource {
    respond: Responder,
    pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeSource {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&HashMap<String, String>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(body: Value) -> Self {
        Self::new(move |_| Ok(body.clone()))
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl JsonSource for FakeSource {
    fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let owned: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), owned.clone()));
        (self.respond)(&owned.into_iter().collect())
    }
}

pub fn timeout(url: &str) -> StatError {
    StatError::Transport {
        url: url.to_string(),
        message: "operation timed out".to_string(),
    }
}

/// Routes `log` output through the test harness so failures show context.
pub fn init_logging() {
    let _ = simplelog::TestLogger::init(simplelog::LevelFilter::Debug, simplelog::Config::default());
}
