// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::{Result, StatError};
use log::debug;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Something that can answer a GET with a JSON document.
///
/// Both fetchers go through this so tests can swap in canned responses.
pub trait JsonSource: Sync {
    fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value>;
}

/// `JsonSource` backed by a blocking reqwest client.
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stat-tables/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StatError::Config(format!("could not build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl JsonSource for HttpSource {
    fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = build_url(endpoint, params)?;
        // Logged without the query string; it carries the credential.
        let display_url = format!("{}{}", url.origin().ascii_serialization(), url.path());
        debug!("GET {} params={}", display_url, params.len());

        // reqwest puts the full URL in its messages; drop it before formatting.
        let transport = |e: reqwest::Error| StatError::Transport {
            url: display_url.clone(),
            message: e.without_url().to_string(),
        };

        let response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StatError::Status {
                status: status.as_u16(),
                url: display_url.clone(),
            });
        }

        response.json::<Value>().map_err(transport)
    }
}

pub fn build_url(endpoint: &str, params: &[(&str, String)]) -> Result<Url> {
    Url::parse_with_params(endpoint, params.iter().map(|(k, v)| (*k, v.as_str())))
        .map_err(|e| StatError::Config(format!("invalid endpoint '{}': {}", endpoint, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    const SECRET: &str = "SECRETKEY123";

    /// Answers a single request with `response` and returns the endpoint URL.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{}/w", addr)
    }

    fn source() -> HttpSource {
        HttpSource::new(Duration::from_secs(5)).unwrap()
    }

    fn params() -> Vec<(&'static str, String)> {
        vec![("q", "Tokyo,JP".to_string()), ("appid", SECRET.to_string())]
    }

    #[test]
    fn test_success_body_is_parsed() {
        let endpoint = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 8\r\nConnection: close\r\n\r\n{\"a\": 1}",
        );
        let body = source().get_json(&endpoint, &params()).unwrap();
        assert_eq!(body, serde_json::json!({"a": 1}));
    }

    #[test]
    fn test_non_success_status_maps_to_status_error() {
        let endpoint = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let err = source().get_json(&endpoint, &params()).unwrap_err();
        match &err {
            StatError::Status { status, url } => {
                assert_eq!(*status, 503);
                assert!(!url.contains(SECRET));
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert!(!err.to_string().contains(SECRET));
    }

    #[test]
    fn test_refused_connection_hides_credential() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let endpoint = format!("http://{}/w", addr);

        let err = source().get_json(&endpoint, &params()).unwrap_err();
        assert!(matches!(err, StatError::Transport { .. }), "{:?}", err);
        assert!(!err.to_string().contains(SECRET), "{}", err);
        assert!(!format!("{:?}", err).contains(SECRET), "{:?}", err);
    }

    #[test]
    fn test_build_url_encodes_params() {
        let url = build_url(
            "https://api.openweathermap.org/data/2.5/weather",
            &[("q", "Tokyo,JP".to_string()), ("lang", "ja".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openweathermap.org/data/2.5/weather?q=Tokyo%2CJP&lang=ja"
        );
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        let err = build_url("not a url", &[]).unwrap_err();
        assert!(matches!(err, StatError::Config(_)));
    }
}
