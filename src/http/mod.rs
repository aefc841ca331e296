//! Single-request HTTP reachability check.
//!
//! Redirects are never followed: the first response the server sends, whatever
//! its status, is what gets reported. A 404 or a 503 still proves the host
//! answered, so every status code counts as reachable.

use crate::config::parse_probe_url;
use crate::utils::{measure_time, serialize_ms};
use reqwest::{redirect, Client};
use serde::Serialize;
use std::error::Error as StdError;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HttpOutcome {
    Success,
    Timeout,
    ConnectionError,
    TlsError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpResult {
    pub url: String,
    pub outcome: HttpOutcome,
    pub status: Option<u16>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_ms")]
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl HttpResult {
    pub fn is_success(&self) -> bool {
        self.outcome == HttpOutcome::Success
    }

    fn failed(url: String, outcome: HttpOutcome, elapsed: Duration, error: String) -> Self {
        Self {
            url,
            outcome,
            status: None,
            elapsed,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpProbe {
    pub url: String,
    pub timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: String) -> Self {
        Self {
            url,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self) -> HttpResult {
        let url = match parse_probe_url(&self.url) {
            Ok(url) => url,
            Err(e) => {
                return HttpResult::failed(
                    self.url.clone(),
                    HttpOutcome::ConnectionError,
                    Duration::ZERO,
                    e.to_string(),
                )
            }
        };
        let url_text = url.to_string();
        let https = url.scheme() == "https";

        let client = match Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(self.timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                log::warn!("Could not build HTTP client: {}", e);
                return HttpResult::failed(
                    url_text,
                    HttpOutcome::ConnectionError,
                    Duration::ZERO,
                    e.to_string(),
                );
            }
        };

        let (elapsed, response) =
            measure_time(|| timeout(self.timeout, client.get(url).send())).await;

        match response {
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                log::info!("HTTP GET {} answered {} in {:?}", url_text, status, elapsed);
                HttpResult {
                    url: url_text,
                    outcome: HttpOutcome::Success,
                    status: Some(status),
                    elapsed,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                let outcome = classify_request_error(&e, https);
                log::warn!("HTTP GET {} failed ({:?}): {}", url_text, outcome, error_chain(&e));
                HttpResult::failed(url_text, outcome, elapsed, error_chain(&e))
            }
            Err(_) => HttpResult::failed(
                url_text,
                HttpOutcome::Timeout,
                elapsed,
                format!("no response within {:?}", self.timeout),
            ),
        }
    }
}

fn classify_request_error(error: &reqwest::Error, https: bool) -> HttpOutcome {
    if error.is_timeout() || chain_has_io_timeout(error) {
        HttpOutcome::Timeout
    } else if https && error.source().is_some_and(|source| mentions_tls(&error_chain(source))) {
        // sources only: the top-level message embeds the URL
        HttpOutcome::TlsError
    } else {
        HttpOutcome::ConnectionError
    }
}

fn chain_has_io_timeout(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Flattens an error and all of its sources into one line.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut current = error.source();
    while let Some(err) = current {
        let text = err.to_string();
        if !parts.contains(&text) {
            parts.push(text);
        }
        current = err.source();
    }
    parts.join(": ")
}

pub fn mentions_tls(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["tls", "ssl", "certificate", "handshake"]
        .iter()
        .any(|marker| lower.contains(marker))
}
