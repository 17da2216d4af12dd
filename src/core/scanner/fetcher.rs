// src/core/scanner/fetcher.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use tracing::{debug, error, info};
use url::Url;

use crate::config::HttpConfig;
use crate::core::error::ConfigError;

/// Everything the fingerprint matcher looks at, captured from a single response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Header names are lower-case; repeated headers appear once per value.
    pub headers: Vec<(String, String)>,
    /// Raw `Set-Cookie` values.
    pub cookies: Vec<String>,
}

impl PageSnapshot {
    /// All values of header `name`, compared case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The HTTP capability used by fingerprint detection.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Performs one GET. The error is a human-readable reason.
    async fn fetch(&self, url: &Url) -> Result<PageSnapshot, String>;
}

/// `reqwest` implementation with a bounded redirect count and timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<PageSnapshot, String> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(res) => {
                info!(status = %res.status(), final_url = %res.url(), "Received HTTP response.");
                res
            }
            Err(e) => {
                error!(url = %url, error = %e, "HTTP request failed");
                return Err(format!("HTTP request failed: {}", e));
            }
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let cookies = response
            .headers()
            .get_all("set-cookie")
            .into_iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect();

        let body = match response.text().await {
            Ok(text) => {
                debug!(bytes = %text.len(), "Successfully read response body.");
                text
            }
            Err(e) => {
                error!(error = %e, "Failed to read response body");
                return Err(format!("Failed to read response body: {}", e));
            }
        };

        Ok(PageSnapshot { url: final_url, status, body, headers, cookies })
    }
}
