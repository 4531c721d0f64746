//! HTTP client for the trade API with rate limiting and error handling
//!
//! Thin wrapper over reqwest that knows how to address the trade endpoint,
//! enforces a requests-per-second ceiling, and folds every transport problem
//! into [`TransientError`] for the run loop to skip past.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::debug;

use crate::domain::query::TradeQuery;
use crate::domain::services::TransientError;

/// HTTP client configuration for the trade endpoint.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::infrastructure::config::molit::TRADE_ENDPOINT.to_string(),
            user_agent: "atam/0.3 (open-data harvester)".to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 10, // 1000ms / 100ms pacing = 10
        }
    }
}

/// Rate-limited client for the trade endpoint.
pub struct ApiClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: ApiClientConfig,
}

impl ApiClient {
    /// Create a new API client with the given configuration
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Issues one trade request and returns the raw XML body.
    ///
    /// Portal keys arrive pre-encoded, so the key is spliced into the URL
    /// verbatim instead of going through query-parameter encoding. The key
    /// never appears in log output.
    pub async fn get_trades(
        &self,
        query: &TradeQuery,
        service_key: &str,
    ) -> Result<String, TransientError> {
        self.rate_limiter.until_ready().await;

        debug!(
            region = %query.region_code,
            deal_ymd = %query.deal_ymd,
            "Fetching trade page"
        );

        let url = format!("{}?serviceKey={}", self.config.endpoint, service_key);
        let num_rows = query.num_rows.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("LAWD_CD", query.region_code.as_str()),
                ("DEAL_YMD", query.deal_ymd.as_str()),
                ("pageNo", "1"),
                ("numOfRows", num_rows.as_str()),
            ])
            .send()
            .await
            // The request URL carries the key; strip it before the error
            // can reach a log line.
            .map_err(|e| TransientError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransientError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| TransientError::Request(e.without_url().to_string()))
    }
}
