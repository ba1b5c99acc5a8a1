//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Bounded exponential backoff on transient failures
//! - No retry on responses that arrive but cannot be used

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::RegistryError;

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
pub const DEFAULT_USER_AGENT: &str = concat!("depconf/", env!("CARGO_PKG_VERSION"));

/// Default number of retries after the first attempt
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
pub const BASE_DELAY_MS: u64 = 100;

/// HTTP client wrapper with retry logic
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::network_error("", "HTTP client", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry; each later retry doubles it
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    async fn send_once(&self, url: &str, package: &str, registry: &str) -> Result<reqwest::Response, RegistryError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::timeout(package, registry)
            } else {
                RegistryError::network_error(package, registry, e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RegistryError::rate_limit_exceeded(registry));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::package_not_found(package, registry));
        }
        if status.is_server_error() {
            return Err(RegistryError::network_error(package, registry, format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(RegistryError::invalid_response(package, registry, format!("HTTP {}", status)));
        }
        Ok(response)
    }

    /// Perform a GET request, retrying transient failures
    ///
    /// After `max_retries` retries a transient failure becomes
    /// [`RegistryError::RetriesExhausted`].
    pub async fn get_with_context(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<reqwest::Response, RegistryError> {
        let mut delay = self.base_delay;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send_once(url, package, registry).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt <= self.max_retries => {
                    debug!(%url, attempt, error = %e, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) if e.is_transient() => {
                    warn!(%url, attempts = attempt, error = %e, "giving up after retries");
                    return Err(RegistryError::RetriesExhausted {
                        package: package.to_string(),
                        registry: registry.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Perform a GET request and parse a JSON response
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<T, RegistryError> {
        let response = self.get_with_context(url, package, registry).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RegistryError::invalid_response(package, registry, format!("failed to parse JSON: {}", e)))
    }

    /// Perform a GET request and read a text response
    pub async fn get_text(&self, url: &str, package: &str, registry: &str) -> Result<String, RegistryError> {
        let response = self.get_with_context(url, package, registry).await?;
        response
            .text()
            .await
            .map_err(|e| RegistryError::invalid_response(package, registry, format!("failed to read body: {}", e)))
    }
}
