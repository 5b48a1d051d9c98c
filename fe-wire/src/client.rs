//! Thin `reqwest`-based HTTP client shared by every remote call in the
//! protocol: aggregator → authority, aggregator → sensor, sensor →
//! authority, sensor → aggregator.
//!
//! Retry here is purely transport-level (connection refused/reset before a
//! response is even received), in the teacher's `with_retry`
//! exponential-backoff idiom (`pirate-sync-lightd::client::LightClient`).
//! It is distinct from the protocol-level polling loops in
//! `fe-authority`/`fe-aggregator`/`fe-sensor`, which retry at their own
//! fixed cadence (spec.md §4.4.1's `schemaParamsPollingInterval` etc.) and
//! are not retried here — a well-formed non-2xx response is returned to
//! the caller immediately, not retried, per spec.md §7's "non-retried for
//! one-shot POSTs".

use crate::error::{Error, Result};
use std::time::Duration;
use tracing::warn;

/// Exponential backoff parameters for transport-level retry.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first) before giving up.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Backoff is capped at this value.
    pub max_backoff: Duration,
    /// Multiplier applied to the backoff after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

/// A thin client bound to one peer's base URL.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: String,
    http: reqwest::Client,
    retry: RetryConfig,
}

impl RemoteClient {
    /// Build a client for a peer at `base_url` (e.g. `http://10.0.0.4:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            retry: RetryConfig::default(),
        }
    }

    /// Override the default retry policy.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The peer's base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// `GET path`, decoding the body as JSON. Returns `Error::Protocol` on
    /// a non-2xx status (the body is read best-effort for the message).
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let resp = self.with_retry(|| self.http.get(&url).send()).await?;
        Self::decode_json(resp).await
    }

    /// `GET path`, returning the raw body bytes.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path);
        let resp = self.with_retry(|| self.http.get(&url).send()).await?;
        Self::decode_bytes(resp).await
    }

    /// `POST path` with a JSON body, decoding the JSON response. Not
    /// retried at the transport layer beyond connection-establishment
    /// failures — a received non-2xx response is surfaced immediately.
    pub async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let resp = self.with_retry(|| self.http.post(&url).json(body).send()).await?;
        Self::decode_json(resp).await
    }

    /// `POST path` with a JSON body, ignoring the response body beyond
    /// status.
    pub async fn post_json_empty<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        let resp = self.with_retry(|| self.http.post(&url).json(body).send()).await?;
        Self::check_status(resp).await.map(|_| ())
    }

    /// `POST path` with an `application/octet-stream` body, returning the
    /// raw response bytes.
    pub async fn post_bytes(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let url = self.url(path);
        let resp = self
            .with_retry(|| {
                self.http
                    .post(&url)
                    .header("content-type", "application/octet-stream")
                    .body(body.clone())
                    .send()
            })
            .await?;
        Self::decode_bytes(resp).await
    }

    /// `POST path` with an `application/octet-stream` body, decoding a
    /// JSON response — the shape of `POST /rates/{taskId}`, which submits
    /// a binary rate vector and gets back a small JSON envelope carrying
    /// the resulting `decryptionParamsId`.
    pub async fn post_bytes_for_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: Vec<u8>,
    ) -> Result<T> {
        let url = self.url(path);
        let resp = self
            .with_retry(|| {
                self.http
                    .post(&url)
                    .header("content-type", "application/octet-stream")
                    .body(body.clone())
                    .send()
            })
            .await?;
        Self::decode_json(resp).await
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(Error::Protocol(format!("peer returned {status}: {body}")))
        }
    }

    async fn decode_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let resp = Self::check_status(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn decode_bytes(resp: reqwest::Response) -> Result<Vec<u8>> {
        let resp = Self::check_status(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Retry `op` on transport-level failure (the request never reached
    /// the peer, or the connection was dropped before a status line was
    /// read), with exponential backoff. A response that *was* received —
    /// 2xx or not — short-circuits retry immediately.
    async fn with_retry<F, Fut>(&self, mut op: F) -> Result<reqwest::Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        let mut backoff = self.retry.initial_backoff;
        loop {
            match op().await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(Error::from(err));
                    }
                    warn!(attempt, %err, ?backoff, "transport error, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(
                        Duration::from_millis(
                            (backoff.as_millis() as f64 * self.retry.backoff_multiplier) as u64,
                        ),
                        self.retry.max_backoff,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let client = RemoteClient::new("http://127.0.0.1:8080/");
        assert_eq!(client.url("/task/123"), "http://127.0.0.1:8080/task/123");
    }

    #[test]
    fn default_retry_config_is_bounded() {
        let retry = RetryConfig::default();
        assert!(retry.max_attempts >= 1);
        assert!(retry.max_backoff >= retry.initial_backoff);
    }
}
