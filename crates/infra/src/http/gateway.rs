//! Network gateway over reqwest
//!
//! Turns a [`RequestDescriptor`] into a real network call. Transport
//! failures (timeouts, refused connections) are retried with exponential
//! backoff and surface as `Network`/`Timeout` errors once attempts run
//! out. HTTP statuses are never retried here: every status, including
//! 4xx/5xx, comes back as an `Ok` response, because status-level policy
//! lives in the strategy router and the replay queue.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use satchel_core::NetworkGateway;
use satchel_domain::{HttpConfig, RemoteResponse, RequestDescriptor, Result, SatchelError};
use tracing::debug;
use url::Url;

use crate::errors::InfraError;

// Hop-by-hop and length headers are not meaningful once a body has been
// captured, so they never enter the cached header subset.
const SKIPPED_HEADERS: [&str; 4] =
    ["connection", "keep-alive", "transfer-encoding", "content-length"];

/// `NetworkGateway` implementation backed by a shared reqwest client.
pub struct HttpGateway {
    client: Client,
    base_url: Option<Url>,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpGateway {
    /// Build a gateway from configuration.
    ///
    /// # Errors
    /// Returns `SatchelError::Config` when the configured base URL does not
    /// parse, and propagates reqwest client construction failures.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let base_url = match &config.base_url {
            Some(raw) => Some(
                Url::parse(raw)
                    .map_err(|e| SatchelError::Config(format!("invalid base URL {raw}: {e}")))?,
            ),
            None => None,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .no_proxy()
            .build()
            .map_err(|err| {
                let infra: InfraError = err.into();
                SatchelError::from(infra)
            })?;

        Ok(Self {
            client,
            base_url,
            max_attempts: (config.max_attempts as usize).max(1),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
        })
    }

    fn resolve(&self, raw: &str) -> Result<Url> {
        if let Ok(absolute) = Url::parse(raw) {
            return Ok(absolute);
        }

        match &self.base_url {
            Some(base) => base
                .join(raw)
                .map_err(|e| SatchelError::InvalidInput(format!("bad request URL {raw}: {e}"))),
            None => Err(SatchelError::Config(format!(
                "origin-relative URL {raw} requires a configured base URL"
            ))),
        }
    }

    /// Assemble a fresh reqwest request from the descriptor.
    ///
    /// Descriptors are plain data, so every retry attempt can rebuild the
    /// request from scratch instead of cloning a half-consumed builder.
    fn build_request(
        &self,
        method: &Method,
        url: &Url,
        request: &RequestDescriptor,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method.clone(), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder
    }

    /// Delay before the next attempt: doubles per retry, capped at 256x
    /// the configured base.
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(2u32.saturating_pow(exponent))
    }

    async fn capture(url: &Url, response: reqwest::Response) -> Result<RemoteResponse> {
        let status = response.status().as_u16();

        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            let name = name.as_str().to_ascii_lowercase();
            if SKIPPED_HEADERS.contains(&name.as_str()) {
                continue;
            }
            if let Ok(value) = value.to_str() {
                headers.insert(name, value.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| {
                let infra: InfraError = err.into();
                SatchelError::from(infra)
            })?
            .to_vec();

        debug!(%url, status, bytes = body.len(), "gateway call completed");

        Ok(RemoteResponse { status, headers, body })
    }
}

#[async_trait]
impl NetworkGateway for HttpGateway {
    async fn execute(&self, request: &RequestDescriptor) -> Result<RemoteResponse> {
        let url = self.resolve(&request.url)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| SatchelError::InvalidInput(format!("bad method: {}", request.method)))?;

        for attempt in 1..=self.max_attempts {
            debug!(attempt, %method, %url, "dispatching uplink request");

            match self.build_request(&method, &url, request).send().await {
                Ok(response) => return Self::capture(&url, response).await,
                Err(err) => {
                    debug!(attempt, %method, %url, error = %err, "uplink attempt failed");

                    if attempt < self.max_attempts && is_transient(&err) {
                        let delay = self.backoff_delay(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        continue;
                    }

                    let infra: InfraError = err.into();
                    return Err(SatchelError::from(infra));
                }
            }
        }

        Err(SatchelError::Internal("uplink retry loop ended without a result".into()))
    }
}

/// Transport failures worth another attempt. Anything that produced an
/// HTTP status already took the `Ok` path and never reaches this check.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
