//! HTTP transport for the reconciliation backend.
//!
//! Every request carries a generated `X-Request-ID` header and a hard
//! request timeout. Idempotent reads are retried on 5xx and network
//! failure with exponential backoff; writes are never retried here —
//! job-level retry is always an explicit user action.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::types::DocumentUpload;
use crate::config::{ClientConfig, RetryConfig};
use crate::error::TransportError;

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum length for error response bodies kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Truncates an error response body to keep error messages and logs
/// readable.
fn truncate_error_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX_ERROR_BODY_LENGTH)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}... (truncated)", &body[..cut])
    } else {
        body.to_string()
    }
}

/// Delay before retry number `attempt` (0-based): base doubled per
/// attempt, capped.
pub fn backoff_delay(attempt: u32, retry: &RetryConfig) -> Duration {
    let exp = retry.base_delay_ms.saturating_mul(1u64 << attempt.min(32));
    Duration::from_millis(exp.min(retry.max_delay_ms))
}

/// Shared HTTP transport: base URL, credentials, timeouts, retry policy.
pub struct Transport {
    client: Client,
    base_url: String,
    auth_token: Option<SecretString>,
    request_timeout_secs: u64,
    retry: RetryConfig,
}

impl Transport {
    /// Builds a transport from a validated client config.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            request_timeout_secs: config.request_timeout_secs.max(1),
            retry: config.retry.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the per-request headers every call carries.
    fn decorate(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("X-Request-ID", uuid::Uuid::new_v4().to_string());
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    fn map_send_error(&self, url: &str, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                timeout_secs: self.request_timeout_secs,
            }
        } else {
            TransportError::Network {
                url: url.to_string(),
                source: error,
            }
        }
    }

    /// Sends an idempotent request, retrying 5xx and network failures
    /// with exponential backoff.
    async fn send_idempotent<F>(&self, url: &str, build: F) -> Result<Response, TransportError>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            let result = self.decorate(build()).send().await;

            match result {
                Ok(response) if is_retryable_status(response.status()) => {
                    if attempt + 1 >= max_attempts {
                        return Ok(response);
                    }
                    let status = response.status();
                    let delay = backoff_delay(attempt, &self.retry);
                    warn!(
                        "HTTP {} from {}, retrying in {:?} (attempt {}/{})",
                        status,
                        url,
                        delay,
                        attempt + 1,
                        max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => return Ok(response),
                Err(error) => {
                    if attempt + 1 >= max_attempts {
                        return Err(self.map_send_error(url, error));
                    }
                    let delay = backoff_delay(attempt, &self.retry);
                    warn!(
                        "request to {} failed ({}), retrying in {:?} (attempt {}/{})",
                        url,
                        error,
                        delay,
                        attempt + 1,
                        max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }

    /// Sends a non-idempotent request exactly once.
    async fn send_once(&self, url: &str, builder: RequestBuilder) -> Result<Response, TransportError> {
        self.decorate(builder)
            .send()
            .await
            .map_err(|e| self.map_send_error(url, e))
    }

    async fn check_status(&self, url: &str, response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: truncate_error_body(&body),
        })
    }

    async fn decode_json<T: DeserializeOwned>(
        &self,
        url: &str,
        response: Response,
    ) -> Result<T, TransportError> {
        response.json().await.map_err(|e| TransportError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// GET returning JSON; retried per the transport policy.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self
            .send_idempotent(&url, || self.client.get(&url).query(query))
            .await?;
        let response = self.check_status(&url, response).await?;
        self.decode_json(&url, response).await
    }

    /// GET returning the raw body plus a required response header;
    /// retried per the transport policy.
    pub async fn get_bytes_with_header(
        &self,
        path: &str,
        query: &[(&str, String)],
        header: &'static str,
    ) -> Result<(Vec<u8>, String), TransportError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self
            .send_idempotent(&url, || self.client.get(&url).query(query))
            .await?;
        let response = self.check_status(&url, response).await?;

        let header_value = response
            .headers()
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .ok_or(TransportError::MissingHeader {
                url: url.clone(),
                header,
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Decode {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Ok((bytes.to_vec(), header_value))
    }

    /// POST with a JSON body; never retried.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let url = self.url(path);
        debug!("POST {}", url);
        let response = self.send_once(&url, self.client.post(&url).json(body)).await?;
        let response = self.check_status(&url, response).await?;
        self.decode_json(&url, response).await
    }

    /// POST with an empty body; never retried.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = self.url(path);
        debug!("POST {}", url);
        let response = self.send_once(&url, self.client.post(&url)).await?;
        let response = self.check_status(&url, response).await?;
        self.decode_json(&url, response).await
    }

    /// Multipart file upload; never retried.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: &DocumentUpload,
    ) -> Result<T, TransportError> {
        let url = self.url(path);
        debug!("POST {} (multipart, {} bytes)", url, upload.size());

        let mut part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone());
        if let Some(mime_type) = upload.resolved_mime_type() {
            part = part
                .mime_str(&mime_type)
                .map_err(|e| TransportError::Client(e.to_string()))?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .send_once(&url, self.client.post(&url).multipart(form))
            .await?;
        let response = self.check_status(&url, response).await?;
        self.decode_json(&url, response).await
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("has_auth_token", &self.auth_token.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

/// Returns true when a status code is one the retry policy considers
/// transient.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
}
