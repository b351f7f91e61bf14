//! Client configuration loaded from a JSON file with defaulting and
//! structural validation.

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default accepted MIME types for contract uploads.
pub const DEFAULT_ACCEPTED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/png",
    "image/jpeg",
];

/// Default upload size ceiling (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Transport retry policy for idempotent reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay_ms: u64,
    /// Ceiling on the per-retry delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
        }
    }
}

/// Configuration for the intake and export workflow client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Base URL of the reconciliation backend, e.g. `https://api.example.com/v1`.
    pub base_url: String,
    /// Bearer token attached to every request when present.
    pub auth_token: Option<SecretString>,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
    /// Hard per-request timeout.
    pub request_timeout_secs: u64,
    /// Interval between job status polls.
    pub poll_interval_ms: u64,
    /// Client-enforced wall-clock ceiling on one extraction job.
    pub job_ceiling_ms: u64,
    /// Modeled minimum processing time used by the progress estimate.
    pub min_processing_ms: u64,
    /// Quiet period after the last vendor-name edit before the
    /// uniqueness check fires.
    pub name_check_debounce_ms: u64,
    /// Interval between export progress polls.
    pub export_poll_interval_ms: u64,
    /// Upload size ceiling in bytes.
    pub max_upload_bytes: u64,
    /// MIME types accepted by the upload gate.
    pub accepted_mime_types: Vec<String>,
    /// Transport retry policy for idempotent reads.
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            auth_token: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            poll_interval_ms: 2_000,
            job_ceiling_ms: 60_000,
            min_processing_ms: 8_000,
            name_check_debounce_ms: 500,
            export_poll_interval_ms: 2_000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_mime_types: DEFAULT_ACCEPTED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Validates structural invariants that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "baseUrl must not be empty".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Validation {
                message: format!("baseUrl '{}' must start with http:// or https://", self.base_url),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation {
                message: "pollIntervalMs must be greater than zero".to_string(),
            });
        }
        if self.job_ceiling_ms <= self.min_processing_ms {
            return Err(ConfigError::Validation {
                message: format!(
                    "jobCeilingMs ({}) must exceed minProcessingMs ({})",
                    self.job_ceiling_ms, self.min_processing_ms
                ),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Validation {
                message: "maxUploadBytes must be greater than zero".to_string(),
            });
        }
        if self.accepted_mime_types.is_empty() {
            return Err(ConfigError::Validation {
                message: "acceptedMimeTypes must not be empty".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation {
                message: "retry.maxAttempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads and validates a client config from a JSON file.
pub fn load_config(path: &Path) -> std::result::Result<ClientConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ClientConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
