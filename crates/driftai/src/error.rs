use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadRejection),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("Network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Response from {url} is missing the '{header}' header")]
    MissingHeader { url: String, header: &'static str },
}

/// Local rejection of a selected file before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("unsupported document type '{mime_type}'")]
    UnsupportedType { mime_type: String },

    #[error("file is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("selected file is empty")]
    EmptySelection,
}

impl UploadRejection {
    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            UploadRejection::UnsupportedType { .. } => "unsupported_type",
            UploadRejection::TooLarge { .. } => "too_large",
            UploadRejection::EmptySelection => "empty_selection",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("document processing failed: {0}")]
    Failed(String),

    #[error(
        "processing timed out after {ceiling_secs}s; try a clearer document or contact support"
    )]
    TimedOut { ceiling_secs: u64 },

    #[error("job was abandoned before reaching a terminal state")]
    Abandoned,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("vendor name must be at least {min} characters")]
    NameTooShort { min: usize },

    #[error("{field} '{value}' is not a valid date (expected MM/DD/YYYY or YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error(
        "vendor name '{name}' is already in use (existing vendor: {})",
        .existing_vendor_id.as_deref().unwrap_or("unknown")
    )]
    DuplicateName {
        name: String,
        existing_vendor_id: Option<String>,
    },

    #[error("vendor name uniqueness check is still running")]
    CheckPending,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("export parameters rejected: {}", format_field_errors(.errors))]
    InvalidParameters {
        errors: Vec<crate::api::types::FieldError>,
    },

    #[error("export failed: {0}")]
    Failed(String),

    #[error("export was cancelled")]
    Cancelled,
}

fn format_field_errors(errors: &[crate::api::types::FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, DriftError>;
