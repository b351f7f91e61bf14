//! Wire types for the reconciliation backend API.
//!
//! Server payloads are untrusted input: everything arriving over the
//! wire is deserialized into these typed structs before use, and
//! unknown status values are rejected at the serde layer.

use serde::{Deserialize, Serialize};

/// Server-side status of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Timeout,
}

impl JobStatus {
    /// Returns true for states the server will never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Timeout
        )
    }
}

/// Structured fields extracted from an uploaded contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(default)]
    pub primary_vendor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dba_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_reconciliation_summary: Option<String>,
}

/// One server-side asynchronous extraction task, as polled by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    pub id: String,
    pub status: JobStatus,
    /// Server-reported progress estimate; the client computes its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Present only when `status == Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExtractedFields>,
    /// Present only when `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to a contract upload: the id of the extraction job to poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    pub job_id: String,
}

/// A document selected for upload, with client-derived metadata.
///
/// Ephemeral and owned by one workflow instance; never persisted.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    /// Declared MIME type; inferred from the file name when absent.
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// The declared MIME type, or one inferred from the file name.
    pub fn resolved_mime_type(&self) -> Option<String> {
        self.mime_type.clone().or_else(|| {
            mime_guess::from_path(&self.file_name)
                .first()
                .map(|m| m.to_string())
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Reviewed fields submitted to confirm a vendor creation or
/// contract replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmVendorRequest {
    pub primary_vendor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dba_display_name: Option<String>,
    pub effective_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub job_id: String,
}

/// Result of a confirmed vendor creation or contract replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorCreated {
    pub vendor_id: String,
    pub contract_id: String,
}

/// Request body for the vendor-name uniqueness check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameCheckRequest {
    pub name: String,
}

/// Response to the vendor-name uniqueness check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameCheck {
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_vendor_id: Option<String>,
}

/// Kind of streaming CSV report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Invoices,
    Findings,
    Disputes,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Invoices => "invoices",
            ReportKind::Findings => "findings",
            ReportKind::Disputes => "disputes",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters applied to a streaming report export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ReportFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub vendor_id: Option<String>,
    pub category: Option<String>,
}

impl ReportFilters {
    /// Renders the filters as query-string pairs for the export GET.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref start_date) = self.start_date {
            pairs.push(("start_date", start_date.clone()));
        }
        if let Some(ref end_date) = self.end_date {
            pairs.push(("end_date", end_date.clone()));
        }
        if let Some(ref vendor_id) = self.vendor_id {
            pairs.push(("vendor_id", vendor_id.clone()));
        }
        if let Some(ref category) = self.category {
            pairs.push(("category", category.clone()));
        }
        pairs
    }
}

/// Server-side status of a streaming export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ExportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExportStatus::Completed | ExportStatus::Failed | ExportStatus::Cancelled
        )
    }
}

/// Progress record for a running export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportProgress {
    pub status: ExportStatus,
    pub progress: f64,
    pub total_records: u64,
    pub processed_records: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
}

/// Acknowledgment of an export cancellation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One per-field error from export parameter validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Result of the export parameter pre-flight check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportValidation {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<FieldError>,
    pub estimated_records: u64,
    pub estimated_duration_seconds: u64,
}

/// A started export: the CSV body plus the id used for progress
/// tracking and cancellation.
#[derive(Debug, Clone)]
pub struct StartedExport {
    pub export_id: String,
    pub csv: Vec<u8>,
}
