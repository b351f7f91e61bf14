//! The reconciliation backend API surface.
//!
//! The workflow components depend on the [`IntakeApi`] trait rather
//! than a concrete client, so tests and offline use inject
//! [`LocalIntakeService`] where production wires [`HttpIntakeApi`].

pub mod http_api;
pub mod local;
pub mod types;

use async_trait::async_trait;

use crate::error::TransportError;
use types::{
    CancelAck, ConfirmVendorRequest, DocumentUpload, ExportProgress, ExportValidation, JobSubmission,
    NameCheck, ProcessingJob, ReportFilters, ReportKind, StartedExport, VendorCreated,
};

pub use http_api::HttpIntakeApi;
pub use local::LocalIntakeService;

/// Operations offered by the reconciliation backend.
#[async_trait]
pub trait IntakeApi: Send + Sync {
    /// Uploads a contract to start vendor creation; returns the
    /// extraction job to poll.
    async fn upload_contract(&self, upload: &DocumentUpload)
        -> Result<JobSubmission, TransportError>;

    /// Uploads a replacement contract for an existing vendor.
    async fn replace_contract(
        &self,
        vendor_id: &str,
        upload: &DocumentUpload,
    ) -> Result<JobSubmission, TransportError>;

    /// Reads the current state of an extraction job.
    async fn poll_job(&self, job_id: &str) -> Result<ProcessingJob, TransportError>;

    /// Confirms reviewed fields, materializing a vendor and contract.
    async fn confirm_vendor(
        &self,
        request: &ConfirmVendorRequest,
    ) -> Result<VendorCreated, TransportError>;

    /// Confirms reviewed fields for a contract replacement. The
    /// response carries the id of the newly created contract.
    async fn confirm_replacement(
        &self,
        vendor_id: &str,
        request: &ConfirmVendorRequest,
    ) -> Result<VendorCreated, TransportError>;

    /// Checks whether a vendor name is unused.
    async fn check_name(&self, name: &str) -> Result<NameCheck, TransportError>;

    /// Pre-flight validation of export parameters.
    async fn validate_export(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Result<ExportValidation, TransportError>;

    /// Starts a streaming CSV export.
    async fn start_export(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Result<StartedExport, TransportError>;

    /// Reads progress of a running export.
    async fn export_progress(&self, export_id: &str) -> Result<ExportProgress, TransportError>;

    /// Requests server-side abort of a running export.
    async fn cancel_export(&self, export_id: &str) -> Result<CancelAck, TransportError>;
}
