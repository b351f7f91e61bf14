//! HTTP implementation of [`IntakeApi`] against the real backend.

use async_trait::async_trait;

use crate::api::types::{
    CancelAck, ConfirmVendorRequest, DocumentUpload, ExportProgress, ExportValidation, JobSubmission,
    NameCheck, NameCheckRequest, ProcessingJob, ReportFilters, ReportKind, StartedExport,
    VendorCreated,
};
use crate::api::IntakeApi;
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::Transport;

/// Header carrying the export id on the CSV response.
const EXPORT_ID_HEADER: &str = "X-Export-ID";

/// Typed client for the reconciliation backend's REST endpoints.
#[derive(Debug)]
pub struct HttpIntakeApi {
    transport: Transport,
}

impl HttpIntakeApi {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    pub fn with_transport(transport: Transport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl IntakeApi for HttpIntakeApi {
    async fn upload_contract(
        &self,
        upload: &DocumentUpload,
    ) -> Result<JobSubmission, TransportError> {
        self.transport
            .post_multipart("/vendors/create-from-contract/upload", upload)
            .await
    }

    async fn replace_contract(
        &self,
        vendor_id: &str,
        upload: &DocumentUpload,
    ) -> Result<JobSubmission, TransportError> {
        self.transport
            .post_multipart(&format!("/vendors/{}/replace-contract", vendor_id), upload)
            .await
    }

    async fn poll_job(&self, job_id: &str) -> Result<ProcessingJob, TransportError> {
        self.transport
            .get_json(&format!("/jobs/{}", job_id), &[])
            .await
    }

    async fn confirm_vendor(
        &self,
        request: &ConfirmVendorRequest,
    ) -> Result<VendorCreated, TransportError> {
        self.transport
            .post_json("/vendors/create-from-contract/confirm", request)
            .await
    }

    async fn confirm_replacement(
        &self,
        vendor_id: &str,
        request: &ConfirmVendorRequest,
    ) -> Result<VendorCreated, TransportError> {
        self.transport
            .post_json(
                &format!("/vendors/{}/replace-contract/confirm", vendor_id),
                request,
            )
            .await
    }

    async fn check_name(&self, name: &str) -> Result<NameCheck, TransportError> {
        let request = NameCheckRequest {
            name: name.to_string(),
        };
        self.transport.post_json("/vendors/check-name", &request).await
    }

    async fn validate_export(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Result<ExportValidation, TransportError> {
        self.transport
            .post_json(&format!("/streaming-reports/validate/{}", kind), filters)
            .await
    }

    async fn start_export(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Result<StartedExport, TransportError> {
        let (csv, export_id) = self
            .transport
            .get_bytes_with_header(
                &format!("/streaming-reports/{}.csv", kind),
                &filters.to_query(),
                EXPORT_ID_HEADER,
            )
            .await?;
        Ok(StartedExport { export_id, csv })
    }

    async fn export_progress(&self, export_id: &str) -> Result<ExportProgress, TransportError> {
        self.transport
            .get_json(&format!("/streaming-reports/progress/{}", export_id), &[])
            .await
    }

    async fn cancel_export(&self, export_id: &str) -> Result<CancelAck, TransportError> {
        self.transport
            .post_empty(&format!("/streaming-reports/cancel/{}", export_id))
            .await
    }
}
