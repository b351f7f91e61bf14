//! Shared fixtures for the intake and export integration suites.
//!
//! `WorkflowHarness` wires a [`ContractIntakeWorkflow`] to the
//! in-process backend so tests can script extraction outcomes and
//! count network-equivalent calls.

#![allow(dead_code)]

use std::sync::Arc;

use driftai::api::local::JobStep;
use driftai::api::types::{ConfirmVendorRequest, DocumentUpload, ExtractedFields};
use driftai::api::{IntakeApi, LocalIntakeService};
use driftai::config::ClientConfig;
use driftai::intake::ContractIntakeWorkflow;

/// A workflow against a scriptable in-process backend.
pub struct WorkflowHarness {
    pub service: Arc<LocalIntakeService>,
    pub workflow: Arc<ContractIntakeWorkflow>,
    pub config: ClientConfig,
}

impl WorkflowHarness {
    pub fn new() -> Self {
        init_tracing();
        let config = ClientConfig::default();
        let service = Arc::new(LocalIntakeService::new());
        let workflow = Arc::new(ContractIntakeWorkflow::new(
            Arc::clone(&service) as Arc<dyn IntakeApi>,
            &config,
        ));
        Self {
            service,
            workflow,
            config,
        }
    }

    /// Stages a job script that completes with the given fields after
    /// two processing polls.
    pub fn stage_completion(&self, fields: ExtractedFields) {
        self.service.stage_job(vec![
            JobStep::Processing,
            JobStep::Processing,
            JobStep::Completed(fields),
        ]);
    }

    /// Creates a vendor directly through the backend, bypassing the
    /// workflow.
    pub async fn seed_vendor(&self, name: &str) -> String {
        self.service
            .confirm_vendor(&ConfirmVendorRequest {
                primary_vendor_name: name.to_string(),
                dba_display_name: None,
                effective_date: "2024-01-01".to_string(),
                renewal_end_date: None,
                category: None,
                job_id: "J0".to_string(),
            })
            .await
            .expect("seed vendor")
            .vendor_id
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn pdf_upload(name: &str, bytes: usize) -> DocumentUpload {
    DocumentUpload::new(name, vec![0u8; bytes])
}

pub fn extracted(name: &str, effective_date: &str) -> ExtractedFields {
    ExtractedFields {
        primary_vendor_name: name.to_string(),
        effective_date: Some(effective_date.to_string()),
        ..Default::default()
    }
}
