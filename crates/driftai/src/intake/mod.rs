//! Contract intake: gate → submit/poll → review seed.
//!
//! One workflow instance owns one [`JobPoller`]; beginning a new intake
//! abandons any prior job of the same instance.

pub mod poller;
pub mod progress;

pub use poller::{estimate_progress, JobOutcome, JobPoller, PollerState, PollerTiming};
pub use progress::{IntakePhase, IntakeProgressBroadcaster, IntakeProgressEvent};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::api::types::DocumentUpload;
use crate::api::IntakeApi;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::gate::UploadGate;
use crate::review::ReviewForm;

/// Which document flow an intake serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeTarget {
    /// Create a new vendor from the uploaded contract.
    CreateVendor,
    /// Replace the contract of an existing vendor.
    ReplaceContract { vendor_id: String },
}

/// Composition of gate, poller, and review seeding for the two
/// document flows.
pub struct ContractIntakeWorkflow {
    api: Arc<dyn IntakeApi>,
    gate: UploadGate,
    poller: JobPoller,
    name_check_debounce: Duration,
}

impl ContractIntakeWorkflow {
    pub fn new(api: Arc<dyn IntakeApi>, config: &ClientConfig) -> Self {
        let gate = UploadGate::from_config(config);
        let poller = JobPoller::new(Arc::clone(&api), PollerTiming::from_config(config));
        Self {
            api,
            gate,
            poller,
            name_check_debounce: Duration::from_millis(config.name_check_debounce_ms),
        }
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IntakeProgressEvent> {
        self.poller.subscribe()
    }

    /// Runs the document flow to the review step: local validation,
    /// upload, and polling to completion. Gate rejections return
    /// before any network call. The returned form is seeded from the
    /// extraction result and ready for user edits.
    pub async fn begin(&self, target: IntakeTarget, upload: DocumentUpload) -> Result<ReviewForm> {
        self.gate.check(&upload)?;
        let outcome = self.poller.submit(&target, &upload).await?;
        Ok(ReviewForm::seed(
            Arc::clone(&self.api),
            target,
            outcome.job_id,
            outcome.fields,
            self.name_check_debounce,
        ))
    }

    /// Abandons any in-flight job for this instance.
    pub fn abandon(&self) {
        self.poller.cancel();
    }
}
