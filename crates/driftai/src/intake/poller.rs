//! Submit → poll → terminal lifecycle for one extraction job.
//!
//! A poller owns at most one active job. Every `submit` starts a new
//! generation; responses belonging to a superseded generation are
//! discarded, never applied. The poll loop enforces a wall-clock
//! ceiling independent of server state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::types::{DocumentUpload, ExtractedFields, JobStatus};
use crate::api::IntakeApi;
use crate::config::ClientConfig;
use crate::error::{DriftError, JobError};

use super::progress::{IntakePhase, IntakeProgressBroadcaster, IntakeProgressEvent};
use super::IntakeTarget;

/// Timing knobs for the poll loop, taken from [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct PollerTiming {
    /// Interval between status polls.
    pub poll_interval: Duration,
    /// Wall-clock ceiling on one job, measured from submission.
    pub job_ceiling: Duration,
    /// Modeled minimum processing time used by the progress estimate.
    pub min_processing: Duration,
}

impl PollerTiming {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            job_ceiling: Duration::from_millis(config.job_ceiling_ms),
            min_processing: Duration::from_millis(config.min_processing_ms),
        }
    }
}

/// Client-side progress estimate for an extraction job.
///
/// Ramps 0→80 over the modeled minimum processing time, then 80→95
/// toward the ceiling. 100 is only implied by reaching `Completed`.
pub fn estimate_progress(elapsed_ms: u64, min_processing_ms: u64, ceiling_ms: u64) -> f64 {
    if elapsed_ms < min_processing_ms {
        elapsed_ms as f64 / min_processing_ms as f64 * 80.0
    } else if elapsed_ms < ceiling_ms {
        let ramp = (elapsed_ms - min_processing_ms) as f64 / (ceiling_ms - min_processing_ms) as f64;
        80.0 + ramp * 15.0
    } else {
        95.0
    }
}

/// Observable state of a poller instance.
///
/// `Completed`, `Failed`, and `TimedOut` are terminal; only a fresh
/// `submit` leaves them.
#[derive(Debug, Clone, PartialEq)]
pub enum PollerState {
    Idle,
    Submitting,
    Polling { job_id: String, progress: f64 },
    Completed { job_id: String },
    Failed { message: String },
    TimedOut,
}

/// Result of a poll loop that reached `Completed`.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub fields: ExtractedFields,
}

struct PollerInner {
    generation: u64,
    state: PollerState,
}

/// Per-workflow-instance state machine owning one extraction job.
pub struct JobPoller {
    api: Arc<dyn IntakeApi>,
    timing: PollerTiming,
    inner: Arc<Mutex<PollerInner>>,
    broadcaster: IntakeProgressBroadcaster,
}

impl JobPoller {
    pub fn new(api: Arc<dyn IntakeApi>, timing: PollerTiming) -> Self {
        Self {
            api,
            timing,
            inner: Arc::new(Mutex::new(PollerInner {
                generation: 0,
                state: PollerState::Idle,
            })),
            broadcaster: IntakeProgressBroadcaster::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PollerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state snapshot.
    pub fn state(&self) -> PollerState {
        self.lock().state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IntakeProgressEvent> {
        self.broadcaster.subscribe()
    }

    /// Abandons any in-flight job. The poll loop exits on the first
    /// tick that observes the superseded generation, and late responses
    /// are never applied.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = PollerState::Idle;
    }

    fn begin_generation(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = PollerState::Submitting;
        inner.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Applies a state change, unless the generation has been
    /// superseded. Returns whether the change was applied.
    fn apply(&self, generation: u64, state: PollerState) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = state;
        true
    }

    fn publish(&self, job_id: Option<&str>, phase: IntakePhase, progress: f64, message: &str) {
        self.broadcaster
            .send(IntakeProgressEvent::new(job_id, phase, progress, message));
    }

    /// Submits a document and polls the resulting job to a terminal
    /// state. Returns the extracted fields on completion.
    ///
    /// Starting a new submit abandons any prior job of this poller.
    pub async fn submit(
        &self,
        target: &IntakeTarget,
        upload: &DocumentUpload,
    ) -> Result<JobOutcome, DriftError> {
        let generation = self.begin_generation();
        let submitted = Instant::now();
        self.publish(
            None,
            IntakePhase::Submitting,
            0.0,
            &format!("uploading '{}'", upload.file_name),
        );

        let submission = match target {
            IntakeTarget::CreateVendor => self.api.upload_contract(upload).await,
            IntakeTarget::ReplaceContract { vendor_id } => {
                self.api.replace_contract(vendor_id, upload).await
            }
        };
        let job_id = match submission {
            Ok(submission) => submission.job_id,
            Err(error) => {
                let message = error.to_string();
                if self.apply(generation, PollerState::Failed { message: message.clone() }) {
                    warn!("upload of '{}' failed: {}", upload.file_name, message);
                    self.publish(None, IntakePhase::Failed, 0.0, &message);
                }
                return Err(error.into());
            }
        };
        info!("'{}' accepted as job {}", upload.file_name, job_id);

        let ceiling_ms = self.timing.job_ceiling.as_millis() as u64;
        let min_processing_ms = self.timing.min_processing.as_millis() as u64;

        loop {
            let elapsed_ms = submitted.elapsed().as_millis() as u64;
            let progress = estimate_progress(elapsed_ms, min_processing_ms, ceiling_ms);
            if !self.apply(
                generation,
                PollerState::Polling {
                    job_id: job_id.clone(),
                    progress,
                },
            ) {
                return Err(JobError::Abandoned.into());
            }
            self.publish(
                Some(&job_id),
                IntakePhase::Polling,
                progress,
                "waiting for document extraction",
            );

            tokio::time::sleep(self.timing.poll_interval).await;

            if !self.is_current(generation) {
                debug!("job {} abandoned, stopping poll loop", job_id);
                return Err(JobError::Abandoned.into());
            }

            let elapsed_ms = submitted.elapsed().as_millis() as u64;
            if elapsed_ms >= ceiling_ms {
                let ceiling_secs = ceiling_ms / 1_000;
                let error = JobError::TimedOut { ceiling_secs };
                if self.apply(generation, PollerState::TimedOut) {
                    warn!("job {} exceeded the {}s ceiling", job_id, ceiling_secs);
                    self.publish(Some(&job_id), IntakePhase::TimedOut, 95.0, &error.to_string());
                }
                return Err(error.into());
            }

            debug!("polling job {} at {}ms", job_id, elapsed_ms);
            let job = match self.api.poll_job(&job_id).await {
                Ok(job) => job,
                Err(error) => {
                    let message = error.to_string();
                    if self.apply(generation, PollerState::Failed { message: message.clone() }) {
                        warn!("poll of job {} failed: {}", job_id, message);
                        self.publish(Some(&job_id), IntakePhase::Failed, progress, &message);
                    }
                    return Err(error.into());
                }
            };
            if !self.is_current(generation) {
                debug!("discarding stale poll response for job {}", job_id);
                return Err(JobError::Abandoned.into());
            }

            match job.status {
                JobStatus::Pending | JobStatus::Processing => {}
                JobStatus::Completed => {
                    let fields = match job.result {
                        Some(fields) => fields,
                        None => {
                            let message =
                                "server reported completion without extracted fields".to_string();
                            let error = JobError::Failed(message.clone());
                            if self.apply(generation, PollerState::Failed { message: message.clone() })
                            {
                                self.publish(Some(&job_id), IntakePhase::Failed, progress, &message);
                            }
                            return Err(error.into());
                        }
                    };
                    if self.apply(
                        generation,
                        PollerState::Completed {
                            job_id: job_id.clone(),
                        },
                    ) {
                        info!("job {} completed", job_id);
                        self.publish(Some(&job_id), IntakePhase::Completed, 100.0, "extraction complete");
                    }
                    return Ok(JobOutcome { job_id, fields });
                }
                JobStatus::Failed => {
                    let message = job
                        .error
                        .unwrap_or_else(|| "document processing failed".to_string());
                    let error = JobError::Failed(message.clone());
                    if self.apply(generation, PollerState::Failed { message: message.clone() }) {
                        warn!("job {} failed: {}", job_id, message);
                        self.publish(Some(&job_id), IntakePhase::Failed, progress, &message);
                    }
                    return Err(error.into());
                }
                JobStatus::Timeout => {
                    let message = "server reported a processing timeout".to_string();
                    let error = JobError::Failed(message.clone());
                    if self.apply(generation, PollerState::Failed { message: message.clone() }) {
                        warn!("job {}: {}", job_id, message);
                        self.publish(Some(&job_id), IntakePhase::Failed, progress, &message);
                    }
                    return Err(error.into());
                }
            }
        }
    }
}
