//! In-process implementation of [`IntakeApi`] backed by the vendor
//! repository.
//!
//! Stands in for the real backend in tests and offline use. Extraction
//! outcomes can be scripted per upload; unscripted uploads get a short
//! default script derived from the file name. Call counters let tests
//! assert how many network-equivalent operations were issued.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::api::types::{
    CancelAck, ConfirmVendorRequest, DocumentUpload, ExportProgress, ExportStatus,
    ExportValidation, FieldError, JobStatus, JobSubmission, NameCheck, ProcessingJob,
    ReportFilters, ReportKind, StartedExport, VendorCreated,
};
use crate::api::IntakeApi;
use crate::dates::parse_flexible_date;
use crate::error::TransportError;
use crate::vendor::{InMemoryVendorRepository, NewVendor, VendorRepository, VendorUpdate};

use super::types::ExtractedFields;

/// Records advanced per progress poll before an export completes.
const EXPORT_CHUNK_RECORDS: u64 = 40;

/// One scripted step returned by successive polls of a job. The final
/// step repeats forever once reached.
#[derive(Debug, Clone)]
pub enum JobStep {
    Pending,
    Processing,
    Completed(ExtractedFields),
    Failed(String),
}

#[derive(Debug)]
struct ExportState {
    kind: ReportKind,
    status: ExportStatus,
    total_records: u64,
    processed_records: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn local_error(status: u16, body: &str) -> TransportError {
    TransportError::Status {
        url: "local://intake".to_string(),
        status,
        body: body.to_string(),
    }
}

/// In-process backend with scripted extraction outcomes.
pub struct LocalIntakeService {
    vendors: Arc<dyn VendorRepository>,
    staged_scripts: Mutex<VecDeque<Vec<JobStep>>>,
    staged_upload_failures: Mutex<VecDeque<String>>,
    jobs: Mutex<HashMap<String, VecDeque<ProcessingJob>>>,
    exports: Mutex<HashMap<String, ExportState>>,
    cancel_ack_delay: Mutex<Option<Duration>>,
    upload_calls: AtomicU64,
    poll_calls: AtomicU64,
    name_check_calls: AtomicU64,
    progress_calls: AtomicU64,
    last_checked_name: Mutex<Option<String>>,
}

impl LocalIntakeService {
    pub fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryVendorRepository::new()))
    }

    pub fn with_repository(vendors: Arc<dyn VendorRepository>) -> Self {
        Self {
            vendors,
            staged_scripts: Mutex::new(VecDeque::new()),
            staged_upload_failures: Mutex::new(VecDeque::new()),
            jobs: Mutex::new(HashMap::new()),
            exports: Mutex::new(HashMap::new()),
            cancel_ack_delay: Mutex::new(None),
            upload_calls: AtomicU64::new(0),
            poll_calls: AtomicU64::new(0),
            name_check_calls: AtomicU64::new(0),
            progress_calls: AtomicU64::new(0),
            last_checked_name: Mutex::new(None),
        }
    }

    /// The vendor repository backing this service.
    pub fn vendors(&self) -> Arc<dyn VendorRepository> {
        Arc::clone(&self.vendors)
    }

    /// Stages the poll script consumed by the next upload.
    pub fn stage_job(&self, steps: Vec<JobStep>) {
        lock(&self.staged_scripts).push_back(steps);
    }

    /// Makes the next upload fail with a transport error.
    pub fn fail_next_upload(&self, message: &str) {
        lock(&self.staged_upload_failures).push_back(message.to_string());
    }

    /// Delays cancellation acknowledgments, simulating a slow server.
    pub fn set_cancel_ack_delay(&self, delay: Duration) {
        *lock(&self.cancel_ack_delay) = Some(delay);
    }

    pub fn upload_calls(&self) -> u64 {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> u64 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn name_check_calls(&self) -> u64 {
        self.name_check_calls.load(Ordering::SeqCst)
    }

    pub fn progress_calls(&self) -> u64 {
        self.progress_calls.load(Ordering::SeqCst)
    }

    /// The most recent name submitted to the uniqueness check.
    pub fn last_checked_name(&self) -> Option<String> {
        lock(&self.last_checked_name).clone()
    }

    fn default_script(upload: &DocumentUpload) -> Vec<JobStep> {
        let stem = upload
            .file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&upload.file_name);
        let fields = ExtractedFields {
            primary_vendor_name: stem.replace(['-', '_'], " "),
            contract_reconciliation_summary: Some(
                "No reconciliation discrepancies identified.".to_string(),
            ),
            ..Default::default()
        };
        vec![
            JobStep::Processing,
            JobStep::Processing,
            JobStep::Completed(fields),
        ]
    }

    fn materialize(job_id: &str, steps: Vec<JobStep>) -> VecDeque<ProcessingJob> {
        steps
            .into_iter()
            .map(|step| {
                let (status, result, error) = match step {
                    JobStep::Pending => (JobStatus::Pending, None, None),
                    JobStep::Processing => (JobStatus::Processing, None, None),
                    JobStep::Completed(fields) => (JobStatus::Completed, Some(fields), None),
                    JobStep::Failed(message) => (JobStatus::Failed, None, Some(message)),
                };
                ProcessingJob {
                    id: job_id.to_string(),
                    status,
                    progress: None,
                    result,
                    error,
                }
            })
            .collect()
    }

    fn accept_upload(&self, upload: &DocumentUpload) -> Result<JobSubmission, TransportError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = lock(&self.staged_upload_failures).pop_front() {
            return Err(local_error(503, &message));
        }

        let script = lock(&self.staged_scripts)
            .pop_front()
            .unwrap_or_else(|| Self::default_script(upload));
        let job_id = uuid::Uuid::new_v4().to_string();
        debug!("accepted upload '{}' as job {}", upload.file_name, job_id);
        lock(&self.jobs).insert(job_id.clone(), Self::materialize(&job_id, script));
        Ok(JobSubmission { job_id })
    }

    fn estimated_records(kind: ReportKind) -> u64 {
        match kind {
            ReportKind::Invoices => 120,
            ReportKind::Findings => 45,
            ReportKind::Disputes => 12,
        }
    }

    fn render_csv(kind: ReportKind, filters: &ReportFilters) -> Vec<u8> {
        let mut csv = match kind {
            ReportKind::Invoices => "invoice_id,vendor,amount,status\n".to_string(),
            ReportKind::Findings => "finding_id,vendor,field,description\n".to_string(),
            ReportKind::Disputes => "dispute_id,vendor,amount,state\n".to_string(),
        };
        let vendor = filters.vendor_id.as_deref().unwrap_or("V-SAMPLE");
        match kind {
            ReportKind::Invoices => {
                csv.push_str(&format!("INV-1001,{},1250.00,reconciled\n", vendor));
                csv.push_str(&format!("INV-1002,{},310.75,flagged\n", vendor));
            }
            ReportKind::Findings => {
                csv.push_str(&format!(
                    "FND-2001,{},unit_price,invoiced rate exceeds contracted rate\n",
                    vendor
                ));
            }
            ReportKind::Disputes => {
                csv.push_str(&format!("DSP-3001,{},439.20,open\n", vendor));
            }
        }
        csv.into_bytes()
    }
}

impl Default for LocalIntakeService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntakeApi for LocalIntakeService {
    async fn upload_contract(
        &self,
        upload: &DocumentUpload,
    ) -> Result<JobSubmission, TransportError> {
        self.accept_upload(upload)
    }

    async fn replace_contract(
        &self,
        vendor_id: &str,
        upload: &DocumentUpload,
    ) -> Result<JobSubmission, TransportError> {
        if self.vendors.get_by_id(vendor_id).await.is_none() {
            return Err(local_error(404, &format!("unknown vendor '{}'", vendor_id)));
        }
        self.accept_upload(upload)
    }

    async fn poll_job(&self, job_id: &str) -> Result<ProcessingJob, TransportError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);

        let mut jobs = lock(&self.jobs);
        let queue = jobs
            .get_mut(job_id)
            .ok_or_else(|| local_error(404, &format!("unknown job '{}'", job_id)))?;

        // The last step repeats on every subsequent poll.
        if queue.len() > 1 {
            Ok(queue.pop_front().expect("non-empty script"))
        } else {
            queue
                .front()
                .cloned()
                .ok_or_else(|| local_error(500, "empty job script"))
        }
    }

    async fn confirm_vendor(
        &self,
        request: &ConfirmVendorRequest,
    ) -> Result<VendorCreated, TransportError> {
        if self
            .vendors
            .find_by_name(&request.primary_vendor_name)
            .await
            .is_some()
        {
            return Err(local_error(
                409,
                &format!("vendor '{}' already exists", request.primary_vendor_name),
            ));
        }

        let contract_id = format!("C-{}", uuid::Uuid::new_v4());
        let vendor = self
            .vendors
            .create(NewVendor {
                name: request.primary_vendor_name.clone(),
                dba_name: request.dba_display_name.clone(),
                category: request.category.clone(),
                effective_date: Some(request.effective_date.clone()),
                renewal_end_date: request.renewal_end_date.clone(),
                contract_id: Some(contract_id.clone()),
                reconciliation_summary: None,
            })
            .await;

        Ok(VendorCreated {
            vendor_id: vendor.id,
            contract_id,
        })
    }

    async fn confirm_replacement(
        &self,
        vendor_id: &str,
        request: &ConfirmVendorRequest,
    ) -> Result<VendorCreated, TransportError> {
        let contract_id = format!("C-{}", uuid::Uuid::new_v4());
        let updated = self
            .vendors
            .update(
                vendor_id,
                VendorUpdate {
                    name: Some(request.primary_vendor_name.clone()),
                    dba_name: request.dba_display_name.clone(),
                    category: request.category.clone(),
                    effective_date: Some(request.effective_date.clone()),
                    renewal_end_date: request.renewal_end_date.clone(),
                    contract_id: Some(contract_id.clone()),
                    reconciliation_summary: None,
                },
            )
            .await
            .ok_or_else(|| local_error(404, &format!("unknown vendor '{}'", vendor_id)))?;

        Ok(VendorCreated {
            vendor_id: updated.id,
            contract_id,
        })
    }

    async fn check_name(&self, name: &str) -> Result<NameCheck, TransportError> {
        self.name_check_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_checked_name) = Some(name.to_string());

        match self.vendors.find_by_name(name).await {
            Some(existing) => Ok(NameCheck {
                is_unique: false,
                existing_vendor_id: Some(existing.id),
            }),
            None => Ok(NameCheck {
                is_unique: true,
                existing_vendor_id: None,
            }),
        }
    }

    async fn validate_export(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Result<ExportValidation, TransportError> {
        let mut errors = Vec::new();

        let start = match filters.start_date.as_deref() {
            Some(value) => match parse_flexible_date(value) {
                Some(date) => Some(date),
                None => {
                    errors.push(FieldError {
                        field: "start_date".to_string(),
                        message: format!("'{}' is not a valid date", value),
                    });
                    None
                }
            },
            None => None,
        };
        let end = match filters.end_date.as_deref() {
            Some(value) => match parse_flexible_date(value) {
                Some(date) => Some(date),
                None => {
                    errors.push(FieldError {
                        field: "end_date".to_string(),
                        message: format!("'{}' is not a valid date", value),
                    });
                    None
                }
            },
            None => None,
        };
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                errors.push(FieldError {
                    field: "start_date".to_string(),
                    message: "start date is after end date".to_string(),
                });
            }
        }

        let estimated_records = Self::estimated_records(kind);
        Ok(ExportValidation {
            valid: errors.is_empty(),
            errors,
            estimated_records,
            estimated_duration_seconds: estimated_records / 20 + 1,
        })
    }

    async fn start_export(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Result<StartedExport, TransportError> {
        let export_id = uuid::Uuid::new_v4().to_string();
        lock(&self.exports).insert(
            export_id.clone(),
            ExportState {
                kind,
                status: ExportStatus::Processing,
                total_records: Self::estimated_records(kind),
                processed_records: 0,
            },
        );
        Ok(StartedExport {
            export_id,
            csv: Self::render_csv(kind, filters),
        })
    }

    async fn export_progress(&self, export_id: &str) -> Result<ExportProgress, TransportError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);

        let mut exports = lock(&self.exports);
        let state = exports
            .get_mut(export_id)
            .ok_or_else(|| local_error(404, &format!("unknown export '{}'", export_id)))?;

        if state.status == ExportStatus::Processing {
            state.processed_records =
                (state.processed_records + EXPORT_CHUNK_RECORDS).min(state.total_records);
            if state.processed_records >= state.total_records {
                state.status = ExportStatus::Completed;
            }
        }

        let progress = if state.total_records == 0 {
            100.0
        } else {
            state.processed_records as f64 / state.total_records as f64 * 100.0
        };

        Ok(ExportProgress {
            status: state.status,
            progress,
            total_records: state.total_records,
            processed_records: state.processed_records,
            current_step: Some(format!("exporting {}", state.kind)),
        })
    }

    async fn cancel_export(&self, export_id: &str) -> Result<CancelAck, TransportError> {
        let delay = *lock(&self.cancel_ack_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut exports = lock(&self.exports);
        match exports.get_mut(export_id) {
            Some(state) if !state.status.is_terminal() => {
                state.status = ExportStatus::Cancelled;
                Ok(CancelAck {
                    success: true,
                    message: Some("export cancelled".to_string()),
                })
            }
            Some(_) => Ok(CancelAck {
                success: false,
                message: Some("export already finished".to_string()),
            }),
            None => Err(local_error(404, &format!("unknown export '{}'", export_id))),
        }
    }
}
