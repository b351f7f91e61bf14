//! Streaming CSV export: validate → start → poll progress → download.
//!
//! Cancellation stops the client's own polling immediately; the
//! server-side abort is issued without waiting for its acknowledgment.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::api::types::{
    ExportProgress, ExportStatus, ExportValidation, ReportFilters, ReportKind, StartedExport,
};
use crate::api::IntakeApi;
use crate::config::ClientConfig;
use crate::error::{DriftError, ExportError};

/// Cancellation handle for a running export.
#[derive(Clone)]
pub struct ExportCancel {
    sender: Arc<watch::Sender<bool>>,
}

impl ExportCancel {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Requests cancellation. Watching stops on the next opportunity
    /// without waiting for the server.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for ExportCancel {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished export delivered to the caller.
#[derive(Debug, Clone)]
pub struct CompletedExport {
    pub export_id: String,
    pub csv: Vec<u8>,
    pub final_progress: ExportProgress,
}

/// Client for long-running server-generated CSV reports.
pub struct StreamingExportClient {
    api: Arc<dyn IntakeApi>,
    poll_interval: Duration,
    progress_events: broadcast::Sender<ExportProgress>,
}

impl StreamingExportClient {
    pub fn new(api: Arc<dyn IntakeApi>, config: &ClientConfig) -> Self {
        let (progress_events, _) = broadcast::channel(100);
        Self {
            api,
            poll_interval: Duration::from_millis(config.export_poll_interval_ms),
            progress_events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExportProgress> {
        self.progress_events.subscribe()
    }

    /// Pre-flight parameter check: per-field errors plus size and
    /// duration estimates, without paying for a full export attempt.
    pub async fn validate(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Result<ExportValidation, DriftError> {
        Ok(self.api.validate_export(kind, filters).await?)
    }

    /// Starts an export; the response carries the CSV body and the id
    /// used for progress tracking and cancellation.
    pub async fn start(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Result<StartedExport, DriftError> {
        Ok(self.api.start_export(kind, filters).await?)
    }

    /// Full run: validate, start, and poll to a terminal status.
    pub async fn export(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
        cancel: &ExportCancel,
    ) -> Result<CompletedExport, DriftError> {
        let validation = self.validate(kind, filters).await?;
        if !validation.valid {
            return Err(ExportError::InvalidParameters {
                errors: validation.errors,
            }
            .into());
        }
        info!(
            "starting {} export (~{} records, ~{}s)",
            kind, validation.estimated_records, validation.estimated_duration_seconds
        );

        let started = self.start(kind, filters).await?;
        let final_progress = self.watch(&started.export_id, cancel).await?;
        Ok(CompletedExport {
            export_id: started.export_id,
            csv: started.csv,
            final_progress,
        })
    }

    /// Polls export progress until a terminal status, honoring the
    /// cancel handle between and during waits.
    pub async fn watch(
        &self,
        export_id: &str,
        cancel: &ExportCancel,
    ) -> Result<ExportProgress, DriftError> {
        let mut cancelled = cancel.subscribe();
        loop {
            if *cancelled.borrow() {
                return Err(self.issue_cancel(export_id));
            }

            let progress = self.api.export_progress(export_id).await?;
            debug!(
                "export {}: {:.0}% ({}/{} records)",
                export_id, progress.progress, progress.processed_records, progress.total_records
            );
            let _ = self.progress_events.send(progress.clone());

            match progress.status {
                ExportStatus::Completed => return Ok(progress),
                ExportStatus::Failed => {
                    let message = match progress.current_step {
                        Some(step) => format!("export failed during {}", step),
                        None => "export failed".to_string(),
                    };
                    return Err(ExportError::Failed(message).into());
                }
                ExportStatus::Cancelled => return Err(ExportError::Cancelled.into()),
                ExportStatus::Pending | ExportStatus::Processing => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancelled.changed() => {}
            }
        }
    }

    /// Issues the server-side abort without waiting for its
    /// acknowledgment.
    fn issue_cancel(&self, export_id: &str) -> DriftError {
        let api = Arc::clone(&self.api);
        let export_id = export_id.to_string();
        tokio::spawn(async move {
            match api.cancel_export(&export_id).await {
                Ok(ack) => debug!(
                    "export {} cancel acknowledged: success={}",
                    export_id, ack.success
                ),
                Err(error) => warn!("export {} cancel request failed: {}", export_id, error),
            }
        });
        ExportError::Cancelled.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_handle_flags() {
        let cancel = ExportCancel::new();
        assert!(!cancel.is_cancelled());
        cancel.cancel();
        assert!(cancel.is_cancelled());
        // Clones observe the same flag.
        assert!(cancel.clone().is_cancelled());
    }
}
