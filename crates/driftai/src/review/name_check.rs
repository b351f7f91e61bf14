//! Debounced vendor-name uniqueness checking.
//!
//! Each edit supersedes the previous check: the generation recorded at
//! edit time must still match when the debounce fires and again when
//! the response arrives, or the result is discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::IntakeApi;

use super::MIN_NAME_LENGTH;

/// Outcome of the latest uniqueness check for the current input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameCheckState {
    Idle,
    Checking,
    Unique,
    Duplicate { existing_vendor_id: Option<String> },
}

struct CheckerInner {
    generation: u64,
    state: NameCheckState,
    task: Option<JoinHandle<()>>,
}

/// Runs the latest of overlapping name checks and discards stale
/// results.
pub struct NameUniquenessChecker {
    api: Arc<dyn IntakeApi>,
    debounce: Duration,
    inner: Arc<Mutex<CheckerInner>>,
}

fn lock(inner: &Mutex<CheckerInner>) -> MutexGuard<'_, CheckerInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NameUniquenessChecker {
    pub fn new(api: Arc<dyn IntakeApi>, debounce: Duration) -> Self {
        Self {
            api,
            debounce,
            inner: Arc::new(Mutex::new(CheckerInner {
                generation: 0,
                state: NameCheckState::Idle,
                task: None,
            })),
        }
    }

    pub fn state(&self) -> NameCheckState {
        lock(&self.inner).state.clone()
    }

    /// Registers an edit of the name input. A check fires after the
    /// quiet period unless another edit supersedes it first. Names too
    /// short to submit reset the state without issuing a check.
    ///
    /// Must be called from within a tokio runtime.
    pub fn edit(&self, name: &str) {
        let name = name.trim().to_string();

        let generation = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            if let Some(task) = inner.task.take() {
                task.abort();
            }
            if name.chars().count() < MIN_NAME_LENGTH {
                inner.state = NameCheckState::Idle;
                return;
            }
            inner.state = NameCheckState::Checking;
            inner.generation
        };

        let api = Arc::clone(&self.api);
        let shared = Arc::clone(&self.inner);
        let debounce = self.debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if lock(&shared).generation != generation {
                return;
            }

            debug!("checking uniqueness of vendor name '{}'", name);
            let result = api.check_name(&name).await;

            let mut inner = lock(&shared);
            if inner.generation != generation {
                debug!("discarding superseded name check for '{}'", name);
                return;
            }
            inner.state = match result {
                Ok(check) if check.is_unique => NameCheckState::Unique,
                Ok(check) => NameCheckState::Duplicate {
                    existing_vendor_id: check.existing_vendor_id,
                },
                Err(error) => {
                    // The confirm endpoint still enforces uniqueness
                    // server-side.
                    warn!("name check for '{}' failed: {}", name, error);
                    NameCheckState::Idle
                }
            };
        });
        lock(&self.inner).task = Some(task);
    }

    /// Waits for the pending check, if any, to finish.
    pub async fn settle(&self) {
        let task = lock(&self.inner).task.take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::local::LocalIntakeService;
    use crate::api::types::ConfirmVendorRequest;

    fn checker() -> (Arc<LocalIntakeService>, NameUniquenessChecker) {
        let service = Arc::new(LocalIntakeService::new());
        let checker = NameUniquenessChecker::new(
            Arc::clone(&service) as Arc<dyn IntakeApi>,
            Duration::from_millis(500),
        );
        (service, checker)
    }

    async fn seed_vendor(service: &LocalIntakeService, name: &str) {
        service
            .confirm_vendor(&ConfirmVendorRequest {
                primary_vendor_name: name.to_string(),
                dba_display_name: None,
                effective_date: "2024-01-01".to_string(),
                renewal_end_date: None,
                category: None,
                job_id: "J0".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_issue_one_check() {
        let (service, checker) = checker();

        checker.edit("Acme");
        checker.edit("Acme Corp");
        assert_eq!(checker.state(), NameCheckState::Checking);

        checker.settle().await;
        assert_eq!(service.name_check_calls(), 1);
        assert_eq!(service.last_checked_name().as_deref(), Some("Acme Corp"));
        assert_eq!(checker.state(), NameCheckState::Unique);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_name_carries_existing_vendor_id() {
        let (service, checker) = checker();
        seed_vendor(&service, "Acme Corp").await;

        checker.edit("acme corp");
        checker.settle().await;

        match checker.state() {
            NameCheckState::Duplicate { existing_vendor_id } => {
                assert!(existing_vendor_id.is_some())
            }
            state => panic!("expected duplicate, got {:?}", state),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_name_resets_without_check() {
        let (service, checker) = checker();

        checker.edit("Acme");
        checker.edit("A");
        checker.settle().await;

        assert_eq!(checker.state(), NameCheckState::Idle);
        assert_eq!(service.name_check_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_edits_each_fire() {
        let (service, checker) = checker();

        checker.edit("Acme");
        checker.settle().await;
        checker.edit("Acme Corp");
        checker.settle().await;

        assert_eq!(service.name_check_calls(), 2);
        assert_eq!(service.last_checked_name().as_deref(), Some("Acme Corp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_trims_input() {
        let (service, checker) = checker();

        checker.edit("  Acme Co  ");
        checker.settle().await;

        assert_eq!(service.last_checked_name().as_deref(), Some("Acme Co"));
    }
}
