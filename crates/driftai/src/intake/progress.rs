//! Intake progress broadcaster for observers of the upload workflow.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of the contract intake lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntakePhase {
    Submitting,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl std::fmt::Display for IntakePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakePhase::Submitting => write!(f, "Submitting"),
            IntakePhase::Polling => write!(f, "Processing"),
            IntakePhase::Completed => write!(f, "Completed"),
            IntakePhase::Failed => write!(f, "Failed"),
            IntakePhase::TimedOut => write!(f, "Timed out"),
        }
    }
}

/// Progress event for one intake workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeProgressEvent {
    /// Job identifier; absent until the server has accepted the upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Current phase of the workflow.
    pub phase: IntakePhase,
    /// Client-side progress estimate, 0–100.
    pub progress: f64,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
}

impl IntakeProgressEvent {
    pub fn new(job_id: Option<&str>, phase: IntakePhase, progress: f64, message: &str) -> Self {
        Self {
            job_id: job_id.map(|id| id.to_string()),
            phase,
            progress,
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts intake progress events to all subscribers.
#[derive(Clone)]
pub struct IntakeProgressBroadcaster {
    sender: Arc<broadcast::Sender<IntakeProgressEvent>>,
}

impl IntakeProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event. No active receivers is fine.
    pub fn send(&self, event: IntakeProgressEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IntakeProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for IntakeProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_receive() {
        let broadcaster = IntakeProgressBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        broadcaster.send(IntakeProgressEvent::new(
            Some("J1"),
            IntakePhase::Polling,
            40.0,
            "waiting for extraction",
        ));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.job_id.as_deref(), Some("J1"));
        assert_eq!(received.phase, IntakePhase::Polling);
        assert_eq!(received.progress, 40.0);
    }

    #[test]
    fn test_send_without_receivers_is_fine() {
        let broadcaster = IntakeProgressBroadcaster::new(4);
        broadcaster.send(IntakeProgressEvent::new(
            None,
            IntakePhase::Submitting,
            0.0,
            "uploading",
        ));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(IntakePhase::Polling.to_string(), "Processing");
        assert_eq!(IntakePhase::TimedOut.to_string(), "Timed out");
    }
}
