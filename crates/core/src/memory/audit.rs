//! Audit recorder keeping events in memory.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::register::{AuditEvent, AuditRecorder, RegisterError};

/// Collects audit events in memory.
///
/// Can be switched into a failing mode to exercise the path where the audit
/// sink is unavailable.
#[derive(Debug, Default)]
pub struct RecordingAuditRecorder {
    events: Mutex<Vec<AuditEvent>>,
    failing: AtomicBool,
}

impl RecordingAuditRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `record` calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of the recorded events.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }
}

impl AuditRecorder for RecordingAuditRecorder {
    async fn record(&self, event: AuditEvent) -> Result<(), RegisterError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegisterError::Storage("audit sink unavailable".to_string()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}
