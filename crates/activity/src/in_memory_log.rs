//! In-memory activity log for tests/dev.

use std::sync::Mutex;

use thiserror::Error;

use crate::{ActivityEvent, ActivityLog};

#[derive(Debug, Error)]
pub enum InMemoryLogError {
    /// Append failed due to internal lock poisoning.
    #[error("activity log lock poisoned")]
    Poisoned,
}

/// Append-only in-memory activity log.
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    entries: Mutex<Vec<ActivityEvent>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries in append order.
    pub fn entries(&self) -> Vec<ActivityEvent> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl ActivityLog for InMemoryActivityLog {
    fn record(&self, event: &ActivityEvent) -> Result<(), anyhow::Error> {
        let mut entries = self.entries.lock().map_err(|_| InMemoryLogError::Poisoned)?;
        entries.push(event.clone());
        Ok(())
    }
}
