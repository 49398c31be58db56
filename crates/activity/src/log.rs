//! Activity log sink abstraction.
//!
//! Recording is fire-and-forget from the caller's point of view: a failed
//! append is reported back so the caller can log it, but it never undoes the
//! change that produced the event.

use std::sync::Arc;

use crate::{ActivityEvent, Event};

pub trait ActivityLog: Send + Sync {
    fn record(&self, event: &ActivityEvent) -> Result<(), anyhow::Error>;
}

impl<L> ActivityLog for Arc<L>
where
    L: ActivityLog + ?Sized,
{
    fn record(&self, event: &ActivityEvent) -> Result<(), anyhow::Error> {
        (**self).record(event)
    }
}

/// Activity log that writes every entry as a structured `tracing` event.
///
/// Default sink when the host has no dedicated activity store.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(&self, event: &ActivityEvent) -> Result<(), anyhow::Error> {
        tracing::info!(
            activity_type = event.event_type(),
            author = %event.author,
            occurred_at = %event.occurred_at().to_rfc3339(),
            "{}",
            event.message
        );
        Ok(())
    }
}
