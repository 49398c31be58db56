//! Activity events emitted by user-administration operations, and the log
//! they are appended to.

pub mod event;
pub mod in_memory_log;
pub mod log;

pub use event::{ActivityEvent, ActivityType, Event};
pub use in_memory_log::{InMemoryActivityLog, InMemoryLogError};
pub use log::{ActivityLog, TracingActivityLog};
