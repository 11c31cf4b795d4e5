//! Session orchestration for the SIM/SMS research console: coordinates oracle
//! requests behind an in-flight gate, drives the scripted run on a repeating
//! timer and records everything in the activity log.

pub mod bootstrap;
pub mod config;
mod coordinator;
mod error;
mod followup;
pub mod presets;
mod scheduler;
mod session;
mod state;
#[cfg(test)]
mod test_support;

pub use coordinator::CommandMode;
pub use error::{SessionError, Settlement};
pub use followup::FollowupPolicy;
pub use presets::{Example, ExampleKind};
pub use scheduler::{SchedulerPhase, DEFAULT_SEQUENCE};
pub use session::{Session, SessionSettings, DEFAULT_FOLLOWUP_DELAY, DEFAULT_STEP_INTERVAL};
pub use state::{SessionSnapshot, SessionState};

pub use simlab_events::{ActivityLog, LogCategory, LogEntry, LogEvent};
