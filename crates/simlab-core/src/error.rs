use thiserror::Error;

/// Reasons a session operation is refused before any request is issued.
///
/// Oracle failures never surface here; they settle as a log line instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("input is empty")]
    EmptyInput,
    #[error("another request is still in flight")]
    Busy,
    #[error("a scripted run is already active")]
    SchedulerNotIdle,
    #[error("unknown example: {0}")]
    UnknownExample(String),
}

/// How a coordinated request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Succeeded,
    /// The oracle call failed; a single failure line was logged.
    Failed,
    /// The session was reset while the request was outstanding; the result was dropped.
    Discarded,
}

impl Settlement {
    pub fn is_success(&self) -> bool {
        matches!(self, Settlement::Succeeded)
    }
}
