use std::time::Duration;

use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use simlab_events::{ActivityLog, LogCategory};
use simlab_oracle::OracleClient;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Lifecycle of the delayed follow-up scheduled after a command executes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FollowupPolicy {
    /// Follow-ups outlive resets and scheduler stops once scheduled.
    #[default]
    Detached,
    /// Follow-ups are aborted on session reset and teardown.
    Session,
}

impl FollowupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowupPolicy::Detached => "detached",
            FollowupPolicy::Session => "session",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "detached" | "fire_and_forget" | "fire-and-forget" => Some(FollowupPolicy::Detached),
            "session" | "bound" => Some(FollowupPolicy::Session),
            _ => None,
        }
    }
}

struct Followup {
    command: String,
    handle: JoinHandle<()>,
}

/// Tracks spawned follow-up tasks so a session-bound policy can abort them.
#[derive(Default)]
pub(crate) struct FollowupTracker {
    tasks: Mutex<Vec<Followup>>,
}

impl FollowupTracker {
    /// Sleeps for `delay`, asks the oracle for the simulated recovery data and
    /// appends the outcome. Captures the log and client only, never the session.
    pub(crate) fn schedule(
        &self,
        log: ActivityLog,
        oracle: OracleClient,
        command: String,
        delay: Duration,
    ) {
        let name = command.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match oracle.simulate_exfiltration(&name).await {
                Ok(data) => {
                    log.append(
                        format!("Recovered data from {name}: {}", data.trim()),
                        LogCategory::ReceivedData,
                    );
                    log.append(
                        format!("{name} completed on target SIM"),
                        LogCategory::Success,
                    );
                }
                Err(_) => {
                    log.append(
                        format!("Follow-up for {name} did not return data"),
                        LogCategory::SystemNotice,
                    );
                }
            }
        });
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.handle.is_finished());
        trace!(target: "simlab::session", command = %command, "follow-up scheduled");
        tasks.push(Followup { command, handle });
    }

    /// Follow-ups that have not completed yet.
    pub(crate) fn pending(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|t| !t.handle.is_finished())
            .count()
    }

    pub(crate) fn abort_all(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let mut aborted = 0;
        for task in tasks.drain(..) {
            if !task.handle.is_finished() {
                debug!(
                    target: "simlab::session",
                    command = %task.command,
                    "follow-up cancelled"
                );
                aborted += 1;
            }
            task.handle.abort();
        }
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_slugs() {
        assert_eq!(
            FollowupPolicy::from_slug("Session"),
            Some(FollowupPolicy::Session)
        );
        assert_eq!(
            FollowupPolicy::from_slug("fire-and-forget"),
            Some(FollowupPolicy::Detached)
        );
        assert_eq!(FollowupPolicy::from_slug("never"), None);
        assert_eq!(FollowupPolicy::default().as_str(), "detached");
    }

    #[test]
    fn policy_serializes_snake_case() {
        let json = serde_json::to_string(&FollowupPolicy::Session).expect("json");
        assert_eq!(json, "\"session\"");
    }
}
