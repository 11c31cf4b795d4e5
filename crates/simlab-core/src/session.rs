use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use simlab_events::{ActivityLog, LogEvent};
use simlab_oracle::OracleClient;
use simlab_protocol::{StkBuilderParams, StkType, View};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::followup::{FollowupPolicy, FollowupTracker};
use crate::scheduler::{SchedulerSlot, DEFAULT_SEQUENCE};
use crate::state::{SessionSnapshot, SessionState};

pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(8000);
pub const DEFAULT_FOLLOWUP_DELAY: Duration = Duration::from_millis(2500);

/// Tunables resolved from configuration before the session starts.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub step_interval: Duration,
    pub followup_delay: Duration,
    pub followup_policy: FollowupPolicy,
    pub sequence: Vec<String>,
    pub log_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            step_interval: DEFAULT_STEP_INTERVAL,
            followup_delay: DEFAULT_FOLLOWUP_DELAY,
            followup_policy: FollowupPolicy::default(),
            sequence: DEFAULT_SEQUENCE.iter().map(|s| s.to_string()).collect(),
            log_capacity: 256,
        }
    }
}

pub(crate) struct Shared {
    pub(crate) state: SessionState,
    /// Outstanding oracle requests; `state.in_flight` mirrors `pending > 0`.
    pub(crate) pending: usize,
    /// Bumped on every reset so late settlements can tell they are stale.
    pub(crate) epoch: u64,
}

pub(crate) struct Inner {
    pub(crate) shared: Mutex<Shared>,
    pub(crate) log: ActivityLog,
    pub(crate) oracle: OracleClient,
    pub(crate) settings: SessionSettings,
    pub(crate) scheduler: Mutex<SchedulerSlot>,
    pub(crate) followups: FollowupTracker,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.scheduler.get_mut().teardown();
        if self.settings.followup_policy == FollowupPolicy::Session {
            self.followups.abort_all();
        }
    }
}

/// One operator session: state, activity log, oracle access and the
/// scripted-run scheduler. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<Inner>,
}

/// Holds one unit of the in-flight count; released on drop so every exit
/// path of a request clears it.
pub(crate) struct InFlight {
    inner: Arc<Inner>,
    pub(crate) epoch: u64,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut shared = self.inner.shared.lock();
        shared.pending = shared.pending.saturating_sub(1);
        shared.state.in_flight = shared.pending > 0;
    }
}

impl Session {
    pub fn new(oracle: OracleClient, settings: SessionSettings) -> Self {
        info!(
            target: "simlab::session",
            backend = oracle.backend_id(),
            followup_policy = settings.followup_policy.as_str(),
            steps = settings.sequence.len(),
            "session started"
        );
        let log = ActivityLog::new(settings.log_capacity);
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    state: SessionState::default(),
                    pending: 0,
                    epoch: 0,
                }),
                log,
                oracle,
                settings,
                scheduler: Mutex::new(SchedulerSlot::default()),
                followups: FollowupTracker::default(),
            }),
        }
    }

    pub fn log(&self) -> &ActivityLog {
        &self.inner.log
    }

    pub fn oracle(&self) -> &OracleClient {
        &self.inner.oracle
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.inner.log.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.shared.lock().state.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let shared = self.inner.shared.lock();
        SessionSnapshot {
            state: shared.state.clone(),
            log: self.inner.log.entries(),
        }
    }

    pub fn in_flight(&self) -> bool {
        self.inner.shared.lock().pending > 0
    }

    pub fn pending_followups(&self) -> usize {
        self.inner.followups.pending()
    }

    pub(crate) fn shared(&self) -> MutexGuard<'_, Shared> {
        self.inner.shared.lock()
    }

    /// Takes an in-flight slot. Gated callers are refused while any request
    /// is outstanding; scheduled steps are counted but never refused.
    pub(crate) fn begin(&self, gated: bool) -> Result<InFlight, SessionError> {
        self.admit(&mut self.inner.shared.lock(), gated)
    }

    /// `begin` for callers that already hold the shared lock.
    pub(crate) fn admit(&self, shared: &mut Shared, gated: bool) -> Result<InFlight, SessionError> {
        if gated && shared.pending > 0 {
            debug!(target: "simlab::session", pending = shared.pending, "request refused: busy");
            return Err(SessionError::Busy);
        }
        shared.pending += 1;
        shared.state.in_flight = true;
        Ok(InFlight {
            inner: self.inner.clone(),
            epoch: shared.epoch,
        })
    }

    pub fn set_view(&self, view: View) {
        self.inner.shared.lock().state.view = view;
    }

    pub fn set_pdu_input(&self, value: impl Into<String>) {
        self.inner.shared.lock().state.pdu_input = value.into();
    }

    pub fn set_topic_input(&self, value: impl Into<String>) {
        self.inner.shared.lock().state.topic_input = value.into();
    }

    pub fn set_stk_type(&self, stk_type: StkType) {
        self.inner.shared.lock().state.stk_type = stk_type;
    }

    /// Merges populated fields into the builder form; absent fields are kept.
    pub fn update_builder(&self, params: &StkBuilderParams) {
        let params = params.clone().normalized();
        self.inner.shared.lock().state.builder.merge(&params);
    }

    /// Clears the analysis banner and the decoded table together.
    pub fn dismiss_analysis(&self) {
        let mut shared = self.inner.shared.lock();
        shared.state.analysis = None;
        shared.state.decoded = None;
    }

    pub fn dismiss_command(&self) {
        self.inner.shared.lock().state.command = None;
    }

    /// Returns the session to its initial state in one transition: the
    /// scripted run is torn down, the log emptied and every field reset.
    /// Subscribers see a single `Cleared` event and nothing in between.
    pub fn reset(&self) {
        let mut slot = self.inner.scheduler.lock();
        let was_running = slot.phase().is_running();
        slot.teardown();
        let cancelled = if self.inner.settings.followup_policy == FollowupPolicy::Session {
            self.inner.followups.abort_all()
        } else {
            0
        };
        let mut shared = self.inner.shared.lock();
        shared.epoch += 1;
        shared.state = SessionState {
            in_flight: shared.pending > 0,
            ..SessionState::default()
        };
        self.inner.log.clear();
        drop(shared);
        drop(slot);
        info!(
            target: "simlab::session",
            cancelled_followups = cancelled,
            halted_run = was_running,
            "session reset"
        );
    }

    /// Teardown: stops the repeating timer and, under the session policy,
    /// aborts outstanding follow-ups.
    pub fn shutdown(&self) {
        self.stop_simulation();
        if self.inner.settings.followup_policy == FollowupPolicy::Session {
            self.inner.followups.abort_all();
        }
        info!(target: "simlab::session", "session shut down");
    }
}
