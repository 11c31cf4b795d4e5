use std::sync::{Arc, Weak};
use std::time::Duration;

use simlab_events::LogCategory;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::CommandMode;
use crate::error::SessionError;
use crate::session::{Inner, Session};

/// Command triggers replayed by a scripted run, in order.
pub const DEFAULT_SEQUENCE: &[&str] = &[
    "PROVIDE LOCAL INFO",
    "SEND SHORT MESSAGE",
    "LAUNCH BROWSER",
    "SET UP CALL",
    "DISPLAY TEXT",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulerPhase {
    #[default]
    Idle,
    Running {
        run_id: u64,
    },
    Stopping,
}

impl SchedulerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerPhase::Idle => "idle",
            SchedulerPhase::Running { .. } => "running",
            SchedulerPhase::Stopping => "stopping",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SchedulerPhase::Running { .. })
    }
}

struct RunTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Sole owner of the repeating timer.
#[derive(Default)]
pub(crate) struct SchedulerSlot {
    phase: SchedulerPhase,
    task: Option<RunTask>,
    next_run_id: u64,
}

impl SchedulerSlot {
    pub(crate) fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Stops the timer without touching session state or the log.
    pub(crate) fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            task.handle.abort();
        }
        self.phase = SchedulerPhase::Idle;
    }
}

impl Session {
    pub fn scheduler_phase(&self) -> SchedulerPhase {
        self.inner.scheduler.lock().phase()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler_phase().is_running()
    }

    /// Starts the scripted run: step 0 fires immediately, then one step per
    /// `step_interval`. Refused unless the scheduler is idle.
    pub fn start_simulation(&self) -> Result<(), SessionError> {
        let mut slot = self.inner.scheduler.lock();
        if slot.phase != SchedulerPhase::Idle {
            return Err(SessionError::SchedulerNotIdle);
        }
        slot.next_run_id += 1;
        let run_id = slot.next_run_id;
        slot.phase = SchedulerPhase::Running { run_id };
        self.shared().state.scripted_run_active = true;

        let settings = &self.inner.settings;
        self.inner.log.append(
            format!(
                "Scripted run started: {} step(s) every {}s",
                settings.sequence.len(),
                settings.step_interval.as_secs_f64()
            ),
            LogCategory::SystemNotice,
        );
        info!(target: "simlab::scheduler", run_id, "scripted run started");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::downgrade(&self.inner),
            run_id,
            cancel.clone(),
            settings.step_interval,
        ));
        slot.task = Some(RunTask { cancel, handle });
        Ok(())
    }

    /// Stops the scripted run. Safe to call at any time; follow-ups already
    /// scheduled are left alone.
    pub fn stop_simulation(&self) {
        self.halt(None);
    }

    /// Starts when idle, stops otherwise. Returns whether a run is now active.
    pub fn toggle_simulation(&self) -> Result<bool, SessionError> {
        if self.is_running() {
            self.stop_simulation();
            Ok(false)
        } else {
            self.start_simulation()?;
            Ok(true)
        }
    }

    /// `from_run` is set when the run loop stops itself; it must not abort
    /// its own task and must not stop a newer run.
    fn halt(&self, from_run: Option<u64>) -> bool {
        let mut slot = self.inner.scheduler.lock();
        let SchedulerPhase::Running { run_id } = slot.phase else {
            return false;
        };
        if from_run.is_some_and(|id| id != run_id) {
            return false;
        }
        slot.phase = SchedulerPhase::Stopping;
        if let Some(task) = slot.task.take() {
            task.cancel.cancel();
            if from_run.is_none() {
                task.handle.abort();
            }
        }
        self.shared().state.scripted_run_active = false;
        slot.phase = SchedulerPhase::Idle;
        self.inner
            .log
            .append("Scripted run halted", LogCategory::SystemNotice);
        info!(target: "simlab::scheduler", run_id, "scripted run halted");
        true
    }

    fn owns_run(&self, run_id: u64) -> bool {
        self.inner.scheduler.lock().phase == SchedulerPhase::Running { run_id }
    }

    fn finish_run(&self, run_id: u64) {
        if !self.owns_run(run_id) {
            return;
        }
        self.inner.log.append(
            "Scripted run complete: all steps executed",
            LogCategory::SystemNotice,
        );
        self.halt(Some(run_id));
    }
}

async fn run_loop(
    inner: Weak<Inner>,
    run_id: u64,
    cancel: CancellationToken,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cursor = 0usize;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(target: "simlab::scheduler", run_id, "run loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                let session = Session { inner };
                if !session.owns_run(run_id) {
                    break;
                }
                let Some(name) = session.inner.settings.sequence.get(cursor).cloned() else {
                    session.finish_run(run_id);
                    break;
                };
                debug!(target: "simlab::scheduler", run_id, step = cursor, command = %name, "step fired");
                cursor += 1;
                // Steps run on their own task so a slow oracle never delays the timer.
                tokio::spawn(async move {
                    match session.execute_command(&name, CommandMode::Scheduled, None).await {
                        Ok(outcome) => {
                            debug!(target: "simlab::scheduler", run_id, command = %name, ?outcome, "step settled");
                        }
                        Err(err) => {
                            debug!(target: "simlab::scheduler", run_id, command = %name, error = %err, "step refused");
                        }
                    }
                });
            }
        }
    }
}
