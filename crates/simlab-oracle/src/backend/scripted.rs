use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::InferenceBackend;
use crate::{OracleError, OracleOperation, OracleRequest};

/// A request observed by [`ScriptedBackend`], stamped when it was issued.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub operation: OracleOperation,
    pub subject: String,
    pub at: Instant,
}

type Reply = Result<String, OracleError>;

#[derive(Default)]
struct Script {
    queued: HashMap<OracleOperation, VecDeque<Reply>>,
    defaults: HashMap<OracleOperation, Reply>,
    latency: HashMap<OracleOperation, Duration>,
    calls: Vec<RecordedCall>,
}

/// In-process backend that replays canned replies.
///
/// Queued replies are consumed first (one per call), then the per-operation
/// default applies. Latency uses `tokio::time`, so paused-clock tests see
/// deterministic timings.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
    base_latency: Duration,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.base_latency = latency;
        self
    }

    pub fn with_operation_latency(self, operation: OracleOperation, latency: Duration) -> Self {
        self.script.lock().latency.insert(operation, latency);
        self
    }

    pub fn with_default(self, operation: OracleOperation, reply: impl Into<String>) -> Self {
        self.set_default(operation, Ok(reply.into()));
        self
    }

    pub fn with_failure(self, operation: OracleOperation, err: OracleError) -> Self {
        self.set_default(operation, Err(err));
        self
    }

    pub fn set_default(&self, operation: OracleOperation, reply: Reply) {
        self.script.lock().defaults.insert(operation, reply);
    }

    pub fn push(&self, operation: OracleOperation, reply: Reply) {
        self.script
            .lock()
            .queued
            .entry(operation)
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().calls.clone()
    }

    pub fn calls_for(&self, operation: OracleOperation) -> Vec<RecordedCall> {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().calls.len()
    }
}

#[async_trait::async_trait]
impl InferenceBackend for ScriptedBackend {
    fn id(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
        let latency = {
            let mut script = self.script.lock();
            script.calls.push(RecordedCall {
                operation: request.operation,
                subject: request.subject.clone(),
                at: Instant::now(),
            });
            script
                .latency
                .get(&request.operation)
                .copied()
                .unwrap_or(self.base_latency)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut script = self.script.lock();
        if let Some(reply) = script
            .queued
            .get_mut(&request.operation)
            .and_then(|q| q.pop_front())
        {
            return reply;
        }
        script
            .defaults
            .get(&request.operation)
            .cloned()
            .unwrap_or_else(|| {
                Err(OracleError::Unavailable(format!(
                    "no scripted reply for {}",
                    request.operation.as_str()
                )))
            })
    }
}
