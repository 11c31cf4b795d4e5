use serde::Serialize;
use simlab_events::LogEntry;
use simlab_protocol::{
    AnalysisResult, DecodedPdu, StkBuilderParams, StkCommand, StkType, TopicBrief, View,
};

/// What the operator is currently looking at.
///
/// One per session. `in_flight` and `scripted_run_active` are maintained by
/// the session and only mirrored here for readers.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub view: View,
    pub pdu_input: String,
    pub topic_input: String,
    pub stk_type: StkType,
    pub builder: StkBuilderParams,
    pub analysis: Option<AnalysisResult>,
    pub decoded: Option<DecodedPdu>,
    pub command: Option<StkCommand>,
    /// Informational content from a research fetch or an info example.
    pub info: Option<TopicBrief>,
    pub in_flight: bool,
    pub scripted_run_active: bool,
}

impl SessionState {
    pub fn has_results(&self) -> bool {
        self.analysis.is_some() || self.decoded.is_some() || self.command.is_some()
    }
}

/// A state copy taken together with the log under one lock.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub log: Vec<LogEntry>,
}
