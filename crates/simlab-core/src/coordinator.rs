use simlab_events::LogCategory;
use simlab_protocol::{StkBuilderParams, TopicBrief, View};
use tracing::debug;

use crate::error::{SessionError, Settlement};
use crate::session::{InFlight, Session, Shared};

/// How `execute_command` was triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandMode {
    /// Operator action: gated by the in-flight flag, echoes a transport line.
    Interactive,
    /// Scheduler step: bypasses the gate, no transport echo.
    Scheduled,
}

fn non_blank(input: &str) -> Result<&str, SessionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err(SessionError::EmptyInput)
    } else {
        Ok(trimmed)
    }
}

impl Session {
    /// Runs `apply` under the state lock unless a reset happened since the
    /// request was issued.
    fn settle(&self, flight: &InFlight, apply: impl FnOnce(&mut Shared)) -> Settlement {
        let mut shared = self.shared();
        if shared.epoch != flight.epoch {
            debug!(target: "simlab::session", "dropping settlement from before reset");
            return Settlement::Discarded;
        }
        apply(&mut *shared);
        Settlement::Succeeded
    }

    fn fail(&self, flight: &InFlight, line: &str) -> Settlement {
        let shared = self.shared();
        if shared.epoch == flight.epoch {
            self.inner.log.append(line, LogCategory::SystemNotice);
            Settlement::Failed
        } else {
            Settlement::Discarded
        }
    }

    /// Decodes and analyzes a PDU concurrently. Both results are stored and
    /// reported together, or neither is.
    pub async fn submit_for_analysis(&self, pdu_hex: &str) -> Result<Settlement, SessionError> {
        let pdu = non_blank(pdu_hex)?;
        let flight = self.begin(true)?;
        {
            let mut shared = self.shared();
            shared.state.pdu_input = pdu.to_string();
            self.inner.log.append(
                format!("Submitting PDU for decode and analysis ({} octets)", pdu.len() / 2),
                LogCategory::ProtocolDecode,
            );
        }

        let oracle = &self.inner.oracle;
        let (decoded, analysis) = tokio::join!(oracle.decode(pdu), oracle.analyze_vulnerability(pdu));
        let (decoded, analysis) = match (decoded, analysis) {
            (Ok(decoded), Ok(analysis)) => (decoded, analysis),
            _ => return Ok(self.fail(&flight, "Analysis failed: the inference service did not respond")),
        };

        let log = &self.inner.log;
        Ok(self.settle(&flight, |shared| {
            log.append(
                format!(
                    "Decoded {} field(s); risk level {}",
                    decoded.components.len(),
                    analysis.risk_level.as_str()
                ),
                LogCategory::VulnerabilityScan,
            );
            if analysis.targets_stk() {
                let target = analysis.target_app.as_deref().unwrap_or("SIM toolkit");
                log.append(
                    format!("DETECTED: STK command targeting {target}"),
                    LogCategory::VulnerabilityScan,
                );
            }
            shared.state.decoded = Some(decoded);
            shared.state.analysis = Some(analysis);
        }))
    }

    /// Recovers builder parameters from a PDU and merges them into the form.
    pub async fn import_params(&self, pdu_hex: &str) -> Result<Settlement, SessionError> {
        let pdu = non_blank(pdu_hex)?;
        let flight = self.begin(true)?;
        self.inner.log.append(
            "Importing builder parameters from PDU",
            LogCategory::ProtocolDecode,
        );

        let imported = match self.inner.oracle.import_params(pdu).await {
            Ok(imported) => imported,
            Err(_) => return Ok(self.fail(&flight, "Parameter import failed")),
        };

        let log = &self.inner.log;
        Ok(self.settle(&flight, |shared| {
            let params = imported.params.normalized();
            log.append(
                format!(
                    "Imported {} parameter(s) for {}",
                    params.populated().len(),
                    imported.stk_type.display_label()
                ),
                LogCategory::PayloadGenerated,
            );
            shared.state.stk_type = imported.stk_type;
            shared.state.builder.merge(&params);
            shared.state.view = View::Builder;
        }))
    }

    /// Generates the named STK command for the current environment.
    ///
    /// On success a delayed follow-up is scheduled when a scripted run is
    /// active, or when an operator triggered the command without parameters.
    pub async fn execute_command(
        &self,
        name: &str,
        mode: CommandMode,
        params: Option<StkBuilderParams>,
    ) -> Result<Settlement, SessionError> {
        let name = non_blank(name)?;
        let flight = self.begin(mode == CommandMode::Interactive)?;
        Ok(self.run_command(flight, name, mode, params).await)
    }

    /// Merges the form into the builder params and executes the merged
    /// command type. Nothing changes when the merged form has no command
    /// type or the session is busy.
    pub async fn submit_builder_form(
        &self,
        params: StkBuilderParams,
    ) -> Result<Settlement, SessionError> {
        let params = params.normalized();
        let (flight, command_type, merged) = {
            let mut shared = self.shared();
            let mut merged = shared.state.builder.clone();
            merged.merge(&params);
            let command_type = merged
                .command_type
                .clone()
                .ok_or(SessionError::EmptyInput)?;
            let flight = self.admit(&mut shared, true)?;
            shared.state.builder = merged.clone();
            (flight, command_type, merged)
        };
        Ok(self
            .run_command(flight, &command_type, CommandMode::Interactive, Some(merged))
            .await)
    }

    async fn run_command(
        &self,
        flight: InFlight,
        name: &str,
        mode: CommandMode,
        params: Option<StkBuilderParams>,
    ) -> Settlement {
        let stk_type = {
            let shared = self.shared();
            let stk_type = shared.state.stk_type;
            if mode == CommandMode::Interactive {
                self.inner.log.append(
                    format!(
                        "sms-send --pid 0x7F --dcs 0xF6 --env {} \"{name}\"",
                        stk_type.as_str()
                    ),
                    LogCategory::ShellEcho,
                );
            }
            self.inner.log.append(
                format!("Generating {name} payload for {}", stk_type.display_label()),
                LogCategory::PayloadGenerated,
            );
            stk_type
        };

        let command = match self
            .inner
            .oracle
            .generate_command(name, stk_type, params.as_ref())
            .await
        {
            Ok(command) => command,
            Err(_) => return self.fail(&flight, "Payload generation failed"),
        };

        let log = &self.inner.log;
        let mut follow_up = false;
        let settlement = self.settle(&flight, |shared| {
            log.append(
                format!(
                    "Payload ready: {} [{}] {}",
                    command.name,
                    command.stk_type.as_str(),
                    command.payload
                ),
                LogCategory::PayloadGenerated,
            );
            follow_up = shared.state.scripted_run_active
                || (mode == CommandMode::Interactive && params.is_none());
            shared.state.command = Some(command);
        });
        if follow_up {
            self.inner.followups.schedule(
                self.inner.log.clone(),
                self.inner.oracle.clone(),
                name.to_string(),
                self.inner.settings.followup_delay,
            );
        }
        settlement
    }

    /// Fetches a research briefing and makes it the current info content.
    pub async fn fetch_topic(&self, topic: &str) -> Result<Settlement, SessionError> {
        let topic = non_blank(topic)?;
        let flight = self.begin(true)?;
        self.inner.log.append(
            format!("Fetching research notes: {topic}"),
            LogCategory::SystemNotice,
        );

        let body = match self.inner.oracle.explain_topic(topic).await {
            Ok(body) => body,
            Err(_) => return Ok(self.fail(&flight, "Research fetch failed")),
        };

        let log = &self.inner.log;
        Ok(self.settle(&flight, |shared| {
            log.append(
                format!("Research notes loaded: {topic}"),
                LogCategory::Success,
            );
            shared.state.topic_input = topic.to_string();
            shared.state.info = Some(TopicBrief {
                topic: topic.to_string(),
                body,
            });
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_rejected() {
        assert_eq!(non_blank("   \n"), Err(SessionError::EmptyInput));
        assert_eq!(non_blank("  00ff "), Ok("00ff"));
    }
}
