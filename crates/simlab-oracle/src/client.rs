use std::sync::Arc;

use simlab_protocol::{
    AnalysisResult, DecodedPdu, ImportedParams, StkBuilderParams, StkCommand, StkType,
};
use tracing::warn;

use crate::{
    backend::InferenceBackend, prompt, validate, OracleError, OracleOperation, OracleRequest,
};

/// Typed operations over an [`InferenceBackend`].
///
/// The structured operations only return settlement failures (see
/// [`OracleError::is_settlement_failure`]); blank, malformed or unparseable
/// replies resolve to the documented fallback instead. `generate_command` is
/// the exception and reports unparseable replies as [`OracleError::Malformed`].
#[derive(Clone)]
pub struct OracleClient {
    backend: Arc<dyn InferenceBackend>,
}

impl OracleClient {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_id(&self) -> &'static str {
        self.backend.id()
    }

    async fn call(
        &self,
        operation: OracleOperation,
        subject: &str,
        instruction: String,
    ) -> Result<String, OracleError> {
        let request = OracleRequest::new(operation, subject, instruction);
        let result = self.backend.complete(request).await;
        if let Err(err) = &result {
            warn!(
                target: "simlab::oracle",
                operation = operation.as_str(),
                backend = self.backend.id(),
                error = %err,
                "oracle request failed"
            );
        }
        result
    }

    /// `call` for operations with a fallback: a reply that carried no usable
    /// text comes back as an empty string for the parser to reject.
    async fn call_structured(
        &self,
        operation: OracleOperation,
        subject: &str,
        instruction: String,
    ) -> Result<String, OracleError> {
        match self.call(operation, subject, instruction).await {
            Err(err) if !err.is_settlement_failure() => Ok(String::new()),
            other => other,
        }
    }

    fn fallback_note(operation: OracleOperation, raw: &str) {
        warn!(
            target: "simlab::oracle",
            operation = operation.as_str(),
            reply_len = raw.len(),
            "oracle reply did not match the requested shape; using fallback"
        );
    }

    pub async fn analyze_vulnerability(&self, pdu_hex: &str) -> Result<AnalysisResult, OracleError> {
        let raw = self
            .call_structured(OracleOperation::Analyze, pdu_hex, prompt::analyze(pdu_hex))
            .await?;
        let parsed = validate::extract_json(&raw)
            .as_ref()
            .and_then(validate::analysis_from_value);
        Ok(parsed.unwrap_or_else(|| {
            Self::fallback_note(OracleOperation::Analyze, &raw);
            AnalysisResult::parse_failure()
        }))
    }

    pub async fn decode(&self, pdu_hex: &str) -> Result<DecodedPdu, OracleError> {
        let raw = self
            .call_structured(OracleOperation::Decode, pdu_hex, prompt::decode(pdu_hex))
            .await?;
        let parsed = validate::extract_json(&raw)
            .as_ref()
            .and_then(validate::decode_from_value);
        Ok(parsed.unwrap_or_else(|| {
            Self::fallback_note(OracleOperation::Decode, &raw);
            DecodedPdu::default()
        }))
    }

    pub async fn import_params(&self, pdu_hex: &str) -> Result<ImportedParams, OracleError> {
        let raw = self
            .call_structured(
                OracleOperation::ImportParams,
                pdu_hex,
                prompt::import_params(pdu_hex),
            )
            .await?;
        let parsed = validate::extract_json(&raw)
            .as_ref()
            .and_then(validate::import_from_value);
        Ok(parsed.unwrap_or_else(|| {
            Self::fallback_note(OracleOperation::ImportParams, &raw);
            ImportedParams::default()
        }))
    }

    pub async fn generate_command(
        &self,
        intent: &str,
        stk_type: StkType,
        params: Option<&StkBuilderParams>,
    ) -> Result<StkCommand, OracleError> {
        let raw = self
            .call(
                OracleOperation::GenerateCommand,
                intent,
                prompt::generate_command(intent, stk_type, params),
            )
            .await?;
        let value = validate::extract_json(&raw)
            .ok_or_else(|| OracleError::Malformed("reply is not JSON".into()))?;
        validate::command_from_value(&value, stk_type).ok_or_else(|| {
            OracleError::Malformed("reply does not describe a command with a hex payload".into())
        })
    }

    pub async fn simulate_exfiltration(&self, command_type: &str) -> Result<String, OracleError> {
        self.call(
            OracleOperation::SimulateExfiltration,
            command_type,
            prompt::simulate_exfiltration(command_type),
        )
        .await
    }

    pub async fn explain_topic(&self, topic: &str) -> Result<String, OracleError> {
        self.call(
            OracleOperation::ExplainTopic,
            topic,
            prompt::explain_topic(topic),
        )
        .await
    }
}
