use serde_json::json;

use super::InferenceBackend;
use crate::{validate::normalize_hex, OracleError, OracleOperation, OracleRequest};

/// Offline backend used when no inference service is configured.
///
/// Replies are canned and derived from the request subject with simple octet
/// slicing; they are placeholders for a real oracle, not a PDU decoder.
#[derive(Default)]
pub struct SyntheticBackend;

impl SyntheticBackend {
    pub fn new() -> Self {
        Self
    }
}

fn octets(hex: &str) -> Vec<&str> {
    (0..hex.len() / 2).map(|i| &hex[i * 2..i * 2 + 2]).collect()
}

fn looks_silent(hex: &str) -> bool {
    hex.ends_with("40") || hex.contains("0040")
}

fn looks_stk(hex: &str) -> bool {
    hex.contains("7F") || hex.contains("F6") || hex.contains("D0")
}

fn analyze(subject: &str) -> String {
    let Some(hex) = normalize_hex(subject) else {
        return "The input is not a hex string.".to_string();
    };
    let silent = looks_silent(&hex);
    let stk = looks_stk(&hex);
    let (risk, explanation) = match (silent, stk) {
        (_, true) => (
            "Critical",
            "User data resembles a SIM data-download envelope addressed to the SIM card.",
        ),
        (true, false) => (
            "High",
            "Protocol identifier suggests a Type-0 message that the handset acknowledges silently.",
        ),
        (false, false) => ("Low", "Ordinary point-to-point short message."),
    };
    json!({
        "isSilent": silent,
        "isStkCommand": stk,
        "targetApp": if stk { Some("S@T Browser") } else { None },
        "explanation": explanation,
        "riskLevel": risk,
        "mitigation": "Filter binary SMS with PID 0x7F and Type-0 messages at the network edge.",
    })
    .to_string()
}

fn decode(subject: &str) -> String {
    let Some(hex) = normalize_hex(subject) else {
        return json!({"components": []}).to_string();
    };
    let bytes = octets(&hex);
    let mut components = Vec::new();
    let smsc_len = bytes
        .first()
        .and_then(|b| usize::from_str_radix(b, 16).ok())
        .unwrap_or(0);
    if let Some(first) = bytes.first() {
        components.push(json!({
            "name": "SMSC Length",
            "value": first,
            "description": format!("{smsc_len} octets of service centre address follow"),
        }));
    }
    let smsc_end = (1 + smsc_len).min(bytes.len());
    if smsc_end > 1 {
        components.push(json!({
            "name": "SMSC Address",
            "value": bytes[1..smsc_end].concat(),
            "description": "Type of address followed by semi-octet digits",
        }));
    }
    if let Some(first_octet) = bytes.get(smsc_end) {
        components.push(json!({
            "name": "First Octet",
            "value": first_octet,
            "description": "Message type indicator and flags",
        }));
    }
    if bytes.len() > smsc_end + 1 {
        components.push(json!({
            "name": "Remaining Octets",
            "value": bytes[smsc_end + 1..].concat(),
            "description": "Address, PID, DCS and user data (not broken down offline)",
            "isVulnerable": looks_silent(&hex) || looks_stk(&hex),
        }));
    }
    json!({ "components": components }).to_string()
}

fn import_params(subject: &str) -> String {
    let hex = normalize_hex(subject).unwrap_or_default();
    let stk_type = if hex.contains("7F") {
        "SAT_BROWSER"
    } else if hex.contains("D0") {
        "PROACTIVE_SIM"
    } else {
        "WIB"
    };
    json!({
        "stkType": stk_type,
        "params": {"commandType": "PROVIDE LOCAL INFO"},
    })
    .to_string()
}

fn generate(subject: &str, instruction: &str) -> String {
    let body: String = subject
        .bytes()
        .take(24)
        .map(|b| format!("{b:02X}"))
        .collect();
    let environment = ["SAT_BROWSER", "PROACTIVE_SIM", "WIB"]
        .into_iter()
        .find(|env| instruction.contains(env))
        .unwrap_or("SAT_BROWSER");
    json!({
        "name": subject,
        "description": format!("Illustrative {subject} proactive command"),
        "payload": format!("D0{:02X}8103010000{}", body.len() / 2 + 5, body),
        "impact": "Demonstrates how the SIM can act without user interaction.",
        "stkType": environment,
    })
    .to_string()
}

#[async_trait::async_trait]
impl InferenceBackend for SyntheticBackend {
    fn id(&self) -> &'static str {
        "synthetic"
    }

    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
        let subject = request.subject.trim();
        Ok(match request.operation {
            OracleOperation::Analyze => analyze(subject),
            OracleOperation::Decode => decode(subject),
            OracleOperation::ImportParams => import_params(subject),
            OracleOperation::GenerateCommand => generate(subject, &request.instruction),
            OracleOperation::SimulateExfiltration => format!(
                "[lab] {subject}: MCC 001 MNC 01 LAC 0x1A2B CID 0x00F3 IMEI 00-000000-000000-0"
            ),
            OracleOperation::ExplainTopic => format!(
                "Offline mode: no briefing available for \"{subject}\". Configure an inference \
                 service to fetch research notes."
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate;

    const SAMPLE: &str = "079144775810065011000A81100000000040";

    async fn reply(op: OracleOperation, subject: &str) -> String {
        SyntheticBackend
            .complete(OracleRequest::new(op, subject, ""))
            .await
            .expect("synthetic never fails")
    }

    #[tokio::test]
    async fn analysis_reply_passes_validation() {
        let raw = reply(OracleOperation::Analyze, SAMPLE).await;
        let value = validate::extract_json(&raw).expect("json");
        let analysis = validate::analysis_from_value(&value).expect("valid analysis");
        assert!(analysis.is_silent);
    }

    #[tokio::test]
    async fn decode_reply_splits_smsc() {
        let raw = reply(OracleOperation::Decode, SAMPLE).await;
        let value = validate::extract_json(&raw).expect("json");
        let decoded = validate::decode_from_value(&value).expect("valid decode");
        assert_eq!(decoded.components[0].name, "SMSC Length");
        assert_eq!(decoded.components[1].value, "91447758100650");
        assert_eq!(decoded.components[2].value, "11");
    }

    #[tokio::test]
    async fn generated_command_has_hex_payload() {
        let raw = reply(OracleOperation::GenerateCommand, "DISPLAY TEXT").await;
        let value = validate::extract_json(&raw).expect("json");
        let cmd = validate::command_from_value(&value, simlab_protocol::StkType::Wib)
            .expect("valid command");
        assert!(cmd.payload.starts_with("D0"));
        assert_eq!(cmd.name, "DISPLAY TEXT");
    }

    #[tokio::test]
    async fn non_hex_analysis_is_not_json() {
        let raw = reply(OracleOperation::Analyze, "hello").await;
        assert!(validate::extract_json(&raw).is_none());
    }
}
