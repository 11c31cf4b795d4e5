//! Instruction text for each oracle operation.

use simlab_protocol::{StkBuilderParams, StkType};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a telecom security instructor. \
Explain SMS PDU structures and SIM Toolkit behaviour for defensive, educational purposes. \
All payloads you describe are illustrative and are never transmitted.";

pub fn analyze(pdu_hex: &str) -> String {
    format!(
        "Analyze this SMS PDU (hex) for security risk. Decide whether it is a silent \
         (Type-0 or class-less) message, whether it carries a SIM Toolkit command and which \
         SIM application it targets, rate the risk and suggest a mitigation.\nPDU: {pdu_hex}"
    )
}

pub fn decode(pdu_hex: &str) -> String {
    format!(
        "Decode this SMS PDU (hex) into its fields in bitstream order (SMSC, first octet, \
         originating address, TP-PID, TP-DCS, timestamp, user data and so on). Flag fields \
         that enable an attack as vulnerable.\nPDU: {pdu_hex}"
    )
}

pub fn import_params(pdu_hex: &str) -> String {
    format!(
        "Infer which SIM Toolkit environment this PDU targets and recover the builder \
         parameters it encodes (command type, display text, target number, URL or data, \
         PIN or password). Leave unknown fields out.\nPDU: {pdu_hex}"
    )
}

pub fn generate_command(
    intent: &str,
    stk_type: StkType,
    params: Option<&StkBuilderParams>,
) -> String {
    let mut out = format!(
        "Construct an illustrative SIM Toolkit command for the {} environment ({}). \
         Intent: {intent}.",
        stk_type.display_label(),
        stk_type.as_str(),
    );
    if let Some(params) = params {
        let populated = params.populated();
        if !populated.is_empty() {
            out.push_str("\nParameters:");
            for (label, value) in populated {
                out.push_str("\n- ");
                out.push_str(label);
                out.push_str(": ");
                out.push_str(value);
            }
        }
    }
    out.push_str("\nReturn the payload as a hex string and describe its impact.");
    out
}

pub fn simulate_exfiltration(command_type: &str) -> String {
    format!(
        "Describe, in one or two lines, the data a handset would report back in a lab \
         simulation after executing the SIM Toolkit command `{command_type}`. Use obviously \
         fictitious values."
    )
}

pub fn explain_topic(topic: &str) -> String {
    format!(
        "Give a concise educational briefing on: {topic}. Cover how it works, known \
         research, and defensive measures."
    )
}

/// Wrap an instruction with the schema the reply must follow.
pub fn with_schema(instruction: &str, schema: &serde_json::Value) -> String {
    format!(
        "{instruction}\n\nRespond with a single JSON object that conforms to this JSON schema \
         and nothing else:\n{schema}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_prompt_lists_only_populated_params() {
        let params = StkBuilderParams::default()
            .with_command_type("SEND SHORT MESSAGE")
            .with_target_number("+15550100");
        let text = generate_command("SEND SHORT MESSAGE", StkType::Wib, Some(&params));
        assert!(text.contains("WIB"));
        assert!(text.contains("targetNumber: +15550100"));
        assert!(!text.contains("pinOrPassword"));
    }

    #[test]
    fn command_prompt_without_params_has_no_parameter_block() {
        let text = generate_command("DISPLAY TEXT", StkType::SatBrowser, None);
        assert!(!text.contains("Parameters:"));
    }
}
