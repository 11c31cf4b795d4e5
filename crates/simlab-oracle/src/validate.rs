//! Trust-boundary routines: one validator per requested response shape.
//!
//! Every function takes the raw reply (or an already extracted JSON value)
//! and either produces a value of the strict model or `None`. Callers decide
//! what a `None` means: a fixed fallback or a propagated error.

use serde_json::{Map, Value};
use simlab_protocol::{
    AnalysisResult, DecodedPdu, ImportedParams, PduComponent, RiskLevel, StkBuilderParams,
    StkCommand, StkType,
};

/// Pull the JSON document out of a model reply.
///
/// Tolerates markdown code fences and prose around the payload.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = strip_fences(raw.trim());
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }
    for (open, close) in [('{', '}'), ('[', ']')] {
        let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) else {
            continue;
        };
        if end <= start {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
            return Some(value);
        }
    }
    None
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```json) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name))
}

fn text_field(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    match field(obj, names)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn optional_text(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    text_field(obj, names).filter(|s| !s.is_empty())
}

fn bool_field(obj: &Map<String, Value>, names: &[&str]) -> Option<bool> {
    match field(obj, names)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_u64().map(|v| v != 0),
        _ => None,
    }
}

pub fn analysis_from_value(value: &Value) -> Option<AnalysisResult> {
    let obj = value.as_object()?;
    let is_silent = bool_field(obj, &["isSilent", "is_silent", "silent"])?;
    let explanation = optional_text(obj, &["explanation", "summary"])?;
    let mitigation = optional_text(obj, &["mitigation", "recommendation"])?;
    let risk_level = text_field(obj, &["riskLevel", "risk_level", "risk"])
        .and_then(|s| RiskLevel::from_slug(&s))?;
    Some(AnalysisResult {
        is_silent,
        is_stk_command: bool_field(obj, &["isStkCommand", "is_stk_command"]),
        target_app: optional_text(obj, &["targetApp", "target_app"]),
        explanation,
        risk_level,
        mitigation,
    })
}

fn component_from_value(value: &Value) -> Option<PduComponent> {
    let obj = value.as_object()?;
    Some(PduComponent {
        name: optional_text(obj, &["name", "field"])?,
        value: text_field(obj, &["value"])?,
        description: text_field(obj, &["description", "meaning"]).unwrap_or_default(),
        is_vulnerable: bool_field(obj, &["isVulnerable", "is_vulnerable", "vulnerable"]),
    })
}

/// All-or-nothing: one malformed component rejects the whole breakdown.
pub fn decode_from_value(value: &Value) -> Option<DecodedPdu> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => field(obj, &["components", "fields"])?.as_array()?,
        _ => return None,
    };
    let components = items
        .iter()
        .map(component_from_value)
        .collect::<Option<Vec<_>>>()?;
    Some(DecodedPdu { components })
}

pub fn params_from_value(value: &Value) -> Option<StkBuilderParams> {
    let obj = value.as_object()?;
    Some(
        StkBuilderParams {
            command_type: optional_text(obj, &["commandType", "command_type"]),
            display_text: optional_text(obj, &["displayText", "display_text"]),
            target_number: optional_text(obj, &["targetNumber", "target_number"]),
            url_or_data: optional_text(obj, &["urlOrData", "url_or_data", "url", "data"]),
            pin_or_password: optional_text(obj, &["pinOrPassword", "pin_or_password", "pin"]),
        }
        .normalized(),
    )
}

pub fn import_from_value(value: &Value) -> Option<ImportedParams> {
    let obj = value.as_object()?;
    let stk_type = text_field(obj, &["stkType", "stk_type", "environment"])
        .and_then(|s| StkType::from_slug(&s))?;
    let params = match field(obj, &["params", "parameters"]) {
        Some(inner) => params_from_value(inner)?,
        None => StkBuilderParams::default(),
    };
    Some(ImportedParams { stk_type, params })
}

/// Uppercase hex with whitespace, separators and a `0x` prefix removed.
pub fn normalize_hex(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let cleaned: String = body
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(cleaned)
}

/// `requested` fills in the environment when the reply omits it.
pub fn command_from_value(value: &Value, requested: StkType) -> Option<StkCommand> {
    let obj = value.as_object()?;
    let stk_type = match text_field(obj, &["stkType", "stk_type", "environment"]) {
        Some(raw) => StkType::from_slug(&raw)?,
        None => requested,
    };
    Some(StkCommand {
        name: optional_text(obj, &["name", "command"])?,
        description: text_field(obj, &["description"]).unwrap_or_default(),
        payload: normalize_hex(&text_field(obj, &["payload", "hex"])?)?,
        impact: text_field(obj, &["impact"]).unwrap_or_default(),
        stk_type,
    })
}
