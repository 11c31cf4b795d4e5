//! Shared data model for the research console.
//!
//! Wire names are camelCase so the JSON shapes requested from the inference
//! oracle line up with the field names it is asked to produce.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    /// Lenient parse: case-insensitive, tolerates a few common synonyms.
    pub fn from_slug(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" | "info" | "informational" => Some(RiskLevel::Low),
            "medium" | "moderate" | "med" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" | "severe" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

/// SIM Toolkit execution environment a payload is synthesized for.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
pub enum StkType {
    #[default]
    #[serde(rename = "SAT_BROWSER")]
    SatBrowser,
    #[serde(rename = "PROACTIVE_SIM")]
    ProactiveSim,
    #[serde(rename = "WIB")]
    Wib,
}

impl StkType {
    pub const ALL: [StkType; 3] = [StkType::SatBrowser, StkType::ProactiveSim, StkType::Wib];

    pub fn as_str(&self) -> &'static str {
        match self {
            StkType::SatBrowser => "SAT_BROWSER",
            StkType::ProactiveSim => "PROACTIVE_SIM",
            StkType::Wib => "WIB",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            StkType::SatBrowser => "S@T Browser",
            StkType::ProactiveSim => "Proactive SIM",
            StkType::Wib => "Wireless Internet Browser",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' | '.' => '_',
                '@' => 'A',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "SAT_BROWSER" | "SAT" | "SATBROWSER" => Some(StkType::SatBrowser),
            "PROACTIVE_SIM" | "PROACTIVE" | "PROACTIVESIM" => Some(StkType::ProactiveSim),
            "WIB" | "WIRELESS_INTERNET_BROWSER" => Some(StkType::Wib),
            _ => None,
        }
    }
}

/// Vulnerability assessment of one submitted PDU.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub is_silent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_stk_command: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_app: Option<String>,
    pub explanation: String,
    pub risk_level: RiskLevel,
    pub mitigation: String,
}

impl AnalysisResult {
    /// Returned whenever the oracle's analysis cannot be parsed.
    pub fn parse_failure() -> Self {
        Self {
            is_silent: false,
            is_stk_command: None,
            target_app: None,
            explanation: "Failed to parse analysis results.".to_string(),
            risk_level: RiskLevel::Low,
            mitigation: "Ensure the PDU string is valid hex format.".to_string(),
        }
    }

    pub fn targets_stk(&self) -> bool {
        self.is_stk_command.unwrap_or(false)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PduComponent {
    pub name: String,
    pub value: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_vulnerable: Option<bool>,
}

/// Field-by-field breakdown of a PDU, in bitstream order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecodedPdu {
    #[serde(default)]
    pub components: Vec<PduComponent>,
}

impl DecodedPdu {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn vulnerable_fields(&self) -> impl Iterator<Item = &PduComponent> {
        self.components
            .iter()
            .filter(|c| c.is_vulnerable.unwrap_or(false))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StkCommand {
    pub name: String,
    pub description: String,
    /// Hex-encoded illustrative payload.
    pub payload: String,
    pub impact: String,
    pub stk_type: StkType,
}

/// Builder form state. Every field is optional; updates merge rather than replace.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StkBuilderParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_or_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_or_password: Option<String>,
}

impl StkBuilderParams {
    pub fn with_command_type(mut self, value: impl Into<String>) -> Self {
        self.command_type = Some(value.into());
        self
    }

    pub fn with_display_text(mut self, value: impl Into<String>) -> Self {
        self.display_text = Some(value.into());
        self
    }

    pub fn with_target_number(mut self, value: impl Into<String>) -> Self {
        self.target_number = Some(value.into());
        self
    }

    pub fn with_url_or_data(mut self, value: impl Into<String>) -> Self {
        self.url_or_data = Some(value.into());
        self
    }

    pub fn with_pin_or_password(mut self, value: impl Into<String>) -> Self {
        self.pin_or_password = Some(value.into());
        self
    }

    /// Overwrite only the fields `other` carries; everything else is kept.
    pub fn merge(&mut self, other: &StkBuilderParams) {
        fn take(slot: &mut Option<String>, incoming: &Option<String>) {
            if let Some(value) = incoming {
                *slot = Some(value.clone());
            }
        }
        take(&mut self.command_type, &other.command_type);
        take(&mut self.display_text, &other.display_text);
        take(&mut self.target_number, &other.target_number);
        take(&mut self.url_or_data, &other.url_or_data);
        take(&mut self.pin_or_password, &other.pin_or_password);
    }

    /// Drop blank values so they never clobber populated fields during a merge.
    pub fn normalized(mut self) -> Self {
        for slot in [
            &mut self.command_type,
            &mut self.display_text,
            &mut self.target_number,
            &mut self.url_or_data,
            &mut self.pin_or_password,
        ] {
            if let Some(value) = slot.take() {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    *slot = Some(trimmed.to_string());
                }
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.command_type.is_none()
            && self.display_text.is_none()
            && self.target_number.is_none()
            && self.url_or_data.is_none()
            && self.pin_or_password.is_none()
    }

    /// Populated fields as `(label, value)` pairs, in form order.
    pub fn populated(&self) -> Vec<(&'static str, &str)> {
        [
            ("commandType", &self.command_type),
            ("displayText", &self.display_text),
            ("targetNumber", &self.target_number),
            ("urlOrData", &self.url_or_data),
            ("pinOrPassword", &self.pin_or_password),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
        .collect()
    }
}

/// Builder parameters recovered from an intercepted PDU.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportedParams {
    pub stk_type: StkType,
    #[serde(default)]
    pub params: StkBuilderParams,
}

/// Informational content shown in the research view.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicBrief {
    pub topic: String,
    pub body: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Analyzer,
    Builder,
    Simulation,
    Research,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Analyzer => "analyzer",
            View::Builder => "builder",
            View::Simulation => "simulation",
            View::Research => "research",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "analyzer" | "analyze" | "decoder" => Some(View::Analyzer),
            "builder" | "build" => Some(View::Builder),
            "simulation" | "sim" => Some(View::Simulation),
            "research" | "info" | "docs" => Some(View::Research),
            _ => None,
        }
    }
}
