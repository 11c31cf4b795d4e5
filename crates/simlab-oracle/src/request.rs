use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simlab_protocol::{AnalysisResult, DecodedPdu, ImportedParams, StkCommand};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OracleOperation {
    Analyze,
    Decode,
    ImportParams,
    GenerateCommand,
    SimulateExfiltration,
    ExplainTopic,
}

impl OracleOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleOperation::Analyze => "analyze",
            OracleOperation::Decode => "decode",
            OracleOperation::ImportParams => "import_params",
            OracleOperation::GenerateCommand => "generate_command",
            OracleOperation::SimulateExfiltration => "simulate_exfiltration",
            OracleOperation::ExplainTopic => "explain_topic",
        }
    }

    /// The structured shape requested for this operation, or free text.
    pub fn shape(&self) -> ResponseShape {
        match self {
            OracleOperation::Analyze => ResponseShape::Json(ANALYSIS_SHAPE.clone()),
            OracleOperation::Decode => ResponseShape::Json(DECODE_SHAPE.clone()),
            OracleOperation::ImportParams => ResponseShape::Json(IMPORT_SHAPE.clone()),
            OracleOperation::GenerateCommand => ResponseShape::Json(COMMAND_SHAPE.clone()),
            OracleOperation::SimulateExfiltration | OracleOperation::ExplainTopic => {
                ResponseShape::Text
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResponseShape {
    /// JSON schema the reply is asked to follow.
    Json(Value),
    Text,
}

impl ResponseShape {
    pub fn is_json(&self) -> bool {
        matches!(self, ResponseShape::Json(_))
    }
}

/// One request to the oracle: what is being asked, about what, in which shape.
#[derive(Clone, Debug)]
pub struct OracleRequest {
    pub operation: OracleOperation,
    /// Primary operation input (PDU hex, command intent, topic).
    pub subject: String,
    pub instruction: String,
    pub shape: ResponseShape,
}

impl OracleRequest {
    pub fn new(
        operation: OracleOperation,
        subject: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            subject: subject.into(),
            instruction: instruction.into(),
            shape: operation.shape(),
        }
    }
}

fn schema_value<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

static ANALYSIS_SHAPE: Lazy<Value> = Lazy::new(schema_value::<AnalysisResult>);
static DECODE_SHAPE: Lazy<Value> = Lazy::new(schema_value::<DecodedPdu>);
static IMPORT_SHAPE: Lazy<Value> = Lazy::new(schema_value::<ImportedParams>);
static COMMAND_SHAPE: Lazy<Value> = Lazy::new(schema_value::<StkCommand>);
