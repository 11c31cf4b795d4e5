use std::time::Duration;

use serde_json::{json, Value};

use super::InferenceBackend;
use crate::{prompt, OracleError, OracleRequest, ResponseShape};

#[derive(Clone, Debug)]
pub struct HttpBackendOptions {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpBackendOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: prompt::DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

/// OpenAI-compatible `/v1/chat/completions` backend.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    options: HttpBackendOptions,
}

impl HttpBackend {
    pub fn new(options: HttpBackendOptions) -> Result<Self, OracleError> {
        if options.api_key.trim().is_empty() {
            return Err(OracleError::Unavailable("api key not configured".into()));
        }
        let client = reqwest::Client::builder()
            .user_agent(format!("simlab/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        let endpoint = format!(
            "{}/v1/chat/completions",
            options.base_url.trim().trim_end_matches('/')
        );
        Ok(Self {
            client,
            endpoint,
            options,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn body(&self, request: &OracleRequest) -> Value {
        let user = match &request.shape {
            ResponseShape::Json(schema) => prompt::with_schema(&request.instruction, schema),
            ResponseShape::Text => request.instruction.clone(),
        };
        let mut body = json!({
            "model": self.options.model,
            "messages": [
                {"role": "system", "content": self.options.system_prompt},
                {"role": "user", "content": user},
            ],
            "temperature": self.options.temperature,
            "max_tokens": self.options.max_tokens,
        });
        if request.shape.is_json() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("response_format".into(), json!({"type": "json_object"}));
            }
        }
        body
    }
}

/// First choice's message content from a chat-completions envelope.
fn reply_text(envelope: &Value) -> Option<&str> {
    envelope
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
}

#[async_trait::async_trait]
impl InferenceBackend for HttpBackend {
    fn id(&self) -> &'static str {
        "http"
    }

    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
        let body = self.body(&request);
        let started = std::time::Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.options.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        tracing::debug!(
            target: "simlab::oracle",
            operation = request.operation.as_str(),
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "oracle reply received"
        );
        if !status.is_success() {
            let detail = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            return Err(OracleError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        let envelope: Value = serde_json::from_slice(&bytes)
            .map_err(|e| OracleError::Malformed(format!("envelope: {e}")))?;
        let text = reply_text(&envelope)
            .ok_or_else(|| OracleError::Malformed("envelope has no message content".into()))?;
        if text.trim().is_empty() {
            return Err(OracleError::Empty);
        }
        Ok(text.to_string())
    }
}
