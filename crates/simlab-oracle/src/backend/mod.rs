use crate::{OracleError, OracleRequest};

pub mod http;
pub mod scripted;
pub mod synthetic;

/// Transport to an inference service. Implementations return the reply text
/// untouched; shape validation happens in [`crate::OracleClient`].
#[async_trait::async_trait]
pub trait InferenceBackend: Send + Sync {
    fn id(&self) -> &'static str;

    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError>;
}
