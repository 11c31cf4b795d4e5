use std::sync::Arc;

use anyhow::{Context, Result};
use simlab_oracle::{HttpBackend, InferenceBackend, OracleClient, SyntheticBackend};
use tracing::{info, warn};

use crate::config::{BackendKind, Config, OracleConfig};
use crate::session::Session;

/// Builds the inference backend named by the oracle section.
///
/// `auto` picks HTTP when an API key is configured and falls back to the
/// offline synthetic backend otherwise.
pub fn build_backend(cfg: &OracleConfig) -> Result<Arc<dyn InferenceBackend>> {
    let backend: Arc<dyn InferenceBackend> = match (cfg.backend, cfg.api_key()) {
        (BackendKind::Synthetic, _) => Arc::new(SyntheticBackend::new()),
        (BackendKind::Http, _) | (BackendKind::Auto, Some(_)) => {
            let opts = cfg.http_options();
            let backend =
                HttpBackend::new(opts).context("configuring the HTTP inference backend")?;
            info!(
                target: "simlab::oracle",
                endpoint = backend.endpoint(),
                "using HTTP inference backend"
            );
            Arc::new(backend)
        }
        (BackendKind::Auto, None) => {
            warn!(
                target: "simlab::oracle",
                "no oracle API key configured; using the offline synthetic backend"
            );
            Arc::new(SyntheticBackend::new())
        }
    };
    Ok(backend)
}

pub fn session_from_config(cfg: &Config) -> Result<Session> {
    let backend = build_backend(&cfg.oracle)?;
    Ok(Session::new(
        OracleClient::new(backend),
        cfg.session.settings(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_without_key_is_synthetic() {
        let backend = build_backend(&OracleConfig::default()).expect("backend");
        assert_eq!(backend.id(), "synthetic");
    }

    #[test]
    fn auto_with_key_is_http() {
        let cfg = OracleConfig {
            api_key: Some("sk-test".into()),
            base_url: Some("http://127.0.0.1:9".into()),
            ..Default::default()
        };
        assert_eq!(build_backend(&cfg).expect("backend").id(), "http");
    }

    #[test]
    fn explicit_http_without_key_fails() {
        let cfg = OracleConfig {
            backend: BackendKind::Http,
            ..Default::default()
        };
        assert!(build_backend(&cfg).is_err());
    }

    #[test]
    fn synthetic_ignores_key() {
        let cfg = OracleConfig {
            backend: BackendKind::Synthetic,
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        assert_eq!(build_backend(&cfg).expect("backend").id(), "synthetic");
    }
}
