use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use jsonschema::validator_for;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use simlab_oracle::HttpBackendOptions;

use crate::followup::FollowupPolicy;
use crate::scheduler::DEFAULT_SEQUENCE;
use crate::session::SessionSettings;

pub const DEFAULT_CONFIG_REL: &str = "configs/simlab.toml";

fn default_step_interval_ms() -> u64 {
    8000
}

fn default_followup_delay_ms() -> u64 {
    2500
}

fn default_sequence() -> Vec<String> {
    DEFAULT_SEQUENCE.iter().map(|s| s.to_string()).collect()
}

fn default_log_capacity() -> usize {
    256
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SessionConfig {
    /// Milliseconds between scripted-run steps.
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,
    /// Milliseconds between a command settling and its follow-up.
    #[serde(default = "default_followup_delay_ms")]
    pub followup_delay_ms: u64,
    #[serde(default)]
    pub followup_policy: FollowupPolicy,
    /// Command names replayed by a scripted run, in order.
    #[serde(default = "default_sequence")]
    pub sequence: Vec<String>,
    /// Buffered log events per display subscriber.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: default_step_interval_ms(),
            followup_delay_ms: default_followup_delay_ms(),
            followup_policy: FollowupPolicy::default(),
            sequence: default_sequence(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl SessionConfig {
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            step_interval: Duration::from_millis(self.step_interval_ms.max(1)),
            followup_delay: Duration::from_millis(self.followup_delay_ms),
            followup_policy: self.followup_policy,
            sequence: self
                .sequence
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            log_capacity: self.log_capacity.max(1),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// HTTP when an API key is configured, synthetic otherwise.
    #[default]
    Auto,
    Http,
    Synthetic,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct OracleConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// OpenAI-compatible base URL, e.g. <https://api.openai.com>
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl OracleConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn http_options(&self) -> HttpBackendOptions {
        let mut opts = HttpBackendOptions::default();
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            opts.base_url = url.trim().to_string();
        }
        if let Some(key) = self.api_key() {
            opts.api_key = key.to_string();
        }
        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            opts.model = model.trim().to_string();
        }
        if let Some(secs) = self.timeout_secs.filter(|s| *s > 0) {
            opts.timeout = Duration::from_secs(secs);
        }
        if let Some(prompt) = self.system_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            opts.system_prompt = prompt.to_string();
        }
        opts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

/// JSON schema of [`Config`], as written by `simlab schema`.
pub fn config_schema_json() -> Result<serde_json::Value> {
    Ok(serde_json::to_value(schemars::schema_for!(Config))?)
}

/// Reads a TOML config, rejecting it with every schema violation listed
/// before any field is deserialized.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let raw: toml::Value = toml::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    let schema = config_schema_json()?;
    let validator = validator_for(&schema).map_err(|e| anyhow!("config schema: {e}"))?;
    let violations: Vec<_> = validator
        .iter_errors(&serde_json::to_value(&raw)?)
        .map(|e| format!("{}: {e}", e.instance_path))
        .collect();
    if !violations.is_empty() {
        return Err(anyhow!("{}: {}", path.display(), violations.join("; ")));
    }
    let cfg: Config = toml::from_str(&content)?;
    Ok(cfg)
}

/// Finds `rel` under `SIMLAB_CONFIG_DIR`, else in the working directory.
pub fn resolve_config_path(rel: &str) -> Option<PathBuf> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return rel_path.exists().then(|| rel_path.to_path_buf());
    }
    env_value("SIMLAB_CONFIG_DIR")
        .map(PathBuf::from)
        .into_iter()
        .chain(std::env::current_dir().ok())
        .map(|base| base.join(rel_path))
        .find(|p| p.exists())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_number(key: &str) -> Result<Option<u64>> {
    env_value(key)
        .map(|v| {
            v.parse::<u64>()
                .with_context(|| format!("{key} must be a non-negative integer, got {v:?}"))
        })
        .transpose()
}

impl Config {
    /// Applies `SIMLAB_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(url) = env_value("SIMLAB_ORACLE_URL") {
            self.oracle.base_url = Some(url);
        }
        if let Some(key) = env_value("SIMLAB_ORACLE_API_KEY") {
            self.oracle.api_key = Some(key);
        }
        if let Some(model) = env_value("SIMLAB_ORACLE_MODEL") {
            self.oracle.model = Some(model);
        }
        if let Some(secs) = env_number("SIMLAB_ORACLE_TIMEOUT_SECS")? {
            self.oracle.timeout_secs = Some(secs);
        }
        if let Some(ms) = env_number("SIMLAB_STEP_INTERVAL_MS")? {
            self.session.step_interval_ms = ms;
        }
        if let Some(ms) = env_number("SIMLAB_FOLLOWUP_DELAY_MS")? {
            self.session.followup_delay_ms = ms;
        }
        if let Some(policy) = env_value("SIMLAB_FOLLOWUP_POLICY") {
            self.session.followup_policy = FollowupPolicy::from_slug(&policy)
                .with_context(|| format!("SIMLAB_FOLLOWUP_POLICY: unknown policy {policy:?}"))?;
        }
        Ok(())
    }
}

/// Loads the effective configuration: an explicit path, else `SIMLAB_CONFIG`,
/// else the first `configs/simlab.toml` found; defaults when none exists.
/// Environment overrides are applied last.
pub fn load_effective(explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => match env_value("SIMLAB_CONFIG") {
            Some(p) => Some(PathBuf::from(p)),
            None => resolve_config_path(DEFAULT_CONFIG_REL),
        },
    };
    let mut cfg = match &path {
        Some(p) => load_config(p)?,
        None => Config::default(),
    };
    cfg.apply_env_overrides()?;
    Ok((cfg, path))
}
