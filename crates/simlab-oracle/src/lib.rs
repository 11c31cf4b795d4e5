//! Inference oracle boundary.
//!
//! Every protocol-level answer (field breakdowns, risk scoring, payload
//! synthesis) comes from an external text service. This crate turns those
//! untyped replies into the strict model in `simlab-protocol`: structured
//! operations that drive tables and banners fall back to fixed values when a
//! reply cannot be parsed, while command generation surfaces the error.

pub mod backend;
mod client;
mod error;
pub mod prompt;
mod request;
pub mod validate;

pub use backend::{
    http::{HttpBackend, HttpBackendOptions},
    scripted::{RecordedCall, ScriptedBackend},
    synthetic::SyntheticBackend,
    InferenceBackend,
};
pub use client::OracleClient;
pub use error::OracleError;
pub use request::{OracleOperation, OracleRequest, ResponseShape};
