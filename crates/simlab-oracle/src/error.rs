#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("oracle returned status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("oracle returned an empty response")]
    Empty,
    #[error("malformed oracle response: {0}")]
    Malformed(String),
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

impl OracleError {
    /// Whether the request failed outright. Blank and malformed replies are
    /// not: the structured operations treat them as unparseable text.
    pub fn is_settlement_failure(&self) -> bool {
        !matches!(self, OracleError::Malformed(_) | OracleError::Empty)
    }
}
