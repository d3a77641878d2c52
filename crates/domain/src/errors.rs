//! Error types used throughout the portal integration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload for protocol-level RPC failures.
///
/// The gateway reports failures either through HTTP status codes or through a
/// JSON-RPC error envelope. Both collapse into this shape so callers can
/// branch on `code` without re-parsing transport details. `data` carries the
/// raw diagnostic payload (error envelope `data`, or the response body for
/// HTTP-level failures).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcFailure {
    pub code: Option<i64>,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl RpcFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into(), data: None }
    }

    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl std::fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Main error type for Portico
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PorticoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("RPC error: {0}")]
    Rpc(RpcFailure),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Provisioning error: {0}")]
    Provisioning(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PorticoError {
    /// True for failures that a forced re-authentication may resolve.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Protocol/HTTP code attached to the failure, when the gateway sent one.
    #[must_use]
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc(failure) => failure.code,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PorticoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization failed: {err}"))
    }
}

/// Result type alias for Portico operations
pub type Result<T> = std::result::Result<T, PorticoError>;
