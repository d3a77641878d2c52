//! ERP gateway port interfaces
//!
//! The concrete JSON-RPC client lives in the infra crate; services in this
//! crate reach the ERP exclusively through these traits.

use std::time::Duration;

use async_trait::async_trait;
use portico_domain::Result;
use serde_json::Value;

/// Numeric identifier of a remote ERP record
pub type RecordId = i64;

/// Trait for ERP gateway operations
#[async_trait]
pub trait ErpGateway: Send + Sync {
    /// Invoke `service.method` with positional parameters.
    ///
    /// Implementations authenticate lazily and retry exactly once with a
    /// forced re-login when the session has expired.
    async fn call(&self, service: &str, method: &str, params: Vec<Value>) -> Result<Value>;

    /// Like `call`, but consults the response cache first.
    ///
    /// `ttl` bounds how long a stored result may be served; `None` applies
    /// the configured default and `Some(Duration::ZERO)` bypasses storage
    /// entirely. Only callers know which reads tolerate staleness.
    async fn cached_call(
        &self,
        service: &str,
        method: &str,
        params: Vec<Value>,
        ttl: Option<Duration>,
    ) -> Result<Value>;

    /// Check a login/password pair against the ERP without touching the
    /// shared service-account session.
    ///
    /// Returns `Ok(false)` for rejected credentials; errors are reserved for
    /// gateway or transport failures.
    async fn validate_credentials(&self, login: &str, password: &str) -> Result<bool>;
}
