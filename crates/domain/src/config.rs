//! Configuration structures for the portal integration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ERP_DATABASE, DEFAULT_ERP_RETRY_ATTEMPTS, DEFAULT_ERP_TIMEOUT_SECS,
    DEFAULT_PORTAL_GROUP, DEFAULT_RESPONSE_CACHE_TTL_SECS,
};
use crate::errors::{PorticoError, Result};

/// Top-level configuration for the integration layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub erp: ErpConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Connection settings for the ERP JSON-RPC gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpConfig {
    /// Base URL of the gateway, e.g. `https://erp.example.com/`.
    pub base_url: String,
    /// Database segment appended to model/wizard/report calls.
    #[serde(default = "default_database")]
    pub database: String,
    /// Service account used for portal-originated calls.
    pub username: String,
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Transport-level attempts for connection failures and 5xx responses.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Default TTL for `cached_call` results, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

/// Settings for client account provisioning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Access group granted to every portal-created user.
    #[serde(default = "default_portal_group")]
    pub portal_group: String,
}

fn default_database() -> String {
    DEFAULT_ERP_DATABASE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_ERP_TIMEOUT_SECS
}

fn default_retry_attempts() -> u32 {
    DEFAULT_ERP_RETRY_ATTEMPTS
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_RESPONSE_CACHE_TTL_SECS
}

fn default_portal_group() -> String {
    DEFAULT_PORTAL_GROUP.to_string()
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self { portal_group: default_portal_group() }
    }
}

/// Matches the serde field defaults: endpoint settings are filled in,
/// URL and credentials are left empty and fail `validate`.
impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            database: default_database(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl ErpConfig {
    /// Ensure the configuration can open a session at all.
    ///
    /// Called by the client constructor so that a misconfigured deployment
    /// fails on startup instead of on the first request.
    ///
    /// # Errors
    /// Returns `PorticoError::Config` when the base URL or the service
    /// account credentials are missing.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(PorticoError::Config("ERP base URL is required".to_string()));
        }
        if self.username.trim().is_empty() || self.password.trim().is_empty() {
            return Err(PorticoError::Config(
                "ERP service account credentials (username and password) are required".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Same gateway and database, different account. Used when validating
    /// portal credentials against the ERP.
    #[must_use]
    pub fn with_credentials(&self, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into(), ..self.clone() }
    }
}
