//! Configuration loader
//!
//! Loads the integration configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `PORTICO_ERP_URL`: Base URL of the gateway (required)
//! - `PORTICO_ERP_USER`: Service account login (required)
//! - `PORTICO_ERP_PASSWORD`: Service account password (required)
//! - `PORTICO_ERP_DATABASE`: Database name (default: `tryton`)
//! - `PORTICO_ERP_TIMEOUT_SECS`: Request timeout in seconds (default: 10)
//! - `PORTICO_ERP_RETRY_ATTEMPTS`: Transport attempts (default: 3)
//! - `PORTICO_ERP_CACHE_TTL_SECS`: Response cache TTL in seconds (default:
//!   300)
//! - `PORTICO_PORTAL_GROUP`: Access group for provisioned users (default:
//!   `Portal Access`)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./portico.json` or `./portico.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use portico_domain::constants::{
    DEFAULT_ERP_DATABASE, DEFAULT_ERP_RETRY_ATTEMPTS, DEFAULT_ERP_TIMEOUT_SECS,
    DEFAULT_PORTAL_GROUP, DEFAULT_RESPONSE_CACHE_TTL_SECS,
};
use portico_domain::{Config, ErpConfig, PorticoError, ProvisioningConfig, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `PorticoError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// The gateway URL and service account credentials must be present; every
/// other variable falls back to its default.
///
/// # Errors
/// Returns `PorticoError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<Config> {
    let base_url = env_var("PORTICO_ERP_URL")?;
    let username = env_var("PORTICO_ERP_USER")?;
    let password = env_var("PORTICO_ERP_PASSWORD")?;

    let database = std::env::var("PORTICO_ERP_DATABASE")
        .unwrap_or_else(|_| DEFAULT_ERP_DATABASE.to_string());
    let timeout_secs = env_parse("PORTICO_ERP_TIMEOUT_SECS", DEFAULT_ERP_TIMEOUT_SECS)?;
    let retry_attempts = env_parse("PORTICO_ERP_RETRY_ATTEMPTS", DEFAULT_ERP_RETRY_ATTEMPTS)?;
    let cache_ttl_secs =
        env_parse("PORTICO_ERP_CACHE_TTL_SECS", DEFAULT_RESPONSE_CACHE_TTL_SECS)?;
    let portal_group = std::env::var("PORTICO_PORTAL_GROUP")
        .unwrap_or_else(|_| DEFAULT_PORTAL_GROUP.to_string());

    Ok(Config {
        erp: ErpConfig {
            base_url,
            database,
            username,
            password,
            timeout_secs,
            retry_attempts,
            cache_ttl_secs,
        },
        provisioning: ProvisioningConfig { portal_group },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `PorticoError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PorticoError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PorticoError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PorticoError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PorticoError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PorticoError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(PorticoError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./portico.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    // Try current working directory
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("portico.json"),
            cwd.join("portico.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("portico.json"),
                exe_dir.join("portico.toml"),
            ]);
        }
    }

    // Return first existing candidate
    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `PorticoError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        PorticoError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable, falling back to `default`
///
/// # Errors
/// Returns `PorticoError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| PorticoError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::Builder;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 8] = [
        "PORTICO_ERP_URL",
        "PORTICO_ERP_USER",
        "PORTICO_ERP_PASSWORD",
        "PORTICO_ERP_DATABASE",
        "PORTICO_ERP_TIMEOUT_SECS",
        "PORTICO_ERP_RETRY_ATTEMPTS",
        "PORTICO_ERP_CACHE_TTL_SECS",
        "PORTICO_PORTAL_GROUP",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("PORTICO_ERP_URL", "https://erp.example.com/");
        std::env::set_var("PORTICO_ERP_USER", "svc-portal");
        std::env::set_var("PORTICO_ERP_PASSWORD", "secret");
        std::env::set_var("PORTICO_ERP_DATABASE", "portal");
        std::env::set_var("PORTICO_ERP_TIMEOUT_SECS", "30");
        std::env::set_var("PORTICO_ERP_RETRY_ATTEMPTS", "5");
        std::env::set_var("PORTICO_ERP_CACHE_TTL_SECS", "60");
        std::env::set_var("PORTICO_PORTAL_GROUP", "Clients");

        let result = load_from_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.erp.base_url, "https://erp.example.com/");
        assert_eq!(config.erp.username, "svc-portal");
        assert_eq!(config.erp.password, "secret");
        assert_eq!(config.erp.database, "portal");
        assert_eq!(config.erp.timeout_secs, 30);
        assert_eq!(config.erp.retry_attempts, 5);
        assert_eq!(config.erp.cache_ttl_secs, 60);
        assert_eq!(config.provisioning.portal_group, "Clients");

        clear_env();
    }

    #[test]
    fn test_load_from_env_applies_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("PORTICO_ERP_URL", "https://erp.example.com/");
        std::env::set_var("PORTICO_ERP_USER", "svc-portal");
        std::env::set_var("PORTICO_ERP_PASSWORD", "secret");

        let config = load_from_env().expect("required vars are set");
        assert_eq!(config.erp.database, DEFAULT_ERP_DATABASE);
        assert_eq!(config.erp.timeout_secs, DEFAULT_ERP_TIMEOUT_SECS);
        assert_eq!(config.erp.retry_attempts, DEFAULT_ERP_RETRY_ATTEMPTS);
        assert_eq!(config.erp.cache_ttl_secs, DEFAULT_RESPONSE_CACHE_TTL_SECS);
        assert_eq!(config.provisioning.portal_group, DEFAULT_PORTAL_GROUP);

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_required_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("PORTICO_ERP_URL", "https://erp.example.com/");
        std::env::set_var("PORTICO_ERP_USER", "svc-portal");
        // No password.

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, PorticoError::Config(_)));
        assert!(err.to_string().contains("PORTICO_ERP_PASSWORD"));

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("PORTICO_ERP_URL", "https://erp.example.com/");
        std::env::set_var("PORTICO_ERP_USER", "svc-portal");
        std::env::set_var("PORTICO_ERP_PASSWORD", "secret");
        std::env::set_var("PORTICO_ERP_TIMEOUT_SECS", "soon");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, PorticoError::Config(_)));
        assert!(err.to_string().contains("PORTICO_ERP_TIMEOUT_SECS"));

        clear_env();
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().expect("temp file");
        write!(
            file,
            r#"{{
                "erp": {{
                    "base_url": "https://erp.example.com/",
                    "database": "portal",
                    "username": "svc-portal",
                    "password": "secret"
                }}
            }}"#
        )
        .expect("write config");

        let config = load_from_file(Some(file.path().to_path_buf())).expect("load json");
        assert_eq!(config.erp.base_url, "https://erp.example.com/");
        assert_eq!(config.erp.database, "portal");
        assert_eq!(config.erp.timeout_secs, DEFAULT_ERP_TIMEOUT_SECS);
        assert_eq!(config.provisioning.portal_group, DEFAULT_PORTAL_GROUP);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().expect("temp file");
        write!(
            file,
            r#"
[erp]
base_url = "https://erp.example.com/"
username = "svc-portal"
password = "secret"

[provisioning]
portal_group = "Clients"
"#
        )
        .expect("write config");

        let config = load_from_file(Some(file.path().to_path_buf())).expect("load toml");
        assert_eq!(config.erp.username, "svc-portal");
        assert_eq!(config.erp.database, DEFAULT_ERP_DATABASE);
        assert_eq!(config.provisioning.portal_group, "Clients");
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/config.json"))).unwrap_err();
        assert!(matches!(err, PorticoError::Config(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unsupported_format_is_rejected() {
        let mut file = Builder::new().suffix(".yaml").tempfile().expect("temp file");
        write!(file, "erp: {{}}").expect("write config");

        let err = load_from_file(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, PorticoError::Config(_)));
        assert!(err.to_string().contains("Unsupported config format"));
    }
}
