//! JSON-RPC client for the Tryton gateway
//!
//! This is the single place the rest of the system talks to the ERP through.
//! It owns the service-account session, the endpoint routing rules, and the
//! response cache, and exposes the `ErpGateway` port consumed by the core
//! services.
//!
//! # Authentication
//!
//! Sessions are established lazily: the first database-scoped call logs in
//! with the configured service account and caches the derived
//! `Authorization` header. When the gateway reports an authentication
//! failure mid-flight, the dispatcher resets the session and retries the
//! call exactly once with a forced re-login. A second failure is terminal;
//! unbounded login loops against a rejecting server are worse than a clean
//! error.
//!
//! # Endpoints
//!
//! Discovery methods (`common.db.list`, `common.server.version`,
//! `common.authentication.services`) post to the server root without a
//! session. Everything else posts to `{database}/`. See [`super::endpoints`].
//!
//! # Error Handling
//!
//! - Transport failures and 5xx responses: retried by `HttpClient`
//! - HTTP 401/403 and RPC error codes 401/403: `PorticoError::Auth`
//! - Other RPC faults: `PorticoError::Rpc` with code, message, and data
//! - HTML error bodies are preserved in `RpcFailure::data["body"]` for
//!   message extraction upstream

use std::time::Duration;

use async_trait::async_trait;
use portico_core::ErpGateway;
use portico_domain::constants::MAX_CALL_ATTEMPTS;
use portico_domain::{ErpConfig, PorticoError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::http::HttpClient;

use super::cache::{cache_key, ResponseCache, ResponseCacheConfig};
use super::endpoints;
use super::errors::decode_response;
use super::session::{Session, SessionStore};

/// Client for the Tryton gateway's JSON-RPC endpoint
pub struct TrytonClient {
    config: ErpConfig,
    http: HttpClient,
    session: SessionStore,
    cache: ResponseCache,
}

impl TrytonClient {
    /// Creates a new gateway client
    ///
    /// Fails fast on incomplete configuration rather than at the first call.
    pub fn new(config: ErpConfig) -> Result<Self> {
        let cache_config = ResponseCacheConfig::with_ttl(config.cache_ttl());
        cache_config.log_config();

        let http = HttpClient::builder()
            .timeout(config.timeout())
            .max_attempts(config.retry_attempts.max(1) as usize)
            .user_agent(format!("portico/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Self::with_http_client(config, http)
    }

    /// Creates a client over an existing transport
    ///
    /// Used for credential probes, which share the connection pool but must
    /// not share session state.
    fn with_http_client(config: ErpConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        let cache = ResponseCache::new(ResponseCacheConfig::with_ttl(config.cache_ttl()));

        Ok(Self { config, http, session: SessionStore::new(), cache })
    }

    /// Establishes a session, returning the `Authorization` header value
    ///
    /// With `force` false this is a read of the cached session when one
    /// exists; no network traffic happens.
    pub async fn login(&self, force: bool) -> Result<String> {
        if !force {
            if let Some(header) = self.session.auth_header().await {
                return Ok(header);
            }
        }

        let params = vec![
            json!(self.config.username.as_str()),
            json!({ "password": self.config.password.as_str() }),
        ];

        let result = match self.dispatch("common.db.login", &params, None).await {
            Ok(result) => result,
            Err(err) => {
                error!(username = %self.config.username, error = %err, "Gateway login failed");
                return Err(err);
            }
        };

        let session = Session::from_login_result(&self.config.username, &result)?;
        let user_id = session.user_id;
        let header = self.session.replace(session).await;
        info!(username = %self.config.username, user_id, "Authenticated with the gateway");

        Ok(header)
    }

    /// Forgets the cached session; the next call re-authenticates
    pub async fn reset_session(&self) {
        self.session.clear().await;
        debug!("Gateway session state cleared");
    }

    /// Invokes `service.method` with the service-account session
    pub async fn call(&self, service: &str, method: &str, params: Vec<Value>) -> Result<Value> {
        self.call_with_session(service, method, params, true).await
    }

    /// Invokes `service.method` without a session header
    ///
    /// For discovery methods and login itself, which the gateway serves
    /// unauthenticated.
    pub async fn call_anonymous(
        &self,
        service: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value> {
        self.call_with_session(service, method, params, false).await
    }

    async fn call_with_session(
        &self,
        service: &str,
        method: &str,
        params: Vec<Value>,
        use_session: bool,
    ) -> Result<Value> {
        let full_method = endpoints::compose_method(service, method);

        for attempt in 0..MAX_CALL_ATTEMPTS {
            let outcome = async {
                let header = if use_session {
                    Some(self.login(attempt > 0).await?)
                } else {
                    None
                };
                self.dispatch(&full_method, &params, header.as_deref()).await
            }
            .await;

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if use_session && err.is_auth() => {
                    info!(method = %full_method, "Gateway session rejected, re-authenticating");
                    self.reset_session().await;
                }
                Err(err) => return Err(err),
            }
        }

        Err(PorticoError::Auth(
            "Unable to authenticate with the gateway after retrying".to_string(),
        ))
    }

    /// Like [`call`](Self::call), but consults the response cache first
    pub async fn cached_call(
        &self,
        service: &str,
        method: &str,
        params: Vec<Value>,
        ttl: Option<Duration>,
    ) -> Result<Value> {
        let full_method = endpoints::compose_method(service, method);
        let key = cache_key(&full_method, Some(&Value::Array(params.clone())));

        if let Some(value) = self.cache.get(&key) {
            debug!(method = %full_method, "Gateway response served from cache");
            return Ok(value);
        }

        let result = self.call(service, method, params).await?;
        let ttl = ttl.unwrap_or_else(|| self.cache.default_ttl());
        self.cache.store(&key, &result, ttl);

        Ok(result)
    }

    /// Checks whether the gateway is reachable and the database exists
    ///
    /// Never fails: any error is logged and reported as unreachable.
    pub async fn ping(&self) -> bool {
        match self.call_anonymous("common.db", "list", vec![]).await {
            Ok(Value::Array(databases)) => {
                let reachable = !databases.is_empty();
                if !reachable {
                    warn!("Gateway is up but reports no databases");
                }
                reachable
            }
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Gateway ping failed");
                false
            }
        }
    }

    /// Server version string reported by the gateway
    pub async fn server_version(&self) -> Result<String> {
        let result = self.call_anonymous("common.server", "version", vec![]).await?;
        result.as_str().map(str::to_string).ok_or_else(|| {
            PorticoError::Internal("Gateway returned a non-string server version".to_string())
        })
    }

    /// Names of the databases the gateway serves
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        let result = self.call_anonymous("common.db", "list", vec![]).await?;
        serde_json::from_value(result).map_err(|err| {
            PorticoError::Internal(format!("Unexpected database list payload: {err}"))
        })
    }

    /// Checks a login/password pair against the gateway
    ///
    /// Runs over a throwaway client so the service-account session is never
    /// perturbed by a portal user typing a wrong password.
    pub async fn validate_credentials(&self, login: &str, password: &str) -> Result<bool> {
        if login.is_empty() || password.is_empty() {
            return Ok(false);
        }

        let probe_config = self.config.with_credentials(login, password);
        let probe = Self::with_http_client(probe_config, self.http.clone())?;

        match probe.login(true).await {
            Ok(_) => Ok(true),
            Err(PorticoError::Auth(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Sends one RPC request and decodes the response
    ///
    /// Every invocation carries a fresh correlation id, so a retried call is
    /// distinguishable from a duplicate in the gateway's logs.
    async fn dispatch(
        &self,
        full_method: &str,
        params: &[Value],
        auth_header: Option<&str>,
    ) -> Result<Value> {
        let request_id = Uuid::new_v4().to_string();
        let path = endpoints::resolve_path(&self.config.database, full_method);
        let url = endpoints::endpoint_url(&self.config.base_url, &path);

        let payload = RpcRequest {
            jsonrpc: "2.0",
            id: request_id.as_str(),
            method: full_method,
            params,
        };

        debug!(method = %full_method, %url, request_id = %request_id, "Dispatching gateway RPC");

        let mut builder = self.http.request(Method::POST, &url).json(&payload);
        if let Some(header) = auth_header {
            builder = builder.header(AUTHORIZATION, header);
        }

        let response = self.http.send(builder).await?;
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            PorticoError::Network(format!("Failed to read gateway response: {err}"))
        })?;

        decode_response(full_method, status, &body)
    }
}

impl std::fmt::Debug for TrytonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrytonClient")
            .field("base_url", &self.config.base_url)
            .field("database", &self.config.database)
            .field("username", &self.config.username)
            .finish()
    }
}

#[async_trait]
impl ErpGateway for TrytonClient {
    async fn call(&self, service: &str, method: &str, params: Vec<Value>) -> Result<Value> {
        TrytonClient::call(self, service, method, params).await
    }

    async fn cached_call(
        &self,
        service: &str,
        method: &str,
        params: Vec<Value>,
        ttl: Option<Duration>,
    ) -> Result<Value> {
        TrytonClient::cached_call(self, service, method, params, ttl).await
    }

    async fn validate_credentials(&self, login: &str, password: &str) -> Result<bool> {
        TrytonClient::validate_credentials(self, login, password).await
    }
}

// ===== Wire Types =====

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'a str,
    params: &'a [Value],
}
