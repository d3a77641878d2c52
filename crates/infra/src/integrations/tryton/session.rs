//! Session state for the gateway's stateful authentication
//!
//! A successful `common.db.login` call returns a user id and an opaque token.
//! Every subsequent database-scoped call must carry
//! `Authorization: Session base64("{username}:{user_id}:{token}")`. The header
//! is derived once at login and cached; building it per call would be wasted
//! work since all three components are fixed for the session's lifetime.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use portico_domain::constants::SESSION_HEADER_SCHEME;
use portico_domain::{PorticoError, Result};
use serde_json::Value;
use tokio::sync::RwLock;

/// An authenticated gateway session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub token: String,
    auth_header: String,
}

impl Session {
    /// Parses a `common.db.login` result into a session
    ///
    /// Accepts the historical wire shape `[user_id, token]` as well as the
    /// structured `{"user": id, "session": token}` object some server
    /// versions return. An empty result means the credentials were rejected.
    pub fn from_login_result(username: &str, result: &Value) -> Result<Self> {
        if is_empty_result(result) {
            return Err(PorticoError::Auth(
                "Login did not return a session identifier".to_string(),
            ));
        }

        let (user_id, token) = match result {
            Value::Array(items) if items.len() == 2 => {
                (parse_user_id(&items[0])?, parse_token(&items[1])?)
            }
            Value::Object(map) if map.contains_key("session") => {
                let user_id = map
                    .get("user")
                    .ok_or_else(unexpected_payload)
                    .and_then(parse_user_id)?;
                let token =
                    map.get("session").ok_or_else(unexpected_payload).and_then(parse_token)?;
                (user_id, token)
            }
            _ => return Err(unexpected_payload()),
        };

        let credential = format!("{username}:{user_id}:{token}");
        let auth_header = format!("{SESSION_HEADER_SCHEME} {}", BASE64.encode(credential));

        Ok(Self { user_id, token, auth_header })
    }

    /// The full `Authorization` header value for this session
    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }
}

fn parse_user_id(value: &Value) -> Result<i64> {
    match value {
        Value::Number(number) => number.as_i64().ok_or_else(unexpected_payload),
        Value::String(text) => text.parse().map_err(|_| unexpected_payload()),
        _ => Err(unexpected_payload()),
    }
}

fn parse_token(value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        _ => Err(unexpected_payload()),
    }
}

fn unexpected_payload() -> PorticoError {
    PorticoError::Auth("Unexpected login payload from the gateway".to_string())
}

fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

/// Shared slot holding the current session, if any
///
/// Concurrent logins are last-write-wins: holding the lock across the login
/// network call would serialize every request behind a slow authentication.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header of the cached session, if one is established
    pub async fn auth_header(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|session| session.auth_header.clone())
    }

    /// Replaces the cached session, returning its header
    pub async fn replace(&self, session: Session) -> String {
        let header = session.auth_header.clone();
        *self.current.write().await = Some(session);
        header
    }

    /// Forgets the cached session
    pub async fn clear(&self) {
        *self.current.write().await = None;
    }
}
