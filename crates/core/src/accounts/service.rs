//! Portal account provisioning service - core business logic

use std::sync::Arc;

use portico_domain::{
    AccountCreation, FieldSupport, NewAccountRequest, PorticoError, ProvisioningConfig, Result,
};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::accounts::saga::ProvisioningSaga;
use crate::erp_ports::{ErpGateway, RecordId};
use crate::utils::html::extract_error_message;

/// Portal account provisioning service
///
/// Orchestrates the two-step signup saga against the ERP: create the party
/// (primary record), then the user that references it, compensating the
/// party when the second step fails. Group and schema lookups are memoized
/// per service instance.
pub struct AccountService {
    gateway: Arc<dyn ErpGateway>,
    portal_group: String,
    portal_group_id: RwLock<Option<RecordId>>,
    party_field: RwLock<FieldSupport>,
}

impl AccountService {
    /// Create a service with the default provisioning settings.
    pub fn new(gateway: Arc<dyn ErpGateway>) -> Self {
        Self::with_config(gateway, ProvisioningConfig::default())
    }

    pub fn with_config(gateway: Arc<dyn ErpGateway>, config: ProvisioningConfig) -> Self {
        Self {
            gateway,
            portal_group: config.portal_group,
            portal_group_id: RwLock::new(None),
            party_field: RwLock::new(FieldSupport::Unknown),
        }
    }

    /// Return true when a user already exists for the provided login.
    ///
    /// A lookup failure logs a warning and reports false: signup continues
    /// optimistically and the create call re-surfaces any uniqueness error
    /// from the server.
    pub async fn login_exists(&self, login: &str) -> bool {
        let normalized = login.trim().to_lowercase();
        let params = vec![
            json!([["login", "=", normalized]]),
            json!(0),
            json!(1),
            Value::Null,
            rpc_context(),
        ];
        match self.gateway.call("model.res.user", "search", params).await {
            Ok(result) => has_results(&result),
            Err(err) => {
                warn!(
                    login = %normalized,
                    error = %err,
                    "unable to verify existing login, continuing optimistic signup"
                );
                false
            }
        }
    }

    /// Provision a party and user for a new client.
    ///
    /// The duplicate pre-check gives a friendly error but is not atomic with
    /// the create; a concurrent signup for the same login surfaces the
    /// server's own uniqueness error instead.
    pub async fn create_client_account(
        &self,
        request: &NewAccountRequest,
    ) -> Result<AccountCreation> {
        let login = request.normalized_login();
        if login.is_empty() || request.password.is_empty() {
            return Err(PorticoError::InvalidInput(
                "an email address and a password are required".to_string(),
            ));
        }
        if self.login_exists(&login).await {
            return Err(PorticoError::AlreadyExists(
                "an account already exists for this email address".to_string(),
            ));
        }

        let portal_group_id = self.portal_group_id().await?;
        let mut saga = ProvisioningSaga::new();

        let party_id = self.create_party(request, &login).await?;
        saga.party_created(party_id)?;

        match self.create_user(request, &login, party_id, portal_group_id).await {
            Ok(user_id) => {
                saga.completed(user_id)?;
                info!(login = %login, party_id, user_id, "client account provisioned");
                Ok(AccountCreation { login, user_id, party_id })
            }
            Err(step_error) => {
                self.rollback_party(party_id).await;
                saga.rolled_back()?;
                info!(
                    login = %login,
                    party_id,
                    state = %saga.state(),
                    "signup compensated after user creation failure"
                );
                Err(step_error)
            }
        }
    }

    /// Validate a login/password pair directly against the ERP.
    ///
    /// `Ok(false)` means the credentials were rejected; an error means the
    /// check itself could not be performed.
    pub async fn validate_credentials(&self, login: &str, password: &str) -> Result<bool> {
        match self.gateway.validate_credentials(login, password).await {
            Ok(valid) => Ok(valid),
            Err(PorticoError::Auth(_)) => Ok(false),
            Err(err) => {
                error!(login = %login, error = %err, "credential validation failed upstream");
                Err(PorticoError::Internal(
                    "password verification is unavailable right now, try again later".to_string(),
                ))
            }
        }
    }

    /// Whether the remote user model links users to parties.
    ///
    /// Probed once per service instance via `fields_get`; a probe failure is
    /// treated as unsupported and never re-probed.
    pub async fn user_supports_party_field(&self) -> FieldSupport {
        {
            let known = *self.party_field.read().await;
            if known != FieldSupport::Unknown {
                return known;
            }
        }

        let params = vec![json!(["party"]), rpc_context()];
        let support = match self.gateway.call("model.res.user", "fields_get", params).await {
            Ok(fields) => {
                if fields.as_object().is_some_and(|map| map.contains_key("party")) {
                    FieldSupport::Supported
                } else {
                    warn!(
                        "remote user model does not expose a 'party' field, \
                         users will be created without linkage"
                    );
                    FieldSupport::Unsupported
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "unable to introspect user fields, assuming the party link is unavailable"
                );
                FieldSupport::Unsupported
            }
        };

        *self.party_field.write().await = support;
        support
    }

    async fn create_party(&self, request: &NewAccountRequest, login: &str) -> Result<RecordId> {
        let mut payload = json!({ "name": request.display_name() });
        let mut mechanisms = Vec::new();
        if !login.is_empty() {
            mechanisms.push(json!({ "type": "email", "value": login }));
        }
        if let Some(phone) = request.normalized_phone() {
            mechanisms.push(json!({ "type": "phone", "value": phone }));
        }
        if !mechanisms.is_empty() {
            payload["contact_mechanisms"] = json!([["create", mechanisms]]);
        }

        let result = self
            .gateway
            .call("model.party.party", "create", vec![json!([payload]), rpc_context()])
            .await
            .map_err(|err| {
                error!(login = %login, error = %err, "party creation failed");
                PorticoError::Provisioning(provisioning_message(
                    &err,
                    "Unable to create the client record.",
                ))
            })?;

        first_id(&result).ok_or_else(|| {
            PorticoError::Provisioning(
                "the server did not return an identifier for the client record".to_string(),
            )
        })
    }

    async fn create_user(
        &self,
        request: &NewAccountRequest,
        login: &str,
        party_id: RecordId,
        portal_group_id: RecordId,
    ) -> Result<RecordId> {
        let full_name = {
            let name = request.full_name();
            if name.is_empty() { login.to_string() } else { name }
        };
        let mut payload = json!({
            "name": full_name,
            "login": login,
            "password": request.password,
            "email": login,
            "active": true,
            "groups": [["add", [portal_group_id]]],
        });
        if self.user_supports_party_field().await == FieldSupport::Supported {
            payload["party"] = json!(party_id);
        }

        let result = self
            .gateway
            .call("model.res.user", "create", vec![json!([payload]), rpc_context()])
            .await
            .map_err(|err| {
                error!(login = %login, error = %err, "user creation failed");
                PorticoError::Provisioning(provisioning_message(
                    &err,
                    "Unable to create the user account. Please try again later.",
                ))
            })?;

        first_id(&result).ok_or_else(|| {
            PorticoError::Provisioning(
                "the server did not return an identifier for the user account".to_string(),
            )
        })
    }

    /// Best-effort compensation. A failed delete is logged, never raised:
    /// the caller still surfaces the original step error.
    async fn rollback_party(&self, party_id: RecordId) {
        let params = vec![json!([party_id]), rpc_context()];
        if let Err(err) = self.gateway.call("model.party.party", "delete", params).await {
            warn!(party_id, error = %err, "unable to roll back party after signup failure");
        }
    }

    /// Id of the portal access group, creating the group when it does not
    /// exist yet. Memoized after the first successful resolution.
    async fn portal_group_id(&self) -> Result<RecordId> {
        if let Some(id) = *self.portal_group_id.read().await {
            return Ok(id);
        }

        let params = vec![
            json!([["name", "=", self.portal_group.as_str()]]),
            json!(0),
            json!(1),
            Value::Null,
            rpc_context(),
        ];
        let found =
            self.gateway.call("model.res.group", "search", params).await.map_err(|err| {
                error!(group = %self.portal_group, error = %err, "portal group lookup failed");
                PorticoError::Provisioning(format!("portal access group lookup failed: {err}"))
            })?;

        let id = match first_id(&found) {
            Some(id) => id,
            None => {
                info!(group = %self.portal_group, "portal access group not found, auto-creating");
                let created = self
                    .gateway
                    .call(
                        "model.res.group",
                        "create",
                        vec![json!([{ "name": self.portal_group.as_str() }]), rpc_context()],
                    )
                    .await
                    .map_err(|err| {
                        PorticoError::Provisioning(format!(
                            "unable to auto-create portal access group '{}': {err}",
                            self.portal_group
                        ))
                    })?;
                first_id(&created).ok_or_else(|| {
                    PorticoError::Provisioning(format!(
                        "the server did not return an identifier when creating group '{}'",
                        self.portal_group
                    ))
                })?
            }
        };

        *self.portal_group_id.write().await = Some(id);
        Ok(id)
    }
}

/// Context argument appended to every model call. The portal runs with the
/// server-side defaults, so this is an empty object for now.
fn rpc_context() -> Value {
    json!({})
}

fn has_results(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Null => false,
        Value::Bool(flag) => *flag,
        _ => true,
    }
}

/// First numeric id in a create/search result.
fn first_id(value: &Value) -> Option<RecordId> {
    extract_id(value.as_array()?.first()?)
}

/// Pull a numeric id out of the shapes the server uses: `7`, `"7"`, or
/// `[7, "label"]`.
pub fn extract_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.parse().ok(),
        Value::Array(items) => items.first().and_then(extract_id),
        _ => None,
    }
}

/// User-facing message for a failed provisioning step.
///
/// HTTP-level failures carry the gateway's HTML error page in the failure
/// data; that page holds the only human-readable explanation the server
/// gives, so it is mined before falling back to a generic message.
fn provisioning_message(err: &PorticoError, fallback: &str) -> String {
    if let PorticoError::Rpc(failure) = err {
        if let Some(body) =
            failure.data.as_ref().and_then(|data| data.get("body")).and_then(Value::as_str)
        {
            return extract_error_message(body, fallback);
        }
    }
    fallback.to_string()
}
