//! Domain data types for portal account provisioning

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Signup details collected by the portal before provisioning starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccountRequest {
    pub company_name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

impl NewAccountRequest {
    /// Login identifier derived from the email address.
    ///
    /// The ERP compares logins case-insensitively, so the portal stores the
    /// lowercased form everywhere.
    #[must_use]
    pub fn normalized_login(&self) -> String {
        self.email.trim().to_lowercase()
    }

    /// Display name for the primary record: company name when given,
    /// otherwise the person's name, otherwise the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let company = self.company_name.as_deref().unwrap_or("").trim();
        if !company.is_empty() {
            return company.to_string();
        }
        let full = self.full_name();
        if full.is_empty() { self.normalized_login() } else { full }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim()).trim().to_string()
    }

    /// Phone value with whitespace trimmed, `None` when effectively empty.
    #[must_use]
    pub fn normalized_phone(&self) -> Option<String> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()).map(str::to_string)
    }
}

/// Identifiers produced by a successful provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreation {
    pub login: String,
    pub user_id: i64,
    pub party_id: i64,
}

/// States of the two-step provisioning saga
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningState {
    /// Nothing created yet.
    Start,
    /// Primary record exists; the dependent record does not.
    PartyCreated,
    /// Both records exist and reference each other.
    Completed,
    /// Dependent creation failed and the primary record was compensated.
    RolledBack,
}

impl_domain_status_conversions!(ProvisioningState {
    Start => "start",
    PartyCreated => "party_created",
    Completed => "completed",
    RolledBack => "rolled_back",
});

/// Result of probing the remote schema for an optional field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSupport {
    /// Not probed yet.
    Unknown,
    Supported,
    Unsupported,
}

impl_domain_status_conversions!(FieldSupport {
    Unknown => "unknown",
    Supported => "supported",
    Unsupported => "unsupported",
});
