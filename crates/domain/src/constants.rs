//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! portal integration.

// ERP gateway defaults
pub const DEFAULT_ERP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ERP_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RESPONSE_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_ERP_DATABASE: &str = "tryton";

// Session authentication
pub const SESSION_HEADER_SCHEME: &str = "Session";
// One initial attempt plus one forced re-authentication, never more.
pub const MAX_CALL_ATTEMPTS: usize = 2;

// Account provisioning
pub const DEFAULT_PORTAL_GROUP: &str = "Portal Access";
