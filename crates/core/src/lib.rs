//! # Portico Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits)
//! - Use cases and services
//!
//! ## Architecture Principles
//! - Only depends on `portico-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod accounts;
pub mod utils;

// Infrastructure ports
pub mod erp_ports;

// Re-export specific items to avoid ambiguity
pub use accounts::saga::ProvisioningSaga;
pub use accounts::service::{extract_id, AccountService};
pub use erp_ports::{ErpGateway, RecordId};
// Re-export utilities
pub use utils::html;
