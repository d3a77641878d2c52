//! # Portico Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Configuration loading (environment and files)
//! - HTTP client with retry and timeout handling
//! - The Tryton gateway integration (JSON-RPC client, sessions, caching)
//!
//! ## Architecture
//! - Implements traits defined in `portico-core`
//! - Depends on `portico-domain` and `portico-core`
//! - Contains all "impure" code (network I/O, environment, filesystem)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::tryton::TrytonClient;
