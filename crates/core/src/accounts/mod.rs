//! Portal client account domain

pub mod saga;
pub mod service;

pub use saga::ProvisioningSaga;
pub use service::AccountService;
