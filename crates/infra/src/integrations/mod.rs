//! External service integrations

pub mod tryton;
