//! Utility modules shared by core services

pub mod html;
