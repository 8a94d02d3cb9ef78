//! Use-case services.
//!
//! # Responsibility
//! - Own unit-of-work boundaries around position engine hooks.
//! - Keep callers decoupled from storage details.

pub mod list_service;
