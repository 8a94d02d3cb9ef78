//! Storage contracts consumed by the ordering engine.
//!
//! # Responsibility
//! - Define the read/write/unit-of-work operations the engine needs.
//! - Isolate SQLite query details from engine and service code.
//!
//! # Invariants
//! - Versioned writes report conflicts as `StoreError::StaleRecord`, never as
//!   a generic database error.

pub mod list_store;
