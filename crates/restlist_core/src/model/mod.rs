//! Record model shared by the ordering engine and its storage collaborator.
//!
//! # Responsibility
//! - Define the ordering-relevant view of a persisted row.
//! - Keep scope values structured so no predicate is ever built as a string.

pub mod record;
