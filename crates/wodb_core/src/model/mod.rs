//! Domain model for sets, annotations and acting identities.
//!
//! # Responsibility
//! - Define canonical data structures used by policy and repositories.
//! - Keep wire names aligned with the JSON shape consumed by clients.
//!
//! # Invariants
//! - Annotation ids are repository-assigned UUIDs.
//! - Sets always carry exactly four objects.

pub mod actor;
pub mod annotation;
pub mod wodb_set;
