//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from policy/service orchestration.
//!
//! # Invariants
//! - Repositories hold no policy logic; authorization lives in `service`.
//! - Unknown ids resolve to empty results, not errors.

pub mod annotation_repo;
pub mod set_repo;
