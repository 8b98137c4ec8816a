//! Core domain logic for Which One Doesn't Belong (WODB) annotations.
//! This crate is the single source of truth for visibility and moderation invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod seed;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::actor::{Actor, Role};
pub use model::annotation::{
    Annotation, AnnotationId, AnnotationStatus, AnnotationValidationError, AnnotationVisibility,
};
pub use model::wodb_set::{ObjectType, SetValidationError, WodbObject, WodbSet};
pub use policy::PolicyViolation;
pub use repo::annotation_repo::{
    AnnotationPatch, AnnotationRepository, RepoError, RepoResult, SqliteAnnotationRepository,
    StatusFilter,
};
pub use repo::set_repo::{SetRepository, SqliteSetRepository};
pub use seed::{default_sets, seed_default_sets};
pub use service::annotation_service::{
    AnnotationInput, AnnotationService, AnnotationServiceError, SaveOutcome, ServiceResult,
};
pub use service::set_service::{SetService, SetServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
