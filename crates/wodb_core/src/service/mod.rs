//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Apply visibility and moderation policy before any write.

pub mod annotation_service;
pub mod set_service;
