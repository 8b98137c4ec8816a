//! Set catalog use-case service.
//!
//! # Responsibility
//! - List and fetch reference sets for the annotation UI.
//! - Validate and upsert sets during seeding.

use crate::model::wodb_set::{SetValidationError, WodbSet};
use crate::repo::annotation_repo::RepoError;
use crate::repo::set_repo::SetRepository;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for set catalog use-cases.
#[derive(Debug)]
pub enum SetServiceError {
    SetNotFound(String),
    InvalidSet(SetValidationError),
    Repo(RepoError),
}

impl Display for SetServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetNotFound(set_id) => write!(f, "set not found: {set_id}"),
            Self::InvalidSet(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SetServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSet(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::SetNotFound(_) => None,
        }
    }
}

impl From<RepoError> for SetServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<SetValidationError> for SetServiceError {
    fn from(value: SetValidationError) -> Self {
        Self::InvalidSet(value)
    }
}

/// Set catalog facade over repository implementations.
pub struct SetService<R: SetRepository> {
    repo: R,
}

impl<R: SetRepository> SetService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list_sets(&self) -> Result<Vec<WodbSet>, SetServiceError> {
        Ok(self.repo.list_sets()?)
    }

    /// Gets one set, or `SetNotFound`.
    pub fn get_set(&self, set_id: &str) -> Result<WodbSet, SetServiceError> {
        self.repo
            .get_set(set_id)?
            .ok_or_else(|| SetServiceError::SetNotFound(set_id.to_string()))
    }

    /// Validates then inserts or replaces each set. Returns the count written.
    pub fn upsert_sets(&self, sets: &[WodbSet]) -> Result<usize, SetServiceError> {
        for set in sets {
            set.validate()?;
        }
        for set in sets {
            self.repo.upsert_set(set)?;
        }
        info!(
            "event=sets_upsert module=service status=ok count={}",
            sets.len()
        );
        Ok(sets.len())
    }
}
