//! Annotation domain model.
//!
//! # Responsibility
//! - Define the canonical annotation record and its lifecycle enums.
//! - Validate identifier shape before records reach persistence.
//!
//! # Invariants
//! - `id` is assigned by the repository and never reused.
//! - `visibility != Private` only while `status == Accepted`; the service
//!   layer maintains this on every write.
//! - At most one annotation exists per `(user_id, set_id, object_id)`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S{1,128}$").expect("valid identifier regex"));

/// Stable annotation identifier assigned by the repository.
pub type AnnotationId = Uuid;

/// Lifecycle stage of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    /// Editable by its author, invisible to everyone else.
    Draft,
    /// Submitted for review. Locks the author's annotations in the set.
    Pending,
    /// Approved by a moderator. Counts toward the reciprocity gate.
    Accepted,
    /// Declined by a moderator.
    Rejected,
}

impl AnnotationStatus {
    /// Stable storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a storage/wire value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl Display for AnnotationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disclosure scope of an annotation beyond its author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationVisibility {
    /// Author only.
    Private,
    /// Peers holding an accepted annotation in the same set.
    Group,
    /// Everyone.
    Public,
}

impl AnnotationVisibility {
    /// Stable storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
            Self::Public => "public",
        }
    }

    /// Parses a storage/wire value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(Self::Private),
            "group" => Some(Self::Group),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

impl Display for AnnotationVisibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical annotation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub set_id: String,
    pub object_id: String,
    /// Author. Only a moderator may write on behalf of another user.
    pub user_id: String,
    pub text: String,
    pub status: AnnotationStatus,
    pub visibility: AnnotationVisibility,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Annotation {
    /// Returns whether `user_id` authored this annotation.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Pending annotations lock their author's set.
    pub fn is_locked(&self) -> bool {
        self.status == AnnotationStatus::Pending
    }

    /// Checks identifier fields.
    pub fn validate(&self) -> Result<(), AnnotationValidationError> {
        validate_identifier("set_id", &self.set_id)?;
        validate_identifier("object_id", &self.object_id)?;
        validate_identifier("user_id", &self.user_id)
    }
}

/// Identifier validation errors for annotation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationValidationError {
    /// Identifier is empty, contains whitespace, or exceeds 128 chars.
    InvalidIdentifier { field: &'static str, value: String },
}

impl Display for AnnotationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier { field, value } => {
                write!(f, "invalid {field} `{value}`: expected 1-128 non-whitespace chars")
            }
        }
    }
}

impl Error for AnnotationValidationError {}

/// Validates one opaque identifier (set, object or user id).
pub fn validate_identifier(
    field: &'static str,
    value: &str,
) -> Result<(), AnnotationValidationError> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(AnnotationValidationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}

/// Parses a caller-supplied annotation id.
///
/// Returns `None` for anything that is not a UUID; such ids can never name an
/// existing record.
pub fn parse_annotation_id(value: &str) -> Option<AnnotationId> {
    Uuid::parse_str(value.trim()).ok()
}
