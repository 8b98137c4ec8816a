//! Set/object reference model.
//!
//! Sets are immutable reference content written by seeding only.
//!
//! # Invariants
//! - A set carries exactly [`OBJECTS_PER_SET`] objects.
//! - Object ids are unique within a set.

use crate::model::annotation::validate_identifier;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of objects presented for comparison in every set.
pub const OBJECTS_PER_SET: usize = 4;

/// Media type of one set object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Number,
    Equation,
    Graph,
    Shape,
    Text,
    Image,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Equation => "equation",
            Self::Graph => "graph",
            Self::Shape => "shape",
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "number" => Some(Self::Number),
            "equation" => Some(Self::Equation),
            "graph" => Some(Self::Graph),
            "shape" => Some(Self::Shape),
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// One item within a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WodbObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    /// LaTeX, text, or image URL depending on `kind`.
    pub value: String,
}

impl WodbObject {
    pub fn new(id: impl Into<String>, kind: ObjectType, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            value: value.into(),
        }
    }
}

/// A fixed group of four objects presented for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WodbSet {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub objects: Vec<WodbObject>,
}

impl WodbSet {
    /// Checks set shape before persistence.
    pub fn validate(&self) -> Result<(), SetValidationError> {
        validate_identifier("set_id", &self.id)
            .map_err(|_| SetValidationError::InvalidId(self.id.clone()))?;
        if self.title.trim().is_empty() {
            return Err(SetValidationError::BlankTitle(self.id.clone()));
        }
        if self.objects.len() != OBJECTS_PER_SET {
            return Err(SetValidationError::WrongObjectCount {
                set_id: self.id.clone(),
                count: self.objects.len(),
            });
        }

        let mut seen = HashSet::new();
        for object in &self.objects {
            validate_identifier("object_id", &object.id)
                .map_err(|_| SetValidationError::InvalidId(object.id.clone()))?;
            if !seen.insert(object.id.as_str()) {
                return Err(SetValidationError::DuplicateObjectId(object.id.clone()));
            }
        }
        Ok(())
    }

    /// Returns whether `object_id` names one of this set's objects.
    pub fn contains_object(&self, object_id: &str) -> bool {
        self.objects.iter().any(|object| object.id == object_id)
    }
}

/// Set shape validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValidationError {
    InvalidId(String),
    BlankTitle(String),
    WrongObjectCount { set_id: String, count: usize },
    DuplicateObjectId(String),
}

impl Display for SetValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId(value) => write!(f, "invalid set/object id `{value}`"),
            Self::BlankTitle(set_id) => write!(f, "set `{set_id}` has a blank title"),
            Self::WrongObjectCount { set_id, count } => write!(
                f,
                "set `{set_id}` must have exactly {OBJECTS_PER_SET} objects, got {count}"
            ),
            Self::DuplicateObjectId(value) => write!(f, "duplicate object id `{value}`"),
        }
    }
}

impl Error for SetValidationError {}
