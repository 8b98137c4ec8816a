//! Acting identity supplied by the external identity provider.
//!
//! The core trusts an `Actor` completely; verification happens upstream.

use serde::{Deserialize, Serialize};

/// Privilege level of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular user. Self-service on own annotations only.
    Member,
    /// Reviewer with override rights on every annotation.
    Moderator,
}

/// Verified identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn member(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Member,
        }
    }

    pub fn moderator(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Moderator,
        }
    }

    pub fn is_moderator(&self) -> bool {
        match self.role {
            Role::Moderator => true,
            Role::Member => false,
        }
    }
}
