//! Visibility and moderation decision rules.
//!
//! # Responsibility
//! - Decide which annotations a viewer may see (reciprocity gate).
//! - Validate status/visibility transitions against the moderation graph.
//! - Gate mutations on ownership, role and the pending-review lock.
//!
//! # Invariants
//! - Functions here are pure: no repository access, no I/O.
//! - `group`/`public` visibility is honored only for `accepted` records.
//! - The only status edges are `draft -> pending` (author review request)
//!   and the moderator edges listed in [`check_status_transition`].

use crate::model::actor::{Actor, Role};
use crate::model::annotation::{Annotation, AnnotationStatus, AnnotationVisibility};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rule violated by a requested mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// Actor lacks ownership or moderator privilege.
    Forbidden {
        actor_id: String,
        reason: &'static str,
    },
    /// Author has a pending annotation in the set.
    Locked { user_id: String, set_id: String },
    /// Status edge is not part of the moderation graph.
    InvalidStatusTransition {
        from: AnnotationStatus,
        to: AnnotationStatus,
    },
    /// `group`/`public` requested on a record that is not accepted.
    VisibilityRequiresAccepted {
        status: AnnotationStatus,
        requested: AnnotationVisibility,
    },
}

impl Display for PolicyViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forbidden { actor_id, reason } => {
                write!(f, "forbidden for `{actor_id}`: {reason}")
            }
            Self::Locked { user_id, set_id } => write!(
                f,
                "annotations of `{user_id}` in set `{set_id}` are locked pending review"
            ),
            Self::InvalidStatusTransition { from, to } => {
                write!(f, "status transition {from} -> {to} is not allowed")
            }
            Self::VisibilityRequiresAccepted { status, requested } => write!(
                f,
                "visibility `{requested}` requires status accepted, got {status}"
            ),
        }
    }
}

impl Error for PolicyViolation {}

/// Outcome of a permitted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Requested status equals the current one.
    Unchanged,
    /// Status moves; `reset_visibility` when leaving `accepted`.
    Changed { reset_visibility: bool },
}

/// Whether `viewer_id` may see `annotation`.
///
/// `viewer_has_accepted` is the reciprocity flag: the viewer owns at least
/// one accepted annotation in the same set.
pub fn is_visible_to(annotation: &Annotation, viewer_id: &str, viewer_has_accepted: bool) -> bool {
    if annotation.is_owned_by(viewer_id) {
        return true;
    }
    if annotation.status != AnnotationStatus::Accepted {
        return false;
    }
    match annotation.visibility {
        AnnotationVisibility::Public => true,
        AnnotationVisibility::Group => viewer_has_accepted,
        AnnotationVisibility::Private => false,
    }
}

/// Filters one set's annotations down to what `viewer_id` may see.
pub fn visible_subset(all: Vec<Annotation>, viewer_id: &str) -> Vec<Annotation> {
    let viewer_has_accepted = all
        .iter()
        .any(|a| a.is_owned_by(viewer_id) && a.status == AnnotationStatus::Accepted);
    all.into_iter()
        .filter(|a| is_visible_to(a, viewer_id, viewer_has_accepted))
        .collect()
}

/// Validates a moderator status change.
///
/// Allowed: `pending -> accepted|rejected`, `accepted <-> rejected`, and
/// same-state no-ops. `draft` can only leave via a review request, and
/// nothing returns to `draft` or `pending` through this path.
pub fn check_status_transition(
    from: AnnotationStatus,
    to: AnnotationStatus,
) -> Result<StatusChange, PolicyViolation> {
    use AnnotationStatus::{Accepted, Pending, Rejected};

    if from == to {
        return Ok(StatusChange::Unchanged);
    }
    match (from, to) {
        (Pending, Accepted) | (Pending, Rejected) | (Rejected, Accepted) => {
            Ok(StatusChange::Changed {
                reset_visibility: false,
            })
        }
        (Accepted, Rejected) => Ok(StatusChange::Changed {
            reset_visibility: true,
        }),
        _ => Err(PolicyViolation::InvalidStatusTransition { from, to }),
    }
}

/// Validates a moderator visibility change on a record in `status`.
pub fn check_visibility_change(
    status: AnnotationStatus,
    requested: AnnotationVisibility,
) -> Result<(), PolicyViolation> {
    match requested {
        AnnotationVisibility::Private => Ok(()),
        AnnotationVisibility::Group | AnnotationVisibility::Public => {
            if status == AnnotationStatus::Accepted {
                Ok(())
            } else {
                Err(PolicyViolation::VisibilityRequiresAccepted { status, requested })
            }
        }
    }
}

/// Requires moderator role.
pub fn require_moderator(actor: &Actor, reason: &'static str) -> Result<(), PolicyViolation> {
    match actor.role {
        Role::Moderator => Ok(()),
        Role::Member => Err(PolicyViolation::Forbidden {
            actor_id: actor.id.clone(),
            reason,
        }),
    }
}

/// Authorization gate for edits and deletes of an existing record.
///
/// Moderators may mutate anything. Members may mutate only their own
/// records that are not yet accepted, and not while `set_locked` (they hold
/// a pending annotation in the record's set).
pub fn authorize_mutation(
    actor: &Actor,
    annotation: &Annotation,
    set_locked: bool,
) -> Result<(), PolicyViolation> {
    match actor.role {
        Role::Moderator => Ok(()),
        Role::Member => {
            if !annotation.is_owned_by(&actor.id) {
                return Err(PolicyViolation::Forbidden {
                    actor_id: actor.id.clone(),
                    reason: "only the author or a moderator may modify an annotation",
                });
            }
            if set_locked {
                return Err(PolicyViolation::Locked {
                    user_id: actor.id.clone(),
                    set_id: annotation.set_id.clone(),
                });
            }
            if annotation.status == AnnotationStatus::Accepted {
                return Err(PolicyViolation::Forbidden {
                    actor_id: actor.id.clone(),
                    reason: "accepted annotations can only be changed by a moderator",
                });
            }
            Ok(())
        }
    }
}

/// Resolves the author to persist for a create/update.
///
/// A member supplying someone else's id is refused; otherwise the member's
/// own id is forced. Moderators may write on behalf of any user and default
/// to themselves.
pub fn resolve_author(actor: &Actor, supplied: Option<&str>) -> Result<String, PolicyViolation> {
    match (actor.role, supplied) {
        (Role::Moderator, Some(user_id)) => Ok(user_id.to_string()),
        (Role::Moderator, None) => Ok(actor.id.clone()),
        (Role::Member, Some(user_id)) if user_id != actor.id => Err(PolicyViolation::Forbidden {
            actor_id: actor.id.clone(),
            reason: "members may not write annotations on behalf of another user",
        }),
        (Role::Member, _) => Ok(actor.id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        authorize_mutation, check_status_transition, check_visibility_change, is_visible_to,
        resolve_author, PolicyViolation, StatusChange,
    };
    use crate::model::actor::Actor;
    use crate::model::annotation::{Annotation, AnnotationStatus, AnnotationVisibility};
    use uuid::Uuid;

    fn annotation(
        user_id: &str,
        status: AnnotationStatus,
        visibility: AnnotationVisibility,
    ) -> Annotation {
        Annotation {
            id: Uuid::new_v4(),
            set_id: "set1".to_string(),
            object_id: "o1".to_string(),
            user_id: user_id.to_string(),
            text: "note".to_string(),
            status,
            visibility,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn group_visibility_requires_reciprocity() {
        let a = annotation("u1", AnnotationStatus::Accepted, AnnotationVisibility::Group);
        assert!(is_visible_to(&a, "u1", false));
        assert!(!is_visible_to(&a, "u2", false));
        assert!(is_visible_to(&a, "u2", true));
    }

    #[test]
    fn non_accepted_records_ignore_visibility_field() {
        let a = annotation("u1", AnnotationStatus::Pending, AnnotationVisibility::Public);
        assert!(!is_visible_to(&a, "u2", true));
        assert!(is_visible_to(&a, "u1", false));
    }

    #[test]
    fn moderator_cannot_accept_draft_directly() {
        let err =
            check_status_transition(AnnotationStatus::Draft, AnnotationStatus::Accepted)
                .unwrap_err();
        assert_eq!(
            err,
            PolicyViolation::InvalidStatusTransition {
                from: AnnotationStatus::Draft,
                to: AnnotationStatus::Accepted,
            }
        );
        assert!(
            check_status_transition(AnnotationStatus::Accepted, AnnotationStatus::Pending)
                .is_err()
        );
    }

    #[test]
    fn leaving_accepted_resets_visibility() {
        assert_eq!(
            check_status_transition(AnnotationStatus::Accepted, AnnotationStatus::Rejected),
            Ok(StatusChange::Changed {
                reset_visibility: true
            })
        );
        assert_eq!(
            check_status_transition(AnnotationStatus::Rejected, AnnotationStatus::Rejected),
            Ok(StatusChange::Unchanged)
        );
    }

    #[test]
    fn widening_visibility_requires_accepted() {
        assert!(check_visibility_change(AnnotationStatus::Accepted, AnnotationVisibility::Public)
            .is_ok());
        assert!(check_visibility_change(AnnotationStatus::Pending, AnnotationVisibility::Group)
            .is_err());
        assert!(check_visibility_change(AnnotationStatus::Draft, AnnotationVisibility::Private)
            .is_ok());
    }

    #[test]
    fn resolve_author_blocks_member_spoofing() {
        let member = Actor::member("u1");
        assert_eq!(resolve_author(&member, None).unwrap(), "u1");
        assert_eq!(resolve_author(&member, Some("u1")).unwrap(), "u1");
        assert!(matches!(
            resolve_author(&member, Some("u2")),
            Err(PolicyViolation::Forbidden { .. })
        ));

        let moderator = Actor::moderator("admin");
        assert_eq!(resolve_author(&moderator, Some("u2")).unwrap(), "u2");
    }

    #[test]
    fn members_mutate_only_their_unaccepted_records() {
        let member = Actor::member("u1");
        let draft = annotation("u1", AnnotationStatus::Draft, AnnotationVisibility::Private);
        let rejected = annotation("u1", AnnotationStatus::Rejected, AnnotationVisibility::Private);
        let accepted = annotation("u1", AnnotationStatus::Accepted, AnnotationVisibility::Group);
        let foreign = annotation("u2", AnnotationStatus::Draft, AnnotationVisibility::Private);

        assert!(authorize_mutation(&member, &draft, false).is_ok());
        assert!(authorize_mutation(&member, &rejected, false).is_ok());
        assert!(matches!(
            authorize_mutation(&member, &accepted, false),
            Err(PolicyViolation::Forbidden { .. })
        ));
        assert!(matches!(
            authorize_mutation(&member, &foreign, false),
            Err(PolicyViolation::Forbidden { .. })
        ));
        assert!(matches!(
            authorize_mutation(&member, &draft, true),
            Err(PolicyViolation::Locked { .. })
        ));

        let moderator = Actor::moderator("admin");
        assert!(authorize_mutation(&moderator, &accepted, true).is_ok());
    }
}
