//! Annotation visibility and moderation use-case service.
//!
//! # Responsibility
//! - Compute what a viewer may see, and what a requester owns.
//! - Validate and apply create/edit/delete, review requests, and moderator
//!   status/visibility changes.
//!
//! # Invariants
//! - Identity comes from the `Actor`, never from input payloads.
//! - Every authorization and transition check runs before any write.
//! - `visibility != private` implies `status == accepted` after every write.

use crate::model::actor::Actor;
use crate::model::annotation::{
    validate_identifier, Annotation, AnnotationStatus, AnnotationValidationError,
    AnnotationVisibility,
};
use crate::policy::{
    authorize_mutation, check_status_transition, check_visibility_change, require_moderator,
    resolve_author, visible_subset, PolicyViolation, StatusChange,
};
use crate::repo::annotation_repo::{AnnotationPatch, AnnotationRepository, RepoError, StatusFilter};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, AnnotationServiceError>;

/// Service error for annotation use-cases.
#[derive(Debug)]
pub enum AnnotationServiceError {
    /// Referenced annotation id does not resolve.
    NotFound(String),
    /// Actor lacks ownership or moderator privilege.
    Forbidden {
        actor_id: String,
        reason: &'static str,
    },
    /// Author holds a pending annotation in the set.
    Locked { user_id: String, set_id: String },
    /// Status change is outside the moderation graph.
    InvalidStatusTransition {
        from: AnnotationStatus,
        to: AnnotationStatus,
    },
    /// Visibility widened on a record that is not accepted.
    VisibilityRequiresAccepted {
        status: AnnotationStatus,
        requested: AnnotationVisibility,
    },
    /// Malformed identifier in the request.
    InvalidInput(AnnotationValidationError),
    /// Write collides with another record for the same user/set/object.
    Conflict(String),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl AnnotationServiceError {
    /// HTTP status a transport layer should surface for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Forbidden { .. } => 403,
            Self::NotFound(_) => 404,
            Self::Locked { .. }
            | Self::InvalidStatusTransition { .. }
            | Self::VisibilityRequiresAccepted { .. }
            | Self::Conflict(_) => 409,
            Self::Repo(_) | Self::InconsistentState(_) => 500,
        }
    }
}

impl Display for AnnotationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "annotation not found: {id}"),
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
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::Conflict(message) => write!(f, "conflicting annotation: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent annotation state: {details}")
            }
        }
    }
}

impl Error for AnnotationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AnnotationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidInput(err),
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

impl From<AnnotationValidationError> for AnnotationServiceError {
    fn from(value: AnnotationValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<PolicyViolation> for AnnotationServiceError {
    fn from(value: PolicyViolation) -> Self {
        match value {
            PolicyViolation::Forbidden { actor_id, reason } => Self::Forbidden { actor_id, reason },
            PolicyViolation::Locked { user_id, set_id } => Self::Locked { user_id, set_id },
            PolicyViolation::InvalidStatusTransition { from, to } => {
                Self::InvalidStatusTransition { from, to }
            }
            PolicyViolation::VisibilityRequiresAccepted { status, requested } => {
                Self::VisibilityRequiresAccepted { status, requested }
            }
        }
    }
}

/// Create-or-update request from an author or moderator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationInput {
    /// Existing annotation id. Unresolvable ids are ignored and never adopted.
    pub id: Option<String>,
    pub set_id: String,
    pub object_id: String,
    /// Claimed author. Members may only name themselves.
    pub user_id: Option<String>,
    pub text: String,
}

/// Result of `save_annotation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub annotation: Annotation,
    /// `true` when a new record was inserted.
    pub created: bool,
}

/// Visibility and moderation facade over an annotation repository.
pub struct AnnotationService<R: AnnotationRepository> {
    repo: R,
}

impl<R: AnnotationRepository> AnnotationService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Annotations in `set_id` that `viewer_id` may see.
    ///
    /// Own annotations in any state, accepted public ones, and accepted group
    /// ones once the viewer holds an accepted annotation in the set.
    pub fn visible_annotations(
        &self,
        viewer_id: &str,
        set_id: &str,
    ) -> ServiceResult<Vec<Annotation>> {
        let all = self.repo.annotations_for_set(set_id)?;
        Ok(visible_subset(all, viewer_id))
    }

    /// The requester's own annotations in `set_id`, any status.
    pub fn annotations_for_requester(
        &self,
        requester_id: &str,
        set_id: &str,
    ) -> ServiceResult<Vec<Annotation>> {
        Ok(self.repo.annotations_for_user_in_set(requester_id, set_id)?)
    }

    /// The requester's annotation on one object, for edit-resume flows.
    pub fn annotation_for_object(
        &self,
        requester_id: &str,
        set_id: &str,
        object_id: &str,
    ) -> ServiceResult<Option<Annotation>> {
        Ok(self
            .repo
            .annotation_by_user_and_object(requester_id, set_id, object_id)?)
    }

    /// Every annotation in `set_id`, regardless of status. Moderators only.
    pub fn admin_annotations_for_set(
        &self,
        actor: &Actor,
        set_id: &str,
    ) -> ServiceResult<Vec<Annotation>> {
        require_moderator(actor, "listing all annotations requires moderator role")
            .map_err(|violation| self.denied("admin_list", actor, violation))?;
        Ok(self.repo.annotations_for_set(set_id)?)
    }

    /// Creates or updates one annotation.
    ///
    /// # Contract
    /// - A member naming another author is `Forbidden`; otherwise the
    ///   author is forced to the actor.
    /// - Members are `Locked` while they hold a pending annotation in the set.
    /// - Members may edit drafts; editing a rejected record reopens it as
    ///   draft/private; accepted records are moderator-only.
    /// - An `id` naming no record is ignored: the save resolves by
    ///   `(user_id, set_id, object_id)` and inserts only when that is free.
    /// - Status and visibility are otherwise left to the moderation paths.
    pub fn save_annotation(
        &self,
        actor: &Actor,
        input: AnnotationInput,
    ) -> ServiceResult<SaveOutcome> {
        validate_identifier("set_id", &input.set_id)?;
        validate_identifier("object_id", &input.object_id)?;
        let by_id = match input.id.as_deref() {
            Some(id) => self.repo.annotation_by_id(id)?,
            None => None,
        };
        let author = match (&by_id, input.user_id.as_deref()) {
            // Moderator edits keep the original author unless told otherwise.
            (Some(current), None) if actor.is_moderator() => current.user_id.clone(),
            (_, supplied) => resolve_author(actor, supplied)
                .map_err(|violation| self.denied("save", actor, violation))?,
        };
        validate_identifier("user_id", &author)?;

        let existing = match by_id {
            Some(found) => Some(found),
            None => {
                self.repo
                    .annotation_by_user_and_object(&author, &input.set_id, &input.object_id)?
            }
        };

        if !actor.is_moderator() && self.has_pending(&actor.id, &input.set_id)? {
            return Err(self.denied(
                "save",
                actor,
                PolicyViolation::Locked {
                    user_id: actor.id.clone(),
                    set_id: input.set_id.clone(),
                },
            ));
        }

        let mut patch = AnnotationPatch {
            id: None,
            set_id: Some(input.set_id),
            object_id: Some(input.object_id),
            user_id: Some(author),
            text: Some(input.text),
            status: None,
            visibility: None,
        };

        match &existing {
            Some(current) => {
                // The record may live in another set than the one requested.
                let locked = !actor.is_moderator()
                    && patch.set_id.as_deref() != Some(current.set_id.as_str())
                    && self.has_pending(&actor.id, &current.set_id)?;
                authorize_mutation(actor, current, locked)
                    .map_err(|violation| self.denied("save", actor, violation))?;
                // Reopen rejected work for revision.
                if !actor.is_moderator() && current.status == AnnotationStatus::Rejected {
                    patch.status = Some(AnnotationStatus::Draft);
                    patch.visibility = Some(AnnotationVisibility::Private);
                }
                patch.id = Some(current.id.to_string());
            }
            None => {
                patch.status = Some(AnnotationStatus::Draft);
                patch.visibility = Some(AnnotationVisibility::Private);
            }
        }

        let annotation = self.repo.save(&patch)?;
        let created = existing.is_none();
        info!(
            "event=annotation_save module=service status=ok annotation_id={} set_id={} created={} moderator={}",
            annotation.id,
            annotation.set_id,
            created,
            actor.is_moderator()
        );
        Ok(SaveOutcome {
            annotation,
            created,
        })
    }

    /// Deletes one annotation; returns the removed record.
    ///
    /// Members may delete their own draft or rejected records while not
    /// locked; accepted records are moderator-only, as for edits.
    pub fn delete_annotation(
        &self,
        actor: &Actor,
        annotation_id: &str,
    ) -> ServiceResult<Annotation> {
        let current = self.require_annotation(annotation_id)?;
        let locked = !actor.is_moderator() && self.has_pending(&actor.id, &current.set_id)?;
        authorize_mutation(actor, &current, locked)
            .map_err(|violation| self.denied("delete", actor, violation))?;

        if !self.repo.delete(annotation_id)? {
            return Err(AnnotationServiceError::NotFound(annotation_id.to_string()));
        }
        info!(
            "event=annotation_delete module=service status=ok annotation_id={} moderator={}",
            current.id,
            actor.is_moderator()
        );
        Ok(current)
    }

    /// Submits all of the actor's drafts in `set_id` for review.
    ///
    /// Idempotent: with no drafts left it changes nothing and returns an
    /// empty list.
    pub fn request_review(&self, actor: &Actor, set_id: &str) -> ServiceResult<Vec<Annotation>> {
        validate_identifier("set_id", set_id)?;
        let changed = self.repo.bulk_set_status(
            &StatusFilter::drafts_of(actor.id.as_str(), set_id),
            AnnotationStatus::Pending,
        )?;
        info!(
            "event=review_request module=service status=ok set_id={} changed={}",
            set_id,
            changed.len()
        );
        Ok(changed)
    }

    /// Moderator status decision on one annotation.
    pub fn set_status(
        &self,
        actor: &Actor,
        annotation_id: &str,
        status: AnnotationStatus,
    ) -> ServiceResult<Annotation> {
        require_moderator(actor, "changing status requires moderator role")
            .map_err(|violation| self.denied("set_status", actor, violation))?;
        let current = self.require_annotation(annotation_id)?;
        let change = check_status_transition(current.status, status)
            .map_err(|violation| self.denied("set_status", actor, violation))?;

        let updated = match change {
            StatusChange::Unchanged => return Ok(current),
            StatusChange::Changed { reset_visibility }
                if reset_visibility && current.visibility != AnnotationVisibility::Private =>
            {
                self.repo.save(&AnnotationPatch {
                    id: Some(current.id.to_string()),
                    status: Some(status),
                    visibility: Some(AnnotationVisibility::Private),
                    ..AnnotationPatch::default()
                })?
            }
            StatusChange::Changed { .. } => self
                .repo
                .set_status(annotation_id, status)?
                .ok_or(AnnotationServiceError::InconsistentState(
                    "annotation vanished during status change",
                ))?,
        };

        info!(
            "event=annotation_status module=service status=ok annotation_id={} from={} to={}",
            updated.id, current.status, updated.status
        );
        Ok(updated)
    }

    /// Moderator visibility change on one annotation.
    pub fn set_visibility(
        &self,
        actor: &Actor,
        annotation_id: &str,
        visibility: AnnotationVisibility,
    ) -> ServiceResult<Annotation> {
        require_moderator(actor, "changing visibility requires moderator role")
            .map_err(|violation| self.denied("set_visibility", actor, violation))?;
        let current = self.require_annotation(annotation_id)?;
        check_visibility_change(current.status, visibility)
            .map_err(|violation| self.denied("set_visibility", actor, violation))?;
        if current.visibility == visibility {
            return Ok(current);
        }

        let updated = self
            .repo
            .set_visibility(annotation_id, visibility)?
            .ok_or(AnnotationServiceError::InconsistentState(
                "annotation vanished during visibility change",
            ))?;
        info!(
            "event=annotation_visibility module=service status=ok annotation_id={} from={} to={}",
            updated.id, current.visibility, updated.visibility
        );
        Ok(updated)
    }

    fn require_annotation(&self, annotation_id: &str) -> ServiceResult<Annotation> {
        self.repo
            .annotation_by_id(annotation_id)?
            .ok_or_else(|| AnnotationServiceError::NotFound(annotation_id.to_string()))
    }

    fn has_pending(&self, user_id: &str, set_id: &str) -> ServiceResult<bool> {
        Ok(self
            .repo
            .annotations_for_user_in_set(user_id, set_id)?
            .iter()
            .any(Annotation::is_locked))
    }

    fn denied(
        &self,
        operation: &'static str,
        actor: &Actor,
        violation: PolicyViolation,
    ) -> AnnotationServiceError {
        warn!(
            "event=policy_denied module=service operation={} actor_id={} reason={}",
            operation, actor.id, violation
        );
        violation.into()
    }
}
