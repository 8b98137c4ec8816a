use rusqlite::Connection;
use wodb_core::db::open_db_in_memory;
use wodb_core::{
    Actor, Annotation, AnnotationInput, AnnotationRepository, AnnotationService,
    AnnotationServiceError, AnnotationStatus, AnnotationVisibility, SqliteAnnotationRepository,
};

fn service(conn: &Connection) -> AnnotationService<SqliteAnnotationRepository<'_>> {
    AnnotationService::new(SqliteAnnotationRepository::try_new(conn).unwrap())
}

fn input(set_id: &str, object_id: &str, text: &str) -> AnnotationInput {
    AnnotationInput {
        set_id: set_id.to_string(),
        object_id: object_id.to_string(),
        text: text.to_string(),
        ..AnnotationInput::default()
    }
}

fn draft(
    service: &AnnotationService<SqliteAnnotationRepository<'_>>,
    user: &str,
    object_id: &str,
) -> Annotation {
    service
        .save_annotation(&Actor::member(user), input("set1", object_id, "because"))
        .unwrap()
        .annotation
}

#[test]
fn member_save_creates_private_draft_owned_by_actor() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let outcome = service
        .save_annotation(&Actor::member("alice"), input("set1", "o1", "zero is neutral"))
        .unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.annotation.user_id, "alice");
    assert_eq!(outcome.annotation.status, AnnotationStatus::Draft);
    assert_eq!(outcome.annotation.visibility, AnnotationVisibility::Private);

    let again = service
        .save_annotation(&Actor::member("alice"), input("set1", "o1", "revised"))
        .unwrap();
    assert!(!again.created);
    assert_eq!(again.annotation.id, outcome.annotation.id);
    assert_eq!(again.annotation.text, "revised");
}

#[test]
fn member_spoofing_another_author_is_forbidden() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut request = input("set1", "o1", "spoof");
    request.user_id = Some("bob".to_string());
    let err = service
        .save_annotation(&Actor::member("alice"), request)
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Forbidden { .. }));
    assert_eq!(err.http_status(), 403);
    assert!(service
        .annotations_for_requester("bob", "set1")
        .unwrap()
        .is_empty());

    let mut own = input("set1", "o1", "own id is fine");
    own.user_id = Some("alice".to_string());
    let saved = service.save_annotation(&Actor::member("alice"), own).unwrap();
    assert_eq!(saved.annotation.user_id, "alice");
}

#[test]
fn moderator_may_write_on_behalf_of_a_user() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice_draft = draft(&service, "alice", "o1");

    let mut request = input("set1", "o2", "seeded by moderator");
    request.user_id = Some("bob".to_string());
    let saved = service
        .save_annotation(&Actor::moderator("mod"), request)
        .unwrap();
    assert_eq!(saved.annotation.user_id, "bob");

    let mut edit = input("set1", "o1", "moderator fix");
    edit.id = Some(alice_draft.id.to_string());
    let edited = service.save_annotation(&Actor::moderator("mod"), edit).unwrap();
    assert_eq!(edited.annotation.id, alice_draft.id);
    assert_eq!(edited.annotation.user_id, "alice");
    assert_eq!(edited.annotation.text, "moderator fix");
}

#[test]
fn unknown_id_on_save_with_free_target_creates_fresh_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut request = input("set1", "o1", "fresh");
    request.id = Some("0b7c2d1e-1111-4222-8333-444455556666".to_string());
    let outcome = service
        .save_annotation(&Actor::member("alice"), request)
        .unwrap();
    assert!(outcome.created);
    assert_ne!(
        outcome.annotation.id.to_string(),
        "0b7c2d1e-1111-4222-8333-444455556666"
    );
}

#[test]
fn unknown_id_on_save_with_taken_target_updates_that_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::member("alice");
    let first = service
        .save_annotation(&alice, input("set1", "o1", "first"))
        .unwrap();

    let mut request = input("set1", "o1", "second");
    request.id = Some("0b7c2d1e-1111-4222-8333-444455556666".to_string());
    let second = service.save_annotation(&alice, request).unwrap();

    assert!(!second.created);
    assert_eq!(second.annotation.id, first.annotation.id);
    assert_eq!(second.annotation.text, "second");
    assert_eq!(service.annotations_for_requester("alice", "set1").unwrap().len(), 1);
}

#[test]
fn member_may_delete_rejected_but_not_accepted_annotation() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::member("alice");
    let moderator = Actor::moderator("mod");
    let rejected = draft(&service, "alice", "o1");
    let accepted = draft(&service, "alice", "o2");
    service.request_review(&alice, "set1").unwrap();
    service
        .set_status(&moderator, &rejected.id.to_string(), AnnotationStatus::Rejected)
        .unwrap();
    let accepted_id = accepted.id.to_string();
    service
        .set_status(&moderator, &accepted_id, AnnotationStatus::Accepted)
        .unwrap();
    service
        .set_visibility(&moderator, &accepted_id, AnnotationVisibility::Group)
        .unwrap();

    let err = service
        .delete_annotation(&alice, &accepted_id)
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Forbidden { .. }));
    assert_eq!(err.http_status(), 403);
    assert!(service
        .annotation_for_object("alice", "set1", "o2")
        .unwrap()
        .is_some());

    let deleted = service
        .delete_annotation(&alice, &rejected.id.to_string())
        .unwrap();
    assert_eq!(deleted.status, AnnotationStatus::Rejected);

    let removed = service
        .delete_annotation(&moderator, &accepted_id)
        .unwrap();
    assert_eq!(removed.status, AnnotationStatus::Accepted);
    assert!(service
        .annotations_for_requester("alice", "set1")
        .unwrap()
        .is_empty());
}

#[test]
fn invalid_identifiers_are_rejected_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .save_annotation(&Actor::member("alice"), input("", "o1", "x"))
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::InvalidInput(_)));
    assert_eq!(err.http_status(), 400);
    assert!(service
        .annotations_for_requester("alice", "")
        .unwrap()
        .is_empty());
}

#[test]
fn member_cannot_modify_another_users_annotation() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let bob_draft = draft(&service, "bob", "o1");

    let err = service
        .delete_annotation(&Actor::member("alice"), &bob_draft.id.to_string())
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Forbidden { .. }));

    let mut edit = input("set1", "o1", "hijack");
    edit.id = Some(bob_draft.id.to_string());
    let err = service
        .save_annotation(&Actor::member("alice"), edit)
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Forbidden { .. }));

    let unchanged = service
        .annotation_for_object("bob", "set1", "o1")
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.text, "because");
}

#[test]
fn request_review_flips_drafts_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::member("alice");
    draft(&service, "alice", "o1");
    draft(&service, "alice", "o2");
    draft(&service, "bob", "o1");

    let changed = service.request_review(&alice, "set1").unwrap();
    assert_eq!(changed.len(), 2);
    assert!(changed
        .iter()
        .all(|a| a.status == AnnotationStatus::Pending && a.user_id == "alice"));

    let second = service.request_review(&alice, "set1").unwrap();
    assert!(second.is_empty());

    let bob = service
        .annotation_for_object("bob", "set1", "o1")
        .unwrap()
        .unwrap();
    assert_eq!(bob.status, AnnotationStatus::Draft);
}

#[test]
fn pending_annotation_locks_the_author_out_of_the_set() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::member("alice");
    let pending = draft(&service, "alice", "o1");
    service.request_review(&alice, "set1").unwrap();

    let err = service
        .delete_annotation(&alice, &pending.id.to_string())
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Locked { .. }));
    assert_eq!(err.http_status(), 409);

    let err = service
        .save_annotation(&alice, input("set1", "o2", "new while locked"))
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Locked { .. }));

    assert_eq!(service.annotations_for_requester("alice", "set1").unwrap().len(), 1);

    let other_set = service
        .save_annotation(&alice, input("set2", "o5", "different set"))
        .unwrap();
    assert!(other_set.created);
}

#[test]
fn moderator_can_delete_pending_annotation() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let pending = draft(&service, "alice", "o1");
    service
        .request_review(&Actor::member("alice"), "set1")
        .unwrap();

    let deleted = service
        .delete_annotation(&Actor::moderator("mod"), &pending.id.to_string())
        .unwrap();
    assert_eq!(deleted.id, pending.id);
    assert!(service
        .annotations_for_requester("alice", "set1")
        .unwrap()
        .is_empty());

    let err = service
        .delete_annotation(&Actor::moderator("mod"), &pending.id.to_string())
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::NotFound(_)));
    assert_eq!(err.http_status(), 404);
}

#[test]
fn status_changes_follow_the_moderation_graph() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let moderator = Actor::moderator("mod");
    let annotation = draft(&service, "alice", "o1");
    let id = annotation.id.to_string();

    let err = service
        .set_status(&moderator, &id, AnnotationStatus::Accepted)
        .unwrap_err();
    assert!(matches!(
        err,
        AnnotationServiceError::InvalidStatusTransition {
            from: AnnotationStatus::Draft,
            to: AnnotationStatus::Accepted,
        }
    ));

    service
        .request_review(&Actor::member("alice"), "set1")
        .unwrap();
    let rejected = service
        .set_status(&moderator, &id, AnnotationStatus::Rejected)
        .unwrap();
    assert_eq!(rejected.status, AnnotationStatus::Rejected);

    let accepted = service
        .set_status(&moderator, &id, AnnotationStatus::Accepted)
        .unwrap();
    assert_eq!(accepted.status, AnnotationStatus::Accepted);

    let err = service
        .set_status(&moderator, &id, AnnotationStatus::Pending)
        .unwrap_err();
    assert!(matches!(
        err,
        AnnotationServiceError::InvalidStatusTransition { .. }
    ));

    let same = service
        .set_status(&moderator, &id, AnnotationStatus::Accepted)
        .unwrap();
    assert_eq!(same, accepted);
}

#[test]
fn members_cannot_moderate() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::member("alice");
    let annotation = draft(&service, "alice", "o1");
    let id = annotation.id.to_string();

    let err = service
        .set_status(&alice, &id, AnnotationStatus::Pending)
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Forbidden { .. }));

    let err = service
        .set_visibility(&alice, &id, AnnotationVisibility::Public)
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Forbidden { .. }));

    let err = service
        .admin_annotations_for_set(&alice, "set1")
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Forbidden { .. }));

    let all = service
        .admin_annotations_for_set(&Actor::moderator("mod"), "set1")
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn visibility_requires_accepted_and_resets_when_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let moderator = Actor::moderator("mod");
    let annotation = draft(&service, "alice", "o1");
    let id = annotation.id.to_string();
    service
        .request_review(&Actor::member("alice"), "set1")
        .unwrap();

    let err = service
        .set_visibility(&moderator, &id, AnnotationVisibility::Group)
        .unwrap_err();
    assert!(matches!(
        err,
        AnnotationServiceError::VisibilityRequiresAccepted { .. }
    ));

    service
        .set_status(&moderator, &id, AnnotationStatus::Accepted)
        .unwrap();
    let public = service
        .set_visibility(&moderator, &id, AnnotationVisibility::Public)
        .unwrap();
    assert_eq!(public.visibility, AnnotationVisibility::Public);
    assert_eq!(service.visible_annotations("anyone", "set1").unwrap().len(), 1);

    let rejected = service
        .set_status(&moderator, &id, AnnotationStatus::Rejected)
        .unwrap();
    assert_eq!(rejected.visibility, AnnotationVisibility::Private);
    assert!(service.visible_annotations("anyone", "set1").unwrap().is_empty());
}

#[test]
fn author_edits_after_decision() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::member("alice");
    let moderator = Actor::moderator("mod");
    let first = draft(&service, "alice", "o1");
    let second = draft(&service, "alice", "o2");
    service.request_review(&alice, "set1").unwrap();
    service
        .set_status(&moderator, &first.id.to_string(), AnnotationStatus::Rejected)
        .unwrap();
    service
        .set_status(&moderator, &second.id.to_string(), AnnotationStatus::Accepted)
        .unwrap();

    let reopened = service
        .save_annotation(&alice, input("set1", "o1", "second try"))
        .unwrap();
    assert_eq!(reopened.annotation.id, first.id);
    assert_eq!(reopened.annotation.status, AnnotationStatus::Draft);
    assert_eq!(reopened.annotation.visibility, AnnotationVisibility::Private);

    let err = service
        .save_annotation(&alice, input("set1", "o2", "rewrite accepted"))
        .unwrap_err();
    assert!(matches!(err, AnnotationServiceError::Forbidden { .. }));
}

#[test]
fn status_changes_are_persisted() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let annotation = draft(&service, "alice", "o1");
    service
        .request_review(&Actor::member("alice"), "set1")
        .unwrap();
    service
        .set_status(
            &Actor::moderator("mod"),
            &annotation.id.to_string(),
            AnnotationStatus::Accepted,
        )
        .unwrap();

    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();
    let stored = repo
        .annotation_by_id(&annotation.id.to_string())
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, AnnotationStatus::Accepted);
    assert!(stored.updated_at >= stored.created_at);
}
