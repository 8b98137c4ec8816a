use serde_json::json;
use uuid::Uuid;
use wodb_core::{Actor, Annotation, AnnotationStatus, AnnotationVisibility, Role};

fn sample() -> Annotation {
    Annotation {
        id: Uuid::parse_str("6f1c1c9a-2f4e-4a51-9a4b-3e0f3f7a9d10").unwrap(),
        set_id: "set1".to_string(),
        object_id: "o2".to_string(),
        user_id: "u1".to_string(),
        text: "the only negative".to_string(),
        status: AnnotationStatus::Accepted,
        visibility: AnnotationVisibility::Group,
        created_at: 1_700_000_000_000,
        updated_at: 1_700_000_100_000,
    }
}

#[test]
fn annotation_serializes_with_camel_case_fields() {
    let value = serde_json::to_value(sample()).unwrap();
    assert_eq!(
        value,
        json!({
            "id": "6f1c1c9a-2f4e-4a51-9a4b-3e0f3f7a9d10",
            "setId": "set1",
            "objectId": "o2",
            "userId": "u1",
            "text": "the only negative",
            "status": "accepted",
            "visibility": "group",
            "createdAt": 1_700_000_000_000_i64,
            "updatedAt": 1_700_000_100_000_i64,
        })
    );
}

#[test]
fn annotation_deserializes_from_wire_shape() {
    let text = serde_json::to_string(&sample()).unwrap();
    let parsed: Annotation = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, sample());

    let bad = text.replace("\"accepted\"", "\"archived\"");
    assert!(serde_json::from_str::<Annotation>(&bad).is_err());
}

#[test]
fn actor_role_is_explicit() {
    let member = Actor::member("u1");
    let moderator = Actor::moderator("m1");
    assert_eq!(member.role, Role::Member);
    assert!(!member.is_moderator());
    assert!(moderator.is_moderator());
    assert_eq!(
        serde_json::to_value(&moderator).unwrap(),
        json!({ "id": "m1", "role": "moderator" })
    );
}
