//! Default reference sets shipped with the core.

use crate::model::wodb_set::{ObjectType, WodbObject, WodbSet};
use crate::repo::set_repo::SetRepository;
use crate::service::set_service::{SetService, SetServiceError};

/// The built-in sample sets (`set1` Numbers, `set2` Shapes).
pub fn default_sets() -> Vec<WodbSet> {
    vec![
        WodbSet {
            id: "set1".to_string(),
            title: "Numbers".to_string(),
            description: Some("Which number does not belong?".to_string()),
            objects: vec![
                WodbObject::new("o1", ObjectType::Number, "0"),
                WodbObject::new("o2", ObjectType::Number, "-3"),
                WodbObject::new("o3", ObjectType::Number, "4"),
                WodbObject::new("o4", ObjectType::Number, "6.0"),
            ],
        },
        WodbSet {
            id: "set2".to_string(),
            title: "Shapes".to_string(),
            description: Some("Which shape does not belong?".to_string()),
            objects: vec![
                WodbObject::new("o5", ObjectType::Shape, "square"),
                WodbObject::new("o6", ObjectType::Shape, "circle"),
                WodbObject::new("o7", ObjectType::Shape, "cube"),
                WodbObject::new("o8", ObjectType::Shape, "star"),
            ],
        },
    ]
}

/// Upserts [`default_sets`]. Safe to run repeatedly.
pub fn seed_default_sets<R: SetRepository>(
    service: &SetService<R>,
) -> Result<usize, SetServiceError> {
    service.upsert_sets(&default_sets())
}
