//! Annotation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide canonical storage and retrieval of annotation records.
//! - Keep SQL details inside the persistence boundary; no policy here.
//!
//! # Invariants
//! - Lookups on unknown ids/sets return empty results, never errors.
//! - `save` resolves by id, then by `(user_id, set_id, object_id)`, then
//!   inserts with a fresh id. A supplied id that resolves to nothing is never
//!   adopted as the new record's id.
//! - Multi-row writes run in one transaction.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::annotation::{
    parse_annotation_id, Annotation, AnnotationId, AnnotationStatus, AnnotationValidationError,
    AnnotationVisibility,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ANNOTATION_SELECT_SQL: &str = "SELECT
    uuid,
    set_id,
    object_id,
    user_id,
    text,
    status,
    visibility,
    created_at,
    updated_at
FROM annotations";

const ANNOTATION_ORDER_SQL: &str = " ORDER BY created_at ASC, rowid ASC";

const REQUIRED_ANNOTATION_COLUMNS: &[&str] = &[
    "uuid",
    "set_id",
    "object_id",
    "user_id",
    "text",
    "status",
    "visibility",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Field values failed identifier validation.
    Validation(AnnotationValidationError),
    /// Insert path reached without a required field.
    MissingField(&'static str),
    /// Write collides with another record's unique key.
    Conflict(String),
    /// Persisted row cannot be converted into a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::Conflict(message) => write!(f, "conflicting write: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AnnotationValidationError> for RepoError {
    fn from(value: AnnotationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation {
                return Self::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Partial annotation used by `save`.
///
/// `None` fields are left untouched on update and defaulted on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationPatch {
    /// Caller-supplied id. Honored only if it names an existing record.
    pub id: Option<String>,
    pub set_id: Option<String>,
    pub object_id: Option<String>,
    pub user_id: Option<String>,
    pub text: Option<String>,
    pub status: Option<AnnotationStatus>,
    pub visibility: Option<AnnotationVisibility>,
}

impl AnnotationPatch {
    fn owner_target(&self) -> Option<(&str, &str, &str)> {
        match (&self.user_id, &self.set_id, &self.object_id) {
            (Some(user_id), Some(set_id), Some(object_id)) => {
                Some((user_id.as_str(), set_id.as_str(), object_id.as_str()))
            }
            _ => None,
        }
    }

    fn merge_into(&self, mut annotation: Annotation) -> Annotation {
        if let Some(value) = &self.set_id {
            annotation.set_id = value.clone();
        }
        if let Some(value) = &self.object_id {
            annotation.object_id = value.clone();
        }
        if let Some(value) = &self.user_id {
            annotation.user_id = value.clone();
        }
        if let Some(value) = &self.text {
            annotation.text = value.clone();
        }
        if let Some(value) = self.status {
            annotation.status = value;
        }
        if let Some(value) = self.visibility {
            annotation.visibility = value;
        }
        annotation
    }
}

/// Selection used by bulk status transitions. `None` matches any value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter {
    pub user_id: Option<String>,
    pub set_id: Option<String>,
    pub status: Option<AnnotationStatus>,
}

impl StatusFilter {
    /// All of one user's drafts in one set: the request-review selection.
    pub fn drafts_of(user_id: impl Into<String>, set_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            set_id: Some(set_id.into()),
            status: Some(AnnotationStatus::Draft),
        }
    }
}

/// Repository interface for annotation storage.
pub trait AnnotationRepository {
    /// All records for a set.
    fn annotations_for_set(&self, set_id: &str) -> RepoResult<Vec<Annotation>>;
    /// Records owned by one user in a set.
    fn annotations_for_user_in_set(&self, user_id: &str, set_id: &str)
        -> RepoResult<Vec<Annotation>>;
    /// Lookup for edit-resume flows.
    fn annotation_by_user_and_object(
        &self,
        user_id: &str,
        set_id: &str,
        object_id: &str,
    ) -> RepoResult<Option<Annotation>>;
    fn annotation_by_id(&self, id: &str) -> RepoResult<Option<Annotation>>;
    /// Updates-in-place or inserts; see module invariants.
    fn save(&self, patch: &AnnotationPatch) -> RepoResult<Annotation>;
    /// Returns `true` when a record was removed.
    fn delete(&self, id: &str) -> RepoResult<bool>;
    /// Moves every matching record to `new_status`; returns exactly the changed records.
    fn bulk_set_status(
        &self,
        filter: &StatusFilter,
        new_status: AnnotationStatus,
    ) -> RepoResult<Vec<Annotation>>;
    fn set_status(&self, id: &str, status: AnnotationStatus) -> RepoResult<Option<Annotation>>;
    fn set_visibility(
        &self,
        id: &str,
        visibility: AnnotationVisibility,
    ) -> RepoResult<Option<Annotation>>;
}

/// SQLite-backed annotation repository.
pub struct SqliteAnnotationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnnotationRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, "annotations", REQUIRED_ANNOTATION_COLUMNS)?;
        Ok(Self { conn })
    }

    fn query_annotations(&self, where_sql: &str, binds: Vec<Value>) -> RepoResult<Vec<Annotation>> {
        query_annotations(self.conn, where_sql, binds)
    }
}

impl AnnotationRepository for SqliteAnnotationRepository<'_> {
    fn annotations_for_set(&self, set_id: &str) -> RepoResult<Vec<Annotation>> {
        self.query_annotations("WHERE set_id = ?", vec![Value::Text(set_id.to_string())])
    }

    fn annotations_for_user_in_set(
        &self,
        user_id: &str,
        set_id: &str,
    ) -> RepoResult<Vec<Annotation>> {
        self.query_annotations(
            "WHERE set_id = ? AND user_id = ?",
            vec![
                Value::Text(set_id.to_string()),
                Value::Text(user_id.to_string()),
            ],
        )
    }

    fn annotation_by_user_and_object(
        &self,
        user_id: &str,
        set_id: &str,
        object_id: &str,
    ) -> RepoResult<Option<Annotation>> {
        find_by_owner_target(self.conn, user_id, set_id, object_id)
    }

    fn annotation_by_id(&self, id: &str) -> RepoResult<Option<Annotation>> {
        match parse_annotation_id(id) {
            Some(annotation_id) => find_by_id(self.conn, annotation_id),
            None => Ok(None),
        }
    }

    fn save(&self, patch: &AnnotationPatch) -> RepoResult<Annotation> {
        let tx = self.conn.unchecked_transaction()?;

        let by_id = match patch.id.as_deref().and_then(parse_annotation_id) {
            Some(annotation_id) => find_by_id(&tx, annotation_id)?,
            None => None,
        };
        let existing = match by_id {
            Some(found) => Some(found),
            None => match patch.owner_target() {
                Some((user_id, set_id, object_id)) => {
                    find_by_owner_target(&tx, user_id, set_id, object_id)?
                }
                None => None,
            },
        };

        let saved_id = match existing {
            Some(current) => {
                let merged = patch.merge_into(current);
                merged.validate()?;
                tx.execute(
                    "UPDATE annotations
                     SET
                        set_id = ?2,
                        object_id = ?3,
                        user_id = ?4,
                        text = ?5,
                        status = ?6,
                        visibility = ?7,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE uuid = ?1;",
                    params![
                        merged.id.to_string(),
                        merged.set_id,
                        merged.object_id,
                        merged.user_id,
                        merged.text,
                        merged.status.as_str(),
                        merged.visibility.as_str(),
                    ],
                )?;
                debug!("event=annotation_update module=repo status=ok annotation_id={}", merged.id);
                merged.id
            }
            None => {
                let (user_id, set_id, object_id) = patch
                    .owner_target()
                    .ok_or(RepoError::MissingField(missing_target_field(patch)))?;
                let fresh = Annotation {
                    id: Uuid::new_v4(),
                    set_id: set_id.to_string(),
                    object_id: object_id.to_string(),
                    user_id: user_id.to_string(),
                    text: patch.text.clone().unwrap_or_default(),
                    status: patch.status.unwrap_or(AnnotationStatus::Draft),
                    visibility: patch.visibility.unwrap_or(AnnotationVisibility::Private),
                    created_at: 0,
                    updated_at: 0,
                };
                fresh.validate()?;
                tx.execute(
                    "INSERT INTO annotations (
                        uuid,
                        set_id,
                        object_id,
                        user_id,
                        text,
                        status,
                        visibility
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                    params![
                        fresh.id.to_string(),
                        fresh.set_id,
                        fresh.object_id,
                        fresh.user_id,
                        fresh.text,
                        fresh.status.as_str(),
                        fresh.visibility.as_str(),
                    ],
                )?;
                debug!("event=annotation_insert module=repo status=ok annotation_id={}", fresh.id);
                fresh.id
            }
        };

        let saved = find_by_id(&tx, saved_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("annotation {saved_id} missing after save"))
        })?;
        tx.commit()?;
        Ok(saved)
    }

    fn delete(&self, id: &str) -> RepoResult<bool> {
        let Some(annotation_id) = parse_annotation_id(id) else {
            return Ok(false);
        };
        let changed = self.conn.execute(
            "DELETE FROM annotations WHERE uuid = ?1;",
            [annotation_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn bulk_set_status(
        &self,
        filter: &StatusFilter,
        new_status: AnnotationStatus,
    ) -> RepoResult<Vec<Annotation>> {
        let tx = self.conn.unchecked_transaction()?;

        let mut where_sql = String::from("WHERE status != ?");
        let mut binds = vec![Value::Text(new_status.as_str().to_string())];
        if let Some(user_id) = &filter.user_id {
            where_sql.push_str(" AND user_id = ?");
            binds.push(Value::Text(user_id.clone()));
        }
        if let Some(set_id) = &filter.set_id {
            where_sql.push_str(" AND set_id = ?");
            binds.push(Value::Text(set_id.clone()));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            binds.push(Value::Text(status.as_str().to_string()));
        }

        let matched = query_annotations(&tx, &where_sql, binds)?;
        let mut changed = Vec::with_capacity(matched.len());
        for annotation in matched {
            tx.execute(
                "UPDATE annotations
                 SET
                    status = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![annotation.id.to_string(), new_status.as_str()],
            )?;
            let updated = find_by_id(&tx, annotation.id)?.ok_or_else(|| {
                RepoError::InvalidData(format!("annotation {} missing after update", annotation.id))
            })?;
            changed.push(updated);
        }

        tx.commit()?;
        Ok(changed)
    }

    fn set_status(&self, id: &str, status: AnnotationStatus) -> RepoResult<Option<Annotation>> {
        update_single_column(self.conn, id, "status", status.as_str())
    }

    fn set_visibility(
        &self,
        id: &str,
        visibility: AnnotationVisibility,
    ) -> RepoResult<Option<Annotation>> {
        update_single_column(self.conn, id, "visibility", visibility.as_str())
    }
}

fn update_single_column(
    conn: &Connection,
    id: &str,
    column: &'static str,
    value: &str,
) -> RepoResult<Option<Annotation>> {
    let Some(annotation_id) = parse_annotation_id(id) else {
        return Ok(None);
    };
    let changed = conn.execute(
        &format!(
            "UPDATE annotations
             SET
                {column} = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;"
        ),
        params![annotation_id.to_string(), value],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    find_by_id(conn, annotation_id)
}

fn query_annotations(
    conn: &Connection,
    where_sql: &str,
    binds: Vec<Value>,
) -> RepoResult<Vec<Annotation>> {
    let sql = format!("{ANNOTATION_SELECT_SQL} {where_sql}{ANNOTATION_ORDER_SQL};");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut annotations = Vec::new();
    while let Some(row) = rows.next()? {
        annotations.push(parse_annotation_row(row)?);
    }
    Ok(annotations)
}

fn find_by_id(conn: &Connection, id: AnnotationId) -> RepoResult<Option<Annotation>> {
    let mut stmt = conn.prepare(&format!("{ANNOTATION_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_annotation_row(row)?)),
        None => Ok(None),
    }
}

fn find_by_owner_target(
    conn: &Connection,
    user_id: &str,
    set_id: &str,
    object_id: &str,
) -> RepoResult<Option<Annotation>> {
    let uuid_text: Option<String> = conn
        .query_row(
            "SELECT uuid FROM annotations
             WHERE user_id = ?1 AND set_id = ?2 AND object_id = ?3;",
            params![user_id, set_id, object_id],
            |row| row.get(0),
        )
        .optional()?;
    match uuid_text {
        Some(value) => find_by_id(conn, parse_uuid(&value)?),
        None => Ok(None),
    }
}

fn missing_target_field(patch: &AnnotationPatch) -> &'static str {
    if patch.set_id.is_none() {
        "set_id"
    } else if patch.object_id.is_none() {
        "object_id"
    } else {
        "user_id"
    }
}

fn parse_annotation_row(row: &Row<'_>) -> RepoResult<Annotation> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text)?;

    let status_text: String = row.get("status")?;
    let status = AnnotationStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in annotations.status"))
    })?;

    let visibility_text: String = row.get("visibility")?;
    let visibility = AnnotationVisibility::parse(&visibility_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid visibility `{visibility_text}` in annotations.visibility"
        ))
    })?;

    Ok(Annotation {
        id,
        set_id: row.get("set_id")?,
        object_id: row.get("object_id")?,
        user_id: row.get("user_id")?,
        text: row.get("text")?,
        status,
        visibility,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str) -> RepoResult<AnnotationId> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in annotations.uuid"))
    })
}

/// Rejects connections that skipped migrations or lack the expected table shape.
pub(crate) fn ensure_schema_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let actual_version = current_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }
    for &column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
