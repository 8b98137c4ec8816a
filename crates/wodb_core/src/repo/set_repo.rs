//! Set catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read immutable set/object reference content.
//! - Upsert sets for seeding; end users never write here.
//!
//! # Invariants
//! - Objects are returned in their stored `position` order.
//! - `upsert_set` replaces a set's objects in one transaction.

use crate::model::wodb_set::{ObjectType, WodbObject, WodbSet};
use crate::repo::annotation_repo::{ensure_schema_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for the read-only set catalog.
pub trait SetRepository {
    /// All sets ordered by id.
    fn list_sets(&self) -> RepoResult<Vec<WodbSet>>;
    fn get_set(&self, set_id: &str) -> RepoResult<Option<WodbSet>>;
    /// Inserts or fully replaces one set. Callers validate shape first.
    fn upsert_set(&self, set: &WodbSet) -> RepoResult<()>;
}

/// SQLite-backed set catalog.
pub struct SqliteSetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSetRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, "wodb_sets", &["id", "title", "description"])?;
        ensure_schema_ready(
            conn,
            "wodb_objects",
            &["set_id", "position", "object_id", "type", "value"],
        )?;
        Ok(Self { conn })
    }
}

impl SetRepository for SqliteSetRepository<'_> {
    fn list_sets(&self) -> RepoResult<Vec<WodbSet>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, description FROM wodb_sets ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut sets = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let objects = load_objects(self.conn, &id)?;
            sets.push(WodbSet {
                id,
                title: row.get("title")?,
                description: row.get("description")?,
                objects,
            });
        }
        Ok(sets)
    }

    fn get_set(&self, set_id: &str) -> RepoResult<Option<WodbSet>> {
        let header: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT title, description FROM wodb_sets WHERE id = ?1;",
                [set_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match header {
            Some((title, description)) => Ok(Some(WodbSet {
                id: set_id.to_string(),
                title,
                description,
                objects: load_objects(self.conn, set_id)?,
            })),
            None => Ok(None),
        }
    }

    fn upsert_set(&self, set: &WodbSet) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO wodb_sets (id, title, description)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description;",
            params![set.id, set.title, set.description],
        )?;
        tx.execute("DELETE FROM wodb_objects WHERE set_id = ?1;", [set.id.as_str()])?;
        for (position, object) in set.objects.iter().enumerate() {
            tx.execute(
                "INSERT INTO wodb_objects (set_id, position, object_id, type, value)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    set.id,
                    position as i64,
                    object.id,
                    object.kind.as_str(),
                    object.value,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn load_objects(conn: &Connection, set_id: &str) -> RepoResult<Vec<WodbObject>> {
    let mut stmt = conn.prepare(
        "SELECT object_id, type, value
         FROM wodb_objects
         WHERE set_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([set_id])?;
    let mut objects = Vec::new();
    while let Some(row) = rows.next()? {
        let type_text: String = row.get("type")?;
        let kind = ObjectType::parse(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid object type `{type_text}` in wodb_objects.type"
            ))
        })?;
        objects.push(WodbObject {
            id: row.get("object_id")?,
            kind,
            value: row.get("value")?,
        });
    }
    Ok(objects)
}
