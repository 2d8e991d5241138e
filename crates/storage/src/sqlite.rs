use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use flexdata_core::{
    Clock, Collection, CollectionId, DataBag, FieldDef, FieldId, FieldKey, FieldPatch, FieldType,
    Project, ProjectId, Row, RowId, RowPatch, SortKey, Timestamp,
};

use crate::error::StorageError;
use crate::traits::{Catalog, RemoteStore};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn to_timestamp(v: Vec<u8>, label: &str) -> Result<Timestamp, StorageError> {
    Ok(Timestamp::from_bytes(&to_array::<12>(v, label)?))
}

fn constraint_or_sqlite(e: rusqlite::Error, context: impl FnOnce() -> String) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(context())
        }
        other => StorageError::Sqlite(other),
    }
}

fn non_blank<'a>(name: &'a str, what: &str) -> Result<&'a str, StorageError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StorageError::ConstraintViolation(format!(
            "{what} name must not be blank"
        )));
    }
    Ok(trimmed)
}

/// SQLite-backed store. Assigns ids and creation timestamps on create.
pub struct SqliteStorage {
    conn: Connection,
    clock: Clock,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            clock: Clock::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            clock: Clock::new(),
        })
    }

    fn project_from_raw(
        (id, name, description, created_at): (Vec<u8>, String, Option<String>, Vec<u8>),
    ) -> Result<Project, StorageError> {
        Ok(Project {
            id: ProjectId::from_bytes(to_array::<16>(id, "project id")?),
            name,
            description,
            created_at: to_timestamp(created_at, "created_at")?,
        })
    }

    fn collection_from_raw(
        (id, project_id, name, created_at): (Vec<u8>, Vec<u8>, String, Vec<u8>),
    ) -> Result<Collection, StorageError> {
        Ok(Collection {
            id: CollectionId::from_bytes(to_array::<16>(id, "collection id")?),
            project_id: ProjectId::from_bytes(to_array::<16>(project_id, "project id")?),
            name,
            created_at: to_timestamp(created_at, "created_at")?,
        })
    }

    fn query_collections(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Collection>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(Self::collection_from_raw(row?)?);
        }
        Ok(result)
    }
}

type RawRow = (Vec<u8>, Vec<u8>, String, f64, Vec<u8>, Vec<u8>);

fn row_from_raw(
    (id, collection_id, data, sort_order, created_at, updated_at): RawRow,
) -> Result<Row, StorageError> {
    Ok(Row {
        id: RowId::from_bytes(to_array::<16>(id, "row id")?),
        collection_id: CollectionId::from_bytes(to_array::<16>(collection_id, "collection id")?),
        data: DataBag::from_json_str(&data)?,
        sort_key: SortKey::new(sort_order),
        created_at: to_timestamp(created_at, "created_at")?,
        updated_at: to_timestamp(updated_at, "updated_at")?,
    })
}

type RawField = (Vec<u8>, Vec<u8>, String, String, String, bool, f64, Vec<u8>);

fn field_from_raw(
    (id, collection_id, name, field_type, label, required, sort_order, created_at): RawField,
) -> Result<FieldDef, StorageError> {
    Ok(FieldDef {
        id: FieldId::from_bytes(to_array::<16>(id, "field id")?),
        collection_id: CollectionId::from_bytes(to_array::<16>(collection_id, "collection id")?),
        key: FieldKey::new(name),
        field_type: FieldType::parse(&field_type)?,
        label,
        required,
        sort_key: SortKey::new(sort_order),
        created_at: to_timestamp(created_at, "created_at")?,
    })
}

// ============================================================================
// Catalog
// ============================================================================

impl Catalog for SqliteStorage {
    fn create_project(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project, StorageError> {
        let name = non_blank(name, "project")?;
        let project = Project {
            id: ProjectId::new(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: self.clock.tick()?,
        };
        self.conn.execute(
            "INSERT INTO projects (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                project.id.as_bytes().as_slice(),
                project.name,
                project.description,
                &project.created_at.to_bytes()[..],
            ],
        )?;
        debug!(project_id = %project.id, "created project");
        Ok(project)
    }

    fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, created_at FROM projects ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(Self::project_from_raw(row?)?);
        }
        Ok(result)
    }

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StorageError> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, name, description, created_at FROM projects WHERE id = ?1",
                rusqlite::params![id.as_bytes().as_slice()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        raw.map(Self::project_from_raw).transpose()
    }

    fn rename_project(&mut self, id: ProjectId, name: &str) -> Result<(), StorageError> {
        let name = non_blank(name, "project")?;
        let changed = self.conn.execute(
            "UPDATE projects SET name = ?1 WHERE id = ?2",
            rusqlite::params![name, id.as_bytes().as_slice()],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("project {id}")));
        }
        Ok(())
    }

    fn create_collection(
        &mut self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Collection, StorageError> {
        let name = non_blank(name, "collection")?;
        let collection = Collection {
            id: CollectionId::new(),
            project_id,
            name: name.to_string(),
            created_at: self.clock.tick()?,
        };
        self.conn
            .execute(
                "INSERT INTO collections (id, project_id, name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    collection.id.as_bytes().as_slice(),
                    project_id.as_bytes().as_slice(),
                    collection.name,
                    &collection.created_at.to_bytes()[..],
                ],
            )
            .map_err(|e| constraint_or_sqlite(e, || format!("unknown project {project_id}")))?;
        debug!(collection_id = %collection.id, %project_id, "created collection");
        Ok(collection)
    }

    fn list_collections(&self, project_id: ProjectId) -> Result<Vec<Collection>, StorageError> {
        self.query_collections(
            "SELECT id, project_id, name, created_at FROM collections
             WHERE project_id = ?1 ORDER BY created_at",
            rusqlite::params![project_id.as_bytes().as_slice()],
        )
    }

    fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, StorageError> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, project_id, name, created_at FROM collections WHERE id = ?1",
                rusqlite::params![id.as_bytes().as_slice()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        raw.map(Self::collection_from_raw).transpose()
    }

    fn find_collection_by_name(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Option<Collection>, StorageError> {
        let found = self.query_collections(
            "SELECT id, project_id, name, created_at FROM collections
             WHERE project_id = ?1 AND name = ?2 ORDER BY created_at LIMIT 1",
            rusqlite::params![project_id.as_bytes().as_slice(), name],
        )?;
        Ok(found.into_iter().next())
    }

    fn rename_collection(&mut self, id: CollectionId, name: &str) -> Result<(), StorageError> {
        let name = non_blank(name, "collection")?;
        let changed = self.conn.execute(
            "UPDATE collections SET name = ?1 WHERE id = ?2",
            rusqlite::params![name, id.as_bytes().as_slice()],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("collection {id}")));
        }
        Ok(())
    }

    fn delete_collection(&mut self, id: CollectionId) -> Result<(), StorageError> {
        let removed = self.conn.execute(
            "DELETE FROM collections WHERE id = ?1",
            rusqlite::params![id.as_bytes().as_slice()],
        )?;
        debug!(collection_id = %id, removed, "deleted collection");
        Ok(())
    }

    fn row_data(&self, collection_id: CollectionId) -> Result<Vec<DataBag>, StorageError> {
        let rows = RemoteStore::<Row>::fetch_ordered(self, collection_id)?;
        Ok(rows.into_iter().map(|row| row.data).collect())
    }
}

// ============================================================================
// Rows
// ============================================================================

impl RemoteStore<Row> for SqliteStorage {
    fn fetch_ordered(&self, scope: CollectionId) -> Result<Vec<Row>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, collection_id, data, sort_order, created_at, updated_at FROM rows
             WHERE collection_id = ?1 ORDER BY sort_order, created_at",
        )?;
        let rows = stmt.query_map(rusqlite::params![scope.as_bytes().as_slice()], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row_from_raw(row?)?);
        }
        Ok(result)
    }

    fn create_item(&mut self, draft: &Row) -> Result<Row, StorageError> {
        let now = self.clock.tick()?;
        let row = Row {
            id: RowId::new(),
            created_at: now,
            updated_at: now,
            ..draft.clone()
        };
        let data = row.data.to_json_string()?;
        self.conn
            .execute(
                "INSERT INTO rows (id, collection_id, data, sort_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    row.id.as_bytes().as_slice(),
                    row.collection_id.as_bytes().as_slice(),
                    data,
                    row.sort_key.value(),
                    &now.to_bytes()[..],
                    &now.to_bytes()[..],
                ],
            )
            .map_err(|e| {
                constraint_or_sqlite(e, || format!("unknown collection {}", draft.collection_id))
            })?;
        debug!(row_id = %row.id, sort_key = %row.sort_key, "created row");
        Ok(row)
    }

    fn update_item(&mut self, id: RowId, patch: &RowPatch) -> Result<(), StorageError> {
        let now = self.clock.tick()?;
        let changed = match patch {
            RowPatch::Reorder(key) => self.conn.execute(
                "UPDATE rows SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![key.value(), &now.to_bytes()[..], id.as_bytes().as_slice()],
            )?,
            RowPatch::Data(bag) => self.conn.execute(
                "UPDATE rows SET data = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![
                    bag.to_json_string()?,
                    &now.to_bytes()[..],
                    id.as_bytes().as_slice()
                ],
            )?,
        };
        if changed == 0 {
            return Err(StorageError::NotFound(format!("row {id}")));
        }
        debug!(row_id = %id, ?patch, "updated row");
        Ok(())
    }

    fn delete_item(&mut self, id: RowId) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM rows WHERE id = ?1",
            rusqlite::params![id.as_bytes().as_slice()],
        )?;
        debug!(row_id = %id, "deleted row");
        Ok(())
    }
}

// ============================================================================
// Fields
// ============================================================================

impl RemoteStore<FieldDef> for SqliteStorage {
    fn fetch_ordered(&self, scope: CollectionId) -> Result<Vec<FieldDef>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, collection_id, name, type, label, required, sort_order, created_at
             FROM fields WHERE collection_id = ?1 ORDER BY sort_order, created_at",
        )?;
        let rows = stmt.query_map(rusqlite::params![scope.as_bytes().as_slice()], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(field_from_raw(row?)?);
        }
        Ok(result)
    }

    fn create_item(&mut self, draft: &FieldDef) -> Result<FieldDef, StorageError> {
        let field = FieldDef {
            id: FieldId::new(),
            created_at: self.clock.tick()?,
            ..draft.clone()
        };
        self.conn
            .execute(
                "INSERT INTO fields
                 (id, collection_id, name, type, label, required, sort_order, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    field.id.as_bytes().as_slice(),
                    field.collection_id.as_bytes().as_slice(),
                    field.key.as_str(),
                    field.field_type.as_str(),
                    field.label,
                    field.required,
                    field.sort_key.value(),
                    &field.created_at.to_bytes()[..],
                ],
            )
            .map_err(|e| {
                constraint_or_sqlite(e, || {
                    format!(
                        "field key {} rejected in collection {}",
                        draft.key, draft.collection_id
                    )
                })
            })?;
        debug!(field_id = %field.id, key = %field.key, "created field");
        Ok(field)
    }

    fn update_item(&mut self, id: FieldId, patch: &FieldPatch) -> Result<(), StorageError> {
        let changed = match patch {
            FieldPatch::Reorder(key) => self.conn.execute(
                "UPDATE fields SET sort_order = ?1 WHERE id = ?2",
                rusqlite::params![key.value(), id.as_bytes().as_slice()],
            )?,
            FieldPatch::Definition(def) => self.conn.execute(
                "UPDATE fields SET label = ?1, type = ?2, required = ?3 WHERE id = ?4",
                rusqlite::params![
                    def.label,
                    def.field_type.as_str(),
                    def.required,
                    id.as_bytes().as_slice()
                ],
            )?,
        };
        if changed == 0 {
            return Err(StorageError::NotFound(format!("field {id}")));
        }
        debug!(field_id = %id, ?patch, "updated field");
        Ok(())
    }

    fn delete_item(&mut self, id: FieldId) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM fields WHERE id = ?1",
            rusqlite::params![id.as_bytes().as_slice()],
        )?;
        debug!(field_id = %id, "deleted field");
        Ok(())
    }
}
