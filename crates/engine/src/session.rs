use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use flexdata_core::clock::physical_now;
use flexdata_core::{
    Collection, CollectionId, DataBag, FieldDef, FieldDefinition, FieldId, FieldKey, FieldType,
    Project, Row, RowId, SortKey, Timestamp,
};
use flexdata_storage::{Catalog, RemoteStore};

use crate::error::{EngineError, ValidationError};
use crate::mapper::{Cell, render_record, validate_for_create};
use crate::ordered::OrderedList;
use crate::sync::{SyncReport, dispatch};

fn require_name<'a>(name: &'a str, what: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName(what));
    }
    Ok(trimmed)
}

fn local_timestamp() -> Result<Timestamp, EngineError> {
    Ok(Timestamp::new(physical_now()?, 0))
}

// ============================================================================
// Project session
// ============================================================================

/// A project's collection list and the current selection.
#[derive(Debug)]
pub struct ProjectSession {
    project: Project,
    collections: Vec<Collection>,
    selected: Option<CollectionId>,
}

impl ProjectSession {
    /// Load the collection list and select the first collection. Read
    /// failures leave the list empty.
    pub fn open<S: Catalog + ?Sized>(store: &S, project: Project) -> Self {
        let mut session = Self {
            project,
            collections: Vec::new(),
            selected: None,
        };
        session.reload(store);
        session
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn selected(&self) -> Option<&Collection> {
        let id = self.selected?;
        self.collections.iter().find(|c| c.id == id)
    }

    pub fn reload<S: Catalog + ?Sized>(&mut self, store: &S) {
        self.collections = store.list_collections(self.project.id).unwrap_or_else(|err| {
            warn!(project_id = %self.project.id, error = %err, "failed to load collections");
            Vec::new()
        });
        let keep = self.selected.filter(|id| self.collections.iter().any(|c| c.id == *id));
        self.selected = keep.or_else(|| self.collections.first().map(|c| c.id));
    }

    /// Select `id`, or the first collection when `id` is unknown.
    pub fn select(&mut self, id: CollectionId) -> Option<&Collection> {
        self.selected = if self.collections.iter().any(|c| c.id == id) {
            Some(id)
        } else {
            self.collections.first().map(|c| c.id)
        };
        self.selected()
    }

    /// Returns false when the name is unchanged and nothing was sent.
    pub fn rename_project<S: Catalog + ?Sized>(
        &mut self,
        store: &mut S,
        name: &str,
    ) -> Result<bool, EngineError> {
        let name = require_name(name, "project")?;
        if name == self.project.name {
            return Ok(false);
        }
        store.rename_project(self.project.id, name)?;
        self.project.name = name.to_string();
        Ok(true)
    }

    /// Create a collection and select it.
    pub fn create_collection<S: Catalog + ?Sized>(
        &mut self,
        store: &mut S,
        name: &str,
    ) -> Result<&Collection, EngineError> {
        let name = require_name(name, "collection")?;
        let collection = store.create_collection(self.project.id, name)?;
        info!(collection_id = %collection.id, name, "created collection");
        self.selected = Some(collection.id);
        self.collections.push(collection);
        self.selected().ok_or(EngineError::NoCollectionSelected)
    }

    pub fn rename_collection<S: Catalog + ?Sized>(
        &mut self,
        store: &mut S,
        id: CollectionId,
        name: &str,
    ) -> Result<(), EngineError> {
        let name = require_name(name, "collection")?;
        store.rename_collection(id, name)?;
        if let Some(collection) = self.collections.iter_mut().find(|c| c.id == id) {
            collection.name = name.to_string();
        }
        Ok(())
    }

    /// Delete a collection with all its fields and rows. `confirmation`
    /// must repeat the collection's name exactly.
    pub fn delete_collection<S: Catalog + ?Sized>(
        &mut self,
        store: &mut S,
        id: CollectionId,
        confirmation: &str,
    ) -> Result<(), EngineError> {
        let collection = self
            .collections
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
        if confirmation != collection.name {
            return Err(EngineError::ConfirmationMismatch {
                expected: collection.name.clone(),
            });
        }
        store.delete_collection(id)?;
        info!(collection_id = %id, "deleted collection");
        self.collections.retain(|c| c.id != id);
        if self.selected == Some(id) {
            self.selected = self.collections.first().map(|c| c.id);
        }
        Ok(())
    }

    /// Open the selected collection for editing.
    pub fn open_selected<S>(&self, store: &S) -> Result<CollectionSession, EngineError>
    where
        S: RemoteStore<Row> + RemoteStore<FieldDef> + ?Sized,
    {
        let collection = self.selected().ok_or(EngineError::NoCollectionSelected)?;
        Ok(CollectionSession::open(store, collection.clone()))
    }
}

// ============================================================================
// Collection session
// ============================================================================

/// Outcome of syncing both lists of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSyncReport {
    pub fields: SyncReport<FieldId>,
    pub rows: SyncReport<RowId>,
}

impl CollectionSyncReport {
    pub fn is_clean(&self) -> bool {
        self.fields.is_clean() && self.rows.is_clean()
    }
}

/// Field list and row list of one collection, with optimistic editing.
#[derive(Debug)]
pub struct CollectionSession {
    collection: Collection,
    fields: OrderedList<FieldDef>,
    rows: OrderedList<Row>,
    retired_keys: HashSet<FieldKey>,
}

impl CollectionSession {
    pub fn open<S>(store: &S, collection: Collection) -> Self
    where
        S: RemoteStore<Row> + RemoteStore<FieldDef> + ?Sized,
    {
        let mut session = Self {
            collection,
            fields: OrderedList::new(),
            rows: OrderedList::new(),
            retired_keys: HashSet::new(),
        };
        session.reload(store);
        session
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn fields(&self) -> &OrderedList<FieldDef> {
        &self.fields
    }

    pub fn rows(&self) -> &OrderedList<Row> {
        &self.rows
    }

    /// Direct access for drag gestures.
    pub fn fields_mut(&mut self) -> &mut OrderedList<FieldDef> {
        &mut self.fields
    }

    pub fn rows_mut(&mut self) -> &mut OrderedList<Row> {
        &mut self.rows
    }

    /// Refetch both lists. A failed read yields an empty list.
    pub fn reload<S>(&mut self, store: &S)
    where
        S: RemoteStore<Row> + RemoteStore<FieldDef> + ?Sized,
    {
        let id = self.collection.id;
        let fields = RemoteStore::<FieldDef>::fetch_ordered(store, id).unwrap_or_else(|err| {
            warn!(collection_id = %id, error = %err, "failed to load fields");
            Vec::new()
        });
        let rows = RemoteStore::<Row>::fetch_ordered(store, id).unwrap_or_else(|err| {
            warn!(collection_id = %id, error = %err, "failed to load rows");
            Vec::new()
        });
        debug!(collection_id = %id, fields = fields.len(), rows = rows.len(), "loaded collection");
        self.fields.load(fields);
        self.rows.load(rows);
    }

    /// Drain both outboxes, fields first.
    pub fn sync<S>(&mut self, store: &mut S) -> CollectionSyncReport
    where
        S: RemoteStore<Row> + RemoteStore<FieldDef> + ?Sized,
    {
        CollectionSyncReport {
            fields: dispatch(&mut self.fields, store),
            rows: dispatch(&mut self.rows, store),
        }
    }

    // ------------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------------

    /// Validate and optimistically append a row. Returns its provisional id.
    pub fn add_row(&mut self, data: DataBag) -> Result<RowId, EngineError> {
        validate_for_create(self.fields.items(), &data)?;
        let now = local_timestamp()?;
        Ok(self.rows.insert(Row {
            id: RowId::new(),
            collection_id: self.collection.id,
            data,
            sort_key: SortKey::FIRST,
            created_at: now,
            updated_at: now,
        }))
    }

    pub fn patch_cell(
        &mut self,
        id: RowId,
        key: &FieldKey,
        value: Value,
    ) -> Result<(), EngineError> {
        self.rows.patch_item_data(id, key.as_str(), value)
    }

    pub fn move_row(
        &mut self,
        id: RowId,
        target_index: usize,
    ) -> Result<Option<SortKey>, EngineError> {
        self.rows.move_item(id, target_index)
    }

    pub fn remove_row(&mut self, id: RowId) -> Result<Row, EngineError> {
        self.rows.remove(id)
    }

    /// Every row rendered through the current field list.
    pub fn render_rows(&self) -> Vec<Vec<Cell>> {
        self.rows
            .items()
            .iter()
            .map(|row| render_record(self.fields.items(), &row.data))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------------

    /// Append a field with a freshly generated internal key. A key is never
    /// handed out while a field holds it, a loaded row still carries a value
    /// under it, or a field using it was removed during this session.
    pub fn add_field(
        &mut self,
        label: &str,
        field_type: FieldType,
        required: bool,
    ) -> Result<FieldId, EngineError> {
        let label = require_name(label, "field")?;
        let key = fresh_key(|key| self.key_in_use(key), FieldKey::generate);
        Ok(self.fields.insert(FieldDef {
            id: FieldId::new(),
            collection_id: self.collection.id,
            key,
            field_type,
            label: label.to_string(),
            required,
            sort_key: SortKey::FIRST,
            created_at: local_timestamp()?,
        }))
    }

    pub fn update_field(
        &mut self,
        id: FieldId,
        definition: FieldDefinition,
    ) -> Result<(), EngineError> {
        let label = require_name(&definition.label, "field")?.to_string();
        self.fields.update_definition(id, FieldDefinition { label, ..definition })
    }

    pub fn move_field(
        &mut self,
        id: FieldId,
        target_index: usize,
    ) -> Result<Option<SortKey>, EngineError> {
        self.fields.move_item(id, target_index)
    }

    /// Remove a field. Row data under its key is left untouched.
    pub fn remove_field(&mut self, id: FieldId) -> Result<FieldDef, EngineError> {
        let removed = self.fields.remove(id)?;
        self.retired_keys.insert(removed.key.clone());
        Ok(removed)
    }

    fn key_in_use(&self, key: &FieldKey) -> bool {
        self.retired_keys.contains(key)
            || self.fields.items().iter().any(|f| f.key == *key)
            || self.rows.items().iter().any(|r| r.data.contains_key(key.as_str()))
    }
}

fn fresh_key(
    in_use: impl Fn(&FieldKey) -> bool,
    mut generate: impl FnMut() -> FieldKey,
) -> FieldKey {
    loop {
        let key = generate();
        if !in_use(&key) {
            return key;
        }
    }
}
