use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::data_bag::DataBag;
use crate::field_value::FieldType;
use crate::ids::*;
use crate::sort_key::SortKey;

const FIELD_KEY_PREFIX: &str = "fld_";
const FIELD_KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const FIELD_KEY_LEN: usize = 8;

/// Stable internal key of a field. The only way to address a value in a
/// row's data bag; never derived from the label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Fresh opaque key: `fld_` followed by 8 random lowercase alphanumerics.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..FIELD_KEY_LEN)
            .map(|_| FIELD_KEY_ALPHABET[rng.gen_range(0..FIELD_KEY_ALPHABET.len())] as char)
            .collect();
        Self(format!("{FIELD_KEY_PREFIX}{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub project_id: ProjectId,
    pub name: String,
    pub created_at: Timestamp,
}

/// The mutable part of a field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: FieldId,
    pub collection_id: CollectionId,
    #[serde(rename = "name")]
    pub key: FieldKey,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    #[serde(rename = "sort_order")]
    pub sort_key: SortKey,
    pub created_at: Timestamp,
}

impl FieldDef {
    /// Label for display, falling back to the internal key when unlabeled.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            self.key.as_str()
        } else {
            &self.label
        }
    }

    pub fn apply_definition(&mut self, def: &FieldDefinition) {
        self.label = def.label.clone();
        self.field_type = def.field_type;
        self.required = def.required;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldPatch {
    Reorder(SortKey),
    Definition(FieldDefinition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub collection_id: CollectionId,
    pub data: DataBag,
    #[serde(rename = "sort_order")]
    pub sort_key: SortKey,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Row updates. `Data` always carries the whole bag: the store replaces the
/// structured column wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowPatch {
    Reorder(SortKey),
    Data(DataBag),
}

/// An item kept in a user-ordered list within one collection.
pub trait OrderedRecord: Clone + fmt::Debug {
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display;
    type Patch: Clone + fmt::Debug;

    fn id(&self) -> Self::Id;

    fn sort_key(&self) -> SortKey;

    fn set_sort_key(&mut self, key: SortKey);

    fn created_at(&self) -> Timestamp;

    /// Take over the identity the store assigned on create.
    fn adopt_identity(&mut self, confirmed: &Self);

    fn reorder_patch(key: SortKey) -> Self::Patch;

    /// Ascending key, ties broken by creation time.
    fn display_order(a: &Self, b: &Self) -> Ordering {
        a.sort_key()
            .cmp(&b.sort_key())
            .then(a.created_at().cmp(&b.created_at()))
    }
}

impl OrderedRecord for Row {
    type Id = RowId;
    type Patch = RowPatch;

    fn id(&self) -> RowId {
        self.id
    }

    fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn adopt_identity(&mut self, confirmed: &Self) {
        self.id = confirmed.id;
        self.created_at = confirmed.created_at;
        self.updated_at = confirmed.updated_at;
    }

    fn reorder_patch(key: SortKey) -> RowPatch {
        RowPatch::Reorder(key)
    }
}

impl OrderedRecord for FieldDef {
    type Id = FieldId;
    type Patch = FieldPatch;

    fn id(&self) -> FieldId {
        self.id
    }

    fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn adopt_identity(&mut self, confirmed: &Self) {
        self.id = confirmed.id;
        self.created_at = confirmed.created_at;
    }

    fn reorder_patch(key: SortKey) -> FieldPatch {
        FieldPatch::Reorder(key)
    }
}
