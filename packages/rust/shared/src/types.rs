//! Core domain types for the protocol document graph.
//!
//! Entities are dynamic [`Record`]s owned by a per-pass [`EntityStore`]
//! arena. Everything else in the system (registry, builder, outline
//! assembler) holds [`EntityRef`] handles into that arena, never the
//! records themselves.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Globally unique entity identifier.
///
/// Builder-assigned ids are either sequential (`"NarrativeContent_4"`) or
/// UUID v7 strings depending on configuration; callers may also supply
/// their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// EntityRef
// ---------------------------------------------------------------------------

/// Copyable handle to a record inside an [`EntityStore`].
///
/// Only valid for the store (and build pass) it was issued by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(pub usize);

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A single attribute value on a [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Plain text value.
    Str(String),
    /// Reference to another entity by id (ordering attributes).
    Id(EntityId),
    /// Ordered list of entity ids (e.g. `childIds`).
    IdList(Vec<EntityId>),
    /// An owned child entity (navigable by path expressions).
    Entity(EntityRef),
    /// An ordered list of owned child entities.
    EntityList(Vec<EntityRef>),
}

impl FieldValue {
    /// Human-readable kind, used in diagnostics and path errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Str(_) => "string",
            FieldValue::Id(_) => "id",
            FieldValue::IdList(_) => "id list",
            FieldValue::Entity(_) => "entity",
            FieldValue::EntityList(_) => "entity list",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A typed, identity-bearing entity record.
///
/// The concrete field shape is dictated by the schema collaborator; the
/// record itself only knows its declared type tag, its id, and an
/// insertion-ordered attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    type_tag: String,
    id: EntityId,
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record of the given type with the given id.
    pub fn new(type_tag: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            type_tag: type_tag.into(),
            id: id.into(),
            fields: IndexMap::new(),
        }
    }

    /// Declared type name (the registry key component).
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Globally unique id.
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// The registry name, if this record carries a `name` field.
    pub fn name(&self) -> Option<&str> {
        match self.fields.get("name") {
            Some(FieldValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Read an attribute value.
    pub fn get(&self, attribute: &str) -> Option<&FieldValue> {
        self.fields.get(attribute)
    }

    /// Set an attribute value, replacing any previous one.
    pub fn set(&mut self, attribute: impl Into<String>, value: FieldValue) {
        self.fields.insert(attribute.into(), value);
    }

    /// Remove an attribute; a no-op when absent.
    pub fn remove(&mut self, attribute: &str) {
        self.fields.shift_remove(attribute);
    }

    /// Append an id to a list-valued attribute, creating the list on first
    /// use.
    pub fn push_id(&mut self, attribute: &str, id: EntityId) {
        match self.fields.get_mut(attribute) {
            Some(FieldValue::IdList(ids)) => ids.push(id),
            _ => {
                self.fields
                    .insert(attribute.to_string(), FieldValue::IdList(vec![id]));
            }
        }
    }

    /// Iterate attributes in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// EntityStore
// ---------------------------------------------------------------------------

/// Arena owning every record of one build pass.
///
/// One store per pass; handles from a cleared or discarded store must not
/// be reused.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EntityStore {
    records: Vec<Record>,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The handle the next [`insert`](Self::insert) will return.
    pub fn next_ref(&self) -> EntityRef {
        EntityRef(self.records.len())
    }

    /// Take ownership of a record, returning its handle.
    pub fn insert(&mut self, record: Record) -> EntityRef {
        let entity = EntityRef(self.records.len());
        self.records.push(record);
        entity
    }

    /// Look up a record by handle.
    pub fn get(&self, entity: EntityRef) -> Option<&Record> {
        self.records.get(entity.0)
    }

    /// Look up a record mutably by handle.
    pub fn get_mut(&mut self, entity: EntityRef) -> Option<&mut Record> {
        self.records.get_mut(entity.0)
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record. Outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Iterate all records with their handles, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityRef, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (EntityRef(i), r))
    }
}
