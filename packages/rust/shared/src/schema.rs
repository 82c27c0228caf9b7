//! Schema collaborator interface.
//!
//! The concrete record schema is owned by the surrounding system; the
//! builder only needs, per type: the legal field names, which are required,
//! and any defaults. [`InMemorySchema`] is the standard implementation used
//! by callers and tests alike.

use std::collections::HashMap;

use crate::types::FieldValue;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// One legal field on a type.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Whether construction fails when the field is absent and has no
    /// default.
    pub required: bool,
    /// Value applied when the caller supplies nothing.
    pub default: Option<FieldValue>,
}

impl FieldSpec {
    /// A required field with no default.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
        }
    }

    /// An optional field with no default.
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
        }
    }

    /// An optional field pre-filled with a default value.
    pub fn with_default(name: impl Into<String>, default: FieldValue) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: Some(default),
        }
    }
}

/// The declared shape of one entity type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Type name; doubles as the registry key component and path-grammar
    /// type token.
    pub name: String,
    /// Legal fields in declaration order.
    pub fields: Vec<FieldSpec>,
}

impl TypeDescriptor {
    /// Build a descriptor from a field list.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Look up a field spec by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the type declares the given field.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Whether the type declares a registry `name` field.
    pub fn declares_name(&self) -> bool {
        self.has_field("name")
    }
}

// ---------------------------------------------------------------------------
// Schema trait
// ---------------------------------------------------------------------------

/// Per-type shape lookup, supplied by the surrounding system.
pub trait Schema {
    /// The descriptor for a type name, or `None` for unknown types.
    fn type_descriptor(&self, type_name: &str) -> Option<&TypeDescriptor>;
}

/// Map-backed schema; the standard implementation.
#[derive(Debug, Default, Clone)]
pub struct InMemorySchema {
    types: HashMap<String, TypeDescriptor>,
}

impl InMemorySchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type descriptor, replacing any previous one of the same
    /// name.
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Builder-style registration for test and setup code.
    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }
}

impl Schema for InMemorySchema {
    fn type_descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }
}

// ---------------------------------------------------------------------------
// TypeKey
// ---------------------------------------------------------------------------

/// Anything usable as the type component of a registry key.
///
/// Lookups accept either a type's name string or its descriptor; both
/// resolve identically.
pub trait TypeKey {
    /// The type tag string.
    fn type_tag(&self) -> &str;
}

impl TypeKey for str {
    fn type_tag(&self) -> &str {
        self
    }
}

impl TypeKey for &str {
    fn type_tag(&self) -> &str {
        self
    }
}

impl TypeKey for String {
    fn type_tag(&self) -> &str {
        self.as_str()
    }
}

impl TypeKey for TypeDescriptor {
    fn type_tag(&self) -> &str {
        &self.name
    }
}
