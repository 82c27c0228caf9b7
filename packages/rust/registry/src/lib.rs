//! Entity registry: identity maps and path resolution.
//!
//! The registry enforces identity uniqueness for one build pass. It holds
//! [`EntityRef`] handles only — records stay owned by the pass's
//! [`EntityStore`] arena. One registry per pass; [`Registry::clear`] is the
//! only lifecycle reset.

use std::collections::HashMap;

use protocolbuilder_shared::{
    DuplicateRegistration, EntityRef, KeyKind, Record, TypeKey,
};

mod path;

/// Identity and path-resolution lookup store.
///
/// Two maps, keyed by (type tag, name) and (type tag, id). A key maps to at
/// most one entity per pass; a colliding `add` is a hard error, never a
/// silent overwrite.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    by_name: HashMap<(String, String), EntityRef>,
    by_id: HashMap<(String, String), EntityRef>,
    auto_register_on_path_miss: bool,
}

impl Registry {
    /// Create an empty registry with auto-registration disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable registration of named entities that path
    /// resolution navigates to but finds missing from the identity maps.
    pub fn with_auto_register(mut self, enabled: bool) -> Self {
        self.auto_register_on_path_miss = enabled;
        self
    }

    /// Whether path-miss auto-registration is enabled.
    pub fn auto_register_on_path_miss(&self) -> bool {
        self.auto_register_on_path_miss
    }

    /// Empty both identity maps. Idempotent.
    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_id.clear();
    }

    /// Register an entity under its name and id.
    ///
    /// Both keys are checked before either map is touched: a collision on
    /// either leaves the registry unchanged and the original registration
    /// retrievable.
    pub fn add(
        &mut self,
        record: &Record,
        entity: EntityRef,
        name: &str,
    ) -> Result<(), DuplicateRegistration> {
        let name_key = (record.type_tag().to_string(), name.to_string());
        let id_key = (
            record.type_tag().to_string(),
            record.id().as_str().to_string(),
        );

        if self.by_name.contains_key(&name_key) {
            return Err(DuplicateRegistration {
                type_tag: record.type_tag().to_string(),
                kind: KeyKind::Name,
                key: name.to_string(),
            });
        }
        if self.by_id.contains_key(&id_key) {
            return Err(DuplicateRegistration {
                type_tag: record.type_tag().to_string(),
                kind: KeyKind::Id,
                key: record.id().as_str().to_string(),
            });
        }

        self.by_name.insert(name_key, entity);
        self.by_id.insert(id_key, entity);
        Ok(())
    }

    /// Look up an entity by (type, name). `None` on a miss, never an error.
    pub fn get_by_name(&self, type_key: &impl TypeKey, name: &str) -> Option<EntityRef> {
        self.by_name
            .get(&(type_key.type_tag().to_string(), name.to_string()))
            .copied()
    }

    /// Look up an entity by (type, id). `None` on a miss, never an error.
    pub fn get_by_id(&self, type_key: &impl TypeKey, id: &str) -> Option<EntityRef> {
        self.by_id
            .get(&(type_key.type_tag().to_string(), id.to_string()))
            .copied()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocolbuilder_shared::{EntityStore, FieldSpec, FieldValue, TypeDescriptor};

    fn make_record(store: &mut EntityStore, type_tag: &str, id: &str, name: &str) -> EntityRef {
        let mut record = Record::new(type_tag, id);
        record.set("name", FieldValue::Str(name.into()));
        store.insert(record)
    }

    #[test]
    fn add_then_round_trip() {
        let mut store = EntityStore::new();
        let mut registry = Registry::new();

        let entity = make_record(&mut store, "Study", "Study_1", "CDISC PILOT");
        registry
            .add(store.get(entity).unwrap(), entity, "CDISC PILOT")
            .unwrap();

        assert_eq!(registry.get_by_name(&"Study", "CDISC PILOT"), Some(entity));
        assert_eq!(registry.get_by_id(&"Study", "Study_1"), Some(entity));

        registry.clear();
        assert_eq!(registry.get_by_name(&"Study", "CDISC PILOT"), None);
        assert_eq!(registry.get_by_id(&"Study", "Study_1"), None);

        // clear is idempotent
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn type_key_accepts_descriptor_or_name() {
        let mut store = EntityStore::new();
        let mut registry = Registry::new();

        let entity = make_record(&mut store, "Study", "Study_1", "CDISC PILOT");
        registry
            .add(store.get(entity).unwrap(), entity, "CDISC PILOT")
            .unwrap();

        let descriptor = TypeDescriptor::new("Study", vec![FieldSpec::required("name")]);
        assert_eq!(
            registry.get_by_name(&descriptor, "CDISC PILOT"),
            registry.get_by_name(&"Study", "CDISC PILOT"),
        );
        assert_eq!(
            registry.get_by_id(&descriptor, "Study_1"),
            registry.get_by_id(&"Study", "Study_1"),
        );
    }

    #[test]
    fn duplicate_name_is_rejected_and_original_kept() {
        let mut store = EntityStore::new();
        let mut registry = Registry::new();

        let first = make_record(&mut store, "Study", "Study_1", "CDISC PILOT");
        registry
            .add(store.get(first).unwrap(), first, "CDISC PILOT")
            .unwrap();

        let second = make_record(&mut store, "Study", "Study_2", "CDISC PILOT");
        let err = registry
            .add(store.get(second).unwrap(), second, "CDISC PILOT")
            .unwrap_err();
        assert_eq!(err.kind, KeyKind::Name);
        assert_eq!(err.type_tag, "Study");
        assert_eq!(err.key, "CDISC PILOT");

        // Original stays retrievable; the failed add left no trace
        assert_eq!(registry.get_by_name(&"Study", "CDISC PILOT"), Some(first));
        assert_eq!(registry.get_by_id(&"Study", "Study_2"), None);
    }

    #[test]
    fn duplicate_id_is_rejected_all_or_nothing() {
        let mut store = EntityStore::new();
        let mut registry = Registry::new();

        let first = make_record(&mut store, "Study", "Study_1", "Alpha");
        registry.add(store.get(first).unwrap(), first, "Alpha").unwrap();

        // Fresh name, colliding id: neither map may gain an entry
        let second = make_record(&mut store, "Study", "Study_1", "Beta");
        let err = registry
            .add(store.get(second).unwrap(), second, "Beta")
            .unwrap_err();
        assert_eq!(err.kind, KeyKind::Id);
        assert_eq!(err.key, "Study_1");

        assert_eq!(registry.get_by_name(&"Study", "Beta"), None);
        assert_eq!(registry.get_by_id(&"Study", "Study_1"), Some(first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_name_different_types_coexist() {
        let mut store = EntityStore::new();
        let mut registry = Registry::new();

        let study = make_record(&mut store, "Study", "Study_1", "Shared");
        let org = make_record(&mut store, "Organization", "Organization_1", "Shared");
        registry.add(store.get(study).unwrap(), study, "Shared").unwrap();
        registry.add(store.get(org).unwrap(), org, "Shared").unwrap();

        assert_eq!(registry.get_by_name(&"Study", "Shared"), Some(study));
        assert_eq!(registry.get_by_name(&"Organization", "Shared"), Some(org));
    }
}
