//! Entity factory.
//!
//! The [`Builder`] owns the arena, registry, and diagnostics for exactly one
//! build pass. Construction failures never escape: internally every create
//! is a `Result`, publicly the contract is nullable-plus-diagnostic, so one
//! bad record cannot abort the rest of the document build.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

use protocolbuilder_registry::Registry;
use protocolbuilder_shared::{
    AppConfig, BuilderConfig, Diagnostics, DuplicateRegistration, EntityId, EntityRef,
    EntityStore, FieldValue, IdStyle, PathError, Record, Schema, TypeKey,
};

use crate::terminology::ReferenceData;

/// Why a construction attempt was absorbed.
#[derive(Debug, thiserror::Error)]
pub(crate) enum BuildFailure {
    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("type '{type_tag}' has no field '{field}'")]
    UnknownField { type_tag: String, field: String },

    #[error("type '{type_tag}' requires field '{field}'")]
    MissingRequired { type_tag: String, field: String },

    #[error("supplied id must be a string or id value, got {kind}")]
    InvalidId { kind: &'static str },

    #[error(transparent)]
    Duplicate(#[from] DuplicateRegistration),
}

/// Factory for entities: identity assignment, terminology normalization,
/// ordering utilities. One instance per build pass.
pub struct Builder {
    store: EntityStore,
    registry: Registry,
    diagnostics: Diagnostics,
    schema: Box<dyn Schema>,
    reference: Box<dyn ReferenceData>,
    pub(crate) code_cache: HashMap<String, EntityRef>,
    id_counter: u64,
    config: BuilderConfig,
}

impl Builder {
    /// Create a builder with default options.
    pub fn new(schema: Box<dyn Schema>, reference: Box<dyn ReferenceData>) -> Self {
        Self::with_config(schema, reference, &AppConfig::default())
    }

    /// Create a builder honoring the application config.
    pub fn with_config(
        schema: Box<dyn Schema>,
        reference: Box<dyn ReferenceData>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store: EntityStore::new(),
            registry: Registry::new()
                .with_auto_register(config.registry.auto_register_on_path_miss),
            diagnostics: Diagnostics::new(),
            schema,
            reference,
            code_cache: HashMap::new(),
            id_counter: 0,
            config: config.builder.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create an entity of the given type.
    ///
    /// Field names are validated against the type's declared shape, defaults
    /// are applied, a fresh id is assigned unless an `id` field is supplied,
    /// and the result is registered under its `name` when the type declares
    /// one. On any failure the condition is logged to the diagnostics sink
    /// and `None` is returned — nothing is inserted anywhere.
    pub fn create(
        &mut self,
        type_name: &str,
        fields: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> Option<EntityRef> {
        match self.try_create(type_name, fields) {
            Ok(entity) => Some(entity),
            Err(failure) => {
                let message = format!("could not create '{type_name}': {failure}");
                match failure {
                    BuildFailure::Duplicate(_) => {
                        self.diagnostics.exception("builder", "create", message)
                    }
                    _ => self.diagnostics.error("builder", "create", message),
                }
                None
            }
        }
    }

    fn try_create(
        &mut self,
        type_name: &str,
        fields: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> Result<EntityRef, BuildFailure> {
        let descriptor = self
            .schema
            .type_descriptor(type_name)
            .ok_or_else(|| BuildFailure::UnknownType(type_name.to_string()))?
            .clone();

        let mut supplied: IndexMap<String, FieldValue> = fields.into_iter().collect();

        // A caller-supplied id takes precedence over assignment.
        let id = match supplied.shift_remove("id") {
            None => self.next_id(&descriptor.name),
            Some(FieldValue::Str(s)) => EntityId::from(s),
            Some(FieldValue::Id(id)) => id,
            Some(other) => {
                return Err(BuildFailure::InvalidId {
                    kind: other.kind_name(),
                });
            }
        };

        for field in supplied.keys() {
            if !descriptor.has_field(field) {
                return Err(BuildFailure::UnknownField {
                    type_tag: descriptor.name.clone(),
                    field: field.clone(),
                });
            }
        }

        let mut record = Record::new(descriptor.name.as_str(), id);
        for spec in &descriptor.fields {
            if let Some(value) = supplied.shift_remove(&spec.name) {
                record.set(spec.name.as_str(), value);
            } else if let Some(default) = &spec.default {
                record.set(spec.name.as_str(), default.clone());
            } else if spec.required {
                return Err(BuildFailure::MissingRequired {
                    type_tag: descriptor.name.clone(),
                    field: spec.name.clone(),
                });
            }
        }

        // Register first: a duplicate must leave both store and registry
        // untouched.
        let entity = self.store.next_ref();
        if descriptor.declares_name() {
            if let Some(name) = record.name() {
                let name = name.to_string();
                self.registry.add(&record, entity, &name)?;
            }
        }

        debug!(type_name, id = %record.id(), "created entity");
        Ok(self.store.insert(record))
    }

    fn next_id(&mut self, type_tag: &str) -> EntityId {
        match self.config.id_style {
            IdStyle::Sequential => {
                self.id_counter += 1;
                EntityId(format!(
                    "{type_tag}{}{}",
                    self.config.id_separator, self.id_counter
                ))
            }
            IdStyle::Uuid => EntityId(Uuid::now_v7().to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    /// Double-link an ordered sequence of entities.
    ///
    /// Sets `prev_attr` to the prior element's id (removed on the first) and
    /// `next_attr` to the next element's id (removed on the last). Idempotent
    /// under repeated application with identical attribute names. This is
    /// the only ordering mechanism in the system.
    pub fn double_link(&mut self, items: &[EntityRef], prev_attr: &str, next_attr: &str) {
        let ids: Vec<Option<EntityId>> = items
            .iter()
            .map(|e| self.store.get(*e).map(|r| r.id().clone()))
            .collect();

        for (i, &entity) in items.iter().enumerate() {
            let Some(record) = self.store.get_mut(entity) else {
                continue;
            };

            match i.checked_sub(1).and_then(|p| ids[p].clone()) {
                Some(prev) => record.set(prev_attr, FieldValue::Id(prev)),
                None => record.remove(prev_attr),
            }
            match ids.get(i + 1).and_then(|n| n.clone()) {
                Some(next) => record.set(next_attr, FieldValue::Id(next)),
                None => record.remove(next_attr),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Reset builder-local state and the registry for a fresh pass.
    ///
    /// Must run between independent build passes so identifiers cannot leak
    /// across them. The diagnostics sink is append-only and survives.
    pub fn clear(&mut self) {
        self.store.clear();
        self.code_cache.clear();
        self.id_counter = 0;
        self.registry.clear();
        debug!("builder cleared for new pass");
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Look up an entity by (type, name).
    pub fn get_by_name(&self, type_key: &impl TypeKey, name: &str) -> Option<EntityRef> {
        self.registry.get_by_name(type_key, name)
    }

    /// Look up an entity by (type, id).
    pub fn get_by_id(&self, type_key: &impl TypeKey, id: &str) -> Option<EntityRef> {
        self.registry.get_by_id(type_key, id)
    }

    /// Resolve a path expression from a registered start entity.
    pub fn get_by_path(
        &mut self,
        start_type: &str,
        start_name: &str,
        path: &str,
    ) -> Result<(EntityRef, String), PathError> {
        self.registry
            .get_by_path(&self.store, start_type, start_name, path)
    }

    /// The pass's entity arena.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Mutable access to the arena (child-list appends, link fixups).
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// The pass's registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The diagnostics recorded so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Append to the diagnostics sink.
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub(crate) fn reference(&self) -> &dyn ReferenceData {
        self.reference.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminology::InMemoryReferenceData;
    use protocolbuilder_shared::{FieldSpec, InMemorySchema, TypeDescriptor};

    fn test_schema() -> InMemorySchema {
        InMemorySchema::new()
            .with_type(TypeDescriptor::new(
                "Study",
                vec![
                    FieldSpec::required("name"),
                    FieldSpec::optional("child"),
                    FieldSpec::with_default("label", FieldValue::Str("".into())),
                ],
            ))
            .with_type(TypeDescriptor::new(
                "Activity",
                vec![
                    FieldSpec::required("name"),
                    FieldSpec::optional("previousId"),
                    FieldSpec::optional("nextId"),
                ],
            ))
    }

    fn make_builder() -> Builder {
        Builder::new(
            Box::new(test_schema()),
            Box::new(InMemoryReferenceData::new()),
        )
    }

    fn named(name: &str) -> Vec<(String, FieldValue)> {
        vec![("name".to_string(), FieldValue::Str(name.into()))]
    }

    #[test]
    fn create_assigns_id_and_registers() {
        let mut builder = make_builder();

        let entity = builder.create("Study", named("CDISC PILOT")).unwrap();
        let record = builder.store().get(entity).unwrap();
        assert_eq!(record.id().as_str(), "Study_1");
        // Default applied
        assert_eq!(record.get("label"), Some(&FieldValue::Str("".into())));

        assert_eq!(builder.get_by_name(&"Study", "CDISC PILOT"), Some(entity));
        assert_eq!(builder.get_by_id(&"Study", "Study_1"), Some(entity));
    }

    #[test]
    fn supplied_id_is_respected() {
        let mut builder = make_builder();

        let mut fields = named("CDISC PILOT");
        fields.push(("id".to_string(), FieldValue::Str("CUSTOM_9".into())));
        let entity = builder.create("Study", fields).unwrap();

        assert_eq!(
            builder.store().get(entity).unwrap().id().as_str(),
            "CUSTOM_9"
        );
        assert_eq!(builder.get_by_id(&"Study", "CUSTOM_9"), Some(entity));
    }

    #[test]
    fn unknown_type_is_absorbed() {
        let mut builder = make_builder();

        assert!(builder.create("Nope", named("x")).is_none());
        assert_eq!(builder.diagnostics().error_count(), 1);
        assert!(builder.store().is_empty());

        // The pass continues
        assert!(builder.create("Study", named("x")).is_some());
    }

    #[test]
    fn unknown_field_is_absorbed() {
        let mut builder = make_builder();

        let mut fields = named("x");
        fields.push(("bogus".to_string(), FieldValue::Str("y".into())));
        assert!(builder.create("Study", fields).is_none());
        assert_eq!(builder.diagnostics().error_count(), 1);
        assert!(builder.store().is_empty());
    }

    #[test]
    fn missing_required_field_is_absorbed() {
        let mut builder = make_builder();

        assert!(builder.create("Study", vec![]).is_none());
        let entry = &builder.diagnostics().entries()[0];
        assert!(entry.message.contains("requires field 'name'"));
    }

    #[test]
    fn duplicate_name_keeps_original_and_inserts_nothing() {
        let mut builder = make_builder();

        let first = builder.create("Study", named("CDISC PILOT")).unwrap();
        assert!(builder.create("Study", named("CDISC PILOT")).is_none());

        assert_eq!(builder.diagnostics().error_count(), 1);
        assert_eq!(builder.get_by_name(&"Study", "CDISC PILOT"), Some(first));
        // The failed construction was rolled back entirely
        assert_eq!(builder.store().len(), 1);
    }

    #[test]
    fn uuid_id_style() {
        let mut config = AppConfig::default();
        config.builder.id_style = IdStyle::Uuid;
        let mut builder = Builder::with_config(
            Box::new(test_schema()),
            Box::new(InMemoryReferenceData::new()),
            &config,
        );

        let entity = builder.create("Study", named("x")).unwrap();
        let id = builder.store().get(entity).unwrap().id().clone();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn double_link_sets_neighbors_and_is_idempotent() {
        let mut builder = make_builder();

        let n1 = builder.create("Activity", named("a1")).unwrap();
        let n2 = builder.create("Activity", named("a2")).unwrap();
        let n3 = builder.create("Activity", named("a3")).unwrap();
        let items = [n1, n2, n3];

        let snapshot = |b: &Builder| -> Vec<Record> {
            items.iter().map(|e| b.store().get(*e).unwrap().clone()).collect()
        };

        builder.double_link(&items, "previousId", "nextId");
        let once = snapshot(&builder);
        builder.double_link(&items, "previousId", "nextId");
        let twice = snapshot(&builder);
        assert_eq!(once, twice);

        let id = |i: usize| once[i].id().clone();
        assert_eq!(once[0].get("previousId"), None);
        assert_eq!(once[0].get("nextId"), Some(&FieldValue::Id(id(1))));
        assert_eq!(once[1].get("previousId"), Some(&FieldValue::Id(id(0))));
        assert_eq!(once[1].get("nextId"), Some(&FieldValue::Id(id(2))));
        assert_eq!(once[2].get("previousId"), Some(&FieldValue::Id(id(1))));
        assert_eq!(once[2].get("nextId"), None);
    }

    #[test]
    fn double_link_single_element_has_no_links() {
        let mut builder = make_builder();

        let only = builder.create("Activity", named("solo")).unwrap();
        builder.double_link(&[only], "previousId", "nextId");

        let record = builder.store().get(only).unwrap();
        assert_eq!(record.get("previousId"), None);
        assert_eq!(record.get("nextId"), None);
    }

    #[test]
    fn clear_resets_identity_state_between_passes() {
        let mut builder = make_builder();

        builder.create("Study", named("CDISC PILOT")).unwrap();
        builder.clear();

        assert!(builder.store().is_empty());
        assert!(builder.registry().is_empty());

        // Same name and a restarted counter: no collision across passes
        let entity = builder.create("Study", named("CDISC PILOT")).unwrap();
        assert_eq!(
            builder.store().get(entity).unwrap().id().as_str(),
            "Study_1"
        );
    }

    #[test]
    fn get_by_path_through_builder() {
        let mut builder = make_builder();

        let child = builder.create("Study", named("inner")).unwrap();
        let mut fields = named("outer");
        fields.push(("child".to_string(), FieldValue::Entity(child)));
        builder.create("Study", fields).unwrap();

        let (owner, attribute) = builder
            .get_by_path("Study", "outer", "child/Study/@name")
            .unwrap();
        assert_eq!(owner, child);
        assert_eq!(attribute, "name");
    }
}
