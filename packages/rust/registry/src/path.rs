//! Path-expression resolution over the entity graph.
//!
//! A path is a `/`-delimited walk from a registered start entity, e.g.
//! `"child/ChildType/@attribute"`: non-terminal tokens come in
//! (attribute, expected-type) pairs, the terminal token is `@` + the target
//! attribute name. Resolution returns the owning entity and the attribute
//! *name* — the value is never dereferenced.

use tracing::{instrument, trace};

use protocolbuilder_shared::{EntityRef, EntityStore, FieldValue, PathError};

use crate::Registry;

impl Registry {
    /// Resolve a path expression to an (owning entity, attribute name)
    /// pair.
    ///
    /// Takes `&mut self` because, when path-miss auto-registration is
    /// enabled, navigated-to named entities absent from the identity maps
    /// are registered as a side effect.
    #[instrument(skip(self, store))]
    pub fn get_by_path(
        &mut self,
        store: &EntityStore,
        start_type: &str,
        start_name: &str,
        path: &str,
    ) -> Result<(EntityRef, String), PathError> {
        let tokens: Vec<&str> = path.split('/').collect();

        let Some((terminal, pairs)) = tokens.split_last() else {
            return Err(PathError::Format {
                path: path.to_string(),
            });
        };

        // The grammar is (attribute, type)* '@'attribute: the terminal must
        // carry the marker and the rest must split into complete pairs.
        let attribute = match terminal.strip_prefix('@') {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(PathError::Format {
                    path: path.to_string(),
                });
            }
        };
        if pairs.len() % 2 != 0 {
            return Err(PathError::Format {
                path: path.to_string(),
            });
        }

        let mut current =
            self.get_by_name(&start_type, start_name)
                .ok_or_else(|| PathError::StartNotFound {
                    path: path.to_string(),
                    type_tag: start_type.to_string(),
                    name: start_name.to_string(),
                })?;

        for pair in pairs.chunks_exact(2) {
            // A leading '@' on a non-terminal attribute token is cosmetic.
            let attr = pair[0].strip_prefix('@').unwrap_or(pair[0]);
            let expected = pair[1];

            let next = self.read_entity_attribute(store, current, attr, path)?;
            let found = store
                .get(next)
                .map(|r| r.type_tag().to_string())
                .unwrap_or_default();
            if found != expected {
                return Err(PathError::ClassMismatch {
                    path: path.to_string(),
                    expected: expected.to_string(),
                    found,
                });
            }

            if self.auto_register_on_path_miss() {
                self.register_navigated(store, next);
            }

            current = next;
        }

        Ok((current, attribute.to_string()))
    }

    /// Read a navigable (entity-valued) attribute off an instance.
    fn read_entity_attribute(
        &self,
        store: &EntityStore,
        entity: EntityRef,
        attr: &str,
        path: &str,
    ) -> Result<EntityRef, PathError> {
        let missing = || PathError::AttributeNotFound {
            path: path.to_string(),
            attribute: attr.to_string(),
        };

        if attr.is_empty() {
            // Produced by "//" in the expression.
            return Err(missing());
        }

        let record = store.get(entity).ok_or_else(missing)?;
        match record.get(attr) {
            Some(FieldValue::Entity(next)) => Ok(*next),
            Some(other) => Err(PathError::ClassMismatch {
                path: path.to_string(),
                expected: "entity".to_string(),
                found: other.kind_name().to_string(),
            }),
            None => Err(missing()),
        }
    }

    /// Register a navigated-to named entity that the identity maps are
    /// missing. Errors are ignored: the walk itself already succeeded.
    fn register_navigated(&mut self, store: &EntityStore, entity: EntityRef) {
        let Some(record) = store.get(entity) else {
            return;
        };
        let Some(name) = record.name() else {
            return;
        };
        if self
            .get_by_id(&record.type_tag(), record.id().as_str())
            .is_some()
        {
            return;
        }
        let name = name.to_string();
        trace!(type_tag = record.type_tag(), name = %name, "auto-registering navigated entity");
        let _ = self.add(record, entity, &name);
    }
}
