//! Shared types, error model, and configuration for ProtocolBuilder.
//!
//! This crate is the foundation depended on by all other ProtocolBuilder
//! crates. It provides:
//! - [`ProtocolBuilderError`] — the unified error type, plus the typed
//!   registry errors [`DuplicateRegistration`] and [`PathError`]
//! - Domain types ([`Record`], [`FieldValue`], [`EntityStore`], [`EntityId`])
//! - The schema collaborator interface ([`Schema`], [`TypeDescriptor`])
//! - The diagnostics sink ([`Diagnostics`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod schema;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuilderConfig, IdStyle, RegistryConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use diagnostics::{Diagnostic, Diagnostics, Level};
pub use error::{
    DuplicateRegistration, KeyKind, PathError, ProtocolBuilderError, Result,
};
pub use schema::{FieldSpec, InMemorySchema, Schema, TypeDescriptor, TypeKey};
pub use types::{EntityId, EntityRef, EntityStore, FieldValue, Record};
