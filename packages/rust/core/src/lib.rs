//! Entity builder and outline assembly for the protocol document graph.
//!
//! This crate ties the shared types and the registry together into the
//! construction substrate domain assemblers build on: the [`Builder`]
//! entity factory, terminology-code wrapping, and the hierarchical outline
//! assembler ([`assemble_outline`]).

pub mod builder;
pub mod outline;
pub mod terminology;

pub use builder::Builder;
pub use outline::{OutlineSection, assemble_outline, narrative_content_type, section_depth};
pub use terminology::{
    CDISC_CODE_SYSTEM, ISO3166_CODE_SYSTEM, ISO3166_REGION_CODE_SYSTEM, InMemoryReferenceData,
    ReferenceData, alias_code_type, code_type,
};
