//! Controlled-terminology code wrapping.
//!
//! Reference data (CDISC code lists, ISO 3166 country/region tables) lives
//! behind the [`ReferenceData`] trait; the builder wraps looked-up values as
//! `Code` / `AliasCode` entities and memoizes them so repeated use of the
//! same logical code never mints duplicate entities. Lookup misses are
//! logged, never raised.

use std::collections::HashMap;

use protocolbuilder_shared::{
    EntityRef, FieldSpec, FieldValue, TypeDescriptor,
};

use crate::builder::Builder;

/// Code system for CDISC controlled terminology.
pub const CDISC_CODE_SYSTEM: &str = "http://www.cdisc.org";

/// Code system for ISO 3166-1 alpha-3 country codes.
pub const ISO3166_CODE_SYSTEM: &str = "ISO 3166 1 alpha3";

/// Code system for ISO 3166-2 region codes.
pub const ISO3166_REGION_CODE_SYSTEM: &str = "ISO 3166 2";

// ---------------------------------------------------------------------------
// Reference data provider
// ---------------------------------------------------------------------------

/// Controlled-terminology lookup functions, supplied by the surrounding
/// system.
///
/// Every method returns the `(code, label)` pair for a hit and `None` for a
/// case-insensitive miss.
pub trait ReferenceData {
    /// Resolve a country code to its `(code, name)` entry.
    fn decode(&self, code: &str) -> Option<(String, String)>;

    /// Resolve a country name to its `(code, name)` entry.
    fn code(&self, label: &str) -> Option<(String, String)>;

    /// Resolve a region name to its `(code, name)` entry.
    fn region_code(&self, label: &str) -> Option<(String, String)>;

    /// Resolve a human label to the `(code, decode)` required for a given
    /// type/attribute.
    fn klass_attribute(
        &self,
        klass: &str,
        attribute: &str,
        label: &str,
    ) -> Option<(String, String)>;
}

/// Map-backed reference data; the standard implementation.
///
/// All keys are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Default, Clone)]
pub struct InMemoryReferenceData {
    by_code: HashMap<String, (String, String)>,
    by_label: HashMap<String, (String, String)>,
    regions: HashMap<String, (String, String)>,
    klass_attributes: HashMap<(String, String, String), (String, String)>,
}

impl InMemoryReferenceData {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a country entry, resolvable by code and by name.
    pub fn add_country(&mut self, code: &str, name: &str) {
        let entry = (code.to_string(), name.to_string());
        self.by_code.insert(code.to_lowercase(), entry.clone());
        self.by_label.insert(name.to_lowercase(), entry);
    }

    /// Register a region entry, resolvable by name.
    pub fn add_region(&mut self, code: &str, name: &str) {
        self.regions
            .insert(name.to_lowercase(), (code.to_string(), name.to_string()));
    }

    /// Register a code-list value for a type/attribute pair.
    pub fn add_klass_attribute(
        &mut self,
        klass: &str,
        attribute: &str,
        label: &str,
        code: &str,
        decode: &str,
    ) {
        self.klass_attributes.insert(
            (
                klass.to_string(),
                attribute.to_string(),
                label.to_lowercase(),
            ),
            (code.to_string(), decode.to_string()),
        );
    }
}

impl ReferenceData for InMemoryReferenceData {
    fn decode(&self, code: &str) -> Option<(String, String)> {
        self.by_code.get(&code.to_lowercase()).cloned()
    }

    fn code(&self, label: &str) -> Option<(String, String)> {
        self.by_label.get(&label.to_lowercase()).cloned()
    }

    fn region_code(&self, label: &str) -> Option<(String, String)> {
        self.regions.get(&label.to_lowercase()).cloned()
    }

    fn klass_attribute(
        &self,
        klass: &str,
        attribute: &str,
        label: &str,
    ) -> Option<(String, String)> {
        self.klass_attributes
            .get(&(
                klass.to_string(),
                attribute.to_string(),
                label.to_lowercase(),
            ))
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// Type descriptors
// ---------------------------------------------------------------------------

/// The `Code` descriptor consumers register in their schema.
pub fn code_type() -> TypeDescriptor {
    TypeDescriptor::new(
        "Code",
        vec![
            FieldSpec::required("code"),
            FieldSpec::required("codeSystem"),
            FieldSpec::with_default("codeSystemVersion", FieldValue::Str("".into())),
            FieldSpec::required("decode"),
        ],
    )
}

/// The `AliasCode` descriptor consumers register in their schema.
pub fn alias_code_type() -> TypeDescriptor {
    TypeDescriptor::new(
        "AliasCode",
        vec![FieldSpec::required("standardCode")],
    )
}

// ---------------------------------------------------------------------------
// Builder terminology operations
// ---------------------------------------------------------------------------

impl Builder {
    /// Wrap a CDISC controlled-terminology value as a `Code` entity.
    ///
    /// Memoized per code: repeated calls for the same value reuse the
    /// previously built entity. Callers compare codes by value, never by
    /// identity.
    pub fn cdisc_code(&mut self, code: &str, decode: &str) -> Option<EntityRef> {
        self.code_entity(
            format!("cdisc|{code}"),
            code,
            decode,
            CDISC_CODE_SYSTEM,
        )
    }

    /// Wrap an ISO 3166 country as a `Code` entity.
    ///
    /// Accepts a country code, falling back to a name lookup so callers can
    /// pass either. A miss on both is logged and yields `None`.
    pub fn iso3166_code(&mut self, code_or_name: &str) -> Option<EntityRef> {
        let entry = self
            .reference()
            .decode(code_or_name)
            .or_else(|| self.reference().code(code_or_name));
        let Some((code, name)) = entry else {
            self.diagnostics_mut().error(
                "builder",
                "iso3166_code",
                format!("unknown country '{code_or_name}'"),
            );
            return None;
        };
        self.code_entity(format!("iso3166|{code}"), &code, &name, ISO3166_CODE_SYSTEM)
    }

    /// Wrap an ISO 3166-2 region as a `Code` entity.
    pub fn iso3166_region_code(&mut self, name: &str) -> Option<EntityRef> {
        let Some((code, name)) = self.reference().region_code(name) else {
            self.diagnostics_mut().error(
                "builder",
                "iso3166_region_code",
                format!("unknown region '{name}'"),
            );
            return None;
        };
        self.code_entity(
            format!("region|{code}"),
            &code,
            &name,
            ISO3166_REGION_CODE_SYSTEM,
        )
    }

    /// Wrap a standard code in an `AliasCode` entity.
    pub fn alias_code(&mut self, standard_code: EntityRef) -> Option<EntityRef> {
        self.create(
            "AliasCode",
            vec![(
                "standardCode".to_string(),
                FieldValue::Entity(standard_code),
            )],
        )
    }

    /// Resolve a human label to the code required for a type/attribute.
    ///
    /// An unrecognized label is logged and yields `None`.
    pub fn klass_and_attribute_value(
        &mut self,
        type_name: &str,
        attribute: &str,
        label: &str,
    ) -> Option<EntityRef> {
        let Some((code, decode)) = self.reference().klass_attribute(type_name, attribute, label)
        else {
            self.diagnostics_mut().error(
                "builder",
                "klass_and_attribute_value",
                format!("unrecognized label '{label}' for {type_name}.{attribute}"),
            );
            return None;
        };
        self.cdisc_code(&code, &decode)
    }

    /// Memoized `Code` construction.
    fn code_entity(
        &mut self,
        cache_key: String,
        code: &str,
        decode: &str,
        code_system: &str,
    ) -> Option<EntityRef> {
        if let Some(entity) = self.code_cache.get(&cache_key) {
            return Some(*entity);
        }

        let entity = self.create(
            "Code",
            vec![
                ("code".to_string(), FieldValue::Str(code.into())),
                ("codeSystem".to_string(), FieldValue::Str(code_system.into())),
                ("decode".to_string(), FieldValue::Str(decode.into())),
            ],
        )?;
        self.code_cache.insert(cache_key, entity);
        Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocolbuilder_shared::InMemorySchema;

    fn make_reference() -> InMemoryReferenceData {
        let mut reference = InMemoryReferenceData::new();
        reference.add_country("USA", "United States of America");
        reference.add_country("DNK", "Denmark");
        reference.add_region("150", "Europe");
        reference.add_klass_attribute(
            "StudyAmendmentReason",
            "code",
            "Regulatory Agency Request To Amend",
            "C99904x1",
            "Regulatory Agency Request To Amend",
        );
        reference
    }

    fn make_builder() -> Builder {
        let schema = InMemorySchema::new()
            .with_type(code_type())
            .with_type(alias_code_type());
        Builder::new(Box::new(schema), Box::new(make_reference()))
    }

    #[test]
    fn cdisc_code_is_memoized() {
        let mut builder = make_builder();

        let first = builder.cdisc_code("C49487", "Yes").unwrap();
        let second = builder.cdisc_code("C49487", "Yes").unwrap();
        assert_eq!(first, second);
        assert_eq!(builder.store().len(), 1);

        let other = builder.cdisc_code("C49488", "No").unwrap();
        assert_ne!(first, other);
        assert_eq!(builder.store().len(), 2);
    }

    #[test]
    fn cdisc_code_fields() {
        let mut builder = make_builder();

        let entity = builder.cdisc_code("C49487", "Yes").unwrap();
        let record = builder.store().get(entity).unwrap();
        assert_eq!(record.type_tag(), "Code");
        assert_eq!(record.get("code"), Some(&FieldValue::Str("C49487".into())));
        assert_eq!(
            record.get("codeSystem"),
            Some(&FieldValue::Str(CDISC_CODE_SYSTEM.into()))
        );
        assert_eq!(record.get("decode"), Some(&FieldValue::Str("Yes".into())));
    }

    #[test]
    fn iso3166_lookup_is_case_insensitive() {
        let mut builder = make_builder();

        let by_code = builder.iso3166_code("usa").unwrap();
        let by_name = builder.iso3166_code("UNITED STATES OF AMERICA").unwrap();
        // Same logical value: the memo returns the same entity
        assert_eq!(by_code, by_name);

        let record = builder.store().get(by_code).unwrap();
        assert_eq!(
            record.get("codeSystem"),
            Some(&FieldValue::Str(ISO3166_CODE_SYSTEM.into()))
        );
        assert_eq!(
            record.get("decode"),
            Some(&FieldValue::Str("United States of America".into()))
        );
    }

    #[test]
    fn iso3166_miss_is_logged_not_raised() {
        let mut builder = make_builder();

        assert!(builder.iso3166_code("Atlantis").is_none());
        assert_eq!(builder.diagnostics().error_count(), 1);

        // Subsequent lookups still work
        assert!(builder.iso3166_code("DNK").is_some());
    }

    #[test]
    fn region_code_lookup() {
        let mut builder = make_builder();

        let entity = builder.iso3166_region_code("europe").unwrap();
        let record = builder.store().get(entity).unwrap();
        assert_eq!(record.get("code"), Some(&FieldValue::Str("150".into())));

        assert!(builder.iso3166_region_code("Narnia").is_none());
        assert_eq!(builder.diagnostics().error_count(), 1);
    }

    #[test]
    fn alias_code_wraps_standard_code() {
        let mut builder = make_builder();

        let standard = builder.cdisc_code("C49487", "Yes").unwrap();
        let alias = builder.alias_code(standard).unwrap();

        let record = builder.store().get(alias).unwrap();
        assert_eq!(record.type_tag(), "AliasCode");
        assert_eq!(
            record.get("standardCode"),
            Some(&FieldValue::Entity(standard))
        );
    }

    #[test]
    fn klass_and_attribute_value_resolves_label() {
        let mut builder = make_builder();

        let entity = builder
            .klass_and_attribute_value(
                "StudyAmendmentReason",
                "code",
                "regulatory agency request to amend",
            )
            .unwrap();
        let record = builder.store().get(entity).unwrap();
        assert_eq!(
            record.get("code"),
            Some(&FieldValue::Str("C99904x1".into()))
        );
    }

    #[test]
    fn klass_and_attribute_value_miss_yields_none() {
        let mut builder = make_builder();

        assert!(
            builder
                .klass_and_attribute_value("StudyAmendmentReason", "code", "No Such Reason")
                .is_none()
        );
        assert_eq!(builder.diagnostics().error_count(), 1);
    }

    #[test]
    fn code_creation_failure_is_absorbed() {
        // Schema without a Code type: wrapping must log and yield None
        let mut builder = Builder::new(
            Box::new(InMemorySchema::new()),
            Box::new(make_reference()),
        );

        assert!(builder.cdisc_code("C49487", "Yes").is_none());
        assert_eq!(builder.diagnostics().error_count(), 1);
    }
}
