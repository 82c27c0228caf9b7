//! Hierarchical content assembly.
//!
//! Converts a flat, ordered sequence of outline sections (dotted section
//! numbers like `"2.3.1"`, or appendix/empty markers) into a tree of
//! `NarrativeContent` nodes: `childIds` follow the numbering, while
//! `previousId`/`nextId` run in document reading order across the whole
//! flat list.
//!
//! Input is processed strictly in array order. Out-of-order numbering is a
//! contract, not a defect to correct: parent/child assignment follows
//! encounter order, not numeric order.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use protocolbuilder_shared::{
    EntityRef, FieldSpec, FieldValue, TypeDescriptor,
};

use crate::builder::Builder;

/// Dotted numeric section numbers, optionally with a trailing dot.
static SECTION_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(\.\d+)*\.?$").expect("section number pattern is valid")
});

/// One outline section as read from the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    /// Dotted section number (`"2.3.1"`), appendix marker, or empty.
    #[serde(default)]
    pub number: String,
    /// Section heading.
    pub title: String,
    /// Section body.
    #[serde(default)]
    pub text: String,
}

impl OutlineSection {
    /// Convenience constructor for callers assembling sections in code.
    pub fn new(number: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            title: title.into(),
            text: String::new(),
        }
    }
}

/// Nesting depth implied by a section number.
///
/// Token count of the dotted number (`"1.2.3"` → 3, a trailing dot is
/// ignored). Appendix-style or absent numbers sit at depth 1.
pub fn section_depth(number: &str) -> usize {
    let number = number.trim();
    if !SECTION_NUMBER.is_match(number) {
        return 1;
    }
    number.trim_end_matches('.').split('.').count()
}

/// The `NarrativeContent` descriptor consumers register in their schema.
pub fn narrative_content_type() -> TypeDescriptor {
    TypeDescriptor::new(
        "NarrativeContent",
        vec![
            FieldSpec::required("name"),
            FieldSpec::with_default("sectionNumber", FieldValue::Str("".into())),
            FieldSpec::required("sectionTitle"),
            FieldSpec::with_default("text", FieldValue::Str("".into())),
            FieldSpec::with_default("childIds", FieldValue::IdList(vec![])),
            FieldSpec::optional("previousId"),
            FieldSpec::optional("nextId"),
        ],
    )
}

/// Assemble a flat outline into linked `NarrativeContent` nodes.
///
/// Returns every produced node in document reading order; `childIds` carry
/// the tree structure, and the whole flat list is double-linked exactly
/// once. A deeper section with no parent established at its depth is a
/// numbering defect: logged and skipped, never raised. Empty input yields
/// no nodes and is not an error.
#[instrument(skip_all, fields(section_count = sections.len()))]
pub fn assemble_outline(builder: &mut Builder, sections: &[OutlineSection]) -> Vec<EntityRef> {
    let mut assembler = OutlineAssembler {
        builder: &mut *builder,
        sections,
        cursor: 0,
        nodes: Vec::with_capacity(sections.len()),
    };
    assembler.run(1, None);

    let nodes = assembler.nodes;
    builder.double_link(&nodes, "previousId", "nextId");

    debug!(node_count = nodes.len(), "outline assembled");
    nodes
}

/// Recursive descent over the flat section array with a shared cursor.
struct OutlineAssembler<'a> {
    builder: &'a mut Builder,
    sections: &'a [OutlineSection],
    cursor: usize,
    nodes: Vec<EntityRef>,
}

impl OutlineAssembler<'_> {
    /// Consume the run of sections at `depth`, recursing for deeper ones.
    /// Returns when a shallower section (or the end of the array) is
    /// reached; the cursor is left on the first unconsumed section.
    fn run(&mut self, depth: usize, parent: Option<EntityRef>) {
        let mut previous: Option<EntityRef> = None;

        while self.cursor < self.sections.len() {
            let section = &self.sections[self.cursor];
            let section_depth = section_depth(&section.number);

            if section_depth == depth {
                if let Some(node) = self.build_node(section) {
                    self.nodes.push(node);
                    if let Some(parent) = parent {
                        self.append_child(parent, node);
                    }
                    previous = Some(node);
                }
                self.cursor += 1;
            } else if section_depth > depth {
                match previous {
                    Some(parent) => self.run(depth + 1, Some(parent)),
                    None => {
                        // Numbering defect: a deeper section with nothing to
                        // attach it to.
                        self.builder.diagnostics_mut().error(
                            "outline",
                            "assemble",
                            format!(
                                "section '{}' ('{}') at depth {section_depth} has no parent at depth {depth}; skipped",
                                section.number, section.title
                            ),
                        );
                        self.cursor += 1;
                    }
                }
            } else {
                // Shallower section ends this depth's run.
                return;
            }
        }
    }

    fn build_node(&mut self, section: &OutlineSection) -> Option<EntityRef> {
        // Section numbers may repeat in out-of-order input, so names are
        // minted from the node ordinal.
        let name = format!("NC_{}", self.nodes.len() + 1);
        self.builder.create(
            "NarrativeContent",
            vec![
                ("name".to_string(), FieldValue::Str(name)),
                (
                    "sectionNumber".to_string(),
                    FieldValue::Str(section.number.clone()),
                ),
                (
                    "sectionTitle".to_string(),
                    FieldValue::Str(section.title.clone()),
                ),
                ("text".to_string(), FieldValue::Str(section.text.clone())),
            ],
        )
    }

    fn append_child(&mut self, parent: EntityRef, child: EntityRef) {
        let Some(child_id) = self
            .builder
            .store()
            .get(child)
            .map(|record| record.id().clone())
        else {
            return;
        };
        if let Some(record) = self.builder.store_mut().get_mut(parent) {
            record.push_id("childIds", child_id);
        }
    }
}
