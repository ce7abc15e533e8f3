//! The field-mapping schema: its configuration shape, compilation, and the
//! Top-Level Classifier.

use crate::error::{Error, Result};
use crate::interpolate::VariableInterpolator;
use crate::path::{self, Step};
use serde::{Deserialize, Serialize};

/// One of the MongoDB update operators a mapping may be keyed by when the
/// Modifier Builder is in play. `N/A` mappings are ignored by the Modifier
/// Builder but still contribute to inserts and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierOp {
    #[serde(rename = "$set")]
    Set,
    #[serde(rename = "$push")]
    Push,
    #[serde(rename = "$inc")]
    Inc,
    #[serde(rename = "$addToSet")]
    AddToSet,
    #[serde(rename = "$unset")]
    Unset,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl ModifierOp {
    /// The literal operator key this op is emitted under, or `None` for
    /// `NotApplicable` (which never appears in a modifier document).
    pub fn key(&self) -> Option<&'static str> {
        match self {
            ModifierOp::Set => Some("$set"),
            ModifierOp::Push => Some("$push"),
            ModifierOp::Inc => Some("$inc"),
            ModifierOp::AddToSet => Some("$addToSet"),
            ModifierOp::Unset => Some("$unset"),
            ModifierOp::NotApplicable => None,
        }
    }
}

/// Declares whether a mapping applies to inserts only, updates only, or
/// both, when the Modifier Builder's policy preamble is in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierPolicy {
    #[serde(rename = "Insert&Update")]
    InsertAndUpdate,
    Insert,
    Update,
}

/// One field-mapping rule, as configured by the host step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub incoming_name: String,
    pub doc_path: String,
    pub append_incoming_name: bool,
    #[serde(default)]
    pub value_is_json_literal: bool,
    #[serde(default)]
    pub is_match_field: bool,
    #[serde(default = "default_modifier_op")]
    pub modifier_op: ModifierOp,
    #[serde(default = "default_modifier_policy")]
    pub modifier_policy: ModifierPolicy,
}

fn default_modifier_op() -> ModifierOp {
    ModifierOp::NotApplicable
}

fn default_modifier_policy() -> ModifierPolicy {
    ModifierPolicy::InsertAndUpdate
}

/// A `FieldMapping` plus the path it compiles to, and the already
/// variable-interpolated strings it was compiled from.
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    pub mapping: FieldMapping,
    /// `doc_path` after interpolation.
    pub resolved_doc_path: String,
    /// `incoming_name` after interpolation.
    pub resolved_incoming_name: String,
    pub steps: Vec<Step>,
}

/// The root document's shape, decided once for the whole mapping set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevel {
    Record,
    Array,
}

/// A field-mapping set, compiled once per stream.
/// Immutable and freely `Send + Sync` shareable across row workers.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub mappings: Vec<CompiledMapping>,
    pub top_level: TopLevel,
}

impl CompiledSchema {
    /// Compile every mapping's path, then classify the top level.
    pub fn compile(
        mappings: Vec<FieldMapping>,
        interpolator: &dyn VariableInterpolator,
    ) -> Result<Self> {
        let mut compiled = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let resolved_doc_path = interpolator.interpolate(&mapping.doc_path);
            let resolved_incoming_name = interpolator.interpolate(&mapping.incoming_name);
            let steps = path::compile(&resolved_doc_path, mapping.append_incoming_name)?;
            compiled.push(CompiledMapping {
                mapping,
                resolved_doc_path,
                resolved_incoming_name,
                steps,
            });
        }

        let top_level = classify(&compiled)?;

        Ok(Self {
            mappings: compiled,
            top_level,
        })
    }

    pub fn match_fields(&self) -> impl Iterator<Item = &CompiledMapping> {
        self.mappings.iter().filter(|m| m.mapping.is_match_field)
    }

    pub fn non_match_fields(&self) -> impl Iterator<Item = &CompiledMapping> {
        self.mappings.iter().filter(|m| !m.mapping.is_match_field)
    }
}

/// Top-Level Classifier: a path's first step (or its absence) decides
/// whether it votes for a record root or an array root.
fn classify(mappings: &[CompiledMapping]) -> Result<TopLevel> {
    let record_count = mappings
        .iter()
        .filter(|m| matches!(m.steps.first(), Some(Step::Object(_)) | None))
        .count();
    let array_count = mappings
        .iter()
        .filter(|m| matches!(m.steps.first(), Some(Step::Index(_))))
        .count();

    match (record_count, array_count) {
        (0, a) if a > 0 => Ok(TopLevel::Array),
        (r, 0) if r > 0 => Ok(TopLevel::Record),
        (record_count, array_count) => Err(Error::InconsistentTopLevel {
            record_count,
            array_count,
        }),
    }
}
