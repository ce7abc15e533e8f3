//! Modifier Builder, the hardest part. Produces an update document keyed
//! by modifier operators (`$set`, `$push`, `$inc`, …), bucketing each
//! surviving mapping's resolved path into one of three shapes before
//! assembling the final document.
//!
//! Unlike the Insert/Upsert Builder and the Query Builder, path resolution
//! here happens at the *string* level (`docPath` plus the append/strip
//! rules below), not off the compiled `Step` list: the bracket syntax that
//! decides bucketing (`P contains '['`) and the `$push` trailing-bracket
//! strip rule are properties of the raw path text. Compiled steps only
//! re-enter the picture for the two complex buckets, which reuse
//! [`crate::tree`] to materialize the sub-document/sub-array rooted at the
//! shared array path, using the same merge-in-place machinery the
//! Insert/Upsert Builder uses for sibling paths.

use crate::error::{Error, Result};
use crate::path;
use crate::probe::ExistenceProbe;
use crate::query;
use crate::row::RowView;
use crate::schema::{CompiledMapping, CompiledSchema, ModifierOp, ModifierPolicy, TopLevel};
use crate::tree;
use crate::value;
use bson::{Bson, Document};
use std::collections::BTreeMap;

/// Build the modifier update document for one row.
///
/// Returns `Ok(None)` when every surviving mapping's cell was null: the row
/// is dropped silently by the caller. Fails with
/// [`Error::NoFieldsToUpdateSpecified`] if no mapping survived the
/// apply-policy check at all.
pub fn build_update(
    schema: &CompiledSchema,
    row: &dyn RowView,
    probe: &dyn ExistenceProbe,
) -> Result<Option<Document>> {
    let is_update = resolve_is_update(schema, row, probe)?;

    let mut primitive_by_op: BTreeMap<&'static str, Document> = BTreeMap::new();
    let mut complex_set: BTreeMap<String, Bson> = BTreeMap::new();
    let mut complex_push: BTreeMap<String, Bson> = BTreeMap::new();

    let mut any_survived = false;
    let mut any_non_null = false;

    for mapping in schema.non_match_fields() {
        let Some(op_key) = mapping.mapping.modifier_op.key() else {
            // N/A: this mapping has no modifier operator to key the
            // update under, so it never contributes to a modifier
            // document (it still participates in plain insert/upsert
            // document construction via the Insert/Upsert Builder).
            continue;
        };

        if skip_for_policy(mapping.mapping.modifier_policy, is_update) {
            continue;
        }
        any_survived = true;

        let Some(cell) = row.cell(&mapping.resolved_incoming_name) else {
            continue;
        };
        let Some(coerced) = value::coerce(
            &cell,
            &mapping.resolved_incoming_name,
            mapping.mapping.value_is_json_literal,
        )?
        else {
            continue; // Null cell: omitted.
        };
        any_non_null = true;

        let resolved_path = resolve_path(mapping);

        match bucket_of(mapping.mapping.modifier_op, &resolved_path) {
            Bucket::ComplexSet => {
                let (array_path, remainder) = split_at_first_bracket(&resolved_path);
                let steps = path::compile(remainder, false)?;
                let root = complex_set
                    .entry(array_path.to_string())
                    .or_insert_with(|| tree::empty_root(TopLevel::Array));
                tree::write(root, &steps, coerced, &resolved_path)?;
            }
            Bucket::ComplexPush => {
                if mapping.mapping.append_incoming_name {
                    tracing::warn!(
                        path = %resolved_path,
                        incoming_name = %mapping.resolved_incoming_name,
                        "$push path retains a bracket after appending the incoming name; \
                         this combination is likely unintended",
                    );
                }
                let (array_path, sub_path) = split_after_first_bracket_group(&resolved_path)?;
                let steps = path::compile(sub_path, false)?;
                let root = complex_push
                    .entry(array_path.to_string())
                    .or_insert_with(|| tree::empty_root(TopLevel::Record));
                tree::write(root, &steps, coerced, &resolved_path)?;
            }
            Bucket::PrimitiveLeaf => {
                let flat = path::flatten_to_dots(&resolved_path);
                primitive_by_op
                    .entry(op_key)
                    .or_insert_with(Document::new)
                    .insert(flat, coerced);
            }
        }
    }

    if !any_survived {
        return Err(Error::NoFieldsToUpdateSpecified);
    }
    if !any_non_null {
        return Ok(None);
    }

    Ok(Some(assemble(primitive_by_op, complex_set, complex_push)))
}

/// Policy preamble: only consulted if some surviving candidate mapping
/// actually has a policy that depends on it, so an `Insert&Update`-only
/// schema never pays for the query build or the probe round-trip.
fn resolve_is_update(
    schema: &CompiledSchema,
    row: &dyn RowView,
    probe: &dyn ExistenceProbe,
) -> Result<bool> {
    let needs_policy = schema.non_match_fields().any(|m| {
        m.mapping.modifier_op.key().is_some()
            && matches!(
                m.mapping.modifier_policy,
                ModifierPolicy::Insert | ModifierPolicy::Update
            )
    });
    if !needs_policy {
        return Ok(false);
    }

    match query::build_query(schema, row)? {
        None => {
            tracing::debug!("modifier policy preamble: empty match document, treating row as insert");
            Ok(false)
        }
        Some(query_doc) => {
            let found = probe
                .find_one(&query_doc)
                .map_err(Error::ExistenceProbeFailed)?;
            tracing::debug!(is_update = found, "modifier policy preamble: existence probe");
            Ok(found)
        }
    }
}

fn skip_for_policy(policy: ModifierPolicy, is_update: bool) -> bool {
    match policy {
        ModifierPolicy::Insert => is_update,
        ModifierPolicy::Update => !is_update,
        ModifierPolicy::InsertAndUpdate => false,
    }
}

/// Compute the resolved dot path `P` for a surviving mapping.
fn resolve_path(mapping: &CompiledMapping) -> String {
    let mut p = mapping.resolved_doc_path.clone();

    if mapping.mapping.modifier_op == ModifierOp::Push
        && p.ends_with(']')
        && !mapping.mapping.append_incoming_name
    {
        if let Some(stripped) = path::strip_trailing_bracket_group(&p) {
            p = stripped.to_string();
        }
    }

    if mapping.mapping.append_incoming_name {
        p = path::append_incoming_name(&p, &mapping.resolved_incoming_name);
    }

    p
}

enum Bucket {
    ComplexSet,
    ComplexPush,
    PrimitiveLeaf,
}

fn bucket_of(op: ModifierOp, resolved_path: &str) -> Bucket {
    if op == ModifierOp::Set && resolved_path.contains('[') {
        Bucket::ComplexSet
    } else if op == ModifierOp::Push && resolved_path.contains('[') {
        Bucket::ComplexPush
    } else {
        Bucket::PrimitiveLeaf
    }
}

/// Split `P` at its first `[`, returning `(arrayPath, "[…rest" )`; the
/// second half still carries the opening bracket, since the complex-`$set`
/// bucket feeds it straight back into [`path::compile`] (which expects a
/// leading bracket group for a bare-index segment, cf. `bare_index_segment`
/// in path.rs).
fn split_at_first_bracket(p: &str) -> (&str, &str) {
    let idx = p.find('[').expect("caller only invokes this when P contains '['");
    (&p[..idx], &p[idx..])
}

/// Split `P` at its first full bracket *group* (`[…]`), returning
/// `(arrayPath, subPath)` where `subPath` has any leading `.` trimmed.
/// Used only by the complex-`$push` bucket, which builds the pushed
/// document from the dotted path *after* the array marker.
fn split_after_first_bracket_group(p: &str) -> Result<(&str, &str)> {
    let open = p.find('[').expect("caller only invokes this when P contains '['");
    let close = p[open..]
        .find(']')
        .map(|i| open + i)
        .ok_or_else(|| Error::UnbalancedBrackets { path: p.to_string() })?;
    let array_path = &p[..open];
    let sub_path = p[close + 1..].strip_prefix('.').unwrap_or(&p[close + 1..]);
    Ok((array_path, sub_path))
}

fn assemble(
    mut primitive_by_op: BTreeMap<&'static str, Document>,
    complex_set: BTreeMap<String, Bson>,
    complex_push: BTreeMap<String, Bson>,
) -> Document {
    let mut result = Document::new();

    for (op_key, doc) in std::mem::take(&mut primitive_by_op) {
        if op_key == "$set" || op_key == "$push" {
            continue; // merged in below, alongside the complex buckets.
        }
        result.insert(op_key, doc);
    }

    let mut set_doc = primitive_by_op.remove("$set").unwrap_or_default();
    for (array_path, value) in complex_set {
        set_doc.insert(array_path, value);
    }
    if !set_doc.is_empty() {
        result.insert("$set", set_doc);
    }

    let mut push_doc = primitive_by_op.remove("$push").unwrap_or_default();
    for (array_path, value) in complex_push {
        push_doc.insert(array_path, value);
    }
    if !push_doc.is_empty() {
        result.insert("$push", push_doc);
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interpolate::NoopInterpolator;
    use crate::probe::{AlwaysInsert, AlwaysUpdate};
    use crate::row::MapRow;
    use crate::schema::{CompiledSchema, FieldMapping};
    use crate::value::RowCell;

    fn field(
        incoming: &str,
        doc_path: &str,
        append: bool,
        op: ModifierOp,
        policy: ModifierPolicy,
    ) -> FieldMapping {
        FieldMapping {
            incoming_name: incoming.to_string(),
            doc_path: doc_path.to_string(),
            append_incoming_name: append,
            value_is_json_literal: false,
            is_match_field: false,
            modifier_op: op,
            modifier_policy: policy,
        }
    }

    fn match_field(incoming: &str, doc_path: &str) -> FieldMapping {
        let mut m = field(
            incoming,
            doc_path,
            false,
            ModifierOp::NotApplicable,
            ModifierPolicy::InsertAndUpdate,
        );
        m.is_match_field = true;
        m
    }

    #[test]
    fn s2_array_materialization_set() {
        let schema = CompiledSchema::compile(
            vec![
                field(
                    "field1",
                    "bob.fred[0].george",
                    true,
                    ModifierOp::Set,
                    ModifierPolicy::InsertAndUpdate,
                ),
                field(
                    "field2",
                    "bob.fred[0].george",
                    true,
                    ModifierOp::Set,
                    ModifierPolicy::InsertAndUpdate,
                ),
            ],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new()
            .with("field1", RowCell::String("v1".into()))
            .with("field2", RowCell::String("v2".into()));

        let update = build_update(&schema, &row, &AlwaysInsert).unwrap().unwrap();
        let expected = bson::doc! {
            "$set": { "bob.fred": [ { "george": { "field1": "v1", "field2": "v2" } } ] }
        };
        pretty_assertions::assert_eq!(update, expected);
        insta::assert_debug_snapshot!("s2_array_materialization_set", update);
    }

    #[test]
    fn s3_primitive_leaf_inc() {
        let schema = CompiledSchema::compile(
            vec![field(
                "qty",
                "stats.count",
                false,
                ModifierOp::Inc,
                ModifierPolicy::InsertAndUpdate,
            )],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new().with("qty", RowCell::Int64(3));

        let update = build_update(&schema, &row, &AlwaysInsert).unwrap().unwrap();
        assert_eq!(update, bson::doc! { "$inc": { "stats.count": 3_i64 } });
    }

    #[test]
    fn s4_push_complex_structure() {
        let schema = CompiledSchema::compile(
            vec![
                field(
                    "a",
                    "events[].kind",
                    false,
                    ModifierOp::Push,
                    ModifierPolicy::InsertAndUpdate,
                ),
                field(
                    "b",
                    "events[].ts",
                    false,
                    ModifierOp::Push,
                    ModifierPolicy::InsertAndUpdate,
                ),
            ],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new()
            .with("a", RowCell::String("login".into()))
            .with("b", RowCell::Int64(42));

        let update = build_update(&schema, &row, &AlwaysInsert).unwrap().unwrap();
        let expected = bson::doc! {
            "$push": { "events": { "kind": "login", "ts": 42_i64 } }
        };
        pretty_assertions::assert_eq!(update, expected);
        insta::assert_debug_snapshot!("s4_push_complex_structure", update);
    }

    #[test]
    fn push_with_bare_trailing_brackets_and_no_append_is_a_scalar_push() {
        // "events[]" with append=false and no further sub-path: rule (b)
        // strips the trailing bracket group, so P="events" has no bracket
        // left and falls through to the primitive-leaf bucket as a scalar
        // push rather than the complex-structure bucket.
        let schema = CompiledSchema::compile(
            vec![field(
                "tag",
                "tags[]",
                false,
                ModifierOp::Push,
                ModifierPolicy::InsertAndUpdate,
            )],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new().with("tag", RowCell::String("urgent".into()));

        let update = build_update(&schema, &row, &AlwaysInsert).unwrap().unwrap();
        assert_eq!(update, bson::doc! { "$push": { "tags": "urgent" } });
    }

    #[test]
    fn no_fields_survive_policy_is_an_error() {
        let schema = CompiledSchema::compile(
            vec![
                match_field("id", "_id"),
                field(
                    "x",
                    "p",
                    true,
                    ModifierOp::Set,
                    ModifierPolicy::Update,
                ),
            ],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new()
            .with("id", RowCell::Int64(1))
            .with("x", RowCell::String("v".into()));

        // AlwaysInsert -> is_update=false -> Update-policy mapping is skipped -> nothing survives.
        let result = build_update(&schema, &row, &AlwaysInsert);
        assert!(matches!(result, Err(Error::NoFieldsToUpdateSpecified)));
    }

    #[test]
    fn insert_policy_is_skipped_when_probe_reports_an_existing_document() {
        let schema = CompiledSchema::compile(
            vec![
                match_field("id", "_id"),
                field(
                    "created_at",
                    "createdAt",
                    false,
                    ModifierOp::Set,
                    ModifierPolicy::Insert,
                ),
                field(
                    "touched_at",
                    "touchedAt",
                    false,
                    ModifierOp::Set,
                    ModifierPolicy::InsertAndUpdate,
                ),
            ],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new()
            .with("id", RowCell::Int64(1))
            .with("created_at", RowCell::Int64(100))
            .with("touched_at", RowCell::Int64(200));

        let update = build_update(&schema, &row, &AlwaysUpdate).unwrap().unwrap();
        assert_eq!(update, bson::doc! { "$set": { "touchedAt": 200_i64 } });
    }

    #[test]
    fn match_fields_never_appear_in_the_modifier_document() {
        let schema = CompiledSchema::compile(
            vec![
                match_field("id", "_id"),
                field(
                    "x",
                    "p",
                    false,
                    ModifierOp::Set,
                    ModifierPolicy::InsertAndUpdate,
                ),
            ],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new()
            .with("id", RowCell::Int64(7))
            .with("x", RowCell::String("v".into()));

        let update = build_update(&schema, &row, &AlwaysInsert).unwrap().unwrap();
        assert_eq!(update, bson::doc! { "$set": { "p": "v" } });
        assert!(update.get_document("$set").unwrap().get("_id").is_none());
    }

    #[test]
    fn all_surviving_values_null_drops_the_row() {
        let schema = CompiledSchema::compile(
            vec![field(
                "x",
                "p",
                true,
                ModifierOp::Set,
                ModifierPolicy::InsertAndUpdate,
            )],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new().with("x", RowCell::Null);
        assert_eq!(build_update(&schema, &row, &AlwaysInsert).unwrap(), None);
    }

    #[test]
    fn not_applicable_op_never_contributes_a_modifier_key() {
        let schema = CompiledSchema::compile(
            vec![
                field(
                    "x",
                    "p",
                    false,
                    ModifierOp::NotApplicable,
                    ModifierPolicy::InsertAndUpdate,
                ),
                field(
                    "y",
                    "q",
                    false,
                    ModifierOp::Set,
                    ModifierPolicy::InsertAndUpdate,
                ),
            ],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new()
            .with("x", RowCell::String("ignored-by-modifier".into()))
            .with("y", RowCell::String("kept".into()));

        let update = build_update(&schema, &row, &AlwaysInsert).unwrap().unwrap();
        assert_eq!(update, bson::doc! { "$set": { "q": "kept" } });
    }
}
