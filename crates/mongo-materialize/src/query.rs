//! Query Builder: the match document for an upsert/update, built as a flat
//! map of dotted paths rather than a nested tree. This is how MongoDB query
//! documents address array elements and nested fields.

use crate::error::{Error, Result};
use crate::path;
use crate::row::RowView;
use crate::schema::CompiledSchema;
use crate::value;
use bson::Document;

/// Build the match document for one row.
///
/// Fails with [`Error::NoMatchFields`] if the schema has no match-field
/// mappings at all. Returns `Ok(None)` if every match cell was null (the
/// row is dropped by the caller).
pub fn build_query(schema: &CompiledSchema, row: &dyn RowView) -> Result<Option<Document>> {
    let mut match_fields = schema.match_fields().peekable();
    if match_fields.peek().is_none() {
        return Err(Error::NoMatchFields);
    }

    let mut doc = Document::new();
    for mapping in match_fields {
        let Some(cell) = row.cell(&mapping.resolved_incoming_name) else {
            continue;
        };
        let Some(bson) = value::coerce(
            &cell,
            &mapping.resolved_incoming_name,
            mapping.mapping.value_is_json_literal,
        )?
        else {
            continue;
        };

        let raw = if mapping.mapping.append_incoming_name {
            path::append_incoming_name(&mapping.resolved_doc_path, &mapping.resolved_incoming_name)
        } else {
            mapping.resolved_doc_path.clone()
        };
        doc.insert(path::flatten_to_dots(&raw), bson);
    }

    Ok((!doc.is_empty()).then_some(doc))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interpolate::NoopInterpolator;
    use crate::row::MapRow;
    use crate::schema::{CompiledSchema, FieldMapping, ModifierOp, ModifierPolicy};
    use crate::value::RowCell;

    fn match_mapping(incoming: &str, doc_path: &str, append: bool) -> FieldMapping {
        FieldMapping {
            incoming_name: incoming.to_string(),
            doc_path: doc_path.to_string(),
            append_incoming_name: append,
            value_is_json_literal: false,
            is_match_field: true,
            modifier_op: ModifierOp::NotApplicable,
            modifier_policy: ModifierPolicy::InsertAndUpdate,
        }
    }

    #[test]
    fn flattens_bracket_paths_to_dots() {
        let schema =
            CompiledSchema::compile(vec![match_mapping("id", "a[0].b[1]", false)], &NoopInterpolator)
                .unwrap();
        let row = MapRow::new().with("id", RowCell::Int64(5));
        let doc = build_query(&schema, &row).unwrap().unwrap();
        assert_eq!(doc, bson::doc! { "a.0.b.1": 5_i64 });
    }

    #[test]
    fn no_match_fields_is_an_error() {
        let schema = CompiledSchema::compile(
            vec![{
                let mut m = match_mapping("x", "x", true);
                m.is_match_field = false;
                m
            }],
            &NoopInterpolator,
        )
        .unwrap();
        let row = MapRow::new();
        assert!(matches!(build_query(&schema, &row), Err(Error::NoMatchFields)));
    }

    #[test]
    fn all_null_match_cells_drop_the_row() {
        let schema =
            CompiledSchema::compile(vec![match_mapping("id", "id", true)], &NoopInterpolator)
                .unwrap();
        let row = MapRow::new().with("id", RowCell::Null);
        assert_eq!(build_query(&schema, &row).unwrap(), None);
    }
}
