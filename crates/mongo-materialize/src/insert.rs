//! Insert/Upsert Builder: walks every non-match mapping through the schema,
//! materializing a full replacement document for the row.

use crate::error::Result;
use crate::row::RowView;
use crate::schema::CompiledSchema;
use crate::tree::{effective_steps, empty_root, write};
use crate::value;
use bson::Bson;

/// Build the full insert/upsert document for one row.
///
/// Returns `Ok(None)` when every non-match cell was null: the row is
/// dropped silently rather than written.
pub fn build_document(schema: &CompiledSchema, row: &dyn RowView) -> Result<Option<Bson>> {
    let mut root = empty_root(schema.top_level);
    let mut wrote_any = false;

    for mapping in schema.non_match_fields() {
        let cell = match row.cell(&mapping.resolved_incoming_name) {
            Some(cell) => cell,
            None => continue,
        };
        let Some(bson) = value::coerce(
            &cell,
            &mapping.resolved_incoming_name,
            mapping.mapping.value_is_json_literal,
        )?
        else {
            continue; // Null cell: omitted, not an error.
        };

        let steps = effective_steps(mapping);
        write(&mut root, &steps, bson, &mapping.resolved_doc_path)?;
        wrote_any = true;
    }

    Ok(wrote_any.then_some(root))
}
