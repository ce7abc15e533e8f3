//! Materializes a nested `bson::Bson` document tree from compiled paths.
//! Shared by the Insert/Upsert Builder proper and by the Modifier Builder's
//! complex-array/complex-structure buckets, which build a sub-tree the same
//! way over a sub-path.
//!
//! Grounded on `json::ptr::create_value`, generalized from `serde_json::Value`
//! to `bson::Bson` and from lenient reinterpretation to hard `TypeConflict`
//! errors: reusing the same prefix across mappings must resolve to the same
//! kind or the row fails.

use crate::error::{Error, Result};
use crate::path::Step;
use crate::schema::{CompiledMapping, TopLevel};
use bson::{Bson, Document};

/// An empty root node of the given shape.
pub fn empty_root(top_level: TopLevel) -> Bson {
    match top_level {
        TopLevel::Record => Bson::Document(Document::new()),
        TopLevel::Array => Bson::Array(Vec::new()),
    }
}

/// The steps a mapping actually navigates, including the final
/// `incomingName` segment when `appendIncomingName` is set (the compiler
/// never bakes the incoming name into the compiled steps itself).
pub fn effective_steps(compiled: &CompiledMapping) -> Vec<Step> {
    let mut steps = compiled.steps.clone();
    if compiled.mapping.append_incoming_name {
        steps.push(Step::Object(compiled.resolved_incoming_name.clone()));
    }
    steps
}

/// Write `value` at `steps` within `root`, materializing any missing
/// intermediate object/array nodes. `path_desc` is used only to annotate
/// type-conflict errors.
pub fn write(root: &mut Bson, steps: &[Step], value: Bson, path_desc: &str) -> Result<()> {
    let (step, rest) = steps
        .split_first()
        .expect("effective_steps is never empty for a value-bearing mapping");
    let is_terminal = rest.is_empty();

    match step {
        Step::Object(name) => {
            let doc = as_document_mut(root, path_desc)?;
            if is_terminal {
                doc.insert(name.clone(), value);
                return Ok(());
            }
            let next_is_list = matches!(rest[0], Step::Index(_) | Step::ArrayOfArray(_));
            let child = doc
                .entry(name.clone())
                .or_insert_with(|| empty_for(next_is_list));
            write(child, rest, value, path_desc)
        }
        Step::Index(idx) | Step::ArrayOfArray(idx) => {
            let arr = as_array_mut(root, path_desc)?;
            ensure_len(arr, *idx);
            if is_terminal {
                arr[*idx] = value;
                return Ok(());
            }
            let next_is_list = matches!(rest[0], Step::ArrayOfArray(_));
            if matches!(arr[*idx], Bson::Null) {
                arr[*idx] = empty_for(next_is_list);
            }
            write(&mut arr[*idx], rest, value, path_desc)
        }
    }
}

fn empty_for(is_list: bool) -> Bson {
    if is_list {
        Bson::Array(Vec::new())
    } else {
        Bson::Document(Document::new())
    }
}

fn ensure_len(arr: &mut Vec<Bson>, idx: usize) {
    if arr.len() <= idx {
        arr.resize(idx + 1, Bson::Null);
    }
}

fn as_document_mut<'a>(node: &'a mut Bson, path_desc: &str) -> Result<&'a mut Document> {
    match node {
        Bson::Document(d) => Ok(d),
        _ => Err(Error::FieldExistsButIsntARecord {
            prefix: path_desc.to_string(),
        }),
    }
}

fn as_array_mut<'a>(node: &'a mut Bson, path_desc: &str) -> Result<&'a mut Vec<Bson>> {
    match node {
        Bson::Array(a) => Ok(a),
        _ => Err(Error::FieldExistsButIsntAnArray {
            prefix: path_desc.to_string(),
        }),
    }
}
