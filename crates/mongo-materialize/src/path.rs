//! Parses the dot-notation / bracket-index path dialect used by
//! [`crate::schema::FieldMapping::doc_path`] into an ordered list of
//! navigation steps.
//!
//! Grounded on `json::ptr::Pointer::from_str`/`Token`: a small hand-rolled
//! parser over `&str`, no regex. Unlike a JSON Pointer, our grammar mixes a
//! leading object-key name with zero or more trailing bracket groups within
//! the same segment (`name[0][2]`), so the token stream isn't quite
//! Pointer's one-token-per-slash-group shape.

use crate::error::{Error, Result};

/// A single navigation step compiled from a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Descend into (or create) an object field by name.
    Object(String),
    /// Index into (or extend) the array directly reached by the previous
    /// step.
    Index(usize),
    /// A second (or later) bracket group within the same segment: indexes
    /// into an array that is itself an element of the array reached by the
    /// prior `Index` step (multi-dimensional arrays, `a[0][2]`).
    ArrayOfArray(usize),
}

/// Compile `doc_path` into an ordered list of steps.
///
/// `append_incoming_name` only affects validation here: an empty path is
/// only legal when the incoming column name will be appended as the final
/// segment by the caller (see [`crate::schema::FieldMapping`]).
pub fn compile(doc_path: &str, append_incoming_name: bool) -> Result<Vec<Step>> {
    if doc_path.is_empty() {
        return if append_incoming_name {
            Ok(Vec::new())
        } else {
            Err(Error::NoLeafName)
        };
    }

    let mut steps = Vec::new();
    for segment in doc_path.split('.') {
        compile_segment(doc_path, segment, &mut steps)?;
    }
    Ok(steps)
}

/// Compile a single `.`-delimited segment, which is a name optionally
/// followed by one or more `[int]` bracket groups, or a bare `[int]`.
fn compile_segment(full_path: &str, segment: &str, steps: &mut Vec<Step>) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::EmptySegment {
            path: full_path.to_string(),
        });
    }

    let bracket_start = segment.find('[');
    let (name, mut rest) = match bracket_start {
        Some(i) => (&segment[..i], &segment[i..]),
        None => (segment, ""),
    };

    if !name.is_empty() {
        steps.push(Step::Object(name.to_string()));
    } else if rest.is_empty() {
        // A lone "." with nothing either side.
        return Err(Error::EmptySegment {
            path: full_path.to_string(),
        });
    }

    let mut first_bracket = true;
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(Error::UnbalancedBrackets {
                path: full_path.to_string(),
            });
        }
        let close = rest.find(']').ok_or_else(|| Error::UnbalancedBrackets {
            path: full_path.to_string(),
        })?;
        let inner = &rest[1..close];
        let index: usize = inner.parse().map_err(|_| Error::NonIntegerIndex {
            path: full_path.to_string(),
            segment: inner.to_string(),
        })?;

        if first_bracket {
            steps.push(Step::Index(index));
        } else {
            steps.push(Step::ArrayOfArray(index));
        }
        first_bracket = false;
        rest = &rest[close + 1..];
    }

    Ok(())
}

/// Flatten any `[i]` bracket groups in a raw path string to dot notation:
/// `a[0].b[1]` -> `a.0.b.1`. Used by the Query Builder (always) and by the
/// Modifier Builder's primitive-leaf bucket.
pub fn flatten_to_dots(raw_path: &str) -> String {
    let mut out = String::with_capacity(raw_path.len());
    for ch in raw_path.chars() {
        match ch {
            '[' => {
                if !out.is_empty() && !out.ends_with('.') {
                    out.push('.');
                }
            }
            ']' => {}
            c => out.push(c),
        }
    }
    out
}

/// Append `incoming_name` as a final dotted segment of `doc_path`, per
/// `appendIncomingName=true`. Used by the Query Builder and the Modifier
/// Builder, which both resolve a path as a raw string rather than as
/// compiled `Step`s.
pub fn append_incoming_name(doc_path: &str, incoming_name: &str) -> String {
    if doc_path.is_empty() {
        incoming_name.to_string()
    } else {
        format!("{doc_path}.{incoming_name}")
    }
}

/// Strip a single trailing bracket group (`"events[]"` -> `"events"`,
/// `"events[0]"` -> `"events"`) from a raw path string, if present.
/// Used only by the Modifier Builder's `$push` resolution.
pub fn strip_trailing_bracket_group(raw_path: &str) -> Option<&str> {
    if !raw_path.ends_with(']') {
        return None;
    }
    let open = raw_path.rfind('[')?;
    Some(&raw_path[..open])
}
