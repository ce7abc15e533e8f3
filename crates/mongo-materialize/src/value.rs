//! Typed incoming cell values, and their coercion into `bson::Bson`.

use crate::error::{Error, Result};
use bigdecimal::BigDecimal;
use bson::Bson;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A single typed value read from a row, for one column.
///
/// This is the crate's own union rather than `bson::Bson` directly: it must
/// express strictly more source shapes than BSON accepts verbatim (a
/// `BigDecimal` is coerced to a string, never passed through as a
/// `Decimal128`) and a `Null` cell never reaches BSON at all, since nulls
/// are omitted rather than written.
#[derive(Debug, Clone, PartialEq)]
pub enum RowCell {
    String(String),
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Date(DateTime<Utc>),
    Bytes(Bytes),
    BigDecimal(BigDecimal),
    /// An opaque, non-primitive value the host framework couldn't type
    /// further (e.g. a serialized blob it doesn't understand). Always a
    /// coercion error (`CantStoreSerializable`) unless the cell is skipped
    /// because a sibling column renders the row moot.
    Serializable,
    Null,
}

/// Coerce a cell to a `Bson` value.
///
/// Returns `Ok(None)` for `Null` (the caller omits the field entirely,
/// since no produced document may carry a null leaf). `incoming_name` is
/// only used to annotate coercion errors.
pub fn coerce(
    cell: &RowCell,
    incoming_name: &str,
    value_is_json_literal: bool,
) -> Result<Option<Bson>> {
    let bson = match cell {
        RowCell::Null => return Ok(None),
        RowCell::String(s) if value_is_json_literal => {
            let parsed: serde_json::Value =
                serde_json::from_str(s).map_err(|source| Error::InvalidJsonLiteral {
                    incoming_name: incoming_name.to_string(),
                    source,
                })?;
            bson::to_bson(&parsed).map_err(|source| Error::LiteralNotBson {
                incoming_name: incoming_name.to_string(),
                source,
            })?
        }
        RowCell::String(s) => Bson::String(s.clone()),
        RowCell::Bool(b) => Bson::Boolean(*b),
        RowCell::Int64(i) => Bson::Int64(*i),
        RowCell::Float64(f) => Bson::Double(*f),
        RowCell::Date(dt) => Bson::DateTime(bson::DateTime::from_chrono(*dt)),
        RowCell::Bytes(bytes) => Bson::Binary(bson::Binary {
            subtype: bson::spec::BinarySubtype::Generic,
            bytes: bytes.to_vec(),
        }),
        RowCell::BigDecimal(d) => Bson::String(d.to_string()),
        RowCell::Serializable => {
            return Err(Error::CantStoreSerializable {
                incoming_name: incoming_name.to_string(),
            })
        }
    };
    Ok(Some(bson))
}
