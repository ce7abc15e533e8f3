/// Errors produced while compiling a [`crate::schema::FieldMapping`] schema
/// or while building a document, query, or modifier update for a row.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("path '{path}' has unbalanced brackets")]
    UnbalancedBrackets { path: String },

    #[error("path '{path}' has a non-integer array index '{segment}'")]
    NonIntegerIndex { path: String, segment: String },

    #[error("path '{path}' has an empty segment")]
    EmptySegment { path: String },

    #[error("mapping has an empty path and appendIncomingName=false, so it has no target name")]
    NoLeafName,

    #[error(
        "field mappings disagree on the document's top-level structure: \
         {record_count} resolve to an object root and {array_count} resolve to an array root"
    )]
    InconsistentTopLevel {
        record_count: usize,
        array_count: usize,
    },

    #[error("field at '{prefix}' already exists and isn't a record")]
    FieldExistsButIsntARecord { prefix: String },

    #[error("field at '{prefix}' already exists and isn't an array")]
    FieldExistsButIsntAnArray { prefix: String },

    #[error("no field mapping is marked as a match field")]
    NoMatchFields,

    #[error("no field mapping survived the apply-policy check; nothing to update")]
    NoFieldsToUpdateSpecified,

    #[error("cannot store an opaque/serializable cell value for incoming field '{incoming_name}'")]
    CantStoreSerializable { incoming_name: String },

    #[error("value for incoming field '{incoming_name}' was marked as a JSON literal but failed to parse: {source}")]
    InvalidJsonLiteral {
        incoming_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON literal for incoming field '{incoming_name}' could not be converted to BSON: {source}")]
    LiteralNotBson {
        incoming_name: String,
        #[source]
        source: bson::ser::Error,
    },

    #[error("index spec '{spec}' has an invalid direction token '{token}' (expected 1 or -1)")]
    InvalidIndexDirection { spec: String, token: String },

    #[error("index spec has an empty field list")]
    EmptyIndexFields,

    #[error("existence probe failed: {0}")]
    ExistenceProbeFailed(String),

    #[error("index operation failed: {0}")]
    IndexOperationFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
