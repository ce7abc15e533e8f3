//! Index management adjunct. Parses `pathToFields` index-spec tokens and
//! plans create/drop actions against the target collection. Pure data and
//! a pure planning function; the actual RPC is delegated to an injected
//! [`IndexManager`], matching the core's general rule of keeping I/O at
//! the seams.

use crate::error::{Error, Result};
use bson::Document;
use serde::{Deserialize, Serialize};

/// Default MongoDB wire port, reproduced here only for documentation/
/// wire-compatibility purposes; the core never opens a connection itself.
pub const DEFAULT_PORT: u16 = 27017;

/// Replica-set discovery reads custom durability mode definitions from
/// `local.system.replset`'s `settings.getLastErrorModes` subtree. These are
/// pure data, exposed as module-level constants with no lifecycle.
pub const REPLICA_SET_DATABASE: &str = "local";
pub const REPLICA_SET_COLLECTION: &str = "system.replset";
pub const GET_LAST_ERROR_MODES_PATH: &str = "settings.getLastErrorModes";

/// One requested index, as configured by the host step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Comma-separated `name[:dir]` tokens, `dir` in `{1, -1}`, default `1`.
    /// E.g. `"lastName,age:-1"`.
    pub path_to_fields: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
    /// When `true`, this spec describes an index to drop rather than
    /// create.
    #[serde(default)]
    pub drop: bool,
}

/// Parse `pathToFields` into ordered `(field, direction)` pairs.
fn parse_fields(spec: &str) -> Result<Vec<(String, i8)>> {
    let mut fields = Vec::new();
    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::EmptyIndexFields);
        }
        match token.split_once(':') {
            Some((name, dir)) => {
                let direction = match dir {
                    "1" => 1,
                    "-1" => -1,
                    other => {
                        return Err(Error::InvalidIndexDirection {
                            spec: spec.to_string(),
                            token: other.to_string(),
                        })
                    }
                };
                fields.push((name.to_string(), direction));
            }
            None => fields.push((token.to_string(), 1)),
        }
    }
    if fields.is_empty() {
        return Err(Error::EmptyIndexFields);
    }
    Ok(fields)
}

/// Build the `{field: direction, …}` key document MongoDB's
/// `createIndex`/`dropIndex` expect, preserving field order (index key
/// order is significant).
pub fn build_keys(spec: &IndexSpec) -> Result<Document> {
    let fields = parse_fields(&spec.path_to_fields)?;
    let mut keys = Document::new();
    for (name, direction) in fields {
        keys.insert(name, direction as i32);
    }
    Ok(keys)
}

/// The collaborator that actually issues `createIndex`/`dropIndex` calls.
/// Kept as an injected trait (not a direct `tracing` call like the Logger
/// contract) because the core needs to swap or mock the backing
/// collection handle.
pub trait IndexManager {
    fn create_index(&self, keys: &Document, unique: bool, sparse: bool) -> Result<(), String>;
    fn drop_index(&self, keys: &Document) -> Result<(), String>;
}

/// Apply every index spec in order. If `collection_was_truncated` is
/// `true`, drop operations are skipped entirely: if the collection was
/// truncated in the same run, a drop would be redundant.
pub fn apply_all(
    specs: &[IndexSpec],
    collection_was_truncated: bool,
    manager: &dyn IndexManager,
) -> Result<()> {
    for spec in specs {
        let keys = build_keys(spec)?;
        if spec.drop {
            if collection_was_truncated {
                tracing::info!(?keys, "skipping index drop: collection was truncated this run");
                continue;
            }
            tracing::info!(?keys, "dropping index");
            manager
                .drop_index(&keys)
                .map_err(Error::IndexOperationFailed)?;
        } else {
            tracing::info!(?keys, unique = spec.unique, sparse = spec.sparse, "creating index");
            manager
                .create_index(&keys, spec.unique, spec.sparse)
                .map_err(Error::IndexOperationFailed)?;
        }
    }
    Ok(())
}
