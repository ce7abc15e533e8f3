//! The row collaborator contract: metadata lookups and typed accessors are
//! folded into a single method, since every caller in this core always
//! wants type, null-ness, and value together.

use crate::value::RowCell;

/// A read-only view of one incoming row.
///
/// Implemented by the host data-integration framework; this crate only
/// consumes it.
pub trait RowView {
    /// Look up the cell for the named incoming column. Returns `None` if
    /// the row has no such column at all (as opposed to a `Null` cell,
    /// which is a column that exists but carries no value).
    fn cell(&self, incoming_name: &str) -> Option<RowCell>;
}

/// A `RowView` over an owned, order-independent set of named cells.
/// Handy for tests and for simple in-memory callers.
#[derive(Debug, Clone, Default)]
pub struct MapRow(pub std::collections::BTreeMap<String, RowCell>);

impl MapRow {
    pub fn new() -> Self {
        Self(std::collections::BTreeMap::new())
    }

    pub fn with(mut self, name: impl Into<String>, cell: RowCell) -> Self {
        self.0.insert(name.into(), cell);
        self
    }
}

impl RowView for MapRow {
    fn cell(&self, incoming_name: &str) -> Option<RowCell> {
        self.0.get(incoming_name).cloned()
    }
}
