//! The existence-probe collaborator: a single bounded read used by the
//! Modifier Builder's policy preamble to decide insert-vs-update.
//!
//! This is the only I/O the core itself performs; everything else is
//! delegated to the surrounding step. Kept as an injected trait (rather
//! than `tracing`-style direct calls, cf. the Logger contract) because the
//! core genuinely needs to swap or mock the backing store in tests.

use bson::Document;

/// A bounded `findOne`-style existence check against the target collection.
pub trait ExistenceProbe {
    /// Returns `true` if at least one document matches `query`.
    ///
    /// Implementations should apply `limit(1)` server-side; the core only
    /// ever needs a boolean, never the matched document.
    fn find_one(&self, query: &Document) -> Result<bool, String>;
}

/// A probe that never finds a match. Handy for tests and for callers who
/// only ever use `Insert&Update` policies (where the probe is never
/// consulted at all).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysInsert;

impl ExistenceProbe for AlwaysInsert {
    fn find_one(&self, _query: &Document) -> Result<bool, String> {
        Ok(false)
    }
}

/// A probe that always reports a match. Handy for exercising `Update`-only
/// policy mappings in tests without a real collection handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUpdate;

impl ExistenceProbe for AlwaysUpdate {
    fn find_one(&self, _query: &Document) -> Result<bool, String> {
        Ok(true)
    }
}
