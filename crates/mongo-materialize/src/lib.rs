//! The row-to-document transformation core of a MongoDB materialization
//! step: given a stream of typed [`row::RowView`]s and a declarative
//! field-mapping [`schema::CompiledSchema`], produces per row a full
//! insert/upsert document ([`insert`]), a query document ([`query`]), and/
//! or a modifier update document ([`modifier`]).
//!
//! Establishing the connection, the write RPC, write-concern handling, and
//! the surrounding step lifecycle are out of scope (owned by the host);
//! this crate is invoked only through the narrow collaborator contracts in
//! [`row`], [`interpolate`], [`probe`], and [`index`].

mod error;
mod index;
mod insert;
mod interpolate;
mod modifier;
mod path;
mod probe;
mod query;
mod row;
mod schema;
mod tree;
mod value;

pub use error::{Error, Result};
pub use index::{
    apply_all as apply_index_specs, build_keys as build_index_keys, IndexManager, IndexSpec,
    DEFAULT_PORT, GET_LAST_ERROR_MODES_PATH, REPLICA_SET_COLLECTION, REPLICA_SET_DATABASE,
};
pub use insert::build_document as build_insert_document;
pub use interpolate::{NoopInterpolator, VariableInterpolator};
pub use modifier::build_update as build_modifier_update;
pub use path::Step;
pub use probe::{AlwaysInsert, AlwaysUpdate, ExistenceProbe};
pub use query::build_query;
pub use row::{MapRow, RowView};
pub use schema::{CompiledMapping, CompiledSchema, FieldMapping, ModifierOp, ModifierPolicy, TopLevel};
pub use value::{coerce as coerce_cell, RowCell};
