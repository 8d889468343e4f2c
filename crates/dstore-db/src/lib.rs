//! Relational persistence for typed key-value data.
//!
//! Data is partitioned by identity and stored in SQLite through a pooled
//! [`Database`]. Two layouts implement the [`RemoteTable`] trait:
//!
//! - [`EavTable`] -- one row per `(identity, key)` carrying the value text
//!   and a numeric type tag
//! - [`ColumnarTable`] -- one row per identity, one column per declared key,
//!   each column typed by its declared [`ValueKind`](dstore_types::ValueKind)
//!
//! # Safety of dynamic SQL
//!
//! Table and column names are spliced into statement text, so every one is
//! wrapped in a [`SqlIdentifier`] (`[A-Za-z0-9_]+`) when a schema is built.
//! An unsafe name fails construction; it never reaches a query. Values are
//! always bound as parameters.

pub mod columnar;
pub mod config;
pub mod database;
pub mod eav;
pub mod error;
pub mod ident;
pub mod table;

pub use columnar::{ColumnDef, ColumnarSchema, ColumnarTable};
pub use config::{ColumnConfig, ColumnarLayout, KeyValueLayout, TableConfig};
pub use database::{Database, DatabaseConfig, DEFAULT_MAX_CONNECTIONS};
pub use eav::{EavSchema, EavTable};
pub use error::{DbError, DbResult};
pub use ident::{is_valid_identifier, SqlIdentifier};
pub use table::RemoteTable;
