use dstore_types::ValueKind;

/// Errors from relational persistence.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A table or column name is not a safe SQL identifier.
    #[error("invalid SQL identifier: {name:?}")]
    InvalidIdentifier { name: String },

    /// A key that is not a declared column of a columnar table.
    #[error("table {table} has no column {column}")]
    UnknownColumn { table: String, column: String },

    /// A value whose kind differs from the column's declared kind.
    #[error("column {column} holds {expected} values, got {actual}")]
    KindMismatch {
        column: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// NaN or infinity written to a `REAL` column, which cannot hold it.
    #[error("column {column} cannot store non-finite float {value}")]
    NonFiniteFloat { column: String, value: f32 },

    /// A table definition that cannot be built.
    #[error("invalid table definition: {0}")]
    Config(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type DbResult<T> = Result<T, DbError>;
