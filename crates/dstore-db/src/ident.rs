use std::fmt;

use crate::error::{DbError, DbResult};

/// A table or column name that is safe to interpolate into SQL text.
///
/// Only ASCII letters, digits and `_` are accepted. Values are always bound
/// as parameters; identifiers are the only text spliced into statements, and
/// every one of them passes through this type first.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SqlIdentifier(String);

impl SqlIdentifier {
    pub fn new(name: impl Into<String>) -> DbResult<Self> {
        let name = name.into();
        if is_valid_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(DbError::InvalidIdentifier { name })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for use in statements.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for SqlIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `[A-Za-z0-9_]+`
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
