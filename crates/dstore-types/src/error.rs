use thiserror::Error;

use crate::value::ValueKind;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: ValueKind, actual: ValueKind },

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("cannot parse {text:?} as {kind}")]
    Unparseable { text: String, kind: ValueKind },

    #[error("unknown value type tag: {0}")]
    UnknownTag(i64),

    #[error("invalid identity format: {0}")]
    InvalidFormat(String),

    #[error("identity prefix mismatch: expected prefixed = {expected}, got prefixed = {observed}")]
    FormatMismatch { expected: bool, observed: bool },
}
