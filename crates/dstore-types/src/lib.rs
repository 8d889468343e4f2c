//! Foundation types for dstore.
//!
//! Every other dstore crate depends on `dstore-types`.
//!
//! # Key Types
//!
//! - [`TypedValue`] -- immutable tagged scalar (string, float, int, bool)
//! - [`ValueKind`] -- the tag of a [`TypedValue`], with a stable numeric form
//! - [`Identity`] -- validated 40-hex-digit principal identity used to
//!   partition persisted data

pub mod error;
pub mod identity;
pub mod value;

pub use error::TypeError;
pub use identity::{Identity, IDENTITY_HEX_LEN, IDENTITY_PREFIX};
pub use value::{parse_bool, TypedValue, ValueKind};
