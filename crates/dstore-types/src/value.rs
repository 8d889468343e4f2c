use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The four scalar kinds a [`TypedValue`] can carry.
///
/// The numeric tag (`0..=3`) is the value persisted in the `type` column of
/// key-value tables, so the declaration order is part of the storage format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Float,
    Int,
    Bool,
}

impl ValueKind {
    /// Every kind, in tag order.
    pub const ALL: [ValueKind; 4] = [
        ValueKind::String,
        ValueKind::Float,
        ValueKind::Int,
        ValueKind::Bool,
    ];

    /// Persisted numeric tag.
    pub fn tag(self) -> u8 {
        match self {
            Self::String => 0,
            Self::Float => 1,
            Self::Int => 2,
            Self::Bool => 3,
        }
    }

    /// Inverse of [`ValueKind::tag`].
    pub fn from_tag(tag: i64) -> Result<Self, TypeError> {
        match tag {
            0 => Ok(Self::String),
            1 => Ok(Self::Float),
            2 => Ok(Self::Int),
            3 => Ok(Self::Bool),
            other => Err(TypeError::UnknownTag(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "float" => Ok(Self::Float),
            "int" | "integer" => Ok(Self::Int),
            "bool" | "boolean" => Ok(Self::Bool),
            _ => Err(TypeError::UnsupportedValue(format!("unknown value kind: {s}"))),
        }
    }
}

/// An immutable tagged scalar.
///
/// The payload always matches the kind: the enum makes any other state
/// unrepresentable. Equality and hashing are structural over
/// `(kind, payload)`; two floats compare equal when they are numerically
/// equal or both NaN.
///
/// Serialized form: `{"type": "Float", "value": 1.5}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TypedValue {
    String(String),
    Float(f32),
    Int(i32),
    Bool(bool),
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Float(_) => ValueKind::Float,
            Self::Int(_) => ValueKind::Int,
            Self::Bool(_) => ValueKind::Bool,
        }
    }

    /// The zero value of a kind: `""`, `0.0`, `0`, `false`.
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => Self::String(String::new()),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::Int => Self::Int(0),
            ValueKind::Bool => Self::Bool(false),
        }
    }

    pub fn as_str(&self) -> Result<&str, TypeError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }

    pub fn as_float(&self) -> Result<f32, TypeError> {
        match self {
            Self::Float(f) => Ok(*f),
            other => Err(other.mismatch(ValueKind::Float)),
        }
    }

    pub fn as_int(&self) -> Result<i32, TypeError> {
        match self {
            Self::Int(i) => Ok(*i),
            other => Err(other.mismatch(ValueKind::Int)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, TypeError> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.mismatch(ValueKind::Bool)),
        }
    }

    /// Consume the value, returning the owned string payload.
    pub fn into_string(self) -> Result<String, TypeError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }

    fn mismatch(&self, expected: ValueKind) -> TypeError {
        TypeError::TypeMismatch {
            expected,
            actual: self.kind(),
        }
    }

    /// Build a value from an untyped JSON scalar.
    ///
    /// Strings, booleans, and numbers map to `String`, `Bool`, and `Int`
    /// (integral and within `i32`) or `Float`. When `expected` is given the
    /// mapped kind must equal it.
    pub fn from_json(
        value: &serde_json::Value,
        expected: Option<ValueKind>,
    ) -> Result<Self, TypeError> {
        use serde_json::Value;

        let mapped = match value {
            Value::String(s) => Self::String(s.clone()),
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    let i = i32::try_from(i).map_err(|_| {
                        TypeError::UnsupportedValue(format!("integer out of range: {i}"))
                    })?;
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f as f32)
                } else {
                    return Err(TypeError::UnsupportedValue(format!("number: {n}")));
                }
            }
            Value::Null => return Err(TypeError::UnsupportedValue("null".into())),
            Value::Array(_) => return Err(TypeError::UnsupportedValue("array".into())),
            Value::Object(_) => return Err(TypeError::UnsupportedValue("object".into())),
        };

        match expected {
            Some(kind) if kind != mapped.kind() => Err(TypeError::TypeMismatch {
                expected: kind,
                actual: mapped.kind(),
            }),
            _ => Ok(mapped),
        }
    }

    /// The bare JSON scalar for this value (no type tag).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::from(s.as_str()),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Bool(b) => serde_json::Value::from(*b),
        }
    }

    /// Text form used by text-typed storage columns.
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Float(f) => f.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    /// Strict text decode: fails if `text` is not a valid literal of `kind`.
    ///
    /// Booleans are matched case-insensitively (`true`, `True`, `TRUE`).
    pub fn parse(text: &str, kind: ValueKind) -> Result<Self, TypeError> {
        let unparseable = || TypeError::Unparseable {
            text: text.to_string(),
            kind,
        };
        match kind {
            ValueKind::String => Ok(Self::String(text.to_string())),
            ValueKind::Float => text.trim().parse().map(Self::Float).map_err(|_| unparseable()),
            ValueKind::Int => text.trim().parse().map(Self::Int).map_err(|_| unparseable()),
            ValueKind::Bool => parse_bool(text).map(Self::Bool).ok_or_else(unparseable),
        }
    }

    /// Lenient text decode: malformed input yields the kind's zero value.
    ///
    /// Also accepts `1` / `0` for booleans.
    pub fn parse_lenient(text: &str, kind: ValueKind) -> Self {
        if kind == ValueKind::Bool {
            return match text.trim() {
                "1" => Self::Bool(true),
                "0" => Self::Bool(false),
                other => Self::Bool(parse_bool(other).unwrap_or(false)),
            };
        }
        Self::parse(text, kind).unwrap_or_else(|_| Self::default_for(kind))
    }
}

/// Case-insensitive `true` / `false`.
pub fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn canonical_float_bits(f: f32) -> u32 {
    if f.is_nan() {
        f32::NAN.to_bits()
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypedValue {}

impl Hash for TypedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::String(s) => s.hash(state),
            Self::Float(f) => canonical_float_bits(*f).hash(state),
            Self::Int(i) => i.hash(state),
            Self::Bool(b) => b.hash(state),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.to_text()),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f32> for TypedValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
