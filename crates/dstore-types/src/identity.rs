use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Textual prefix carried by the prefixed identity form.
pub const IDENTITY_PREFIX: &str = "license:";

/// Number of hex digits in an identity.
pub const IDENTITY_HEX_LEN: usize = 40;

/// A principal identity: exactly 40 hex digits, optionally written with the
/// [`IDENTITY_PREFIX`].
///
/// Identities partition all persisted per-principal data. Input is
/// lower-cased on parse, so two spellings of the same digits compare equal.
/// The all-zero identity ([`Identity::global`]) is reserved for data that
/// belongs to no specific principal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    digits: String,
}

impl Identity {
    /// Parse an identity in either textual form.
    ///
    /// When `expect_prefixed` is set, the observed form must agree with it.
    pub fn parse(text: &str, expect_prefixed: Option<bool>) -> Result<Self, TypeError> {
        if text.is_empty() {
            return Err(TypeError::InvalidFormat("identity must not be empty".into()));
        }

        let lowered = text.to_ascii_lowercase();
        let (has_prefix, digits) = match lowered.strip_prefix(IDENTITY_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, lowered.as_str()),
        };

        if digits.len() != IDENTITY_HEX_LEN || hex::decode(digits).is_err() {
            return Err(TypeError::InvalidFormat(format!(
                "expected {IDENTITY_HEX_LEN} hex digits, optionally prefixed with {IDENTITY_PREFIX:?}, got {text:?}"
            )));
        }

        if let Some(expected) = expect_prefixed {
            if expected != has_prefix {
                return Err(TypeError::FormatMismatch {
                    expected,
                    observed: has_prefix,
                });
            }
        }

        Ok(Self {
            digits: digits.to_string(),
        })
    }

    /// The reserved identity for global, non-principal data.
    pub fn global() -> Self {
        Self {
            digits: "0".repeat(IDENTITY_HEX_LEN),
        }
    }

    pub fn is_global(&self) -> bool {
        self.digits.bytes().all(|b| b == b'0')
    }

    /// The 40 hex digits without prefix.
    pub fn unprefixed(&self) -> &str {
        &self.digits
    }

    /// `license:` followed by the digits.
    pub fn prefixed(&self) -> String {
        format!("{IDENTITY_PREFIX}{}", self.digits)
    }

    /// Textual form selected by a flag, as used for partition keys.
    pub fn to_text(&self, prefixed: bool) -> String {
        if prefixed {
            self.prefixed()
        } else {
            self.digits.clone()
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.prefixed())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed())
    }
}

impl FromStr for Identity {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, None)
    }
}

impl TryFrom<String> for Identity {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value, None)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.prefixed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGITS: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn prefixed_parses_to_unprefixed() {
        let id = Identity::parse(&format!("license:{DIGITS}"), None).unwrap();
        assert_eq!(id.unprefixed(), DIGITS);
        assert_eq!(id.prefixed(), format!("license:{DIGITS}"));
    }

    #[test]
    fn both_forms_are_equal() {
        let a = Identity::parse(DIGITS, None).unwrap();
        let b = Identity::parse(&format!("license:{DIGITS}"), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn input_is_lowercased() {
        let id = Identity::parse(&DIGITS.to_uppercase(), None).unwrap();
        assert_eq!(id.unprefixed(), DIGITS);
        let id = Identity::parse(&format!("LICENSE:{DIGITS}"), Some(true)).unwrap();
        assert_eq!(id.unprefixed(), DIGITS);
    }

    #[test]
    fn wrong_length_is_invalid() {
        let short = &DIGITS[..39];
        let long = format!("{DIGITS}0");
        assert!(matches!(Identity::parse(short, None), Err(TypeError::InvalidFormat(_))));
        assert!(matches!(Identity::parse(&long, None), Err(TypeError::InvalidFormat(_))));
    }

    #[test]
    fn non_hex_is_invalid() {
        let bad = format!("{}g", &DIGITS[..39]);
        assert!(matches!(Identity::parse(&bad, None), Err(TypeError::InvalidFormat(_))));
        assert!(matches!(Identity::parse("", None), Err(TypeError::InvalidFormat(_))));
        assert!(matches!(
            Identity::parse(&format!("steam:{DIGITS}"), None),
            Err(TypeError::InvalidFormat(_))
        ));
    }

    #[test]
    fn surrounding_whitespace_is_invalid() {
        for padded in [format!(" {DIGITS}"), format!("{DIGITS}\n"), format!(" license:{DIGITS} ")] {
            assert!(matches!(Identity::parse(&padded, None), Err(TypeError::InvalidFormat(_))));
        }
    }

    #[test]
    fn prefix_expectation_enforced() {
        let err = Identity::parse(DIGITS, Some(true)).unwrap_err();
        assert_eq!(err, TypeError::FormatMismatch { expected: true, observed: false });
        let err = Identity::parse(&format!("license:{DIGITS}"), Some(false)).unwrap_err();
        assert_eq!(err, TypeError::FormatMismatch { expected: false, observed: true });
        assert!(Identity::parse(DIGITS, Some(false)).is_ok());
    }

    #[test]
    fn global_identity_is_all_zero() {
        let g = Identity::global();
        assert!(g.is_global());
        assert_eq!(g.unprefixed(), "0".repeat(40));
        assert_eq!(Identity::parse(&g.prefixed(), Some(true)).unwrap(), g);
        assert!(!Identity::parse(DIGITS, None).unwrap().is_global());
    }

    #[test]
    fn serde_uses_prefixed_text() {
        let id = Identity::parse(DIGITS, None).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"license:{DIGITS}\""));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<Identity>("\"nope\"").is_err());
    }
}
