//! Call-site identity.
//!
//! A call site is either a raw numeric address or an already-resolved symbol
//! name. The interval store hands us loosely typed values, so the only way in
//! is the fallible conversion from [`RawValue`].

use crate::utils::error::CallGraphError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value stored in an interval, as read from the history store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Name of the value's type, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Text(_) => "string",
        }
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Integer(i64::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// Identity of a call site: a numeric address or a symbol name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Numeric(i64),
    Symbolic(String),
}

impl Identifier {
    pub fn symbol(name: impl Into<String>) -> Self {
        Identifier::Symbolic(name.into())
    }

    pub fn address(address: i64) -> Self {
        Identifier::Numeric(address)
    }

    /// Display name that never confuses a symbol with an address
    ///
    /// Symbols spelled like a rendered address are quoted, so `Symbolic("0x10")`
    /// labels as `'0x10'` while `Numeric(16)` labels as `0x10`.
    pub fn label(&self) -> String {
        match self {
            Identifier::Symbolic(name) if looks_like_address(name) => format!("'{}'", name),
            other => other.to_string(),
        }
    }
}

fn looks_like_address(name: &str) -> bool {
    name.strip_prefix("0x")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

impl TryFrom<RawValue> for Identifier {
    type Error = CallGraphError;

    fn try_from(value: RawValue) -> Result<Self, Self::Error> {
        match value {
            RawValue::Integer(n) => Ok(Identifier::Numeric(n)),
            RawValue::Text(s) => Ok(Identifier::Symbolic(s)),
            other @ RawValue::Float(_) => {
                Err(CallGraphError::UnsupportedIdentifierType(other.type_name()))
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(address) => write!(f, "0x{:x}", address),
            Identifier::Symbolic(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_and_string_convert() {
        assert_eq!(
            Identifier::try_from(RawValue::Integer(42)).unwrap(),
            Identifier::Numeric(42)
        );
        assert_eq!(
            Identifier::try_from(RawValue::from("main")).unwrap(),
            Identifier::symbol("main")
        );
    }

    #[test]
    fn test_float_is_rejected() {
        let err = Identifier::try_from(RawValue::Float(2.75)).unwrap_err();
        assert_eq!(err, CallGraphError::UnsupportedIdentifierType("float"));
    }

    #[test]
    fn test_variants_never_equal() {
        assert_ne!(Identifier::Numeric(1), Identifier::symbol("1"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Identifier::address(0x4010).to_string(), "0x4010");
        assert_eq!(Identifier::symbol("op1").to_string(), "op1");
    }

    #[test]
    fn test_label_keeps_variants_apart() {
        assert_eq!(Identifier::address(16).label(), "0x10");
        assert_eq!(Identifier::symbol("0x10").label(), "'0x10'");
        assert_eq!(Identifier::symbol("0xzz").label(), "0xzz");
        assert_eq!(Identifier::symbol("main").label(), "main");
    }

    #[test]
    fn test_raw_value_from_json() {
        let values: Vec<Option<RawValue>> =
            serde_json::from_str(r#"[7, 2.5, "sym", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Some(RawValue::Integer(7)),
                Some(RawValue::Float(2.5)),
                Some(RawValue::from("sym")),
                None,
            ]
        );
    }
}
