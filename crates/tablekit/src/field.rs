//! Column type and constraint metadata.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Integer,
    Text,
    /// Fixed-point numeric, stored as a floating column.
    FixedPoint,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::FixedPoint => "numeric",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "integer" => Some(Self::Integer),
            "text" => Some(Self::Text),
            "numeric" | "fixed_point" | "float" => Some(Self::FixedPoint),
            _ => None,
        }
    }

    /// Storage type name used in generated DDL.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::FixedPoint => "FLOAT",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const DEFAULT_PRECISION: u32 = 4;

/// One column's type and constraint metadata.
///
/// `max_length` only means something for text columns, `min`/`max` for
/// integer and fixed-point columns, `precision` for fixed-point columns.
/// They are carried for every kind and not checked against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub primary_key: bool,
    pub auto_number: bool,
    pub required: bool,
    pub max_length: u32,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub precision: u32,
}

impl FieldDescriptor {
    /// Descriptor with no constraints.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: false,
            auto_number: false,
            required: false,
            max_length: 0,
            min: None,
            max: None,
            precision: DEFAULT_PRECISION,
        }
    }

    /// Build a descriptor from a textual kind.
    ///
    /// Fails with [`Error::UnknownFieldKind`] unless the kind is one of the
    /// three supported kinds.
    pub fn parse(name: impl Into<String>, kind: &str) -> Result<Self> {
        let name = name.into();
        let kind = FieldKind::parse(kind).ok_or_else(|| Error::unknown_kind(&name, kind))?;
        Ok(Self::new(name, kind))
    }

    /// Mark as primary key. A primary key is always auto-numbered.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.auto_number = true;
        self
    }

    pub fn auto_number(mut self) -> Self {
        self.auto_number = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [FieldKind::Integer, FieldKind::Text, FieldKind::FixedPoint] {
            assert_eq!(FieldKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(FieldKind::Integer.type_name(), "INTEGER");
        assert_eq!(FieldKind::Text.type_name(), "TEXT");
        assert_eq!(FieldKind::FixedPoint.type_name(), "FLOAT");
    }

    #[test]
    fn test_parse_accepts_aliases() {
        assert_eq!(FieldKind::parse("INTEGER"), Some(FieldKind::Integer));
        assert_eq!(FieldKind::parse(" Fixed_Point "), Some(FieldKind::FixedPoint));
        assert_eq!(FieldKind::parse("float"), Some(FieldKind::FixedPoint));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = FieldDescriptor::parse("created", "timestamp").unwrap_err();
        match err {
            Error::UnknownFieldKind { field, kind } => {
                assert_eq!(field, "created");
                assert_eq!(kind, "timestamp");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_any_attribute_combination_constructs() {
        let field = FieldDescriptor::parse("label", "text")
            .unwrap()
            .required()
            .max_length(40)
            .range(Some(1), Some(9))
            .precision(2);

        assert_eq!(field.kind, FieldKind::Text);
        assert_eq!(field.max_length, 40);
        assert_eq!(field.min, Some(1));
        assert_eq!(field.precision, 2);
        assert!(!field.primary_key);
    }

    #[test]
    fn test_primary_key_implies_auto_number() {
        let field = FieldDescriptor::new("id", FieldKind::Integer).primary_key();
        assert!(field.primary_key);
        assert!(field.auto_number);
    }

    #[test]
    fn test_default_precision() {
        assert_eq!(FieldDescriptor::new("price", FieldKind::FixedPoint).precision, 4);
    }
}
