//! Row-type descriptors and the record capability.
//!
//! A row type is described once, as data: the table it lives in, its primary
//! key, and the declared metadata of every field. Descriptors are usually
//! written in code next to the record struct, but can also be loaded from JSON.
//!
//! ```rust,ignore
//! let people = RowDescriptor::new("people", "id")
//!     .field(FieldDecl::new("id", FieldKind::Integer).primary_key())
//!     .field(FieldDecl::new("name", FieldKind::Text).required());
//! ```

use crate::error::Result;
use crate::field::{FieldKind, DEFAULT_PRECISION};
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

/// Declared metadata of one field, as written at the schema definition site.
///
/// `kind` is kept textual so that descriptors read from outside the program
/// are validated when the field set is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_number: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_length: u32,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
    #[serde(default = "default_precision")]
    pub precision: u32,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self::with_kind_name(name, kind.as_str())
    }

    /// Declare a field with a kind given by name, validated at derivation.
    pub fn with_kind_name(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            primary_key: false,
            auto_number: false,
            required: false,
            max_length: 0,
            min: None,
            max: None,
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
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

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }
}

/// Static description of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDescriptor {
    pub table_name: String,
    /// Name of the primary key field.
    pub primary_key: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl RowDescriptor {
    pub fn new(table_name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key: primary_key.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    /// Parse a descriptor from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Declared field names, in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// A record type the data-set engine can store.
///
/// Implementations expose their fields by name. `get_field` returns `None`
/// and `set_field` returns `false` for names the record does not have.
pub trait Record: Clone + Default {
    fn descriptor() -> RowDescriptor;

    fn get_field(&self, name: &str) -> Option<FieldValue>;

    fn set_field(&mut self, name: &str, value: FieldValue) -> bool;

    /// Declared column names, in declaration order.
    fn column_names() -> Vec<String> {
        Self::descriptor()
            .fields
            .into_iter()
            .map(|f| f.name)
            .collect()
    }
}
