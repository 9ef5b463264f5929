//! Values exchanged with the database handle and with row records.
//!
//! [`DbValue`] is what gets bound into statements and read back out of result
//! rows. [`FieldValue`] is the typed view a [`crate::Record`] exposes for one of
//! its declared fields. The row marshaler converts between the two.

use crate::field::FieldKind;
use crate::handle::HandleError;

/// Value type for statement parameters and result cells.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        DbValue::Integer(v as i64)
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Integer(v)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Real(v)
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(v: Vec<u8>) -> Self {
        DbValue::Blob(v)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DbValue::Null,
        }
    }
}

/// One result row: column names with their cells, in select order.
#[derive(Debug, Clone)]
pub struct DbRow {
    columns: Vec<String>,
    values: Vec<DbValue>,
}

impl DbRow {
    pub fn new(columns: Vec<String>, values: Vec<DbValue>) -> Self {
        Self { columns, values }
    }

    /// Typed cell at `index`.
    pub fn get<T: FromDbValue>(&self, index: usize) -> Result<T, HandleError> {
        match self.values.get(index) {
            Some(cell) => T::from_db_value(cell),
            None => Err(HandleError::TypeConversion(format!(
                "Row has {} columns, no column at index {}",
                self.values.len(),
                index
            ))),
        }
    }

    /// Typed cell of the column called `name`.
    pub fn get_by_name<T: FromDbValue>(&self, name: &str) -> Result<T, HandleError> {
        match self.index_of(name) {
            Some(index) => self.get(index),
            None => Err(HandleError::TypeConversion(format!("Row has no column '{}'", name))),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn get_raw(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }
}

/// Strict conversion out of a cell. No storage class is coerced.
pub trait FromDbValue: Sized {
    fn from_db_value(value: &DbValue) -> Result<Self, HandleError>;
}

fn storage_class(value: &DbValue) -> &'static str {
    match value {
        DbValue::Null => "NULL",
        DbValue::Integer(_) => "INTEGER",
        DbValue::Real(_) => "REAL",
        DbValue::Text(_) => "TEXT",
        DbValue::Blob(_) => "BLOB",
    }
}

fn mismatch(wanted: &str, value: &DbValue) -> HandleError {
    HandleError::TypeConversion(format!("Cannot read {} cell as {}", storage_class(value), wanted))
}

impl FromDbValue for i64 {
    fn from_db_value(value: &DbValue) -> Result<Self, HandleError> {
        match value {
            DbValue::Integer(v) => Ok(*v),
            other => Err(mismatch("i64", other)),
        }
    }
}

/// Typed value of one declared record field.
///
/// Text is the only kind with an explicit absence; integer and fixed-point
/// fields always hold a number.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    FixedPoint(f64),
    Text(Option<String>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Integer(_) => FieldKind::Integer,
            Self::FixedPoint(_) => FieldKind::FixedPoint,
            Self::Text(_) => FieldKind::Text,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_fixed_point(&self) -> Option<f64> {
        match self {
            Self::FixedPoint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Consume a text value. Non-text values yield `None`.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(v) => v,
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::FixedPoint(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(Some(v))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for FieldValue {
    fn from(v: Option<String>) -> Self {
        Self::Text(v)
    }
}

/// Column name to value mapping, in declared field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(String, DbValue)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column's value. An existing entry keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<DbValue>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&DbValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &DbValue> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DbValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// View the map as a result row, as if it had been read back from a table.
    pub fn to_row(&self) -> DbRow {
        DbRow::new(
            self.columns().map(str::to_string).collect(),
            self.values().cloned().collect(),
        )
    }
}
