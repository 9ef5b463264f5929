//! Conversion between records and column/value maps.

use crate::descriptor::Record;
use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldKind};
use crate::field_set::FieldSet;
use crate::value::{DbRow, DbValue, FieldValue, ValueMap};

/// Build a record from a result row.
///
/// Only columns that are declared fields are applied; other columns are
/// skipped, and declared fields missing from the row keep their blank value.
pub fn to_record<R: Record>(fields: &FieldSet, row: &DbRow) -> Result<R> {
    let mut record = R::default();
    for (index, column) in row.column_names().iter().enumerate() {
        let Some(field) = fields.get(column) else {
            continue;
        };
        let cell = row.get_raw(index).unwrap_or(&DbValue::Null);
        write_field(&mut record, field, cell)?;
    }
    Ok(record)
}

/// Column/value map of every declared field of a record.
///
/// An integer holding 0 is written as NULL so the database assigns the key
/// on insert.
pub fn to_value_map<R: Record>(fields: &FieldSet, record: &R) -> Result<ValueMap> {
    let mut values = ValueMap::new();
    for field in fields {
        let value = match read_field(record, field)? {
            FieldValue::Integer(0) => DbValue::Null,
            FieldValue::Integer(v) => DbValue::Integer(v),
            FieldValue::FixedPoint(v) => DbValue::Real(v),
            FieldValue::Text(v) => DbValue::from(v),
        };
        values.insert(field.name.as_str(), value);
    }
    Ok(values)
}

/// Read one declared field, checking that the record returns its declared kind.
pub fn read_field<R: Record>(record: &R, field: &FieldDescriptor) -> Result<FieldValue> {
    let value = record
        .get_field(&field.name)
        .ok_or_else(|| Error::missing_field(&field.name))?;
    if value.kind() != field.kind {
        return Err(Error::FieldKindMismatch {
            field: field.name.clone(),
            expected: field.kind,
            found: value.kind(),
        });
    }
    Ok(value)
}

/// Convert a cell to the field's kind and store it on the record.
pub fn write_field<R: Record>(record: &mut R, field: &FieldDescriptor, cell: &DbValue) -> Result<()> {
    let value = coerce(field.kind, cell);
    if record.set_field(&field.name, value) {
        Ok(())
    } else {
        Err(Error::missing_field(&field.name))
    }
}

/// Current integer value of the record's primary key.
pub fn primary_key_value<R: Record>(record: &R, primary_key: &str) -> Result<i64> {
    match record.get_field(primary_key) {
        Some(FieldValue::Integer(v)) => Ok(v),
        Some(other) => Err(Error::FieldKindMismatch {
            field: primary_key.to_string(),
            expected: FieldKind::Integer,
            found: other.kind(),
        }),
        None => Err(Error::missing_primary_key(primary_key)),
    }
}

// Same conversions SQLite applies when a column is read as int, double or text.
fn coerce(kind: FieldKind, cell: &DbValue) -> FieldValue {
    match kind {
        FieldKind::Integer => FieldValue::Integer(match cell {
            DbValue::Null | DbValue::Blob(_) => 0,
            DbValue::Integer(v) => *v,
            DbValue::Real(v) => *v as i64,
            DbValue::Text(s) => parse_integer(s),
        }),
        FieldKind::FixedPoint => FieldValue::FixedPoint(match cell {
            DbValue::Null | DbValue::Blob(_) => 0.0,
            DbValue::Integer(v) => *v as f64,
            DbValue::Real(v) => *v,
            DbValue::Text(s) => s.trim().parse().unwrap_or(0.0),
        }),
        FieldKind::Text => FieldValue::Text(match cell {
            DbValue::Null => None,
            DbValue::Integer(v) => Some(v.to_string()),
            DbValue::Real(v) => Some(v.to_string()),
            DbValue::Text(s) => Some(s.clone()),
            DbValue::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
        }),
    }
}

fn parse_integer(s: &str) -> i64 {
    let s = s.trim();
    s.parse::<i64>()
        .or_else(|_| s.parse::<f64>().map(|v| v as i64))
        .unwrap_or(0)
}
