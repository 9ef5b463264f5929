//! Command implementations.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::path::Path;
use tablekit::{
    ensure_table, sql, DatabaseHandle, DbRow, DbValue, FieldSet, Query, RowDescriptor,
    SchemaAction, SqliteHandle,
};
use tablekit::schema::table_exists;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatementKind {
    Create,
    Drop,
    Reset,
}

/// Descriptor file plus the field set derived from it.
struct Schema {
    descriptor: RowDescriptor,
    fields: FieldSet,
}

impl Schema {
    fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read descriptor: {}", path.display()))?;
        let descriptor = RowDescriptor::from_json(&json)
            .with_context(|| format!("Invalid descriptor: {}", path.display()))?;
        let fields = FieldSet::derive(&descriptor)
            .with_context(|| format!("Invalid field declarations in {}", path.display()))?;
        if !fields.contains(&descriptor.primary_key) {
            bail!(
                "Primary key '{}' is not a declared field of '{}'",
                descriptor.primary_key,
                descriptor.table_name
            );
        }
        Ok(Self { descriptor, fields })
    }

    fn table(&self) -> &str {
        &self.descriptor.table_name
    }

    fn render(&self, kind: StatementKind) -> String {
        match kind {
            StatementKind::Create => sql::create_table(self.table(), &self.fields),
            StatementKind::Drop => sql::drop_table(self.table()),
            StatementKind::Reset => sql::reset_autonumber(self.table()),
        }
    }
}

pub fn print_sql(schema: &Path, kind: StatementKind) -> Result<()> {
    let schema = Schema::load(schema)?;
    println!("{}", schema.render(kind));
    Ok(())
}

pub fn apply(schema: &Path, db: &Path, version: i64) -> Result<()> {
    let schema = Schema::load(schema)?;
    let action = with_open_handle(db, |handle| {
        Ok(ensure_table(handle, schema.table(), &schema.fields, version)?)
    })?;

    let table = schema.table();
    match action {
        SchemaAction::Unchanged => println!("{}: already at version {}", table, version.max(1)),
        SchemaAction::Created => println!("{}: created at version {}", table, version.max(1)),
        SchemaAction::Recreated { from } => println!(
            "{}: recreated, version {} -> {} (existing rows dropped)",
            table,
            from,
            version.max(1)
        ),
    }
    Ok(())
}

pub fn dump(schema: &Path, db: &Path, limit: Option<u64>) -> Result<()> {
    let schema = Schema::load(schema)?;
    let rows = with_open_handle(db, |handle| read_rows(handle, &schema, limit))?;
    for row in &rows {
        println!("{}", Value::Object(row_to_json(row)));
    }
    Ok(())
}

pub fn empty(schema: &Path, db: &Path) -> Result<()> {
    let schema = Schema::load(schema)?;
    let deleted = with_open_handle(db, |handle| empty_table(handle, &schema))?;
    info!(table = schema.table(), deleted, "Table emptied");
    println!("{}: deleted {} rows", schema.table(), deleted);
    Ok(())
}

/// Open the database, run `op`, and close again whatever `op` returned.
fn with_open_handle<T>(db: &Path, op: impl FnOnce(&mut SqliteHandle) -> Result<T>) -> Result<T> {
    let mut handle = SqliteHandle::file(db);
    handle
        .open()
        .with_context(|| format!("Failed to open database: {}", db.display()))?;
    let result = op(&mut handle);
    handle.close().context("Failed to close database")?;
    result
}

fn ensure_applied(handle: &mut SqliteHandle, schema: &Schema) -> Result<()> {
    if !table_exists(handle, schema.table())? {
        bail!(
            "Table '{}' has not been created in this database; run `tablekit apply` first",
            schema.table()
        );
    }
    Ok(())
}

fn read_rows(handle: &mut SqliteHandle, schema: &Schema, limit: Option<u64>) -> Result<Vec<DbRow>> {
    ensure_applied(handle, schema)?;
    let mut query = Query::new().select(schema.descriptor.column_names());
    if let Some(limit) = limit {
        query = query.set_limit(limit);
    }
    Ok(handle.query(&sql::select(schema.table(), &query))?)
}

fn empty_table(handle: &mut SqliteHandle, schema: &Schema) -> Result<u64> {
    ensure_applied(handle, schema)?;
    let deleted = handle.delete(&sql::delete(schema.table(), &Query::new()))?;
    if schema.fields.has_auto_number() {
        handle.execute(&sql::reset_autonumber(schema.table()))?;
    }
    Ok(deleted)
}

fn row_to_json(row: &DbRow) -> Map<String, Value> {
    row.column_names()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let value = match row.get_raw(index) {
                None | Some(DbValue::Null) => Value::Null,
                Some(DbValue::Integer(v)) => Value::from(*v),
                Some(DbValue::Real(v)) => Value::from(*v),
                Some(DbValue::Text(v)) => Value::from(v.as_str()),
                Some(DbValue::Blob(v)) => Value::from(v.clone()),
            };
            (column.clone(), value)
        })
        .collect()
}
