//! Table creation driven by a stored schema version.
//!
//! A fresh database (version 0) gets the table created. A database stamped
//! with another version has the table dropped and created again; rows are not
//! carried over.
//!
//! The version lives in the database header, so every table in one file shares
//! it. A table missing from a file already stamped with the wanted version is
//! created without touching the stamp or its neighbours.

use crate::error::Result;
use crate::field_set::FieldSet;
use crate::handle::DatabaseHandle;
use crate::sql;
use tracing::info;

/// What [`ensure_table`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    Unchanged,
    Created,
    Recreated { from: i64 },
}

/// Bring the table in line with `version`. Versions below 1 count as 1.
pub fn ensure_table<H>(
    handle: &mut H,
    table_name: &str,
    fields: &FieldSet,
    version: i64,
) -> Result<SchemaAction>
where
    H: DatabaseHandle + ?Sized,
{
    let version = version.max(1);
    let current = handle.schema_version()?;
    if current == version {
        if table_exists(handle, table_name)? {
            return Ok(SchemaAction::Unchanged);
        }
        handle.execute(&sql::create_table(table_name, fields))?;
        info!(table = table_name, version, "Table added to stamped database");
        return Ok(SchemaAction::Created);
    }

    let action = if current == 0 {
        SchemaAction::Created
    } else {
        handle.execute(&sql::drop_table(table_name))?;
        SchemaAction::Recreated { from: current }
    };
    handle.execute(&sql::create_table(table_name, fields))?;
    handle.set_schema_version(version)?;

    info!(table = table_name, version, ?action, "Table schema applied");
    Ok(action)
}

pub fn table_exists<H>(handle: &mut H, table_name: &str) -> Result<bool>
where
    H: DatabaseHandle + ?Sized,
{
    let rows = handle.query(&sql::table_count(table_name))?;
    match rows.first() {
        Some(row) => Ok(row.get_by_name::<i64>("n")? > 0),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDescriptor, FieldKind};
    use crate::sql::Statement;
    use crate::sqlite::SqliteHandle;

    fn fields() -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .add_with(FieldDescriptor::new("id", FieldKind::Integer).primary_key())
            .add("name", FieldKind::Text);
        fields
    }

    fn count(handle: &mut SqliteHandle) -> i64 {
        let rows = handle
            .query(&Statement::new("SELECT count(*) AS n FROM notes", Vec::new()))
            .unwrap();
        rows[0].get_by_name("n").unwrap()
    }

    fn tags() -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .add_with(FieldDescriptor::new("id", FieldKind::Integer).primary_key())
            .add("label", FieldKind::Text);
        fields
    }

    #[test]
    fn test_fresh_database_creates_table() {
        let mut handle = SqliteHandle::memory();
        handle.open().unwrap();

        let action = ensure_table(&mut handle, "notes", &fields(), 1).unwrap();
        assert_eq!(action, SchemaAction::Created);
        assert_eq!(handle.schema_version().unwrap(), 1);
        assert_eq!(count(&mut handle), 0);

        let again = ensure_table(&mut handle, "notes", &fields(), 1).unwrap();
        assert_eq!(again, SchemaAction::Unchanged);
    }

    #[test]
    fn test_version_change_recreates_table() {
        let mut handle = SqliteHandle::memory();
        handle.open().unwrap();
        ensure_table(&mut handle, "notes", &fields(), 1).unwrap();
        handle
            .execute("INSERT INTO notes (name) VALUES ('kept?')")
            .unwrap();
        assert_eq!(count(&mut handle), 1);

        let action = ensure_table(&mut handle, "notes", &fields(), 2).unwrap();
        assert_eq!(action, SchemaAction::Recreated { from: 1 });
        assert_eq!(handle.schema_version().unwrap(), 2);
        assert_eq!(count(&mut handle), 0);
    }

    #[test]
    fn test_zero_version_is_treated_as_one() {
        let mut handle = SqliteHandle::memory();
        handle.open().unwrap();
        let action = ensure_table(&mut handle, "notes", &fields(), 0).unwrap();
        assert_eq!(action, SchemaAction::Created);
        assert_eq!(handle.schema_version().unwrap(), 1);
    }

    #[test]
    fn test_second_table_in_stamped_database_is_created() {
        let mut handle = SqliteHandle::memory();
        handle.open().unwrap();
        ensure_table(&mut handle, "notes", &fields(), 1).unwrap();
        handle
            .execute("INSERT INTO notes (name) VALUES ('first')")
            .unwrap();
        assert!(!table_exists(&mut handle, "tags").unwrap());

        let action = ensure_table(&mut handle, "tags", &tags(), 1).unwrap();
        assert_eq!(action, SchemaAction::Created);
        assert!(table_exists(&mut handle, "tags").unwrap());
        assert_eq!(handle.schema_version().unwrap(), 1);
        assert_eq!(count(&mut handle), 1);

        let again = ensure_table(&mut handle, "tags", &tags(), 1).unwrap();
        assert_eq!(again, SchemaAction::Unchanged);
    }
}
