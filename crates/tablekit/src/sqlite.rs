//! SQLite implementation of the database handle.

use crate::handle::{DatabaseHandle, HandleError, HandleOp};
use crate::sql::Statement;
use crate::value::{DbRow, DbValue};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, debug_span};

#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Memory,
}

/// Handle over one SQLite database.
///
/// A file-backed handle releases its connection on close and reconnects on
/// open. An in-memory handle keeps its connection for its whole lifetime,
/// since dropping it would discard the data; close only marks it closed.
pub struct SqliteHandle {
    target: Target,
    conn: Option<Connection>,
    open: bool,
}

impl fmt::Debug for SqliteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteHandle")
            .field("target", &self.target)
            .field("open", &self.open)
            .finish()
    }
}

impl SqliteHandle {
    /// Handle for a database file. Nothing is opened until [`DatabaseHandle::open`].
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            target: Target::File(path.as_ref().to_path_buf()),
            conn: None,
            open: false,
        }
    }

    /// In-memory database (for testing).
    pub fn memory() -> Self {
        Self {
            target: Target::Memory,
            conn: None,
            open: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            Target::File(path) => Some(path),
            Target::Memory => None,
        }
    }

    fn conn(&self) -> Result<&Connection, HandleError> {
        if !self.open {
            return Err(HandleError::NotOpen);
        }
        self.conn.as_ref().ok_or(HandleError::NotOpen)
    }

    fn run(&self, op: HandleOp, statement: &Statement) -> Result<u64, HandleError> {
        let conn = self.conn()?;
        let span = debug_span!(
            "db.exec",
            op = sql_op_name(&statement.sql),
            sql_hash = %hash_sql(&statement.sql),
            duration_ms = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();

        let mut prepared = conn.prepare(&statement.sql).map_err(HandleError::sqlite(op))?;
        check_arity(&prepared, statement)?;
        let rows = prepared
            .execute(params_from_iter(to_sqlite_params(&statement.params)))
            .map_err(HandleError::sqlite(op))?;

        span.record("duration_ms", start.elapsed().as_millis() as u64);
        Ok(rows as u64)
    }
}

impl DatabaseHandle for SqliteHandle {
    fn open(&mut self) -> Result<(), HandleError> {
        if self.open {
            return Ok(());
        }
        if self.conn.is_none() {
            let conn = match &self.target {
                Target::File(path) => {
                    if let Some(parent) = path.parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent)?;
                        }
                    }
                    Connection::open(path)
                }
                Target::Memory => Connection::open_in_memory(),
            }
            .map_err(HandleError::sqlite(HandleOp::Open))?;
            self.conn = Some(conn);
        }
        self.open = true;
        debug!(db = ?self.target, "Opened SQLite handle");
        Ok(())
    }

    fn close(&mut self) -> Result<(), HandleError> {
        if !self.open {
            return Ok(());
        }
        if let Target::File(_) = self.target {
            if let Some(conn) = self.conn.take() {
                if let Err((conn, err)) = conn.close() {
                    self.conn = Some(conn);
                    return Err(HandleError::sqlite(HandleOp::Close)(err));
                }
            }
        }
        self.open = false;
        debug!(db = ?self.target, "Closed SQLite handle");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn execute(&mut self, sql: &str) -> Result<(), HandleError> {
        let conn = self.conn()?;
        let span = debug_span!(
            "db.exec_batch",
            op = sql_op_name(sql),
            sql_hash = %hash_sql(sql),
            duration_ms = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();
        conn.execute_batch(sql)
            .map_err(HandleError::sqlite(HandleOp::Execute))?;
        span.record("duration_ms", start.elapsed().as_millis() as u64);
        Ok(())
    }

    fn query(&mut self, statement: &Statement) -> Result<Vec<DbRow>, HandleError> {
        let conn = self.conn()?;
        let span = debug_span!(
            "db.query",
            op = sql_op_name(&statement.sql),
            sql_hash = %hash_sql(&statement.sql),
            duration_ms = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();

        let mut prepared = conn
            .prepare(&statement.sql)
            .map_err(HandleError::sqlite(HandleOp::Query))?;
        check_arity(&prepared, statement)?;
        let columns: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = prepared
            .query(params_from_iter(to_sqlite_params(&statement.params)))
            .map_err(HandleError::sqlite(HandleOp::Query))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(HandleError::sqlite(HandleOp::Query))? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let cell = row
                    .get_ref(index)
                    .map_err(HandleError::sqlite(HandleOp::Query))?;
                values.push(from_value_ref(cell));
            }
            result.push(DbRow::new(columns.clone(), values));
        }

        span.record("duration_ms", start.elapsed().as_millis() as u64);
        Ok(result)
    }

    fn insert(&mut self, statement: &Statement) -> Result<i64, HandleError> {
        self.run(HandleOp::Insert, statement)?;
        Ok(self.conn()?.last_insert_rowid())
    }

    fn update(&mut self, statement: &Statement) -> Result<u64, HandleError> {
        self.run(HandleOp::Update, statement)
    }

    fn delete(&mut self, statement: &Statement) -> Result<u64, HandleError> {
        self.run(HandleOp::Delete, statement)
    }

    fn schema_version(&mut self) -> Result<i64, HandleError> {
        self.conn()?
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(HandleError::sqlite(HandleOp::Version))
    }

    fn set_schema_version(&mut self, version: i64) -> Result<(), HandleError> {
        self.conn()?
            .execute_batch(&format!("PRAGMA user_version = {}", version))
            .map_err(HandleError::sqlite(HandleOp::Version))
    }
}

// Placeholder count must match the bound parameters. Appending where
// parameters onto a reused query is the usual way to get this wrong.
fn check_arity(prepared: &rusqlite::Statement<'_>, statement: &Statement) -> Result<(), HandleError> {
    let expected = prepared.parameter_count();
    if expected != statement.params.len() {
        return Err(HandleError::InvalidStatement(format!(
            "{} placeholders but {} parameters in: {}",
            expected,
            statement.params.len(),
            statement.sql
        )));
    }
    Ok(())
}

fn to_sqlite_params(params: &[DbValue]) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p {
            DbValue::Null => Value::Null,
            DbValue::Integer(v) => Value::Integer(*v),
            DbValue::Real(v) => Value::Real(*v),
            DbValue::Text(v) => Value::Text(v.clone()),
            DbValue::Blob(v) => Value::Blob(v.clone()),
        })
        .collect()
}

fn from_value_ref(value: ValueRef<'_>) -> DbValue {
    match value {
        ValueRef::Null => DbValue::Null,
        ValueRef::Integer(v) => DbValue::Integer(v),
        ValueRef::Real(v) => DbValue::Real(v),
        ValueRef::Text(v) => DbValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => DbValue::Blob(v.to_vec()),
    }
}

fn sql_op_name(sql: &str) -> &str {
    sql.split_whitespace().next().unwrap_or("unknown")
}

fn hash_sql(sql: &str) -> String {
    // FNV-1a, stable across runs so log lines for one statement group together.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in sql.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{:016x}", hash)
}
