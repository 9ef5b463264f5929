//! Database handle capability consumed by the data-set engine.
//!
//! The engine never talks to a database library directly. Everything goes
//! through [`DatabaseHandle`], which [`crate::SqliteHandle`] implements.

use crate::sql::Statement;
use crate::value::DbRow;
use std::fmt;
use thiserror::Error;

/// Operation that a handle error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOp {
    Open,
    Close,
    Execute,
    Query,
    Insert,
    Update,
    Delete,
    Version,
}

impl HandleOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Execute => "execute",
            Self::Query => "query",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Version => "schema version",
        }
    }
}

impl fmt::Display for HandleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from database handle operations.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("Database handle is not open")]
    NotOpen,

    #[error("SQLite {op} failed: {source}")]
    Sqlite {
        op: HandleOp,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),
}

impl HandleError {
    /// Tag a SQLite error with the operation it came from.
    pub fn sqlite(op: HandleOp) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Sqlite { op, source }
    }

    /// Operation the error came from, when known.
    pub fn op(&self) -> Option<HandleOp> {
        match self {
            Self::Sqlite { op, .. } => Some(*op),
            _ => None,
        }
    }
}

/// Connection to a relational store.
///
/// Statements arrive fully generated; the handle only binds parameters and
/// runs them. `close` must tolerate being called on an already closed handle.
pub trait DatabaseHandle {
    fn open(&mut self) -> Result<(), HandleError>;

    fn close(&mut self) -> Result<(), HandleError>;

    fn is_open(&self) -> bool;

    /// Execute a statement that takes no parameters and returns nothing.
    fn execute(&mut self, sql: &str) -> Result<(), HandleError>;

    /// Run a select and collect every row. The cursor is finished on return.
    fn query(&mut self, statement: &Statement) -> Result<Vec<DbRow>, HandleError>;

    /// Run an insert and return the id of the new row.
    fn insert(&mut self, statement: &Statement) -> Result<i64, HandleError>;

    /// Run an update and return the number of affected rows.
    fn update(&mut self, statement: &Statement) -> Result<u64, HandleError>;

    /// Run a delete and return the number of affected rows.
    fn delete(&mut self, statement: &Statement) -> Result<u64, HandleError>;

    /// Schema version stored with the database; 0 for a fresh database.
    fn schema_version(&mut self) -> Result<i64, HandleError>;

    fn set_schema_version(&mut self, version: i64) -> Result<(), HandleError>;
}

impl<H: DatabaseHandle + ?Sized> DatabaseHandle for Box<H> {
    fn open(&mut self) -> Result<(), HandleError> {
        (**self).open()
    }

    fn close(&mut self) -> Result<(), HandleError> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn execute(&mut self, sql: &str) -> Result<(), HandleError> {
        (**self).execute(sql)
    }

    fn query(&mut self, statement: &Statement) -> Result<Vec<DbRow>, HandleError> {
        (**self).query(statement)
    }

    fn insert(&mut self, statement: &Statement) -> Result<i64, HandleError> {
        (**self).insert(statement)
    }

    fn update(&mut self, statement: &Statement) -> Result<u64, HandleError> {
        (**self).update(statement)
    }

    fn delete(&mut self, statement: &Statement) -> Result<u64, HandleError> {
        (**self).delete(statement)
    }

    fn schema_version(&mut self) -> Result<i64, HandleError> {
        (**self).schema_version()
    }

    fn set_schema_version(&mut self, version: i64) -> Result<(), HandleError> {
        (**self).set_schema_version(version)
    }
}
