//! Lightweight table mapping over SQLite.
//!
//! A record type describes its table once, as a [`RowDescriptor`]. From that
//! description the crate derives a [`FieldSet`], generates the table schema,
//! and runs typed CRUD through a [`DataSet`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use tablekit::{DataSet, DataSetConfig, Query, SqliteHandle};
//!
//! let mut people = DataSet::<Person, _>::new(
//!     SqliteHandle::file("people.db"),
//!     DataSetConfig::default(),
//! )?;
//!
//! let id = people.insert(&Person::named("Ada"))?;
//! let adults = people.select(&Query::new().where_int("age >= ?", 18))?;
//! people.empty()?;
//! ```

mod config;
mod data_set;
mod descriptor;
mod error;
mod field;
mod field_set;
mod handle;
pub mod marshal;
mod query;
pub mod schema;
pub mod sql;
mod sqlite;
mod value;

pub use config::DataSetConfig;
pub use data_set::{DataSet, UpdateListener};
pub use descriptor::{FieldDecl, Record, RowDescriptor};
pub use error::{Error, Result};
pub use field::{FieldDescriptor, FieldKind, DEFAULT_PRECISION};
pub use field_set::FieldSet;
pub use handle::{DatabaseHandle, HandleError, HandleOp};
pub use query::Query;
pub use schema::{ensure_table, SchemaAction};
pub use sql::Statement;
pub use sqlite::SqliteHandle;
pub use value::{DbRow, DbValue, FieldValue, FromDbValue, ValueMap};
