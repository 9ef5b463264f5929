//! Per-table CRUD engine.
//!
//! A [`DataSet`] owns one database handle and applies two policies around
//! every operation:
//!
//! - **Close policy.** Unless `keep_connection_open` is set, the handle is
//!   closed after each operation, on the error path as well.
//! - **Notify policy.** Unless notifications are suppressed, every registered
//!   [`UpdateListener`] is called after a committed mutation, in registration
//!   order.
//!
//! Batch operations hold the handle open and silence listeners for their
//! whole run, then close and notify once.

use crate::config::DataSetConfig;
use crate::descriptor::Record;
use crate::error::{Error, Result};
use crate::field_set::FieldSet;
use crate::handle::DatabaseHandle;
use crate::marshal;
use crate::query::Query;
use crate::schema;
use crate::sql;
use std::rc::Rc;
use tracing::{debug, warn};

/// Receives a call after every committed mutation of a data set.
///
/// The call carries no payload; listeners re-query what they need. A
/// panicking listener unwinds through the operation that triggered it and
/// listeners registered after it are not called.
pub trait UpdateListener {
    fn on_data_update(&self);
}

/// CRUD facade over one table, typed by its record.
pub struct DataSet<R: Record, H: DatabaseHandle> {
    handle: H,
    table_name: String,
    primary_key: String,
    fields: FieldSet,
    keep_open: bool,
    suppress: bool,
    schema_version: i64,
    listeners: Vec<Rc<dyn UpdateListener>>,
    result_count: Option<usize>,
    last_results: Vec<R>,
}

impl<R: Record, H: DatabaseHandle> DataSet<R, H> {
    /// Build a data set for `R` over `handle`.
    ///
    /// The field set is derived here, so a malformed descriptor fails now
    /// rather than on first use. The handle is not touched until the first
    /// operation.
    pub fn new(handle: H, config: DataSetConfig) -> Result<Self> {
        let descriptor = R::descriptor();
        let fields = FieldSet::derive(&descriptor)?;
        if !fields.contains(&descriptor.primary_key) {
            return Err(Error::missing_primary_key(descriptor.primary_key));
        }

        Ok(Self {
            handle,
            table_name: descriptor.table_name,
            primary_key: descriptor.primary_key,
            fields,
            keep_open: config.keep_connection_open,
            suppress: config.suppress_update_notifications,
            schema_version: config.schema_version,
            listeners: Vec::new(),
            result_count: None,
            last_results: Vec::new(),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn keeps_connection_open(&self) -> bool {
        self.keep_open
    }

    pub fn set_keep_connection_open(&mut self, keep_open: bool) {
        self.keep_open = keep_open;
    }

    pub fn notifications_suppressed(&self) -> bool {
        self.suppress
    }

    pub fn set_suppress_update_notifications(&mut self, suppress: bool) {
        self.suppress = suppress;
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Open the handle and bring the table schema up to date.
    ///
    /// Only useful with `keep_connection_open`; otherwise the next operation
    /// closes the handle again.
    pub fn open(&mut self) -> Result<()> {
        self.ensure_open()
    }

    /// Close the handle. Closing a closed data set does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.handle.close()?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.handle.is_open() {
            return Ok(());
        }
        self.handle.open()?;
        if let Err(err) = schema::ensure_table(
            &mut self.handle,
            &self.table_name,
            &self.fields,
            self.schema_version,
        ) {
            if let Err(close_err) = self.handle.close() {
                warn!(table = %self.table_name, error = %close_err, "Failed to close handle after schema error");
            }
            return Err(err);
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.keep_open {
            return Ok(());
        }
        self.handle.close()?;
        Ok(())
    }

    /// Run `op` with the handle open, then apply the close policy and, for a
    /// successful mutation, the notify policy. A mutation that committed is
    /// announced even when the close after it fails.
    fn scoped<T>(&mut self, mutation: bool, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = match self.ensure_open() {
            Ok(()) => op(self),
            Err(err) => Err(err),
        };

        let released = self.release();
        if mutation && result.is_ok() && !self.suppress {
            self.notify_update_listeners();
        }

        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(table = %self.table_name, error = %close_err, "Failed to close handle after error");
                Err(err)
            }
        }
    }

    /// Apply `op` to each item with the handle held open and listeners
    /// silenced, then close and notify once under the caller's policy.
    ///
    /// Stops at the first failing item. Items before it stay committed, and
    /// listeners are still told when at least one item went through.
    fn batch<T>(&mut self, items: &[R], mut op: impl FnMut(&mut Self, &R) -> Result<T>) -> Result<Vec<T>> {
        let keep_open = self.keep_open;
        let suppress = self.suppress;
        self.keep_open = true;
        self.suppress = true;
        debug!(table = %self.table_name, items = items.len(), "Batch started");

        let mut outputs = Vec::with_capacity(items.len());
        let mut failure = None;
        for item in items {
            match op(self, item) {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        self.keep_open = keep_open;
        self.suppress = suppress;
        let released = self.release();
        debug!(table = %self.table_name, committed = outputs.len(), "Batch finished");

        if !self.suppress && (failure.is_none() || !outputs.is_empty()) {
            self.notify_update_listeners();
        }

        match (failure, released) {
            (None, Ok(())) => Ok(outputs),
            (None, Err(close_err)) => Err(close_err),
            (Some(err), Ok(())) => Err(err),
            (Some(err), Err(close_err)) => {
                warn!(table = %self.table_name, error = %close_err, "Failed to close handle after batch error");
                Err(err)
            }
        }
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a listener. Registering the same listener twice is a no-op.
    pub fn register_update_listener(&mut self, listener: Rc<dyn UpdateListener>) {
        if self.listeners.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            return;
        }
        self.listeners.push(listener);
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unregister_update_listener(&mut self, listener: &Rc<dyn UpdateListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Rc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Call every registered listener now, regardless of suppression.
    pub fn notify_update_listeners(&self) {
        debug!(table = %self.table_name, listeners = self.listeners.len(), "Notifying update listeners");
        for listener in &self.listeners {
            listener.on_data_update();
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Run a select and marshal every row.
    ///
    /// The result and its count are kept as the data set's latest snapshot.
    pub fn select(&mut self, query: &Query) -> Result<Vec<R>> {
        let statement = sql::select(&self.table_name, query);
        let records = self.scoped(false, |ds| {
            let rows = ds.handle.query(&statement)?;
            rows.iter()
                .map(|row| marshal::to_record(&ds.fields, row))
                .collect::<Result<Vec<R>>>()
        })?;

        self.result_count = Some(records.len());
        self.last_results = records.clone();
        Ok(records)
    }

    /// Every row of the table, selecting the declared columns.
    pub fn select_all(&mut self) -> Result<Vec<R>> {
        let query = Query::new().select(R::column_names());
        self.select(&query)
    }

    /// First row of the table, or `None` when it is empty.
    pub fn select_first(&mut self) -> Result<Option<R>> {
        let query = Query::new().select(R::column_names()).set_limit(1);
        Ok(self.select(&query)?.into_iter().next())
    }

    /// Row count of the latest select; `None` before any select ran.
    pub fn result_count(&self) -> Option<usize> {
        self.result_count
    }

    /// Records of the latest select. The snapshot is handed out once.
    pub fn take_results(&mut self) -> Vec<R> {
        std::mem::take(&mut self.last_results)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Insert a record and return the id assigned to the new row.
    pub fn insert(&mut self, item: &R) -> Result<i64> {
        let values = marshal::to_value_map(&self.fields, item)?;
        let statement = sql::insert(&self.table_name, &values);
        self.scoped(true, |ds| Ok(ds.handle.insert(&statement)?))
    }

    /// Insert every record, returning the new ids in order.
    pub fn insert_all(&mut self, items: &[R]) -> Result<Vec<i64>> {
        self.batch(items, |ds, item| ds.insert(item))
    }

    /// Write every field of `item` to the row with the same primary key.
    pub fn update(&mut self, item: &R) -> Result<u64> {
        let query = self.key_query(item)?;
        let values = marshal::to_value_map(&self.fields, item)?;
        let statement = sql::update(&self.table_name, &values, &query);
        self.scoped(true, |ds| Ok(ds.handle.update(&statement)?))
    }

    pub fn update_all(&mut self, items: &[R]) -> Result<u64> {
        Ok(self.batch(items, |ds, item| ds.update(item))?.into_iter().sum())
    }

    /// Delete the rows matching the where portion of `query`.
    pub fn delete_where(&mut self, query: &Query) -> Result<u64> {
        let statement = sql::delete(&self.table_name, query);
        self.scoped(true, |ds| Ok(ds.handle.delete(&statement)?))
    }

    /// Delete the row with the same primary key as `item`.
    pub fn delete(&mut self, item: &R) -> Result<u64> {
        let query = self.key_query(item)?;
        self.delete_where(&query)
    }

    pub fn delete_all(&mut self, items: &[R]) -> Result<u64> {
        Ok(self.batch(items, |ds, item| ds.delete(item))?.into_iter().sum())
    }

    /// Delete every row and restart the auto-number sequence.
    pub fn empty(&mut self) -> Result<u64> {
        let deleted = self.delete_where(&Query::new())?;
        if self.fields.has_auto_number() {
            let reset = sql::reset_autonumber(&self.table_name);
            self.scoped(false, |ds| Ok(ds.handle.execute(&reset)?))?;
        }
        self.release()?;
        debug!(table = %self.table_name, deleted, "Table emptied");
        Ok(deleted)
    }

    fn key_query(&self, item: &R) -> Result<Query> {
        let key = marshal::primary_key_value(item, &self.primary_key)?;
        Ok(Query::new().where_int(format!("{} = ?", self.primary_key), key))
    }
}

impl<R: Record, H: DatabaseHandle> Drop for DataSet<R, H> {
    fn drop(&mut self) {
        if self.handle.is_open() {
            if let Err(err) = self.handle.close() {
                warn!(table = %self.table_name, error = %err, "Failed to close handle on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDecl, RowDescriptor};
    use crate::field::FieldKind;
    use crate::handle::HandleError;
    use crate::sql::Statement;
    use crate::sqlite::SqliteHandle;
    use crate::value::{DbRow, FieldValue};
    use std::cell::Cell;
    use std::io;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Task {
        id: i64,
        title: Option<String>,
        effort: f64,
    }

    impl Record for Task {
        fn descriptor() -> RowDescriptor {
            RowDescriptor::new("tasks", "id")
                .field(FieldDecl::new("id", FieldKind::Integer).primary_key())
                .field(FieldDecl::new("title", FieldKind::Text).required())
                .field(FieldDecl::new("effort", FieldKind::FixedPoint))
        }

        fn get_field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "id" => Some(self.id.into()),
                "title" => Some(self.title.clone().into()),
                "effort" => Some(self.effort.into()),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: FieldValue) -> bool {
            match name {
                "id" => self.id = value.as_integer().unwrap_or_default(),
                "title" => self.title = value.into_text(),
                "effort" => self.effort = value.as_fixed_point().unwrap_or_default(),
                _ => return false,
            }
            true
        }
    }

    fn task(title: &str) -> Task {
        Task {
            id: 0,
            title: Some(title.to_string()),
            effort: 1.5,
        }
    }

    #[derive(Default)]
    struct Counter(Cell<usize>);

    impl UpdateListener for Counter {
        fn on_data_update(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    /// Memory handle whose close goes through but still reports failure.
    struct FailingClose(SqliteHandle);

    impl DatabaseHandle for FailingClose {
        fn open(&mut self) -> std::result::Result<(), HandleError> {
            self.0.open()
        }

        fn close(&mut self) -> std::result::Result<(), HandleError> {
            self.0.close()?;
            Err(HandleError::Io(io::Error::other("close failed")))
        }

        fn is_open(&self) -> bool {
            self.0.is_open()
        }

        fn execute(&mut self, sql: &str) -> std::result::Result<(), HandleError> {
            self.0.execute(sql)
        }

        fn query(&mut self, statement: &Statement) -> std::result::Result<Vec<DbRow>, HandleError> {
            self.0.query(statement)
        }

        fn insert(&mut self, statement: &Statement) -> std::result::Result<i64, HandleError> {
            self.0.insert(statement)
        }

        fn update(&mut self, statement: &Statement) -> std::result::Result<u64, HandleError> {
            self.0.update(statement)
        }

        fn delete(&mut self, statement: &Statement) -> std::result::Result<u64, HandleError> {
            self.0.delete(statement)
        }

        fn schema_version(&mut self) -> std::result::Result<i64, HandleError> {
            self.0.schema_version()
        }

        fn set_schema_version(&mut self, version: i64) -> std::result::Result<(), HandleError> {
            self.0.set_schema_version(version)
        }
    }

    fn data_set() -> DataSet<Task, SqliteHandle> {
        DataSet::new(SqliteHandle::memory(), DataSetConfig::default()).unwrap()
    }

    #[test]
    fn test_new_does_not_open() {
        let ds = data_set();
        assert!(!ds.is_open());
        assert_eq!(ds.table_name(), "tasks");
        assert_eq!(ds.fields().len(), 3);
    }

    #[test]
    fn test_missing_primary_key_fails_construction() {
        #[derive(Debug, Clone, Default)]
        struct Orphan;

        impl Record for Orphan {
            fn descriptor() -> RowDescriptor {
                RowDescriptor::new("orphans", "id").field(FieldDecl::new("name", FieldKind::Text))
            }
            fn get_field(&self, _: &str) -> Option<FieldValue> {
                None
            }
            fn set_field(&mut self, _: &str, _: FieldValue) -> bool {
                false
            }
        }

        let err = DataSet::<Orphan, _>::new(SqliteHandle::memory(), DataSetConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingPrimaryKeyField(ref f) if f == "id"));
    }

    #[test]
    fn test_insert_then_select() {
        let mut ds = data_set();
        assert_eq!(ds.insert(&task("write")).unwrap(), 1);
        assert_eq!(ds.insert(&task("review")).unwrap(), 2);
        assert!(!ds.is_open());

        let all = ds.select_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].id, 2);
        assert_eq!(all[1].title.as_deref(), Some("review"));
        assert_eq!(ds.result_count(), Some(2));
    }

    #[test]
    fn test_result_snapshot_is_taken_once() {
        let mut ds = data_set();
        assert_eq!(ds.result_count(), None);
        ds.insert(&task("a")).unwrap();
        ds.select_all().unwrap();

        assert_eq!(ds.take_results().len(), 1);
        assert!(ds.take_results().is_empty());
        assert_eq!(ds.result_count(), Some(1));
    }

    #[test]
    fn test_listeners_fire_on_mutation_only() {
        let mut ds = data_set();
        let counter = Rc::new(Counter::default());
        ds.register_update_listener(counter.clone());
        ds.register_update_listener(counter.clone());
        assert_eq!(ds.listener_count(), 1);

        ds.insert(&task("a")).unwrap();
        ds.select_all().unwrap();
        assert_eq!(counter.0.get(), 1);

        ds.set_suppress_update_notifications(true);
        ds.insert(&task("b")).unwrap();
        assert_eq!(counter.0.get(), 1);

        ds.notify_update_listeners();
        assert_eq!(counter.0.get(), 2);

        let as_listener: Rc<dyn UpdateListener> = counter.clone();
        assert!(ds.unregister_update_listener(&as_listener));
        assert!(!ds.unregister_update_listener(&as_listener));
    }

    #[test]
    fn test_failed_mutation_does_not_notify_and_closes() {
        let mut ds = data_set();
        let counter = Rc::new(Counter::default());
        ds.register_update_listener(counter.clone());

        let untitled = Task::default();
        let err = ds.insert(&untitled).unwrap_err();
        assert!(matches!(err, Error::Handle(_)));
        assert_eq!(counter.0.get(), 0);
        assert!(!ds.is_open());
    }

    #[test]
    fn test_committed_mutation_notifies_when_close_fails() {
        let mut ds =
            DataSet::<Task, _>::new(FailingClose(SqliteHandle::memory()), DataSetConfig::default())
                .unwrap();
        let counter = Rc::new(Counter::default());
        ds.register_update_listener(counter.clone());

        let err = ds.insert(&task("a")).unwrap_err();
        assert!(matches!(err, Error::Handle(HandleError::Io(_))));
        assert_eq!(counter.0.get(), 1);
        assert!(!ds.is_open());

        ds.set_keep_connection_open(true);
        let stored = ds.select_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title.as_deref(), Some("a"));
        assert_eq!(counter.0.get(), 1);
    }

    #[test]
    fn test_batch_insert_restores_flags() {
        let mut ds = data_set();
        let counter = Rc::new(Counter::default());
        ds.register_update_listener(counter.clone());

        let ids = ds
            .insert_all(&[task("a"), task("b"), task("c")])
            .unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(counter.0.get(), 1);
        assert!(!ds.keeps_connection_open());
        assert!(!ds.notifications_suppressed());
        assert!(!ds.is_open());
    }

    #[test]
    fn test_batch_stops_at_first_failure() {
        let mut ds = data_set();
        let counter = Rc::new(Counter::default());
        ds.register_update_listener(counter.clone());

        let err = ds
            .insert_all(&[task("a"), Task::default(), task("c")])
            .unwrap_err();
        assert!(matches!(err, Error::Handle(_)));
        assert_eq!(counter.0.get(), 1);
        assert_eq!(ds.select_all().unwrap().len(), 1);
        assert!(!ds.notifications_suppressed());
    }

    #[test]
    fn test_update_and_delete_by_key() {
        let mut ds = data_set();
        ds.insert_all(&[task("same"), task("same")]).unwrap();

        let mut first = ds.select_first().unwrap().unwrap();
        first.effort = 8.0;
        assert_eq!(ds.update(&first).unwrap(), 1);

        assert_eq!(ds.delete(&first).unwrap(), 1);
        let rest = ds.select_all().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, 2);
        assert_eq!(rest[0].effort, 1.5);
    }

    #[test]
    fn test_empty_resets_autonumber() {
        let mut ds = data_set();
        ds.insert_all(&[task("a"), task("b")]).unwrap();
        assert_eq!(ds.empty().unwrap(), 2);
        assert!(ds.select_first().unwrap().is_none());
        assert_eq!(ds.insert(&task("again")).unwrap(), 1);
    }

    #[test]
    fn test_keep_open_leaves_handle_open() {
        let mut ds = DataSet::<Task, _>::new(SqliteHandle::memory(), DataSetConfig::keep_open()).unwrap();
        ds.insert(&task("a")).unwrap();
        assert!(ds.is_open());
        ds.close().unwrap();
        ds.close().unwrap();
        assert!(!ds.is_open());
    }
}
