//! Chainable description of the variable parts of a statement.
//!
//! A fresh [`Query`] selects every column of every row. Each method applies
//! one clause and hands the query back, so calls chain:
//!
//! ```rust,ignore
//! let q = Query::new().where_int("age > ?", 30).add_order_by("name").set_limit(12);
//! let q = Query::new()
//!     .where_params("city = ? and street = ?", vec!["Oslo".into(), "Main".into()])
//!     .set_offset(10);
//! let q = Query::new()
//!     .set_group_by("city")
//!     .add_having("count(*) > 5")
//!     .add_having("max(age) < 90");
//! ```
//!
//! Clause text is trusted and inserted as written. Only the where parameters
//! are bound.

/// Variable clauses of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    table_name: Option<String>,
    columns: Option<Vec<String>>,
    where_clause: Option<String>,
    where_params: Option<Vec<String>>,
    group_by: Option<String>,
    having: Option<Vec<String>>,
    order_by: Option<Vec<String>>,
    limit: u64,
    offset: u64,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query against a table other than the data set's own.
    pub fn from_table(table_name: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            ..Self::default()
        }
    }

    /// Restrict the selected columns. Without this every column is selected.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Where clause without placeholders. Clears any parameters.
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self.where_params = Some(Vec::new());
        self
    }

    /// Where clause with one text parameter.
    ///
    /// The parameter is appended to the parameters already present, it does
    /// not replace them.
    pub fn where_param(mut self, clause: impl Into<String>, param: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self.where_params
            .get_or_insert_with(Vec::new)
            .push(param.into());
        self
    }

    /// Where clause with one integer parameter, bound as its decimal text.
    /// Appends like [`Query::where_param`].
    pub fn where_int(self, clause: impl Into<String>, param: i64) -> Self {
        self.where_param(clause, param.to_string())
    }

    /// Where clause with a full parameter list, replacing clause and
    /// parameters together.
    pub fn where_params(mut self, clause: impl Into<String>, params: Vec<String>) -> Self {
        self.where_clause = Some(clause.into());
        self.where_params = Some(params);
        self
    }

    pub fn set_group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn add_having(mut self, having: impl Into<String>) -> Self {
        self.having.get_or_insert_with(Vec::new).push(having.into());
        self
    }

    /// Replace all having clauses with one.
    pub fn set_having(mut self, having: impl Into<String>) -> Self {
        self.having = Some(vec![having.into()]);
        self
    }

    pub fn add_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by
            .get_or_insert_with(Vec::new)
            .push(order_by.into());
        self
    }

    /// Replace all order-by clauses with one.
    pub fn set_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(vec![order_by.into()]);
        self
    }

    /// Maximum number of rows. 0 means unbounded.
    pub fn set_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn set_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    // Accessors used when generating statements.

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn where_text(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    pub fn where_args(&self) -> Option<&[String]> {
        self.where_params.as_deref()
    }

    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref()
    }

    /// Having clauses joined with `AND`.
    pub fn having(&self) -> Option<String> {
        self.having.as_ref().map(|clauses| clauses.join(" AND "))
    }

    /// Order-by clauses joined with commas.
    pub fn order_by(&self) -> Option<String> {
        self.order_by.as_ref().map(|clauses| clauses.join(", "))
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}
