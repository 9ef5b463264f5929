//! SQL text generation for table maintenance and CRUD statements.
//!
//! Every function here is pure. Table and column names, and the clause text
//! carried by a [`Query`], are inserted as written; values only ever travel as
//! bound parameters.

use crate::field_set::FieldSet;
use crate::query::Query;
use crate::value::{DbValue, ValueMap};

/// Generated statement text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<DbValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<DbValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// `CREATE TABLE` text for a field set.
///
/// The output is the on-disk schema contract, so its exact spelling matters:
/// `CREATE TABLE t (id INTEGER primary key autoincrement , name TEXT not null )`.
/// Length and precision constraints are not emitted.
pub fn create_table(table_name: &str, fields: &FieldSet) -> String {
    let columns: Vec<String> = fields
        .iter()
        .map(|field| {
            let mut column = format!("{} {} ", field.name, field.type_name());
            if field.primary_key {
                column.push_str("primary key autoincrement ");
            }
            if field.required {
                column.push_str("not null ");
            }
            column
        })
        .collect();

    format!("CREATE TABLE {} ({})", table_name, columns.join(", "))
}

pub fn drop_table(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", table_name)
}

/// Count of tables named `table_name`: 1 when it exists, 0 otherwise.
pub fn table_count(table_name: &str) -> Statement {
    Statement::new(
        "SELECT count(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?",
        vec![DbValue::from(table_name)],
    )
}

/// Forget the table's autoincrement counter so the next key starts over.
pub fn reset_autonumber(table_name: &str) -> String {
    format!(
        "DELETE FROM sqlite_sequence where name='{}'",
        table_name.replace('\'', "''")
    )
}

pub fn select(table_name: &str, query: &Query) -> Statement {
    let table = query.table_name().unwrap_or(table_name);
    let columns = match query.columns() {
        Some(columns) if !columns.is_empty() => columns.join(", "),
        _ => "*".to_string(),
    };

    let mut sql = format!("SELECT {} FROM {}", columns, table);
    let params = push_where(&mut sql, query);

    if let Some(group_by) = query.group_by() {
        sql.push_str(" GROUP BY ");
        sql.push_str(group_by);
    }
    if let Some(having) = query.having() {
        sql.push_str(" HAVING ");
        sql.push_str(&having);
    }
    if let Some(order_by) = query.order_by() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by);
    }
    match (query.limit(), query.offset()) {
        (0, 0) => {}
        (0, offset) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        (limit, 0) => sql.push_str(&format!(" LIMIT {}", limit)),
        (limit, offset) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
    }

    Statement::new(sql, params)
}

pub fn insert(table_name: &str, values: &ValueMap) -> Statement {
    if values.is_empty() {
        return Statement::new(format!("INSERT INTO {} DEFAULT VALUES", table_name), Vec::new());
    }

    let columns: Vec<&str> = values.columns().collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table_name,
        columns.join(", "),
        placeholders
    );
    Statement::new(sql, values.values().cloned().collect())
}

/// Update statement using only the where portion of `query`.
pub fn update(table_name: &str, values: &ValueMap, query: &Query) -> Statement {
    let assignments: Vec<String> = values.columns().map(|c| format!("{} = ?", c)).collect();
    let mut sql = format!("UPDATE {} SET {}", table_name, assignments.join(", "));
    let mut params: Vec<DbValue> = values.values().cloned().collect();
    params.extend(push_where(&mut sql, query));
    Statement::new(sql, params)
}

/// Delete statement using only the where portion of `query`.
pub fn delete(table_name: &str, query: &Query) -> Statement {
    let mut sql = format!("DELETE FROM {}", table_name);
    let params = push_where(&mut sql, query);
    Statement::new(sql, params)
}

fn push_where(sql: &mut String, query: &Query) -> Vec<DbValue> {
    let Some(clause) = query.where_text() else {
        return Vec::new();
    };
    sql.push_str(" WHERE ");
    sql.push_str(clause);
    query
        .where_args()
        .unwrap_or_default()
        .iter()
        .map(|p| DbValue::Text(p.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDescriptor, FieldKind};

    fn id_and_name() -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .add_with(FieldDescriptor::new("id", FieldKind::Integer).primary_key())
            .add_with(FieldDescriptor::new("name", FieldKind::Text).required());
        fields
    }

    #[test]
    fn test_create_table_exact_text() {
        assert_eq!(
            create_table("t", &id_and_name()),
            "CREATE TABLE t (id INTEGER primary key autoincrement , name TEXT not null )"
        );
    }

    #[test]
    fn test_create_table_plain_columns() {
        let mut fields = FieldSet::new();
        fields
            .add("count", FieldKind::Integer)
            .add("price", FieldKind::FixedPoint)
            .add_with(FieldDescriptor::new("note", FieldKind::Text).max_length(10));
        assert_eq!(
            create_table("items", &fields),
            "CREATE TABLE items (count INTEGER , price FLOAT , note TEXT )"
        );
    }

    #[test]
    fn test_drop_and_reset() {
        assert_eq!(drop_table("t"), "DROP TABLE IF EXISTS t");
        assert_eq!(
            reset_autonumber("t"),
            "DELETE FROM sqlite_sequence where name='t'"
        );
        assert_eq!(
            reset_autonumber("o'brien"),
            "DELETE FROM sqlite_sequence where name='o''brien'"
        );
    }

    #[test]
    fn test_select_all() {
        let stmt = select("people", &Query::new());
        assert_eq!(stmt.sql, "SELECT * FROM people");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_every_clause() {
        let query = Query::from_table("archive")
            .select(["city", "count(*)"])
            .where_int("age > ?", 30)
            .set_group_by("city")
            .add_having("count(*) > 1")
            .add_order_by("city DESC")
            .set_limit(5)
            .set_offset(10);
        let stmt = select("people", &query);

        assert_eq!(
            stmt.sql,
            "SELECT city, count(*) FROM archive WHERE age > ? GROUP BY city \
             HAVING count(*) > 1 ORDER BY city DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(stmt.params, vec![DbValue::Text("30".to_string())]);
    }

    #[test]
    fn test_select_offset_without_limit() {
        let stmt = select("t", &Query::new().set_offset(3));
        assert_eq!(stmt.sql, "SELECT * FROM t LIMIT -1 OFFSET 3");
    }

    #[test]
    fn test_insert_binds_values_in_order() {
        let mut values = ValueMap::new();
        values.insert("id", DbValue::Null);
        values.insert("name", "ada");
        let stmt = insert("people", &values);

        assert_eq!(stmt.sql, "INSERT INTO people (id, name) VALUES (?, ?)");
        assert_eq!(stmt.params, vec![DbValue::Null, DbValue::from("ada")]);
    }

    #[test]
    fn test_insert_without_values() {
        let stmt = insert("t", &ValueMap::new());
        assert_eq!(stmt.sql, "INSERT INTO t DEFAULT VALUES");
    }

    #[test]
    fn test_update_appends_where_params_after_values() {
        let mut values = ValueMap::new();
        values.insert("name", "grace");
        let stmt = update("people", &values, &Query::new().where_int("id = ?", 4));

        assert_eq!(stmt.sql, "UPDATE people SET name = ? WHERE id = ?");
        assert_eq!(
            stmt.params,
            vec![DbValue::from("grace"), DbValue::Text("4".to_string())]
        );
    }

    #[test]
    fn test_delete_ignores_non_where_parts() {
        let query = Query::new()
            .where_param("name = ?", "x")
            .add_order_by("id")
            .set_limit(1);
        let stmt = delete("people", &query);
        assert_eq!(stmt.sql, "DELETE FROM people WHERE name = ?");

        assert_eq!(delete("people", &Query::new()).sql, "DELETE FROM people");
    }
}
