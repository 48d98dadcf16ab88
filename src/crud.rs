use std::marker::PhantomData;

use chrono::NaiveDateTime;
use diesel::sql_types::{BigInt, Bool};
use diesel::sqlite::{Sqlite, SqliteConnection};
use diesel::QueryableByName;

use crate::db::{self, ExecuteOutcome};
use crate::error::StoreResult;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Null,
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

pub trait Entity: QueryableByName<Sqlite> + Sized + 'static {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    /// Column refreshed on every `update_by_id`, if the table has one.
    const UPDATED_AT: Option<&'static str> = Some("updated_at");

    type Deletion: DeleteStrategy;
}

pub trait DeleteStrategy {
    fn statement(table: &str, primary_key: &str) -> String;
}

pub enum HardDelete {}

impl DeleteStrategy for HardDelete {
    fn statement(table: &str, primary_key: &str) -> String {
        format!("DELETE FROM {table} WHERE {primary_key} = ?")
    }
}

/// Entities retired by flipping a flag column instead of removing the row.
pub trait SoftDeletable: Entity {
    const FLAG_COLUMN: &'static str;
    /// SQL literal written into `FLAG_COLUMN` when the row is retired.
    const RETIRED_VALUE: &'static str;
}

pub struct SoftDelete<E>(PhantomData<E>);

impl<E: SoftDeletable> DeleteStrategy for SoftDelete<E> {
    fn statement(table: &str, primary_key: &str) -> String {
        format!(
            "UPDATE {table} SET {} = {} WHERE {primary_key} = ?",
            E::FLAG_COLUMN,
            E::RETIRED_VALUE
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

pub type Criterion = (&'static str, SqlValue);

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub order_by: Option<(&'static str, Direction)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(QueryableByName)]
struct ExistsRow {
    #[diesel(sql_type = Bool)]
    present: bool,
}

fn where_clause(criteria: &[Criterion]) -> (String, Vec<SqlValue>) {
    if criteria.is_empty() {
        return (String::new(), Vec::new());
    }
    let mut clauses = Vec::with_capacity(criteria.len());
    let mut params = Vec::with_capacity(criteria.len());
    for (column, value) in criteria {
        if matches!(value, SqlValue::Null) {
            clauses.push(format!("{column} IS NULL"));
        } else {
            clauses.push(format!("{column} = ?"));
            params.push(value.clone());
        }
    }
    (format!(" WHERE {}", clauses.join(" AND ")), params)
}

pub fn find_by_id<E: Entity>(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<E>> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = ? LIMIT 1",
        E::TABLE,
        E::PRIMARY_KEY
    );
    let mut rows: Vec<E> = db::query(conn, &sql, vec![SqlValue::from(id)])?;
    Ok(rows.pop())
}

pub fn find_by<E: Entity>(
    conn: &mut SqliteConnection,
    criteria: &[Criterion],
    options: &FindOptions,
) -> StoreResult<Vec<E>> {
    let (filter, mut params) = where_clause(criteria);
    let mut sql = format!("SELECT * FROM {}{filter}", E::TABLE);
    if let Some((column, direction)) = options.order_by {
        sql.push_str(&format!(" ORDER BY {column} {}", direction.keyword()));
    }
    match (options.limit, options.offset) {
        (Some(limit), offset) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(SqlValue::Integer(limit));
            params.push(SqlValue::Integer(offset.unwrap_or(0)));
        }
        (None, Some(offset)) => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(SqlValue::Integer(offset));
        }
        (None, None) => {}
    }
    db::query(conn, &sql, params)
}

pub fn create<E: Entity>(
    conn: &mut SqliteConnection,
    values: Vec<Criterion>,
) -> StoreResult<ExecuteOutcome> {
    let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        E::TABLE,
        columns.join(", ")
    );
    let params = values.into_iter().map(|(_, value)| value).collect();
    db::execute(conn, &sql, params)
}

/// Applies `values` to the row with `id`, refreshing the entity's
/// `UPDATED_AT` column when it has one. Returns the number of rows touched.
pub fn update_by_id<E: Entity>(
    conn: &mut SqliteConnection,
    id: &str,
    values: Vec<Criterion>,
    now: NaiveDateTime,
) -> StoreResult<usize> {
    let mut assignments: Vec<String> = values
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect();
    let mut params: Vec<SqlValue> = values.into_iter().map(|(_, value)| value).collect();
    if let Some(column) = E::UPDATED_AT {
        assignments.push(format!("{column} = ?"));
        params.push(SqlValue::Timestamp(now));
    }
    if assignments.is_empty() {
        return Ok(0);
    }
    params.push(SqlValue::from(id));
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        E::TABLE,
        assignments.join(", "),
        E::PRIMARY_KEY
    );
    Ok(db::execute(conn, &sql, params)?.affected_rows)
}

pub fn delete_by_id<E: Entity>(conn: &mut SqliteConnection, id: &str) -> StoreResult<usize> {
    let sql = E::Deletion::statement(E::TABLE, E::PRIMARY_KEY);
    Ok(db::execute(conn, &sql, vec![SqlValue::from(id)])?.affected_rows)
}

pub fn count<E: Entity>(conn: &mut SqliteConnection, criteria: &[Criterion]) -> StoreResult<i64> {
    let (filter, params) = where_clause(criteria);
    let sql = format!("SELECT COUNT(*) AS count FROM {}{filter}", E::TABLE);
    let rows: Vec<CountRow> = db::query(conn, &sql, params)?;
    Ok(rows.first().map(|row| row.count).unwrap_or(0))
}

pub fn exists<E: Entity>(conn: &mut SqliteConnection, id: &str) -> StoreResult<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?) AS present",
        E::TABLE,
        E::PRIMARY_KEY
    );
    let rows: Vec<ExistsRow> = db::query(conn, &sql, vec![SqlValue::from(id)])?;
    Ok(rows.first().map(|row| row.present).unwrap_or(false))
}
