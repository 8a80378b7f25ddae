use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::debug;

use super::{Connection, Database, Repository, ResultSet};
use crate::config::RepositoryConfig;
use crate::value::Value;

#[derive(Clone, Debug)]
pub struct Sqlite;

impl Database for Sqlite {
    type Driver = sqlx::Sqlite;
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

impl Repository<Sqlite> {
    pub async fn connect(config: &RepositoryConfig) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.effective_max_connections())
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&config.url)
            .await?;

        debug!(repository = %config.name, url = %config.url, "connected sqlite repository");

        Ok(Self::from_pool(config.name.clone(), pool))
    }
}

#[async_trait]
impl Connection for Repository<Sqlite> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<ResultSet, sqlx::Error> {
        debug!(repository = %self.name, sql = %sql, binds = binds.len(), "execute");

        let query = binds
            .iter()
            .fold(sqlx::query(sql), |query, value| bind_value(query, value));
        let rows = query.fetch_all(&self.pool).await?;

        decode_rows(&rows)
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Integer(int) => query.bind(*int),
        Value::Real(real) => query.bind(*real),
        Value::Text(text) => query.bind(text.clone()),
        Value::Blob(blob) => query.bind(blob.clone()),
    }
}

fn decode_rows(rows: &[SqliteRow]) -> Result<ResultSet, sqlx::Error> {
    let columns = match rows.first() {
        Some(row) => row
            .columns()
            .iter()
            .map(|column| column.name().to_owned())
            .collect(),
        None => Vec::new(),
    };

    let rows = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|index| decode_value(row, index))
                .collect::<Result<Vec<Value>, sqlx::Error>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResultSet::new(columns, rows))
}

// SQLite is dynamically typed: dispatch on the storage class of the value
// itself, not on the declared column type.
fn decode_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_owned()
    };

    let value = match type_name.as_str() {
        "INTEGER" => Value::Integer(row.try_get_unchecked(index)?),
        "REAL" | "NUMERIC" => Value::Real(row.try_get_unchecked(index)?),
        "BOOLEAN" => Value::Bool(row.try_get_unchecked(index)?),
        "BLOB" => Value::Blob(row.try_get_unchecked(index)?),
        _ => Value::Text(row.try_get_unchecked(index)?),
    };

    Ok(value)
}
