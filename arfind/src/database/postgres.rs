use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use sqlx::encode::IsNull;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgPoolOptions, PgRow, PgTypeInfo};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, Uuid};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::fmt::Write;
use tracing::debug;

use super::{Connection, Database, Repository, ResultSet};
use crate::config::RepositoryConfig;
use crate::value::Value;

#[derive(Clone, Debug)]
pub struct Postgres;

impl Database for Postgres {
    type Driver = sqlx::Postgres;
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

impl Repository<Postgres> {
    pub async fn connect(config: &RepositoryConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.effective_max_connections())
            .connect(&config.url)
            .await?;

        debug!(repository = %config.name, "connected postgres repository");

        Ok(Self::from_pool(config.name.clone(), pool))
    }
}

#[async_trait]
impl Connection for Repository<Postgres> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<ResultSet, sqlx::Error> {
        let sql = numbered_placeholders(sql);
        debug!(repository = %self.name, sql = %sql, binds = binds.len(), "execute");

        let query = binds
            .iter()
            .fold(sqlx::query(&sql), |query, value| bind_value(query, value));
        let rows = query.fetch_all(&self.pool).await?;

        decode_rows(&rows)
    }
}

/// Rewrites `?` placeholders into `$1, $2, ...`.
///
/// Quoted literals and identifiers, `--` and `/* */` comments and
/// dollar-quoted bodies (`$$ ... $$`, `$tag$ ... $tag$`) are copied as is.
pub fn numbered_placeholders(sql: &str) -> String {
    let mut buf = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut rest = sql;

    while let Some(ch) = rest.chars().next() {
        let skip = match ch {
            '?' => {
                index += 1;
                let _ = write!(buf, "${}", index);
                rest = &rest[1..];
                continue;
            }
            '\'' | '"' => rest[1..].find(ch).map(|end| end + 2).unwrap_or(rest.len()),
            '-' if rest.starts_with("--") => rest.find('\n').unwrap_or(rest.len()),
            '/' if rest.starts_with("/*") => {
                rest[2..].find("*/").map(|end| end + 4).unwrap_or(rest.len())
            }
            '$' => dollar_quoted_len(rest).unwrap_or(1),
            _ => ch.len_utf8(),
        };

        buf.push_str(&rest[..skip]);
        rest = &rest[skip..];
    }

    buf
}

/// Length of the dollar-quoted string `rest` starts with, if any.
/// `$1` and friends are not dollar quotes.
fn dollar_quoted_len(rest: &str) -> Option<usize> {
    let tag_end = rest[1..].find('$')? + 1;
    let tag = &rest[1..tag_end];
    if tag.starts_with(|ch: char| ch.is_ascii_digit())
        || !tag.chars().all(|ch| ch.is_alphanumeric() || ch == '_')
    {
        return None;
    }

    let delimiter = &rest[..=tag_end];
    let body = &rest[delimiter.len()..];
    Some(
        body.find(delimiter)
            .map(|end| 2 * delimiter.len() + end)
            .unwrap_or(rest.len()),
    )
}

/// A NULL parameter without a declared type, so the server infers it
/// from context the way it does for a literal NULL.
struct UntypedNull;

impl sqlx::Type<sqlx::Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> IsNull {
        IsNull::Yes
    }
}

fn bind_value<'q>(query: PgQuery<'q>, value: &Value) -> PgQuery<'q> {
    match value {
        Value::Null => query.bind(UntypedNull),
        Value::Bool(b) => query.bind(*b),
        Value::Integer(int) => query.bind(*int),
        Value::Real(real) => query.bind(*real),
        Value::Text(text) => query.bind(text.clone()),
        Value::Blob(blob) => query.bind(blob.clone()),
    }
}

fn decode_rows(rows: &[PgRow]) -> Result<ResultSet, sqlx::Error> {
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

// Temporal and uuid values are rendered as text. Types without a
// mapping fail in the text fallback with the driver's own decode error.
fn decode_value(row: &PgRow, index: usize) -> Result<Value, sqlx::Error> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_owned()
    };

    let value = match type_name.as_str() {
        "BOOL" => Value::Bool(row.try_get(index)?),
        "INT2" => Value::Integer(row.try_get::<i16, _>(index)?.into()),
        "INT4" => Value::Integer(row.try_get::<i32, _>(index)?.into()),
        "INT8" => Value::Integer(row.try_get(index)?),
        "OID" => Value::Integer(row.try_get::<Oid, _>(index)?.0.into()),
        "FLOAT4" => Value::Real(row.try_get::<f32, _>(index)?.into()),
        "FLOAT8" => Value::Real(row.try_get(index)?),
        "NUMERIC" => numeric_value(row.try_get(index)?),
        "BYTEA" => Value::Blob(row.try_get(index)?),
        "UUID" => Value::Text(row.try_get::<Uuid, _>(index)?.to_string()),
        "DATE" => Value::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "TIMESTAMP" => Value::Text(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
        "TIMESTAMPTZ" => Value::Text(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
        _ => Value::Text(row.try_get(index)?),
    };

    Ok(value)
}

/// Whole numbers that fit become integers, everything else a float.
fn numeric_value(decimal: Decimal) -> Value {
    if decimal.fract().is_zero() {
        if let Some(int) = decimal.to_i64() {
            return Value::Integer(int);
        }
    }

    decimal.to_f64().map(Value::Real).unwrap_or_else(|| Value::Text(decimal.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_in_order() {
        assert_eq!(
            numbered_placeholders("SELECT id FROM t WHERE id = ? AND name = ?"),
            "SELECT id FROM t WHERE id = $1 AND name = $2"
        );
    }

    #[test]
    fn comments_and_dollar_quotes_are_kept() {
        assert_eq!(
            numbered_placeholders("SELECT 1 -- why?\nWHERE a = ? /* or ? */ AND b = ?"),
            "SELECT 1 -- why?\nWHERE a = $1 /* or ? */ AND b = $2"
        );
        assert_eq!(
            numbered_placeholders("SELECT $$a?b$$, $fn$ ? $fn$ WHERE x = ?"),
            "SELECT $$a?b$$, $fn$ ? $fn$ WHERE x = $1"
        );
        assert_eq!(
            numbered_placeholders("SELECT price$ FROM t WHERE y = ?"),
            "SELECT price$ FROM t WHERE y = $1"
        );
    }

    #[test]
    fn numerics_keep_integers_exact() {
        assert_eq!(numeric_value(Decimal::new(42, 0)), Value::Integer(42));
        assert_eq!(numeric_value(Decimal::new(4200, 2)), Value::Integer(42));
        assert_eq!(numeric_value(Decimal::new(15, 1)), Value::Real(1.5));
    }

    #[test]
    fn quoted_question_marks_are_kept() {
        assert_eq!(
            numbered_placeholders("SELECT '?', \"a?\" FROM t WHERE x = ? AND y = 'it''s?'"),
            "SELECT '?', \"a?\" FROM t WHERE x = $1 AND y = 'it''s?'"
        );
    }
}
