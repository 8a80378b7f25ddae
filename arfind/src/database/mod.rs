//!
//! Connection execution primitive and the sqlx-backed repositories
//! implementing it.
//!

use async_trait::async_trait;

use crate::value::Value;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::Postgres;
#[cfg(feature = "sqlite")]
pub use sqlite::Sqlite;

/// Backend marker, selecting the sqlx driver of a `Repository`.
pub trait Database: std::fmt::Debug + Sync + Send + Clone + 'static {
    type Driver: sqlx::Database;
}

/// Something that can run a textual query with positional binds.
///
/// Errors are the driver's own and are passed on untouched.
#[async_trait]
pub trait Connection: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<ResultSet, sqlx::Error>;
}

/// A named connection pool.
pub struct Repository<DB: Database> {
    name: String,
    pool: sqlx::Pool<DB::Driver>,
}

impl<DB: Database> Repository<DB> {
    pub fn from_pool(name: impl Into<String>, pool: sqlx::Pool<DB::Driver>) -> Self {
        Self {
            name: name.into(),
            pool,
        }
    }

    pub fn pool(&self) -> &sqlx::Pool<DB::Driver> {
        &self.pool
    }
}

impl<DB: Database> Clone for Repository<DB> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<DB: Database> std::fmt::Debug for Repository<DB> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "Repository({})", self.name)
    }
}

/// The tabular outcome of one query.
///
/// Column order is whatever the query produced. A query returning no
/// rows reports no columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = ResultRow<'_>> {
        let columns = &self.columns;
        self.rows.iter().map(move |values| ResultRow { columns, values })
    }
}

/// One row: column name to value, in result order.
#[derive(Clone, Copy, Debug)]
pub struct ResultRow<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> ResultRow<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
    }

    pub fn value_at(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}
