//!
//! Fixed-template statements used by the finders.
//!

use crate::query::Query;
use crate::schema::{FieldDescriptor, Model};
use crate::value::Value;

pub struct QueryBuilder {
    buf: String,
    binds: Vec<Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            binds: Vec::new(),
        }
    }

    pub fn build(self) -> Query {
        self.binds
            .into_iter()
            .fold(Query::new(self.buf), |query, value| query.bind(value))
    }

    pub fn push(&mut self, str: &str) {
        self.buf.push_str(str);
    }

    /// Push a double-quoted identifier.
    pub fn push_identifier(&mut self, name: &str) {
        self.buf.push('"');
        self.buf.push_str(&name.replace('"', "\"\""));
        self.buf.push('"');
    }

    /// Push a positional placeholder bound to `value`.
    pub fn push_bind(&mut self, value: Value) {
        self.buf.push('?');
        self.binds.push(value);
    }

    /// Like `push_bind`, but NULL is written as a literal so the server
    /// infers its type from the target column.
    pub fn push_value(&mut self, value: Value) {
        if value.is_null() {
            self.push("NULL");
        } else {
            self.push_bind(value);
        }
    }

    pub fn push_identifiers<'f>(&mut self, names: impl IntoIterator<Item = &'f str>) {
        for (index, name) in names.into_iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            self.push_identifier(name);
        }
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn field_names<M: Model>() -> impl Iterator<Item = &'static str> {
    M::fields().iter().map(|field| field.name)
}

/// `SELECT <all fields> FROM <model> WHERE <conditions> ORDER BY <key> [LIMIT n]`
pub fn select_where<M: Model>(
    conditions: &[(&'static FieldDescriptor, Value)],
    limit: Option<u64>,
) -> Query {
    let mut builder = QueryBuilder::new();

    builder.push("SELECT ");
    builder.push_identifiers(field_names::<M>());
    builder.push(" FROM ");
    builder.push_identifier(M::storage_name());

    for (index, (field, value)) in conditions.iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        builder.push_identifier(field.name);
        if value.is_null() {
            builder.push(" IS NULL");
        } else {
            builder.push(" = ");
            builder.push_bind(value.clone());
        }
    }

    let fields = M::fields();
    let key_indices = M::key_indices();
    if !key_indices.is_empty() {
        builder.push(" ORDER BY ");
        builder.push_identifiers(key_indices.into_iter().map(|index| fields[index].name));
    }

    if let Some(limit) = limit {
        builder.push(&format!(" LIMIT {}", limit));
    }

    builder.build()
}

/// `INSERT INTO <model> (<attributes>) VALUES (...) RETURNING <all fields>`
pub fn insert_returning<M: Model>(attributes: &[(&'static FieldDescriptor, Value)]) -> Query {
    let mut builder = QueryBuilder::new();

    builder.push("INSERT INTO ");
    builder.push_identifier(M::storage_name());

    if attributes.is_empty() {
        builder.push(" DEFAULT VALUES");
    } else {
        builder.push(" (");
        builder.push_identifiers(attributes.iter().map(|(field, _)| field.name));
        builder.push(") VALUES (");
        for (index, (_, value)) in attributes.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push_value(value.clone());
        }
        builder.push(")");
    }

    builder.push(" RETURNING ");
    builder.push_identifiers(field_names::<M>());

    builder.build()
}
