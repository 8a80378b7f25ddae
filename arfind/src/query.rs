//!
//! Raw query arguments and options, and their normalization into an
//! effective `Query`.
//!
//! Everything here runs before any I/O: a malformed argument is reported
//! as an `ArgumentError` without touching a connection.
//!

use crate::field::Field;
use crate::schema::{FieldDescriptor, Model};
use crate::value::{FromValue, Value};
use crate::ArgumentError;

/// A query argument accepted by `find_by_sql`.
#[derive(Clone, Debug, PartialEq)]
pub enum RawQuery {
    /// Query text alone.
    Sql(String),
    /// Query text plus positional bind values.
    Bound(String, Vec<Value>),
    /// A query that already carries its own options.
    Prepared(Query),
}

/// An effective, normalized query.
///
/// Every `Collection` exposes the `Query` it was produced by, and that
/// query can be passed back to `find_by_sql`.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    sql: String,
    binds: Vec<Value>,
    repository: Option<String>,
    reload: bool,
    fields: Option<Vec<FieldSpec>>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
            repository: None,
            reload: false,
            fields: None,
        }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.binds.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    pub fn reload(&self) -> bool {
        self.reload
    }

    pub fn fields(&self) -> Option<&[FieldSpec]> {
        self.fields.as_deref()
    }

    /// Merge a raw argument with call options.
    ///
    /// Options given with a prepared query override its own settings
    /// only where they are set.
    pub(crate) fn resolve(raw: RawQuery, options: QueryOptions) -> Result<Self, ArgumentError> {
        let mut query = match raw {
            RawQuery::Sql(sql) => Query::new(sql),
            RawQuery::Bound(sql, binds) => Query {
                binds,
                ..Query::new(sql)
            },
            RawQuery::Prepared(query) => query,
        };

        if query.sql.trim().is_empty() {
            return Err(ArgumentError::MissingQuery);
        }

        if let Some(repository) = options.repository {
            query.repository = Some(repository);
        }
        if let Some(reload) = options.reload {
            query.reload = reload;
        }
        if let Some(fields) = options.fields {
            query.fields = Some(fields?);
        }

        Ok(query)
    }

    pub(crate) fn with_repository(mut self, repository: &str) -> Self {
        self.repository = Some(repository.to_owned());
        self
    }
}

/// Conversion of the accepted argument shapes into a `RawQuery`.
pub trait IntoRawQuery {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError>;
}

impl IntoRawQuery for RawQuery {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        Ok(self)
    }
}

impl IntoRawQuery for Query {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        Ok(RawQuery::Prepared(self))
    }
}

impl IntoRawQuery for &Query {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        Ok(RawQuery::Prepared(self.clone()))
    }
}

impl IntoRawQuery for &str {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        self.to_owned().into_raw_query()
    }
}

impl IntoRawQuery for String {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        if self.trim().is_empty() {
            Err(ArgumentError::MissingQuery)
        } else {
            Ok(RawQuery::Sql(self))
        }
    }
}

/// The absent argument.
impl IntoRawQuery for () {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        Err(ArgumentError::MissingQuery)
    }
}

impl<Q: IntoRawQuery> IntoRawQuery for Option<Q> {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        match self {
            Some(query) => query.into_raw_query(),
            None => Err(ArgumentError::MissingQuery),
        }
    }
}

/// `(sql, binds)` where binds is a single scalar or a list.
impl<S, B> IntoRawQuery for (S, B)
where
    S: Into<String>,
    B: IntoBinds,
{
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        let sql = self.0.into();
        if sql.trim().is_empty() {
            return Err(ArgumentError::MissingQuery);
        }
        Ok(RawQuery::Bound(sql, self.1.into_binds()))
    }
}

/// A dynamically typed argument: only text is a query.
impl IntoRawQuery for Value {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        match self {
            Value::Null => Err(ArgumentError::MissingQuery),
            Value::Text(sql) => sql.into_raw_query(),
            other => Err(ArgumentError::Unacceptable(format!(
                "expected query text, got {}",
                other.kind()
            ))),
        }
    }
}

/// A dynamically typed array: `[sql, bind, bind, ...]`.
impl IntoRawQuery for Vec<Value> {
    fn into_raw_query(self) -> Result<RawQuery, ArgumentError> {
        let mut values = self.into_iter();
        match values.next() {
            None | Some(Value::Null) => Err(ArgumentError::MissingQuery),
            Some(Value::Text(sql)) => (sql, values.collect::<Vec<_>>()).into_raw_query(),
            Some(other) => Err(ArgumentError::Unacceptable(format!(
                "expected query text as first element, got {}",
                other.kind()
            ))),
        }
    }
}

/// Bind values accompanying query text.
pub trait IntoBinds {
    fn into_binds(self) -> Vec<Value>;
}

impl<T: Into<Value>> IntoBinds for Vec<T> {
    fn into_binds(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

macro_rules! impl_scalar_binds {
    ($($ty:ty),*) => {
        $(
            impl IntoBinds for $ty {
                fn into_binds(self) -> Vec<Value> {
                    vec![self.into()]
                }
            }
        )*
    };
}

impl_scalar_binds!(Value, bool, i32, i64, f64, String, &str);

/// One entry of an explicit field selection.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldSpec {
    /// A field name, resolved against the target model.
    Name(String),
    /// A descriptor, possibly declared by another model.
    Descriptor(FieldDescriptor),
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        match self {
            FieldSpec::Name(name) => name,
            FieldSpec::Descriptor(descriptor) => descriptor.name,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        FieldSpec::Name(name.to_owned())
    }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self {
        FieldSpec::Name(name)
    }
}

impl From<FieldDescriptor> for FieldSpec {
    fn from(descriptor: FieldDescriptor) -> Self {
        FieldSpec::Descriptor(descriptor)
    }
}

impl From<&FieldDescriptor> for FieldSpec {
    fn from(descriptor: &FieldDescriptor) -> Self {
        FieldSpec::Descriptor(*descriptor)
    }
}

impl<M: Model, T: FromValue> From<Field<M, T>> for FieldSpec {
    fn from(field: Field<M, T>) -> Self {
        FieldSpec::Descriptor(*field.descriptor())
    }
}

/// The accepted shapes of the `fields` option: a single field, a single
/// name, or an ordered set of either.
pub trait IntoFieldSelection {
    fn into_field_selection(self) -> Result<Vec<FieldSpec>, ArgumentError>;
}

fn non_empty(specs: Vec<FieldSpec>) -> Result<Vec<FieldSpec>, ArgumentError> {
    if specs.is_empty() {
        Err(ArgumentError::EmptySelection)
    } else {
        Ok(specs)
    }
}

impl IntoFieldSelection for &str {
    fn into_field_selection(self) -> Result<Vec<FieldSpec>, ArgumentError> {
        Ok(vec![self.into()])
    }
}

impl IntoFieldSelection for String {
    fn into_field_selection(self) -> Result<Vec<FieldSpec>, ArgumentError> {
        Ok(vec![self.into()])
    }
}

impl<M: Model, T: FromValue> IntoFieldSelection for Field<M, T> {
    fn into_field_selection(self) -> Result<Vec<FieldSpec>, ArgumentError> {
        Ok(vec![self.into()])
    }
}

impl IntoFieldSelection for FieldDescriptor {
    fn into_field_selection(self) -> Result<Vec<FieldSpec>, ArgumentError> {
        Ok(vec![self.into()])
    }
}

/// A whole field set, e.g. `Model::fields()`.
impl IntoFieldSelection for &[FieldDescriptor] {
    fn into_field_selection(self) -> Result<Vec<FieldSpec>, ArgumentError> {
        non_empty(self.iter().map(FieldSpec::from).collect())
    }
}

impl<T: Into<FieldSpec>> IntoFieldSelection for Vec<T> {
    fn into_field_selection(self) -> Result<Vec<FieldSpec>, ArgumentError> {
        non_empty(self.into_iter().map(Into::into).collect())
    }
}

/// A dynamically typed list: only text names are field specs.
impl IntoFieldSelection for Value {
    fn into_field_selection(self) -> Result<Vec<FieldSpec>, ArgumentError> {
        match self {
            Value::Text(name) => Ok(vec![FieldSpec::Name(name)]),
            other => Err(ArgumentError::UnacceptableField(format!(
                "expected a field name, got {}",
                other.kind()
            ))),
        }
    }
}

/// Call options of `find_by_sql`.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    repository: Option<String>,
    reload: Option<bool>,
    fields: Option<Result<Vec<FieldSpec>, ArgumentError>>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run against the named repository instead of the context default.
    pub fn repository(mut self, name: impl Into<String>) -> Self {
        self.repository = Some(name.into());
        self
    }

    /// Overwrite already materialized identities with the fetched values.
    pub fn reload(mut self, reload: bool) -> Self {
        self.reload = Some(reload);
        self
    }

    /// Populate exactly these fields, ignoring every other result column.
    ///
    /// A malformed selection is reported when the query is run.
    pub fn fields(mut self, selection: impl IntoFieldSelection) -> Self {
        self.fields = Some(selection.into_field_selection());
        self
    }
}
