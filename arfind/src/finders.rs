//!
//! Convenience finders built on `find_by_sql`.
//!
//! Every statement is produced by the fixed templates in `builder` and
//! goes through the same mapping as a hand-written query.
//!

use async_trait::async_trait;
use tracing::debug;

use crate::builder;
use crate::collection::Collection;
use crate::context::Context;
use crate::field::Field;
use crate::mapper;
use crate::query::{IntoRawQuery, QueryOptions};
use crate::resource::Resource;
use crate::schema::{FieldDescriptor, Model};
use crate::value::{FromValue, Value};
use crate::{ArfindError, ArfindResult, ArgumentError};

#[async_trait]
pub trait Finders: Model {
    /// Run a raw query and map its rows onto `Self`.
    async fn find_by_sql<Q>(
        ctx: &Context,
        query: Q,
        options: QueryOptions,
    ) -> ArfindResult<Collection<Self>>
    where
        Q: IntoRawQuery + Send,
    {
        mapper::find_by_sql::<Self, Q>(ctx, query, options).await
    }

    /// First resource whose `field` equals `value`.
    async fn find_by<T, V>(
        ctx: &Context,
        field: Field<Self, T>,
        value: V,
    ) -> ArfindResult<Option<Resource<Self>>>
    where
        T: FromValue,
        V: Into<Value> + Send,
    {
        let query = builder::select_where::<Self>(&[(field.descriptor(), value.into())], Some(1));
        let found = mapper::find_by_sql::<Self, _>(ctx, query, QueryOptions::new()).await?;

        Ok(found.into_iter().next())
    }

    /// All resources whose `field` equals `value`, ordered by key.
    async fn find_all_by<T, V>(
        ctx: &Context,
        field: Field<Self, T>,
        value: V,
    ) -> ArfindResult<Collection<Self>>
    where
        T: FromValue,
        V: Into<Value> + Send,
    {
        let query = builder::select_where::<Self>(&[(field.descriptor(), value.into())], None);
        mapper::find_by_sql::<Self, _>(ctx, query, QueryOptions::new()).await
    }

    /// First resource matching every condition, created from the
    /// conditions when there is none.
    ///
    /// The lookup and the insert are separate statements.
    async fn find_or_create(
        ctx: &Context,
        conditions: &[(&str, Value)],
    ) -> ArfindResult<Resource<Self>> {
        let conditions = declared::<Self>(conditions)?;

        let query = builder::select_where::<Self>(&conditions, Some(1));
        let found = mapper::find_by_sql::<Self, _>(ctx, query, QueryOptions::new()).await?;
        if let Some(resource) = found.into_iter().next() {
            return Ok(resource);
        }

        debug!(model = Self::storage_name(), "find_or_create: nothing found, creating");

        insert::<Self>(ctx, &conditions).await
    }

    /// Insert a row and return it as stored.
    async fn create(ctx: &Context, attributes: &[(&str, Value)]) -> ArfindResult<Resource<Self>> {
        let attributes = declared::<Self>(attributes)?;
        insert::<Self>(ctx, &attributes).await
    }
}

impl<M: Model> Finders for M {}

fn declared<M: Model>(
    pairs: &[(&str, Value)],
) -> Result<Vec<(&'static FieldDescriptor, Value)>, ArgumentError> {
    pairs
        .iter()
        .map(|(name, value)| {
            M::field(name)
                .map(|field| (field, value.clone()))
                .ok_or_else(|| ArgumentError::UnknownField {
                    model: M::storage_name(),
                    field: (*name).to_owned(),
                })
        })
        .collect()
}

async fn insert<M: Model>(
    ctx: &Context,
    attributes: &[(&'static FieldDescriptor, Value)],
) -> ArfindResult<Resource<M>> {
    let query = builder::insert_returning::<M>(attributes);
    // the stored row is authoritative over anything cached for its key
    let created = mapper::find_by_sql::<M, _>(ctx, query, QueryOptions::new().reload(true)).await?;

    created
        .into_iter()
        .next()
        .ok_or(ArfindError::NothingReturned(M::storage_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Connection, ResultSet};
    use parking_lot::Mutex;
    use std::sync::Arc;

    pub struct Smoothie;

    #[crate::model("smoothies")]
    impl Smoothie {
        fn id() -> i64;
        fn name() -> String;
    }

    /// Records statements and answers each with the next canned result.
    struct Script {
        statements: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
        results: Mutex<Vec<ResultSet>>,
    }

    impl Script {
        fn new(mut results: Vec<ResultSet>) -> (Self, Arc<Mutex<Vec<(String, Vec<Value>)>>>) {
            results.reverse();
            let statements = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    statements: statements.clone(),
                    results: Mutex::new(results),
                },
                statements,
            )
        }
    }

    #[async_trait]
    impl Connection for Script {
        fn name(&self) -> &str {
            "script"
        }

        async fn execute(&self, sql: &str, binds: &[Value]) -> Result<ResultSet, sqlx::Error> {
            self.statements.lock().push((sql.to_owned(), binds.to_vec()));
            Ok(self
                .results
                .lock()
                .pop()
                .unwrap_or_else(|| ResultSet::new(vec![], vec![])))
        }
    }

    fn banana() -> ResultSet {
        ResultSet::new(
            vec!["id".into(), "name".into()],
            vec![vec![Value::Integer(1), Value::from("Banana")]],
        )
    }

    #[tokio::test]
    async fn find_or_create_inserts_when_nothing_matches() -> ArfindResult<()> {
        let (script, statements) = Script::new(vec![ResultSet::new(vec![], vec![]), banana()]);
        let ctx = Context::new(script);

        let created = Smoothie::find_or_create(&ctx, &[("name", Value::from("Banana"))]).await?;
        assert_eq!(created.get(Smoothie::id())?, 1);

        let statements = statements.lock();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].0.starts_with("SELECT"));
        assert!(statements[1].0.starts_with("INSERT INTO \"smoothies\""));
        assert_eq!(statements[1].1, vec![Value::from("Banana")]);
        Ok(())
    }

    #[tokio::test]
    async fn find_or_create_returns_the_existing_row() -> ArfindResult<()> {
        let (script, statements) = Script::new(vec![banana()]);
        let ctx = Context::new(script);

        let found = Smoothie::find_or_create(&ctx, &[("name", Value::from("Banana"))]).await?;
        assert_eq!(found.get(Smoothie::name())?, "Banana");
        assert_eq!(statements.lock().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn undeclared_names_are_rejected_before_io() {
        let (script, statements) = Script::new(vec![]);
        let ctx = Context::new(script);

        let error = Smoothie::create(&ctx, &[("colour", Value::from("green"))])
            .await
            .err()
            .unwrap();
        assert!(matches!(
            error,
            ArfindError::InvalidArgument(ArgumentError::UnknownField { .. })
        ));
        assert!(statements.lock().is_empty());
    }

    #[tokio::test]
    async fn create_without_a_returned_row_fails() {
        let (script, _) = Script::new(vec![]);
        let ctx = Context::new(script);

        let error = Smoothie::create(&ctx, &[]).await.err().unwrap();
        assert!(matches!(error, ArfindError::NothingReturned("smoothies")));
    }
}
