//!
//! Map the rows of hand-written SQL onto model types.
//!
//! ```text
//!   SELECT name, id, first_name      Collection<GreenSmoothie>
//!   FROM green_smoothies s      =>     [ name: "Banana", id: 1,
//!   JOIN customers c ...                 first_name (attribute) ]
//! ```
//!
//! Columns are matched to declared fields by name, in whatever order the
//! query returns them. Columns matching no field are kept as ad-hoc
//! attributes on the resource. Declared fields absent from the result are
//! left unloaded, which is distinct from being loaded as NULL.
//!

extern crate self as arfind;

pub use arfind_macros::*;

pub mod builder;
pub mod collection;
pub mod config;
pub mod context;
pub mod database;
pub mod field;
pub mod finders;
pub mod identity;
pub mod mapper;
pub mod prelude;
pub mod query;
pub mod resource;
pub mod schema;
pub mod value;

pub use collection::Collection;
pub use context::Context;
pub use finders::Finders;
pub use mapper::find_by_sql;
pub use query::{Query, QueryOptions};
pub use resource::Resource;
pub use schema::Model;
pub use value::{Value, ValueKind};

#[derive(thiserror::Error, Debug)]
pub enum ArfindError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    #[error(transparent)]
    Driver(#[from] sqlx::Error),

    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    #[error("Insert into {0} returned no row")]
    NothingReturned(&'static str),
}

/// Problems with the arguments of a finder call, always raised before
/// any statement is executed.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum ArgumentError {
    #[error("find_by_sql requires a query")]
    MissingQuery,

    #[error("unacceptable query argument: {0}")]
    Unacceptable(String),

    #[error("unacceptable field selection: {0}")]
    UnacceptableField(String),

    #[error("{model} has no field named `{field}`")]
    UnknownField { model: &'static str, field: String },

    #[error("no repository named `{0}`")]
    UnknownRepository(String),

    #[error("field selection is empty")]
    EmptySelection,
}

#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum ValueError {
    #[error("field `{0}` is not loaded")]
    Unloaded(String),

    #[error("`{field}` holds {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("no attribute named `{0}`")]
    UnknownAttribute(String),
}

pub type ArfindResult<T> = Result<T, ArfindError>;
