pub use crate::collection::Collection;
pub use crate::config::RepositoryConfig;
pub use crate::context::Context;
pub use crate::database::{Connection, Repository};
pub use crate::field::Field;
pub use crate::finders::Finders;
pub use crate::identity::IdentityMap;
pub use crate::query::{FieldSpec, Query, QueryOptions};
pub use crate::resource::{FieldState, Resource};
pub use crate::schema::Model;
pub use crate::value::Value;
pub use crate::{ArfindError, ArfindResult, ArgumentError, ValueError};

#[cfg(feature = "postgres")]
pub use crate::database::Postgres;
#[cfg(feature = "sqlite")]
pub use crate::database::Sqlite;
