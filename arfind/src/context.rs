//!
//! Explicitly passed repository context.
//!

use std::collections::HashMap;
use std::sync::Arc;

use crate::database::Connection;
use crate::identity::IdentityMap;
use crate::ArgumentError;

pub const DEFAULT_REPOSITORY: &str = "default";

/// Named connections plus an optional identity map, handed to every
/// finder call. There is no global repository state.
#[derive(Clone)]
pub struct Context {
    repositories: HashMap<String, Arc<dyn Connection>>,
    identity_map: Option<IdentityMap>,
}

impl Context {
    /// A context whose default repository is `connection`. The connection
    /// is also reachable under its own name.
    pub fn new<C: Connection + 'static>(connection: C) -> Self {
        let connection: Arc<dyn Connection> = Arc::new(connection);
        let mut repositories = HashMap::new();
        repositories.insert(connection.name().to_owned(), connection.clone());
        repositories.insert(DEFAULT_REPOSITORY.to_owned(), connection);

        Self {
            repositories,
            identity_map: None,
        }
    }

    /// Register another repository under its own name.
    pub fn with_repository<C: Connection + 'static>(mut self, connection: C) -> Self {
        self.repositories
            .insert(connection.name().to_owned(), Arc::new(connection));
        self
    }

    pub fn with_identity_map(mut self, identity_map: IdentityMap) -> Self {
        self.identity_map = Some(identity_map);
        self
    }

    pub fn identity_map(&self) -> Option<&IdentityMap> {
        self.identity_map.as_ref()
    }

    /// Resolve a repository by name, `None` meaning the default one.
    pub fn repository(&self, name: Option<&str>) -> Result<(&str, &Arc<dyn Connection>), ArgumentError> {
        let name = name.unwrap_or(DEFAULT_REPOSITORY);
        self.repositories
            .get_key_value(name)
            .map(|(name, connection)| (name.as_str(), connection))
            .ok_or_else(|| ArgumentError::UnknownRepository(name.to_owned()))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut names: Vec<_> = self.repositories.keys().collect();
        names.sort();
        fmt.debug_struct("Context")
            .field("repositories", &names)
            .field("identity_map", &self.identity_map)
            .finish()
    }
}
