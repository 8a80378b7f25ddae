//!
//! Repository configuration.
//!

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
    pub max_connections: u32,
}

impl RepositoryConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Reads the URL from `<NAME>_DATABASE_URL`, falling back to `default_url`.
    pub fn from_env(name: impl Into<String>, default_url: &str) -> Self {
        let name = name.into();
        let url = std::env::var(Self::env_var(&name)).unwrap_or_else(|_| default_url.to_owned());
        Self::new(name, url)
    }

    pub fn env_var(name: &str) -> String {
        format!("{}_DATABASE_URL", name.to_uppercase())
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Every connection to an in-memory database sees its own database,
    /// so such repositories are restricted to a single connection.
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    pub(crate) fn effective_max_connections(&self) -> u32 {
        if self.is_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_names() {
        assert_eq!(RepositoryConfig::env_var("sqlite3"), "SQLITE3_DATABASE_URL");
    }

    #[test]
    fn from_env_falls_back_to_default() {
        let config = RepositoryConfig::from_env("arfind_unset_repo", "sqlite::memory:");
        assert_eq!(config.url, "sqlite::memory:");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn memory_databases_use_one_connection() {
        let memory = RepositoryConfig::new("default", "sqlite::memory:").max_connections(8);
        assert_eq!(memory.effective_max_connections(), 1);

        let file = RepositoryConfig::new("default", "sqlite://db.sqlite").max_connections(0);
        assert_eq!(file.effective_max_connections(), 1);
        assert_eq!(file.max_connections(3).effective_max_connections(), 3);
    }
}
