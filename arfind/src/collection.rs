use crate::context::DEFAULT_REPOSITORY;
use crate::query::Query;
use crate::resource::Resource;
use crate::schema::{FieldDescriptor, Model};

/// The ordered, possibly empty outcome of a finder call.
///
/// Besides the resources it exposes the effective query that produced
/// them, so a caller can inspect or re-run exactly what was executed.
pub struct Collection<M: Model> {
    resources: Vec<Resource<M>>,
    query: Query,
    fields: Vec<FieldDescriptor>,
}

impl<M: Model> Collection<M> {
    pub(crate) fn new(resources: Vec<Resource<M>>, query: Query, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            resources,
            query,
            fields,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn reload(&self) -> bool {
        self.query.reload()
    }

    /// Name of the repository the query ran against.
    pub fn repository(&self) -> &str {
        self.query.repository().unwrap_or(DEFAULT_REPOSITORY)
    }

    /// Declared fields that were populated.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn first(&self) -> Option<&Resource<M>> {
        self.resources.first()
    }

    pub fn last(&self) -> Option<&Resource<M>> {
        self.resources.last()
    }

    pub fn get(&self, index: usize) -> Option<&Resource<M>> {
        self.resources.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource<M>> {
        self.resources.iter()
    }

    pub fn into_vec(self) -> Vec<Resource<M>> {
        self.resources
    }
}

impl<M: Model> IntoIterator for Collection<M> {
    type Item = Resource<M>;
    type IntoIter = std::vec::IntoIter<Resource<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

impl<'c, M: Model> IntoIterator for &'c Collection<M> {
    type Item = &'c Resource<M>;
    type IntoIter = std::slice::Iter<'c, Resource<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

impl<M: Model> std::fmt::Debug for Collection<M> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Collection")
            .field("query", &self.query)
            .field("resources", &self.resources)
            .finish()
    }
}
