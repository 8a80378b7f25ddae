//!
//! Mapping of an arbitrary tabular result onto a model.
//!
//! Columns are reconciled with declared fields strictly by name:
//!
//! ```text
//!   result:  name | id | first_name | num_people
//!              |     |       |            |
//!   model:   name   id   (attribute)  (attribute)
//! ```
//!
//! Without an explicit field selection, every column matching a declared
//! field loads it and every other column becomes an ad-hoc attribute. An
//! explicit selection suppresses all columns it does not list.
//!

use tracing::{debug, trace};

use crate::collection::Collection;
use crate::context::Context;
use crate::database::{ResultRow, ResultSet};
use crate::identity::IdentityMap;
use crate::query::{FieldSpec, IntoRawQuery, Query, QueryOptions};
use crate::resource::Resource;
use crate::schema::{FieldDescriptor, Model};
use crate::value::Value;
use crate::{ArfindResult, ArgumentError};

/// An entry of an explicit selection, resolved against the target model.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Selected {
    Declared(usize),
    Foreign(&'static str),
}

/// What a single result column is mapped onto.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Slot {
    Field(usize),
    Attribute,
    Skip,
}

pub struct ResultMapper<'a, M: Model> {
    identity_map: Option<&'a IdentityMap>,
    reload: bool,
    selection: Option<Vec<Selected>>,
    model: std::marker::PhantomData<M>,
}

impl<'a, M: Model> ResultMapper<'a, M> {
    pub fn new() -> Self {
        Self {
            identity_map: None,
            reload: false,
            selection: None,
            model: std::marker::PhantomData,
        }
    }

    pub fn reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    pub fn identity_map(mut self, identity_map: &'a IdentityMap) -> Self {
        self.identity_map = Some(identity_map);
        self
    }

    /// Restrict mapping to an explicit selection.
    ///
    /// Names must be declared on `M`. Descriptors declared by other models
    /// are accepted and land as ad-hoc attributes.
    pub fn fields(mut self, specs: &[FieldSpec]) -> Result<Self, ArgumentError> {
        if specs.is_empty() {
            return Err(ArgumentError::EmptySelection);
        }

        let mut selection: Vec<Selected> = Vec::with_capacity(specs.len());
        for spec in specs {
            let selected = match spec {
                FieldSpec::Name(name) => M::field_index(name)
                    .map(Selected::Declared)
                    .ok_or_else(|| ArgumentError::UnknownField {
                        model: M::storage_name(),
                        field: name.clone(),
                    })?,
                FieldSpec::Descriptor(descriptor) => match M::field_index(descriptor.name) {
                    Some(index) if descriptor.belongs_to::<M>() => Selected::Declared(index),
                    _ => Selected::Foreign(descriptor.name),
                },
            };

            if !selection.contains(&selected) {
                selection.push(selected);
            }
        }

        self.selection = Some(selection);
        Ok(self)
    }

    /// The declared fields this mapper populates, for the given columns.
    ///
    /// With an explicit selection this is the selection order, otherwise
    /// the order in which matching columns appear in the result.
    pub fn active_fields(&self, columns: &[String]) -> Vec<FieldDescriptor> {
        let fields = M::fields();
        match &self.selection {
            Some(selection) => selection
                .iter()
                .filter_map(|selected| match selected {
                    Selected::Declared(index) => Some(fields[*index]),
                    Selected::Foreign(_) => None,
                })
                .collect(),
            None => self
                .plan(columns)
                .into_iter()
                .filter_map(|slot| match slot {
                    Slot::Field(index) => Some(fields[index]),
                    _ => None,
                })
                .collect(),
        }
    }

    fn plan(&self, columns: &[String]) -> Vec<Slot> {
        let fields = M::fields();
        let mut slots = Vec::with_capacity(columns.len());

        for (position, column) in columns.iter().enumerate() {
            // the first column of a given name wins
            if columns[..position].contains(column) {
                slots.push(Slot::Skip);
                continue;
            }

            let slot = match &self.selection {
                None => match M::field_index(column) {
                    Some(index) => Slot::Field(index),
                    None => Slot::Attribute,
                },
                Some(selection) => selection
                    .iter()
                    .find_map(|selected| match selected {
                        Selected::Declared(index) if fields[*index].name == column.as_str() => {
                            Some(Slot::Field(*index))
                        }
                        Selected::Foreign(name) if *name == column.as_str() => {
                            Some(Slot::Attribute)
                        }
                        _ => None,
                    })
                    .unwrap_or(Slot::Skip),
            };
            slots.push(slot);
        }

        slots
    }

    /// Column positions of the key fields, if the result carries all of them.
    ///
    /// Looked up by column name, so a key column suppressed by an explicit
    /// selection still identifies the row.
    fn key_columns(columns: &[String]) -> Option<Vec<usize>> {
        let fields = M::fields();
        let key_indices = M::key_indices();
        if key_indices.is_empty() {
            return None;
        }

        key_indices
            .into_iter()
            .map(|key| columns.iter().position(|column| column == fields[key].name))
            .collect()
    }

    /// Materialize one resource per row, in result order.
    pub fn map(&self, result: &ResultSet) -> Vec<Resource<M>> {
        let slots = self.plan(result.columns());
        let key_columns = match self.identity_map {
            Some(_) => Self::key_columns(result.columns()),
            None => None,
        };

        result
            .rows()
            .map(|row| self.materialize(&slots, key_columns.as_deref(), row))
            .collect()
    }

    fn materialize(
        &self,
        slots: &[Slot],
        key_columns: Option<&[usize]>,
        row: ResultRow,
    ) -> Resource<M> {
        let key: Option<Vec<Value>> = key_columns.and_then(|columns| {
            columns
                .iter()
                .map(|column| {
                    row.value_at(*column)
                        .filter(|value| !value.is_null())
                        .cloned()
                })
                .collect()
        });

        let (resource, existing) = match (self.identity_map, key) {
            (Some(identity_map), Some(key)) => identity_map.lookup_or_create::<M>(&key),
            _ => (Resource::new(), false),
        };

        let overwrite = !existing || self.reload;
        if existing {
            debug!(
                model = M::storage_name(),
                reload = self.reload,
                "identity already materialized"
            );
        }

        {
            let mut record = resource.record().lock();
            for ((column, value), slot) in row.iter().zip(slots) {
                match slot {
                    Slot::Field(index) if overwrite => record.load(*index, value.clone()),
                    Slot::Field(index) => record.load_if_unloaded(*index, value.clone()),
                    Slot::Attribute => record.set_attribute(column, value.clone(), overwrite),
                    Slot::Skip => {}
                }
            }
        }

        trace!(model = M::storage_name(), resource = ?resource, "materialized");
        resource
    }
}

impl<'a, M: Model> Default for ResultMapper<'a, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a raw query and map its rows onto `M`.
///
/// Argument errors are raised before the connection is touched. Driver
/// errors are returned as they are, and no partial result is produced.
pub async fn find_by_sql<M, Q>(
    ctx: &Context,
    query: Q,
    options: QueryOptions,
) -> ArfindResult<Collection<M>>
where
    M: Model,
    Q: IntoRawQuery,
{
    let query = Query::resolve(query.into_raw_query()?, options)?;

    let mut mapper = ResultMapper::<M>::new().reload(query.reload());
    if let Some(specs) = query.fields() {
        mapper = mapper.fields(specs)?;
    }
    if let Some(identity_map) = ctx.identity_map() {
        mapper = mapper.identity_map(identity_map);
    }

    let (repository, connection) = ctx.repository(query.repository())?;
    let query = query.with_repository(repository);

    debug!(model = M::storage_name(), repository, "find_by_sql");

    let result = connection.execute(query.sql(), query.binds()).await?;
    let fields = mapper.active_fields(result.columns());
    let resources = mapper.map(&result);

    Ok(Collection::new(resources, query, fields))
}
