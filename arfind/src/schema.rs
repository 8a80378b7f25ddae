//!
//! Schema description of model types.
//!

use crate::value::ValueKind;

/// Name and type metadata for one attribute of a model.
///
/// `model` is the storage name of the declaring model, which lets a
/// descriptor borrowed from another model (e.g. a joined table) be told
/// apart from the target's own fields.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FieldDescriptor {
    pub model: &'static str,
    pub name: &'static str,
    pub kind: ValueKind,
    pub nullable: bool,
    pub key: bool,
}

impl FieldDescriptor {
    pub const fn new(
        model: &'static str,
        name: &'static str,
        kind: ValueKind,
        nullable: bool,
        key: bool,
    ) -> Self {
        Self {
            model,
            name,
            kind,
            nullable,
            key,
        }
    }

    pub fn belongs_to<M: Model>(&self) -> bool {
        self.model == M::storage_name() && M::field(self.name).is_some()
    }
}

/// A type rows can be mapped onto.
///
/// Normally implemented through `#[arfind::model("table")]`.
pub trait Model: Sized + Send + Sync + 'static {
    /// Table (or view) name the model is stored in.
    fn storage_name() -> &'static str;

    /// Declared fields, in declaration order, unique by name.
    fn fields() -> &'static [FieldDescriptor];

    fn field(name: &str) -> Option<&'static FieldDescriptor> {
        Self::fields().iter().find(|field| field.name == name)
    }

    fn field_index(name: &str) -> Option<usize> {
        Self::fields().iter().position(|field| field.name == name)
    }

    /// Indices of the fields making up the identity of a row.
    fn key_indices() -> Vec<usize> {
        Self::fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| field.key)
            .map(|(index, _)| index)
            .collect()
    }
}
