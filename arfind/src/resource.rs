//!
//! Materialized objects.
//!
//! A `Resource<M>` is a handle to a shared record. Declared fields carry
//! an explicit load state, so "never fetched" and "fetched as NULL" stay
//! distinguishable. Columns that matched no declared field live in a
//! separate, dynamically typed attribute list.
//!

use parking_lot::Mutex;
use std::sync::Arc;

use crate::field::Field;
use crate::schema::Model;
use crate::value::{FromValue, Value};
use crate::{ArfindResult, ValueError};

#[derive(Clone, Debug, PartialEq)]
pub enum FieldState {
    Unloaded,
    Loaded(Value),
}

impl FieldState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, FieldState::Loaded(_))
    }
}

#[derive(Debug)]
pub(crate) struct Record {
    pub(crate) fields: Vec<FieldState>,
    attributes: Vec<(String, Value)>,
}

impl Record {
    pub(crate) fn new(field_count: usize) -> Self {
        Self {
            fields: vec![FieldState::Unloaded; field_count],
            attributes: Vec::new(),
        }
    }

    pub(crate) fn load(&mut self, index: usize, value: Value) {
        self.fields[index] = FieldState::Loaded(value);
    }

    pub(crate) fn load_if_unloaded(&mut self, index: usize, value: Value) {
        if !self.fields[index].is_loaded() {
            self.fields[index] = FieldState::Loaded(value);
        }
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value, overwrite: bool) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) if overwrite => slot.1 = value,
            Some(_) => {}
            None => self.attributes.push((name.to_owned(), value)),
        }
    }
}

pub struct Resource<M: Model> {
    record: Arc<Mutex<Record>>,
    model: std::marker::PhantomData<M>,
}

impl<M: Model> Resource<M> {
    /// A resource with every declared field unloaded.
    pub fn new() -> Self {
        Self::from_record(Arc::new(Mutex::new(Record::new(M::fields().len()))))
    }

    pub(crate) fn from_record(record: Arc<Mutex<Record>>) -> Self {
        Self {
            record,
            model: std::marker::PhantomData,
        }
    }

    pub(crate) fn record(&self) -> &Arc<Mutex<Record>> {
        &self.record
    }

    /// Typed read of a declared field.
    pub fn get<T: FromValue>(&self, field: Field<M, T>) -> ArfindResult<T> {
        let name = field.name();
        let value = self
            .value(name)
            .ok_or_else(|| ValueError::Unloaded(name.to_owned()))?;

        T::from_value(&value).ok_or_else(|| {
            ValueError::TypeMismatch {
                field: name.to_owned(),
                expected: field.descriptor().kind,
                found: value.kind(),
            }
            .into()
        })
    }

    /// Load state of a declared field, `None` if `M` declares no such field.
    pub fn state(&self, name: &str) -> Option<FieldState> {
        let index = M::field_index(name)?;
        Some(self.record.lock().fields[index].clone())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state(name)
            .map(|state| state.is_loaded())
            .unwrap_or(false)
    }

    /// Loaded value of a declared field.
    pub fn value(&self, name: &str) -> Option<Value> {
        match self.state(name)? {
            FieldState::Loaded(value) => Some(value),
            FieldState::Unloaded => None,
        }
    }

    /// Dynamic lookup of a column that matched no declared field.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.record
            .lock()
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    pub fn attribute_as<T: FromValue>(&self, name: &str) -> ArfindResult<T> {
        let value = self
            .attribute(name)
            .ok_or_else(|| ValueError::UnknownAttribute(name.to_owned()))?;

        T::from_value(&value).ok_or_else(|| {
            ValueError::TypeMismatch {
                field: name.to_owned(),
                expected: T::KIND,
                found: value.kind(),
            }
            .into()
        })
    }

    /// Names and values of the ad-hoc attributes, in result column order.
    pub fn attributes(&self) -> Vec<(String, Value)> {
        self.record.lock().attributes.clone()
    }

    /// Values of the key fields, if all of them are loaded.
    pub fn key(&self) -> Option<Vec<Value>> {
        let key_indices = M::key_indices();
        if key_indices.is_empty() {
            return None;
        }

        let record = self.record.lock();
        key_indices
            .into_iter()
            .map(|index| match &record.fields[index] {
                FieldState::Loaded(value) if !value.is_null() => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether both handles point at the same in-memory record.
    pub fn same_record(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

impl<M: Model> Default for Resource<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Resource<M> {
    fn clone(&self) -> Self {
        Self::from_record(self.record.clone())
    }
}

/// Resources are equal when they share a record or carry the same key.
/// Keyless resources fall back to comparing every field state.
impl<M: Model> PartialEq for Resource<M> {
    fn eq(&self, other: &Self) -> bool {
        if self.same_record(other) {
            return true;
        }

        match (self.key(), other.key()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            (None, None) => {
                let lhs = self.record.lock().fields.clone();
                let rhs = other.record.lock().fields.clone();
                lhs == rhs
            }
            _ => false,
        }
    }
}

impl<M: Model> std::fmt::Debug for Resource<M> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let record = self.record.lock();
        let mut map = fmt.debug_map();
        for (descriptor, state) in M::fields().iter().zip(record.fields.iter()) {
            if let FieldState::Loaded(value) = state {
                map.entry(&descriptor.name, value);
            }
        }
        for (name, value) in &record.attributes {
            map.entry(name, value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub struct Smoothie;

    #[crate::model("smoothies")]
    impl Smoothie {
        fn id() -> i64;
        fn name() -> Option<String>;
    }

    fn loaded(id: i64, name: Value) -> Resource<Smoothie> {
        let resource = Resource::<Smoothie>::new();
        {
            let mut record = resource.record().lock();
            record.load(0, Value::Integer(id));
            record.load(1, name);
        }
        resource
    }

    #[test]
    fn unloaded_is_not_loaded_null() {
        let resource = Resource::<Smoothie>::new();
        resource.record().lock().load(1, Value::Null);

        assert_eq!(resource.state("id"), Some(FieldState::Unloaded));
        assert_eq!(resource.state("name"), Some(FieldState::Loaded(Value::Null)));
        assert!(matches!(
            resource.get(Smoothie::id()),
            Err(crate::ArfindError::Value(ValueError::Unloaded(_)))
        ));
        assert_eq!(resource.get(Smoothie::name()).unwrap(), None);
    }

    #[test]
    fn type_mismatch_names_the_field() {
        let resource = loaded(1, Value::Integer(3));
        match resource.get(Smoothie::name()) {
            Err(crate::ArfindError::Value(ValueError::TypeMismatch { field, .. })) => {
                assert_eq!(field, "name")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn attributes_are_separate_from_fields() {
        let resource = loaded(1, Value::from("Banana"));
        resource
            .record()
            .lock()
            .set_attribute("num_people", Value::Integer(2), true);

        assert_eq!(resource.attribute_as::<i64>("num_people").unwrap(), 2);
        assert!(resource.attribute("name").is_none());
        assert!(resource.state("num_people").is_none());
    }

    #[test]
    fn attribute_overwrite_policy() {
        let resource = Resource::<Smoothie>::new();
        let mut record = resource.record().lock();
        record.set_attribute("a", Value::Integer(1), false);
        record.set_attribute("a", Value::Integer(2), false);
        assert_eq!(record.attributes, vec![("a".to_owned(), Value::Integer(1))]);
        record.set_attribute("a", Value::Integer(3), true);
        assert_eq!(record.attributes, vec![("a".to_owned(), Value::Integer(3))]);
    }

    #[test]
    fn equality_by_key() {
        assert_eq!(loaded(1, Value::from("Banana")), loaded(1, Value::Null));
        assert_ne!(loaded(1, Value::Null), loaded(2, Value::Null));
        assert_eq!(Resource::<Smoothie>::new(), Resource::<Smoothie>::new());
    }
}
