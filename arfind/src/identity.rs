//!
//! Identity map: one canonical in-memory record per (model type, key).
//!
//! Models sharing a table still get separate records, since each record
//! is laid out after its own model's fields.
//!
//! The map lock is only held for lookup/insertion. Writes into a record
//! happen under that record's own lock, so two rows for the same identity
//! never interleave partial field writes.
//!

use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::resource::{Record, Resource};
use crate::schema::Model;
use crate::value::Value;

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
enum KeyPart {
    Null,
    Bool(bool),
    Integer(i64),
    Real(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Integer(int) => KeyPart::Integer(*int),
            Value::Real(real) => KeyPart::Real(real.to_bits()),
            Value::Text(text) => KeyPart::Text(text.clone()),
            Value::Blob(blob) => KeyPart::Blob(blob.clone()),
        }
    }
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
struct Identity {
    model: TypeId,
    key: Vec<KeyPart>,
}

impl Identity {
    fn new<M: Model>(key: &[Value]) -> Self {
        Self {
            model: TypeId::of::<M>(),
            key: key.iter().map(KeyPart::from).collect(),
        }
    }
}

/// Cheaply cloneable; clones share the same entries.
#[derive(Clone, Default)]
pub struct IdentityMap {
    entries: Arc<Mutex<HashMap<Identity, Arc<Mutex<Record>>>>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical resource for `key`, and whether it already existed.
    pub fn lookup_or_create<M: Model>(&self, key: &[Value]) -> (Resource<M>, bool) {
        let mut entries = self.entries.lock();
        match entries.get(&Identity::new::<M>(key)) {
            Some(record) => (Resource::from_record(record.clone()), true),
            None => {
                let record = Arc::new(Mutex::new(Record::new(M::fields().len())));
                entries.insert(Identity::new::<M>(key), record.clone());
                (Resource::from_record(record), false)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl std::fmt::Debug for IdentityMap {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "IdentityMap({} entries)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub struct Smoothie;

    #[crate::model("smoothies")]
    impl Smoothie {
        fn id() -> i64;
        fn name() -> String;
    }

    pub struct SmoothieName;

    #[crate::model("smoothies")]
    impl SmoothieName {
        fn id() -> i64;
    }

    pub struct Customer;

    #[crate::model("customers")]
    impl Customer {
        fn id() -> i64;
    }

    #[test]
    fn same_key_same_record() {
        let map = IdentityMap::new();
        let (first, existed) = map.lookup_or_create::<Smoothie>(&[Value::Integer(1)]);
        assert!(!existed);

        let (second, existed) = map.lookup_or_create::<Smoothie>(&[Value::Integer(1)]);
        assert!(existed);
        assert!(first.same_record(&second));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn identities_are_per_model() {
        let map = IdentityMap::new();
        map.lookup_or_create::<Smoothie>(&[Value::Integer(1)]);
        let (_, existed) = map.lookup_or_create::<Customer>(&[Value::Integer(1)]);
        assert!(!existed);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn models_sharing_a_table_get_their_own_records() {
        let map = IdentityMap::new();
        let (narrow, _) = map.lookup_or_create::<SmoothieName>(&[Value::Integer(1)]);
        let (wide, existed) = map.lookup_or_create::<Smoothie>(&[Value::Integer(1)]);
        assert!(!existed);
        assert_eq!(narrow.record().lock().fields.len(), 1);
        assert_eq!(wide.record().lock().fields.len(), 2);
    }

    #[test]
    fn clear_forgets_everything() {
        let map = IdentityMap::new();
        map.lookup_or_create::<Smoothie>(&[Value::Integer(1)]);
        map.lookup_or_create::<Smoothie>(&[Value::Integer(2)]);
        assert_eq!(map.len(), 2);

        map.clear();
        assert!(map.is_empty());
        let (_, existed) = map.lookup_or_create::<Smoothie>(&[Value::Integer(1)]);
        assert!(!existed);
    }

    #[test]
    fn concurrent_lookups_share_one_record() {
        let map = IdentityMap::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let map = map.clone();
                std::thread::spawn(move || {
                    let (resource, _) = map.lookup_or_create::<Smoothie>(&[Value::Integer(7)]);
                    resource.record().lock().load(1, Value::from("Banana"));
                    resource
                })
            })
            .collect();

        let resources: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(map.len(), 1);
        assert!(resources.iter().all(|r| r.same_record(&resources[0])));
    }
}
