//!
//! Typed handles to declared model fields.
//!

use crate::resource::Resource;
use crate::schema::{FieldDescriptor, Model};
use crate::value::FromValue;

/// A declared field of model `M` read as Rust type `T`.
///
/// Generated by `#[arfind::model]` as an associated function per field,
/// e.g. `GreenSmoothie::name()`.
pub struct Field<M, T> {
    descriptor: &'static FieldDescriptor,
    model: std::marker::PhantomData<M>,
    ty: std::marker::PhantomData<T>,
}

impl<M, T> Field<M, T>
where
    M: Model,
    T: FromValue,
{
    pub fn new(descriptor: &'static FieldDescriptor) -> Self {
        Self {
            descriptor,
            model: std::marker::PhantomData,
            ty: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn descriptor(&self) -> &'static FieldDescriptor {
        self.descriptor
    }

    pub fn is_loaded(&self, resource: &Resource<M>) -> bool {
        resource.is_loaded(self.descriptor.name)
    }
}

impl<M, T> Clone for Field<M, T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor,
            model: std::marker::PhantomData,
            ty: std::marker::PhantomData,
        }
    }
}

impl<M, T> Copy for Field<M, T> {}

impl<M, T> std::fmt::Debug for Field<M, T> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "Field({}.{})", self.descriptor.model, self.descriptor.name)
    }
}
