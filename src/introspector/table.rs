use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    overload::{CallableMemberDescriptor, OverloadedMethods},
    runtime::{Class, FieldInfo, MethodInfo},
};

/// A read-only JavaBeans property.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: Arc<str>,
    pub read_method: Arc<MethodInfo>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<Arc<str>>, read_method: Arc<MethodInfo>) -> Self {
        PropertyDescriptor {
            name: name.into(),
            read_method,
        }
    }
}

/// What a key of the exposed surface of a class stands for.
#[derive(Clone)]
pub enum ExposedMember {
    Property(PropertyDescriptor),
    Method(Arc<MethodInfo>),
    Overloaded(Arc<OverloadedMethods>),
    Field(Arc<FieldInfo>),
}

impl ExposedMember {
    /// Identity of the underlying member, for per-instance caches.
    pub(crate) fn identity(&self) -> usize {
        match self {
            ExposedMember::Property(property) => Arc::as_ptr(&property.read_method) as usize,
            ExposedMember::Method(method) => Arc::as_ptr(method) as usize,
            ExposedMember::Overloaded(methods) => Arc::as_ptr(methods) as usize,
            ExposedMember::Field(field) => Arc::as_ptr(field) as usize,
        }
    }
}

impl std::fmt::Debug for ExposedMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExposedMember::Property(property) => f
                .debug_tuple("Property")
                .field(&property.read_method)
                .finish(),
            ExposedMember::Method(method) => f.debug_tuple("Method").field(method).finish(),
            ExposedMember::Overloaded(methods) => f
                .debug_tuple("Overloaded")
                .field(&methods.members())
                .finish(),
            ExposedMember::Field(field) => f.debug_tuple("Field").field(field).finish(),
        }
    }
}

#[derive(Clone)]
pub enum ExposedConstructors {
    Single(CallableMemberDescriptor),
    Overloaded(Arc<OverloadedMethods>),
}

/// The exposed surface of one class. Immutable once published by the introspector.
pub struct ClassIntrospectionTable {
    pub(crate) class: Arc<Class>,
    pub(crate) members: IndexMap<Arc<str>, ExposedMember>,
    pub(crate) constructors: Option<ExposedConstructors>,
    pub(crate) generic_get: Option<Arc<MethodInfo>>,
    pub(crate) to_string: Option<Arc<MethodInfo>>,
    pub(crate) to_string_hidden: bool,
}

impl ClassIntrospectionTable {
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn get(&self, key: &str) -> Option<&ExposedMember> {
        self.members.get(key)
    }

    /// Exposed keys; constructors and the generic getter aren't keys.
    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.members.keys()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn constructors(&self) -> Option<&ExposedConstructors> {
        self.constructors.as_ref()
    }

    /// The `get(String)` or `get(Object)` method consulted for keys that aren't members.
    pub fn generic_get(&self) -> Option<&Arc<MethodInfo>> {
        self.generic_get.as_ref()
    }

    /// The public parameterless `toString` of the class, if it has one.
    pub fn to_string_method(&self) -> Option<&Arc<MethodInfo>> {
        self.to_string.as_ref()
    }

    pub fn is_to_string_hidden(&self) -> bool {
        self.to_string_hidden
    }
}

impl std::fmt::Debug for ClassIntrospectionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassIntrospectionTable")
            .field("class", &self.class.name())
            .field("members", &self.members)
            .field("generic_get", &self.generic_get)
            .field("to_string_hidden", &self.to_string_hidden)
            .finish_non_exhaustive()
    }
}
