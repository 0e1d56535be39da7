use std::sync::{Arc, Weak};

use dashmap::DashMap;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    consts::FieldAccessFlag,
    error::{Error, Result},
    introspector::{DependentCache, ExposureLevel},
    model::{
        ModelRef, OverloadedMethodsModel, SimpleMethodModel, TemplateHashModel,
        TemplateHashModelEx, TemplateModel,
    },
    overload::{CallableMemberDescriptor, OverloadedMethods},
    runtime::{Class, FieldInfo, HostValue, MethodInfo},
    wrapper::ObjectWrapper,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelKind {
    Statics,
    Enums,
}

/// Caches one [`StaticModel`] per class. Registered with the class introspector of its object
/// wrapper, so it forgets classes the introspector forgets.
pub struct ClassBasedModelFactory {
    kind: ModelKind,
    wrapper: Weak<ObjectWrapper>,
    cache: DashMap<Arc<str>, Arc<OnceCell<Arc<StaticModel>>>>,
}

impl ClassBasedModelFactory {
    fn new(kind: ModelKind, wrapper: Weak<ObjectWrapper>) -> Self {
        ClassBasedModelFactory {
            kind,
            wrapper,
            cache: DashMap::new(),
        }
    }

    pub fn get(&self, class: &Arc<Class>) -> Result<Arc<StaticModel>> {
        let cell = {
            let mut entry = self.cache.entry(class.name().into()).or_default();
            // a reloaded class with the same name
            if entry
                .value()
                .get()
                .is_some_and(|model| !Arc::ptr_eq(model.class(), class))
            {
                *entry.value_mut() = Arc::default();
            }
            Arc::clone(entry.value())
        };
        cell.get_or_try_init(|| self.create(class)).cloned()
    }

    pub fn get_by_name(&self, class_name: &str) -> Result<Arc<StaticModel>> {
        let wrapper = upgrade(&self.wrapper)?;
        let class = wrapper.resolve_class(class_name)?;
        self.get(&class)
    }

    /// Number of cached models.
    pub fn len(&self) -> usize {
        self.cache.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn create(&self, class: &Arc<Class>) -> Result<Arc<StaticModel>> {
        let wrapper = upgrade(&self.wrapper)?;
        let model = match self.kind {
            ModelKind::Statics => StaticModel::statics(class, &wrapper, Weak::clone(&self.wrapper))?,
            ModelKind::Enums => StaticModel::enum_constants(class, Weak::clone(&self.wrapper))?,
        };
        debug!(class = class.name(), kind = ?self.kind, keys = model.members.len(), "created class based model");
        Ok(Arc::new(model))
    }
}

impl DependentCache for ClassBasedModelFactory {
    fn clear(&self) {
        self.cache.clear();
    }

    fn remove(&self, class: &Arc<Class>) {
        self.cache.remove(class.name());
    }
}

fn upgrade(wrapper: &Weak<ObjectWrapper>) -> Result<Arc<ObjectWrapper>> {
    wrapper
        .upgrade()
        .ok_or_else(|| Error::Model("the object wrapper was already dropped".to_string()))
}

enum StaticMember {
    // final fields are read once
    Constant(HostValue),
    Field(Arc<FieldInfo>),
    Method(Arc<MethodInfo>),
    Overloaded(Arc<OverloadedMethods>),
}

enum PendingMember {
    Ready(StaticMember),
    Overloaded(OverloadedMethods),
}

/// The static fields and methods of one class as a hash; or, for [`EnumModels`], the constants
/// of an enum class.
pub struct StaticModel {
    class: Arc<Class>,
    wrapper: Weak<ObjectWrapper>,
    members: IndexMap<Arc<str>, StaticMember>,
}

impl StaticModel {
    fn statics(class: &Arc<Class>, wrapper: &ObjectWrapper, weak: Weak<ObjectWrapper>) -> Result<Self> {
        if !class.is_public() {
            return Err(Error::Model(format!(
                "can't wrap the non-public class {}",
                class.name()
            )));
        }
        let mut model = StaticModel {
            class: Arc::clone(class),
            wrapper: weak,
            members: IndexMap::new(),
        };
        let settings = wrapper.introspector().settings();
        let level = settings.get_exposure_level();
        if level == ExposureLevel::Nothing {
            return Ok(model);
        }
        let policy = settings.get_member_access_policy().for_class(class);
        let expose_all = level == ExposureLevel::All;

        let mut pending: IndexMap<Arc<str>, PendingMember> = IndexMap::new();
        for field in class.public_fields() {
            if !field.is_static() || !(expose_all || policy.is_field_exposed(&field)) {
                continue;
            }
            let name = Arc::clone(&field.name);
            if !field.access_flags().contains(FieldAccessFlag::FINAL) {
                pending.insert(name, PendingMember::Ready(StaticMember::Field(field)));
                continue;
            }
            match field.read(&HostValue::Null) {
                Ok(value) => {
                    pending.insert(name, PendingMember::Ready(StaticMember::Constant(value)));
                }
                Err(error) => warn!(class = class.name(), field = &*name, %error, "static field couldn't be read"),
            }
        }

        if level < ExposureLevel::PropertiesOnly {
            for method in class.public_methods() {
                if !method.is_static() || !(expose_all || policy.is_method_exposed(&method)) {
                    continue;
                }
                let name = Arc::clone(&method.name);
                let Some(entry) = pending.get_mut(&name) else {
                    pending.insert(name, PendingMember::Ready(StaticMember::Method(method)));
                    continue;
                };
                match entry {
                    PendingMember::Ready(StaticMember::Method(previous)) => {
                        let mut overloaded = OverloadedMethods::new();
                        overloaded.add_member(CallableMemberDescriptor::Method(Arc::clone(previous)));
                        overloaded.add_member(CallableMemberDescriptor::Method(method));
                        *entry = PendingMember::Overloaded(overloaded);
                    }
                    PendingMember::Overloaded(overloaded) => {
                        overloaded.add_member(CallableMemberDescriptor::Method(method));
                    }
                    PendingMember::Ready(_) => {
                        info!(
                            class = class.name(),
                            key = &*name,
                            method = %method.declaration(),
                            "static method replaces a field of the same name in the static model"
                        );
                        *entry = PendingMember::Ready(StaticMember::Method(method));
                    }
                }
            }
        }

        model.members = pending
            .into_iter()
            .map(|(name, member)| {
                let member = match member {
                    PendingMember::Ready(member) => member,
                    PendingMember::Overloaded(methods) => StaticMember::Overloaded(Arc::new(methods)),
                };
                (name, member)
            })
            .collect();
        Ok(model)
    }

    fn enum_constants(class: &Arc<Class>, wrapper: Weak<ObjectWrapper>) -> Result<Self> {
        if !class.is_enum() {
            return Err(Error::Model(format!("{} is not an enum class", class.name())));
        }
        let mut members = IndexMap::new();
        for field in class.public_fields() {
            if !field.is_static() || !field.access_flags().contains(FieldAccessFlag::ENUM) {
                continue;
            }
            let constant = field.read(&HostValue::Null).map_err(|source| Error::FieldRead {
                receiver: format!("class {}", class.name()),
                member: format!("{}.{}", class.name(), field.name()),
                source,
            })?;
            members.insert(Arc::clone(&field.name), StaticMember::Constant(constant));
        }
        Ok(StaticModel {
            class: Arc::clone(class),
            wrapper,
            members,
        })
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }
}

impl TemplateModel for StaticModel {
    fn as_hash(&self) -> Option<&dyn TemplateHashModel> {
        Some(self)
    }

    fn as_hash_ex(&self) -> Option<&dyn TemplateHashModelEx> {
        Some(self)
    }
}

impl TemplateHashModel for StaticModel {
    fn get(&self, key: &str) -> Result<Option<ModelRef>> {
        let Some(member) = self.members.get(key) else {
            return Err(Error::InvalidProperty {
                key: key.to_string(),
                class: self.class.name().to_string(),
            });
        };
        let wrapper = upgrade(&self.wrapper)?;
        Ok(match member {
            StaticMember::Constant(value) => wrapper.wrap(value.clone()),
            StaticMember::Field(field) => {
                let value = field.read(&HostValue::Null).map_err(|source| Error::FieldRead {
                    receiver: format!("class {}", self.class.name()),
                    member: format!("{}.{}", self.class.name(), field.name()),
                    source,
                })?;
                wrapper.wrap(value)
            }
            StaticMember::Method(method) => Some(Arc::new(SimpleMethodModel::new(
                HostValue::Null,
                Arc::clone(method),
                wrapper,
            ))),
            StaticMember::Overloaded(methods) => Some(Arc::new(OverloadedMethodsModel::new(
                HostValue::Null,
                Arc::clone(methods),
                wrapper,
            ))),
        })
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.members.is_empty())
    }
}

impl TemplateHashModelEx for StaticModel {
    fn size(&self) -> Result<usize> {
        Ok(self.members.len())
    }

    fn keys(&self) -> Result<Vec<Arc<str>>> {
        Ok(self.members.keys().cloned().collect())
    }

    fn values(&self) -> Result<Vec<Option<ModelRef>>> {
        self.members
            .keys()
            .map(|key| TemplateHashModel::get(self, key))
            .collect()
    }
}

macro_rules! class_based_models {
    ($($(#[$doc:meta])* $name:ident => $kind:expr;)*) => {
        $(
            $(#[$doc])*
            pub struct $name {
                factory: Arc<ClassBasedModelFactory>,
            }

            impl $name {
                pub(crate) fn new(wrapper: Weak<ObjectWrapper>) -> Self {
                    $name {
                        factory: Arc::new(ClassBasedModelFactory::new($kind, wrapper)),
                    }
                }

                pub fn factory(&self) -> &Arc<ClassBasedModelFactory> {
                    &self.factory
                }

                pub fn get_class(&self, class: &Arc<Class>) -> Result<Arc<StaticModel>> {
                    self.factory.get(class)
                }
            }

            impl TemplateModel for $name {
                fn as_hash(&self) -> Option<&dyn TemplateHashModel> {
                    Some(self)
                }
            }

            /// Keys are fully qualified class names.
            impl TemplateHashModel for $name {
                fn get(&self, key: &str) -> Result<Option<ModelRef>> {
                    let model: ModelRef = self.factory.get_by_name(key)?;
                    Ok(Some(model))
                }

                fn is_empty(&self) -> Result<bool> {
                    Ok(false)
                }
            }
        )*
    };
}

class_based_models! {
    /// Static members of classes, by class name.
    StaticModels => ModelKind::Statics;
    /// Enum constants of enum classes, by class name.
    EnumModels => ModelKind::Enums;
}
