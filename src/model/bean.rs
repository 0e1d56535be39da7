use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    error::{Error, Result},
    introspector::{ClassIntrospectionTable, ExposedMember},
    model::{
        ModelRef, OverloadedMethodsModel, SimpleMethodModel, TemplateHashModel,
        TemplateHashModelEx, TemplateModel, TemplateScalarModel, WrapperTemplateModel,
    },
    overload::CallableMemberDescriptor,
    runtime::{CollectionAccess, HostValue, ListAccess, MapAccess, famous_classes},
    wrapper::ObjectWrapper,
};

/// The result of looking a key up; `None` if the key isn't known at all.
type Lookup = Option<Option<ModelRef>>;

/// Exposes the properties, methods and (optionally) fields of an arbitrary host object as a
/// hash, following the introspection table of its class.
pub struct BeanModel {
    object: HostValue,
    wrapper: Arc<ObjectWrapper>,
    table: Arc<ClassIntrospectionTable>,
    // method models bound to this object, by member identity
    members: Mutex<HashMap<usize, ModelRef>>,
}

impl BeanModel {
    pub fn new(object: HostValue, wrapper: Arc<ObjectWrapper>) -> Self {
        let class = object
            .runtime_class()
            .unwrap_or_else(|| Arc::clone(famous_classes::object_class()));
        let table = wrapper.introspector().get(&class);
        BeanModel {
            object,
            wrapper,
            table,
            members: Mutex::new(HashMap::new()),
        }
    }

    pub fn object(&self) -> &HostValue {
        &self.object
    }

    pub fn table(&self) -> &Arc<ClassIntrospectionTable> {
        &self.table
    }

    fn member(&self, key: &str) -> Result<Lookup> {
        let Some(member) = self.table.get(key) else {
            return Ok(None);
        };
        let identity = member.identity();
        if let Some(cached) = self.members.lock().get(&identity) {
            return Ok(Some(Some(Arc::clone(cached))));
        }

        let model: ModelRef = match member {
            // property values and fields can change, so they are read on every access
            ExposedMember::Property(property) => {
                let getter = CallableMemberDescriptor::Method(Arc::clone(&property.read_method));
                let value = getter.invoke(&self.object, &[])?;
                return Ok(Some(self.wrapper.wrap(value)));
            }
            ExposedMember::Field(field) => {
                let value = field.read(&self.object).map_err(|source| Error::FieldRead {
                    receiver: format!("{} object", self.object.type_name()),
                    member: format!("{}.{}", field.declaring_class_name, field.name()),
                    source,
                })?;
                return Ok(Some(self.wrapper.wrap(value)));
            }
            ExposedMember::Method(method) => self.wrapper.bound_method(&self.object, identity, || {
                Arc::new(SimpleMethodModel::new(
                    self.object.clone(),
                    Arc::clone(method),
                    Arc::clone(&self.wrapper),
                )) as ModelRef
            }),
            ExposedMember::Overloaded(methods) => {
                self.wrapper.bound_method(&self.object, identity, || {
                    Arc::new(OverloadedMethodsModel::new(
                        self.object.clone(),
                        Arc::clone(methods),
                        Arc::clone(&self.wrapper),
                    )) as ModelRef
                })
            }
        };
        // a concurrent lookup may have cached its own model meanwhile; the first one stays
        let model = Arc::clone(self.members.lock().entry(identity).or_insert(model));
        Ok(Some(Some(model)))
    }

    fn generic_get(&self, key: &str) -> Result<Lookup> {
        let Some(method) = self.table.generic_get() else {
            return Ok(None);
        };
        let getter = CallableMemberDescriptor::Method(Arc::clone(method));
        let value = getter.invoke(&self.object, &[HostValue::string(key)])?;
        Ok(Some(self.wrapper.wrap(value)))
    }
}

impl TemplateModel for BeanModel {
    fn as_scalar(&self) -> Option<&dyn TemplateScalarModel> {
        if self.table.is_to_string_hidden() {
            return None;
        }
        Some(self)
    }

    fn as_hash(&self) -> Option<&dyn TemplateHashModel> {
        Some(self)
    }

    fn as_hash_ex(&self) -> Option<&dyn TemplateHashModelEx> {
        Some(self)
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperTemplateModel> {
        Some(self)
    }
}

impl TemplateHashModel for BeanModel {
    fn get(&self, key: &str) -> Result<Option<ModelRef>> {
        let found = if self.wrapper.methods_shadow_items() {
            match self.member(key)? {
                Some(found) => Some(found),
                None => self.generic_get(key)?,
            }
        } else {
            let generic = self.generic_get(key)?;
            if let Some(Some(model)) = generic {
                return Ok(Some(model));
            }
            // a null from the generic getter still counts as found
            match self.member(key)? {
                Some(found) => Some(found),
                None => generic,
            }
        };

        match found {
            Some(value) => Ok(value),
            None if self.wrapper.is_strict() => Err(Error::InvalidProperty {
                key: key.to_string(),
                class: self.table.class().name().to_string(),
            }),
            None => {
                debug!(
                    key,
                    class = self.table.class().name(),
                    keys = ?self.table.keys().collect::<Vec<_>>(),
                    "key was not found on bean"
                );
                Ok(None)
            }
        }
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(match &self.object {
            HostValue::Null => true,
            HostValue::String(s) => s.is_empty(),
            HostValue::Boolean(b) => !b,
            HostValue::Array(array) => array.is_empty(),
            HostValue::List(list) => list.size() == 0,
            HostValue::Set(set) => set.size() == 0,
            HostValue::Map(map) => map.size() == 0,
            _ => false,
        })
    }
}

impl TemplateHashModelEx for BeanModel {
    fn size(&self) -> Result<usize> {
        Ok(self.table.len())
    }

    fn keys(&self) -> Result<Vec<Arc<str>>> {
        Ok(self.table.keys().cloned().collect())
    }

    fn values(&self) -> Result<Vec<Option<ModelRef>>> {
        self.table
            .keys()
            .map(|key| TemplateHashModel::get(self, key))
            .collect()
    }
}

impl TemplateScalarModel for BeanModel {
    /// The result of the object's `toString()`.
    fn get_as_string(&self) -> Result<Arc<str>> {
        let text = match self.table.to_string_method() {
            Some(method) => CallableMemberDescriptor::Method(Arc::clone(method))
                .invoke(&self.object, &[])?
                .to_display_string(),
            None => self.object.to_display_string(),
        };
        Ok(text.into())
    }
}

impl WrapperTemplateModel for BeanModel {
    fn wrapped_object(&self) -> HostValue {
        self.object.clone()
    }
}
