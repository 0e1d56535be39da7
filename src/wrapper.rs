use std::sync::{Arc, Weak};

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use crate::{
    access_policy::MemberAccessPolicy,
    error::{Error, Result},
    introspector::{
        ClassIntrospector, ClassIntrospectorBuilder, DependentCache, ExposedConstructors,
        ExposedMember, ExposureLevel, MethodAppearanceFineTuner,
    },
    model::{
        ArrayModel, BeanModel, BooleanModel, CollectionModel, EnumModels, IteratorModel,
        ListModel, MapModel, ModelRef, OverloadedMethodsModel, ResourceBundleModel, SimpleDate,
        SimpleMethodModel, SimpleNumber, SimpleScalar, StaticModels, TemplateMethodModel,
        TemplateModel,
    },
    overload::unwrap_arguments,
    runtime::{Class, ClassRegistry, HostValue, JType, famous_classes},
    unwrap,
};

/// Configuration of an [`ObjectWrapper`].
#[derive(Clone)]
pub struct ObjectWrapperBuilder {
    introspector: ClassIntrospectorBuilder,
    shared_introspector: bool,
    strict: bool,
    methods_shadow_items: bool,
    class_registry: Option<Arc<ClassRegistry>>,
}

impl Default for ObjectWrapperBuilder {
    fn default() -> Self {
        ObjectWrapperBuilder {
            introspector: ClassIntrospectorBuilder::default(),
            shared_introspector: true,
            strict: false,
            methods_shadow_items: true,
            class_registry: None,
        }
    }
}

impl ObjectWrapperBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class_introspector(mut self, introspector: ClassIntrospectorBuilder) -> Self {
        self.introspector = introspector;
        self
    }

    pub fn exposure_level(mut self, exposure_level: ExposureLevel) -> Self {
        self.introspector = self.introspector.exposure_level(exposure_level);
        self
    }

    pub fn expose_fields(mut self, expose_fields: bool) -> Self {
        self.introspector = self.introspector.expose_fields(expose_fields);
        self
    }

    pub fn member_access_policy(mut self, policy: Arc<dyn MemberAccessPolicy>) -> Self {
        self.introspector = self.introspector.member_access_policy(policy);
        self
    }

    pub fn method_appearance_fine_tuner(
        mut self,
        fine_tuner: Option<Arc<dyn MethodAppearanceFineTuner>>,
    ) -> Self {
        self.introspector = self.introspector.method_appearance_fine_tuner(fine_tuner);
        self
    }

    /// Use the process-wide introspector for the settings (the default) instead of a private one.
    pub fn shared_class_introspector(mut self, shared: bool) -> Self {
        self.shared_introspector = shared;
        self
    }

    /// Missing keys of beans are errors instead of null.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// When false, the generic `get(key)` method of beans is consulted before their members.
    pub fn methods_shadow_items(mut self, methods_shadow_items: bool) -> Self {
        self.methods_shadow_items = methods_shadow_items;
        self
    }

    /// Where class names given to the static and enum models are looked up; the well-known
    /// classes otherwise.
    pub fn class_registry(mut self, registry: Arc<ClassRegistry>) -> Self {
        self.class_registry = Some(registry);
        self
    }

    pub fn build(self) -> Arc<ObjectWrapper> {
        let introspector = if self.shared_introspector {
            self.introspector.build()
        } else {
            self.introspector.build_private()
        };
        let wrapper = Arc::new_cyclic(|weak| ObjectWrapper {
            introspector,
            strict: self.strict,
            methods_shadow_items: self.methods_shadow_items,
            class_registry: self.class_registry,
            static_models: Arc::new(StaticModels::new(weak.clone())),
            enum_models: Arc::new(EnumModels::new(weak.clone())),
            bound_methods: DashMap::new(),
        });
        for factory in [wrapper.static_models.factory(), wrapper.enum_models.factory()] {
            let dependent: Arc<dyn DependentCache> = Arc::clone(factory) as _;
            wrapper.introspector.register_dependent(Arc::downgrade(&dependent));
        }
        debug!(introspector = ?wrapper.introspector, strict = wrapper.strict, "built object wrapper");
        wrapper
    }
}

/// Converts between host values and template models, and gives access to the members of host
/// objects.
pub struct ObjectWrapper {
    introspector: Arc<ClassIntrospector>,
    strict: bool,
    methods_shadow_items: bool,
    class_registry: Option<Arc<ClassRegistry>>,
    static_models: Arc<StaticModels>,
    enum_models: Arc<EnumModels>,
    // method models bound to host objects, by object and member identity
    bound_methods: DashMap<(usize, usize), Weak<dyn TemplateModel>>,
}

/// Dead entries are dropped from the bound method cache each time it grows by this much.
const BOUND_METHOD_SWEEP: usize = 256;

impl ObjectWrapper {
    pub fn builder() -> ObjectWrapperBuilder {
        ObjectWrapperBuilder::new()
    }

    pub fn introspector(&self) -> &Arc<ClassIntrospector> {
        &self.introspector
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn methods_shadow_items(&self) -> bool {
        self.methods_shadow_items
    }

    pub fn static_models(&self) -> &Arc<StaticModels> {
        &self.static_models
    }

    pub fn enum_models(&self) -> &Arc<EnumModels> {
        &self.enum_models
    }

    /// Wraps a host value into the model matching its kind; `None` for null. Containers that
    /// adapt a template model give back that model.
    pub fn wrap(self: &Arc<Self>, value: HostValue) -> Option<ModelRef> {
        let model: ModelRef = match value {
            HostValue::Null => return None,
            HostValue::String(s) => Arc::new(SimpleScalar::new(s)),
            HostValue::Char(c) => Arc::new(SimpleScalar::new(c.to_string())),
            HostValue::Number(n) => Arc::new(SimpleNumber::new(n)),
            HostValue::Boolean(b) => Arc::new(BooleanModel::new(b)),
            HostValue::Date(d) => Arc::new(SimpleDate::new(d)),
            HostValue::Array(array) => Arc::new(ArrayModel::new(array, Arc::clone(self))),
            HostValue::List(list) => match list.template_model() {
                Some(model) => model,
                None => Arc::new(ListModel::new(list, Arc::clone(self))),
            },
            HostValue::Set(set) => match set.template_model() {
                Some(model) => model,
                None => Arc::new(CollectionModel::new(set, Arc::clone(self))),
            },
            HostValue::Map(map) => match map.template_model() {
                Some(model) => model,
                None => Arc::new(MapModel::new(map, Arc::clone(self))),
            },
            HostValue::Iterator(iterator) => Arc::new(IteratorModel::new(iterator, Arc::clone(self))),
            HostValue::ResourceBundle(bundle) => {
                Arc::new(ResourceBundleModel::new(bundle, Arc::clone(self)))
            }
            object @ HostValue::Object(_) => Arc::new(BeanModel::new(object, Arc::clone(self))),
        };
        Some(model)
    }

    pub fn unwrap(&self, model: Option<&ModelRef>) -> Result<HostValue> {
        unwrap::unwrap(model)
    }

    pub fn unwrap_to(&self, model: Option<&ModelRef>, target: &JType) -> Result<HostValue> {
        unwrap::unwrap_to(model, target)
    }

    /// Reads `key` of a host object the way a template would.
    pub fn get(self: &Arc<Self>, object: &HostValue, key: &str) -> Result<Option<ModelRef>> {
        if object.is_null() {
            return Err(Error::Model(format!("can't read {key:?} of null")));
        }
        let bean = BeanModel::new(object.clone(), Arc::clone(self));
        crate::model::TemplateHashModel::get(&bean, key)
    }

    /// The method model bound to `object` for the member with the given identity. Models are
    /// shared with earlier lookups while anything still holds them; holding one keeps both the
    /// object and the member alive, so their identities can't be reused meanwhile.
    pub(crate) fn bound_method(
        &self,
        object: &HostValue,
        member: usize,
        build: impl FnOnce() -> ModelRef,
    ) -> ModelRef {
        let HostValue::Object(host) = object else {
            return build();
        };
        if self.bound_methods.len() % BOUND_METHOD_SWEEP == BOUND_METHOD_SWEEP - 1 {
            self.bound_methods.retain(|_, weak| weak.strong_count() > 0);
        }
        let entry = self.bound_methods.entry((host.identity_hash(), member));
        if let Entry::Occupied(occupied) = &entry {
            if let Some(model) = occupied.get().upgrade() {
                return model;
            }
        }
        let model = build();
        entry.insert(Arc::downgrade(&model));
        model
    }

    /// Calls the method exposed as `key` on a host object.
    pub fn invoke(
        self: &Arc<Self>,
        object: &HostValue,
        key: &str,
        args: &[Option<ModelRef>],
    ) -> Result<Option<ModelRef>> {
        let class = self.class_of(object)?;
        let table = self.introspector.get(&class);
        match table.get(key) {
            Some(ExposedMember::Method(method)) => {
                SimpleMethodModel::new(object.clone(), Arc::clone(method), Arc::clone(self)).exec(args)
            }
            Some(ExposedMember::Overloaded(methods)) => {
                OverloadedMethodsModel::new(object.clone(), Arc::clone(methods), Arc::clone(self))
                    .exec(args)
            }
            Some(_) => Err(Error::NotAMethod {
                key: key.to_string(),
                class: class.name().to_string(),
            }),
            None => Err(Error::InvalidProperty {
                key: key.to_string(),
                class: class.name().to_string(),
            }),
        }
    }

    /// Creates an instance of `class` with the exposed constructor the arguments select.
    pub fn new_instance(&self, class: &Arc<Class>, args: &[Option<ModelRef>]) -> Result<HostValue> {
        let table = self.introspector.get(class);
        match table.constructors() {
            None => Err(Error::NoPublicConstructor(class.name().to_string())),
            Some(ExposedConstructors::Single(constructor)) => {
                let args = unwrap_arguments(constructor, args)?;
                constructor.invoke(&HostValue::Null, &args)
            }
            Some(ExposedConstructors::Overloaded(constructors)) => {
                constructors.resolve(args)?.invoke(&HostValue::Null)
            }
        }
    }

    pub fn remove_from_class_introspection_cache(&self, class: &Arc<Class>) {
        self.introspector.remove(class);
    }

    pub fn clear_class_introspection_cache(&self) -> Result<()> {
        self.introspector.clear_cache()
    }

    pub(crate) fn resolve_class(&self, name: &str) -> Result<Arc<Class>> {
        match &self.class_registry {
            Some(registry) => registry.resolve(name),
            None => famous_classes::resolve(name),
        }
    }

    fn class_of(&self, object: &HostValue) -> Result<Arc<Class>> {
        match object {
            HostValue::Null => Err(Error::Model("can't call a method of null".to_string())),
            HostValue::Array(_) => Ok(Arc::clone(famous_classes::object_class())),
            other => other
                .runtime_class()
                .ok_or_else(|| Error::Model(format!("{} has no class", other.type_name()))),
        }
    }
}

impl std::fmt::Debug for ObjectWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectWrapper")
            .field("introspector", &self.introspector)
            .field("strict", &self.strict)
            .field("methods_shadow_items", &self.methods_shadow_items)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{TemplateHashModel, TemplateHashModelEx, TemplateSequenceModel},
        runtime::{ClassBuilder, HostList, HostMap, HostObject, Number},
    };
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn wrapper() -> Arc<ObjectWrapper> {
        ObjectWrapper::builder().shared_class_introspector(false).build()
    }

    #[test]
    fn values_wrap_by_kind() {
        let wrapper = wrapper();
        assert!(wrapper.wrap(HostValue::Null).is_none());
        let scalar = wrapper.wrap(HostValue::string("a")).unwrap();
        assert_eq!(&*scalar.as_scalar().unwrap().get_as_string().unwrap(), "a");
        let number = wrapper.wrap(HostValue::int(3)).unwrap();
        assert!(number.as_number().is_some() && number.as_scalar().is_none());

        let list = wrapper
            .wrap(HostValue::List(HostList::new(vec![HostValue::int(1), HostValue::Null])))
            .unwrap();
        let sequence = list.as_sequence().unwrap();
        assert_eq!(sequence.size().unwrap(), 2);
        assert!(sequence.get(1).unwrap().is_none());
        assert!(sequence.get(2).unwrap().is_none());

        let map = wrapper
            .wrap(HostValue::Map(HostMap::new([("k".into(), HostValue::Boolean(true))])))
            .unwrap();
        assert_eq!(map.as_hash_ex().unwrap().keys().unwrap(), vec![Arc::from("k")]);
    }

    #[test]
    fn unwrapping_wrapped_values_gives_them_back() {
        let wrapper = wrapper();
        let date = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        for value in [
            HostValue::string("text"),
            HostValue::int(42),
            HostValue::Number(Number::Double(1.5)),
            HostValue::Boolean(false),
            HostValue::Date(date),
            HostValue::List(HostList::new(vec![])),
            HostValue::Map(HostMap::new([])),
        ] {
            let model = wrapper.wrap(value.clone());
            assert_eq!(wrapper.unwrap(model.as_ref()).unwrap(), value);
        }
    }

    #[test]
    fn generic_get_and_missing_keys() {
        let registry = ClassRegistry::new();
        let class = registry
            .define(
                ClassBuilder::new("com.example.Settings")
                    .method("getName", "()Ljava/lang/String;", |_, _| Ok(HostValue::string("member")))
                    .method("get", "(Ljava/lang/String;)Ljava/lang/Object;", |_, args| {
                        Ok(match args[0].as_str() {
                            Some("name") | Some("extra") => HostValue::string("item"),
                            _ => HostValue::Null,
                        })
                    }),
            )
            .unwrap();
        let object = HostValue::Object(HostObject::new(&class, ()));
        let text = |model: Option<ModelRef>| {
            model.map(|m| m.as_scalar().unwrap().get_as_string().unwrap().to_string())
        };

        let lenient = wrapper();
        assert_eq!(text(lenient.get(&object, "name").unwrap()), Some("member".to_string()));
        assert_eq!(text(lenient.get(&object, "extra").unwrap()), Some("item".to_string()));
        assert_eq!(text(lenient.get(&object, "unknown").unwrap()), None);

        let items_first = ObjectWrapper::builder()
            .shared_class_introspector(false)
            .methods_shadow_items(false)
            .build();
        assert_eq!(text(items_first.get(&object, "name").unwrap()), Some("item".to_string()));

        let strict = ObjectWrapper::builder()
            .shared_class_introspector(false)
            .strict(true)
            .build();
        // the generic getter is there, so nothing is missing
        assert_eq!(text(strict.get(&object, "unknown").unwrap()), None);
    }

    #[test]
    fn strict_mode_reports_missing_keys() {
        let registry = ClassRegistry::new();
        let class = registry.define(ClassBuilder::new("com.example.Empty")).unwrap();
        let object = HostValue::Object(HostObject::new(&class, ()));
        let strict = ObjectWrapper::builder()
            .shared_class_introspector(false)
            .strict(true)
            .build();
        assert!(matches!(
            strict.get(&object, "missing"),
            Err(Error::InvalidProperty { key, class }) if key == "missing" && class == "com.example.Empty"
        ));
        assert!(wrapper().get(&object, "missing").unwrap().is_none());
    }

    #[test]
    fn bean_method_models_are_cached_per_instance() {
        let registry = ClassRegistry::new();
        let class = registry
            .define(ClassBuilder::new("com.example.Greeter").method(
                "greet",
                "(Ljava/lang/String;)Ljava/lang/String;",
                |_, args| Ok(HostValue::string(format!("Hello {}", args[0].to_display_string()))),
            ))
            .unwrap();
        let wrapper = wrapper();
        let bean = wrapper
            .wrap(HostValue::Object(HostObject::new(&class, ())))
            .unwrap();
        let hash = bean.as_hash().unwrap();
        let first = hash.get("greet").unwrap().unwrap();
        let second = hash.get("greet").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let name: Option<ModelRef> = Some(Arc::new(SimpleScalar::new("Ann")));
        let greeting = first.as_method().unwrap().exec(&[name]).unwrap().unwrap();
        assert_eq!(&*greeting.as_scalar().unwrap().get_as_string().unwrap(), "Hello Ann");
    }

    #[test]
    fn properties_are_not_methods() {
        let registry = ClassRegistry::new();
        let class = registry
            .define(
                ClassBuilder::new("com.example.Box")
                    .method("getSize", "()I", |_, _| Ok(HostValue::int(7))),
            )
            .unwrap();
        let object = HostValue::Object(HostObject::new(&class, ()));
        let wrapper = wrapper();
        assert!(matches!(wrapper.invoke(&object, "size", &[]), Err(Error::NotAMethod { .. })));
        assert!(matches!(
            wrapper.invoke(&object, "nope", &[]),
            Err(Error::InvalidProperty { .. })
        ));
        let size = wrapper.invoke(&object, "getSize", &[]).unwrap().unwrap();
        assert_eq!(
            size.as_number().unwrap().get_as_number().unwrap(),
            Number::Int(7)
        );
    }

    #[test]
    fn method_models_are_shared_across_lookups() {
        let registry = ClassRegistry::new();
        let class = registry
            .define(
                ClassBuilder::new("com.example.Counter")
                    .method("next", "()I", |_, _| Ok(HostValue::int(1)))
                    .method("add", "(I)I", |_, args| Ok(args[0].clone()))
                    .method("add", "(J)J", |_, args| Ok(args[0].clone())),
            )
            .unwrap();
        let wrapper = wrapper();
        let object = HostValue::Object(HostObject::new(&class, ()));

        let first = wrapper.get(&object, "next").unwrap().unwrap();
        let second = wrapper.get(&object, "next").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let overloaded = wrapper.get(&object, "add").unwrap().unwrap();
        assert!(Arc::ptr_eq(&overloaded, &wrapper.get(&object, "add").unwrap().unwrap()));

        let bean = wrapper.wrap(object.clone()).unwrap();
        let through_bean = bean.as_hash().unwrap().get("next").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &through_bean));

        let other = HostValue::Object(HostObject::new(&class, ()));
        let elsewhere = wrapper.get(&other, "next").unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &elsewhere));
    }

    #[test]
    fn to_string_is_resolved_with_the_table() {
        let registry = ClassRegistry::new();
        let named = registry
            .define(
                ClassBuilder::new("com.example.Named")
                    .method("toString", "()Ljava/lang/String;", |_, _| Ok(HostValue::string("named"))),
            )
            .unwrap();
        let plain = registry.define(ClassBuilder::new("com.example.Plain")).unwrap();
        let wrapper = wrapper();

        let table = wrapper.introspector().get(&named);
        let to_string = table.to_string_method().unwrap();
        assert_eq!(to_string.declaring_class_name(), "com.example.Named");
        let table = wrapper.introspector().get(&plain);
        assert_eq!(
            table.to_string_method().map(|method| method.declaring_class_name()),
            Some("java.lang.Object")
        );

        let bean = wrapper
            .wrap(HostValue::Object(HostObject::new(&named, ())))
            .unwrap();
        let scalar = bean.as_scalar().unwrap();
        for _ in 0..2 {
            assert_eq!(&*scalar.get_as_string().unwrap(), "named");
        }
    }
}
