mod builder;
mod discovery;
mod fine_tuner;
mod table;

use std::{
    collections::HashSet,
    hash::{Hash, Hasher},
    sync::{Arc, Weak},
};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

pub use builder::{ClassIntrospectorBuilder, ExposureLevel};
pub use fine_tuner::{Decision, DecisionInput, MethodAppearanceFineTuner};
pub use table::{ClassIntrospectionTable, ExposedConstructors, ExposedMember, PropertyDescriptor};

use crate::{
    access_policy::MemberAccessPolicy,
    error::{Error, Result},
    runtime::Class,
};

/// A cache whose content is derived from introspection data, and so must be dropped together
/// with it.
pub trait DependentCache: Send + Sync {
    fn clear(&self);

    fn remove(&self, class: &Arc<Class>);
}

/// Keys the cache by class identity.
#[derive(Clone)]
struct ClassKey(Arc<Class>);

impl PartialEq for ClassKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassKey {}

impl Hash for ClassKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

#[derive(Default)]
struct SharedState {
    cached_class_names: HashSet<Arc<str>>,
    clearing_counter: u64,
    dependents: Vec<Weak<dyn DependentCache>>,
}

impl SharedState {
    fn live_dependents(&mut self) -> Vec<Arc<dyn DependentCache>> {
        self.dependents.retain(|dependent| dependent.strong_count() > 0);
        self.dependents.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Computes and caches the [`ClassIntrospectionTable`] of classes.
///
/// Tables are computed at most once per class at a time: concurrent requests for a class being
/// introspected wait for that computation. A class whose name was already cached for another
/// class object is taken for a reloaded class, and the whole cache is flushed.
pub struct ClassIntrospector {
    settings: ClassIntrospectorBuilder,
    has_shared_instance_restrictions: bool,
    shared: bool,
    cache: DashMap<ClassKey, Arc<OnceCell<Arc<ClassIntrospectionTable>>>>,
    // guards installing cache cells, the class names, the dependents and flushing
    state: Mutex<SharedState>,
}

impl ClassIntrospector {
    fn new(settings: ClassIntrospectorBuilder, has_shared_instance_restrictions: bool, shared: bool) -> Self {
        ClassIntrospector {
            settings,
            has_shared_instance_restrictions,
            shared,
            cache: DashMap::new(),
            state: Mutex::new(SharedState::default()),
        }
    }

    /// The settings this introspector was built with.
    pub fn settings(&self) -> &ClassIntrospectorBuilder {
        &self.settings
    }

    pub fn member_access_policy(&self) -> &Arc<dyn MemberAccessPolicy> {
        self.settings.get_member_access_policy()
    }

    pub fn exposure_level(&self) -> ExposureLevel {
        self.settings.get_exposure_level()
    }

    /// Whether this instance is the process-wide one for its settings.
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn has_shared_instance_restrictions(&self) -> bool {
        self.has_shared_instance_restrictions
    }

    pub fn get(&self, class: &Arc<Class>) -> Arc<ClassIntrospectionTable> {
        let key = ClassKey(Arc::clone(class));
        if let Some(table) = self.cache.get(&key).and_then(|cell| cell.get().cloned()) {
            trace!(class = class.name(), "introspection cache hit");
            return table;
        }

        let cell = {
            let mut state = self.state.lock();
            match self.cache.get(&key) {
                Some(cell) => Arc::clone(cell.value()),
                None => {
                    let name: Arc<str> = class.name().into();
                    if state.cached_class_names.contains(&name) {
                        info!(
                            class = &*name,
                            "detected multiple classes with the same name, assuming it was a class reload; \
                             clearing class introspection caches to release old data"
                        );
                        self.flush(&mut state);
                    }
                    state.cached_class_names.insert(name);
                    let cell = Arc::new(OnceCell::new());
                    self.cache.insert(key, Arc::clone(&cell));
                    cell
                }
            }
        };

        let table = cell.get_or_init(|| {
            let table = discovery::create_table(&self.settings, class);
            debug!(class = class.name(), members = table.len(), "introspected class");
            Arc::new(table)
        });
        Arc::clone(table)
    }

    /// Drops everything cached, including the dependent caches. Not allowed on instances
    /// returned by [`ClassIntrospectorBuilder::build`], as other users may share them.
    pub fn clear_cache(&self) -> Result<()> {
        if self.has_shared_instance_restrictions {
            return Err(Error::ClearSharedCache);
        }
        self.flush(&mut self.state.lock());
        Ok(())
    }

    fn flush(&self, state: &mut SharedState) {
        self.cache.clear();
        state.cached_class_names.clear();
        state.clearing_counter += 1;
        for dependent in state.live_dependents() {
            dependent.clear();
        }
    }

    /// Drops the table of one class; the next [`ClassIntrospector::get`] introspects it again.
    pub fn remove(&self, class: &Arc<Class>) {
        let mut state = self.state.lock();
        self.cache.remove(&ClassKey(Arc::clone(class)));
        state.cached_class_names.remove(class.name());
        state.clearing_counter += 1;
        for dependent in state.live_dependents() {
            dependent.remove(class);
        }
    }

    /// Counts the events that could have made earlier returned tables outdated.
    pub fn clearing_counter(&self) -> u64 {
        self.state.lock().clearing_counter
    }

    pub fn cached_class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .cached_class_names
            .iter()
            .map(|name| name.to_string())
            .collect();
        names.sort();
        names
    }

    pub fn register_dependent(&self, dependent: Weak<dyn DependentCache>) {
        let mut state = self.state.lock();
        state.dependents.retain(|d| d.strong_count() > 0);
        state.dependents.push(dependent);
    }

    pub fn unregister_dependent(&self, dependent: &Arc<dyn DependentCache>) {
        let target = Arc::as_ptr(dependent) as *const ();
        self.state
            .lock()
            .dependents
            .retain(|d| d.strong_count() > 0 && d.as_ptr() as *const () != target);
    }
}

impl std::fmt::Debug for ClassIntrospector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassIntrospector")
            .field("settings", &self.settings)
            .field("shared", &self.shared)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        access_policy::AllowAllMemberAccessPolicy,
        runtime::{ClassBuilder, ClassRegistry, HostValue},
    };
    use pretty_assertions::assert_eq;

    fn point(registry: &ClassRegistry) -> Arc<Class> {
        registry
            .define(
                ClassBuilder::new("com.example.Point")
                    .field("x", "I", |_| Ok(HostValue::int(1)))
                    .constructor("(II)", |class, _| {
                        Ok(HostValue::Object(crate::runtime::HostObject::new(class, ())))
                    })
                    .method("getX", "()I", |_, _| Ok(HostValue::int(1)))
                    .method("isVisible", "()Z", |_, _| Ok(HostValue::Boolean(true)))
                    .method("getURL", "()Ljava/lang/String;", |_, _| Ok(HostValue::string("u")))
                    .method("setColor", "(Ljava/lang/String;)V", |_, _| Ok(HostValue::Null))
                    .method("setColor", "(I)V", |_, _| Ok(HostValue::Null))
                    .method("get", "(Ljava/lang/String;)Ljava/lang/Object;", |_, _| {
                        Ok(HostValue::Null)
                    }),
            )
            .unwrap()
    }

    fn private() -> Arc<ClassIntrospector> {
        ClassIntrospectorBuilder::new().build_private()
    }

    #[test]
    fn point_surface() {
        let registry = ClassRegistry::new();
        let class = point(&registry);
        let table = private().get(&class);

        assert!(matches!(table.get("x"), Some(ExposedMember::Property(p)) if p.read_method.name() == "getX"));
        assert!(matches!(table.get("visible"), Some(ExposedMember::Property(_))));
        assert!(matches!(table.get("URL"), Some(ExposedMember::Property(_))));
        assert!(table.get("y").is_none());
        let Some(ExposedMember::Overloaded(set_color)) = table.get("setColor") else {
            panic!("setColor should be overloaded");
        };
        assert_eq!(set_color.members().len(), 2);
        assert!(matches!(table.get("getX"), Some(ExposedMember::Method(_))));
        assert!(matches!(table.constructors(), Some(ExposedConstructors::Single(_))));
        assert_eq!(table.generic_get().map(|m| m.name()), Some("get"));
        // fields are only exposed on request
        assert!(matches!(table.get("x"), Some(ExposedMember::Property(_))));
    }

    #[test]
    fn exposure_levels() {
        let registry = ClassRegistry::new();
        let class = point(&registry);

        let properties_only = ClassIntrospectorBuilder::new()
            .exposure_level(ExposureLevel::PropertiesOnly)
            .build_private()
            .get(&class);
        assert!(properties_only.get("x").is_some());
        assert!(properties_only.get("setColor").is_none());

        let nothing = ClassIntrospectorBuilder::new()
            .exposure_level(ExposureLevel::Nothing)
            .expose_fields(true)
            .build_private()
            .get(&class);
        assert!(matches!(nothing.get("x"), Some(ExposedMember::Field(_))));
        assert!(nothing.get("getX").is_none());
        assert!(nothing.constructors().is_some());
    }

    #[test]
    fn same_class_is_introspected_once() {
        let registry = ClassRegistry::new();
        let class = point(&registry);
        let introspector = private();
        let first = introspector.get(&class);
        assert!(Arc::ptr_eq(&first, &introspector.get(&class)));
        assert_eq!(introspector.cached_class_names(), ["com.example.Point"]);
    }

    #[test]
    fn remove_forces_fresh_introspection() {
        let registry = ClassRegistry::new();
        let class = point(&registry);
        let introspector = private();
        let first = introspector.get(&class);
        introspector.remove(&class);
        assert_eq!(introspector.clearing_counter(), 1);
        assert!(!Arc::ptr_eq(&first, &introspector.get(&class)));
    }

    #[test]
    fn reloaded_class_flushes_the_cache() {
        let introspector = private();
        let old_registry = ClassRegistry::new();
        let old = point(&old_registry);
        let other = old_registry
            .define(ClassBuilder::new("com.example.Other"))
            .unwrap();
        introspector.get(&old);
        introspector.get(&other);

        let new_registry = ClassRegistry::new();
        let reloaded = point(&new_registry);
        introspector.get(&reloaded);
        assert_eq!(introspector.clearing_counter(), 1);
        assert_eq!(introspector.cached_class_names(), ["com.example.Point"]);
    }

    #[test]
    fn shared_instances_refuse_clearing() {
        let shared = ClassIntrospectorBuilder::new()
            .member_access_policy(Arc::new(AllowAllMemberAccessPolicy))
            .build();
        assert!(matches!(shared.clear_cache(), Err(Error::ClearSharedCache)));
        assert!(private().clear_cache().is_ok());
    }

    struct CountingCache {
        cleared: Mutex<Vec<String>>,
    }

    impl DependentCache for CountingCache {
        fn clear(&self) {
            self.cleared.lock().push("*".to_string());
        }

        fn remove(&self, class: &Arc<Class>) {
            self.cleared.lock().push(class.name().to_string());
        }
    }

    #[test]
    fn dependents_are_notified() {
        let registry = ClassRegistry::new();
        let class = point(&registry);
        let introspector = private();
        let dependent = Arc::new(CountingCache {
            cleared: Mutex::new(vec![]),
        });
        let as_dependent: Arc<dyn DependentCache> = dependent.clone();
        introspector.register_dependent(Arc::downgrade(&as_dependent));
        introspector.remove(&class);
        introspector.clear_cache().unwrap();
        assert_eq!(*dependent.cleared.lock(), ["com.example.Point", "*"]);

        introspector.unregister_dependent(&as_dependent);
        introspector.clear_cache().unwrap();
        assert_eq!(dependent.cleared.lock().len(), 2);
    }
}
