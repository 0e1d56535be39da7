use std::{
    collections::HashMap,
    sync::{Arc, Barrier, Weak},
    thread,
};

use beanwrap::{
    HostResult, ObjectWrapper,
    consts::ClassAccessFlag,
    introspector::{
        ClassIntrospector, ClassIntrospectorBuilder, Decision, DecisionInput, DependentCache,
        ExposedMember, MethodAppearanceFineTuner, PropertyDescriptor,
    },
    model::{ModelRef, TemplateModel, TemplateNumberModel, TemplateScalarModel},
    runtime::{Class, ClassBuilder, ClassRegistry, HostObject, HostValue, Number},
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

/// Counts how often each method was looked at, which is once per table built.
#[derive(Default)]
struct CountingTuner {
    seen: Mutex<HashMap<String, usize>>,
}

impl CountingTuner {
    fn count(&self, method: &str) -> usize {
        self.seen.lock().get(method).copied().unwrap_or_default()
    }
}

impl MethodAppearanceFineTuner for CountingTuner {
    fn process(&self, input: &DecisionInput<'_>, decision: &mut Decision) {
        let key = format!("{}.{}", input.containing_class.name(), input.method.name());
        *self.seen.lock().entry(key).or_default() += 1;
        match input.method.name() {
            "computeTotal" => {
                decision.expose_as_property =
                    Some(PropertyDescriptor::new("total", Arc::clone(input.method)));
            }
            "secret" => decision.expose_method_as = None,
            _ => {}
        }
    }
}

fn invoice(registry: &ClassRegistry) -> Arc<Class> {
    registry
        .define(
            ClassBuilder::new("com.example.Invoice")
                .method("computeTotal", "()I", |_, _| Ok(HostValue::int(42)))
                .method("secret", "()Ljava/lang/String;", |_, _| Ok(HostValue::string("s3cr3t"))),
        )
        .unwrap()
}

fn introspector(tuner: &Arc<CountingTuner>) -> Arc<ClassIntrospector> {
    let tuner: Arc<dyn MethodAppearanceFineTuner> = Arc::clone(tuner) as _;
    ClassIntrospectorBuilder::new()
        .method_appearance_fine_tuner(Some(tuner))
        .build_private()
}

#[test]
fn concurrent_first_access_builds_one_table() {
    let registry = ClassRegistry::new();
    let class = invoice(&registry);
    let tuner = Arc::new(CountingTuner::default());
    let introspector = introspector(&tuner);

    let threads = 16;
    let barrier = Barrier::new(threads);
    let tables: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    introspector.get(&class)
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(tables.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(tuner.count("com.example.Invoice.computeTotal"), 1);
    assert_eq!(introspector.cached_class_names(), vec!["com.example.Invoice".to_string()]);
}

#[test]
fn fine_tuner_decisions_shape_the_table() {
    let registry = ClassRegistry::new();
    let class = invoice(&registry);
    let tuner = Arc::new(CountingTuner::default());
    let table = introspector(&tuner).get(&class);

    assert!(matches!(table.get("total"), Some(ExposedMember::Property(_))));
    assert!(matches!(table.get("computeTotal"), Some(ExposedMember::Method(_))));
    assert!(table.get("secret").is_none());
}

#[test]
fn removed_classes_are_introspected_again() {
    let registry = ClassRegistry::new();
    let class = invoice(&registry);
    let tuner = Arc::new(CountingTuner::default());
    let introspector = introspector(&tuner);

    let first = introspector.get(&class);
    assert!(Arc::ptr_eq(&first, &introspector.get(&class)));
    let counter = introspector.clearing_counter();

    introspector.remove(&class);
    let second = introspector.get(&class);

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(tuner.count("com.example.Invoice.computeTotal"), 2);
    assert!(introspector.clearing_counter() > counter);
}

#[test]
fn redefining_a_class_drops_everything_cached() {
    let registry = ClassRegistry::new();
    let tuner = Arc::new(CountingTuner::default());
    let introspector = introspector(&tuner);
    let old = invoice(&registry);
    let other = registry.define(ClassBuilder::new("com.example.Customer")).unwrap();
    introspector.get(&old);
    introspector.get(&other);
    let counter = introspector.clearing_counter();

    let reloaded = invoice(&registry);
    let table = introspector.get(&reloaded);

    assert!(Arc::ptr_eq(table.class(), &reloaded));
    assert_eq!(introspector.cached_class_names(), vec!["com.example.Invoice".to_string()]);
    assert!(introspector.clearing_counter() > counter);
}

#[derive(Default)]
struct Forgetful {
    cleared: Mutex<usize>,
    removed: Mutex<Vec<String>>,
}

impl DependentCache for Forgetful {
    fn clear(&self) {
        *self.cleared.lock() += 1;
    }

    fn remove(&self, class: &Arc<Class>) {
        self.removed.lock().push(class.name().to_string());
    }
}

#[test]
fn dropped_dependents_are_skipped() {
    let registry = ClassRegistry::new();
    let class = invoice(&registry);
    let introspector = ClassIntrospectorBuilder::new().build_private();

    let kept = Arc::new(Forgetful::default());
    let kept_dyn: Arc<dyn DependentCache> = Arc::clone(&kept) as _;
    introspector.register_dependent(Arc::downgrade(&kept_dyn));
    {
        let dropped: Arc<dyn DependentCache> = Arc::new(Forgetful::default());
        let weak: Weak<dyn DependentCache> = Arc::downgrade(&dropped);
        introspector.register_dependent(weak);
    }

    introspector.get(&class);
    introspector.remove(&class);
    introspector.clear_cache().unwrap();

    assert_eq!(*kept.removed.lock(), vec!["com.example.Invoice".to_string()]);
    assert_eq!(*kept.cleared.lock(), 1);
}

#[test]
fn equal_settings_share_one_introspector() {
    let first = ClassIntrospectorBuilder::new().build();
    let second = ClassIntrospectorBuilder::new().build();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.clear_cache().is_err());

    let private = ClassIntrospectorBuilder::new().build_private();
    assert!(!Arc::ptr_eq(&first, &private));
    assert!(private.clear_cache().is_ok());
}

fn read_method_owner(table: &beanwrap::introspector::ClassIntrospectionTable, key: &str) -> String {
    match table.get(key) {
        Some(ExposedMember::Property(property)) => {
            property.read_method.declaring_class_name().to_string()
        }
        other => panic!("{key} is not a property: {other:?}"),
    }
}

#[test]
fn non_public_classes_are_reached_through_public_supertypes() {
    let registry = ClassRegistry::new();
    registry
        .define(
            ClassBuilder::interface("com.example.Shape")
                .abstract_method("getName", "()Ljava/lang/String;")
                .method("getArea", "()D", |_, _| Ok(HostValue::Number(Number::Double(2.5)))),
        )
        .unwrap();
    let class = registry
        .define(
            ClassBuilder::new("com.example.Impl")
                .access_flags(ClassAccessFlag::empty())
                .implements("com.example.Shape")
                .method("getName", "()Ljava/lang/String;", |_, _| Ok(HostValue::string("impl-name")))
                .method("getSecret", "()Ljava/lang/String;", |_, _| Ok(HostValue::string("secret"))),
        )
        .unwrap();
    let wrapper = ObjectWrapper::builder().shared_class_introspector(false).build();
    let table = wrapper.introspector().get(&class);

    assert_eq!(read_method_owner(&table, "name"), "com.example.Shape");
    assert_eq!(read_method_owner(&table, "area"), "com.example.Shape");
    assert!(table.get("secret").is_none());
    assert!(table.get("getSecret").is_none());
    assert!(matches!(table.get("getName"), Some(ExposedMember::Method(_))));

    let object = HostValue::Object(HostObject::new(&class, ()));
    let text = |model: Option<ModelRef>| model.unwrap().as_scalar().unwrap().get_as_string().unwrap().to_string();
    assert_eq!(text(wrapper.get(&object, "name").unwrap()), "impl-name");
    let area = wrapper.get(&object, "area").unwrap().unwrap();
    assert_eq!(area.as_number().unwrap().get_as_number().unwrap(), Number::Double(2.5));
}

fn hidden_value(_: &HostValue, _: &[HostValue]) -> HostResult<HostValue> {
    Ok(HostValue::string("hidden-value"))
}

#[test]
fn accessible_methods_prefer_the_same_return_type_over_a_covariant_one() {
    let registry = ClassRegistry::new();
    registry
        .define(ClassBuilder::interface("com.example.Source").abstract_method("getValue", "()Ljava/lang/Object;"))
        .unwrap();
    registry
        .define(
            ClassBuilder::interface("com.example.NamedSource")
                .abstract_method("getValue", "()Ljava/lang/String;"),
        )
        .unwrap();
    let both = registry
        .define(
            ClassBuilder::new("com.example.HiddenBoth")
                .access_flags(ClassAccessFlag::empty())
                .implements("com.example.Source")
                .implements("com.example.NamedSource")
                .method("getValue", "()Ljava/lang/String;", hidden_value),
        )
        .unwrap();
    let covariant = registry
        .define(
            ClassBuilder::new("com.example.HiddenCovariant")
                .access_flags(ClassAccessFlag::empty())
                .implements("com.example.Source")
                .method("getValue", "()Ljava/lang/String;", hidden_value),
        )
        .unwrap();
    let introspector = ClassIntrospectorBuilder::new().build_private();

    let table = introspector.get(&both);
    assert_eq!(read_method_owner(&table, "value"), "com.example.NamedSource");

    let table = introspector.get(&covariant);
    assert_eq!(read_method_owner(&table, "value"), "com.example.Source");

    let wrapper = ObjectWrapper::builder().shared_class_introspector(false).build();
    let object = HostValue::Object(HostObject::new(&covariant, ()));
    let read = wrapper.get(&object, "value").unwrap().unwrap();
    assert_eq!(&*read.as_scalar().unwrap().get_as_string().unwrap(), "hidden-value");
}
