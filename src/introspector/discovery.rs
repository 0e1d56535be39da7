use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use tracing::warn;

use crate::{
    access_policy::ClassMemberAccessPolicy,
    introspector::{
        ClassIntrospectionTable, ClassIntrospectorBuilder, Decision, DecisionInput, ExposedConstructors,
        ExposedMember, ExposureLevel, PropertyDescriptor,
    },
    overload::{CallableMemberDescriptor, OverloadedMethods},
    runtime::{Class, JType, MethodInfo, PrimitiveType, famous_classes, inheritance},
};

type Signature = (Arc<str>, Vec<JType>);

/// Methods that can be called through a class, by signature. A class can have several methods
/// with the same signature but different return types.
type AccessibleMethods = HashMap<Signature, Vec<Arc<MethodInfo>>>;

enum Entry {
    Exposed(ExposedMember),
    Overloaded(OverloadedMethods),
}

/// Computes the exposed surface of `class`.
pub(crate) fn create_table(
    settings: &ClassIntrospectorBuilder,
    class: &Arc<Class>,
) -> ClassIntrospectionTable {
    let policy = settings.get_member_access_policy().for_class(class);
    let discovery = Discovery {
        settings,
        class,
        policy: policy.as_ref(),
        accessible_methods: discover_accessible_methods(class),
        entries: IndexMap::new(),
    };
    discovery.run()
}

struct Discovery<'a> {
    settings: &'a ClassIntrospectorBuilder,
    class: &'a Arc<Class>,
    policy: &'a dyn ClassMemberAccessPolicy,
    accessible_methods: AccessibleMethods,
    entries: IndexMap<Arc<str>, Entry>,
}

impl Discovery<'_> {
    fn run(mut self) -> ClassIntrospectionTable {
        if self.settings.get_expose_fields() {
            self.add_fields();
        }
        let generic_get = self.generic_get();
        let to_string = self.to_string_method();
        let to_string_hidden = self.is_to_string_hidden(to_string.as_ref());
        if self.settings.get_exposure_level() != ExposureLevel::Nothing {
            self.add_properties();
            if self.settings.get_exposure_level() < ExposureLevel::PropertiesOnly {
                self.add_methods();
            }
        }
        let constructors = self.constructors();

        let members = self
            .entries
            .into_iter()
            .map(|(key, entry)| {
                let member = match entry {
                    Entry::Exposed(member) => member,
                    Entry::Overloaded(methods) => ExposedMember::Overloaded(Arc::new(methods)),
                };
                (key, member)
            })
            .collect();
        ClassIntrospectionTable {
            class: Arc::clone(self.class),
            members,
            constructors,
            generic_get,
            to_string,
            to_string_hidden,
        }
    }

    fn is_allowed(&self, method: &MethodInfo) -> bool {
        self.settings.get_exposure_level() == ExposureLevel::All || self.policy.is_method_exposed(method)
    }

    fn add_fields(&mut self) {
        for field in self.class.public_fields() {
            if field.is_static() {
                continue;
            }
            if self.settings.get_exposure_level() == ExposureLevel::All
                || self.policy.is_field_exposed(&field)
            {
                self.entries
                    .insert(Arc::clone(&field.name), Entry::Exposed(ExposedMember::Field(field)));
            }
        }
    }

    fn generic_get(&self) -> Option<Arc<MethodInfo>> {
        [famous_classes::string_class(), famous_classes::object_class()]
            .into_iter()
            .find_map(|parameter| {
                let signature: Signature = ("get".into(), vec![JType::class(parameter)]);
                self.accessible_methods.get(&signature)?.first().cloned()
            })
            .filter(|method| self.is_allowed(method))
    }

    fn to_string_method(&self) -> Option<Arc<MethodInfo>> {
        self.class
            .public_methods()
            .into_iter()
            .find(|m| &*m.name == "toString" && m.parameters.is_empty())
    }

    fn is_to_string_hidden(&self, to_string: Option<&Arc<MethodInfo>>) -> bool {
        if self.settings.get_exposure_level() == ExposureLevel::All
            || self.settings.get_member_access_policy().is_to_string_always_exposed()
        {
            return false;
        }
        to_string.is_some_and(|to_string| !self.policy.is_method_exposed(to_string))
    }

    fn add_properties(&mut self) {
        let mut properties: Vec<PropertyDescriptor> = discover_properties(self.class);
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        for property in properties.into_iter().rev() {
            self.add_property(property);
        }
    }

    fn add_property(&mut self, property: PropertyDescriptor) {
        let Some(read_method) = self.matching_accessible_method(&property.read_method) else {
            if self.class.is_public() {
                warn!(
                    class = self.class.name(),
                    property = &*property.name,
                    "no accessible read method for property"
                );
            }
            return;
        };
        if !self.is_allowed(&read_method) {
            return;
        }
        let name = Arc::clone(&property.name);
        self.entries.insert(
            name,
            Entry::Exposed(ExposedMember::Property(PropertyDescriptor {
                read_method,
                ..property
            })),
        );
    }

    fn add_methods(&mut self) {
        let mut methods = self.class.public_methods();
        methods.sort_by_cached_key(|m| {
            let parameters: Vec<String> = m.parameters.iter().map(JType::java_name).collect();
            (Arc::clone(&m.name), parameters)
        });
        let fine_tuner = self.settings.get_method_appearance_fine_tuner().cloned();

        for method in methods.iter().rev() {
            let Some(method) = self.matching_accessible_method(method) else {
                continue;
            };
            if !self.is_allowed(&method) {
                continue;
            }
            let mut decision = Decision::defaults(&method);
            if let Some(fine_tuner) = &fine_tuner {
                let input = DecisionInput {
                    method: &method,
                    containing_class: self.class,
                };
                fine_tuner.process(&input, &mut decision);
            }

            if let Some(property) = decision.expose_as_property.take() {
                let existing_is_property = matches!(
                    self.entries.get(&property.name),
                    Some(Entry::Exposed(ExposedMember::Property(_)))
                );
                if !existing_is_property || decision.replace_existing_property {
                    self.add_property(property);
                }
            }

            let Some(key) = decision.expose_method_as else {
                continue;
            };
            let previous = match self.entries.get(&key) {
                Some(Entry::Exposed(ExposedMember::Method(previous))) => Some(Arc::clone(previous)),
                _ => None,
            };
            if let Some(previous) = previous {
                let mut overloaded = OverloadedMethods::new();
                overloaded.add_member(CallableMemberDescriptor::Method(previous));
                overloaded.add_member(CallableMemberDescriptor::Method(method));
                self.entries.insert(key, Entry::Overloaded(overloaded));
                continue;
            }
            match self.entries.get_mut(&key) {
                Some(Entry::Overloaded(overloaded)) => {
                    overloaded.add_member(CallableMemberDescriptor::Method(method));
                }
                Some(Entry::Exposed(ExposedMember::Property(_))) if !decision.method_shadows_property => {}
                _ => {
                    self.entries
                        .insert(key, Entry::Exposed(ExposedMember::Method(method)));
                }
            }
        }
    }

    fn constructors(&self) -> Option<ExposedConstructors> {
        let constructors: Vec<_> = self
            .class
            .public_constructors()
            .into_iter()
            .filter(|constructor| {
                self.settings.get_exposure_level() == ExposureLevel::All
                    || self.policy.is_constructor_exposed(constructor)
            })
            .collect();
        match constructors.as_slice() {
            [] => None,
            [single] => Some(ExposedConstructors::Single(CallableMemberDescriptor::Constructor(
                Arc::clone(single),
            ))),
            _ => {
                let mut overloaded = OverloadedMethods::new();
                for constructor in constructors {
                    overloaded.add_member(CallableMemberDescriptor::Constructor(constructor));
                }
                Some(ExposedConstructors::Overloaded(Arc::new(overloaded)))
            }
        }
    }

    /// The method a call through the class actually reaches: `method` itself if it is
    /// accessible, else an accessible declaration with the same signature and the same, or
    /// failing that a covariant, return type.
    fn matching_accessible_method(&self, method: &Arc<MethodInfo>) -> Option<Arc<MethodInfo>> {
        let signature: Signature = (Arc::clone(&method.name), method.parameters.clone());
        let candidates = self.accessible_methods.get(&signature)?;
        candidates
            .iter()
            .find(|candidate| Arc::ptr_eq(candidate, method))
            .or_else(|| {
                candidates
                    .iter()
                    .find(|candidate| candidate.return_type == method.return_type)
            })
            .or_else(|| {
                candidates.iter().find(|candidate| {
                    match (&candidate.return_type, &method.return_type) {
                        (Some(declared), Some(actual)) => {
                            inheritance::is_assignable_from(declared, actual)
                        }
                        _ => false,
                    }
                })
            })
            .cloned()
    }
}

fn discover_accessible_methods(class: &Arc<Class>) -> AccessibleMethods {
    let mut accessible_methods = HashMap::new();
    collect_accessible_methods(class, &mut accessible_methods);
    accessible_methods
}

fn collect_accessible_methods(class: &Arc<Class>, accessible_methods: &mut AccessibleMethods) {
    if class.is_public() {
        for method in class.public_methods() {
            let signature = (Arc::clone(&method.name), method.parameters.clone());
            accessible_methods.entry(signature).or_default().push(method);
        }
        return;
    }
    // a non-public class is only reachable through its public supertypes
    for interface in class.interfaces() {
        collect_accessible_methods(interface, accessible_methods);
    }
    if let Some(super_class) = class.super_class() {
        collect_accessible_methods(super_class, accessible_methods);
    }
}

/// JavaBeans read-only properties: `getX()` and, for `boolean`, `isX()`. Interface default
/// methods count too, but a reader declared in the class chain wins.
fn discover_properties(class: &Arc<Class>) -> Vec<PropertyDescriptor> {
    let mut readers: IndexMap<String, (Arc<MethodInfo>, bool)> = IndexMap::new();
    for method in class.public_methods() {
        if method.is_static() || !method.parameters.is_empty() {
            continue;
        }
        let Some(return_type) = &method.return_type else {
            continue;
        };
        let is_boolean = matches!(return_type, JType::Primitive(PrimitiveType::Boolean));
        let (base, is_reader) = match method.name.strip_prefix("get") {
            Some(base) if !base.is_empty() => (base, false),
            _ => match method.name.strip_prefix("is") {
                Some(base) if !base.is_empty() && is_boolean => (base, true),
                _ => continue,
            },
        };
        let name = decapitalize(base);
        // class chain methods come first, so the first reader wins, except that isX beats getX
        match readers.get(&name) {
            Some((_, false)) if is_reader => {
                readers.insert(name, (method, is_reader));
            }
            Some(_) => {}
            None => {
                readers.insert(name, (method, is_reader));
            }
        }
    }
    readers
        .into_iter()
        .map(|(name, (read_method, _))| PropertyDescriptor::new(name, read_method))
        .collect()
}

/// `FooBar` becomes `fooBar`, `URL` stays `URL`.
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => {
            name.to_string()
        }
        (Some(first), _) => first.to_lowercase().chain(name[first.len_utf8()..].chars()).collect(),
        (None, _) => String::new(),
    }
}
