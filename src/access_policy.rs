mod default_policy;
mod member_selector;

use std::{collections::HashMap, fmt, hash::Hash, sync::Arc};

pub use default_policy::DefaultMemberAccessPolicy;
pub use member_selector::{MemberSelector, is_ignored_line};
pub(crate) use member_selector::SelectedMember;

use crate::runtime::{
    Class, ConstructorInfo, FieldInfo, JType, MethodInfo, famous_classes, inheritance,
};

/// Decides which members of a class may be exposed to templates.
pub trait MemberAccessPolicy: Send + Sync {
    fn for_class<'a>(&'a self, class: &Arc<Class>) -> Box<dyn ClassMemberAccessPolicy + 'a>;

    /// Whether `Object.toString()` is exposed for every class. If not, the introspector asks
    /// the per-class policy and hides `toString` where it isn't exposed.
    fn is_to_string_always_exposed(&self) -> bool;
}

/// The policy of one class.
pub trait ClassMemberAccessPolicy {
    fn is_method_exposed(&self, method: &MethodInfo) -> bool;

    fn is_constructor_exposed(&self, constructor: &ConstructorInfo) -> bool;

    fn is_field_exposed(&self, field: &FieldInfo) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllMemberAccessPolicy;

impl MemberAccessPolicy for AllowAllMemberAccessPolicy {
    fn for_class<'a>(&'a self, _: &Arc<Class>) -> Box<dyn ClassMemberAccessPolicy + 'a> {
        Box::new(AllowAllMemberAccessPolicy)
    }

    fn is_to_string_always_exposed(&self) -> bool {
        true
    }
}

impl ClassMemberAccessPolicy for AllowAllMemberAccessPolicy {
    fn is_method_exposed(&self, _: &MethodInfo) -> bool {
        true
    }

    fn is_constructor_exposed(&self, _: &ConstructorInfo) -> bool {
        true
    }

    fn is_field_exposed(&self, _: &FieldInfo) -> bool {
        true
    }
}

/// Maps a member signature to the upper bound types it was selected in.
struct MemberMatcher<K> {
    upper_bound_types: HashMap<K, Vec<Arc<Class>>>,
}

impl<K: Eq + Hash> MemberMatcher<K> {
    fn new() -> Self {
        MemberMatcher {
            upper_bound_types: HashMap::new(),
        }
    }

    fn add_matching(&mut self, upper_bound_type: &Arc<Class>, key: K) {
        let types = self.upper_bound_types.entry(key).or_default();
        if !types.iter().any(|t| Arc::ptr_eq(t, upper_bound_type)) {
            types.push(Arc::clone(upper_bound_type));
        }
    }

    fn matches(&self, context_class: &Arc<Class>, key: &K) -> bool {
        self.upper_bound_types.get(key).is_some_and(|types| {
            types
                .iter()
                .any(|t| inheritance::is_class_assignable_from(t, context_class))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListType {
    Whitelist,
    Blacklist,
}

/// Member access policy driven by a list of [`MemberSelector`]s.
pub struct MemberSelectorListMemberAccessPolicy {
    list_type: ListType,
    methods: MemberMatcher<(Arc<str>, Vec<JType>)>,
    constructors: MemberMatcher<Vec<JType>>,
    fields: MemberMatcher<Arc<str>>,
}

impl MemberSelectorListMemberAccessPolicy {
    /// Exposes only the selected members.
    pub fn whitelist(selectors: impl IntoIterator<Item = MemberSelector>) -> Self {
        Self::new(selectors, ListType::Whitelist)
    }

    /// Exposes everything but the selected members.
    pub fn blacklist(selectors: impl IntoIterator<Item = MemberSelector>) -> Self {
        Self::new(selectors, ListType::Blacklist)
    }

    fn new(selectors: impl IntoIterator<Item = MemberSelector>, list_type: ListType) -> Self {
        let mut policy = MemberSelectorListMemberAccessPolicy {
            list_type,
            methods: MemberMatcher::new(),
            constructors: MemberMatcher::new(),
            fields: MemberMatcher::new(),
        };
        for selector in selectors {
            let upper_bound_type = &selector.upper_bound_type;
            match selector.member {
                SelectedMember::Method { name, parameters } => policy
                    .methods
                    .add_matching(upper_bound_type, (name, parameters)),
                SelectedMember::Constructor { parameters } => {
                    policy.constructors.add_matching(upper_bound_type, parameters)
                }
                SelectedMember::Field { name } => policy.fields.add_matching(upper_bound_type, name),
            }
        }
        policy
    }

    pub fn is_whitelist(&self) -> bool {
        self.list_type == ListType::Whitelist
    }

    fn to_exposed(&self, matches: bool) -> bool {
        match self.list_type {
            ListType::Whitelist => matches,
            ListType::Blacklist => !matches,
        }
    }
}

impl fmt::Debug for MemberSelectorListMemberAccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberSelectorListMemberAccessPolicy")
            .field("list_type", &self.list_type)
            .field("methods", &self.methods.upper_bound_types.len())
            .field("constructors", &self.constructors.upper_bound_types.len())
            .field("fields", &self.fields.upper_bound_types.len())
            .finish()
    }
}

struct SelectorListClassPolicy<'a> {
    policy: &'a MemberSelectorListMemberAccessPolicy,
    context_class: Arc<Class>,
}

impl ClassMemberAccessPolicy for SelectorListClassPolicy<'_> {
    fn is_method_exposed(&self, method: &MethodInfo) -> bool {
        let key = (Arc::clone(&method.name), method.parameters.clone());
        self.policy
            .to_exposed(self.policy.methods.matches(&self.context_class, &key))
    }

    fn is_constructor_exposed(&self, constructor: &ConstructorInfo) -> bool {
        self.policy.to_exposed(
            self.policy
                .constructors
                .matches(&self.context_class, &constructor.parameters),
        )
    }

    fn is_field_exposed(&self, field: &FieldInfo) -> bool {
        self.policy
            .to_exposed(self.policy.fields.matches(&self.context_class, &field.name))
    }
}

impl MemberAccessPolicy for MemberSelectorListMemberAccessPolicy {
    fn for_class<'a>(&'a self, class: &Arc<Class>) -> Box<dyn ClassMemberAccessPolicy + 'a> {
        Box::new(SelectorListClassPolicy {
            policy: self,
            context_class: Arc::clone(class),
        })
    }

    fn is_to_string_always_exposed(&self) -> bool {
        let object = famous_classes::object_class();
        let key: (Arc<str>, Vec<JType>) = ("toString".into(), vec![]);
        self.to_exposed(self.methods.matches(object, &key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ClassBuilder, ClassRegistry, HostValue};

    fn define(registry: &ClassRegistry) -> (Arc<Class>, Arc<Class>) {
        let base = registry
            .define(
                ClassBuilder::new("com.example.Base")
                    .method("m", "()V", |_, _| Ok(HostValue::Null))
                    .method("m", "(I)V", |_, _| Ok(HostValue::Null))
                    .field("f", "I", |_| Ok(HostValue::int(0))),
            )
            .unwrap();
        let derived = registry
            .define(ClassBuilder::new("com.example.Derived").extends("com.example.Base"))
            .unwrap();
        (base, derived)
    }

    fn method<'a>(class: &'a Class, name: &str, arity: usize) -> &'a MethodInfo {
        class
            .declared_methods()
            .iter()
            .find(|m| m.name() == name && m.parameters().len() == arity)
            .unwrap()
    }

    #[test]
    fn whitelist_applies_to_subclasses_of_the_upper_bound() {
        let registry = ClassRegistry::new();
        let (base, derived) = define(&registry);
        let policy = MemberSelectorListMemberAccessPolicy::whitelist([
            MemberSelector::parse("com.example.Base.m()", &registry).unwrap(),
        ]);
        for class in [&base, &derived] {
            let class_policy = policy.for_class(class);
            assert!(class_policy.is_method_exposed(method(&base, "m", 0)));
            assert!(!class_policy.is_method_exposed(method(&base, "m", 1)));
            assert!(!class_policy.is_field_exposed(&base.declared_fields()[0]));
        }
        let object_policy = policy.for_class(famous_classes::object_class());
        assert!(!object_policy.is_method_exposed(method(&base, "m", 0)));
        assert!(!policy.is_to_string_always_exposed());
    }

    #[test]
    fn blacklist_hides_only_selected_members() {
        let registry = ClassRegistry::new();
        let (base, derived) = define(&registry);
        let policy = MemberSelectorListMemberAccessPolicy::blacklist([
            MemberSelector::parse("com.example.Base.f", &registry).unwrap(),
        ]);
        let class_policy = policy.for_class(&derived);
        assert!(class_policy.is_method_exposed(method(&base, "m", 1)));
        assert!(!class_policy.is_field_exposed(&base.declared_fields()[0]));
        assert!(policy.is_to_string_always_exposed());
    }
}
