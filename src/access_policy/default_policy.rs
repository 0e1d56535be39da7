use std::sync::{Arc, LazyLock};

use tracing::debug;

use crate::{
    access_policy::{
        ClassMemberAccessPolicy, MemberAccessPolicy, MemberSelector,
        MemberSelectorListMemberAccessPolicy, SelectedMember, is_ignored_line,
    },
    error::{Error, Result},
    runtime::{Class, ClassRegistry, famous_classes, inheritance},
};

const DEFAULT_RULES: &str = include_str!("default_rules.txt");

static INSTANCE: LazyLock<Arc<DefaultMemberAccessPolicy>> = LazyLock::new(|| {
    Arc::new(
        DefaultMemberAccessPolicy::from_rules(DEFAULT_RULES, famous_classes::registry())
            .expect("built-in member access rules must be valid"),
    )
});

/// The member access policy used unless another is configured. Hides members that would let a
/// template reach class loading, threads and other host internals.
#[derive(Debug)]
pub struct DefaultMemberAccessPolicy {
    whitelist_rule_final_classes: Vec<Arc<Class>>,
    whitelist_rule_non_final_classes: Vec<Arc<Class>>,
    whitelist: MemberSelectorListMemberAccessPolicy,
    blacklist: MemberSelectorListMemberAccessPolicy,
    to_string_always_exposed: bool,
}

impl DefaultMemberAccessPolicy {
    pub fn instance() -> Arc<DefaultMemberAccessPolicy> {
        Arc::clone(&INSTANCE)
    }

    /// Builds the policy from rule text in the format of the built-in rules.
    pub fn from_rules(rules: &str, registry: &ClassRegistry) -> Result<Self> {
        let mut whitelist_rule_final_classes: Vec<Arc<Class>> = vec![];
        let mut whitelist_rule_non_final_classes: Vec<Arc<Class>> = vec![];
        let mut blacklist_unlisted_rule_classes: Vec<Arc<Class>> = vec![];
        let mut whitelist_selectors = vec![];

        for line in rules.lines().map(str::trim) {
            if is_ignored_line(line) {
                continue;
            }
            if let Some(rule_line) = line.strip_prefix('@') {
                let parts: Vec<&str> = rule_line.split_whitespace().collect();
                let &[rule, type_name] = parts.as_slice() else {
                    return Err(malformed_rule(line, "expected a rule and a type name"));
                };
                let Ok(upper_bound_type) = registry.resolve(type_name) else {
                    debug!(type_name, "skipping rule for unknown type");
                    continue;
                };
                match rule {
                    "whitelistPolicyIfAssignable" => {
                        if upper_bound_type.is_final() {
                            whitelist_rule_final_classes.push(upper_bound_type);
                        } else {
                            whitelist_rule_non_final_classes.push(upper_bound_type);
                        }
                    }
                    "blacklistUnlistedMembers" => {
                        blacklist_unlisted_rule_classes.push(upper_bound_type)
                    }
                    _ => return Err(malformed_rule(line, "unhandled rule")),
                }
                continue;
            }

            let selector = match MemberSelector::parse(line, registry) {
                Ok(selector) => selector,
                Err(Error::ClassNotFound(_) | Error::NoSuchMember(_)) => continue,
                Err(e) => return Err(e),
            };
            let has_rule = whitelist_rule_final_classes
                .iter()
                .chain(&whitelist_rule_non_final_classes)
                .chain(&blacklist_unlisted_rule_classes)
                .any(|c| Arc::ptr_eq(c, &selector.upper_bound_type));
            if !has_rule {
                return Err(malformed_rule(line, "type without rule"));
            }
            // blacklisting unlisted members is also expressed with a whitelist
            whitelist_selectors.push(selector);
        }

        let whitelist = MemberSelectorListMemberAccessPolicy::whitelist(whitelist_selectors);

        let mut blacklist_selectors = vec![];
        for class in &blacklist_unlisted_rule_classes {
            let class_policy = whitelist.for_class(class);
            let selector = |member| MemberSelector {
                upper_bound_type: Arc::clone(class),
                member,
            };
            for method in class.public_methods() {
                if !class_policy.is_method_exposed(&method) {
                    blacklist_selectors.push(selector(SelectedMember::Method {
                        name: Arc::clone(&method.name),
                        parameters: method.parameters.clone(),
                    }));
                }
            }
            for constructor in class.public_constructors() {
                if !class_policy.is_constructor_exposed(&constructor) {
                    blacklist_selectors.push(selector(SelectedMember::Constructor {
                        parameters: constructor.parameters.clone(),
                    }));
                }
            }
            for field in class.public_fields() {
                if !class_policy.is_field_exposed(&field) {
                    blacklist_selectors.push(selector(SelectedMember::Field {
                        name: Arc::clone(&field.name),
                    }));
                }
            }
        }
        let blacklist = MemberSelectorListMemberAccessPolicy::blacklist(blacklist_selectors);

        let to_string_always_exposed =
            whitelist.is_to_string_always_exposed() && blacklist.is_to_string_always_exposed();
        Ok(DefaultMemberAccessPolicy {
            whitelist_rule_final_classes,
            whitelist_rule_non_final_classes,
            whitelist,
            blacklist,
            to_string_always_exposed,
        })
    }

    fn is_type_with_whitelist_rule(&self, class: &Arc<Class>) -> bool {
        self.whitelist_rule_final_classes
            .iter()
            .any(|c| Arc::ptr_eq(c, class))
            || self
                .whitelist_rule_non_final_classes
                .iter()
                .any(|c| inheritance::is_class_assignable_from(c, class))
    }
}

fn malformed_rule(line: &str, reason: &str) -> Error {
    Error::MalformedMemberSelector {
        selector: line.to_string(),
        reason: reason.to_string(),
    }
}

impl MemberAccessPolicy for DefaultMemberAccessPolicy {
    fn for_class<'a>(&'a self, class: &Arc<Class>) -> Box<dyn ClassMemberAccessPolicy + 'a> {
        if self.is_type_with_whitelist_rule(class) {
            self.whitelist.for_class(class)
        } else {
            self.blacklist.for_class(class)
        }
    }

    fn is_to_string_always_exposed(&self) -> bool {
        self.to_string_always_exposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ClassBuilder, HostValue, MethodInfo};

    fn method(class: &Class, name: &str) -> Arc<MethodInfo> {
        class
            .public_methods()
            .into_iter()
            .find(|m| m.name() == name)
            .unwrap()
    }

    #[test]
    fn hides_unlisted_object_members_everywhere() {
        let policy = DefaultMemberAccessPolicy::instance();
        let registry = ClassRegistry::new();
        let bean = registry
            .define(ClassBuilder::new("com.example.Bean").method("getName", "()Ljava/lang/String;", |_, _| {
                Ok(HostValue::string("bean"))
            }))
            .unwrap();
        let class_policy = policy.for_class(&bean);
        assert!(class_policy.is_method_exposed(&method(&bean, "getName")));
        assert!(class_policy.is_method_exposed(&method(&bean, "toString")));
        assert!(class_policy.is_method_exposed(&method(&bean, "getClass")));
        assert!(!class_policy.is_method_exposed(&method(&bean, "wait")));
        assert!(!class_policy.is_method_exposed(&method(&bean, "notify")));
        assert!(policy.is_to_string_always_exposed());
    }

    #[test]
    fn whitelisted_types_expose_only_listed_members() {
        let policy = DefaultMemberAccessPolicy::instance();
        let registry = ClassRegistry::new();
        let loader = registry
            .define(ClassBuilder::new("com.example.MyLoader").extends("java.lang.ClassLoader"))
            .unwrap();
        let class_policy = policy.for_class(&loader);
        assert!(!class_policy.is_method_exposed(&method(&loader, "loadClass")));
        assert!(class_policy.is_method_exposed(&method(&loader, "hashCode")));

        let class_class = famous_classes::class_class();
        let class_policy = policy.for_class(class_class);
        assert!(class_policy.is_method_exposed(&method(class_class, "getName")));
        assert!(!class_policy.is_method_exposed(&method(class_class, "getClassLoader")));
    }

    #[test]
    fn rejects_selectors_without_rule() {
        let registry = ClassRegistry::new();
        let result = DefaultMemberAccessPolicy::from_rules("java.lang.String.length()", &registry);
        assert!(matches!(result, Err(Error::MalformedMemberSelector { .. })));
        let result = DefaultMemberAccessPolicy::from_rules("@frobnicate java.lang.String", &registry);
        assert!(matches!(result, Err(Error::MalformedMemberSelector { .. })));
    }
}
