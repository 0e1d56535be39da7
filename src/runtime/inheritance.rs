use std::sync::Arc;

use crate::runtime::{Class, HostValue, JType, famous_classes};

/// Whether a value of type `source` can be assigned to a variable of type `target`, without
/// boxing or primitive widening.
pub fn is_assignable_from(target: &JType, source: &JType) -> bool {
    match (target, source) {
        (JType::Primitive(target), JType::Primitive(source)) => target == source,
        (JType::Class(target), JType::Class(source)) => is_class_assignable_from(target, source),
        (JType::Array(target), JType::Array(source)) => {
            if target.is_primitive() || source.is_primitive() {
                return target == source;
            }
            is_assignable_from(target, source)
        }
        (JType::Class(target), JType::Array(_)) => is_array_supertype(target),
        _ => false,
    }
}

/// `target.isInstance(value)`: null is an instance of nothing, primitive targets accept their
/// boxes.
pub fn is_instance(target: &JType, value: &HostValue) -> bool {
    value
        .runtime_type()
        .is_some_and(|source| is_assignable_from(&target.boxed(), &source))
}

fn is_array_supertype(class: &Arc<Class>) -> bool {
    Arc::ptr_eq(class, famous_classes::object_class())
        || Arc::ptr_eq(class, famous_classes::cloneable_class())
        || Arc::ptr_eq(class, famous_classes::serializable_class())
}

pub fn is_class_assignable_from(target: &Arc<Class>, source: &Arc<Class>) -> bool {
    if target.is_interface() {
        Arc::ptr_eq(target, source) || is_class_implements(source, target)
    } else {
        is_same_or_sub_class_of(source, target)
    }
}

pub(crate) fn is_class_implements(class: &Class, interface: &Arc<Class>) -> bool {
    for class_intf in &class.interfaces {
        if Arc::ptr_eq(class_intf, interface) || is_class_implements(class_intf, interface) {
            return true;
        }
    }
    if let Some(super_class) = &class.super_class {
        return is_class_implements(super_class, interface);
    }
    false
}

pub(crate) fn is_same_or_sub_class_of(source: &Arc<Class>, target: &Arc<Class>) -> bool {
    if Arc::ptr_eq(source, target) {
        return true;
    }
    if let Some(super_class) = &source.super_class {
        return is_same_or_sub_class_of(super_class, target);
    }
    // interfaces have Object as their implicit super class
    source.is_interface() && Arc::ptr_eq(target, famous_classes::object_class())
}

/// Every type `t` is assignable to, including `t` itself and `Object`.
pub(crate) fn supertypes(t: &JType) -> Vec<JType> {
    let object = JType::class(famous_classes::object_class());
    let mut result = vec![t.clone()];
    match t {
        JType::Primitive(_) => return result,
        JType::Class(class) => {
            let mut super_class = class.super_class.as_ref();
            while let Some(current) = super_class {
                result.push(JType::class(current));
                super_class = current.super_class.as_ref();
            }
            for interface in class.all_interfaces() {
                result.push(JType::class(interface));
            }
        }
        JType::Array(component) => {
            if !component.is_primitive() {
                for component_super in supertypes(component).into_iter().skip(1) {
                    result.push(JType::array_of(component_super));
                }
            }
            result.push(JType::class(famous_classes::cloneable_class()));
            result.push(JType::class(famous_classes::serializable_class()));
        }
    }
    if !result.contains(&object) {
        result.push(object);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ClassBuilder, ClassRegistry, PrimitiveType};

    fn class(name: &str) -> JType {
        JType::class(&famous_classes::resolve(name).unwrap())
    }

    #[test]
    fn classes_and_interfaces() {
        assert!(is_assignable_from(&class("java.lang.Number"), &class("java.lang.Integer")));
        assert!(is_assignable_from(&class("java.lang.Comparable"), &class("java.lang.Integer")));
        assert!(is_assignable_from(&class("java.util.Collection"), &class("java.util.ArrayList")));
        assert!(is_assignable_from(&class("java.lang.Object"), &class("java.util.List")));
        assert!(!is_assignable_from(&class("java.lang.Integer"), &class("java.lang.Number")));
        assert!(!is_assignable_from(&class("java.util.List"), &class("java.util.HashSet")));
    }

    #[test]
    fn primitives_are_only_assignable_to_themselves() {
        let int = JType::Primitive(PrimitiveType::Int);
        assert!(is_assignable_from(&int, &int));
        assert!(!is_assignable_from(&int, &class("java.lang.Integer")));
        assert!(!is_assignable_from(&class("java.lang.Integer"), &int));
    }

    #[test]
    fn arrays_are_covariant_for_references_only() {
        let strings = JType::array_of(class("java.lang.String"));
        let objects = JType::array_of(class("java.lang.Object"));
        let ints = JType::array_of(JType::Primitive(PrimitiveType::Int));
        let longs = JType::array_of(JType::Primitive(PrimitiveType::Long));
        assert!(is_assignable_from(&objects, &strings));
        assert!(!is_assignable_from(&strings, &objects));
        assert!(!is_assignable_from(&longs, &ints));
        assert!(!is_assignable_from(&objects, &ints));
        assert!(is_assignable_from(&class("java.lang.Object"), &ints));
        assert!(is_assignable_from(&class("java.lang.Cloneable"), &strings));
        assert!(!is_assignable_from(&class("java.lang.Number"), &strings));
    }

    #[test]
    fn reloaded_class_is_a_different_type() {
        let registry = ClassRegistry::new();
        let first = registry.define(ClassBuilder::new("com.example.A")).unwrap();
        let second = registry.define(ClassBuilder::new("com.example.A")).unwrap();
        assert!(!is_class_assignable_from(&first, &second));
    }

    #[test]
    fn supertypes_of_integer() {
        let names: Vec<String> = supertypes(&class("java.lang.Integer"))
            .iter()
            .map(JType::java_name)
            .collect();
        for expected in [
            "java.lang.Integer",
            "java.lang.Number",
            "java.lang.Object",
            "java.lang.Comparable",
            "java.io.Serializable",
        ] {
            assert!(names.iter().any(|n| n == expected), "{expected} in {names:?}");
        }
    }
}
