use std::sync::{Arc, LazyLock};

use paste::paste;

use crate::{
    consts::ClassAccessFlag,
    error::{HostError, HostResult, Result},
    runtime::{
        Class, ClassBuilder, ClassRegistry, EnumConstant, HostValue, ListAccess, MapAccess,
        Number,
    },
};

macro_rules! famous_classes {
    ($($field:ident => $name:literal,)*) => {
        paste! {
            struct FamousClasses {
                registry: ClassRegistry,
                $($field: Arc<Class>,)*
            }

            impl FamousClasses {
                fn collect(registry: ClassRegistry) -> FamousClasses {
                    FamousClasses {
                        $($field: registry.get($name).expect("bootstrap class must be defined"),)*
                        registry,
                    }
                }
            }

            #[cfg(test)]
            const FAMOUS_CLASS_NAMES: &[&str] = &[$($name,)*];

            $(
                #[doc = concat!("`", $name, "`")]
                pub fn [<$field _class>]() -> &'static Arc<Class> {
                    &FAMOUS_CLASSES.$field
                }
            )*
        }
    };
}

famous_classes! {
    object => "java.lang.Object",
    serializable => "java.io.Serializable",
    cloneable => "java.lang.Cloneable",
    comparable => "java.lang.Comparable",
    char_sequence => "java.lang.CharSequence",
    string => "java.lang.String",
    number => "java.lang.Number",
    boolean => "java.lang.Boolean",
    character => "java.lang.Character",
    byte => "java.lang.Byte",
    short => "java.lang.Short",
    integer => "java.lang.Integer",
    long => "java.lang.Long",
    float => "java.lang.Float",
    double => "java.lang.Double",
    big_integer => "java.math.BigInteger",
    big_decimal => "java.math.BigDecimal",
    date => "java.util.Date",
    iterable => "java.lang.Iterable",
    collection => "java.util.Collection",
    list => "java.util.List",
    set => "java.util.Set",
    map => "java.util.Map",
    abstract_collection => "java.util.AbstractCollection",
    array_list => "java.util.ArrayList",
    hash_set => "java.util.HashSet",
    hash_map => "java.util.HashMap",
    iterator => "java.util.Iterator",
    enumeration => "java.util.Enumeration",
    resource_bundle => "java.util.ResourceBundle",
    enum_base => "java.lang.Enum",
    class => "java.lang.Class",
    class_loader => "java.lang.ClassLoader",
    thread => "java.lang.Thread",
}

static FAMOUS_CLASSES: LazyLock<FamousClasses> = LazyLock::new(|| {
    let registry = ClassRegistry::bare();
    bootstrap(&registry).expect("bootstrap classes must be valid");
    FamousClasses::collect(registry)
});

/// The registry the well-known classes were bootstrapped in.
pub(crate) fn registry() -> &'static ClassRegistry {
    &FAMOUS_CLASSES.registry
}

/// Looks up a well-known class by its name.
pub fn resolve(name: &str) -> Result<Arc<Class>> {
    registry().resolve(name)
}

fn bootstrap(registry: &ClassRegistry) -> Result<()> {
    // Object's members mention String, so it is declared first and completed last
    let object = registry.declare(&ClassBuilder::new("java.lang.Object"))?;
    registry.insert(&object);

    for interface in [
        "java.io.Serializable",
        "java.lang.Cloneable",
        "java.lang.Iterable",
        "java.util.Iterator",
        "java.util.Enumeration",
    ] {
        registry.define(ClassBuilder::interface(interface))?;
    }

    let final_class = ClassAccessFlag::PUBLIC | ClassAccessFlag::FINAL;
    let abstract_class = ClassAccessFlag::PUBLIC | ClassAccessFlag::ABSTRACT;

    // Class and ClassLoader refer to each other
    let class_declaration = class_class_builder(final_class);
    let class = registry.declare(&class_declaration)?;
    registry.insert(&class);

    registry.define(
        ClassBuilder::interface("java.lang.Comparable")
            .abstract_method("compareTo", "(Ljava/lang/Object;)I"),
    )?;
    registry.define(
        ClassBuilder::interface("java.lang.CharSequence").abstract_method("length", "()I"),
    )?;

    registry.define(
        ClassBuilder::new("java.lang.String")
            .access_flags(final_class)
            .implements("java.io.Serializable")
            .implements("java.lang.Comparable")
            .implements("java.lang.CharSequence")
            .method("length", "()I", |this, _| {
                Ok(HostValue::int(string(this)?.chars().count() as i32))
            })
            .method("isEmpty", "()Z", |this, _| {
                Ok(HostValue::Boolean(string(this)?.is_empty()))
            })
            .method("toUpperCase", "()Ljava/lang/String;", |this, _| {
                Ok(HostValue::string(string(this)?.to_uppercase()))
            })
            .method("compareTo", "(Ljava/lang/Object;)I", |this, args| {
                let other = args.first().and_then(HostValue::as_str).ok_or_else(|| {
                    HostError::new("java.lang.ClassCastException", "not a string")
                })?;
                Ok(HostValue::int(string(this)?.cmp(other) as i32))
            }),
    )?;

    registry.define(
        ClassBuilder::new("java.lang.Number")
            .access_flags(abstract_class)
            .implements("java.io.Serializable")
            .method("intValue", "()I", |this, _| {
                Ok(HostValue::int(number(this)?.int_value()))
            })
            .method("longValue", "()J", |this, _| {
                Ok(HostValue::Number(Number::Long(number(this)?.long_value())))
            })
            .method("doubleValue", "()D", |this, _| {
                Ok(HostValue::Number(Number::Double(number(this)?.double_value())))
            }),
    )?;
    registry.define(
        ClassBuilder::new("java.lang.Boolean")
            .access_flags(final_class)
            .implements("java.io.Serializable")
            .implements("java.lang.Comparable")
            .method("booleanValue", "()Z", |this, _| match this {
                HostValue::Boolean(b) => Ok(HostValue::Boolean(*b)),
                other => Err(unexpected_receiver("java.lang.Boolean", other)),
            }),
    )?;
    registry.define(
        ClassBuilder::new("java.lang.Character")
            .access_flags(final_class)
            .implements("java.io.Serializable")
            .implements("java.lang.Comparable"),
    )?;
    for boxed in [
        "java.lang.Byte",
        "java.lang.Short",
        "java.lang.Integer",
        "java.lang.Long",
        "java.lang.Float",
        "java.lang.Double",
    ] {
        registry.define(
            ClassBuilder::new(boxed)
                .access_flags(final_class)
                .extends("java.lang.Number")
                .implements("java.lang.Comparable"),
        )?;
    }
    for big in ["java.math.BigInteger", "java.math.BigDecimal"] {
        registry.define(
            ClassBuilder::new(big)
                .extends("java.lang.Number")
                .implements("java.lang.Comparable"),
        )?;
    }

    registry.define(
        ClassBuilder::new("java.util.Date")
            .implements("java.io.Serializable")
            .implements("java.lang.Cloneable")
            .implements("java.lang.Comparable")
            .method("getTime", "()J", |this, _| match this {
                HostValue::Date(date) => Ok(HostValue::Number(Number::Long(date.timestamp_millis()))),
                other => Err(unexpected_receiver("java.util.Date", other)),
            }),
    )?;

    registry.define(
        ClassBuilder::interface("java.util.Collection")
            .implements("java.lang.Iterable")
            .abstract_method("size", "()I")
            .abstract_method("isEmpty", "()Z"),
    )?;
    registry.define(
        ClassBuilder::interface("java.util.List")
            .implements("java.util.Collection")
            .abstract_method("get", "(I)Ljava/lang/Object;"),
    )?;
    registry.define(ClassBuilder::interface("java.util.Set").implements("java.util.Collection"))?;
    registry.define(
        ClassBuilder::new("java.util.AbstractCollection")
            .access_flags(abstract_class)
            .implements("java.util.Collection"),
    )?;
    registry.define(
        ClassBuilder::interface("java.util.Map")
            .abstract_method("size", "()I")
            .abstract_method("isEmpty", "()Z")
            .abstract_method("get", "(Ljava/lang/Object;)Ljava/lang/Object;"),
    )?;
    registry.define(
        ClassBuilder::new("java.util.ArrayList")
            .implements("java.util.List")
            .implements("java.lang.Cloneable")
            .implements("java.io.Serializable")
            .method("size", "()I", |this, _| Ok(HostValue::int(list(this)?.size() as i32)))
            .method("isEmpty", "()Z", |this, _| {
                Ok(HostValue::Boolean(list(this)?.size() == 0))
            })
            .method("get", "(I)Ljava/lang/Object;", |this, args| {
                let index = args.first().and_then(HostValue::as_number).ok_or_else(|| {
                    HostError::illegal_argument("index must be a number")
                })?;
                list(this)?.get(index.int_value().max(0) as usize)
            }),
    )?;
    registry.define(
        ClassBuilder::new("java.util.HashSet")
            .implements("java.util.Set")
            .implements("java.lang.Cloneable")
            .implements("java.io.Serializable")
            .method("size", "()I", |this, _| match this {
                HostValue::Set(set) => Ok(HostValue::int(set.size() as i32)),
                other => Err(unexpected_receiver("java.util.HashSet", other)),
            }),
    )?;
    registry.define(
        ClassBuilder::new("java.util.HashMap")
            .implements("java.util.Map")
            .implements("java.lang.Cloneable")
            .implements("java.io.Serializable")
            .method("size", "()I", |this, _| Ok(HostValue::int(map(this)?.size() as i32)))
            .method("isEmpty", "()Z", |this, _| {
                Ok(HostValue::Boolean(map(this)?.size() == 0))
            })
            .method("get", "(Ljava/lang/Object;)Ljava/lang/Object;", |this, args| {
                let key = args.first().map(HostValue::to_display_string).unwrap_or_default();
                Ok(map(this)?.get(&key)?.unwrap_or(HostValue::Null))
            }),
    )?;

    registry.define(
        ClassBuilder::new("java.util.ResourceBundle")
            .access_flags(abstract_class)
            .method(
                "getString",
                "(Ljava/lang/String;)Ljava/lang/String;",
                |this, args| match (this, args.first()) {
                    (HostValue::ResourceBundle(bundle), Some(HostValue::String(key))) => {
                        Ok(HostValue::String(bundle.get_string(key)?))
                    }
                    (other, _) => Err(unexpected_receiver("java.util.ResourceBundle", other)),
                },
            ),
    )?;
    registry.define(
        ClassBuilder::new("java.lang.Enum")
            .access_flags(abstract_class)
            .implements("java.lang.Comparable")
            .implements("java.io.Serializable")
            .method("name", "()Ljava/lang/String;", |this, _| {
                Ok(HostValue::String(Arc::clone(&enum_constant(this)?.name)))
            })
            .method("ordinal", "()I", |this, _| {
                Ok(HostValue::int(enum_constant(this)?.ordinal))
            }),
    )?;
    registry.define(
        ClassBuilder::new("java.lang.ClassLoader")
            .access_flags(abstract_class)
            .method("loadClass", "(Ljava/lang/String;)Ljava/lang/Class;", |_, args| {
                Err(HostError::new(
                    "java.lang.ClassNotFoundException",
                    args.first().map(HostValue::to_display_string).unwrap_or_default(),
                ))
            }),
    )?;
    registry.complete(
        &class,
        class_declaration
            .method("getName", "()Ljava/lang/String;", |this, _| {
                Ok(HostValue::string(class_of(this)?.name()))
            })
            .method("getSimpleName", "()Ljava/lang/String;", |this, _| {
                Ok(HostValue::string(class_of(this)?.simple_name()))
            })
            .method("getClassLoader", "()Ljava/lang/ClassLoader;", |_, _| {
                Ok(HostValue::Null)
            }),
    )?;
    registry.define(
        ClassBuilder::new("java.lang.Thread")
            .method("getName", "()Ljava/lang/String;", |this, _| {
                payload::<Arc<str>>(this, "java.lang.Thread").map(|name| HostValue::String(Arc::clone(name)))
            })
            .method("interrupt", "()V", |_, _| Ok(HostValue::Null)),
    )?;

    registry.complete(
        &object,
        ClassBuilder::new("java.lang.Object")
            .constructor("()", |class, _| {
                Ok(HostValue::Object(crate::runtime::HostObject::new(class, ())))
            })
            .method("toString", "()Ljava/lang/String;", |this, _| {
                Ok(HostValue::string(this.to_display_string()))
            })
            .method("hashCode", "()I", |this, _| Ok(HostValue::int(hash_code(this))))
            .method("getClass", "()Ljava/lang/Class;", |this, _| {
                let class = this
                    .runtime_class()
                    .ok_or_else(|| HostError::new("java.lang.NullPointerException", "getClass"))?;
                Ok(HostValue::Object(crate::runtime::HostObject::new(class_class(), class)))
            })
            .method("wait", "()V", |_, _| Ok(HostValue::Null))
            .method("notify", "()V", |_, _| Ok(HostValue::Null))
            .method("equals", "(Ljava/lang/Object;)Z", |this, args| {
                Ok(HostValue::Boolean(args.first() == Some(this)))
            }),
    )
}

fn class_class_builder(access_flags: ClassAccessFlag) -> ClassBuilder {
    ClassBuilder::new("java.lang.Class")
        .access_flags(access_flags)
        .implements("java.io.Serializable")
}

fn unexpected_receiver(expected: &str, actual: &HostValue) -> HostError {
    HostError::new(
        "java.lang.ClassCastException",
        format!("{} can't be cast to {expected}", actual.type_name()),
    )
}

fn payload<'a, T: std::any::Any + Send + Sync>(
    this: &'a HostValue,
    expected: &str,
) -> HostResult<&'a T> {
    this.payload::<T>()
        .ok_or_else(|| unexpected_receiver(expected, this))
}

fn string(this: &HostValue) -> HostResult<&str> {
    this.as_str()
        .ok_or_else(|| unexpected_receiver("java.lang.String", this))
}

fn number(this: &HostValue) -> HostResult<&Number> {
    this.as_number()
        .ok_or_else(|| unexpected_receiver("java.lang.Number", this))
}

fn list(this: &HostValue) -> HostResult<&Arc<dyn ListAccess>> {
    match this {
        HostValue::List(list) => Ok(list),
        other => Err(unexpected_receiver("java.util.List", other)),
    }
}

fn map(this: &HostValue) -> HostResult<&Arc<dyn MapAccess>> {
    match this {
        HostValue::Map(map) => Ok(map),
        other => Err(unexpected_receiver("java.util.Map", other)),
    }
}

fn enum_constant(this: &HostValue) -> HostResult<&EnumConstant> {
    payload::<EnumConstant>(this, "java.lang.Enum")
}

fn class_of(this: &HostValue) -> HostResult<&Arc<Class>> {
    payload::<Arc<Class>>(this, "java.lang.Class")
}

fn hash_code(value: &HostValue) -> i32 {
    match value {
        HostValue::String(s) => s
            .encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32)),
        HostValue::Number(n) => n.int_value(),
        HostValue::Boolean(true) => 1231,
        HostValue::Boolean(false) => 1237,
        HostValue::Char(c) => *c as i32,
        HostValue::Object(object) => object.identity_hash() as i32,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bootstrap_defines_every_famous_class() {
        let registry = ClassRegistry::new();
        for name in FAMOUS_CLASS_NAMES {
            let class = registry.resolve(name).unwrap();
            assert_eq!(class.name(), *name);
            assert!(Arc::ptr_eq(&class, &resolve(name).unwrap()));
        }
    }

    #[test]
    fn class_and_class_loader_refer_to_each_other() {
        let load_class = class_loader_class()
            .declared_methods()
            .iter()
            .find(|m| m.name() == "loadClass")
            .cloned()
            .unwrap();
        assert_eq!(load_class.return_type(), Some(&crate::runtime::JType::class(class_class())));
        let get_class_loader = class_class()
            .declared_methods()
            .iter()
            .find(|m| m.name() == "getClassLoader")
            .cloned()
            .unwrap();
        assert_eq!(
            get_class_loader.return_type(),
            Some(&crate::runtime::JType::class(class_loader_class()))
        );
        assert!(Arc::ptr_eq(class_class().super_class().unwrap(), object_class()));
    }

    #[test]
    fn famous_classes_form_the_expected_hierarchy() {
        assert_eq!(integer_class().name(), "java.lang.Integer");
        assert!(Arc::ptr_eq(integer_class().super_class().unwrap(), number_class()));
        assert!(list_class().is_interface());
        assert!(string_class().is_final());
        assert!(Arc::ptr_eq(&resolve("java.util.HashMap").unwrap(), hash_map_class()));
    }

    #[test]
    fn object_members_are_inherited_and_dispatch_on_the_receiver() {
        let to_string = object_class()
            .declared_methods()
            .iter()
            .find(|m| m.name() == "toString")
            .cloned()
            .unwrap();
        assert_eq!(to_string.return_type(), Some(&crate::runtime::JType::class(string_class())));
        assert_eq!(
            to_string.invoke(&HostValue::int(7), &[]).unwrap(),
            HostValue::string("7")
        );
        let methods: Vec<String> = string_class()
            .public_methods()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert!(methods.contains(&"hashCode".to_string()));
        assert!(methods.contains(&"length".to_string()));
    }

    #[test]
    fn string_hash_code_matches_host() {
        assert_eq!(hash_code(&HostValue::string("hello")), 99162322);
    }
}
