use std::{any::Any, sync::Arc};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{
    consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag},
    descriptor::{
        FieldDescriptor, FieldType, parse_constructor_descriptor, parse_field_descriptor,
        parse_method_descriptor,
    },
    error::{Error, HostResult, Result},
    runtime::{
        Class, ClassMembers, ConstructorInfo, ConstructorInvoker, EnumConstant, FieldGetter,
        FieldInfo, HostObject, HostValue, JType, MethodInfo, MethodInvoker, PrimitiveType,
        famous_classes,
    },
};

/// Name to class mapping. Defining an already known name replaces the mapping with a new,
/// distinct class, the way a reloaded class would.
pub struct ClassRegistry {
    classes: DashMap<Arc<str>, Arc<Class>>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// A registry that knows the well-known `java.*` classes.
    pub fn new() -> Self {
        let registry = ClassRegistry::bare();
        for entry in famous_classes::registry().classes.iter() {
            registry
                .classes
                .insert(Arc::clone(entry.key()), Arc::clone(entry.value()));
        }
        registry
    }

    pub(crate) fn bare() -> Self {
        ClassRegistry {
            classes: DashMap::new(),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<Class>> {
        self.classes
            .get(name)
            .map(|class| Arc::clone(class.value()))
            .ok_or_else(|| Error::ClassNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Parses a field descriptor, `[Ljava/lang/String;`, into a type.
    pub fn parse_type(&self, descriptor: &str) -> Result<JType> {
        let FieldDescriptor(field_type) = parse_field_descriptor(descriptor)?;
        self.resolve_type(&field_type, None)
    }

    pub fn resolve_type(&self, field_type: &FieldType, this: Option<&Arc<Class>>) -> Result<JType> {
        Ok(match field_type {
            FieldType::Boolean => JType::Primitive(PrimitiveType::Boolean),
            FieldType::Char => JType::Primitive(PrimitiveType::Char),
            FieldType::Byte => JType::Primitive(PrimitiveType::Byte),
            FieldType::Short => JType::Primitive(PrimitiveType::Short),
            FieldType::Int => JType::Primitive(PrimitiveType::Int),
            FieldType::Long => JType::Primitive(PrimitiveType::Long),
            FieldType::Float => JType::Primitive(PrimitiveType::Float),
            FieldType::Double => JType::Primitive(PrimitiveType::Double),
            FieldType::Object(name) => match this {
                Some(this) if this.name() == name => JType::class(this),
                _ => JType::Class(self.resolve(name)?),
            },
            FieldType::Array(component) => JType::array_of(self.resolve_type(component, this)?),
        })
    }

    pub fn define(&self, builder: ClassBuilder) -> Result<Arc<Class>> {
        let class = self.declare(&builder)?;
        self.complete(&class, builder)?;
        if let Some(previous) = self
            .classes
            .insert(Arc::clone(&class.class_name), Arc::clone(&class))
        {
            debug!(class = %previous.class_name, "class redefined");
        }
        Ok(class)
    }

    /// Creates the class without members; `complete` attaches them.
    pub(crate) fn declare(&self, builder: &ClassBuilder) -> Result<Arc<Class>> {
        let invalid = |reason: String| Error::InvalidClassDefinition {
            class: builder.name.to_string(),
            reason,
        };
        let super_class = match &builder.super_class {
            Some(name) => {
                let class = self.resolve(name)?;
                if class.is_interface() {
                    return Err(invalid(format!("super class {name} is an interface")));
                }
                Some(class)
            }
            None => None,
        };
        let interfaces = builder
            .interfaces
            .iter()
            .map(|name| {
                let interface = self.resolve(name)?;
                if !interface.is_interface() {
                    return Err(invalid(format!("{name} is not an interface")));
                }
                Ok(interface)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(Class {
            access_flags: builder.access_flags,
            class_name: Arc::clone(&builder.name),
            super_class,
            interfaces,
            members: OnceCell::new(),
        }))
    }

    pub(crate) fn complete(&self, class: &Arc<Class>, builder: ClassBuilder) -> Result<()> {
        let declaring_class_name = Arc::clone(&class.class_name);
        let is_interface = class.is_interface();
        let invalid = |reason: String| Error::InvalidClassDefinition {
            class: declaring_class_name.to_string(),
            reason,
        };

        let mut fields = Vec::with_capacity(builder.fields.len() + builder.enum_constants.len());
        for spec in builder.fields {
            let FieldDescriptor(field_type) = parse_field_descriptor(&spec.descriptor)?;
            fields.push(Arc::new(FieldInfo {
                access_flags: spec.access_flags,
                name: spec.name,
                field_type: self.resolve_type(&field_type, Some(class))?,
                declaring_class_name: Arc::clone(&declaring_class_name),
                getter: spec.getter,
            }));
        }
        for (ordinal, name) in builder.enum_constants.into_iter().enumerate() {
            let payload: Arc<EnumConstant> = Arc::new(EnumConstant {
                name: Arc::clone(&name),
                ordinal: ordinal as i32,
            });
            let weak_class = Arc::downgrade(class);
            let getter: FieldGetter = Arc::new(move |_: &HostValue| {
                let class = weak_class.upgrade().ok_or_else(|| {
                    crate::error::HostError::illegal_state("enum class was unloaded")
                })?;
                Ok(HostValue::Object(HostObject {
                    class,
                    payload: payload.clone() as Arc<dyn Any + Send + Sync>,
                }))
            });
            fields.push(Arc::new(FieldInfo {
                access_flags: FieldAccessFlag::PUBLIC
                    | FieldAccessFlag::STATIC
                    | FieldAccessFlag::FINAL
                    | FieldAccessFlag::ENUM,
                name,
                field_type: JType::class(class),
                declaring_class_name: Arc::clone(&declaring_class_name),
                getter,
            }));
        }

        let mut methods = Vec::with_capacity(builder.methods.len());
        for spec in builder.methods {
            let descriptor = parse_method_descriptor(&spec.descriptor)?;
            let parameters = descriptor
                .parameters
                .iter()
                .map(|p| self.resolve_type(p, Some(class)))
                .collect::<Result<Vec<_>>>()?;
            if spec.access_flags.is_varargs() && !parameters.last().is_some_and(JType::is_array) {
                return Err(invalid(format!(
                    "varargs method {} must end with an array parameter",
                    spec.name
                )));
            }
            if spec.invoker.is_none() && !spec.access_flags.contains(MethodAccessFlag::ABSTRACT) {
                return Err(invalid(format!("method {} has no body", spec.name)));
            }
            let return_type = descriptor
                .return_type
                .as_ref()
                .map(|r| self.resolve_type(r, Some(class)))
                .transpose()?;
            methods.push(Arc::new(MethodInfo {
                access_flags: spec.access_flags,
                name: spec.name,
                parameters,
                return_type,
                declaring_class: Arc::downgrade(class),
                declaring_class_name: Arc::clone(&declaring_class_name),
                declared_in_interface: is_interface,
                invoker: spec.invoker,
            }));
        }

        let mut constructors = Vec::with_capacity(builder.constructors.len());
        for spec in builder.constructors {
            if is_interface {
                return Err(invalid("interfaces can't have constructors".to_string()));
            }
            let parameters = parse_constructor_descriptor(&spec.descriptor)?
                .iter()
                .map(|p| self.resolve_type(p, Some(class)))
                .collect::<Result<Vec<_>>>()?;
            if spec.access_flags.is_varargs() && !parameters.last().is_some_and(JType::is_array) {
                return Err(invalid(
                    "varargs constructor must end with an array parameter".to_string(),
                ));
            }
            constructors.push(Arc::new(ConstructorInfo {
                access_flags: spec.access_flags,
                parameters,
                declaring_class: Arc::downgrade(class),
                declaring_class_name: Arc::clone(&declaring_class_name),
                invoker: spec.invoker,
            }));
        }

        class
            .members
            .set(ClassMembers {
                fields,
                methods,
                constructors,
            })
            .map_err(|_| invalid("members already attached".to_string()))
    }

    /// Registers a class declared with [`ClassRegistry::declare`] before its members exist.
    pub(crate) fn insert(&self, class: &Arc<Class>) {
        self.classes
            .insert(Arc::clone(&class.class_name), Arc::clone(class));
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<Class>> {
        self.classes.get(name).map(|class| Arc::clone(class.value()))
    }
}

struct FieldSpec {
    access_flags: FieldAccessFlag,
    name: Arc<str>,
    descriptor: String,
    getter: FieldGetter,
}

struct MethodSpec {
    access_flags: MethodAccessFlag,
    name: Arc<str>,
    descriptor: String,
    invoker: Option<MethodInvoker>,
}

struct ConstructorSpec {
    access_flags: MethodAccessFlag,
    descriptor: String,
    invoker: ConstructorInvoker,
}

/// Declares a host class. Member types are JVM descriptors, `(ILjava/lang/String;)V`.
pub struct ClassBuilder {
    name: Arc<str>,
    access_flags: ClassAccessFlag,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
    constructors: Vec<ConstructorSpec>,
    enum_constants: Vec<Arc<str>>,
}

const OBJECT: &str = "java.lang.Object";

impl ClassBuilder {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        let super_class = (&*name != OBJECT).then(|| OBJECT.to_string());
        ClassBuilder {
            name,
            access_flags: ClassAccessFlag::PUBLIC,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            constructors: vec![],
            enum_constants: vec![],
        }
    }

    pub fn interface(name: impl Into<Arc<str>>) -> Self {
        ClassBuilder {
            access_flags: ClassAccessFlag::PUBLIC
                | ClassAccessFlag::INTERFACE
                | ClassAccessFlag::ABSTRACT,
            super_class: None,
            ..ClassBuilder::new(name)
        }
    }

    pub fn enumeration(name: impl Into<Arc<str>>) -> Self {
        ClassBuilder {
            access_flags: ClassAccessFlag::PUBLIC | ClassAccessFlag::FINAL | ClassAccessFlag::ENUM,
            super_class: Some("java.lang.Enum".to_string()),
            ..ClassBuilder::new(name)
        }
    }

    pub fn access_flags(mut self, access_flags: ClassAccessFlag) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn extends(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn field(
        self,
        name: &str,
        descriptor: &str,
        getter: impl Fn(&HostValue) -> HostResult<HostValue> + Send + Sync + 'static,
    ) -> Self {
        self.field_with_flags(FieldAccessFlag::PUBLIC, name, descriptor, getter)
    }

    pub fn static_field(
        self,
        name: &str,
        descriptor: &str,
        getter: impl Fn() -> HostResult<HostValue> + Send + Sync + 'static,
    ) -> Self {
        self.field_with_flags(
            FieldAccessFlag::PUBLIC | FieldAccessFlag::STATIC,
            name,
            descriptor,
            move |_| getter(),
        )
    }

    pub fn field_with_flags(
        mut self,
        access_flags: FieldAccessFlag,
        name: &str,
        descriptor: &str,
        getter: impl Fn(&HostValue) -> HostResult<HostValue> + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldSpec {
            access_flags,
            name: name.into(),
            descriptor: descriptor.to_string(),
            getter: Arc::new(getter),
        });
        self
    }

    /// Adds a constant to an enum declared with [`ClassBuilder::enumeration`].
    pub fn enum_constant(mut self, name: &str) -> Self {
        self.enum_constants.push(name.into());
        self
    }

    pub fn method(
        self,
        name: &str,
        descriptor: &str,
        invoker: impl Fn(&HostValue, &[HostValue]) -> HostResult<HostValue> + Send + Sync + 'static,
    ) -> Self {
        let invoker: MethodInvoker = Arc::new(invoker);
        self.method_with_flags(MethodAccessFlag::PUBLIC, name, descriptor, Some(invoker))
    }

    pub fn static_method(
        self,
        name: &str,
        descriptor: &str,
        invoker: impl Fn(&[HostValue]) -> HostResult<HostValue> + Send + Sync + 'static,
    ) -> Self {
        let invoker: MethodInvoker = Arc::new(move |_: &HostValue, args: &[HostValue]| invoker(args));
        self.method_with_flags(
            MethodAccessFlag::PUBLIC | MethodAccessFlag::STATIC,
            name,
            descriptor,
            Some(invoker),
        )
    }

    /// The trailing array parameter of `descriptor` collects the variable arguments.
    pub fn varargs_method(
        self,
        name: &str,
        descriptor: &str,
        invoker: impl Fn(&HostValue, &[HostValue]) -> HostResult<HostValue> + Send + Sync + 'static,
    ) -> Self {
        let invoker: MethodInvoker = Arc::new(invoker);
        self.method_with_flags(
            MethodAccessFlag::PUBLIC | MethodAccessFlag::VARARGS,
            name,
            descriptor,
            Some(invoker),
        )
    }

    pub fn abstract_method(self, name: &str, descriptor: &str) -> Self {
        self.method_with_flags(
            MethodAccessFlag::PUBLIC | MethodAccessFlag::ABSTRACT,
            name,
            descriptor,
            None,
        )
    }

    pub fn method_with_flags(
        mut self,
        access_flags: MethodAccessFlag,
        name: &str,
        descriptor: &str,
        invoker: Option<MethodInvoker>,
    ) -> Self {
        self.methods.push(MethodSpec {
            access_flags,
            name: name.into(),
            descriptor: descriptor.to_string(),
            invoker,
        });
        self
    }

    /// `descriptor` lists the parameters only, `(II)`.
    pub fn constructor(
        self,
        descriptor: &str,
        invoker: impl Fn(&Arc<Class>, &[HostValue]) -> HostResult<HostValue> + Send + Sync + 'static,
    ) -> Self {
        self.constructor_with_flags(MethodAccessFlag::PUBLIC, descriptor, invoker)
    }

    pub fn constructor_with_flags(
        mut self,
        access_flags: MethodAccessFlag,
        descriptor: &str,
        invoker: impl Fn(&Arc<Class>, &[HostValue]) -> HostResult<HostValue> + Send + Sync + 'static,
    ) -> Self {
        self.constructors.push(ConstructorSpec {
            access_flags,
            descriptor: descriptor.to_string(),
            invoker: Arc::new(invoker),
        });
        self
    }
}
