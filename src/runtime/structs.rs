use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, Weak},
};

use once_cell::sync::OnceCell;

use crate::{
    consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag},
    error::{HostError, HostResult},
    runtime::{HostValue, famous_classes},
};

pub type MethodInvoker =
    Arc<dyn Fn(&HostValue, &[HostValue]) -> HostResult<HostValue> + Send + Sync>;
pub type ConstructorInvoker =
    Arc<dyn Fn(&Arc<Class>, &[HostValue]) -> HostResult<HostValue> + Send + Sync>;
pub type FieldGetter = Arc<dyn Fn(&HostValue) -> HostResult<HostValue> + Send + Sync>;

/// Runtime description of a host class or interface.
///
/// Identity is the identity of the `Arc<Class>`: defining a class twice under the same name
/// yields two different classes.
pub struct Class {
    pub(crate) access_flags: ClassAccessFlag,
    pub(crate) class_name: Arc<str>,
    pub(crate) super_class: Option<Arc<Class>>,
    pub(crate) interfaces: Vec<Arc<Class>>,
    // set once, right after the class itself exists, so members may refer to their own class
    pub(crate) members: OnceCell<ClassMembers>,
}

#[derive(Default)]
pub(crate) struct ClassMembers {
    pub(crate) fields: Vec<Arc<FieldInfo>>,
    pub(crate) methods: Vec<Arc<MethodInfo>>,
    pub(crate) constructors: Vec<Arc<ConstructorInfo>>,
}

static NO_MEMBERS: ClassMembers = ClassMembers {
    fields: Vec::new(),
    methods: Vec::new(),
    constructors: Vec::new(),
};

impl Class {
    pub fn name(&self) -> &str {
        &self.class_name
    }

    pub fn simple_name(&self) -> &str {
        match self.class_name.rsplit_once(['.', '$']) {
            Some((_, simple)) => simple,
            None => &self.class_name,
        }
    }

    pub fn package_name(&self) -> &str {
        let Some((package, _)) = self.class_name.rsplit_once('.') else {
            return "";
        };
        package
    }

    pub fn access_flags(&self) -> ClassAccessFlag {
        self.access_flags
    }

    pub fn is_public(&self) -> bool {
        self.access_flags.is_public()
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.is_interface()
    }

    pub fn is_enum(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::ENUM)
    }

    pub fn is_final(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::FINAL)
    }

    pub fn super_class(&self) -> Option<&Arc<Class>> {
        self.super_class.as_ref()
    }

    pub fn interfaces(&self) -> &[Arc<Class>] {
        &self.interfaces
    }

    fn members(&self) -> &ClassMembers {
        self.members.get().unwrap_or(&NO_MEMBERS)
    }

    /// Fields declared by this class only.
    pub fn declared_fields(&self) -> &[Arc<FieldInfo>] {
        &self.members().fields
    }

    /// Methods declared by this class only.
    pub fn declared_methods(&self) -> &[Arc<MethodInfo>] {
        &self.members().methods
    }

    pub fn declared_constructors(&self) -> &[Arc<ConstructorInfo>] {
        &self.members().constructors
    }

    pub fn public_constructors(&self) -> Vec<Arc<ConstructorInfo>> {
        self.declared_constructors()
            .iter()
            .filter(|c| c.access_flags.is_public())
            .cloned()
            .collect()
    }

    /// Public fields of the class, its super classes and its interfaces; a field hides any
    /// same-named field further up.
    pub fn public_fields(&self) -> Vec<Arc<FieldInfo>> {
        let mut result: Vec<Arc<FieldInfo>> = vec![];
        for class in self.ancestors() {
            for field in class.declared_fields() {
                if field.access_flags.is_public() && result.iter().all(|f| f.name != field.name) {
                    result.push(Arc::clone(field));
                }
            }
        }
        result
    }

    /// Public methods of the class including inherited ones, most-derived declaration first.
    /// Static interface methods are not inherited.
    pub fn public_methods(&self) -> Vec<Arc<MethodInfo>> {
        let mut result: Vec<Arc<MethodInfo>> = vec![];
        let mut push = |method: &Arc<MethodInfo>| {
            if method.access_flags.is_public()
                && !result.iter().any(|m| m.has_same_signature(method))
            {
                result.push(Arc::clone(method));
            }
        };
        let mut class = Some(self);
        while let Some(current) = class {
            current.declared_methods().iter().for_each(&mut push);
            class = current.super_class.as_deref();
        }
        for interface in self.all_interfaces() {
            interface
                .declared_methods()
                .iter()
                .filter(|m| !m.is_static() || std::ptr::eq(interface.as_ref(), self))
                .for_each(&mut push);
        }
        result
    }

    /// The super class chain starting with `self`, then every interface reachable from it.
    pub(crate) fn ancestors(&self) -> Vec<&Class> {
        let mut result: Vec<&Class> = vec![];
        let mut class = Some(self);
        while let Some(current) = class {
            result.push(current);
            class = current.super_class.as_deref();
        }
        for interface in self.all_interfaces() {
            result.push(interface);
        }
        result
    }

    /// Every interface implemented directly or indirectly, breadth first, without duplicates.
    pub(crate) fn all_interfaces(&self) -> Vec<&Arc<Class>> {
        let mut result: Vec<&Arc<Class>> = vec![];
        let mut queue: Vec<&Class> = vec![];
        let mut class = Some(self);
        while let Some(current) = class {
            queue.push(current);
            class = current.super_class.as_deref();
        }
        let mut index = 0;
        while index < queue.len() {
            let current = queue[index];
            for interface in &current.interfaces {
                if !result.iter().any(|i| Arc::ptr_eq(i, interface)) {
                    result.push(interface);
                    queue.push(interface);
                }
            }
            index += 1;
        }
        result
    }

    /// Finds the implementation a virtual call dispatches to: class chain first, then
    /// interface default methods.
    pub(crate) fn find_implementation(&self, method: &MethodInfo) -> Option<Arc<MethodInfo>> {
        let mut class = Some(self);
        while let Some(current) = class {
            if let Some(found) = current
                .declared_methods()
                .iter()
                .find(|m| m.invoker.is_some() && !m.is_static() && m.has_same_signature(method))
            {
                return Some(Arc::clone(found));
            }
            class = current.super_class.as_deref();
        }
        self.all_interfaces().into_iter().find_map(|interface| {
            interface
                .declared_methods()
                .iter()
                .find(|m| m.invoker.is_some() && !m.is_static() && m.has_same_signature(method))
                .cloned()
        })
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("class_name", &self.class_name)
            .field("access_flags", &self.access_flags)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn boxing_class(self) -> &'static Arc<Class> {
        match self {
            PrimitiveType::Boolean => famous_classes::boolean_class(),
            PrimitiveType::Char => famous_classes::character_class(),
            PrimitiveType::Byte => famous_classes::byte_class(),
            PrimitiveType::Short => famous_classes::short_class(),
            PrimitiveType::Int => famous_classes::integer_class(),
            PrimitiveType::Long => famous_classes::long_class(),
            PrimitiveType::Float => famous_classes::float_class(),
            PrimitiveType::Double => famous_classes::double_class(),
        }
    }

    pub fn is_numerical(self) -> bool {
        !matches!(self, PrimitiveType::Boolean | PrimitiveType::Char)
    }
}

/// A parameter, field or return type.
#[derive(Clone)]
pub enum JType {
    Primitive(PrimitiveType),
    Class(Arc<Class>),
    Array(Box<JType>),
}

impl JType {
    pub fn class(class: &Arc<Class>) -> JType {
        JType::Class(Arc::clone(class))
    }

    pub fn array_of(component: JType) -> JType {
        JType::Array(Box::new(component))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JType::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, JType::Array(_))
    }

    pub fn as_class(&self) -> Option<&Arc<Class>> {
        match self {
            JType::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn component_type(&self) -> Option<&JType> {
        match self {
            JType::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Primitive types become their boxing class; everything else is returned as is.
    pub fn boxed(&self) -> JType {
        match self {
            JType::Primitive(primitive) => JType::class(primitive.boxing_class()),
            other => other.clone(),
        }
    }

    pub fn is_class(&self, class: &Arc<Class>) -> bool {
        matches!(self, JType::Class(c) if Arc::ptr_eq(c, class))
    }

    pub fn is_object(&self) -> bool {
        self.is_class(famous_classes::object_class())
    }

    /// Primitive numerical types and `Number` with its subclasses.
    pub fn is_numerical(&self) -> bool {
        match self {
            JType::Primitive(primitive) => primitive.is_numerical(),
            JType::Class(class) => {
                crate::runtime::inheritance::is_same_or_sub_class_of(
                    class,
                    famous_classes::number_class(),
                )
            }
            JType::Array(_) => false,
        }
    }

    /// Java source form, `java.lang.String[]`.
    pub fn java_name(&self) -> String {
        match self {
            JType::Primitive(primitive) => primitive.name().to_string(),
            JType::Class(class) => class.class_name.to_string(),
            JType::Array(component) => format!("{}[]", component.java_name()),
        }
    }

    /// Like [`JType::java_name`], but drops the `java.lang.` package.
    pub fn short_name(&self) -> String {
        match self {
            JType::Primitive(primitive) => primitive.name().to_string(),
            JType::Class(class) => match class.class_name.strip_prefix("java.lang.") {
                Some(short) if !short.contains('.') => short.to_string(),
                _ => class.class_name.to_string(),
            },
            JType::Array(component) => format!("{}[]", component.short_name()),
        }
    }
}

impl PartialEq for JType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JType::Primitive(a), JType::Primitive(b)) => a == b,
            (JType::Class(a), JType::Class(b)) => Arc::ptr_eq(a, b),
            (JType::Array(a), JType::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for JType {}

impl Hash for JType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            JType::Primitive(primitive) => {
                0u8.hash(state);
                primitive.hash(state);
            }
            JType::Class(class) => {
                1u8.hash(state);
                std::ptr::hash(Arc::as_ptr(class), state);
            }
            JType::Array(component) => {
                2u8.hash(state);
                component.hash(state);
            }
        }
    }
}

impl fmt::Debug for JType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.java_name())
    }
}

impl fmt::Display for JType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.java_name())
    }
}

pub struct FieldInfo {
    pub(crate) access_flags: FieldAccessFlag,
    pub(crate) name: Arc<str>,
    pub(crate) field_type: JType,
    pub(crate) declaring_class_name: Arc<str>,
    pub(crate) getter: FieldGetter,
}

impl FieldInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &JType {
        &self.field_type
    }

    pub fn access_flags(&self) -> FieldAccessFlag {
        self.access_flags
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.is_static()
    }

    pub fn read(&self, receiver: &HostValue) -> HostResult<HostValue> {
        (self.getter)(receiver)
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.field_type, self.declaring_class_name, self.name)
    }
}

pub struct MethodInfo {
    pub(crate) access_flags: MethodAccessFlag,
    pub(crate) name: Arc<str>,
    pub(crate) parameters: Vec<JType>,
    pub(crate) return_type: Option<JType>,
    pub(crate) declaring_class: Weak<Class>,
    pub(crate) declaring_class_name: Arc<str>,
    pub(crate) declared_in_interface: bool,
    // None for abstract methods
    pub(crate) invoker: Option<MethodInvoker>,
}

impl MethodInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[JType] {
        &self.parameters
    }

    pub fn return_type(&self) -> Option<&JType> {
        self.return_type.as_ref()
    }

    pub fn access_flags(&self) -> MethodAccessFlag {
        self.access_flags
    }

    pub fn declaring_class(&self) -> Option<Arc<Class>> {
        self.declaring_class.upgrade()
    }

    pub fn declaring_class_name(&self) -> &str {
        &self.declaring_class_name
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.is_static()
    }

    pub fn is_varargs(&self) -> bool {
        self.access_flags.is_varargs()
    }

    pub fn is_bridge(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::BRIDGE)
    }

    /// A non-abstract instance method declared by an interface.
    pub fn is_default(&self) -> bool {
        self.declared_in_interface && self.invoker.is_some() && !self.is_static()
    }

    pub fn has_same_signature(&self, other: &MethodInfo) -> bool {
        self.name == other.name && self.parameters == other.parameters
    }

    /// Invokes the method; instance methods dispatch on the receiver's class.
    pub fn invoke(&self, receiver: &HostValue, args: &[HostValue]) -> HostResult<HostValue> {
        if !self.is_static() {
            if let Some(implementation) = receiver
                .runtime_class()
                .and_then(|class| class.find_implementation(self))
            {
                if let Some(invoker) = &implementation.invoker {
                    return invoker(receiver, args);
                }
            }
        }
        match &self.invoker {
            Some(invoker) => invoker(receiver, args),
            None => Err(HostError::new(
                "java.lang.AbstractMethodError",
                format!("{}.{}", self.declaring_class_name, self.name),
            )),
        }
    }

    /// `com.example.Point.setColor(String)`
    pub fn declaration(&self) -> String {
        format!(
            "{}.{}({})",
            self.declaring_class_name,
            self.name,
            parameter_list(&self.parameters, self.is_varargs())
        )
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declaration())
    }
}

pub struct ConstructorInfo {
    pub(crate) access_flags: MethodAccessFlag,
    pub(crate) parameters: Vec<JType>,
    pub(crate) declaring_class: Weak<Class>,
    pub(crate) declaring_class_name: Arc<str>,
    pub(crate) invoker: ConstructorInvoker,
}

impl ConstructorInfo {
    pub fn parameters(&self) -> &[JType] {
        &self.parameters
    }

    pub fn access_flags(&self) -> MethodAccessFlag {
        self.access_flags
    }

    pub fn declaring_class(&self) -> Option<Arc<Class>> {
        self.declaring_class.upgrade()
    }

    pub fn declaring_class_name(&self) -> &str {
        &self.declaring_class_name
    }

    pub fn is_varargs(&self) -> bool {
        self.access_flags.is_varargs()
    }

    pub fn invoke(&self, args: &[HostValue]) -> HostResult<HostValue> {
        let class = self.declaring_class.upgrade().ok_or_else(|| {
            HostError::illegal_state(format!("class {} was unloaded", self.declaring_class_name))
        })?;
        (self.invoker)(&class, args)
    }

    /// `com.example.Point(int, int)`
    pub fn declaration(&self) -> String {
        format!(
            "{}({})",
            self.declaring_class_name,
            parameter_list(&self.parameters, self.is_varargs())
        )
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declaration())
    }
}

fn parameter_list(parameters: &[JType], varargs: bool) -> String {
    let mut names: Vec<String> = parameters.iter().map(JType::short_name).collect();
    if varargs {
        if let Some(last) = names.last_mut() {
            if let Some(stripped) = last.strip_suffix("[]") {
                *last = format!("{stripped}...");
            }
        }
    }
    names.join(", ")
}
