use std::{
    any::Any,
    collections::VecDeque,
    fmt,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::{
    error::{HostError, HostResult},
    model::ModelRef,
    runtime::{Class, JType, Number, famous_classes},
};

/// A value living on the host side of the marshalling boundary.
#[derive(Clone)]
pub enum HostValue {
    Null,
    Boolean(bool),
    Char(char),
    Number(Number),
    String(Arc<str>),
    Date(DateTime<Utc>),
    Array(HostArray),
    List(Arc<dyn ListAccess>),
    Set(Arc<dyn CollectionAccess>),
    Map(Arc<dyn MapAccess>),
    Iterator(Arc<dyn IteratorAccess>),
    ResourceBundle(Arc<ResourceBundle>),
    Object(HostObject),
}

impl HostValue {
    pub fn string(value: impl Into<Arc<str>>) -> HostValue {
        HostValue::String(value.into())
    }

    pub fn int(value: i32) -> HostValue {
        HostValue::Number(Number::Int(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            HostValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Downcasts the payload of an object value.
    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.as_object()?.payload.downcast_ref()
    }

    /// The class an instance method call dispatches on; `None` for null and arrays.
    pub fn runtime_class(&self) -> Option<Arc<Class>> {
        match self.runtime_type()? {
            JType::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn runtime_type(&self) -> Option<JType> {
        let class = match self {
            HostValue::Null => return None,
            HostValue::Array(array) => return Some(JType::array_of(array.component.clone())),
            HostValue::Boolean(_) => famous_classes::boolean_class(),
            HostValue::Char(_) => famous_classes::character_class(),
            HostValue::Number(n) => n.class(),
            HostValue::String(_) => famous_classes::string_class(),
            HostValue::Date(_) => famous_classes::date_class(),
            HostValue::List(list) => list.class(),
            HostValue::Set(set) => set.class(),
            HostValue::Map(map) => map.class(),
            HostValue::Iterator(_) => famous_classes::iterator_class(),
            HostValue::ResourceBundle(_) => famous_classes::resource_bundle_class(),
            HostValue::Object(object) => return Some(JType::Class(Arc::clone(&object.class))),
        };
        Some(JType::class(class))
    }

    /// Type name used in diagnostics, `"null"` for null.
    pub fn type_name(&self) -> String {
        self.runtime_type()
            .map(|t| t.java_name())
            .unwrap_or_else(|| "null".to_string())
    }

    /// The `toString()` text of the value.
    pub fn to_display_string(&self) -> String {
        match self {
            HostValue::Null => "null".to_string(),
            HostValue::Boolean(b) => b.to_string(),
            HostValue::Char(c) => c.to_string(),
            HostValue::Number(n) => n.to_string(),
            HostValue::String(s) => s.to_string(),
            HostValue::Date(d) => d.to_rfc3339(),
            HostValue::Object(object) => match object.payload.downcast_ref::<EnumConstant>() {
                Some(constant) => constant.name.to_string(),
                None => format!("{}@{:x}", object.class.name(), object.identity_hash()),
            },
            other => format!("{other:?}"),
        }
    }
}

/// Scalars compare by value, containers and objects by identity.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Boolean(a), HostValue::Boolean(b)) => a == b,
            (HostValue::Char(a), HostValue::Char(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Date(a), HostValue::Date(b)) => a == b,
            (HostValue::Array(a), HostValue::Array(b)) => Arc::ptr_eq(&a.items, &b.items),
            (HostValue::List(a), HostValue::List(b)) => same_allocation(a, b),
            (HostValue::Set(a), HostValue::Set(b)) => same_allocation(a, b),
            (HostValue::Map(a), HostValue::Map(b)) => same_allocation(a, b),
            (HostValue::Iterator(a), HostValue::Iterator(b)) => same_allocation(a, b),
            (HostValue::ResourceBundle(a), HostValue::ResourceBundle(b)) => Arc::ptr_eq(a, b),
            (HostValue::Object(a), HostValue::Object(b)) => {
                Arc::ptr_eq(&a.payload, &b.payload) && Arc::ptr_eq(&a.class, &b.class)
            }
            _ => false,
        }
    }
}

fn same_allocation<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("null"),
            HostValue::Boolean(b) => write!(f, "{b}"),
            HostValue::Char(c) => write!(f, "{c:?}"),
            HostValue::Number(n) => write!(f, "{n:?}"),
            HostValue::String(s) => write!(f, "{s:?}"),
            HostValue::Date(d) => write!(f, "{d}"),
            HostValue::Array(a) => write!(f, "{}[{}]", a.component, a.len()),
            HostValue::List(l) => write!(f, "List(size={})", l.size()),
            HostValue::Set(s) => write!(f, "Set(size={})", s.size()),
            HostValue::Map(m) => write!(f, "Map(size={})", m.size()),
            HostValue::Iterator(_) => f.write_str("Iterator"),
            HostValue::ResourceBundle(b) => write!(f, "ResourceBundle({})", b.base_name),
            HostValue::Object(o) => write!(f, "{}@{:x}", o.class.name(), o.identity_hash()),
        }
    }
}

/// Instance of a registered class. The payload is whatever the class's invokers downcast to.
#[derive(Clone)]
pub struct HostObject {
    pub class: Arc<Class>,
    pub payload: Arc<dyn Any + Send + Sync>,
}

impl HostObject {
    pub fn new(class: &Arc<Class>, payload: impl Any + Send + Sync) -> Self {
        HostObject {
            class: Arc::clone(class),
            payload: Arc::new(payload),
        }
    }

    pub fn identity_hash(&self) -> usize {
        Arc::as_ptr(&self.payload) as *const () as usize
    }
}

/// Payload of enum constants created by `ClassBuilder::enum_constant`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: Arc<str>,
    pub ordinal: i32,
}

/// Typed array; items are shared so a partially built array can refer to itself.
#[derive(Clone)]
pub struct HostArray {
    pub(crate) component: JType,
    pub(crate) items: Arc<RwLock<Vec<HostValue>>>,
}

impl HostArray {
    pub fn new(component: JType, items: Vec<HostValue>) -> Self {
        HostArray {
            component,
            items: Arc::new(RwLock::new(items)),
        }
    }

    pub fn component(&self) -> &JType {
        &self.component
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<HostValue> {
        self.items.read().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<HostValue> {
        self.items.read().clone()
    }

    pub(crate) fn push(&self, item: HostValue) {
        self.items.write().push(item);
    }
}

/// Host side `java.util.List`.
pub trait ListAccess: Send + Sync {
    fn size(&self) -> usize;

    fn get(&self, index: usize) -> HostResult<HostValue>;

    fn class(&self) -> &'static Arc<Class> {
        famous_classes::array_list_class()
    }

    /// The template model this list adapts, if it is an adapter.
    fn template_model(&self) -> Option<ModelRef> {
        None
    }

    fn to_vec(&self) -> HostResult<Vec<HostValue>> {
        (0..self.size()).map(|i| self.get(i)).collect()
    }
}

/// Host side `java.util.Collection`, used for sets and plain collections.
pub trait CollectionAccess: Send + Sync {
    fn size(&self) -> usize;

    fn values(&self) -> HostResult<Vec<HostValue>>;

    fn class(&self) -> &'static Arc<Class> {
        famous_classes::hash_set_class()
    }

    fn template_model(&self) -> Option<ModelRef> {
        None
    }
}

/// Host side `java.util.Map` with string keys.
pub trait MapAccess: Send + Sync {
    fn size(&self) -> usize;

    fn get(&self, key: &str) -> HostResult<Option<HostValue>>;

    fn keys(&self) -> HostResult<Vec<Arc<str>>>;

    fn class(&self) -> &'static Arc<Class> {
        famous_classes::hash_map_class()
    }

    fn template_model(&self) -> Option<ModelRef> {
        None
    }
}

pub trait IteratorAccess: Send + Sync {
    fn next(&self) -> Option<HostValue>;
}

#[derive(Default)]
pub struct HostList {
    items: RwLock<Vec<HostValue>>,
}

impl HostList {
    pub fn new(items: Vec<HostValue>) -> Arc<Self> {
        Arc::new(HostList {
            items: RwLock::new(items),
        })
    }

    pub fn push(&self, item: HostValue) {
        self.items.write().push(item);
    }
}

impl ListAccess for HostList {
    fn size(&self) -> usize {
        self.items.read().len()
    }

    fn get(&self, index: usize) -> HostResult<HostValue> {
        self.items.read().get(index).cloned().ok_or_else(|| {
            HostError::new(
                "java.lang.IndexOutOfBoundsException",
                format!("index {index} out of bounds"),
            )
        })
    }

    fn to_vec(&self) -> HostResult<Vec<HostValue>> {
        Ok(self.items.read().clone())
    }
}

/// Insertion ordered set.
#[derive(Default)]
pub struct HostSet {
    items: RwLock<Vec<HostValue>>,
}

impl HostSet {
    pub fn new(items: Vec<HostValue>) -> Arc<Self> {
        let set = HostSet::default();
        for item in items {
            set.insert(item);
        }
        Arc::new(set)
    }

    pub fn insert(&self, item: HostValue) -> bool {
        let mut items = self.items.write();
        if items.contains(&item) {
            return false;
        }
        items.push(item);
        true
    }
}

impl CollectionAccess for HostSet {
    fn size(&self) -> usize {
        self.items.read().len()
    }

    fn values(&self) -> HostResult<Vec<HostValue>> {
        Ok(self.items.read().clone())
    }
}

#[derive(Default)]
pub struct HostMap {
    entries: RwLock<IndexMap<Arc<str>, HostValue>>,
}

impl HostMap {
    pub fn new(entries: impl IntoIterator<Item = (Arc<str>, HostValue)>) -> Arc<Self> {
        Arc::new(HostMap {
            entries: RwLock::new(entries.into_iter().collect()),
        })
    }

    pub fn insert(&self, key: impl Into<Arc<str>>, value: HostValue) -> Option<HostValue> {
        self.entries.write().insert(key.into(), value)
    }
}

impl MapAccess for HostMap {
    fn size(&self) -> usize {
        self.entries.read().len()
    }

    fn get(&self, key: &str) -> HostResult<Option<HostValue>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn keys(&self) -> HostResult<Vec<Arc<str>>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

pub struct HostIterator {
    items: Mutex<VecDeque<HostValue>>,
}

impl HostIterator {
    pub fn new(items: impl IntoIterator<Item = HostValue>) -> Arc<Self> {
        Arc::new(HostIterator {
            items: Mutex::new(items.into_iter().collect()),
        })
    }
}

impl IteratorAccess for HostIterator {
    fn next(&self) -> Option<HostValue> {
        self.items.lock().pop_front()
    }
}

/// Localized messages; values may contain `{0}`-style placeholders.
#[derive(Debug)]
pub struct ResourceBundle {
    pub(crate) base_name: Arc<str>,
    pub(crate) messages: IndexMap<Arc<str>, Arc<str>>,
}

impl ResourceBundle {
    pub fn new(
        base_name: impl Into<Arc<str>>,
        messages: impl IntoIterator<Item = (Arc<str>, Arc<str>)>,
    ) -> Arc<Self> {
        Arc::new(ResourceBundle {
            base_name: base_name.into(),
            messages: messages.into_iter().collect(),
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn get_string(&self, key: &str) -> HostResult<Arc<str>> {
        self.messages.get(key).cloned().ok_or_else(|| {
            HostError::new(
                "java.util.MissingResourceException",
                format!("Can't find resource for bundle {}, key {key}", self.base_name),
            )
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.messages.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalars_compare_by_value_containers_by_identity() {
        assert_eq!(HostValue::string("a"), HostValue::string("a"));
        assert!(HostValue::int(1) != HostValue::Number(Number::Long(1)));
        let list = HostList::new(vec![]);
        assert_eq!(HostValue::List(list.clone()), HostValue::List(list));
        assert!(HostValue::List(HostList::new(vec![])) != HostValue::List(HostList::new(vec![])));
    }

    #[test]
    fn runtime_types_of_builtin_values() {
        assert_eq!(HostValue::int(1).type_name(), "java.lang.Integer");
        assert_eq!(HostValue::Null.type_name(), "null");
        assert_eq!(
            HostValue::Map(HostMap::new([])).type_name(),
            "java.util.HashMap"
        );
        let array = HostArray::new(JType::class(famous_classes::string_class()), vec![]);
        assert_eq!(HostValue::Array(array).type_name(), "java.lang.String[]");
    }

    #[test]
    fn set_keeps_insertion_order_without_duplicates() {
        let set = HostSet::new(vec![HostValue::int(2), HostValue::int(1), HostValue::int(2)]);
        assert_eq!(set.values().unwrap(), vec![HostValue::int(2), HostValue::int(1)]);
    }

    #[test]
    fn missing_bundle_key_is_a_host_error() {
        let bundle = ResourceBundle::new("messages", [("hello".into(), "Hello {0}".into())]);
        assert_eq!(&*bundle.get_string("hello").unwrap(), "Hello {0}");
        assert_eq!(
            bundle.get_string("nope").unwrap_err().exception_class,
            "java.util.MissingResourceException"
        );
    }
}
