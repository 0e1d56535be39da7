use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    error::{Error, HostError, Result},
    model::{
        ModelRef, TemplateCollectionModel, TemplateHashModel, TemplateHashModelEx, TemplateModel,
        TemplateSequenceModel, WrapperTemplateModel,
    },
    runtime::{CollectionAccess, HostArray, HostValue, IteratorAccess, ListAccess, MapAccess},
    wrapper::ObjectWrapper,
};

fn container_failure(container: &HostValue, member: &str, source: HostError) -> Error {
    Error::Invocation {
        receiver: format!("{} object", container.type_name()),
        member: member.to_string(),
        source,
    }
}

/// Exposes a host array as a sequence.
pub struct ArrayModel {
    array: HostArray,
    wrapper: Arc<ObjectWrapper>,
}

impl ArrayModel {
    pub fn new(array: HostArray, wrapper: Arc<ObjectWrapper>) -> Self {
        ArrayModel { array, wrapper }
    }
}

impl TemplateModel for ArrayModel {
    fn as_sequence(&self) -> Option<&dyn TemplateSequenceModel> {
        Some(self)
    }

    fn as_collection(&self) -> Option<&dyn TemplateCollectionModel> {
        Some(self)
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperTemplateModel> {
        Some(self)
    }
}

impl TemplateSequenceModel for ArrayModel {
    fn get(&self, index: usize) -> Result<Option<ModelRef>> {
        Ok(self
            .array
            .get(index)
            .and_then(|item| self.wrapper.wrap(item)))
    }

    fn size(&self) -> Result<usize> {
        Ok(self.array.len())
    }
}

impl TemplateCollectionModel for ArrayModel {
    fn items(&self) -> Result<Vec<Option<ModelRef>>> {
        Ok(self
            .array
            .to_vec()
            .into_iter()
            .map(|item| self.wrapper.wrap(item))
            .collect())
    }
}

impl WrapperTemplateModel for ArrayModel {
    fn wrapped_object(&self) -> HostValue {
        HostValue::Array(self.array.clone())
    }
}

/// Exposes a `java.util.List` as a sequence that can also be listed.
pub struct ListModel {
    list: Arc<dyn ListAccess>,
    wrapper: Arc<ObjectWrapper>,
}

impl ListModel {
    pub fn new(list: Arc<dyn ListAccess>, wrapper: Arc<ObjectWrapper>) -> Self {
        ListModel { list, wrapper }
    }

    fn failure(&self, member: &str, source: HostError) -> Error {
        container_failure(&self.wrapped_object(), member, source)
    }
}

impl TemplateModel for ListModel {
    fn as_sequence(&self) -> Option<&dyn TemplateSequenceModel> {
        Some(self)
    }

    fn as_collection(&self) -> Option<&dyn TemplateCollectionModel> {
        Some(self)
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperTemplateModel> {
        Some(self)
    }
}

impl TemplateSequenceModel for ListModel {
    fn get(&self, index: usize) -> Result<Option<ModelRef>> {
        if index >= self.list.size() {
            return Ok(None);
        }
        let item = self
            .list
            .get(index)
            .map_err(|source| self.failure("java.util.List.get(int)", source))?;
        Ok(self.wrapper.wrap(item))
    }

    fn size(&self) -> Result<usize> {
        Ok(self.list.size())
    }
}

impl TemplateCollectionModel for ListModel {
    fn items(&self) -> Result<Vec<Option<ModelRef>>> {
        let items = self
            .list
            .to_vec()
            .map_err(|source| self.failure("java.util.List.iterator()", source))?;
        Ok(items.into_iter().map(|item| self.wrapper.wrap(item)).collect())
    }
}

impl WrapperTemplateModel for ListModel {
    fn wrapped_object(&self) -> HostValue {
        HostValue::List(Arc::clone(&self.list))
    }
}

/// Exposes a set or other non-list collection; it can be listed, but not indexed.
pub struct CollectionModel {
    collection: Arc<dyn CollectionAccess>,
    wrapper: Arc<ObjectWrapper>,
}

impl CollectionModel {
    pub fn new(collection: Arc<dyn CollectionAccess>, wrapper: Arc<ObjectWrapper>) -> Self {
        CollectionModel {
            collection,
            wrapper,
        }
    }

    pub fn size(&self) -> usize {
        self.collection.size()
    }
}

impl TemplateModel for CollectionModel {
    fn as_collection(&self) -> Option<&dyn TemplateCollectionModel> {
        Some(self)
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperTemplateModel> {
        Some(self)
    }
}

impl TemplateCollectionModel for CollectionModel {
    fn items(&self) -> Result<Vec<Option<ModelRef>>> {
        let values = self.collection.values().map_err(|source| {
            container_failure(&self.wrapped_object(), "java.util.Collection.iterator()", source)
        })?;
        Ok(values.into_iter().map(|item| self.wrapper.wrap(item)).collect())
    }
}

impl WrapperTemplateModel for CollectionModel {
    fn wrapped_object(&self) -> HostValue {
        HostValue::Set(Arc::clone(&self.collection))
    }
}

/// Exposes a `java.util.Map` as a hash keyed by the map keys.
pub struct MapModel {
    map: Arc<dyn MapAccess>,
    wrapper: Arc<ObjectWrapper>,
}

impl MapModel {
    pub fn new(map: Arc<dyn MapAccess>, wrapper: Arc<ObjectWrapper>) -> Self {
        MapModel { map, wrapper }
    }

    fn failure(&self, member: &str, source: HostError) -> Error {
        container_failure(&self.wrapped_object(), member, source)
    }
}

impl TemplateModel for MapModel {
    fn as_hash(&self) -> Option<&dyn TemplateHashModel> {
        Some(self)
    }

    fn as_hash_ex(&self) -> Option<&dyn TemplateHashModelEx> {
        Some(self)
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperTemplateModel> {
        Some(self)
    }
}

impl TemplateHashModel for MapModel {
    fn get(&self, key: &str) -> Result<Option<ModelRef>> {
        let value = self
            .map
            .get(key)
            .map_err(|source| self.failure("java.util.Map.get(Object)", source))?;
        Ok(value.and_then(|value| self.wrapper.wrap(value)))
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.map.size() == 0)
    }
}

impl TemplateHashModelEx for MapModel {
    fn size(&self) -> Result<usize> {
        Ok(self.map.size())
    }

    fn keys(&self) -> Result<Vec<Arc<str>>> {
        self.map
            .keys()
            .map_err(|source| self.failure("java.util.Map.keySet()", source))
    }

    fn values(&self) -> Result<Vec<Option<ModelRef>>> {
        self.keys()?
            .iter()
            .map(|key| TemplateHashModel::get(self, key))
            .collect()
    }
}

impl WrapperTemplateModel for MapModel {
    fn wrapped_object(&self) -> HostValue {
        HostValue::Map(Arc::clone(&self.map))
    }
}

/// Exposes an iterator as a collection that can be listed once.
pub struct IteratorModel {
    iterator: Arc<dyn IteratorAccess>,
    wrapper: Arc<ObjectWrapper>,
    consumed: AtomicBool,
}

impl IteratorModel {
    pub fn new(iterator: Arc<dyn IteratorAccess>, wrapper: Arc<ObjectWrapper>) -> Self {
        IteratorModel {
            iterator,
            wrapper,
            consumed: AtomicBool::new(false),
        }
    }
}

impl TemplateModel for IteratorModel {
    fn as_collection(&self) -> Option<&dyn TemplateCollectionModel> {
        Some(self)
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperTemplateModel> {
        Some(self)
    }
}

impl TemplateCollectionModel for IteratorModel {
    fn items(&self) -> Result<Vec<Option<ModelRef>>> {
        if self.consumed.swap(true, Ordering::AcqRel) {
            return Err(Error::Model(
                "this collection value wraps an iterator, thus it can be listed only once".to_string(),
            ));
        }
        let mut items = vec![];
        while let Some(item) = self.iterator.next() {
            items.push(self.wrapper.wrap(item));
        }
        Ok(items)
    }
}

impl WrapperTemplateModel for IteratorModel {
    fn wrapped_object(&self) -> HostValue {
        HostValue::Iterator(Arc::clone(&self.iterator))
    }
}
