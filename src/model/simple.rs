use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::{
    error::Result,
    model::{
        ModelRef, TemplateBooleanModel, TemplateDateModel, TemplateHashModel, TemplateHashModelEx,
        TemplateModel, TemplateNumberModel, TemplateScalarModel, TemplateSequenceModel,
    },
    runtime::Number,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleScalar {
    value: Arc<str>,
}

impl SimpleScalar {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        SimpleScalar {
            value: value.into(),
        }
    }
}

impl TemplateModel for SimpleScalar {
    fn as_scalar(&self) -> Option<&dyn TemplateScalarModel> {
        Some(self)
    }
}

impl TemplateScalarModel for SimpleScalar {
    fn get_as_string(&self) -> Result<Arc<str>> {
        Ok(Arc::clone(&self.value))
    }
}

#[derive(Debug, Clone)]
pub struct SimpleNumber {
    value: Number,
}

impl SimpleNumber {
    pub fn new(value: Number) -> Self {
        SimpleNumber { value }
    }
}

impl TemplateModel for SimpleNumber {
    fn as_number(&self) -> Option<&dyn TemplateNumberModel> {
        Some(self)
    }
}

impl TemplateNumberModel for SimpleNumber {
    fn get_as_number(&self) -> Result<Number> {
        Ok(self.value.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanModel {
    value: bool,
}

impl BooleanModel {
    pub fn new(value: bool) -> Self {
        BooleanModel { value }
    }
}

impl TemplateModel for BooleanModel {
    fn as_boolean(&self) -> Option<&dyn TemplateBooleanModel> {
        Some(self)
    }
}

impl TemplateBooleanModel for BooleanModel {
    fn get_as_boolean(&self) -> Result<bool> {
        Ok(self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleDate {
    value: DateTime<Utc>,
}

impl SimpleDate {
    pub fn new(value: DateTime<Utc>) -> Self {
        SimpleDate { value }
    }
}

impl TemplateModel for SimpleDate {
    fn as_date(&self) -> Option<&dyn TemplateDateModel> {
        Some(self)
    }
}

impl TemplateDateModel for SimpleDate {
    fn get_as_date(&self) -> Result<DateTime<Utc>> {
        Ok(self.value)
    }
}

/// A list of template values. Only a sequence: it can't be listed as a collection.
#[derive(Default, Clone)]
pub struct SimpleSequence {
    items: Vec<Option<ModelRef>>,
}

impl SimpleSequence {
    pub fn new(items: Vec<Option<ModelRef>>) -> Self {
        SimpleSequence { items }
    }
}

impl TemplateModel for SimpleSequence {
    fn as_sequence(&self) -> Option<&dyn TemplateSequenceModel> {
        Some(self)
    }
}

impl TemplateSequenceModel for SimpleSequence {
    fn get(&self, index: usize) -> Result<Option<ModelRef>> {
        Ok(self.items.get(index).cloned().flatten())
    }

    fn size(&self) -> Result<usize> {
        Ok(self.items.len())
    }
}

/// An insertion ordered hash of template values.
#[derive(Default, Clone)]
pub struct SimpleHash {
    entries: IndexMap<Arc<str>, Option<ModelRef>>,
}

impl SimpleHash {
    pub fn new(entries: impl IntoIterator<Item = (Arc<str>, Option<ModelRef>)>) -> Self {
        SimpleHash {
            entries: entries.into_iter().collect(),
        }
    }
}

impl TemplateModel for SimpleHash {
    fn as_hash(&self) -> Option<&dyn TemplateHashModel> {
        Some(self)
    }

    fn as_hash_ex(&self) -> Option<&dyn TemplateHashModelEx> {
        Some(self)
    }
}

impl TemplateHashModel for SimpleHash {
    fn get(&self, key: &str) -> Result<Option<ModelRef>> {
        Ok(self.entries.get(key).cloned().flatten())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.entries.is_empty())
    }
}

impl TemplateHashModelEx for SimpleHash {
    fn size(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn keys(&self) -> Result<Vec<Arc<str>>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn values(&self) -> Result<Vec<Option<ModelRef>>> {
        Ok(self.entries.values().cloned().collect())
    }
}
