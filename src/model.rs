mod bean;
mod collection;
mod method;
mod resource_bundle;
mod simple;
mod static_models;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use bean::BeanModel;
pub use collection::{ArrayModel, CollectionModel, IteratorModel, ListModel, MapModel};
pub use method::{OverloadedMethodsModel, SimpleMethodModel};
pub use resource_bundle::ResourceBundleModel;
pub use simple::{BooleanModel, SimpleDate, SimpleHash, SimpleNumber, SimpleScalar, SimpleSequence};
pub use static_models::{ClassBasedModelFactory, EnumModels, StaticModel, StaticModels};

use crate::{
    error::Result,
    runtime::{HostValue, JType, Number},
};

pub type ModelRef = Arc<dyn TemplateModel>;

/// A value of the template language. `None` in an `Option<ModelRef>` stands for null.
///
/// A model can have several capabilities at once (a bean is a hash and, if it wraps a string,
/// also a scalar); each `as_*` accessor returns the capability if the model has it.
pub trait TemplateModel: Send + Sync {
    fn as_scalar(&self) -> Option<&dyn TemplateScalarModel> {
        None
    }

    fn as_number(&self) -> Option<&dyn TemplateNumberModel> {
        None
    }

    fn as_boolean(&self) -> Option<&dyn TemplateBooleanModel> {
        None
    }

    fn as_date(&self) -> Option<&dyn TemplateDateModel> {
        None
    }

    fn as_hash(&self) -> Option<&dyn TemplateHashModel> {
        None
    }

    fn as_hash_ex(&self) -> Option<&dyn TemplateHashModelEx> {
        None
    }

    fn as_sequence(&self) -> Option<&dyn TemplateSequenceModel> {
        None
    }

    fn as_collection(&self) -> Option<&dyn TemplateCollectionModel> {
        None
    }

    fn as_method(&self) -> Option<&dyn TemplateMethodModel> {
        None
    }

    fn as_adapter(&self) -> Option<&dyn AdapterTemplateModel> {
        None
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperTemplateModel> {
        None
    }
}

pub trait TemplateScalarModel {
    fn get_as_string(&self) -> Result<Arc<str>>;
}

pub trait TemplateNumberModel {
    fn get_as_number(&self) -> Result<Number>;
}

pub trait TemplateBooleanModel {
    fn get_as_boolean(&self) -> Result<bool>;
}

pub trait TemplateDateModel {
    fn get_as_date(&self) -> Result<DateTime<Utc>>;
}

pub trait TemplateHashModel {
    /// `Ok(None)` when the key is missing or its value is null.
    fn get(&self, key: &str) -> Result<Option<ModelRef>>;

    fn is_empty(&self) -> Result<bool>;
}

/// A hash that can also enumerate its keys.
pub trait TemplateHashModelEx {
    fn size(&self) -> Result<usize>;

    fn keys(&self) -> Result<Vec<Arc<str>>>;

    fn values(&self) -> Result<Vec<Option<ModelRef>>>;
}

pub trait TemplateSequenceModel {
    /// `Ok(None)` for null items and indexes past the end.
    fn get(&self, index: usize) -> Result<Option<ModelRef>>;

    fn size(&self) -> Result<usize>;
}

pub trait TemplateCollectionModel {
    /// Lists the items. One-shot collections fail when listed a second time.
    fn items(&self) -> Result<Vec<Option<ModelRef>>>;
}

pub trait TemplateMethodModel {
    fn exec(&self, args: &[Option<ModelRef>]) -> Result<Option<ModelRef>>;
}

/// A model that adapts a host value; unwrapping gives back the adapted value.
pub trait AdapterTemplateModel {
    /// `hint` is the type the caller would like to receive; adapters may ignore it.
    fn adapted_object(&self, hint: &JType) -> HostValue;
}

/// A model that wraps a host value; unwrapping gives back the wrapped value.
pub trait WrapperTemplateModel {
    fn wrapped_object(&self) -> HostValue;
}

/// Describes the capabilities of a model for diagnostics, like `"string"` or
/// `"extended_hash+string (com.example.Name wrapped)"`.
pub fn type_description(model: Option<&ModelRef>) -> String {
    let Some(model) = model else {
        return "Null".to_string();
    };
    let mut capabilities = vec![];
    if model.as_scalar().is_some() {
        capabilities.push("string");
    }
    if model.as_number().is_some() {
        capabilities.push("number");
    }
    if model.as_boolean().is_some() {
        capabilities.push("boolean");
    }
    if model.as_date().is_some() {
        capabilities.push("date");
    }
    if model.as_hash_ex().is_some() {
        capabilities.push("extended_hash");
    } else if model.as_hash().is_some() {
        capabilities.push("hash");
    }
    if model.as_sequence().is_some() {
        capabilities.push("sequence");
    } else if model.as_collection().is_some() {
        capabilities.push("collection");
    }
    if model.as_method().is_some() {
        capabilities.push("method");
    }
    let mut description = if capabilities.is_empty() {
        "unknown".to_string()
    } else {
        capabilities.join("+")
    };
    if let Some(wrapper) = model.as_wrapper() {
        description.push_str(&format!(" ({} wrapped)", wrapper.wrapped_object().type_name()));
    } else if let Some(adapter) = model.as_adapter() {
        let hint = JType::class(crate::runtime::famous_classes::object_class());
        description.push_str(&format!(" ({} adapted)", adapter.adapted_object(&hint).type_name()));
    }
    description
}

/// Pointer identity of a model, used to key identity maps.
pub(crate) fn model_identity(model: &ModelRef) -> usize {
    Arc::as_ptr(model) as *const () as usize
}
