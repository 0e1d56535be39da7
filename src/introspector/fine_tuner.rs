use std::sync::Arc;

use crate::{
    introspector::PropertyDescriptor,
    runtime::{Class, MethodInfo},
};

/// Customizes how a method appears on the exposed surface of a class: under another name, as
/// a property, or not at all.
///
/// Introspectors are shared between object wrappers with equal settings, so an implementation
/// must only depend on its input.
pub trait MethodAppearanceFineTuner: Send + Sync {
    fn process(&self, input: &DecisionInput<'_>, decision: &mut Decision);

    /// Whether introspectors using this fine tuner may be shared process-wide.
    fn is_shareable(&self) -> bool {
        false
    }
}

pub struct DecisionInput<'a> {
    pub method: &'a Arc<MethodInfo>,
    pub containing_class: &'a Arc<Class>,
}

#[derive(Debug, Clone)]
pub struct Decision {
    /// Also expose the method as this read-only property.
    pub expose_as_property: Option<PropertyDescriptor>,
    /// Let [`Decision::expose_as_property`] replace a property discovered from the getters.
    pub replace_existing_property: bool,
    /// The key the method is exposed under; `None` hides it.
    pub expose_method_as: Option<Arc<str>>,
    /// Whether the method replaces a same-named property.
    pub method_shadows_property: bool,
}

impl Decision {
    pub(crate) fn defaults(method: &MethodInfo) -> Self {
        Decision {
            expose_as_property: None,
            replace_existing_property: false,
            expose_method_as: Some(Arc::clone(&method.name)),
            method_shadows_property: true,
        }
    }
}
