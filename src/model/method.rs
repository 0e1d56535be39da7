use std::sync::Arc;

use crate::{
    error::Result,
    model::{ModelRef, TemplateMethodModel, TemplateModel},
    overload::{CallableMemberDescriptor, OverloadedMethods, unwrap_arguments},
    runtime::{HostValue, MethodInfo},
    wrapper::ObjectWrapper,
};

/// A method bound to its receiver; the receiver is ignored for static methods.
pub struct SimpleMethodModel {
    receiver: HostValue,
    member: CallableMemberDescriptor,
    wrapper: Arc<ObjectWrapper>,
}

impl SimpleMethodModel {
    pub fn new(receiver: HostValue, method: Arc<MethodInfo>, wrapper: Arc<ObjectWrapper>) -> Self {
        SimpleMethodModel {
            receiver,
            member: CallableMemberDescriptor::Method(method),
            wrapper,
        }
    }

    pub fn member(&self) -> &CallableMemberDescriptor {
        &self.member
    }
}

impl TemplateModel for SimpleMethodModel {
    fn as_method(&self) -> Option<&dyn TemplateMethodModel> {
        Some(self)
    }
}

impl TemplateMethodModel for SimpleMethodModel {
    fn exec(&self, args: &[Option<ModelRef>]) -> Result<Option<ModelRef>> {
        let args = unwrap_arguments(&self.member, args)?;
        let result = self.member.invoke(&self.receiver, &args)?;
        Ok(self.wrapper.wrap(result))
    }
}

/// Same-named methods bound to a receiver; the member is chosen on each call from the
/// arguments.
pub struct OverloadedMethodsModel {
    receiver: HostValue,
    methods: Arc<OverloadedMethods>,
    wrapper: Arc<ObjectWrapper>,
}

impl OverloadedMethodsModel {
    pub fn new(
        receiver: HostValue,
        methods: Arc<OverloadedMethods>,
        wrapper: Arc<ObjectWrapper>,
    ) -> Self {
        OverloadedMethodsModel {
            receiver,
            methods,
            wrapper,
        }
    }

    pub fn members(&self) -> &[CallableMemberDescriptor] {
        self.methods.members()
    }
}

impl TemplateModel for OverloadedMethodsModel {
    fn as_method(&self) -> Option<&dyn TemplateMethodModel> {
        Some(self)
    }
}

impl TemplateMethodModel for OverloadedMethodsModel {
    fn exec(&self, args: &[Option<ModelRef>]) -> Result<Option<ModelRef>> {
        let selected = self.methods.resolve(args)?;
        let result = selected.invoke(&self.receiver)?;
        Ok(self.wrapper.wrap(result))
    }
}
