use std::sync::Arc;

use crate::{
    error::{Error, Result},
    model::{self, ModelRef},
    runtime::{ConstructorInfo, HostArray, HostValue, JType, MethodInfo},
    unwrap::try_unwrap_to,
    overload::TypeFlags,
};

/// A method or constructor as seen by overload resolution.
#[derive(Clone)]
pub enum CallableMemberDescriptor {
    Method(Arc<MethodInfo>),
    Constructor(Arc<ConstructorInfo>),
}

impl CallableMemberDescriptor {
    pub fn parameters(&self) -> &[JType] {
        match self {
            CallableMemberDescriptor::Method(method) => method.parameters(),
            CallableMemberDescriptor::Constructor(constructor) => constructor.parameters(),
        }
    }

    pub fn is_varargs(&self) -> bool {
        match self {
            CallableMemberDescriptor::Method(method) => method.is_varargs(),
            CallableMemberDescriptor::Constructor(constructor) => constructor.is_varargs(),
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            CallableMemberDescriptor::Method(method) => method.is_static(),
            CallableMemberDescriptor::Constructor(_) => false,
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, CallableMemberDescriptor::Constructor(_))
    }

    pub fn name(&self) -> &str {
        match self {
            CallableMemberDescriptor::Method(method) => method.name(),
            CallableMemberDescriptor::Constructor(constructor) => {
                let class = constructor.declaring_class_name();
                class.rsplit_once('.').map_or(class, |(_, simple)| simple)
            }
        }
    }

    pub fn declaration(&self) -> String {
        match self {
            CallableMemberDescriptor::Method(method) => method.declaration(),
            CallableMemberDescriptor::Constructor(constructor) => constructor.declaration(),
        }
    }

    /// Calls the member; `receiver` is ignored for constructors and static methods.
    pub fn invoke(&self, receiver: &HostValue, args: &[HostValue]) -> Result<HostValue> {
        match self {
            CallableMemberDescriptor::Method(method) => {
                method
                    .invoke(receiver, args)
                    .map_err(|source| Error::Invocation {
                        receiver: if method.is_static() {
                            format!("class {}", method.declaring_class_name())
                        } else {
                            format!("{} object", receiver.type_name())
                        },
                        member: method.declaration(),
                        source,
                    })
            }
            CallableMemberDescriptor::Constructor(constructor) => {
                constructor
                    .invoke(args)
                    .map_err(|source| Error::Construction {
                        class: constructor.declaring_class_name().to_string(),
                        constructor: constructor.declaration(),
                        source,
                    })
            }
        }
    }

    pub(crate) fn same_member(&self, other: &CallableMemberDescriptor) -> bool {
        match (self, other) {
            (CallableMemberDescriptor::Method(a), CallableMemberDescriptor::Method(b)) => {
                Arc::ptr_eq(a, b)
            }
            (
                CallableMemberDescriptor::Constructor(a),
                CallableMemberDescriptor::Constructor(b),
            ) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for CallableMemberDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.declaration())
    }
}

/// A resolved member together with its unwrapped arguments.
#[derive(Debug, Clone)]
pub struct MemberAndArguments {
    pub member: CallableMemberDescriptor,
    pub args: Vec<HostValue>,
}

impl MemberAndArguments {
    pub fn invoke(&self, receiver: &HostValue) -> Result<HostValue> {
        self.member.invoke(receiver, &self.args)
    }
}

/// Unwraps the arguments of a non-overloaded member to its declared parameter types.
///
/// The last argument of a varargs call is first tried as the whole varargs array, then as its
/// first item.
pub fn unwrap_arguments(
    member: &CallableMemberDescriptor,
    args: &[Option<ModelRef>],
) -> Result<Vec<HostValue>> {
    let parameters = member.parameters();
    let varargs = member.is_varargs();
    let fixed_count = parameters.len() - usize::from(varargs);
    if varargs && args.len() < fixed_count {
        return Err(argument_count_error(member, "at least ", fixed_count, args.len()));
    }
    if !varargs && args.len() != fixed_count {
        return Err(argument_count_error(member, "", fixed_count, args.len()));
    }

    let mut unwrapped = Vec::with_capacity(parameters.len());
    for (index, (arg, parameter)) in args.iter().zip(&parameters[..fixed_count]).enumerate() {
        unwrapped.push(unwrap_argument(member, index, arg.as_ref(), parameter)?);
    }
    if !varargs {
        return Ok(unwrapped);
    }

    let array_type = &parameters[fixed_count];
    let Some(component) = array_type.component_type() else {
        return Err(Error::Model(format!(
            "varargs parameter of {} is not an array",
            member.declaration()
        )));
    };
    let rest = &args[fixed_count..];
    if let [single] = rest {
        if let Some(array) = try_unwrap_to(single.as_ref(), array_type, TypeFlags::empty())? {
            unwrapped.push(array);
            return Ok(unwrapped);
        }
    }
    let items = rest
        .iter()
        .enumerate()
        .map(|(offset, arg)| unwrap_argument(member, fixed_count + offset, arg.as_ref(), component))
        .collect::<Result<Vec<_>>>()?;
    unwrapped.push(HostValue::Array(HostArray::new(component.clone(), items)));
    Ok(unwrapped)
}

fn unwrap_argument(
    member: &CallableMemberDescriptor,
    index: usize,
    arg: Option<&ModelRef>,
    parameter: &JType,
) -> Result<HostValue> {
    let Some(value) = try_unwrap_to(arg, parameter, TypeFlags::empty())? else {
        return Err(Error::ArgumentTypeMismatch {
            member: member.declaration(),
            position: index + 1,
            target: parameter.short_name(),
            actual: model::type_description(arg),
        });
    };
    if value.is_null() && parameter.is_primitive() {
        return Err(Error::NullToPrimitive {
            member: member.declaration(),
            position: index + 1,
            target: parameter.short_name(),
        });
    }
    Ok(value)
}

fn argument_count_error(
    member: &CallableMemberDescriptor,
    expectation: &'static str,
    expected: usize,
    given: usize,
) -> Error {
    Error::ArgumentCount {
        member: member.declaration(),
        expectation,
        expected,
        given,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{SimpleNumber, SimpleScalar, SimpleSequence},
        runtime::{ClassBuilder, ClassRegistry, Number},
    };
    use pretty_assertions::assert_eq;

    fn joiner() -> CallableMemberDescriptor {
        let registry = ClassRegistry::new();
        let class = registry
            .define(ClassBuilder::new("com.example.Text").varargs_method(
                "join",
                "(I[Ljava/lang/String;)Ljava/lang/String;",
                |_, args| {
                    let HostValue::Array(parts) = &args[1] else {
                        return Ok(HostValue::Null);
                    };
                    let parts: Vec<String> =
                        parts.to_vec().iter().map(HostValue::to_display_string).collect();
                    Ok(HostValue::string(parts.join(",")))
                },
            ))
            .unwrap();
        CallableMemberDescriptor::Method(Arc::clone(&class.declared_methods()[0]))
    }

    fn scalar(s: &str) -> Option<ModelRef> {
        Some(Arc::new(SimpleScalar::new(s)))
    }

    #[test]
    fn varargs_items_are_collected_into_an_array() {
        let member = joiner();
        let one: Option<ModelRef> = Some(Arc::new(SimpleNumber::new(Number::Int(1))));
        let args = unwrap_arguments(&member, &[one.clone(), scalar("a"), scalar("b")]).unwrap();
        let result = member.invoke(&HostValue::Null, &args).unwrap();
        assert_eq!(result, HostValue::string("a,b"));

        let empty = unwrap_arguments(&member, &[one.clone()]).unwrap();
        assert_eq!(member.invoke(&HostValue::Null, &empty).unwrap(), HostValue::string(""));

        let sequence: Option<ModelRef> =
            Some(Arc::new(SimpleSequence::new(vec![scalar("x"), scalar("y")])));
        let direct = unwrap_arguments(&member, &[one, sequence]).unwrap();
        assert_eq!(member.invoke(&HostValue::Null, &direct).unwrap(), HostValue::string("x,y"));
    }

    #[test]
    fn argument_errors_name_the_position() {
        let member = joiner();
        assert!(matches!(
            unwrap_arguments(&member, &[]),
            Err(Error::ArgumentCount { expected: 1, given: 0, .. })
        ));
        assert!(matches!(
            unwrap_arguments(&member, &[None]),
            Err(Error::NullToPrimitive { position: 1, .. })
        ));
        let error = unwrap_arguments(&member, &[scalar("x")]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "com.example.Text.join(int, String...) couldn't be called: can't convert argument #1 to int; the type of the actual value was: string"
        );
    }
}
