mod argument_types;
mod callable;
pub(crate) mod number_util;
mod subset;
mod type_flags;

pub(crate) use argument_types::{ArgumentType, ArgumentTypes, Selection};
pub use callable::{CallableMemberDescriptor, MemberAndArguments, unwrap_arguments};
pub use number_util::{
    NumberClass, add_fallback_type, argument_conversion_price, compare_number_type_specificity,
    force_number_to_type, force_unwrapped_number_to_type,
};
pub use type_flags::TypeFlags;

use crate::{
    error::{Error, Result},
    model::{self, ModelRef},
    runtime::HostValue,
};
use subset::{EmptyResult, OverloadedMethodsSubset};

/// The same-named methods (or the constructors) of a class, choosing the member to call based on
/// the arguments.
///
/// Fixed arity members are tried first; the varargs members only when none of those fit.
pub struct OverloadedMethods {
    fixed: OverloadedMethodsSubset,
    varargs: Option<OverloadedMethodsSubset>,
}

impl Default for OverloadedMethods {
    fn default() -> Self {
        OverloadedMethods::new()
    }
}

impl OverloadedMethods {
    pub fn new() -> Self {
        OverloadedMethods {
            fixed: OverloadedMethodsSubset::new(false),
            varargs: None,
        }
    }

    pub fn add_member(&mut self, member: CallableMemberDescriptor) {
        if member.is_varargs() {
            self.varargs
                .get_or_insert_with(|| OverloadedMethodsSubset::new(true))
                .add_member(member.clone());
        }
        self.fixed.add_member(member);
    }

    /// Every member, in the order they were added.
    pub fn members(&self) -> &[CallableMemberDescriptor] {
        self.fixed.members()
    }

    /// Picks the most specific member applicable to `args` and unwraps the arguments for it.
    pub fn resolve(&self, args: &[Option<ModelRef>]) -> Result<MemberAndArguments> {
        let fixed_result = match self.fixed.resolve(args)? {
            Ok(found) => return Ok(found),
            Err(empty) => empty,
        };
        let varargs_result = match &self.varargs {
            Some(varargs) => match varargs.resolve(args)? {
                Ok(found) => return Ok(found),
                Err(empty) => Some(empty),
            },
            None => None,
        };
        Err(self.no_such_member_error(fixed_result, varargs_result, args))
    }

    fn no_such_member_error(
        &self,
        fixed_result: EmptyResult,
        varargs_result: Option<EmptyResult>,
        args: &[Option<ModelRef>],
    ) -> Error {
        let ambiguous = |result: &EmptyResult| matches!(result, EmptyResult::Ambiguous(..));
        let (mut message, is_ambiguous) = match varargs_result {
            Some(varargs_result) if matches!(fixed_result, EmptyResult::WrongArgumentCount) => {
                let is_ambiguous = ambiguous(&varargs_result);
                (describe(&varargs_result, args), is_ambiguous)
            }
            Some(varargs_result) => {
                let is_ambiguous = ambiguous(&fixed_result) || ambiguous(&varargs_result);
                let message = format!(
                    "When trying to call the non-varargs overloads:\n{}\nWhen trying to call the varargs overloads:\n{}",
                    describe(&fixed_result, args),
                    describe(&varargs_result, args),
                );
                (message, is_ambiguous)
            }
            None => (describe(&fixed_result, args), ambiguous(&fixed_result)),
        };
        message.push_str("\nThe matching overload was searched among these members:\n    ");
        message.push_str(&declarations(self.members()));
        if is_ambiguous {
            Error::AmbiguousOverload(message)
        } else {
            Error::NoCompatibleOverload(message)
        }
    }
}

fn describe(result: &EmptyResult, args: &[Option<ModelRef>]) -> String {
    let mut message = match result {
        EmptyResult::WrongArgumentCount => {
            return "No compatible overloaded variation was found; wrong number of arguments."
                .to_string();
        }
        EmptyResult::Unconvertible(position) => format!(
            "No compatible overloaded variation was found; can't convert (unwrap) the {} argument to the desired Java type.",
            ordinal(*position)
        ),
        EmptyResult::NoSuchMember(_) => "No compatible overloaded variation was found; declared parameter types and argument value types mismatch.".to_string(),
        EmptyResult::Ambiguous(members, _) => format!(
            "Multiple compatible overloaded variations were found with the same priority.\nThe tied candidates were:\n    {}",
            declarations(members)
        ),
    };
    let model_types: Vec<String> = args
        .iter()
        .map(|arg| model::type_description(arg.as_ref()))
        .collect();
    message.push_str(&format!(
        "\nThe FTL type of the argument values were: {}.",
        model_types.join(", ")
    ));
    if let EmptyResult::NoSuchMember(values) | EmptyResult::Ambiguous(_, values) = result {
        let java_types: Vec<String> = values.iter().map(java_type_name).collect();
        message.push_str(&format!(
            "\nThe Java type of the argument values were: {}.",
            java_types.join(", ")
        ));
    }
    message
}

fn java_type_name(value: &HostValue) -> String {
    value
        .runtime_type()
        .map_or_else(|| "null".to_string(), |t| t.short_name())
}

fn declarations(members: &[CallableMemberDescriptor]) -> String {
    members
        .iter()
        .map(CallableMemberDescriptor::declaration)
        .collect::<Vec<_>>()
        .join(",\n    ")
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        model::{SimpleNumber, SimpleScalar, SimpleSequence},
        runtime::{Class, ClassBuilder, ClassRegistry, Number},
    };
    use pretty_assertions::assert_eq;

    fn label(text: &'static str) -> impl Fn(&[HostValue]) -> crate::error::HostResult<HostValue> {
        move |_| Ok(HostValue::string(text))
    }

    fn overloads() -> Arc<Class> {
        let registry = ClassRegistry::new();
        registry
            .define(
                ClassBuilder::new("com.example.Overloads")
                    .static_method("f", "(Ljava/lang/Integer;)Ljava/lang/String;", label("Integer"))
                    .static_method("f", "(Ljava/lang/String;)Ljava/lang/String;", label("String"))
                    .static_method("f", "(Ljava/lang/Object;)Ljava/lang/String;", label("Object"))
                    .static_method(
                        "g",
                        "(Ljava/lang/Number;Ljava/lang/String;)Ljava/lang/String;",
                        label("Number, String"),
                    )
                    .static_method(
                        "g",
                        "(Ljava/lang/Integer;Ljava/lang/Object;)Ljava/lang/String;",
                        label("Integer, Object"),
                    )
                    .static_method("n", "(I)Ljava/lang/String;", label("int"))
                    .static_method("n", "(J)Ljava/lang/String;", label("long"))
                    .static_method("n", "(D)Ljava/lang/String;", label("double"))
                    .varargs_method("h", "([Ljava/lang/String;)Ljava/lang/String;", |_, args| {
                        let HostValue::Array(parts) = &args[0] else {
                            return Ok(HostValue::Null);
                        };
                        let parts: Vec<String> =
                            parts.to_vec().iter().map(HostValue::to_display_string).collect();
                        Ok(HostValue::string(format!("String...: {}", parts.join(","))))
                    })
                    .static_method("h", "(Ljava/lang/String;)Ljava/lang/String;", label("String")),
            )
            .unwrap()
    }

    fn methods(class: &Arc<Class>, name: &str) -> OverloadedMethods {
        let mut overloaded = OverloadedMethods::new();
        for method in class.declared_methods().iter().filter(|m| m.name() == name) {
            overloaded.add_member(CallableMemberDescriptor::Method(Arc::clone(method)));
        }
        overloaded
    }

    fn call(overloaded: &OverloadedMethods, args: &[Option<ModelRef>]) -> Result<String> {
        let found = overloaded.resolve(args)?;
        Ok(found.invoke(&HostValue::Null)?.to_display_string())
    }

    fn scalar(s: &str) -> Option<ModelRef> {
        Some(Arc::new(SimpleScalar::new(s)))
    }

    fn number(n: Number) -> Option<ModelRef> {
        Some(Arc::new(SimpleNumber::new(n)))
    }

    #[test]
    fn most_specific_member_wins() {
        let class = overloads();
        let f = methods(&class, "f");
        assert_eq!(call(&f, &[number(Number::Int(1))]).unwrap(), "Integer");
        assert_eq!(call(&f, &[scalar("x")]).unwrap(), "String");
        let sequence: Option<ModelRef> = Some(Arc::new(SimpleSequence::new(vec![])));
        assert_eq!(call(&f, &[sequence]).unwrap(), "Object");
        // null fits both Integer and String
        assert!(matches!(f.resolve(&[None]), Err(Error::AmbiguousOverload(_))));
    }

    #[test]
    fn selection_is_deterministic() {
        let class = overloads();
        let n = methods(&class, "n");
        for _ in 0..3 {
            assert_eq!(call(&n, &[number(Number::Int(1))]).unwrap(), "int");
            assert_eq!(call(&n, &[number(Number::Long(1 << 40))]).unwrap(), "long");
            assert_eq!(call(&n, &[number(Number::Double(1.5))]).unwrap(), "double");
        }
        // the exact type beats converting a whole double
        assert_eq!(call(&n, &[number(Number::Double(2.0))]).unwrap(), "double");
    }

    #[test]
    fn crossing_candidates_are_ambiguous() {
        let class = overloads();
        let g = methods(&class, "g");
        let error = g.resolve(&[number(Number::Int(1)), scalar("x")]).unwrap_err();
        let Error::AmbiguousOverload(message) = error else {
            panic!("expected an ambiguity, got {error:?}");
        };
        assert!(message.starts_with(
            "Multiple compatible overloaded variations were found with the same priority."
        ));
        assert!(message.contains("The Java type of the argument values were: Integer, String."));
        assert!(message.ends_with(
            "The matching overload was searched among these members:\n    \
             com.example.Overloads.g(Number, String),\n    \
             com.example.Overloads.g(Integer, Object)"
        ));

        // the second argument only fits one of them
        assert_eq!(call(&g, &[number(Number::Int(1)), number(Number::Int(2))]).unwrap(), "Integer, Object");
    }

    #[test]
    fn varargs_members_are_the_last_resort() {
        let class = overloads();
        let h = methods(&class, "h");
        assert_eq!(call(&h, &[scalar("a")]).unwrap(), "String");
        assert_eq!(call(&h, &[scalar("a"), scalar("b")]).unwrap(), "String...: a,b");
        assert_eq!(call(&h, &[]).unwrap(), "String...: ");
    }

    #[test]
    fn wrong_argument_count_is_reported() {
        let class = overloads();
        let f = methods(&class, "f");
        let error = f.resolve(&[]).unwrap_err();
        let Error::NoCompatibleOverload(message) = error else {
            panic!("expected no compatible overload, got {error:?}");
        };
        assert!(message.starts_with(
            "No compatible overloaded variation was found; wrong number of arguments."
        ));
    }

    #[test]
    fn ordinals() {
        let ordinals: Vec<String> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 101].map(ordinal).to_vec();
        assert_eq!(
            ordinals,
            ["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "101st"]
        );
    }
}
