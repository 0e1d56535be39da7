use dashmap::DashMap;

use crate::{
    error::Result,
    model::ModelRef,
    overload::{
        ArgumentType, ArgumentTypes, CallableMemberDescriptor, MemberAndArguments, NumberClass,
        Selection, TypeFlags, force_number_to_type,
    },
    runtime::{HostArray, HostValue, JType, famous_classes, inheritance},
    unwrap::{self, Unwrapped},
};

/// Why a subset couldn't produce a member for the arguments.
#[derive(Debug, Clone)]
pub(crate) enum EmptyResult {
    WrongArgumentCount,
    /// The argument at this 1-based position couldn't be unwrapped to the hint type.
    Unconvertible(usize),
    NoSuchMember(Vec<HostValue>),
    Ambiguous(Vec<CallableMemberDescriptor>, Vec<HostValue>),
}

/// The fixed-arity or the varargs members of an overloaded method, with the unwrapping hints
/// and type flags merged per parameter count.
pub(crate) struct OverloadedMethodsSubset {
    varargs: bool,
    members: Vec<CallableMemberDescriptor>,
    hints: Vec<Option<Vec<JType>>>,
    flags: Vec<Option<Vec<TypeFlags>>>,
    memo: DashMap<ArgumentTypes, Selection>,
}

impl OverloadedMethodsSubset {
    pub(crate) fn new(varargs: bool) -> Self {
        OverloadedMethodsSubset {
            varargs,
            members: vec![],
            hints: vec![],
            flags: vec![],
            memo: DashMap::new(),
        }
    }

    pub(crate) fn members(&self) -> &[CallableMemberDescriptor] {
        &self.members
    }

    pub(crate) fn add_member(&mut self, member: CallableMemberDescriptor) {
        let mut parameters = member.parameters().to_vec();
        if self.varargs {
            if let Some(last) = parameters.last_mut() {
                if let Some(component) = last.component_type() {
                    *last = component.clone();
                }
            }
        }
        self.members.push(member);
        self.memo.clear();

        let count = parameters.len();
        if self.hints.len() <= count {
            self.hints.resize(count + 1, None);
            self.flags.resize(count + 1, None);
        }
        match &mut self.hints[count] {
            Some(hints) => {
                for (hint, parameter) in hints.iter_mut().zip(&parameters) {
                    *hint = common_supertype_for_unwrapping_hint(hint, parameter);
                }
            }
            slot @ None => *slot = Some(parameters.clone()),
        }
        let parameter_flags: Vec<TypeFlags> = parameters.iter().map(TypeFlags::of_type).collect();
        self.merge_in_type_flags(count, &parameter_flags);
        if self.varargs {
            self.widen_for_varargs(&parameters, &parameter_flags);
        }
    }

    fn merge_in_type_flags(&mut self, count: usize, source: &[TypeFlags]) {
        let source_at = |index: usize| {
            source
                .get(index.min(source.len().saturating_sub(1)))
                .copied()
                .unwrap_or_default()
        };
        match &mut self.flags[count] {
            slot @ None => *slot = Some((0..count).map(source_at).collect()),
            Some(flags) => {
                for (index, flag) in flags.iter_mut().enumerate() {
                    *flag = flag.merge(source_at(index));
                }
            }
        }
    }

    /// A varargs member also stands for the calls with one parameter less and with any number
    /// of repeated trailing parameters, so the hints of those counts are widened with it, and
    /// its own hints with those of the members added earlier.
    fn widen_for_varargs(&mut self, parameters: &[JType], parameter_flags: &[TypeFlags]) {
        let count = parameters.len();
        if let Some(shorter) = (0..count).rev().find(|&i| self.hints[i].is_some()) {
            let shorter_hints = self.hints[shorter].clone().unwrap_or_default();
            let shorter_flags = self.flags[shorter].clone().unwrap_or_default();
            self.widen_hints(count, &shorter_hints, &shorter_flags);
        }
        if let Some(Some(longer_hints)) = self.hints.get(count + 1).cloned() {
            let longer_flags = self.flags[count + 1].clone().unwrap_or_default();
            self.widen_hints(count, &longer_hints, &longer_flags);
        }
        for longer in count + 1..self.hints.len() {
            self.widen_hints(longer, parameters, parameter_flags);
        }
        if count > 0 {
            self.widen_hints(count - 1, parameters, parameter_flags);
        }
    }

    fn widen_hints(&mut self, count: usize, widening: &[JType], widening_flags: &[TypeFlags]) {
        let Some(hints) = &mut self.hints[count] else {
            return;
        };
        for (index, hint) in hints.iter_mut().enumerate() {
            let widening_type = match widening.get(index).or(widening.last()) {
                Some(t) => t,
                None => break,
            };
            *hint = common_supertype_for_unwrapping_hint(hint, widening_type);
        }
        self.merge_in_type_flags(count, widening_flags);
    }

    fn type_flags(&self, count: usize) -> &[TypeFlags] {
        self.flags
            .get(count)
            .and_then(Option::as_deref)
            .unwrap_or_default()
    }

    fn select(&self, args: &[Unwrapped], flags: &[TypeFlags]) -> Selection {
        let argument_types = ArgumentTypes::new(args, flags);
        if let Some(selection) = self.memo.get(&argument_types) {
            return selection.clone();
        }
        let selection = argument_types.most_specific(&self.members, self.varargs);
        self.memo.insert(argument_types, selection.clone());
        selection
    }

    pub(crate) fn resolve(
        &self,
        args: &[Option<ModelRef>],
    ) -> Result<std::result::Result<MemberAndArguments, EmptyResult>> {
        if self.varargs {
            self.resolve_varargs(args)
        } else {
            self.resolve_fixed(args)
        }
    }

    fn resolve_fixed(
        &self,
        args: &[Option<ModelRef>],
    ) -> Result<std::result::Result<MemberAndArguments, EmptyResult>> {
        let count = args.len();
        let Some(Some(hints)) = self.hints.get(count) else {
            return Ok(Err(EmptyResult::WrongArgumentCount));
        };
        let flags = self.type_flags(count);
        let mut unwrapped = Vec::with_capacity(count);
        for (index, (arg, hint)) in args.iter().zip(hints).enumerate() {
            let position_flags = flags.get(index).copied().unwrap_or_default();
            match unwrap::try_unwrap_for_overload(arg.as_ref(), hint, position_flags)? {
                Some(value) => unwrapped.push(value),
                None => return Ok(Err(EmptyResult::Unconvertible(index + 1))),
            }
        }
        Ok(match self.select(&unwrapped, flags) {
            Selection::Found(member) => {
                let argument_types = ArgumentTypes::new(&unwrapped, flags);
                let args = finish_arguments(unwrapped, &argument_types, &member, flags)?;
                Ok(MemberAndArguments { member, args })
            }
            Selection::NoSuchMember => Err(EmptyResult::NoSuchMember(values(unwrapped))),
            Selection::Ambiguous(members) => Err(EmptyResult::Ambiguous(members, values(unwrapped))),
        })
    }

    fn resolve_varargs(
        &self,
        args: &[Option<ModelRef>],
    ) -> Result<std::result::Result<MemberAndArguments, EmptyResult>> {
        let arg_count = args.len();
        let mut found: Option<(Vec<Unwrapped>, &[TypeFlags])> = None;
        let mut unconvertible = None;
        let start = (arg_count + 1).min(self.hints.len().saturating_sub(1));
        'counts: for count in (1..=start).rev() {
            let Some(hints) = &self.hints[count] else {
                continue;
            };
            let flags = self.type_flags(count);
            let mut unwrapped = Vec::with_capacity(arg_count);
            for (index, arg) in args.iter().enumerate() {
                let position = index.min(count - 1);
                let position_flags = flags.get(position).copied().unwrap_or_default();
                match unwrap::try_unwrap_for_overload(arg.as_ref(), &hints[position], position_flags)? {
                    Some(value) => unwrapped.push(value),
                    None => {
                        unconvertible.get_or_insert(index + 1);
                        continue 'counts;
                    }
                }
            }
            found = Some((unwrapped, flags));
            break;
        }
        let Some((unwrapped, flags)) = found else {
            return Ok(Err(match unconvertible {
                Some(position) => EmptyResult::Unconvertible(position),
                None => EmptyResult::WrongArgumentCount,
            }));
        };

        Ok(match self.select(&unwrapped, flags) {
            Selection::Found(member) => {
                let packed = match pack_varargs(&member, args)? {
                    Ok(packed) => packed,
                    Err(position) => return Ok(Err(EmptyResult::Unconvertible(position))),
                };
                let fixed_count = member.parameters().len() - 1;
                let mut fixed: Vec<Unwrapped> = unwrapped.into_iter().take(fixed_count).collect();
                fixed.push(Unwrapped {
                    value: packed,
                    character_or_string: false,
                });
                let argument_types = ArgumentTypes::new(&fixed, flags);
                let args = finish_arguments(fixed, &argument_types, &member, flags)?;
                Ok(MemberAndArguments { member, args })
            }
            Selection::NoSuchMember => Err(EmptyResult::NoSuchMember(values(unwrapped))),
            Selection::Ambiguous(members) => Err(EmptyResult::Ambiguous(members, values(unwrapped))),
        })
    }
}

fn values(unwrapped: Vec<Unwrapped>) -> Vec<HostValue> {
    unwrapped.into_iter().map(|u| u.value).collect()
}

/// Unwraps the arguments from the varargs position on to the component type and packs them into
/// an array. `Err` carries the 1-based position of an argument that doesn't fit.
fn pack_varargs(
    member: &CallableMemberDescriptor,
    args: &[Option<ModelRef>],
) -> Result<std::result::Result<HostValue, usize>> {
    let parameters = member.parameters();
    let fixed_count = parameters.len() - 1;
    let Some(component) = parameters[fixed_count].component_type() else {
        return Ok(Err(fixed_count + 1));
    };
    let mut items = Vec::with_capacity(args.len().saturating_sub(fixed_count));
    for (index, arg) in args.iter().enumerate().skip(fixed_count) {
        match unwrap::try_unwrap_to(arg.as_ref(), component, TypeFlags::empty())? {
            Some(value) if !(value.is_null() && component.is_primitive()) => items.push(value),
            _ => return Ok(Err(index + 1)),
        }
    }
    Ok(Ok(HostValue::Array(HostArray::new(component.clone(), items))))
}

/// Applies the conversions overload selection has only promised: numbers are forced to the
/// chosen parameter type where the candidates disagreed on it, undecided one-character strings
/// become characters for character parameters, and lists and arrays are converted into each
/// other.
fn finish_arguments(
    unwrapped: Vec<Unwrapped>,
    argument_types: &ArgumentTypes,
    member: &CallableMemberDescriptor,
    flags: &[TypeFlags],
) -> Result<Vec<HostValue>> {
    let parameters = member.parameters();
    unwrapped
        .into_iter()
        .enumerate()
        .map(|(index, arg)| {
            let parameter_index = index.min(parameters.len() - 1);
            let parameter = &parameters[parameter_index];
            let widened = flags
                .get(parameter_index)
                .is_some_and(|f| f.contains(TypeFlags::WIDENED_NUMERICAL_UNWRAPPING_HINT));
            match arg.value {
                HostValue::Number(number) if widened => {
                    let class = match argument_types.get(index) {
                        ArgumentType::Number(class) => *class,
                        _ => NumberClass::of(&number),
                    };
                    Ok(HostValue::Number(
                        force_number_to_type(&number, parameter, class).unwrap_or(number),
                    ))
                }
                HostValue::String(text)
                    if arg.character_or_string
                        && parameter.boxed().is_class(famous_classes::character_class()) =>
                {
                    Ok(text.chars().next().map_or(HostValue::String(text), HostValue::Char))
                }
                HostValue::List(list) if parameter.is_array() => list_to_array(&list, parameter),
                HostValue::Array(array)
                    if !parameter.is_array()
                        && !inheritance::is_instance(parameter, &HostValue::Array(array.clone())) =>
                {
                    Ok(HostValue::List(crate::runtime::HostList::new(array.to_vec())))
                }
                value => Ok(value),
            }
        })
        .collect()
}

fn list_to_array(
    list: &std::sync::Arc<dyn crate::runtime::ListAccess>,
    array_type: &JType,
) -> Result<HostValue> {
    if let Some(model) = list.template_model() {
        return unwrap::unwrap_to(Some(&model), array_type);
    }
    let component = array_type.component_type().cloned().unwrap_or_else(|| {
        JType::class(famous_classes::object_class())
    });
    let items = list.to_vec().map_err(|source| crate::error::Error::Invocation {
        receiver: "java.util.List object".to_string(),
        member: "java.util.List.toArray()".to_string(),
        source,
    })?;
    Ok(HostValue::Array(HostArray::new(component, items)))
}

/// The type arguments at a position are unwrapped to when several members share a parameter
/// count.
pub(crate) fn common_supertype_for_unwrapping_hint(c1: &JType, c2: &JType) -> JType {
    if c1 == c2 {
        return c1.clone();
    }
    let object = JType::class(famous_classes::object_class());
    let (boxed1, boxed2) = (c1.boxed(), c2.boxed());
    if c1.is_primitive() || c2.is_primitive() {
        if boxed1 == boxed2 {
            return boxed1;
        }
    }
    if c1.is_numerical() && c2.is_numerical() {
        return JType::class(famous_classes::number_class());
    }
    if c1.is_primitive() || c2.is_primitive() {
        return object;
    }

    let supertypes2 = inheritance::supertypes(c2);
    let common: Vec<JType> = inheritance::supertypes(c1)
        .into_iter()
        .filter(|t| supertypes2.contains(t))
        .collect();
    // the maximally specific common supertypes
    let mut maximals: Vec<JType> = common
        .iter()
        .filter(|candidate| {
            !common
                .iter()
                .any(|other| other != *candidate && inheritance::is_assignable_from(candidate, other))
        })
        .cloned()
        .collect();
    maximals.retain(|t| *t != object);
    if maximals.len() > 1 {
        maximals.retain(|t| {
            ![
                famous_classes::cloneable_class(),
                famous_classes::serializable_class(),
                famous_classes::comparable_class(),
            ]
            .into_iter()
            .any(|marker| t.is_class(marker))
        });
    }
    match maximals.as_slice() {
        [only] => only.clone(),
        _ => object,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{model::SimpleScalar, runtime::PrimitiveType};
    use pretty_assertions::assert_eq;

    fn class(name: &str) -> JType {
        JType::class(&famous_classes::resolve(name).unwrap())
    }

    #[test]
    fn unwrapping_hints_merge_to_common_supertypes() {
        let int = JType::Primitive(PrimitiveType::Int);
        assert_eq!(
            common_supertype_for_unwrapping_hint(&int, &class("java.lang.Integer")),
            class("java.lang.Integer")
        );
        assert_eq!(
            common_supertype_for_unwrapping_hint(&int, &JType::Primitive(PrimitiveType::Long)),
            class("java.lang.Number")
        );
        assert_eq!(
            common_supertype_for_unwrapping_hint(&int, &class("java.lang.String")),
            class("java.lang.Object")
        );
        assert_eq!(
            common_supertype_for_unwrapping_hint(
                &class("java.util.ArrayList"),
                &class("java.util.HashSet")
            ),
            class("java.util.Collection")
        );
        assert_eq!(
            common_supertype_for_unwrapping_hint(
                &class("java.lang.String"),
                &class("java.lang.Integer")
            ),
            class("java.lang.Object")
        );
    }

    #[test]
    fn varargs_report_the_first_unconvertible_argument() {
        let mut subset = OverloadedMethodsSubset::new(true);
        subset.hints = vec![
            None,
            None,
            Some(vec![class("java.lang.Integer"), class("java.lang.String")]),
            Some(vec![
                class("java.lang.String"),
                class("java.lang.Integer"),
                class("java.lang.Integer"),
            ]),
        ];
        let args: Vec<Option<ModelRef>> = vec![
            Some(Arc::new(SimpleScalar::new("a"))),
            Some(Arc::new(SimpleScalar::new("b"))),
        ];

        // three parameters fail at the 2nd argument, two parameters at the 1st
        let result = subset.resolve(&args).unwrap();
        assert!(matches!(result, Err(EmptyResult::Unconvertible(2))), "{:?}", result.err());
    }
}
