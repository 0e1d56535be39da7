use std::cmp::Ordering;

use crate::{
    overload::{
        CallableMemberDescriptor, NumberClass, TypeFlags, add_fallback_type,
        argument_conversion_price, compare_number_type_specificity,
        number_util::BIG_MANTISSA_LOSS_PRICE,
    },
    runtime::{HostValue, JType, famous_classes, inheritance},
    unwrap::Unwrapped,
};

/// The type of an unwrapped argument as far as overload selection is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ArgumentType {
    Null,
    Number(NumberClass),
    /// A one-character string where both characters and strings are accepted.
    CharacterOrString,
    Other(JType),
}

/// Outcome of choosing among the members of a subset.
#[derive(Debug, Clone)]
pub(crate) enum Selection {
    Found(CallableMemberDescriptor),
    NoSuchMember,
    Ambiguous(Vec<CallableMemberDescriptor>),
}

/// The argument types of one call; the key of the resolution memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ArgumentTypes {
    types: Vec<ArgumentType>,
}

impl ArgumentTypes {
    /// `flags` are the type flags of the parameter count the arguments were unwrapped for;
    /// numbers get a fallback type where the flags are widened.
    pub(crate) fn new(args: &[Unwrapped], flags: &[TypeFlags]) -> Self {
        let types = args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                if arg.character_or_string {
                    return ArgumentType::CharacterOrString;
                }
                match &arg.value {
                    HostValue::Null => ArgumentType::Null,
                    HostValue::Number(number) => {
                        let position_flags = flags
                            .get(index.min(flags.len().saturating_sub(1)))
                            .copied()
                            .unwrap_or_default();
                        if position_flags.contains(TypeFlags::WIDENED_NUMERICAL_UNWRAPPING_HINT) {
                            ArgumentType::Number(add_fallback_type(number, position_flags))
                        } else {
                            ArgumentType::Number(NumberClass::of(number))
                        }
                    }
                    other => match other.runtime_type() {
                        Some(t) => ArgumentType::Other(t),
                        None => ArgumentType::Null,
                    },
                }
            })
            .collect();
        ArgumentTypes { types }
    }

    pub(crate) fn get(&self, index: usize) -> &ArgumentType {
        &self.types[index]
    }

    /// Picks the most specific applicable member, like the host language does at compile time
    /// but with the runtime types of the arguments.
    pub(crate) fn most_specific(
        &self,
        members: &[CallableMemberDescriptor],
        varargs: bool,
    ) -> Selection {
        let applicables: Vec<&CallableMemberDescriptor> = members
            .iter()
            .filter(|member| self.is_applicable(member.parameters(), varargs))
            .collect();
        match applicables.as_slice() {
            [] => return Selection::NoSuchMember,
            [only] => return Selection::Found((*only).clone()),
            _ => {}
        }
        let mut maximals: Vec<&CallableMemberDescriptor> = vec![];
        for applicable in applicables {
            let mut less_specific = false;
            maximals.retain(|maximal| {
                match self.compare_parameter_lists(
                    applicable.parameters(),
                    maximal.parameters(),
                    varargs,
                ) {
                    Ordering::Greater => false,
                    Ordering::Less => {
                        less_specific = true;
                        true
                    }
                    Ordering::Equal => true,
                }
            });
            if !less_specific {
                maximals.push(applicable);
            }
        }
        match maximals.as_slice() {
            [only] => Selection::Found((*only).clone()),
            _ => Selection::Ambiguous(maximals.into_iter().cloned().collect()),
        }
    }

    fn is_applicable(&self, formals: &[JType], varargs: bool) -> bool {
        let fixed_count = formals.len() - usize::from(varargs);
        let count_matches = if varargs {
            self.types.len() >= fixed_count
        } else {
            self.types.len() == fixed_count
        };
        if !count_matches {
            return false;
        }
        let fixed_ok = formals[..fixed_count]
            .iter()
            .zip(&self.types)
            .all(|(formal, actual)| is_method_invocation_convertible(formal, actual));
        if !fixed_ok {
            return false;
        }
        if !varargs {
            return true;
        }
        let Some(component) = formals.last().and_then(JType::component_type) else {
            return false;
        };
        self.types[fixed_count..]
            .iter()
            .all(|actual| is_method_invocation_convertible(component, actual))
    }

    /// `Greater` if the first parameter list is preferable for these arguments.
    fn compare_parameter_lists(
        &self,
        params1: &[JType],
        params2: &[JType],
        varargs: bool,
    ) -> Ordering {
        let mut wins1 = Wins::default();
        let mut wins2 = Wins::default();
        for (index, arg_type) in self.types.iter().enumerate() {
            let param1 = param_type(params1, index, varargs);
            let param2 = param_type(params2, index, varargs);
            if param1 == param2 {
                continue;
            }
            match compare_parameters(arg_type, param1, param2) {
                (Ordering::Greater, strength) => wins1.add(strength),
                (Ordering::Less, strength) => wins2.add(strength),
                (Ordering::Equal, _) => {}
            }
        }
        let by_wins = wins1.cmp(&wins2);
        if by_wins != Ordering::Equal || !varargs || wins1.any() {
            return by_wins;
        }
        self.compare_varargs_tie(params1, params2)
    }

    /// Members that are equally good for the given arguments: the one with more fixed
    /// parameters wins; with an empty varargs section the varargs component types decide.
    fn compare_varargs_tie(&self, params1: &[JType], params2: &[JType]) -> Ordering {
        if params1.len() != params2.len() {
            return params1.len().cmp(&params2.len());
        }
        let arg_count = self.types.len();
        if arg_count + 1 != params1.len() {
            return Ordering::Equal;
        }
        let param1 = param_type(params1, arg_count, true);
        let param2 = param_type(params2, arg_count, true);
        if param1.is_numerical() && param2.is_numerical() {
            let by_rank = compare_number_type_specificity(param1, param2);
            if by_rank != 0 {
                return by_rank.cmp(&0);
            }
        }
        let object = ArgumentType::Other(JType::class(famous_classes::object_class()));
        compare_type_specificity(&object, param1, param2).0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strength {
    Weak,
    Normal,
    Strong,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Wins {
    strong: usize,
    normal: usize,
    weak: usize,
}

impl Wins {
    fn add(&mut self, strength: Strength) {
        match strength {
            Strength::Strong => self.strong += 1,
            Strength::Normal => self.normal += 1,
            Strength::Weak => self.weak += 1,
        }
    }

    fn any(&self) -> bool {
        self.strong + self.normal + self.weak > 0
    }

    fn cmp(&self, other: &Wins) -> Ordering {
        self.strong
            .cmp(&other.strong)
            .then(self.normal.cmp(&other.normal))
            .then(self.weak.cmp(&other.weak))
    }
}

fn param_type(params: &[JType], index: usize, varargs: bool) -> &JType {
    match params.len().checked_sub(1) {
        Some(last) if varargs && index >= last => {
            params[last].component_type().unwrap_or(&params[last])
        }
        _ => &params[index],
    }
}

/// Which of two different parameter types suits the argument better, and how decisively.
fn compare_parameters(arg_type: &ArgumentType, param1: &JType, param2: &JType) -> (Ordering, Strength) {
    let price = |param: &JType| match arg_type {
        ArgumentType::Number(class) if param.is_numerical() => {
            argument_conversion_price(*class, &param.boxed())
        }
        _ => u32::MAX,
    };
    let (price1, price2) = (price(param1), price(param2));
    match (price1, price2) {
        (u32::MAX, u32::MAX) => compare_type_specificity(arg_type, param1, param2),
        (_, u32::MAX) => (Ordering::Greater, Strength::Normal),
        (u32::MAX, _) => (Ordering::Less, Strength::Normal),
        _ if price1 != price2 => {
            let (winner, loser) = (price1.min(price2), price1.max(price2));
            let strength = if winner < BIG_MANTISSA_LOSS_PRICE && loser > BIG_MANTISSA_LOSS_PRICE {
                Strength::Strong
            } else {
                Strength::Normal
            };
            (price2.cmp(&price1), strength)
        }
        _ => (
            param1.is_primitive().cmp(&param2.is_primitive()),
            Strength::Weak,
        ),
    }
}

/// Narrower types win; of a primitive and its box the primitive wins.
fn compare_type_specificity(
    arg_type: &ArgumentType,
    param1: &JType,
    param2: &JType,
) -> (Ordering, Strength) {
    let (boxed1, boxed2) = (param1.boxed(), param2.boxed());
    if boxed1 == boxed2 {
        return (
            param1.is_primitive().cmp(&param2.is_primitive()),
            Strength::Weak,
        );
    }
    if inheritance::is_assignable_from(&boxed2, &boxed1) {
        return (Ordering::Greater, Strength::Normal);
    }
    if inheritance::is_assignable_from(&boxed1, &boxed2) {
        return (Ordering::Less, Strength::Normal);
    }
    if *arg_type == ArgumentType::CharacterOrString {
        let character = famous_classes::character_class();
        return match (boxed1.is_class(character), boxed2.is_class(character)) {
            (false, true) => (Ordering::Greater, Strength::Normal),
            (true, false) => (Ordering::Less, Strength::Normal),
            _ => (Ordering::Equal, Strength::Weak),
        };
    }
    (Ordering::Equal, Strength::Weak)
}

fn is_method_invocation_convertible(formal: &JType, actual: &ArgumentType) -> bool {
    match actual {
        ArgumentType::Null => !formal.is_primitive(),
        ArgumentType::Other(actual) => {
            if inheritance::is_assignable_from(formal, actual) {
                return true;
            }
            if formal.is_primitive() && formal.boxed() == *actual {
                return true;
            }
            // lists and arrays are converted into each other on invocation
            let list = JType::class(famous_classes::list_class());
            (formal.is_array() && inheritance::is_assignable_from(&list, actual))
                || (actual.is_array() && inheritance::is_assignable_from(formal, &list))
        }
        ArgumentType::Number(class) => {
            class.is_assignable_to(formal)
                || formal.is_numerical()
                    && argument_conversion_price(*class, &formal.boxed()) != u32::MAX
        }
        ArgumentType::CharacterOrString => {
            let string = JType::class(famous_classes::string_class());
            inheritance::is_assignable_from(formal, &string)
                || formal.boxed().is_class(famous_classes::character_class())
        }
    }
}
