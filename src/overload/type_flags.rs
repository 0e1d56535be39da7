use std::sync::Arc;

use crate::runtime::{Class, JType, PrimitiveType, famous_classes, inheritance};

bitflags::bitflags! {
    /// What an overloaded parameter position accepts, merged over every candidate that has a
    /// parameter there. Guides argument unwrapping during overload selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        /// The candidates disagree on a numerical type at this position, so the unwrapped number
        /// gets a fallback type and is forced to the chosen parameter type afterwards.
        const WIDENED_NUMERICAL_UNWRAPPING_HINT = 1;

        const BYTE = 4;
        const SHORT = 8;
        const INTEGER = 16;
        const LONG = 32;
        const FLOAT = 64;
        const DOUBLE = 128;
        const BIG_INTEGER = 256;
        const BIG_DECIMAL = 512;
        const UNKNOWN_NUMERICAL_TYPE = 1024;

        const ACCEPTS_NUMBER = 0x800;
        const ACCEPTS_DATE = 0x1000;
        const ACCEPTS_STRING = 0x2000;
        const ACCEPTS_BOOLEAN = 0x4000;
        const ACCEPTS_MAP = 0x8000;
        const ACCEPTS_LIST = 0x10000;
        const ACCEPTS_SET = 0x20000;
        const ACCEPTS_ARRAY = 0x40000;
        const CHARACTER = 0x80000;

        const ACCEPTS_ANY_OBJECT = Self::ACCEPTS_NUMBER.bits()
            | Self::ACCEPTS_DATE.bits()
            | Self::ACCEPTS_STRING.bits()
            | Self::ACCEPTS_BOOLEAN.bits()
            | Self::ACCEPTS_MAP.bits()
            | Self::ACCEPTS_LIST.bits()
            | Self::ACCEPTS_SET.bits()
            | Self::ACCEPTS_ARRAY.bits()
            | Self::CHARACTER.bits();

        const MASK_KNOWN_INTEGERS = Self::BYTE.bits()
            | Self::SHORT.bits()
            | Self::INTEGER.bits()
            | Self::LONG.bits()
            | Self::BIG_INTEGER.bits();
        const MASK_KNOWN_NONINTEGERS =
            Self::FLOAT.bits() | Self::DOUBLE.bits() | Self::BIG_DECIMAL.bits();
        const MASK_ALL_KNOWN_NUMERICALS =
            Self::MASK_KNOWN_INTEGERS.bits() | Self::MASK_KNOWN_NONINTEGERS.bits();
        const MASK_ALL_NUMERICALS =
            Self::MASK_ALL_KNOWN_NUMERICALS.bits() | Self::UNKNOWN_NUMERICAL_TYPE.bits();
    }
}

impl TypeFlags {
    pub fn of_type(t: &JType) -> TypeFlags {
        match t {
            JType::Primitive(primitive) => match primitive {
                PrimitiveType::Int => TypeFlags::INTEGER | TypeFlags::ACCEPTS_NUMBER,
                PrimitiveType::Long => TypeFlags::LONG | TypeFlags::ACCEPTS_NUMBER,
                PrimitiveType::Double => TypeFlags::DOUBLE | TypeFlags::ACCEPTS_NUMBER,
                PrimitiveType::Float => TypeFlags::FLOAT | TypeFlags::ACCEPTS_NUMBER,
                PrimitiveType::Byte => TypeFlags::BYTE | TypeFlags::ACCEPTS_NUMBER,
                PrimitiveType::Short => TypeFlags::SHORT | TypeFlags::ACCEPTS_NUMBER,
                PrimitiveType::Boolean => TypeFlags::ACCEPTS_BOOLEAN,
                PrimitiveType::Char => TypeFlags::CHARACTER,
            },
            JType::Array(_) => TypeFlags::ACCEPTS_ARRAY,
            JType::Class(class) => {
                if t.is_object() {
                    return TypeFlags::ACCEPTS_ANY_OBJECT;
                }
                if t.is_class(famous_classes::string_class()) {
                    return TypeFlags::ACCEPTS_STRING;
                }
                if t.is_numerical() {
                    return Self::numerical_class_flags(t) | TypeFlags::ACCEPTS_NUMBER;
                }
                let accepts = |source: &Arc<Class>| {
                    inheritance::is_class_assignable_from(class, source)
                };
                let mut flags = TypeFlags::empty();
                for (source, flag) in [
                    (famous_classes::string_class(), TypeFlags::ACCEPTS_STRING),
                    (famous_classes::number_class(), TypeFlags::ACCEPTS_NUMBER),
                    (famous_classes::date_class(), TypeFlags::ACCEPTS_DATE),
                    (famous_classes::boolean_class(), TypeFlags::ACCEPTS_BOOLEAN),
                    (famous_classes::map_class(), TypeFlags::ACCEPTS_MAP),
                    (famous_classes::list_class(), TypeFlags::ACCEPTS_LIST),
                    (famous_classes::set_class(), TypeFlags::ACCEPTS_SET),
                ] {
                    if accepts(source) {
                        flags |= flag;
                    }
                }
                if t.is_class(famous_classes::character_class()) {
                    flags |= TypeFlags::CHARACTER;
                }
                flags
            }
        }
    }

    fn numerical_class_flags(t: &JType) -> TypeFlags {
        [
            (famous_classes::integer_class(), TypeFlags::INTEGER),
            (famous_classes::long_class(), TypeFlags::LONG),
            (famous_classes::double_class(), TypeFlags::DOUBLE),
            (famous_classes::float_class(), TypeFlags::FLOAT),
            (famous_classes::byte_class(), TypeFlags::BYTE),
            (famous_classes::short_class(), TypeFlags::SHORT),
            (famous_classes::big_decimal_class(), TypeFlags::BIG_DECIMAL),
            (famous_classes::big_integer_class(), TypeFlags::BIG_INTEGER),
        ]
        .into_iter()
        .find(|(class, _)| t.is_class(class))
        .map_or(TypeFlags::UNKNOWN_NUMERICAL_TYPE, |(_, flag)| flag)
    }

    /// Merges the flags of two candidates at the same position.
    pub fn merge(self, other: TypeFlags) -> TypeFlags {
        if self == other {
            return self;
        }
        let merged = self | other;
        if merged.intersects(TypeFlags::MASK_ALL_NUMERICALS) {
            merged | TypeFlags::WIDENED_NUMERICAL_UNWRAPPING_HINT
        } else {
            merged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn class(name: &str) -> JType {
        JType::class(&famous_classes::resolve(name).unwrap())
    }

    #[test]
    fn flags_of_common_parameter_types() {
        assert_eq!(
            TypeFlags::of_type(&JType::Primitive(PrimitiveType::Int)),
            TypeFlags::INTEGER | TypeFlags::ACCEPTS_NUMBER
        );
        assert_eq!(
            TypeFlags::of_type(&class("java.lang.Number")),
            TypeFlags::UNKNOWN_NUMERICAL_TYPE | TypeFlags::ACCEPTS_NUMBER
        );
        assert_eq!(TypeFlags::of_type(&class("java.lang.Object")), TypeFlags::ACCEPTS_ANY_OBJECT);
        assert_eq!(
            TypeFlags::of_type(&class("java.util.Collection")),
            TypeFlags::ACCEPTS_LIST | TypeFlags::ACCEPTS_SET
        );
        assert_eq!(
            TypeFlags::of_type(&class("java.lang.CharSequence")),
            TypeFlags::ACCEPTS_STRING
        );
        assert_eq!(
            TypeFlags::of_type(&JType::array_of(class("java.lang.String"))),
            TypeFlags::ACCEPTS_ARRAY
        );
    }

    #[test]
    fn merging_differing_numerical_flags_widens() {
        let int = TypeFlags::INTEGER | TypeFlags::ACCEPTS_NUMBER;
        let long = TypeFlags::LONG | TypeFlags::ACCEPTS_NUMBER;
        assert_eq!(int.merge(int), int);
        assert!(int.merge(long).contains(TypeFlags::WIDENED_NUMERICAL_UNWRAPPING_HINT));
        assert!(
            !TypeFlags::ACCEPTS_STRING
                .merge(TypeFlags::ACCEPTS_MAP)
                .contains(TypeFlags::WIDENED_NUMERICAL_UNWRAPPING_HINT)
        );
    }
}
