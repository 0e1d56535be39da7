use std::sync::Arc;

use num_bigint::{BigInt, Sign};

use crate::{
    overload::TypeFlags,
    runtime::{BigDecimal, Class, JType, Number, famous_classes, inheritance},
};

/// A number's type as seen by overload selection. Besides the eight host number types there
/// are fallback types: a value of the first type that could also be losslessly (or within a
/// small tolerance) represented as the second, like an `Integer` that fits a `Byte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberClass {
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    IntegerBigDecimal,
    IntegerOrByte,
    IntegerOrShort,
    LongOrByte,
    LongOrShort,
    LongOrInteger,
    ShortOrByte,
    FloatOrByte,
    FloatOrShort,
    FloatOrInteger,
    DoubleOrByte,
    DoubleOrShort,
    DoubleOrInteger,
    DoubleOrIntegerOrFloat,
    DoubleOrLong,
    DoubleOrFloat,
    BigIntegerOrByte,
    BigIntegerOrShort,
    BigIntegerOrInteger,
    BigIntegerOrLong,
    BigIntegerOrFloat,
    BigIntegerOrDouble,
}

/// A conversion at least this expensive loses mantissa bits; winning against such a
/// conversion is a strong win.
pub const BIG_MANTISSA_LOSS_PRICE: u32 = 40000;

const MAX: u32 = u32::MAX;

/// Conversion prices, rows by target type (byte, short, int, long, float, double, BigInteger,
/// BigDecimal), columns by [`NumberClass`] in declaration order. `u32::MAX` means not
/// convertible.
#[rustfmt::skip]
const PRICES: [[u32; 30]; 8] = [
    [0, MAX, MAX, MAX, MAX, MAX, MAX, 45001, 35001, 22001, MAX, 23001, MAX, MAX, 21001, 23001, MAX, MAX, 25001, MAX, MAX, MAX, MAX, MAX, 18001, MAX, MAX, MAX, MAX, MAX],
    [10002, 0, MAX, MAX, MAX, MAX, MAX, 44002, 34002, 21002, 21002, 22002, 22002, MAX, 0, 22002, 22002, MAX, 24002, 24002, MAX, MAX, MAX, MAX, 17002, 17002, MAX, MAX, MAX, MAX],
    [10003, 10003, 0, MAX, MAX, MAX, MAX, 41003, 31003, 0, 0, 21003, 21003, 21003, 10003, 21003, 21003, 21003, 22003, 22003, 22003, 22003, MAX, MAX, 16003, 16003, 16003, MAX, MAX, MAX],
    [10004, 10004, 10004, 0, MAX, MAX, MAX, 41004, 31004, 10004, 10004, 0, 0, 0, 10004, 21004, 21004, 21004, 21004, 21004, 21004, 21004, 21004, MAX, 15004, 15004, 15004, 15004, MAX, MAX],
    [20006, 20006, 30006, 40006, 0, MAX, MAX, 33006, 33006, 24006, 24006, 24006, 24006, 30006, 20006, 0, 0, 0, 23006, 23006, 30006, 23006, 40006, 30006, 24006, 24006, 30006, 40006, 24006, 40006],
    [20007, 20007, 20007, 30007, 10007, 0, MAX, 32007, 32007, 20007, 20007, 21007, 21007, 21007, 20007, 10007, 10007, 10007, 0, 0, 0, 0, 0, 0, 20007, 20007, 20007, 30007, 20007, 20007],
    [10005, 10005, 10005, 10005, MAX, MAX, 0, 40005, 10005, 10005, 10005, 10005, 10005, 10005, 10005, 25005, 25005, 25005, 21005, 21005, 21005, 21005, 21005, MAX, 0, 0, 0, 0, 0, 0],
    [20008, 20008, 20008, 20008, 20008, 20008, 10008, 0, 0, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 20008, 10008, 10008, 10008, 10008, 10008, 10008],
];

const MAX_DOUBLE_OR_LONG: f64 = 9007199254740992.0;
const MAX_DOUBLE_OR_LONG_LOG_2: u64 = 53;
const MAX_FLOAT_OR_INT: i64 = 16777216;
const MAX_FLOAT_OR_INT_LOG_2: u64 = 24;
const LOWEST_ABOVE_ZERO: f64 = 0.000001;
const HIGHEST_BELOW_ONE: f64 = 0.999999;

/// Target types in price table row order.
fn target_classes() -> [&'static Arc<Class>; 8] {
    [
        famous_classes::byte_class(),
        famous_classes::short_class(),
        famous_classes::integer_class(),
        famous_classes::long_class(),
        famous_classes::float_class(),
        famous_classes::double_class(),
        famous_classes::big_integer_class(),
        famous_classes::big_decimal_class(),
    ]
}

fn target_index(target: &JType) -> Option<usize> {
    let boxed = target.boxed();
    target_classes().iter().position(|class| boxed.is_class(class))
}

impl NumberClass {
    pub fn of(number: &Number) -> NumberClass {
        match number {
            Number::Byte(_) => NumberClass::Byte,
            Number::Short(_) => NumberClass::Short,
            Number::Int(_) => NumberClass::Integer,
            Number::Long(_) => NumberClass::Long,
            Number::Float(_) => NumberClass::Float,
            Number::Double(_) => NumberClass::Double,
            Number::BigInteger(_) => NumberClass::BigInteger,
            Number::BigDecimal(_) => NumberClass::BigDecimal,
        }
    }

    /// `true` for the eight host number types, `false` for fallback types.
    pub fn is_plain(self) -> bool {
        (self as usize) < 8
    }

    /// The host class of a plain number type.
    pub fn plain_class(self) -> Option<&'static Arc<Class>> {
        target_classes().get(self as usize).copied()
    }

    /// Whether a parameter of type `formal` accepts this number without conversion. Fallback
    /// types only fit `Number` and its supertypes.
    pub fn is_assignable_to(self, formal: &JType) -> bool {
        match self.plain_class() {
            Some(class) => inheritance::is_assignable_from(formal, &JType::class(class)),
            None => {
                inheritance::is_assignable_from(formal, &JType::class(famous_classes::number_class()))
                    || formal.is_class(famous_classes::comparable_class())
            }
        }
    }

    /// Floating point values that were tagged as whole numbers; these round when forced to an
    /// integer type.
    fn is_rounded_whole_number(self) -> bool {
        matches!(
            self,
            NumberClass::FloatOrByte
                | NumberClass::FloatOrShort
                | NumberClass::FloatOrInteger
                | NumberClass::DoubleOrByte
                | NumberClass::DoubleOrShort
                | NumberClass::DoubleOrInteger
                | NumberClass::DoubleOrIntegerOrFloat
                | NumberClass::DoubleOrLong
        )
    }
}

/// The price of converting an argument of class `from` to a numerical parameter of type `to`;
/// `u32::MAX` when the conversion isn't allowed or `to` isn't a known number type.
pub fn argument_conversion_price(from: NumberClass, to: &JType) -> u32 {
    match target_index(to) {
        Some(row) => PRICES[row][from as usize],
        None => MAX,
    }
}

/// Positive if `c1` is the more specific (narrower) number type, negative if `c2` is; zero for
/// equal or unknown types.
pub fn compare_number_type_specificity(c1: &JType, c2: &JType) -> i32 {
    const RANKS: [i32; 8] = [1, 2, 3, 4, 6, 7, 5, 8];
    match (target_index(c1), target_index(c2)) {
        (Some(i1), Some(i2)) => RANKS[i2] - RANKS[i1],
        _ => 0,
    }
}

/// Tags a number with the narrower type it could also be, considering only the types the
/// candidates at this position accept.
pub fn add_fallback_type(number: &Number, flags: TypeFlags) -> NumberClass {
    let has = |flag: TypeFlags| flags.contains(flag);
    let in_range = |n: i64, min: i64, max: i64| n >= min && n <= max;
    let byte_range = |n: i64| in_range(n, i8::MIN as i64, i8::MAX as i64);
    let short_range = |n: i64| in_range(n, i16::MIN as i64, i16::MAX as i64);
    let int_range = |n: i64| in_range(n, i32::MIN as i64, i32::MAX as i64);

    match number {
        Number::BigDecimal(n) => {
            if flags.intersects(TypeFlags::MASK_KNOWN_INTEGERS)
                && flags.intersects(TypeFlags::MASK_KNOWN_NONINTEGERS)
                && n.is_whole()
            {
                NumberClass::IntegerBigDecimal
            } else {
                NumberClass::BigDecimal
            }
        }
        Number::Int(n) => {
            let n = *n as i64;
            if has(TypeFlags::BYTE) && byte_range(n) {
                NumberClass::IntegerOrByte
            } else if has(TypeFlags::SHORT) && short_range(n) {
                NumberClass::IntegerOrShort
            } else {
                NumberClass::Integer
            }
        }
        Number::Long(n) => {
            let n = *n;
            if has(TypeFlags::BYTE) && byte_range(n) {
                NumberClass::LongOrByte
            } else if has(TypeFlags::SHORT) && short_range(n) {
                NumberClass::LongOrShort
            } else if has(TypeFlags::INTEGER) && int_range(n) {
                NumberClass::LongOrInteger
            } else {
                NumberClass::Long
            }
        }
        Number::Double(d) => {
            let d = *d;
            if let Some((whole, exact)) = double_as_whole_number(d, flags) {
                if has(TypeFlags::BYTE) && byte_range(whole) {
                    return NumberClass::DoubleOrByte;
                } else if has(TypeFlags::SHORT) && short_range(whole) {
                    return NumberClass::DoubleOrShort;
                } else if has(TypeFlags::INTEGER) && int_range(whole) {
                    return if has(TypeFlags::FLOAT)
                        && in_range(whole, -MAX_FLOAT_OR_INT, MAX_FLOAT_OR_INT)
                    {
                        NumberClass::DoubleOrIntegerOrFloat
                    } else {
                        NumberClass::DoubleOrInteger
                    };
                } else if has(TypeFlags::LONG) && (exact || int_range(whole)) {
                    return NumberClass::DoubleOrLong;
                }
            }
            if has(TypeFlags::FLOAT) && d.abs() <= f32::MAX as f64 {
                NumberClass::DoubleOrFloat
            } else {
                NumberClass::Double
            }
        }
        Number::Float(f) => {
            let Some((whole, exact)) = float_as_whole_number(*f, flags) else {
                return NumberClass::Float;
            };
            if has(TypeFlags::BYTE) && byte_range(whole) {
                NumberClass::FloatOrByte
            } else if has(TypeFlags::SHORT) && short_range(whole) {
                NumberClass::FloatOrShort
            } else if has(TypeFlags::INTEGER) {
                NumberClass::FloatOrInteger
            } else if has(TypeFlags::LONG) {
                // inexact values are always in the byte range
                if exact {
                    NumberClass::FloatOrInteger
                } else {
                    NumberClass::FloatOrByte
                }
            } else {
                NumberClass::Float
            }
        }
        Number::Short(n) => {
            if has(TypeFlags::BYTE) && byte_range(*n as i64) {
                NumberClass::ShortOrByte
            } else {
                NumberClass::Short
            }
        }
        Number::Byte(_) => NumberClass::Byte,
        Number::BigInteger(n) => {
            let small_types = (TypeFlags::MASK_KNOWN_INTEGERS | TypeFlags::MASK_KNOWN_NONINTEGERS)
                .difference(TypeFlags::BIG_INTEGER | TypeFlags::BIG_DECIMAL);
            if !flags.intersects(small_types) {
                return NumberClass::BigInteger;
            }
            let bit_length = bit_length(n);
            let lowest_set_bit = n.trailing_zeros().unwrap_or(0);
            let fits_mantissa = |log_2: u64| {
                bit_length <= log_2 || bit_length == log_2 + 1 && lowest_set_bit >= log_2
            };
            if has(TypeFlags::BYTE) && bit_length <= 7 {
                NumberClass::BigIntegerOrByte
            } else if has(TypeFlags::SHORT) && bit_length <= 15 {
                NumberClass::BigIntegerOrShort
            } else if has(TypeFlags::INTEGER) && bit_length <= 31 {
                NumberClass::BigIntegerOrInteger
            } else if has(TypeFlags::LONG) && bit_length <= 63 {
                NumberClass::BigIntegerOrLong
            } else if has(TypeFlags::FLOAT) && fits_mantissa(MAX_FLOAT_OR_INT_LOG_2) {
                NumberClass::BigIntegerOrFloat
            } else if has(TypeFlags::DOUBLE) && fits_mantissa(MAX_DOUBLE_OR_LONG_LOG_2) {
                NumberClass::BigIntegerOrDouble
            } else {
                NumberClass::BigInteger
            }
        }
    }
}

/// The whole number a double is (within tolerance), and whether it's exact.
fn double_as_whole_number(d: f64, flags: TypeFlags) -> Option<(i64, bool)> {
    if !flags.intersects(TypeFlags::MASK_KNOWN_INTEGERS) || !(-MAX_DOUBLE_OR_LONG..=MAX_DOUBLE_OR_LONG).contains(&d) {
        return None;
    }
    let mut whole = d as i64;
    let diff = d - whole as f64;
    let exact = if diff == 0.0 {
        true
    } else if diff > 0.0 {
        if diff > HIGHEST_BELOW_ONE {
            whole += 1;
        } else if diff >= LOWEST_ABOVE_ZERO {
            return None;
        }
        false
    } else {
        if diff < -HIGHEST_BELOW_ONE {
            whole -= 1;
        } else if diff <= -LOWEST_ABOVE_ZERO {
            return None;
        }
        false
    };
    Some((whole, exact))
}

/// Like [`double_as_whole_number`]; tolerance is only applied in the byte range, as the
/// precision of floats is too low beyond that.
fn float_as_whole_number(f: f32, flags: TypeFlags) -> Option<(i64, bool)> {
    let max = MAX_FLOAT_OR_INT as f32;
    if !flags.intersects(TypeFlags::MASK_KNOWN_INTEGERS) || !(-max..=max).contains(&f) {
        return None;
    }
    let mut whole = f as i32 as i64;
    let diff = f as f64 - whole as f64;
    if diff == 0.0 {
        return Some((whole, true));
    }
    if whole < i8::MIN as i64 || whole > i8::MAX as i64 {
        return None;
    }
    if diff > 0.0 {
        if diff > 0.99999 {
            whole += 1;
        } else if diff >= 0.00001 {
            return None;
        }
    } else if diff < -0.99999 {
        whole -= 1;
    } else if diff <= -0.00001 {
        return None;
    }
    Some((whole, false))
}

/// Bit length of the two's complement form, excluding the sign bit.
fn bit_length(n: &BigInt) -> u64 {
    match n.sign() {
        Sign::Minus => (-n - 1u32).bits(),
        _ => n.bits(),
    }
}

/// Converts an unwrapped argument to the number type of the chosen parameter, with host casting
/// semantics. `None` if `target` is a number type that can't be produced.
pub fn force_unwrapped_number_to_type(number: &Number, target: &JType) -> Option<Number> {
    force_number_to_type(number, target, NumberClass::of(number))
}

/// Like [`force_unwrapped_number_to_type`], but floating point arguments that overload
/// selection treated as whole numbers are rounded instead of truncated.
pub fn force_number_to_type(number: &Number, target: &JType, class: NumberClass) -> Option<Number> {
    let boxed = target.boxed();
    if boxed.is_class(number.class()) {
        return Some(number.clone());
    }
    let rounded = class
        .is_rounded_whole_number()
        .then(|| number.double_value().round() as i64);
    let forced = match target_index(&boxed) {
        Some(0) => Number::Byte(rounded.map_or_else(|| number.byte_value(), |w| w as i8)),
        Some(1) => Number::Short(rounded.map_or_else(|| number.short_value(), |w| w as i16)),
        Some(2) => Number::Int(rounded.map_or_else(|| number.int_value(), |w| w as i32)),
        Some(3) => Number::Long(rounded.unwrap_or_else(|| number.long_value())),
        Some(4) => Number::Float(number.float_value()),
        Some(5) => Number::Double(number.double_value()),
        Some(6) => Number::BigInteger(match (number, rounded) {
            (Number::BigInteger(_) | Number::BigDecimal(_), _) => number.to_big_integer(),
            (_, Some(whole)) => BigInt::from(whole),
            _ => BigInt::from(number.long_value()),
        }),
        _ if inheritance::is_assignable_from(&boxed, &JType::class(number.class())) => {
            number.clone()
        }
        Some(7) => Number::BigDecimal(match number {
            Number::BigInteger(n) => BigDecimal::new(n.clone(), 0),
            Number::Float(_) | Number::Double(_) => BigDecimal::from_f64(number.double_value())?,
            other => BigDecimal::new(BigInt::from(other.long_value()), 0),
        }),
        _ => return None,
    };
    Some(forced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::PrimitiveType;
    use pretty_assertions::assert_eq;

    fn int_type() -> JType {
        JType::Primitive(PrimitiveType::Int)
    }

    fn class(c: &Arc<Class>) -> JType {
        JType::class(c)
    }

    #[test]
    fn prices_favour_lossless_conversions() {
        let long = class(famous_classes::long_class());
        let double = class(famous_classes::double_class());
        assert_eq!(argument_conversion_price(NumberClass::Integer, &int_type()), 0);
        assert_eq!(argument_conversion_price(NumberClass::Integer, &long), 10004);
        assert_eq!(argument_conversion_price(NumberClass::Long, &int_type()), u32::MAX);
        assert!(
            argument_conversion_price(NumberClass::Integer, &long)
                < argument_conversion_price(NumberClass::Integer, &double)
        );
        assert_eq!(
            argument_conversion_price(
                NumberClass::Integer,
                &class(famous_classes::number_class())
            ),
            u32::MAX
        );
    }

    #[test]
    fn binary_floating_point_never_converts_to_integers() {
        for from in [NumberClass::Double, NumberClass::Float, NumberClass::DoubleOrFloat] {
            for to in [
                famous_classes::byte_class(),
                famous_classes::short_class(),
                famous_classes::integer_class(),
                famous_classes::long_class(),
            ] {
                assert_eq!(argument_conversion_price(from, &class(to)), u32::MAX, "{from:?}");
            }
        }
        assert!(
            argument_conversion_price(NumberClass::BigDecimal, &int_type()) > BIG_MANTISSA_LOSS_PRICE
        );
    }

    #[test]
    fn fallback_types_follow_the_accepted_types() {
        let int_and_long = TypeFlags::INTEGER | TypeFlags::LONG | TypeFlags::ACCEPTS_NUMBER;
        let byte_and_int = TypeFlags::BYTE | TypeFlags::INTEGER | TypeFlags::ACCEPTS_NUMBER;
        assert_eq!(add_fallback_type(&Number::Int(5), byte_and_int), NumberClass::IntegerOrByte);
        assert_eq!(add_fallback_type(&Number::Int(500), byte_and_int), NumberClass::Integer);
        assert_eq!(add_fallback_type(&Number::Long(5), int_and_long), NumberClass::LongOrInteger);
        assert_eq!(
            add_fallback_type(&Number::Double(3.0000000001), int_and_long),
            NumberClass::DoubleOrInteger
        );
        assert_eq!(add_fallback_type(&Number::Double(3.5), int_and_long), NumberClass::Double);
        assert_eq!(
            add_fallback_type(
                &Number::BigDecimal("12.00".parse().unwrap()),
                int_and_long | TypeFlags::DOUBLE
            ),
            NumberClass::IntegerBigDecimal
        );
        assert_eq!(
            add_fallback_type(&Number::BigInteger(BigInt::from(-128)), byte_and_int),
            NumberClass::BigIntegerOrByte
        );
        assert_eq!(
            add_fallback_type(&Number::BigInteger(BigInt::from(128)), byte_and_int),
            NumberClass::BigIntegerOrInteger
        );
    }

    #[test]
    fn specificity_ranks_narrow_types_first() {
        let long = class(famous_classes::long_class());
        let double = class(famous_classes::double_class());
        assert!(compare_number_type_specificity(&int_type(), &long) > 0);
        assert!(compare_number_type_specificity(&double, &long) < 0);
        assert_eq!(compare_number_type_specificity(&int_type(), &class(famous_classes::integer_class())), 0);
    }

    #[test]
    fn forcing_rounds_tagged_whole_numbers() {
        assert_eq!(
            force_number_to_type(&Number::Double(2.9999999), &int_type(), NumberClass::DoubleOrInteger),
            Some(Number::Int(3))
        );
        assert_eq!(
            force_unwrapped_number_to_type(&Number::Double(2.9), &int_type()),
            Some(Number::Int(2))
        );
        assert_eq!(
            force_unwrapped_number_to_type(&Number::Int(7), &class(famous_classes::number_class())),
            Some(Number::Int(7))
        );
        assert_eq!(
            force_unwrapped_number_to_type(&Number::Int(7), &class(famous_classes::big_decimal_class())),
            Some(Number::BigDecimal("7".parse().unwrap()))
        );
    }
}
