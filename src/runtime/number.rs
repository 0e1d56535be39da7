use std::{cmp::Ordering, fmt, str::FromStr, sync::Arc};

use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::runtime::{Class, famous_classes};

/// A boxed host number. Narrowing accessors follow host casting rules: integer narrowing wraps,
/// floating point to integer saturates and maps NaN to zero.
#[derive(Debug, Clone)]
pub enum Number {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    BigInteger(BigInt),
    BigDecimal(BigDecimal),
}

impl Number {
    pub fn class(&self) -> &'static Arc<Class> {
        match self {
            Number::Byte(_) => famous_classes::byte_class(),
            Number::Short(_) => famous_classes::short_class(),
            Number::Int(_) => famous_classes::integer_class(),
            Number::Long(_) => famous_classes::long_class(),
            Number::Float(_) => famous_classes::float_class(),
            Number::Double(_) => famous_classes::double_class(),
            Number::BigInteger(_) => famous_classes::big_integer_class(),
            Number::BigDecimal(_) => famous_classes::big_decimal_class(),
        }
    }

    pub fn long_value(&self) -> i64 {
        match self {
            Number::Byte(v) => *v as i64,
            Number::Short(v) => *v as i64,
            Number::Int(v) => *v as i64,
            Number::Long(v) => *v,
            Number::Float(v) => *v as i64,
            Number::Double(v) => *v as i64,
            Number::BigInteger(v) => low_bits(v),
            Number::BigDecimal(v) => low_bits(&v.to_big_integer()),
        }
    }

    pub fn int_value(&self) -> i32 {
        match self {
            Number::Float(v) => *v as i32,
            Number::Double(v) => *v as i32,
            other => other.long_value() as i32,
        }
    }

    pub fn short_value(&self) -> i16 {
        self.int_value() as i16
    }

    pub fn byte_value(&self) -> i8 {
        self.int_value() as i8
    }

    pub fn double_value(&self) -> f64 {
        match self {
            Number::Byte(v) => *v as f64,
            Number::Short(v) => *v as f64,
            Number::Int(v) => *v as f64,
            Number::Long(v) => *v as f64,
            Number::Float(v) => *v as f64,
            Number::Double(v) => *v,
            Number::BigInteger(v) => v.to_f64().unwrap_or(f64::NAN),
            Number::BigDecimal(v) => v.to_f64(),
        }
    }

    pub fn float_value(&self) -> f32 {
        self.double_value() as f32
    }

    pub fn to_big_integer(&self) -> BigInt {
        match self {
            Number::BigInteger(v) => v.clone(),
            Number::BigDecimal(v) => v.to_big_integer(),
            Number::Float(_) | Number::Double(_) => {
                BigDecimal::from_f64(self.double_value())
                    .map(|d| d.to_big_integer())
                    .unwrap_or_default()
            }
            other => BigInt::from(other.long_value()),
        }
    }

    /// `None` for NaN and infinities.
    pub fn to_big_decimal(&self) -> Option<BigDecimal> {
        match self {
            Number::BigDecimal(v) => Some(v.clone()),
            Number::BigInteger(v) => Some(BigDecimal::new(v.clone(), 0)),
            Number::Float(_) | Number::Double(_) => BigDecimal::from_f64(self.double_value()),
            other => Some(BigDecimal::new(BigInt::from(other.long_value()), 0)),
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Number::Byte(_)
                | Number::Short(_)
                | Number::Int(_)
                | Number::Long(_)
                | Number::BigInteger(_)
        )
    }
}

/// Equality by type and value, like the boxed host numbers.
impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Byte(a), Number::Byte(b)) => a == b,
            (Number::Short(a), Number::Short(b)) => a == b,
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Long(a), Number::Long(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a.to_bits() == b.to_bits(),
            (Number::Double(a), Number::Double(b)) => a.to_bits() == b.to_bits(),
            (Number::BigInteger(a), Number::BigInteger(b)) => a == b,
            (Number::BigDecimal(a), Number::BigDecimal(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Byte(v) => write!(f, "{v}"),
            Number::Short(v) => write!(f, "{v}"),
            Number::Int(v) => write!(f, "{v}"),
            Number::Long(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v:?}"),
            Number::Double(v) => write!(f, "{v:?}"),
            Number::BigInteger(v) => write!(f, "{v}"),
            Number::BigDecimal(v) => write!(f, "{v}"),
        }
    }
}

fn low_bits(value: &BigInt) -> i64 {
    let magnitude = value.iter_u64_digits().next().unwrap_or(0) as i64;
    match value.sign() {
        Sign::Minus => magnitude.wrapping_neg(),
        _ => magnitude,
    }
}

/// Arbitrary precision decimal: `unscaled * 10^-scale`.
#[derive(Debug, Clone)]
pub struct BigDecimal {
    unscaled: BigInt,
    scale: i64,
}

impl BigDecimal {
    pub fn new(unscaled: BigInt, scale: i64) -> Self {
        BigDecimal { unscaled, scale }
    }

    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Uses the shortest decimal representation of the double, as `new BigDecimal(Double.toString(d))`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        format!("{value:e}").parse().ok()
    }

    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Drops the fraction, rounding toward zero.
    pub fn to_big_integer(&self) -> BigInt {
        if self.scale <= 0 {
            self.unscaled.clone() * pow10(-self.scale)
        } else {
            &self.unscaled / pow10(self.scale)
        }
    }

    pub fn is_whole(&self) -> bool {
        self.scale <= 0 || (&self.unscaled % pow10(self.scale)).is_zero()
    }

    pub fn signum(&self) -> i32 {
        match self.unscaled.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    fn rescaled(&self, scale: i64) -> BigInt {
        if scale >= self.scale {
            &self.unscaled * pow10(scale - self.scale)
        } else {
            &self.unscaled / pow10(self.scale - scale)
        }
    }
}

fn pow10(exponent: i64) -> BigInt {
    num_traits::pow(BigInt::from(10), exponent as usize)
}

impl PartialEq for BigDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BigDecimal {}

impl PartialOrd for BigDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.rescaled(scale).cmp(&other.rescaled(scale))
    }
}

impl FromStr for BigDecimal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mantissa, exponent) = match s.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => (
                mantissa,
                exponent
                    .parse::<i64>()
                    .map_err(|e| format!("invalid exponent in {s:?}: {e}"))?,
            ),
            None => (s, 0),
        };
        let (integer_part, fraction_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = format!("{integer_part}{fraction_part}");
        let unscaled =
            BigInt::from_str(&digits).map_err(|e| format!("invalid decimal {s:?}: {e}"))?;
        Ok(BigDecimal::new(
            unscaled,
            fraction_part.len() as i64 - exponent,
        ))
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale <= 0 {
            return write!(f, "{}", self.to_big_integer());
        }
        let digits = self.unscaled.magnitude().to_string();
        let scale = self.scale as usize;
        let sign = if self.signum() < 0 { "-" } else { "" };
        if digits.len() > scale {
            let (integer, fraction) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{integer}.{fraction}")
        } else {
            write!(f, "{sign}0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn narrowing_wraps_like_host_casts() {
        assert_eq!(Number::Int(300).byte_value(), 44);
        assert_eq!(Number::Long(1 << 33).int_value(), 0);
        assert_eq!(Number::Double(1e20).int_value(), i32::MAX);
        assert_eq!(Number::Double(f64::NAN).long_value(), 0);
        let big = BigInt::from(u64::MAX) + BigInt::from(2);
        assert_eq!(Number::BigInteger(big).long_value(), 1);
        assert_eq!(Number::BigInteger(BigInt::from(-5)).long_value(), -5);
    }

    #[test]
    fn big_decimal_parses_and_prints() {
        let decimal: BigDecimal = "-12.050".parse().unwrap();
        assert_eq!(decimal.scale(), 3);
        assert_eq!(decimal.to_string(), "-12.050");
        assert_eq!("0.005".parse::<BigDecimal>().unwrap().to_string(), "0.005");
        assert_eq!("1.5e3".parse::<BigDecimal>().unwrap().to_string(), "1500");
    }

    #[test]
    fn big_decimal_compares_by_value() {
        let a: BigDecimal = "2.50".parse().unwrap();
        let b: BigDecimal = "2.5".parse().unwrap();
        assert_eq!(a, b);
        assert!(a < "2.51".parse().unwrap());
    }

    #[test]
    fn whole_decimals_convert_to_integers() {
        let whole: BigDecimal = "42.000".parse().unwrap();
        assert!(whole.is_whole());
        assert_eq!(whole.to_big_integer(), BigInt::from(42));
        let fraction: BigDecimal = "-42.9".parse().unwrap();
        assert!(!fraction.is_whole());
        assert_eq!(fraction.to_big_integer(), BigInt::from(-42));
    }

    #[test]
    fn doubles_convert_through_their_shortest_text() {
        let decimal = BigDecimal::from_f64(0.1).unwrap();
        assert_eq!(decimal.to_string(), "0.1");
        assert_eq!(BigDecimal::from_f64(f64::INFINITY), None);
        assert_eq!(Number::Double(2.5).to_big_decimal().unwrap().to_f64(), 2.5);
    }
}
