//! Numeric coercion between value kinds
//!
//! Every comparison in the engine goes through this module: assertion
//! equality, partial-field matching, ordering operators, and the numeric
//! fallback of template resolution.
//!
//! Equality between numbers is exact. Two integral numbers (including
//! integral floats) compare as integers; anything with a fractional part
//! compares as `f64`. An integer never equals a non-integral float. This
//! means `Int(9007199254740993)` and `Float(9007199254740992.0)` are
//! different even though the float widening of the former would round
//! onto the latter.

use std::cmp::Ordering;

use super::Value;

/// A value interpreted as a number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    /// The exact integer this number denotes, if it has no fractional part
    fn integer(self) -> Option<i128> {
        match self {
            Number::Int(i) => Some(i128::from(i)),
            Number::UInt(u) => Some(i128::from(u)),
            Number::Float(x) if x.fract() == 0.0 && x.abs() < 1e38 => Some(x as i128),
            Number::Float(_) => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::UInt(u) => u as f64,
            Number::Float(x) => x,
        }
    }
}

/// Interpret a value as a number.
///
/// Numeric kinds convert directly; strings convert when they hold a plain
/// decimal literal. Non-finite floats are not numbers.
pub fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::UInt(u) => Some(Number::UInt(*u)),
        Value::Float(x) if x.is_finite() => Some(Number::Float(*x)),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Number> {
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::Int(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Number::UInt(u));
    }
    // f64's parser also accepts "inf", "NaN" and friends
    if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    s.parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .map(Number::Float)
}

/// Exact equality between two numbers of any subtype
pub fn numbers_equal(a: Number, b: Number) -> bool {
    match (a.integer(), b.integer()) {
        (Some(x), Some(y)) => x == y,
        (None, None) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

/// Order two numbers; integers compare exactly, everything else as `f64`.
///
/// Mixing an integer with a fractional float is safe under `f64`: every
/// float with a fractional part is below 2^52 in magnitude, so rounding the
/// integer side cannot flip the result.
pub fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a.integer(), b.integer()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

/// Numeric-aware equality between two values.
///
/// Identical kinds compare directly (lists and maps element-wise with this
/// same rule). Mixed kinds compare as numbers when both sides are numeric,
/// otherwise by their textual form. `Null` equals only `Null`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => a.is_null() && b.is_null(),
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| values_equal(l, r)))
        }
        _ if std::mem::discriminant(a) == std::mem::discriminant(b) => a == b,
        _ => match (number(a), number(b)) {
            (Some(x), Some(y)) => numbers_equal(x, y),
            _ => a.to_string() == b.to_string(),
        },
    }
}

/// Order two values numerically; `None` when either side is not a number
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    compare_numbers(number(a)?, number(b)?)
}

/// Convert an integral, in-range float to `i64`
pub fn integral_float(x: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    (x.is_finite() && x.fract() == 0.0 && x >= -LIMIT && x < LIMIT).then(|| x as i64)
}

/// Whether text looks like a number to template resolution.
///
/// Deliberately permissive: an optional leading `-` followed only by digits,
/// `.`, `e`, `E` and `+`. Strings such as `"1.2.3"` or `"e5"` pass this check
/// and are then rejected by [`parse_number`], so they stay strings.
pub fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+'))
}

/// Parse substituted text back into a numeric value.
///
/// Integers become `Int` (or `UInt` above the signed range); other literals
/// become `Float`, except integral ones that fit `i64`, which become `Int`.
pub fn parse_number(s: &str) -> Option<Value> {
    match parse_decimal(s)? {
        Number::Int(i) => Some(Value::Int(i)),
        Number::UInt(u) => Some(Value::UInt(u)),
        Number::Float(x) => Some(integral_float(x).map_or(Value::Float(x), Value::Int)),
    }
}
