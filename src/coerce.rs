// Scripting-style conversion rules
// The default operator table is built from these; public so custom
// operators can match the default semantics

use std::cmp::Ordering;
use std::rc::Rc;

use crate::datetime;
use crate::value::Value;

/// Truthiness: false, 0, NaN, empty string, null and undefined are falsy;
/// everything else (including empty arrays and objects) is truthy.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null | Value::Undefined => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Numeric coercion. Strings parse after trimming (empty string is 0,
/// `0x` prefix parses as hex, unparseable is NaN), dates become their
/// epoch milliseconds, arrays follow the host-language single-element
/// rule, everything else is NaN.
pub fn to_number(v: &Value) -> f64 {
    match v {
        Value::Null => 0.0,
        Value::Undefined => f64::NAN,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                parse_string_number(trimmed)
            }
        }
        Value::Date(dt) => datetime::to_millis(dt),
        Value::Array(items) => match items.len() {
            0 => 0.0,
            1 => to_number(&items[0]),
            _ => f64::NAN,
        },
        Value::Object(_) | Value::Function(_) => f64::NAN,
    }
}

/// The host language's `Number(string)` rules for a trimmed, non-empty
/// string: a `0x`/`0X` prefix parses the remainder as hex, infinity must
/// be spelled exactly `Infinity`, anything else parses as decimal.
fn parse_string_number(s: &str) -> f64 {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_infinite() => {
            // f64 parsing also accepts `inf` spellings the host rejects;
            // let through the exact spellings and numeric overflow only
            let spelled = matches!(s, "Infinity" | "+Infinity" | "-Infinity");
            let overflow = !s
                .chars()
                .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E');
            if spelled || overflow {
                n
            } else {
                f64::NAN
            }
        }
        Ok(n) => n,
        Err(_) => f64::NAN,
    }
}

/// String coercion, matching the host language's `String()`: numbers drop
/// a trailing `.0`, arrays join their elements with commas (absent values
/// render empty), objects render as the opaque object tag.
pub fn to_display_string(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Undefined => "undefined".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.to_string(),
        Value::Date(dt) => datetime::format_iso8601(dt),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| {
                    if item.is_absent() {
                        String::new()
                    } else {
                        to_display_string(item)
                    }
                })
                .collect();
            parts.join(",")
        }
        Value::Object(_) => "[object Object]".to_string(),
        Value::Function(f) => match f.name() {
            Some(name) => format!("<function:{}>", name),
            None => "<function>".to_string(),
        },
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n.fract() == 0.0 && n.abs() < 1e20 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Reduce a compound value to a primitive for `+` and loose comparison:
/// arrays, objects, dates and functions become their string form,
/// primitives pass through unchanged.
pub fn to_primitive(v: &Value) -> Value {
    match v {
        Value::Array(_) | Value::Object(_) | Value::Date(_) | Value::Function(_) => {
            Value::from(to_display_string(v))
        }
        other => other.clone(),
    }
}

/// Wrapping conversion to a 32-bit signed integer (bitwise operand rule).
pub fn to_i32(v: &Value) -> i32 {
    to_u32(v) as i32
}

/// Wrapping conversion to a 32-bit unsigned integer (shift/zero-fill rule).
pub fn to_u32(v: &Value) -> u32 {
    let n = to_number(v);
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let m = n.trunc() % 4_294_967_296.0;
    let m = if m < 0.0 { m + 4_294_967_296.0 } else { m };
    m as u32
}

/// Loose equality (`==`): null and undefined are mutually equal, numbers
/// and strings compare numerically across types, booleans coerce to
/// numbers, and compound values compare by identity against each other or
/// by primitive form against primitives.
pub fn loose_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
        (Value::Null | Value::Undefined, _) | (_, Value::Null | Value::Undefined) => false,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(_), _) => loose_eq(&Value::Number(to_number(l)), r),
        (_, Value::Bool(_)) => loose_eq(l, &Value::Number(to_number(r))),
        (Value::Number(a), Value::String(_)) => *a == to_number(r),
        (Value::String(_), Value::Number(b)) => to_number(l) == *b,
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::Date(_), Value::Number(_) | Value::String(_)) => to_number(l) == to_number(r),
        (Value::Number(_) | Value::String(_), Value::Date(_)) => to_number(l) == to_number(r),
        (
            Value::Array(_) | Value::Object(_) | Value::Function(_),
            Value::Array(_) | Value::Object(_) | Value::Function(_),
        ) => strict_eq(l, r),
        (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::String(_)) => {
            loose_eq(&to_primitive(l), r)
        }
        (Value::Number(_) | Value::String(_), Value::Array(_) | Value::Object(_)) => {
            loose_eq(l, &to_primitive(r))
        }
        _ => false,
    }
}

/// Strict equality (`===`): no coercion; compound values compare by
/// identity, NaN is unequal to itself.
pub fn strict_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::Undefined, Value::Undefined) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Relational comparison: two strings compare lexicographically, anything
/// else compares numerically. None when either side is NaN (all relational
/// operators are then false).
pub fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    if let (Value::String(a), Value::String(b)) = (l, r) {
        return Some(a.cmp(b));
    }
    to_number(l).partial_cmp(&to_number(r))
}

/// The `+` rule: if either operand is string-like after primitive
/// coercion, concatenate; otherwise add numerically.
pub fn add(l: &Value, r: &Value) -> Value {
    let lp = to_primitive(l);
    let rp = to_primitive(r);
    if lp.is_string() || rp.is_string() {
        Value::from(format!(
            "{}{}",
            to_display_string(&lp),
            to_display_string(&rp)
        ))
    } else {
        Value::Number(to_number(&lp) + to_number(&rp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&Value::Undefined));
        assert!(!is_truthy(&value!(0.0)));
        assert!(!is_truthy(&value!(f64::NAN)));
        assert!(!is_truthy(&value!("")));
        assert!(!is_truthy(&value!(false)));
        assert!(is_truthy(&value!(1.0)));
        assert!(is_truthy(&value!("x")));
        assert!(is_truthy(&value!([])));
        assert!(is_truthy(&value!({})));
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&Value::Null), 0.0);
        assert!(to_number(&Value::Undefined).is_nan());
        assert_eq!(to_number(&value!(true)), 1.0);
        assert_eq!(to_number(&value!("5")), 5.0);
        assert_eq!(to_number(&value!("  5  ")), 5.0);
        assert_eq!(to_number(&value!("")), 0.0);
        assert!(to_number(&value!("abc")).is_nan());
        assert_eq!(to_number(&value!([])), 0.0);
        assert_eq!(to_number(&value!([7])), 7.0);
        assert!(to_number(&value!([1, 2])).is_nan());
    }

    #[test]
    fn test_hex_string_to_number() {
        assert_eq!(to_number(&value!("0x10")), 16.0);
        assert_eq!(to_number(&value!("0XFF")), 255.0);
        assert_eq!(to_number(&value!("  0x10  ")), 16.0);
        assert!(to_number(&value!("0xzz")).is_nan());
        assert!(to_number(&value!("-0x10")).is_nan());
    }

    #[test]
    fn test_infinity_spellings() {
        assert_eq!(to_number(&value!("Infinity")), f64::INFINITY);
        assert_eq!(to_number(&value!("-Infinity")), f64::NEG_INFINITY);
        assert_eq!(to_number(&value!("1e999")), f64::INFINITY);
        assert!(to_number(&value!("inf")).is_nan());
        assert!(to_number(&value!("infinity")).is_nan());
    }

    #[test]
    fn test_display_string() {
        assert_eq!(to_display_string(&value!(42.0)), "42");
        assert_eq!(to_display_string(&value!(42.5)), "42.5");
        assert_eq!(to_display_string(&value!([1, null, 2])), "1,,2");
        assert_eq!(to_display_string(&value!({})), "[object Object]");
    }

    #[test]
    fn test_int32_wrapping() {
        assert_eq!(to_i32(&value!(-1.0)), -1);
        assert_eq!(to_u32(&value!(-1.0)), u32::MAX);
        assert_eq!(to_i32(&value!(4_294_967_296.0)), 0);
        assert_eq!(to_i32(&value!(f64::NAN)), 0);
        assert_eq!(to_i32(&value!(1.9)), 1);
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&Value::Null, &Value::Undefined));
        assert!(!loose_eq(&Value::Null, &value!(0.0)));
        assert!(loose_eq(&value!(5.0), &value!("5")));
        assert!(loose_eq(&value!(true), &value!(1.0)));
        assert!(!loose_eq(&value!(f64::NAN), &value!(f64::NAN)));

        let arr = value!([1]);
        assert!(loose_eq(&arr, &arr.clone()));
        assert!(!loose_eq(&value!([1]), &value!([1])));
        // compound vs primitive goes through the primitive form
        assert!(loose_eq(&value!([1]), &value!("1")));
    }

    #[test]
    fn test_strict_eq() {
        assert!(strict_eq(&value!(5.0), &value!(5.0)));
        assert!(!strict_eq(&value!(5.0), &value!("5")));
        assert!(!strict_eq(&Value::Null, &Value::Undefined));

        let obj = value!({"a": 1});
        assert!(strict_eq(&obj, &obj.clone()));
        assert!(!strict_eq(&value!({"a": 1}), &value!({"a": 1})));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(&value!(1.0), &value!(2.0)), Some(Ordering::Less));
        assert_eq!(compare(&value!("b"), &value!("a")), Some(Ordering::Greater));
        assert_eq!(compare(&value!("10"), &value!(9.0)), Some(Ordering::Greater));
        assert_eq!(compare(&value!(f64::NAN), &value!(1.0)), None);
    }

    #[test]
    fn test_add_rule() {
        assert_eq!(add(&value!(1.0), &value!(2.0)), value!(3.0));
        assert_eq!(add(&value!("a"), &value!(1.0)), value!("a1"));
        assert_eq!(add(&value!(1.0), &value!("a")), value!("1a"));
        assert_eq!(add(&value!(true), &value!(1.0)), value!(2.0));
    }
}
