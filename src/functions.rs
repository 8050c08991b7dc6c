// Builtin sequence methods
// The method surface array scopes expose through member access, so
// method-style calls like `find(i => i > 2)` work over scope data

use std::rc::Rc;

use crate::coerce;
use crate::evaluator::EvalError;
use crate::value::{Function, Value};

const SEQUENCE_METHODS: &[&str] = &[
    "find", "filter", "map", "indexOf", "includes", "join", "concat", "slice",
];

/// Whether `name` is one of the methods array values expose.
pub(crate) fn is_sequence_method(name: &str) -> bool {
    SEQUENCE_METHODS.contains(&name)
}

/// Build the native for a sequence method. Resolution binds the owning
/// array as the receiver, so each native reads its input from there.
pub(crate) fn sequence_method(name: &str) -> Option<Value> {
    let func = match name {
        "find" => Function::native("find", fn_find),
        "filter" => Function::native("filter", fn_filter),
        "map" => Function::native("map", fn_map),
        "indexOf" => Function::native("indexOf", fn_index_of),
        "includes" => Function::native("includes", fn_includes),
        "join" => Function::native("join", fn_join),
        "concat" => Function::native("concat", fn_concat),
        "slice" => Function::native("slice", fn_slice),
        _ => return None,
    };
    Some(Value::Function(Rc::new(func)))
}

/// Extract the callback argument for the iteration methods.
fn callback_arg(args: &[Value]) -> Result<&Rc<Function>, EvalError> {
    match args.first() {
        Some(Value::Function(f)) => Ok(f),
        Some(other) => Err(EvalError::NotAFunction(other.type_name().to_string())),
        None => Err(EvalError::NotAFunction("undefined".to_string())),
    }
}

/// Callbacks receive (element, index, array), positionally.
fn invoke_callback(
    callback: &Function,
    item: &Value,
    index: usize,
    receiver: &Value,
) -> Result<Value, EvalError> {
    callback.call(&[item.clone(), Value::from(index), receiver.clone()])
}

fn fn_find(recv: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = recv.as_array() else {
        return Ok(Value::Undefined);
    };
    let callback = callback_arg(args)?;
    for (i, item) in items.iter().enumerate() {
        if coerce::is_truthy(&invoke_callback(callback, item, i, recv)?) {
            return Ok(item.clone());
        }
    }
    Ok(Value::Undefined)
}

fn fn_filter(recv: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = recv.as_array() else {
        return Ok(Value::Undefined);
    };
    let callback = callback_arg(args)?;
    let mut result = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if coerce::is_truthy(&invoke_callback(callback, item, i, recv)?) {
            result.push(item.clone());
        }
    }
    Ok(Value::array(result))
}

fn fn_map(recv: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = recv.as_array() else {
        return Ok(Value::Undefined);
    };
    let callback = callback_arg(args)?;
    let mut result = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        result.push(invoke_callback(callback, item, i, recv)?);
    }
    Ok(Value::array(result))
}

fn fn_index_of(recv: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = recv.as_array() else {
        return Ok(Value::Undefined);
    };
    let target = args.first().cloned().unwrap_or(Value::Undefined);
    let start = start_index(args.get(1), items.len());
    for (i, item) in items.iter().enumerate().skip(start) {
        if coerce::strict_eq(item, &target) {
            return Ok(Value::from(i));
        }
    }
    Ok(Value::from(-1.0))
}

fn fn_includes(recv: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = recv.as_array() else {
        return Ok(Value::Undefined);
    };
    let target = args.first().cloned().unwrap_or(Value::Undefined);
    let start = start_index(args.get(1), items.len());
    let found = items
        .iter()
        .skip(start)
        .any(|item| same_value_zero(item, &target));
    Ok(Value::Bool(found))
}

// `includes` treats NaN as equal to itself; `indexOf` keeps plain strict
// equality and cannot find NaN.
fn same_value_zero(l: &Value, r: &Value) -> bool {
    if let (Value::Number(a), Value::Number(b)) = (l, r) {
        if a.is_nan() && b.is_nan() {
            return true;
        }
    }
    coerce::strict_eq(l, r)
}

fn fn_join(recv: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = recv.as_array() else {
        return Ok(Value::Undefined);
    };
    let separator = match args.first() {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(sep) => coerce::to_display_string(sep),
    };
    let parts: Vec<String> = items
        .iter()
        .map(|item| {
            if item.is_absent() {
                String::new()
            } else {
                coerce::to_display_string(item)
            }
        })
        .collect();
    Ok(Value::from(parts.join(&separator)))
}

fn fn_concat(recv: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = recv.as_array() else {
        return Ok(Value::Undefined);
    };
    let mut result = items.clone();
    for arg in args {
        match arg {
            // array arguments splice in one level deep
            Value::Array(extra) => result.extend(extra.iter().cloned()),
            other => result.push(other.clone()),
        }
    }
    Ok(Value::array(result))
}

fn fn_slice(recv: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = recv.as_array() else {
        return Ok(Value::Undefined);
    };
    let len = items.len();
    let start = match args.first() {
        None | Some(Value::Undefined) => 0,
        Some(v) => clamp_index(coerce::to_number(v), len),
    };
    let end = match args.get(1) {
        None | Some(Value::Undefined) => len,
        Some(v) => clamp_index(coerce::to_number(v), len),
    };
    if start >= end {
        return Ok(Value::array(Vec::new()));
    }
    Ok(Value::array(items[start..end].to_vec()))
}

/// Optional `fromIndex` argument: negative counts back from the end.
fn start_index(arg: Option<&Value>, len: usize) -> usize {
    match arg {
        None | Some(Value::Undefined) => 0,
        Some(v) => clamp_index(coerce::to_number(v), len),
    }
}

/// Clamp a possibly-negative index into [0, len].
fn clamp_index(n: f64, len: usize) -> usize {
    if n.is_nan() {
        return 0;
    }
    let idx = if n < 0.0 { n + len as f64 } else { n };
    if idx <= 0.0 {
        0
    } else if idx >= len as f64 {
        len
    } else {
        idx as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    fn call(method: &str, recv: Value, args: &[Value]) -> Value {
        let f = sequence_method(method).unwrap();
        let f = f.as_function().unwrap().bind(recv);
        f.call(args).unwrap()
    }

    #[test]
    fn test_index_of_and_includes() {
        let arr = value!([1, 2, 3, 2]);
        assert_eq!(call("indexOf", arr.clone(), &[value!(2.0)]), value!(1.0));
        assert_eq!(
            call("indexOf", arr.clone(), &[value!(2.0), value!(2.0)]),
            value!(3.0)
        );
        assert_eq!(call("indexOf", arr.clone(), &[value!(9.0)]), value!(-1.0));
        assert_eq!(call("includes", arr.clone(), &[value!(3.0)]), value!(true));
        assert_eq!(call("includes", arr, &[value!(9.0)]), value!(false));
    }

    #[test]
    fn test_index_of_is_strict() {
        let arr = value!([1, "2", 3]);
        assert_eq!(call("indexOf", arr, &[value!(2.0)]), value!(-1.0));
    }

    #[test]
    fn test_includes_finds_nan() {
        let arr = Value::array(vec![
            Value::from(1),
            Value::from(f64::NAN),
            Value::from(3),
        ]);
        assert_eq!(
            call("includes", arr.clone(), &[value!(f64::NAN)]),
            value!(true)
        );
        assert_eq!(call("indexOf", arr, &[value!(f64::NAN)]), value!(-1.0));
    }

    #[test]
    fn test_join() {
        let arr = value!([1, "a", null]);
        assert_eq!(call("join", arr.clone(), &[]), value!("1,a,"));
        assert_eq!(call("join", arr, &[value!(" - ")]), value!("1 - a - "));
    }

    #[test]
    fn test_concat() {
        let arr = value!([1, 2]);
        let result = call("concat", arr, &[value!([3, 4]), value!(5.0)]);
        assert_eq!(result, value!([1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_slice() {
        let arr = value!([1, 2, 3, 4, 5]);
        assert_eq!(call("slice", arr.clone(), &[value!(1.0), value!(3.0)]), value!([2, 3]));
        assert_eq!(call("slice", arr.clone(), &[value!(-2.0)]), value!([4, 5]));
        assert_eq!(call("slice", arr.clone(), &[]), arr.clone());
        assert_eq!(call("slice", arr, &[value!(4.0), value!(1.0)]), value!([]));
    }

    #[test]
    fn test_non_array_receiver() {
        assert_eq!(call("find", value!(42.0), &[]), Value::Undefined);
    }

    #[test]
    fn test_callback_must_be_function() {
        let f = sequence_method("find").unwrap();
        let f = f.as_function().unwrap().bind(value!([1]));
        assert!(matches!(
            f.call(&[value!(1.0)]),
            Err(EvalError::NotAFunction(_))
        ));
    }
}
