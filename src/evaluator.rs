// Tree-walk evaluator
// Pure recursive walk over the AST against an ordered scope chain

use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::ast::Expr;
use crate::coerce;
use crate::datetime;
use crate::functions;
use crate::parser::Parser;
use crate::settings::Settings;
use crate::value::{Function, FunctionKind, Value};

/// Evaluation errors
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("Unknown unary operator `{0}`")]
    UnknownUnaryOperator(String),

    #[error("Unknown binary operator `{0}`")]
    UnknownBinaryOperator(String),

    #[error("Invalid function expression usage")]
    InvalidFunctionUsage,

    #[error("Cannot call a value of type {0}")]
    NotAFunction(String),

    #[error("Operator `{operator}` failed: {message}")]
    Operator { operator: String, message: String },
}

/// Tree-walk evaluator over a [`Settings`] registry.
///
/// The evaluator holds no per-run state: an instance may evaluate any
/// number of expressions, and the same AST may be walked repeatedly.
/// Scopes are caller-owned name→value mappings, earliest highest
/// priority, and are never mutated.
pub struct Evaluator {
    settings: Rc<Settings>,
}

impl Evaluator {
    /// Evaluator over the default registry.
    pub fn new() -> Self {
        Evaluator {
            settings: Rc::new(Settings::new()),
        }
    }

    /// Evaluator over a custom registry.
    pub fn with_settings(settings: Settings) -> Self {
        Evaluator {
            settings: Rc::new(settings),
        }
    }

    pub(crate) fn from_shared(settings: Rc<Settings>) -> Self {
        Evaluator { settings }
    }

    /// Evaluate a parsed expression against a scope chain. A top-level
    /// function literal evaluates to a callable [`Value::Function`];
    /// anywhere deeper in the tree a bare function node is an error.
    pub fn evaluate(&self, exp: &Expr, scopes: &[Value]) -> Result<Value, EvalError> {
        if let Expr::Func { parameters, body } = exp {
            return Ok(self.make_closure(parameters, body, scopes));
        }
        self.visit(exp, scopes)
    }

    /// Parse then evaluate. Empty input evaluates to [`Value::Undefined`].
    pub fn evaluate_str(&self, text: &str, scopes: &[Value]) -> Result<Value, crate::Error> {
        match Parser::new(text, &self.settings).parse()? {
            Some(exp) => Ok(self.evaluate(&exp, scopes)?),
            None => Ok(Value::Undefined),
        }
    }

    pub(crate) fn visit(&self, exp: &Expr, scopes: &[Value]) -> Result<Value, EvalError> {
        match exp {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Variable(name) => Ok(read_var(name, scopes)),

            Expr::Unary { operator, target } => {
                let value = self.visit(target, scopes)?;
                match self.settings.get_unary_operator(operator) {
                    Some(f) => (**f)(value),
                    None => Err(EvalError::UnknownUnaryOperator(operator.clone())),
                }
            }

            Expr::Binary {
                operator,
                left,
                right,
            } => {
                let left_value = self.visit(left, scopes)?;
                let Some(op) = self.settings.get_binary_operator(operator) else {
                    return Err(EvalError::UnknownBinaryOperator(operator.clone()));
                };
                if op.is_lazy() {
                    op.apply_lazy(left_value, &mut || self.visit(right, scopes))
                } else {
                    let right_value = self.visit(right, scopes)?;
                    let (left_value, right_value) = fix_dates(left_value, right_value);
                    op.apply(left_value, right_value)
                }
            }

            Expr::Group(items) => {
                // single-element groups collapse to their inner value
                if items.len() == 1 {
                    return self.visit(&items[0], scopes);
                }
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.visit(item, scopes)?);
                }
                Ok(Value::array(values))
            }

            Expr::Object(members) => {
                let mut map = IndexMap::with_capacity(members.len());
                for (name, value_exp) in members {
                    map.insert(name.clone(), self.visit(value_exp, scopes)?);
                }
                Ok(Value::object(map))
            }

            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.visit(item, scopes)?);
                }
                Ok(Value::array(values))
            }

            Expr::Member { owner, member } => {
                let owner_value = self.visit(owner, scopes)?;
                // an absent owner resolves to undefined via the scope scan
                Ok(read_var(member, std::slice::from_ref(&owner_value)))
            }

            Expr::Indexer { owner, key } => {
                let owner_value = self.visit(owner, scopes)?;
                let key_value = self.visit(key, scopes)?;
                if owner_value.is_absent() {
                    return Ok(Value::Null);
                }
                Ok(index_value(&owner_value, &key_value))
            }

            Expr::Func { .. } => Err(EvalError::InvalidFunctionUsage),

            Expr::Call { callee, args } => {
                let callee_value = self.visit(callee, scopes)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(match arg {
                        Expr::Func { parameters, body } => {
                            self.make_closure(parameters, body, scopes)
                        }
                        other => self.visit(other, scopes)?,
                    });
                }
                match callee_value {
                    Value::Function(f) => f.call(&values),
                    other => Err(EvalError::NotAFunction(other.type_name().to_string())),
                }
            }

            Expr::Ternary {
                predicate,
                when_true,
                when_false,
            } => {
                if coerce::is_truthy(&self.visit(predicate, scopes)?) {
                    self.visit(when_true, scopes)
                } else {
                    self.visit(when_false, scopes)
                }
            }
        }
    }

    fn make_closure(&self, parameters: &[String], body: &Expr, scopes: &[Value]) -> Value {
        Value::Function(Rc::new(Function::closure(
            parameters.to_vec(),
            Rc::new(body.clone()),
            scopes.to_vec(),
            Rc::clone(&self.settings),
        )))
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Function {
    /// Invoke with positional arguments. Extra arguments are ignored,
    /// missing ones bind undefined.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        match &self.kind {
            FunctionKind::Native(f) => {
                let receiver = self.receiver.clone().unwrap_or(Value::Undefined);
                (**f)(&receiver, args)
            }
            FunctionKind::Closure {
                params,
                body,
                scopes,
                settings,
            } => {
                let mut locals = IndexMap::with_capacity(params.len());
                for (i, param) in params.iter().enumerate() {
                    locals.insert(
                        param.clone(),
                        args.get(i).cloned().unwrap_or(Value::Undefined),
                    );
                }
                let mut chain = Vec::with_capacity(scopes.len() + 1);
                chain.push(Value::object(locals));
                chain.extend(scopes.iter().cloned());
                Evaluator::from_shared(Rc::clone(settings)).visit(body, &chain)
            }
        }
    }
}

/// Scan the scope chain; the first scope that contains `name` resolves
/// it. Unbound functions come back bound to their resolving scope, so a
/// later call sees that scope as its receiver; a function that already
/// carries a receiver keeps it, as a second bind cannot change it.
fn read_var(name: &str, scopes: &[Value]) -> Value {
    for scope in scopes {
        if scope_contains(scope, name) {
            let value = scope_read(scope, name);
            if let Value::Function(f) = &value {
                if f.receiver().is_none() {
                    return Value::Function(Rc::new(f.bind(scope.clone())));
                }
            }
            return value;
        }
    }
    Value::Undefined
}

fn scope_contains(scope: &Value, name: &str) -> bool {
    match scope {
        Value::Object(map) => map.contains_key(name),
        Value::Array(_) => name == "length" || functions::is_sequence_method(name),
        Value::String(_) => name == "length",
        _ => false,
    }
}

fn scope_read(scope: &Value, name: &str) -> Value {
    match scope {
        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Undefined),
        Value::Array(items) => {
            if name == "length" {
                Value::from(items.len())
            } else {
                functions::sequence_method(name).unwrap_or(Value::Undefined)
            }
        }
        Value::String(s) => {
            if name == "length" {
                Value::from(s.chars().count())
            } else {
                Value::Undefined
            }
        }
        _ => Value::Undefined,
    }
}

/// Indexer lookup on a present owner.
fn index_value(owner: &Value, key: &Value) -> Value {
    match owner {
        Value::Object(map) => map
            .get(coerce::to_display_string(key).as_str())
            .cloned()
            .unwrap_or(Value::Undefined),
        Value::Array(items) => {
            if let Value::String(s) = key {
                if &**s == "length" {
                    return Value::from(items.len());
                }
            }
            let n = coerce::to_number(key);
            if n.fract() == 0.0 && n >= 0.0 && (n as usize) < items.len() {
                items[n as usize].clone()
            } else {
                Value::Undefined
            }
        }
        Value::String(s) => {
            if let Value::String(k) = key {
                if &**k == "length" {
                    return Value::from(s.chars().count());
                }
            }
            let n = coerce::to_number(key);
            if n.fract() == 0.0 && n >= 0.0 {
                match s.chars().nth(n as usize) {
                    Some(ch) => Value::from(ch.to_string()),
                    None => Value::Undefined,
                }
            } else {
                Value::Undefined
            }
        }
        _ => Value::Undefined,
    }
}

/// Before an eager binary operator runs, a date operand collapses to
/// its millisecond value and a string on the other side is parsed as a
/// date, so comparisons against timestamps and ISO strings line up.
fn fix_dates(left: Value, right: Value) -> (Value, Value) {
    let (mut left, mut right) = (left, right);
    if let Value::Date(d) = &left {
        let millis = datetime::to_millis(d);
        if let Value::String(s) = &right {
            right = Value::Number(datetime::parse_millis(s));
        }
        left = Value::Number(millis);
    }
    if let Value::Date(d) = &right {
        let millis = datetime::to_millis(d);
        if let Value::String(s) = &left {
            left = Value::Number(datetime::parse_millis(s));
        }
        right = Value::Number(millis);
    }
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    fn eval(text: &str, scopes: &[Value]) -> Value {
        Evaluator::new().evaluate_str(text, scopes).unwrap()
    }

    #[test]
    fn test_literal_and_variable() {
        assert_eq!(eval("42", &[]), value!(42.0));
        let scope = value!({ "name": "Netflix" });
        assert_eq!(eval("name", &[scope]), value!("Netflix"));
        assert_eq!(eval("missing", &[]), Value::Undefined);
    }

    #[test]
    fn test_scope_priority() {
        let scopes = [value!({ "x": 1 }), value!({ "x": 2 })];
        assert_eq!(eval("x", &scopes), value!(1.0));
    }

    #[test]
    fn test_group_collapse_and_sequence() {
        assert_eq!(eval("(42)", &[]), value!(42.0));
        assert_eq!(eval("(1, 2, 3)", &[]), value!([1, 2, 3]));
    }

    #[test]
    fn test_member_vs_indexer_on_null() {
        let scope = value!({ "a": null });
        assert_eq!(eval("a.b", &[scope.clone()]), Value::Undefined);
        assert_eq!(eval("a[\"b\"]", &[scope]), Value::Null);
    }

    #[test]
    fn test_indexer_lookups() {
        let scope = value!({ "items": [10, 20, 30], "name": "abc" });
        assert_eq!(eval("items[1]", &[scope.clone()]), value!(20.0));
        assert_eq!(eval("items[\"length\"]", &[scope.clone()]), value!(3.0));
        assert_eq!(eval("items[9]", &[scope.clone()]), Value::Undefined);
        assert_eq!(eval("name[1]", &[scope.clone()]), value!("b"));
        assert_eq!(eval("name.length", &[scope]), value!(3.0));
    }

    #[test]
    fn test_ternary_takes_one_branch() {
        let scope = value!({ "check": true });
        assert_eq!(eval("check ? 1 : missing.boom", &[scope]), value!(1.0));
    }

    #[test]
    fn test_lambda_via_call() {
        let f = eval("(a, b) => a < b", &[]);
        let f = f.as_function().unwrap();
        assert_eq!(f.call(&[value!(2.0), value!(1.0)]).unwrap(), value!(false));
        assert_eq!(f.call(&[value!(1.0), value!(2.0)]).unwrap(), value!(true));
    }

    #[test]
    fn test_nested_func_is_an_error() {
        let result = Evaluator::new().evaluate_str("a < b => b * 2", &[]);
        assert!(matches!(
            result,
            Err(crate::Error::Eval(EvalError::InvalidFunctionUsage))
        ));
    }

    #[test]
    fn test_call_on_non_function() {
        let scope = value!({ "x": 5 });
        let result = Evaluator::new().evaluate_str("x(1)", &[scope]);
        assert!(matches!(
            result,
            Err(crate::Error::Eval(EvalError::NotAFunction(_)))
        ));
    }

    #[test]
    fn test_unknown_operator_in_hand_built_tree() {
        let exp = Expr::binary("<=>", Expr::literal(1.0), Expr::literal(2.0));
        let result = Evaluator::new().evaluate(&exp, &[]);
        assert!(matches!(
            result,
            Err(EvalError::UnknownBinaryOperator(op)) if op == "<=>"
        ));
    }

    #[test]
    fn test_native_function_receives_receiver() {
        let double = Function::native("double", |_recv, args| {
            Ok(Value::Number(coerce::to_number(
                args.first().unwrap_or(&Value::Undefined),
            ) * 2.0))
        });
        let mut map = IndexMap::new();
        map.insert("double".to_string(), Value::Function(Rc::new(double)));
        map.insert("x".to_string(), value!(21));
        assert_eq!(eval("double(x)", &[Value::object(map)]), value!(42.0));
    }

    #[test]
    fn test_sequence_method_over_scope_array() {
        let scope = value!({ "items": [1, 2, 3, 4, 5] });
        assert_eq!(eval("items.find(i => i > 2)", &[scope]), value!(3.0));
    }

    #[test]
    fn test_prebound_function_keeps_receiver() {
        let tag_of = Function::native("tagOf", |recv, _args| {
            Ok(read_var("tag", std::slice::from_ref(recv)))
        });
        let bound = tag_of.bind(value!({ "tag": "original" }));
        let mut map = IndexMap::new();
        map.insert("tag".to_string(), value!("scope"));
        map.insert("f".to_string(), Value::Function(Rc::new(bound)));
        assert_eq!(eval("f()", &[Value::object(map)]), value!("original"));
    }
}
