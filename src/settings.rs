// Operator & identifier registry
// Shared by the parser (token recognition, precedence) and the evaluator
// (operator semantics); the extension point for embedding applications

use std::rc::Rc;

use indexmap::IndexMap;

use crate::coerce;
use crate::evaluator::EvalError;
use crate::value::Value;

/// Precedence rank given to operators registered without an explicit rank.
/// Higher than every default operator family, so custom operators bind
/// tightest unless the caller says otherwise.
pub const DEFAULT_PRECEDENCE: u32 = 7;

/// A one-argument operator transform.
pub type UnaryFn = Rc<dyn Fn(Value) -> Result<Value, EvalError>>;

/// A two-argument operator transform with both operands evaluated.
pub type BinaryFn = Rc<dyn Fn(Value, Value) -> Result<Value, EvalError>>;

/// A short-circuiting transform: receives the left value and the right
/// operand as a not-yet-evaluated thunk it may choose to force.
pub type LazyBinaryFn =
    Rc<dyn Fn(Value, &mut dyn FnMut() -> Result<Value, EvalError>) -> Result<Value, EvalError>>;

#[derive(Clone)]
enum BinaryKind {
    Eager(BinaryFn),
    Lazy(LazyBinaryFn),
}

/// A registered binary operator: its transform plus the precedence rank
/// the parser uses to nest adjacent operators (lower binds looser).
#[derive(Clone)]
pub struct BinaryOperator {
    pub precedence: u32,
    kind: BinaryKind,
}

impl BinaryOperator {
    /// Whether this operator receives its right operand as a thunk.
    pub fn is_lazy(&self) -> bool {
        matches!(self.kind, BinaryKind::Lazy(_))
    }

    /// Apply with both operands evaluated. Lazy operators treat the
    /// already-evaluated right side as a pre-forced thunk.
    pub fn apply(&self, left: Value, right: Value) -> Result<Value, EvalError> {
        match &self.kind {
            BinaryKind::Eager(f) => (**f)(left, right),
            BinaryKind::Lazy(f) => {
                let mut forced = Some(right);
                (**f)(left, &mut || Ok(forced.take().unwrap_or(Value::Undefined)))
            }
        }
    }

    /// Apply with the right operand deferred behind a thunk.
    pub fn apply_lazy(
        &self,
        left: Value,
        right: &mut dyn FnMut() -> Result<Value, EvalError>,
    ) -> Result<Value, EvalError> {
        match &self.kind {
            BinaryKind::Eager(f) => {
                let r = right()?;
                (**f)(left, r)
            }
            BinaryKind::Lazy(f) => (**f)(left, right),
        }
    }
}

/// Registry of known identifiers, unary operators, and binary operators.
///
/// A pre-populated default is created by [`Settings::new`]; embedding
/// applications extend it before parsing/evaluation with the builder-style
/// `add_*` methods. There is no implicit process-wide instance: every
/// parse and evaluation receives its registry explicitly.
#[derive(Clone)]
pub struct Settings {
    knowns: IndexMap<String, Value>,
    unary: IndexMap<String, UnaryFn>,
    binary: IndexMap<String, BinaryOperator>,
    // symbol lists kept sorted longest-first so a short operator never
    // shadows a longer one sharing a prefix (`=-=` before `==` before `=`)
    unary_order: Vec<String>,
    binary_order: Vec<String>,
}

impl Settings {
    /// The default registry: `true`/`false`/`null` known identifiers, the
    /// four standard unary operators, and the conventional binary operator
    /// ladder (logical lowest, multiplicative highest).
    pub fn new() -> Self {
        let mut s = Settings {
            knowns: IndexMap::new(),
            unary: IndexMap::new(),
            binary: IndexMap::new(),
            unary_order: Vec::new(),
            binary_order: Vec::new(),
        };

        s.add_known_value("true", Value::Bool(true))
            .add_known_value("false", Value::Bool(false))
            .add_known_value("null", Value::Null);

        s.add_unary_operator("-", |v| Ok(Value::Number(-coerce::to_number(&v))))
            .add_unary_operator("+", |v| Ok(Value::Number(coerce::to_number(&v))))
            .add_unary_operator("!", |v| Ok(Value::Bool(!coerce::is_truthy(&v))))
            .add_unary_operator("~", |v| Ok(Value::Number(f64::from(!coerce::to_i32(&v)))));

        s.add_lazy_binary_operator("&&", 0, |l, right| {
            if coerce::is_truthy(&l) {
                right()
            } else {
                Ok(l)
            }
        });
        s.add_lazy_binary_operator("||", 0, |l, right| {
            if coerce::is_truthy(&l) {
                Ok(l)
            } else {
                right()
            }
        });

        s.add_binary_operator_with_precedence("|", 1, |l, r| {
            Ok(Value::Number(f64::from(coerce::to_i32(&l) | coerce::to_i32(&r))))
        });
        s.add_binary_operator_with_precedence("^", 1, |l, r| {
            Ok(Value::Number(f64::from(coerce::to_i32(&l) ^ coerce::to_i32(&r))))
        });
        s.add_binary_operator_with_precedence("&", 1, |l, r| {
            Ok(Value::Number(f64::from(coerce::to_i32(&l) & coerce::to_i32(&r))))
        });

        s.add_binary_operator_with_precedence("===", 2, |l, r| {
            Ok(Value::Bool(coerce::strict_eq(&l, &r)))
        });
        s.add_binary_operator_with_precedence("!==", 2, |l, r| {
            Ok(Value::Bool(!coerce::strict_eq(&l, &r)))
        });
        s.add_binary_operator_with_precedence("==", 2, |l, r| {
            Ok(Value::Bool(coerce::loose_eq(&l, &r)))
        });
        s.add_binary_operator_with_precedence("!=", 2, |l, r| {
            Ok(Value::Bool(!coerce::loose_eq(&l, &r)))
        });

        s.add_binary_operator_with_precedence("<<", 3, |l, r| {
            let shift = coerce::to_u32(&r) & 31;
            Ok(Value::Number(f64::from(coerce::to_i32(&l).wrapping_shl(shift))))
        });
        s.add_binary_operator_with_precedence(">>>", 3, |l, r| {
            let shift = coerce::to_u32(&r) & 31;
            Ok(Value::Number(f64::from(coerce::to_u32(&l).wrapping_shr(shift))))
        });
        s.add_binary_operator_with_precedence(">>", 3, |l, r| {
            let shift = coerce::to_u32(&r) & 31;
            Ok(Value::Number(f64::from(coerce::to_i32(&l).wrapping_shr(shift))))
        });

        s.add_binary_operator_with_precedence("<=", 4, |l, r| {
            Ok(Value::Bool(matches!(
                coerce::compare(&l, &r),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            )))
        });
        s.add_binary_operator_with_precedence(">=", 4, |l, r| {
            Ok(Value::Bool(matches!(
                coerce::compare(&l, &r),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            )))
        });
        s.add_binary_operator_with_precedence("<", 4, |l, r| {
            Ok(Value::Bool(matches!(
                coerce::compare(&l, &r),
                Some(std::cmp::Ordering::Less)
            )))
        });
        s.add_binary_operator_with_precedence(">", 4, |l, r| {
            Ok(Value::Bool(matches!(
                coerce::compare(&l, &r),
                Some(std::cmp::Ordering::Greater)
            )))
        });

        s.add_binary_operator_with_precedence("+", 5, |l, r| Ok(coerce::add(&l, &r)));
        s.add_binary_operator_with_precedence("-", 5, |l, r| {
            Ok(Value::Number(coerce::to_number(&l) - coerce::to_number(&r)))
        });

        s.add_binary_operator_with_precedence("*", 6, |l, r| {
            Ok(Value::Number(coerce::to_number(&l) * coerce::to_number(&r)))
        });
        s.add_binary_operator_with_precedence("/", 6, |l, r| {
            Ok(Value::Number(coerce::to_number(&l) / coerce::to_number(&r)))
        });
        s.add_binary_operator_with_precedence("%", 6, |l, r| {
            Ok(Value::Number(coerce::to_number(&l) % coerce::to_number(&r)))
        });

        s
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Register (or replace) a known identifier and the value it folds to.
    pub fn add_known_value(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.knowns.insert(name.into(), value);
        self
    }

    /// Register (or replace) a unary operator.
    pub fn add_unary_operator<F>(&mut self, symbol: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, EvalError> + 'static,
    {
        let symbol = symbol.into();
        if !self.unary.contains_key(&symbol) {
            self.unary_order.push(symbol.clone());
            // stable sort keeps registration order within a length class
            self.unary_order.sort_by(|a, b| b.len().cmp(&a.len()));
        }
        self.unary.insert(symbol, Rc::new(func));
        self
    }

    /// Register (or replace) a binary operator at [`DEFAULT_PRECEDENCE`].
    pub fn add_binary_operator<F>(&mut self, symbol: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Value, Value) -> Result<Value, EvalError> + 'static,
    {
        self.add_binary_operator_with_precedence(symbol, DEFAULT_PRECEDENCE, func)
    }

    /// Register (or replace) a binary operator with an explicit precedence
    /// rank (lower binds looser).
    pub fn add_binary_operator_with_precedence<F>(
        &mut self,
        symbol: impl Into<String>,
        precedence: u32,
        func: F,
    ) -> &mut Self
    where
        F: Fn(Value, Value) -> Result<Value, EvalError> + 'static,
    {
        self.insert_binary(
            symbol.into(),
            BinaryOperator {
                precedence,
                kind: BinaryKind::Eager(Rc::new(func)),
            },
        );
        self
    }

    fn add_lazy_binary_operator<F>(&mut self, symbol: &str, precedence: u32, func: F) -> &mut Self
    where
        F: Fn(Value, &mut dyn FnMut() -> Result<Value, EvalError>) -> Result<Value, EvalError>
            + 'static,
    {
        self.insert_binary(
            symbol.to_string(),
            BinaryOperator {
                precedence,
                kind: BinaryKind::Lazy(Rc::new(func)),
            },
        );
        self
    }

    fn insert_binary(&mut self, symbol: String, op: BinaryOperator) {
        if !self.binary.contains_key(&symbol) {
            self.binary_order.push(symbol.clone());
            self.binary_order.sort_by(|a, b| b.len().cmp(&a.len()));
        }
        self.binary.insert(symbol, op);
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    pub fn contains_known(&self, name: &str) -> bool {
        self.knowns.contains_key(name)
    }

    pub fn get_known_value(&self, name: &str) -> Option<&Value> {
        self.knowns.get(name)
    }

    pub fn contains_unary(&self, symbol: &str) -> bool {
        self.unary.contains_key(symbol)
    }

    pub fn get_unary_operator(&self, symbol: &str) -> Option<&UnaryFn> {
        self.unary.get(symbol)
    }

    pub fn contains_binary(&self, symbol: &str) -> bool {
        self.binary.contains_key(symbol)
    }

    pub fn get_binary_operator(&self, symbol: &str) -> Option<&BinaryOperator> {
        self.binary.get(symbol)
    }

    // ── Enumeration ──────────────────────────────────────────────────────────

    /// All known identifiers, in registration order.
    pub fn known_identifiers(&self) -> impl Iterator<Item = &str> {
        self.knowns.keys().map(String::as_str)
    }

    /// All unary operator symbols, longest-symbol-first.
    pub fn unary_operators(&self) -> impl Iterator<Item = &str> {
        self.unary_order.iter().map(String::as_str)
    }

    /// All binary operator symbols, longest-symbol-first. Any caller
    /// building its own tokenizer front end must try candidates in this
    /// order.
    pub fn binary_operators(&self) -> impl Iterator<Item = &str> {
        self.binary_order.iter().map(String::as_str)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}
