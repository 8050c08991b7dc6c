// parseval - Embeddable expression parser and evaluator
// Copyright (c) 2025 parseval contributors
// Licensed under the MIT License

//! # parseval
//!
//! A small embeddable expression language: parse a source string into an
//! AST, then evaluate it against caller-supplied scope data. Operators
//! and known identifiers live in a [`Settings`] registry, so hosts can
//! extend the language without touching the grammar.
//!
//! ## Architecture
//!
//! - `parser` - Recursive-descent expression parser
//! - `ast` - Expression tree definitions
//! - `evaluator` - Tree-walk evaluator over a scope chain
//! - `settings` - Operator and known-identifier registry
//! - `value` - The dynamic value model
//! - `coerce` - Loose typing and coercion rules
//! - `datetime` - Date parsing and formatting
//!
//! ## Examples
//!
//! ```
//! use parseval::{evaluate, value, Value};
//!
//! let scope = value!({ "v1": 4, "v2": 2 });
//! let result = evaluate("v1 * v2 + 2", &[scope]).unwrap();
//! assert_eq!(result, Value::Number(10.0));
//! ```
//!
//! Expressions can evaluate to callable functions:
//!
//! ```
//! use parseval::{evaluate, value, Value};
//!
//! let less = evaluate("(a, b) => a < b", &[]).unwrap();
//! let less = less.as_function().unwrap();
//! assert_eq!(less.call(&[value!(2), value!(1)]).unwrap(), Value::Bool(false));
//! ```
//!
//! Custom operators compose with the builtin precedence ladder:
//!
//! ```
//! use parseval::{evaluate_with, value, Settings, Value};
//! use parseval::coerce::to_number;
//!
//! let mut settings = Settings::new();
//! settings.add_binary_operator_with_precedence("mul", 0, |l, r| {
//!     Ok(Value::Number(to_number(&l) * to_number(&r)))
//! });
//! let result = evaluate_with("2 mul 3 + 5", &settings, &[]).unwrap();
//! assert_eq!(result, Value::Number(16.0));
//! ```

use thiserror::Error;

pub mod ast;
pub mod coerce;
pub mod datetime;
pub mod evaluator;
mod functions;
pub mod parser;
pub mod settings;
pub mod value;

pub use ast::Expr;
pub use evaluator::{EvalError, Evaluator};
pub use parser::{ParseError, Parser};
pub use settings::Settings;
pub use value::{Function, Value};

/// Either failure mode of [`evaluate`]: a parse error with the failing
/// source index, or an evaluation error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Parse `text` with the default [`Settings`].
///
/// Empty or whitespace-only input yields `Ok(None)`.
pub fn parse(text: &str) -> Result<Option<Expr>, ParseError> {
    let settings = Settings::new();
    Parser::new(text, &settings).parse()
}

/// Parse `text` against a custom registry.
pub fn parse_with(text: &str, settings: &Settings) -> Result<Option<Expr>, ParseError> {
    Parser::new(text, settings).parse()
}

/// Parse and evaluate `text` with the default [`Settings`] against an
/// ordered scope chain (earliest scope wins). Empty input evaluates to
/// [`Value::Undefined`].
pub fn evaluate(text: &str, scopes: &[Value]) -> Result<Value, Error> {
    Evaluator::new().evaluate_str(text, scopes)
}

/// Parse and evaluate `text` against a custom registry.
pub fn evaluate_with(text: &str, settings: &Settings, scopes: &[Value]) -> Result<Value, Error> {
    Evaluator::with_settings(settings.clone()).evaluate_str(text, scopes)
}
