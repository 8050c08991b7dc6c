// Abstract Syntax Tree definitions
// Nodes are immutable once built; an AST may be evaluated repeatedly

use crate::value::Value;

/// Expression node.
///
/// This is the closed set of node shapes the parser can produce, matched
/// exhaustively by the evaluator. Children are fully-formed expressions;
/// there are no partial or placeholder nodes. The parser's transient
/// assignment shape (an object member) is realized directly as the
/// `(name, value)` pairs of [`Expr::Object`], so a standalone assignment
/// node is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A concrete value: number, string, boolean, null, or any value a
    /// known identifier folded in.
    Literal(Value),

    /// Identifier resolved against the scope chain at evaluation time.
    Variable(String),

    /// Prefix operator application, e.g. `!active`.
    Unary { operator: String, target: Box<Expr> },

    /// Infix operator application; the operator set is registry-defined.
    Binary {
        operator: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Parenthesized, possibly comma-separated sequence. Single-element
    /// groups collapse to the inner expression during evaluation.
    Group(Vec<Expr>),

    /// Object constructor: ordered `(name, value)` members, last-wins on
    /// duplicate names.
    Object(Vec<(String, Expr)>),

    /// Array constructor.
    Array(Vec<Expr>),

    /// Dotted access, e.g. `company.name`.
    Member { owner: Box<Expr>, member: String },

    /// Bracketed/computed access, e.g. `company["name"]`.
    Indexer { owner: Box<Expr>, key: Box<Expr> },

    /// Anonymous function literal; evaluates to a callable closure.
    Func {
        parameters: Vec<String>,
        body: Box<Expr>,
    },

    /// Invocation of the callee with evaluated arguments.
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Conditional, e.g. `check ? a : b`; only the taken branch is
    /// evaluated.
    Ternary {
        predicate: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
}

impl Expr {
    /// Create a literal node.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Create a variable reference node.
    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    /// Create a unary operator node.
    pub fn unary(operator: impl Into<String>, target: Expr) -> Self {
        Expr::Unary {
            operator: operator.into(),
            target: Box::new(target),
        }
    }

    /// Create a binary operator node.
    pub fn binary(operator: impl Into<String>, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            operator: operator.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn group(expressions: Vec<Expr>) -> Self {
        Expr::Group(expressions)
    }

    pub fn object(members: Vec<(String, Expr)>) -> Self {
        Expr::Object(members)
    }

    pub fn array(items: Vec<Expr>) -> Self {
        Expr::Array(items)
    }

    pub fn member(owner: Expr, member: impl Into<String>) -> Self {
        Expr::Member {
            owner: Box::new(owner),
            member: member.into(),
        }
    }

    pub fn indexer(owner: Expr, key: Expr) -> Self {
        Expr::Indexer {
            owner: Box::new(owner),
            key: Box::new(key),
        }
    }

    pub fn func(parameters: Vec<String>, body: Expr) -> Self {
        Expr::Func {
            parameters,
            body: Box::new(body),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn ternary(predicate: Expr, when_true: Expr, when_false: Expr) -> Self {
        Expr::Ternary {
            predicate: Box::new(predicate),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let lit = Expr::literal(42.0);
        assert!(matches!(lit, Expr::Literal(Value::Number(_))));

        let var = Expr::variable("name");
        assert!(matches!(var, Expr::Variable(_)));

        let neg = Expr::unary("-", Expr::variable("x"));
        assert!(matches!(neg, Expr::Unary { .. }));
    }

    #[test]
    fn test_binary_node() {
        let node = Expr::binary("+", Expr::literal(1.0), Expr::literal(2.0));
        match node {
            Expr::Binary {
                operator,
                left,
                right,
            } => {
                assert_eq!(operator, "+");
                assert_eq!(*left, Expr::literal(1.0));
                assert_eq!(*right, Expr::literal(2.0));
            }
            other => panic!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn test_equality() {
        let a = Expr::member(Expr::variable("company"), "name");
        let b = Expr::member(Expr::variable("company"), "name");
        assert_eq!(a, b);
    }
}
