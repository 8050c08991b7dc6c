// Recursive-descent expression parser
// Single pass over the source characters, no separate token stream

use thiserror::Error;

use crate::ast::Expr;
use crate::settings::Settings;

/// Parser errors, each carrying the source index where the failure was
/// detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected character `{ch}` at index {index}")]
    UnexpectedCharacter { ch: char, index: usize },

    #[error("Cannot parse expression, stuck at index {index}")]
    UnconsumedInput { index: usize },

    #[error("Unclosed quote at index {index}")]
    UnclosedQuote { index: usize },

    #[error("Unterminated template literal at index {index}")]
    UnterminatedTemplate { index: usize },

    #[error("Expected `{expected}` at index {index}")]
    Expected { expected: String, index: usize },

    #[error("Invalid assignment at index {index}")]
    InvalidAssignment { index: usize },

    #[error("Invalid member identifier at index {index}")]
    InvalidMember { index: usize },

    #[error("Invalid indexer key at index {index}")]
    InvalidIndexer { index: usize },

    #[error("Invalid parameter at index {index}")]
    InvalidParameter { index: usize },

    #[error("Expected an expression at index {index}")]
    ExpressionExpected { index: usize },

    #[error("Expression nesting too deep at index {index}")]
    TooDeep { index: usize },
}

impl ParseError {
    /// Source index where the failure was detected.
    pub fn index(&self) -> usize {
        match self {
            ParseError::UnexpectedCharacter { index, .. }
            | ParseError::UnconsumedInput { index }
            | ParseError::UnclosedQuote { index }
            | ParseError::UnterminatedTemplate { index }
            | ParseError::Expected { index, .. }
            | ParseError::InvalidAssignment { index }
            | ParseError::InvalidMember { index }
            | ParseError::InvalidIndexer { index }
            | ParseError::InvalidParameter { index }
            | ParseError::ExpressionExpected { index }
            | ParseError::TooDeep { index } => *index,
        }
    }
}

/// Recursion limit for nested expressions
const MAX_DEPTH: usize = 200;

/// Recursive-descent parser over a character vector.
///
/// Operator and known-identifier symbols come from the [`Settings`]
/// registry, so custom operators participate in parsing with no
/// grammar changes.
pub struct Parser<'a> {
    input: Vec<char>,
    position: usize,
    depth: usize,
    settings: &'a Settings,
}

impl<'a> Parser<'a> {
    pub fn new(text: &str, settings: &'a Settings) -> Self {
        Parser {
            input: text.chars().collect(),
            position: 0,
            depth: 0,
            settings,
        }
    }

    /// Parse the whole input. Empty or whitespace-only input yields
    /// `Ok(None)`; anything left unconsumed after the expression is an
    /// error.
    pub fn parse(mut self) -> Result<Option<Expr>, ParseError> {
        if self.input.is_empty() {
            return Ok(None);
        }

        let exp = self.get_exp()?;

        if self.position < self.input.len() {
            return Err(ParseError::UnconsumedInput {
                index: self.position,
            });
        }

        Ok(exp)
    }

    // ── Expression dispatch ──────────────────────────────────────────

    fn get_exp(&mut self) -> Result<Option<Expr>, ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep {
                index: self.position,
            });
        }
        let result = self.get_exp_inner();
        self.depth -= 1;
        result
    }

    fn get_exp_inner(&mut self) -> Result<Option<Expr>, ParseError> {
        self.skip();

        let Some(mut exp) = self.primary()? else {
            return Ok(None);
        };

        // known identifiers fold to their value right after the primary
        let known = match &exp {
            Expr::Variable(name) => self.settings.get_known_value(name).cloned(),
            _ => None,
        };
        if let Some(value) = known {
            exp = Expr::Literal(value);
        }

        // postfix/infix extensions, retried until none apply
        loop {
            self.skip();

            if self.get(".") {
                exp = self.member_exp(exp)?;
            } else if self.get("[") {
                exp = self.indexer_exp(exp)?;
            } else if self.get("=>") {
                let parameters = self.parameters(exp)?;
                let body = self.require_exp()?;
                exp = Expr::func(parameters, body);
            } else if matches!(&exp, Expr::Variable(name) if name == "function") {
                exp = self.classic_func_exp()?;
            } else if self.get("(") {
                exp = Expr::call(exp, self.get_group()?);
            } else if self.get("?") {
                exp = self.ternary_exp(exp)?;
            } else if let Some(op) = self.match_binary_operator() {
                exp = self.binary_exp(exp, op)?;
            } else {
                break;
            }
        }

        Ok(Some(exp))
    }

    fn require_exp(&mut self) -> Result<Expr, ParseError> {
        match self.get_exp()? {
            Some(exp) => Ok(exp),
            None => Err(ParseError::ExpressionExpected {
                index: self.position,
            }),
        }
    }

    // ── Primary productions ──────────────────────────────────────────

    fn primary(&mut self) -> Result<Option<Expr>, ParseError> {
        if let Some(exp) = self.try_numeric()? {
            return Ok(Some(exp));
        }
        if let Some(exp) = self.try_string()? {
            return Ok(Some(exp));
        }
        if let Some(exp) = self.try_identifier() {
            return Ok(Some(exp));
        }
        if let Some(exp) = self.try_unary()? {
            return Ok(Some(exp));
        }
        if self.get("(") {
            return Ok(Some(Expr::group(self.get_group()?)));
        }
        if self.get("{") {
            return Ok(Some(self.object_exp()?));
        }
        if self.get("[") {
            return Ok(Some(self.array_exp()?));
        }
        Ok(None)
    }

    fn try_numeric(&mut self) -> Result<Option<Expr>, ParseError> {
        let mut digits = String::new();
        self.read_digits(&mut digits);

        // only take the separator as part of a number, not a member dot
        if self.current() == Some('.')
            && (!digits.is_empty() || self.peek_at(self.position + 1).is_some_and(|c| c.is_ascii_digit()))
        {
            self.position += 1;
            digits.push('.');
            self.read_digits(&mut digits);
        }

        if digits.is_empty() {
            return Ok(None);
        }

        if let Some(ch) = self.current() {
            if is_variable_start(ch) {
                return Err(ParseError::UnexpectedCharacter {
                    ch,
                    index: self.position,
                });
            }
        }

        let value: f64 = digits.parse().unwrap_or(f64::NAN);
        Ok(Some(Expr::literal(value)))
    }

    fn try_string(&mut self) -> Result<Option<Expr>, ParseError> {
        let quote = match self.current() {
            Some(c @ ('\'' | '"' | '`')) => c,
            _ => return Ok(None),
        };
        let template = quote == '`';

        let mut segments: Vec<Expr> = Vec::new();
        let mut text = String::new();

        loop {
            let Some(ch) = self.move_next() else {
                return Err(ParseError::UnclosedQuote {
                    index: self.position,
                });
            };

            if ch == quote {
                self.move_next();

                if segments.is_empty() {
                    return Ok(Some(Expr::literal(text)));
                }
                if !text.is_empty() {
                    segments.push(Expr::literal(text));
                }
                // fold interpolation segments into nested concatenations,
                // seeded with an empty string so the result is always a string
                let folded = segments
                    .into_iter()
                    .fold(Expr::literal(""), |acc, seg| Expr::binary("+", acc, seg));
                return Ok(Some(folded));
            }

            if ch == '\\' {
                match self.move_next() {
                    Some('b') => text.push('\u{8}'),
                    Some('f') => text.push('\u{c}'),
                    Some('n') => text.push('\n'),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some('v') => text.push('\u{b}'),
                    Some('0') => text.push('\0'),
                    Some('\\') => text.push('\\'),
                    Some('\'') => text.push('\''),
                    Some('"') => text.push('"'),
                    Some(other) => {
                        // unknown escapes pass through literally
                        text.push('\\');
                        text.push(other);
                    }
                    None => {
                        return Err(ParseError::UnclosedQuote {
                            index: self.position,
                        })
                    }
                }
            } else if template && ch == '$' && self.peek_at(self.position + 1) == Some('{') {
                self.position += 2;
                if !text.is_empty() {
                    segments.push(Expr::literal(std::mem::take(&mut text)));
                }
                segments.push(self.require_exp()?);
                self.skip();

                if self.current() != Some('}') {
                    return Err(ParseError::UnterminatedTemplate {
                        index: self.position,
                    });
                }
                // the closing brace is consumed by the next move
            } else {
                text.push(ch);
            }
        }
    }

    fn try_identifier(&mut self) -> Option<Expr> {
        let name = self.get_variable_name();
        if name.is_empty() {
            None
        } else {
            Some(Expr::variable(name))
        }
    }

    fn try_unary(&mut self) -> Result<Option<Expr>, ParseError> {
        let settings = self.settings;
        let matched = settings.unary_operators().find(|op| self.get(op));
        match matched {
            Some(op) => {
                // the operand is the full remainder expression
                let target = self.require_exp()?;
                Ok(Some(Expr::unary(op, target)))
            }
            None => Ok(None),
        }
    }

    /// Comma-separated expression list, terminated by `)`. Shared by
    /// group primaries and call argument lists.
    fn get_group(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        loop {
            if let Some(exp) = self.get_exp()? {
                items.push(exp);
            }
            if !self.get(",") {
                break;
            }
        }
        self.to(")")?;
        Ok(items)
    }

    fn object_exp(&mut self) -> Result<Expr, ParseError> {
        let mut members: Vec<(String, Expr)> = Vec::new();

        loop {
            self.skip();
            // tolerate `{}` and a trailing comma
            if self.current() == Some('}') {
                break;
            }

            let key_exp = self.require_exp()?;
            self.skip();

            match key_exp {
                Expr::Variable(name) => {
                    if self.get(":") {
                        self.skip();
                        let value = self.require_exp()?;
                        members.push((name, value));
                    } else {
                        // shorthand: `{ name }` reads `name` from scope
                        let value = Expr::variable(name.clone());
                        members.push((name, value));
                    }
                }
                Expr::Member { owner, member } => {
                    if self.get(":") {
                        return Err(ParseError::InvalidAssignment {
                            index: self.position,
                        });
                    }
                    // member shorthand keys by the trailing name
                    members.push((member.clone(), Expr::member(*owner, member)));
                }
                _ => {
                    return Err(ParseError::InvalidAssignment {
                        index: self.position,
                    })
                }
            }

            if !self.get(",") {
                break;
            }
        }

        self.to("}")?;
        Ok(Expr::object(members))
    }

    fn array_exp(&mut self) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        loop {
            if let Some(exp) = self.get_exp()? {
                items.push(exp);
            }
            if !self.get(",") {
                break;
            }
        }
        self.to("]")?;
        Ok(Expr::array(items))
    }

    // ── Postfix and infix extensions ─────────────────────────────────

    fn member_exp(&mut self, owner: Expr) -> Result<Expr, ParseError> {
        self.skip();
        let name = self.get_variable_name();
        if name.is_empty() {
            return Err(ParseError::InvalidMember {
                index: self.position,
            });
        }
        Ok(Expr::member(owner, name))
    }

    fn indexer_exp(&mut self, owner: Expr) -> Result<Expr, ParseError> {
        self.skip();
        let Some(key) = self.get_exp()? else {
            return Err(ParseError::InvalidIndexer {
                index: self.position,
            });
        };
        self.to("]")?;
        Ok(Expr::indexer(owner, key))
    }

    /// `function (a, b) { return a < b; }`, recognized once the
    /// `function` identifier has already been read as a variable.
    fn classic_func_exp(&mut self) -> Result<Expr, ParseError> {
        let head = self.require_exp()?;
        let parameters = self.parameters(head)?;

        self.to("{")?;
        self.skip();
        self.get("return");

        let body = self.require_exp()?;
        self.get(";");
        self.to("}")?;

        Ok(Expr::func(parameters, body))
    }

    fn parameters(&self, exp: Expr) -> Result<Vec<String>, ParseError> {
        match exp {
            Expr::Group(items) => items
                .into_iter()
                .map(|item| match item {
                    Expr::Variable(name) => Ok(name),
                    _ => Err(ParseError::InvalidParameter {
                        index: self.position,
                    }),
                })
                .collect(),
            Expr::Variable(name) => Ok(vec![name]),
            _ => Err(ParseError::InvalidParameter {
                index: self.position,
            }),
        }
    }

    fn ternary_exp(&mut self, predicate: Expr) -> Result<Expr, ParseError> {
        let when_true = self.require_exp()?;
        self.to(":")?;
        let when_false = self.require_exp()?;
        Ok(Expr::ternary(predicate, when_true, when_false))
    }

    fn match_binary_operator(&mut self) -> Option<&'a str> {
        // symbols come longest-first so `==` wins over `=`-prefixed input
        let settings = self.settings;
        settings.binary_operators().find(|op| self.get(op))
    }

    fn binary_exp(&mut self, left: Expr, operator: &str) -> Result<Expr, ParseError> {
        // the right operand is the whole remainder, then the tree is
        // rotated when the inner operator binds more loosely
        let right = self.require_exp()?;

        if let Expr::Binary {
            operator: right_op,
            left: right_left,
            right: right_right,
        } = right
        {
            return Ok(self.fix_precedence(left, operator, right_op, *right_left, *right_right));
        }

        Ok(Expr::binary(operator, left, right))
    }

    fn fix_precedence(
        &self,
        left: Expr,
        left_op: &str,
        right_op: String,
        right_left: Expr,
        right_right: Expr,
    ) -> Expr {
        let p1 = self.precedence_of(left_op);
        let p2 = self.precedence_of(&right_op);

        // rotate only on strictly lower rank; equal ranks group rightward
        if p2 < p1 {
            Expr::binary(right_op, Expr::binary(left_op, left, right_left), right_right)
        } else {
            Expr::binary(left_op, left, Expr::binary(right_op, right_left, right_right))
        }
    }

    fn precedence_of(&self, operator: &str) -> u32 {
        self.settings
            .get_binary_operator(operator)
            .map(|op| op.precedence)
            .unwrap_or(crate::settings::DEFAULT_PRECEDENCE)
    }

    // ── Character-level helpers ──────────────────────────────────────

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, index: usize) -> Option<char> {
        self.input.get(index).copied()
    }

    fn move_next(&mut self) -> Option<char> {
        self.position += 1;
        self.current()
    }

    fn skip(&mut self) {
        while self.current().is_some_and(is_space) {
            self.position += 1;
        }
    }

    /// Consume `target` if the input matches it at the current position.
    fn get(&mut self, target: &str) -> bool {
        let mut index = self.position;
        for ch in target.chars() {
            if self.peek_at(index) != Some(ch) {
                return false;
            }
            index += 1;
        }
        self.position = index;
        true
    }

    /// Skip whitespace, then require `target`.
    fn to(&mut self, target: &str) -> Result<(), ParseError> {
        self.skip();
        if self.get(target) {
            Ok(())
        } else {
            Err(ParseError::Expected {
                expected: target.to_string(),
                index: self.position,
            })
        }
    }

    fn read_digits(&mut self, out: &mut String) {
        while let Some(ch) = self.current() {
            if !ch.is_ascii_digit() {
                break;
            }
            out.push(ch);
            self.position += 1;
        }
    }

    fn get_variable_name(&mut self) -> String {
        let mut name = String::new();
        if self.current().is_some_and(is_variable_start) {
            while let Some(ch) = self.current() {
                if !is_variable_part(ch) {
                    break;
                }
                name.push(ch);
                self.position += 1;
            }
        }
        name
    }
}

fn is_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\u{a0}' | '\n' | '\r')
}

fn is_variable_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_ascii_alphabetic()
}

fn is_variable_part(ch: char) -> bool {
    is_variable_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn parse(text: &str) -> Option<Expr> {
        let settings = Settings::new();
        Parser::new(text, &settings).parse().unwrap()
    }

    fn parse_err(text: &str) -> ParseError {
        let settings = Settings::new();
        Parser::new(text, &settings).parse().unwrap_err()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   \t\n"), None);
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(parse("42"), Some(Expr::literal(42.0)));
        assert_eq!(parse("42.25"), Some(Expr::literal(42.25)));
        assert_eq!(parse(".5"), Some(Expr::literal(0.5)));
    }

    #[test]
    fn test_number_abutting_identifier() {
        assert!(matches!(
            parse_err("42d"),
            ParseError::UnexpectedCharacter { ch: 'd', index: 2 }
        ));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            parse(r#""\z\b\f\n\r\t\v\0\'\"\\""#),
            Some(Expr::literal("\\z\u{8}\u{c}\n\r\t\u{b}\0'\"\\"))
        );
    }

    #[test]
    fn test_unclosed_quote() {
        assert!(matches!(parse_err("\"blow"), ParseError::UnclosedQuote { .. }));
    }

    #[test]
    fn test_template_literal_fold() {
        // `${w}!` becomes "" + w + "!"
        let exp = parse("`${w}!`").unwrap();
        assert_eq!(
            exp,
            Expr::binary(
                "+",
                Expr::binary("+", Expr::literal(""), Expr::variable("w")),
                Expr::literal("!"),
            )
        );
    }

    #[test]
    fn test_unterminated_template() {
        assert!(matches!(
            parse_err("`don't ${w, 42`"),
            ParseError::UnterminatedTemplate { .. }
        ));
    }

    #[test]
    fn test_known_identifiers_fold() {
        assert_eq!(parse("true"), Some(Expr::literal(true)));
        assert_eq!(parse("false"), Some(Expr::literal(false)));
        assert_eq!(parse("null"), Some(Expr::Literal(Value::Null)));
        assert_eq!(parse("truthy"), Some(Expr::variable("truthy")));
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            parse("!active"),
            Some(Expr::unary("!", Expr::variable("active")))
        );
    }

    #[test]
    fn test_precedence_rotation() {
        // 1 + 2 * 3 needs no rotation
        assert_eq!(
            parse("1 + 2 * 3"),
            Some(Expr::binary(
                "+",
                Expr::literal(1.0),
                Expr::binary("*", Expr::literal(2.0), Expr::literal(3.0)),
            ))
        );
        // 1 * 2 + 3 rotates to (1 * 2) + 3
        assert_eq!(
            parse("1 * 2 + 3"),
            Some(Expr::binary(
                "+",
                Expr::binary("*", Expr::literal(1.0), Expr::literal(2.0)),
                Expr::literal(3.0),
            ))
        );
    }

    #[test]
    fn test_equal_precedence_groups_rightward() {
        assert_eq!(
            parse("a - b - c"),
            Some(Expr::binary(
                "-",
                Expr::variable("a"),
                Expr::binary("-", Expr::variable("b"), Expr::variable("c")),
            ))
        );
    }

    #[test]
    fn test_member_and_indexer() {
        assert_eq!(
            parse("company.name"),
            Some(Expr::member(Expr::variable("company"), "name"))
        );
        assert_eq!(
            parse("company[\"name\"]"),
            Some(Expr::indexer(Expr::variable("company"), Expr::literal("name")))
        );
    }

    #[test]
    fn test_invalid_member_and_indexer() {
        assert!(matches!(
            parse_err("Company.5"),
            ParseError::InvalidMember { .. }
        ));
        assert!(matches!(
            parse_err("Company[]"),
            ParseError::InvalidIndexer { .. }
        ));
    }

    #[test]
    fn test_arrow_function() {
        assert_eq!(
            parse("(a, b) => a"),
            Some(Expr::func(
                vec!["a".to_string(), "b".to_string()],
                Expr::variable("a"),
            ))
        );
        assert_eq!(
            parse("a => a"),
            Some(Expr::func(vec!["a".to_string()], Expr::variable("a")))
        );
    }

    #[test]
    fn test_classic_function() {
        assert_eq!(
            parse("function (a, b) { return a; }"),
            Some(Expr::func(
                vec!["a".to_string(), "b".to_string()],
                Expr::variable("a"),
            ))
        );
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            parse_err("(a, 4) => a < b"),
            ParseError::InvalidParameter { .. }
        ));
        assert!(matches!(
            parse_err("2 => a < b"),
            ParseError::InvalidParameter { .. }
        ));
    }

    #[test]
    fn test_call() {
        assert_eq!(
            parse("check(42)"),
            Some(Expr::call(Expr::variable("check"), vec![Expr::literal(42.0)]))
        );
    }

    #[test]
    fn test_ternary() {
        assert_eq!(
            parse("a ? 1 : 2"),
            Some(Expr::ternary(
                Expr::variable("a"),
                Expr::literal(1.0),
                Expr::literal(2.0),
            ))
        );
    }

    #[test]
    fn test_object() {
        assert_eq!(
            parse("{ a: 1, b }"),
            Some(Expr::object(vec![
                ("a".to_string(), Expr::literal(1.0)),
                ("b".to_string(), Expr::variable("b")),
            ]))
        );
        // member shorthand keys by the trailing name
        assert_eq!(
            parse("{ a.b }"),
            Some(Expr::object(vec![(
                "b".to_string(),
                Expr::member(Expr::variable("a"), "b"),
            )]))
        );
        assert_eq!(parse("{}"), Some(Expr::object(vec![])));
    }

    #[test]
    fn test_object_errors() {
        assert!(matches!(
            parse_err("{ a: 4 "),
            ParseError::Expected { .. }
        ));
        assert!(matches!(
            parse_err("{ 4: 4 }"),
            ParseError::InvalidAssignment { .. }
        ));
        assert!(matches!(
            parse_err("{ a.b: 4 }"),
            ParseError::InvalidAssignment { .. }
        ));
    }

    #[test]
    fn test_array() {
        assert_eq!(
            parse("[1, 2]"),
            Some(Expr::array(vec![Expr::literal(1.0), Expr::literal(2.0)]))
        );
        assert_eq!(parse("[]"), Some(Expr::array(vec![])));
    }

    #[test]
    fn test_group() {
        assert_eq!(
            parse("(a, b)"),
            Some(Expr::group(vec![Expr::variable("a"), Expr::variable("b")]))
        );
    }

    #[test]
    fn test_unconsumed_input() {
        assert!(matches!(
            parse_err("#"),
            ParseError::UnconsumedInput { index: 0 }
        ));
    }

    #[test]
    fn test_custom_operator_symbols_parse() {
        let mut settings = Settings::new();
        settings.add_binary_operator("mul", |l, r| {
            Ok(Value::Number(crate::coerce::to_number(&l) * crate::coerce::to_number(&r)))
        });
        let exp = Parser::new("2 mul 3", &settings).parse().unwrap().unwrap();
        assert_eq!(
            exp,
            Expr::binary("mul", Expr::literal(2.0), Expr::literal(3.0))
        );
    }

    #[test]
    fn test_too_deep() {
        let text = "(".repeat(400) + "1" + &")".repeat(400);
        assert!(matches!(parse_err(&text), ParseError::TooDeep { .. }));
    }
}
