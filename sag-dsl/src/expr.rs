//! Expression evaluator
//!
//! Re-enters the wire grammar for the expression substrings the parser
//! preserved on the AST. Whitespace is stripped before lexing (the grammar
//! never carries whitespace through expression productions), the precedence
//! ladder is parsed into a small tree, and the tree is evaluated against a
//! caller-supplied `Context`.

use crate::lexer::{Lexer, Token, TokenKind};
use sag_core::{Context, EvalError, Value};

/// Evaluate an expression string against a context.
///
/// An empty expression evaluates to null. Logical operators short-circuit;
/// ordering requires numeric operands; arithmetic coerces to doubles.
pub fn evaluate(expression: &str, context: &dyn Context) -> Result<Value, EvalError> {
    let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(Value::Null);
    }

    let tokens = Lexer::new(&compact).tokenize();
    let node = ExprParser::new(expression, tokens).parse()?;
    eval_node(&node, context, expression)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Ge => ">=",
            BinOp::Le => "<=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone)]
enum ExprNode {
    Literal(Value),
    PathRef(String),
    Binary {
        op: BinOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
}

struct ExprParser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(expression: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            expression,
            tokens,
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<ExprNode, EvalError> {
        for token in &self.tokens {
            if let TokenKind::Error(message) = &token.kind {
                return Err(self.invalid(message));
            }
        }
        let node = self.parse_or()?;
        if self.tokens[self.pos].kind != TokenKind::Eof {
            return Err(self.invalid("unexpected trailing input"));
        }
        Ok(node)
    }

    fn parse_or(&mut self) -> Result<ExprNode, EvalError> {
        let mut left = self.parse_and()?;
        while self.kind() == &TokenKind::OrOr {
            self.pos += 1;
            let right = self.parse_and()?;
            left = binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ExprNode, EvalError> {
        let mut left = self.parse_rel()?;
        while self.kind() == &TokenKind::AndAnd {
            self.pos += 1;
            let right = self.parse_rel()?;
            left = binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_rel(&mut self) -> Result<ExprNode, EvalError> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.kind() {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::Le => BinOp::Le,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_add()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<ExprNode, EvalError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<ExprNode, EvalError> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_primary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<ExprNode, EvalError> {
        if self.kind() == &TokenKind::LParen {
            self.pos += 1;
            let inner = self.parse_or()?;
            if self.kind() != &TokenKind::RParen {
                return Err(self.invalid("expected ')'"));
            }
            self.pos += 1;
            return Ok(inner);
        }
        self.parse_value_literal()
    }

    fn parse_value_literal(&mut self) -> Result<ExprNode, EvalError> {
        let node = match self.kind().clone() {
            TokenKind::Str(s) => ExprNode::Literal(Value::String(s)),
            TokenKind::Int(n) => ExprNode::Literal(Value::Int(n)),
            TokenKind::Float(f) => ExprNode::Literal(Value::Float(f)),
            TokenKind::Bool(b) => ExprNode::Literal(Value::Bool(b)),
            TokenKind::Null => ExprNode::Literal(Value::Null),
            TokenKind::Ident(path) => ExprNode::PathRef(path),
            TokenKind::Priority(p) => ExprNode::PathRef(p.as_wire().to_string()),
            TokenKind::LBracket => return self.parse_list_literal(),
            TokenKind::LBrace => return self.parse_object_literal(),
            _ => return Err(self.invalid("expected a value")),
        };
        self.pos += 1;
        Ok(node)
    }

    fn parse_list_literal(&mut self) -> Result<ExprNode, EvalError> {
        self.pos += 1; // [
        let mut items = Vec::new();
        if self.kind() != &TokenKind::RBracket {
            loop {
                items.push(self.literal_value()?);
                if self.kind() == &TokenKind::Comma {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        if self.kind() != &TokenKind::RBracket {
            return Err(self.invalid("expected ']'"));
        }
        self.pos += 1;
        Ok(ExprNode::Literal(Value::List(items)))
    }

    fn parse_object_literal(&mut self) -> Result<ExprNode, EvalError> {
        self.pos += 1; // {
        let mut members = Vec::new();
        if self.kind() != &TokenKind::RBrace {
            loop {
                let key = match self.kind().clone() {
                    TokenKind::Str(s) => s,
                    _ => return Err(self.invalid("expected object key string")),
                };
                self.pos += 1;
                if self.kind() != &TokenKind::Colon {
                    return Err(self.invalid("expected ':'"));
                }
                self.pos += 1;
                members.push((key, self.literal_value()?));
                if self.kind() == &TokenKind::Comma {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        if self.kind() != &TokenKind::RBrace {
            return Err(self.invalid("expected '}'"));
        }
        self.pos += 1;
        Ok(ExprNode::Literal(Value::Object(members)))
    }

    /// A nested literal inside a list or object. Paths stay paths; they are
    /// not resolved until evaluation reaches them, and inside collection
    /// literals they evaluate to their textual form.
    fn literal_value(&mut self) -> Result<Value, EvalError> {
        match self.parse_value_literal()? {
            ExprNode::Literal(v) => Ok(v),
            ExprNode::PathRef(p) => Ok(Value::Path(p)),
            ExprNode::Binary { .. } => Err(self.invalid("expected a literal value")),
        }
    }

    fn kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn invalid(&self, reason: &str) -> EvalError {
        EvalError::InvalidExpression {
            expression: self.expression.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn binary(op: BinOp, left: ExprNode, right: ExprNode) -> ExprNode {
    ExprNode::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn eval_node(node: &ExprNode, context: &dyn Context, expression: &str) -> Result<Value, EvalError> {
    match node {
        ExprNode::Literal(value) => Ok(value.clone()),
        ExprNode::PathRef(path) => Ok(context.get(path).unwrap_or(Value::Null)),
        ExprNode::Binary { op, left, right } => match op {
            BinOp::Or => {
                let l = eval_node(left, context, expression)?;
                if l.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let r = eval_node(right, context, expression)?;
                Ok(Value::Bool(r.is_truthy()))
            }
            BinOp::And => {
                let l = eval_node(left, context, expression)?;
                if !l.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let r = eval_node(right, context, expression)?;
                Ok(Value::Bool(r.is_truthy()))
            }
            BinOp::Eq => {
                let l = eval_node(left, context, expression)?;
                let r = eval_node(right, context, expression)?;
                Ok(Value::Bool(l.loose_eq(&r)))
            }
            BinOp::Ne => {
                let l = eval_node(left, context, expression)?;
                let r = eval_node(right, context, expression)?;
                Ok(Value::Bool(!l.loose_eq(&r)))
            }
            BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le => {
                let l = eval_node(left, context, expression)?;
                let r = eval_node(right, context, expression)?;
                let (a, b) = match (l.as_f64(), r.as_f64()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => {
                        return Err(EvalError::InvalidExpression {
                            expression: expression.to_string(),
                            reason: format!(
                                "cannot compare non-numeric values with '{}'",
                                op.symbol()
                            ),
                        })
                    }
                };
                let result = match op {
                    BinOp::Gt => a > b,
                    BinOp::Lt => a < b,
                    BinOp::Ge => a >= b,
                    BinOp::Le => a <= b,
                    _ => unreachable!(),
                };
                Ok(Value::Bool(result))
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                let l = eval_node(left, context, expression)?;
                let r = eval_node(right, context, expression)?;
                let (a, b) = match (l.as_f64(), r.as_f64()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => {
                        return Err(EvalError::InvalidExpression {
                            expression: expression.to_string(),
                            reason: format!(
                                "cannot apply '{}' to non-numeric values",
                                op.symbol()
                            ),
                        })
                    }
                };
                let result = match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            return Err(EvalError::DivisionByZero {
                                expression: expression.to_string(),
                            });
                        }
                        a / b
                    }
                    _ => unreachable!(),
                };
                Ok(Value::Float(result))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sag_core::MapContext;

    fn ctx(pairs: &[(&str, Value)]) -> MapContext {
        let mut context = MapContext::new();
        for (path, value) in pairs {
            context.set(path, value.clone());
        }
        context
    }

    #[test]
    fn test_empty_expression_is_null() {
        let context = MapContext::new();
        assert_eq!(evaluate("", &context), Ok(Value::Null));
        assert_eq!(evaluate("   ", &context), Ok(Value::Null));
    }

    #[test]
    fn test_literals() {
        let context = MapContext::new();
        assert_eq!(evaluate("42", &context), Ok(Value::Int(42)));
        assert_eq!(evaluate("3.5", &context), Ok(Value::Float(3.5)));
        assert_eq!(evaluate("true", &context), Ok(Value::Bool(true)));
        assert_eq!(evaluate("null", &context), Ok(Value::Null));
        assert_eq!(evaluate("\"hi\"", &context), Ok(Value::from("hi")));
    }

    #[test]
    fn test_path_resolution() {
        let context = ctx(&[("system.cpu", Value::Int(85))]);
        assert_eq!(evaluate("system.cpu", &context), Ok(Value::Int(85)));
        assert_eq!(evaluate("system.missing", &context), Ok(Value::Null));
    }

    #[test]
    fn test_comparisons() {
        let context = ctx(&[("balance", Value::Int(1500))]);
        assert_eq!(evaluate("balance>1000", &context), Ok(Value::Bool(true)));
        assert_eq!(evaluate("balance<1000", &context), Ok(Value::Bool(false)));
        assert_eq!(evaluate("balance>=1500", &context), Ok(Value::Bool(true)));
        assert_eq!(evaluate("balance<=1499", &context), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_whitespace_is_stripped_before_lexing() {
        let context = ctx(&[("balance", Value::Int(1500))]);
        assert_eq!(evaluate("balance > 1000", &context), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_equality_rules() {
        let context = ctx(&[("x", Value::Int(5)), ("name", Value::from("ok"))]);
        assert_eq!(evaluate("x==5.0", &context), Ok(Value::Bool(true)));
        assert_eq!(evaluate("name==\"ok\"", &context), Ok(Value::Bool(true)));
        assert_eq!(evaluate("missing==null", &context), Ok(Value::Bool(true)));
        assert_eq!(evaluate("x!=null", &context), Ok(Value::Bool(true)));
        assert_eq!(evaluate("x==null", &context), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_ordering_requires_numbers() {
        let context = ctx(&[("name", Value::from("ok"))]);
        let err = evaluate("name>5", &context).expect_err("should fail");
        assert_eq!(err.code(), "INVALID_EXPRESSION");
    }

    #[test]
    fn test_arithmetic_coerces_to_double() {
        let context = MapContext::new();
        assert_eq!(evaluate("2+3", &context), Ok(Value::Float(5.0)));
        assert_eq!(evaluate("10/4", &context), Ok(Value::Float(2.5)));
        assert_eq!(evaluate("2*3.5", &context), Ok(Value::Float(7.0)));
    }

    #[test]
    fn test_division_by_zero() {
        let context = MapContext::new();
        let err = evaluate("1/0", &context).expect_err("should fail");
        assert_eq!(err.code(), "DIVISION_BY_ZERO");
    }

    #[test]
    fn test_precedence() {
        let context = MapContext::new();
        assert_eq!(evaluate("2+3*4", &context), Ok(Value::Float(14.0)));
        assert_eq!(evaluate("(2+3)*4", &context), Ok(Value::Float(20.0)));
        assert_eq!(evaluate("1+1==2", &context), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let context = ctx(&[("ready", Value::Bool(true))]);
        // The right side would fail with a non-numeric comparison if reached.
        assert_eq!(
            evaluate("ready||\"x\">1", &context),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            evaluate("missing&&\"x\">1", &context),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_truthiness_in_logical_ops() {
        let context = ctx(&[("count", Value::Int(3)), ("name", Value::from(""))]);
        assert_eq!(evaluate("count&&true", &context), Ok(Value::Bool(true)));
        assert_eq!(evaluate("name||false", &context), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_malformed_expression() {
        let context = MapContext::new();
        assert!(evaluate("1+", &context).is_err());
        assert!(evaluate("(1", &context).is_err());
        assert!(evaluate(">5", &context).is_err());
    }
}
