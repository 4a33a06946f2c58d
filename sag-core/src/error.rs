//! Error types for SAG operations
//!
//! Each failure domain has its own enum; every variant maps to one of the
//! protocol's machine-readable codes and converts losslessly into an
//! `ErrorStatement` so it can travel on-wire.

use crate::{ArgType, ErrorStatement};
use thiserror::Error;

/// Syntax error from the lexer or parser.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Syntax error at line {line}:{column} - {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        "PARSE_ERROR"
    }
}

/// Expression evaluation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Division by zero in '{expression}'")]
    DivisionByZero { expression: String },
}

impl EvalError {
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::InvalidExpression { .. } => "INVALID_EXPRESSION",
            EvalError::DivisionByZero { .. } => "DIVISION_BY_ZERO",
        }
    }
}

/// Schema validation failures for action and event calls.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaViolation {
    #[error("Action cannot be null or malformed")]
    InvalidAction,

    #[error("Missing required argument '{arg}'")]
    MissingArg { arg: String },

    #[error("Argument '{arg}' expected type {expected} but got {actual}")]
    TypeMismatch {
        arg: String,
        expected: ArgType,
        actual: String,
    },

    #[error("Too many positional arguments: expected {expected} but got {actual}")]
    TooManyArgs { expected: usize, actual: usize },

    #[error("Unexpected named argument '{arg}'")]
    InvalidArgs { arg: String },

    #[error("Argument '{arg}' value {value} is not in the allowed values")]
    ValueNotAllowed { arg: String, value: String },

    #[error("Argument '{arg}' value \"{value}\" does not match pattern '{pattern}'")]
    PatternMismatch {
        arg: String,
        value: String,
        pattern: String,
    },

    #[error("Argument '{arg}' value {value} is out of range")]
    ValueOutOfRange { arg: String, value: String },
}

impl SchemaViolation {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaViolation::InvalidAction => "INVALID_ACTION",
            SchemaViolation::MissingArg { .. } => "MISSING_ARG",
            SchemaViolation::TypeMismatch { .. } => "TYPE_MISMATCH",
            SchemaViolation::TooManyArgs { .. } => "TOO_MANY_ARGS",
            SchemaViolation::InvalidArgs { .. } => "INVALID_ARGS",
            SchemaViolation::ValueNotAllowed { .. } => "VALUE_NOT_ALLOWED",
            SchemaViolation::PatternMismatch { .. } => "PATTERN_MISMATCH",
            SchemaViolation::ValueOutOfRange { .. } => "VALUE_OUT_OF_RANGE",
        }
    }
}

/// Guardrail check failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardrailViolation {
    #[error("Precondition not met: {reason}")]
    PreconditionFailed { reason: String },

    #[error("Failed to evaluate precondition: {0}")]
    BadExpression(#[from] EvalError),
}

impl GuardrailViolation {
    pub fn code(&self) -> &'static str {
        match self {
            GuardrailViolation::PreconditionFailed { .. } => "PRECONDITION_FAILED",
            GuardrailViolation::BadExpression(inner) => inner.code(),
        }
    }
}

/// Routing guard rejections. All variants share one wire code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Unknown source agent '{agent}'")]
    UnknownSource { agent: String },

    #[error("Unknown destination agent '{agent}'")]
    UnknownDestination { agent: String },

    #[error("Agent '{source_agent}' is not allowed to send to '{destination}'")]
    DestinationNotAllowed { source_agent: String, destination: String },
}

impl RoutingError {
    pub fn code(&self) -> &'static str {
        "ROUTING_DENIED"
    }
}

/// Fold engine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FoldError {
    #[error("Unknown fold id: {fold_id}")]
    UnknownFoldId { fold_id: String },
}

impl FoldError {
    pub fn code(&self) -> &'static str {
        "UNKNOWN_FOLD_ID"
    }
}

/// Schema definition errors, raised when a `VerbSchema` is built with
/// inconsistent constraints. These never travel on-wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Pattern constraint on '{arg}' only applies to STRING arguments, got {arg_type}")]
    PatternOnNonString { arg: String, arg_type: ArgType },

    #[error("Range constraints on '{arg}' only apply to INTEGER or FLOAT arguments, got {arg_type}")]
    RangeOnNonNumeric { arg: String, arg_type: ArgType },

    #[error("Allowed values on '{arg}' must not be empty")]
    EmptyAllowedValues { arg: String },

    #[error("Invalid pattern on '{arg}': {reason}")]
    InvalidPattern { arg: String, reason: String },
}

impl SchemaError {
    pub fn code(&self) -> &'static str {
        "INVALID_SCHEMA"
    }
}

/// Master error type for all SAG operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SagError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Expression error: {0}")]
    Eval(#[from] EvalError),

    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("Guardrail violation: {0}")]
    Guardrail(#[from] GuardrailViolation),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Fold error: {0}")]
    Fold(#[from] FoldError),

    #[error("Schema definition error: {0}")]
    SchemaDef(#[from] SchemaError),
}

impl SagError {
    pub fn code(&self) -> &'static str {
        match self {
            SagError::Parse(e) => e.code(),
            SagError::Eval(e) => e.code(),
            SagError::Schema(e) => e.code(),
            SagError::Guardrail(e) => e.code(),
            SagError::Routing(e) => e.code(),
            SagError::Fold(e) => e.code(),
            SagError::SchemaDef(e) => e.code(),
        }
    }

    /// Lossless conversion into the on-wire error statement.
    pub fn to_error_statement(&self) -> ErrorStatement {
        ErrorStatement {
            error_code: self.code().to_string(),
            message: Some(self.to_string()),
        }
    }
}

/// Result type alias for SAG operations.
pub type SagResult<T> = Result<T, SagError>;
