//! Message AST types

use crate::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator spellings that make an action reason an expression rather than
/// free text.
const REASON_OPERATORS: [&str; 8] = [">=", "<=", "==", "!=", "&&", "||", ">", "<"];

/// Whether an action reason is a guardrail expression.
///
/// The grammar carries both free-text and expression reasons in the same
/// clause; the discriminator is lexical. A reason containing any comparison
/// or logical operator is treated as an expression and evaluated.
pub fn reason_is_expression(reason: &str) -> bool {
    REASON_OPERATORS.iter().any(|op| reason.contains(op))
}

/// Action priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }

    pub fn from_wire(text: &str) -> Option<Self> {
        match text {
            "LOW" => Some(Priority::Low),
            "NORMAL" => Some(Priority::Normal),
            "HIGH" => Some(Priority::High),
            "CRITICAL" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Routing header. Every field except `correlation` and `ttl` is required
/// for a well-formed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub message_id: String,
    pub source: String,
    pub destination: String,
    /// Seconds since epoch.
    pub timestamp: i64,
    pub correlation: Option<String>,
    pub ttl: Option<u32>,
}

impl Header {
    pub fn new(
        version: u32,
        message_id: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            version,
            message_id: message_id.into(),
            source: source.into(),
            destination: destination.into(),
            timestamp,
            correlation: None,
            ttl: None,
        }
    }

    pub fn with_correlation(mut self, correlation: Option<String>) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// One typed unit of communication within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Action(ActionStatement),
    Query(QueryStatement),
    Assert(AssertStatement),
    Control(ControlStatement),
    Event(EventStatement),
    Error(ErrorStatement),
    Fold(FoldStatement),
    Recall(RecallStatement),
    Subscribe(SubscribeStatement),
    Unsubscribe(UnsubscribeStatement),
    Knowledge(KnowledgeStatement),
}

/// `DO verb(args) [P:policy[:expr]] [PRIO=level] [BECAUSE reason]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStatement {
    pub verb: String,
    pub args: Vec<Value>,
    /// Named arguments in insertion order.
    pub named_args: Vec<(String, Value)>,
    pub policy: Option<String>,
    pub policy_expr: Option<String>,
    pub priority: Option<Priority>,
    /// Free text, or expression text when `reason_is_expression` holds.
    pub reason: Option<String>,
}

impl ActionStatement {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            args: Vec::new(),
            named_args: Vec::new(),
            policy: None,
            policy_expr: None,
            priority: None,
            reason: None,
        }
    }

    pub fn named_arg(&self, name: &str) -> Option<&Value> {
        self.named_args.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// `Q expression [WHERE constraint]` - expression text is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStatement {
    pub expression: String,
    pub constraint: Option<String>,
}

/// `A path = value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertStatement {
    pub path: String,
    pub value: Value,
}

/// `IF condition THEN statement [ELSE statement]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlStatement {
    pub condition: String,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
}

/// `EVT name(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStatement {
    pub event_name: String,
    pub args: Vec<Value>,
    pub named_args: Vec<(String, Value)>,
}

/// `ERR code ["message"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStatement {
    pub error_code: String,
    pub message: Option<String>,
}

/// `FOLD id "summary" [STATE {object}]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldStatement {
    pub fold_id: String,
    pub summary: String,
    pub state: Option<Vec<(String, Value)>>,
}

/// `RECALL id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallStatement {
    pub fold_id: String,
}

/// `SUB pattern [WHERE filter]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeStatement {
    pub topic: String,
    pub filter_expr: Option<String>,
}

/// `UNSUB pattern`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeStatement {
    pub topic: String,
}

/// `KNOW topic = value v version`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeStatement {
    pub topic: String,
    pub value: Value,
    pub version: u64,
}

/// A parsed or constructed SAG message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub header: Header,
    pub statements: Vec<Statement>,
}

impl Message {
    pub fn new(header: Header, statements: Vec<Statement>) -> Self {
        Self { header, statements }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_discriminator_detects_operators() {
        assert!(reason_is_expression("balance>1000"));
        assert!(reason_is_expression("a<=b"));
        assert!(reason_is_expression("ready==true"));
        assert!(reason_is_expression("x!=y"));
        assert!(reason_is_expression("a&&b"));
        assert!(reason_is_expression("a||b"));
    }

    #[test]
    fn test_reason_discriminator_free_text() {
        assert!(!reason_is_expression("security update"));
        assert!(!reason_is_expression(""));
        assert!(!reason_is_expression("routine maintenance run"));
    }

    #[test]
    fn test_priority_wire_round_trip() {
        for p in [Priority::Low, Priority::Normal, Priority::High, Priority::Critical] {
            assert_eq!(Priority::from_wire(p.as_wire()), Some(p));
        }
        assert_eq!(Priority::from_wire("URGENT"), None);
    }

    #[test]
    fn test_header_builders() {
        let header = Header::new(1, "m1", "a", "b", 1000)
            .with_correlation(Some("m0".to_string()))
            .with_ttl(30);
        assert_eq!(header.correlation.as_deref(), Some("m0"));
        assert_eq!(header.ttl, Some(30));
    }

    #[test]
    fn test_named_arg_lookup() {
        let mut action = ActionStatement::new("deploy");
        action.named_args.push(("env".to_string(), Value::from("staging")));
        assert_eq!(action.named_arg("env"), Some(&Value::from("staging")));
        assert_eq!(action.named_arg("missing"), None);
    }
}
