//! SAG Test Utilities
//!
//! Centralized test infrastructure for the SAG workspace:
//! - Proptest strategies for headers, values, statements and whole messages
//! - Fixture builders for common scenarios
//!
//! The strategies only generate messages expressible in the wire grammar
//! (identifiers that avoid reserved words, non-negative numbers, compact
//! expression text), so they can drive the parse/minify round-trip property
//! directly.

use proptest::option;
use proptest::prelude::*;
use proptest::strategy::Union;
use sag_core::{
    ActionStatement, AssertStatement, ControlStatement, ErrorStatement, EventStatement,
    FoldStatement, Header, KnowledgeStatement, Message, Priority, QueryStatement, RecallStatement,
    Statement, SubscribeStatement, UnsubscribeStatement, Value,
};

/// Lowercase words the identifier strategy must avoid: they lex as keywords.
const RESERVED: &[&str] = &["v", "true", "false", "null"];

/// A grammar-safe identifier.
pub fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}".prop_filter("reserved word", |s| !RESERVED.contains(&s.as_str()))
}

/// A dotted path of one to three segments.
pub fn arb_path() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_ident(), 1..=3).prop_map(|segments| segments.join("."))
}

/// A topic pattern mixing literal segments with `*` and `**` wildcards.
pub fn arb_topic_pattern() -> impl Strategy<Value = String> {
    let segment = prop_oneof![
        4 => arb_ident().boxed(),
        1 => Just("*".to_string()).boxed(),
        1 => Just("**".to_string()).boxed(),
    ];
    prop::collection::vec(segment, 1..=3).prop_map(|segments| segments.join("."))
}

pub fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Normal),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

/// Floats with two decimal places; keeps the minified form free of exponent
/// notation, which the grammar cannot re-parse.
fn arb_float() -> impl Strategy<Value = f64> {
    (0i32..1_000_000).prop_map(|n| n as f64 / 100.0)
}

/// Any wire value expressible in the grammar (non-negative numbers, printable
/// ASCII strings, shallow lists and objects).
pub fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        "[ -~]{0,12}".prop_map(Value::String),
        (0i64..1_000_000_000).prop_map(Value::Int),
        arb_float().prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
        arb_path().prop_map(Value::Path),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::List),
            prop::collection::vec(("[ -~]{0,8}", inner), 0..3).prop_map(Value::Object),
        ]
    })
}

fn arb_compare_op() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(">"),
        Just("<"),
        Just(">="),
        Just("<="),
        Just("=="),
        Just("!="),
    ]
}

/// Compact expression text: a bare path or a path/number comparison.
pub fn arb_expr_text() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_path().boxed(),
        (arb_path(), arb_compare_op(), 0i64..100_000)
            .prop_map(|(path, op, n)| format!("{}{}{}", path, op, n))
            .boxed(),
        (arb_path(), arb_path(), arb_compare_op(), 0i64..100_000)
            .prop_map(|(a, b, op, n)| format!("{}&&{}{}{}", a, b, op, n))
            .boxed(),
    ]
}

/// An action reason: operator-free free text, or expression text that the
/// lexical discriminator will classify as an expression.
pub fn arb_reason() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z][a-zA-Z ]{0,11}".boxed(),
        (arb_path(), arb_compare_op(), 0i64..100_000)
            .prop_map(|(path, op, n)| format!("{}{}{}", path, op, n))
            .boxed(),
    ]
}

fn arb_named_args() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec((arb_ident(), arb_value()), 0..3)
}

fn arb_action() -> impl Strategy<Value = ActionStatement> {
    (
        arb_ident(),
        prop::collection::vec(arb_value(), 0..3),
        arb_named_args(),
        option::of((arb_ident(), option::of(arb_expr_text()))),
        option::of(arb_priority()),
        option::of(arb_reason()),
    )
        .prop_map(|(verb, args, named_args, policy, priority, reason)| {
            let (policy, policy_expr) = match policy {
                Some((name, expr)) => (Some(name), expr),
                None => (None, None),
            };
            ActionStatement {
                verb,
                args,
                named_args,
                policy,
                policy_expr,
                priority,
                reason,
            }
        })
}

fn arb_event() -> impl Strategy<Value = EventStatement> {
    (
        arb_ident(),
        prop::collection::vec(arb_value(), 0..3),
        arb_named_args(),
    )
        .prop_map(|(event_name, args, named_args)| EventStatement {
            event_name,
            args,
            named_args,
        })
}

/// Statements allowed inside a control branch. Nested controls are excluded:
/// the dangling-else ambiguity makes them non-canonical on the wire.
fn arb_simple_statement() -> impl Strategy<Value = Statement> {
    prop_oneof![
        arb_action().prop_map(Statement::Action),
        (arb_path(), arb_value())
            .prop_map(|(path, value)| Statement::Assert(AssertStatement { path, value })),
        (arb_ident(), option::of("[ -~]{0,12}"))
            .prop_map(|(error_code, message)| Statement::Error(ErrorStatement {
                error_code,
                message,
            })),
        arb_ident().prop_map(|fold_id| Statement::Recall(RecallStatement { fold_id })),
    ]
}

fn arb_control() -> impl Strategy<Value = ControlStatement> {
    (
        arb_expr_text(),
        arb_simple_statement(),
        option::of(arb_simple_statement()),
    )
        .prop_map(|(condition, then_branch, else_branch)| ControlStatement {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        })
}

fn arb_fold() -> impl Strategy<Value = FoldStatement> {
    (
        arb_ident(),
        "[ -~]{0,16}",
        option::of(prop::collection::vec(("[ -~]{0,8}", arb_value()), 0..3)),
    )
        .prop_map(|(fold_id, summary, state)| FoldStatement {
            fold_id,
            summary,
            state,
        })
}

/// Any of the eleven statement variants.
pub fn arb_statement() -> impl Strategy<Value = Statement> {
    Union::new(vec![
        arb_action().prop_map(Statement::Action).boxed(),
        (arb_expr_text(), option::of(arb_expr_text()))
            .prop_map(|(expression, constraint)| {
                Statement::Query(QueryStatement {
                    expression,
                    constraint,
                })
            })
            .boxed(),
        (arb_path(), arb_value())
            .prop_map(|(path, value)| Statement::Assert(AssertStatement { path, value }))
            .boxed(),
        arb_control().prop_map(Statement::Control).boxed(),
        arb_event().prop_map(Statement::Event).boxed(),
        (arb_ident(), option::of("[ -~]{0,16}"))
            .prop_map(|(error_code, message)| {
                Statement::Error(ErrorStatement {
                    error_code,
                    message,
                })
            })
            .boxed(),
        arb_fold().prop_map(Statement::Fold).boxed(),
        arb_ident()
            .prop_map(|fold_id| Statement::Recall(RecallStatement { fold_id }))
            .boxed(),
        (arb_topic_pattern(), option::of(arb_expr_text()))
            .prop_map(|(topic, filter_expr)| {
                Statement::Subscribe(SubscribeStatement { topic, filter_expr })
            })
            .boxed(),
        arb_topic_pattern()
            .prop_map(|topic| Statement::Unsubscribe(UnsubscribeStatement { topic }))
            .boxed(),
        (arb_path(), arb_value(), 0u64..100_000)
            .prop_map(|(topic, value, version)| {
                Statement::Knowledge(KnowledgeStatement {
                    topic,
                    value,
                    version,
                })
            })
            .boxed(),
    ])
}

pub fn arb_header() -> impl Strategy<Value = Header> {
    (
        1u32..10,
        arb_ident(),
        arb_ident(),
        arb_ident(),
        0i64..2_000_000_000,
        option::of(arb_ident()),
        option::of(1u32..3600),
    )
        .prop_map(
            |(version, message_id, source, destination, timestamp, correlation, ttl)| Header {
                version,
                message_id,
                source,
                destination,
                timestamp,
                correlation,
                ttl,
            },
        )
}

pub fn arb_message() -> impl Strategy<Value = Message> {
    (arb_header(), prop::collection::vec(arb_statement(), 0..5))
        .prop_map(|(header, statements)| Message::new(header, statements))
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A header with fixed timestamp for deterministic assertions.
pub fn sample_header(message_id: &str, source: &str, destination: &str) -> Header {
    Header::new(1, message_id, source, destination, 1_234_567_890)
}

/// A small two-statement message for engine tests.
pub fn sample_message(message_id: &str) -> Message {
    let mut action = ActionStatement::new("deploy");
    action.args.push(Value::from("app1"));
    action
        .named_args
        .push(("version".to_string(), Value::Int(42)));
    Message::new(
        sample_header(message_id, "svc1", "svc2"),
        vec![
            Statement::Action(action),
            Statement::Assert(AssertStatement {
                path: "ready".to_string(),
                value: Value::Bool(true),
            }),
        ],
    )
}

/// A message carrying the given statements between two fixed agents.
pub fn message_with_statements(message_id: &str, statements: Vec<Statement>) -> Message {
    Message::new(sample_header(message_id, "svc1", "svc2"), statements)
}
