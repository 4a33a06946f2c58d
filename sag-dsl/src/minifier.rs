//! Minifier: message AST to the canonical compact wire form
//!
//! The emitted form is what the parser round-trips: strict single spaces
//! between header fields, one newline before the body, `;` between
//! statements, no insignificant whitespace inside statements.

use sag_core::{
    reason_is_expression, ActionStatement, AssertStatement, ControlStatement, ErrorStatement,
    EventStatement, FoldStatement, KnowledgeStatement, Message, QueryStatement, RecallStatement,
    Statement, SubscribeStatement, UnsubscribeStatement, Value,
};
use std::fmt;

/// Convert a message to its minified wire string.
pub fn minify(message: &Message) -> String {
    let mut out = String::new();

    let header = &message.header;
    out.push_str(&format!(
        "H v {} id={} src={} dst={} ts={}",
        header.version, header.message_id, header.source, header.destination, header.timestamp
    ));
    if let Some(corr) = &header.correlation {
        out.push_str(&format!(" corr={}", corr));
    }
    if let Some(ttl) = header.ttl {
        out.push_str(&format!(" ttl={}", ttl));
    }
    out.push('\n');

    for (i, stmt) in message.statements.iter().enumerate() {
        out.push_str(&minify_statement(stmt));
        if i < message.statements.len() - 1 {
            out.push(';');
        }
    }

    out
}

fn minify_statement(stmt: &Statement) -> String {
    match stmt {
        Statement::Action(action) => minify_action(action),
        Statement::Query(query) => minify_query(query),
        Statement::Assert(assert_stmt) => minify_assert(assert_stmt),
        Statement::Control(control) => minify_control(control),
        Statement::Event(event) => minify_event(event),
        Statement::Error(error) => minify_error(error),
        Statement::Fold(fold) => minify_fold(fold),
        Statement::Recall(recall) => minify_recall(recall),
        Statement::Subscribe(sub) => minify_subscribe(sub),
        Statement::Unsubscribe(unsub) => minify_unsubscribe(unsub),
        Statement::Knowledge(know) => minify_knowledge(know),
    }
}

fn minify_action(action: &ActionStatement) -> String {
    let mut out = format!("DO {}(", action.verb);

    for (i, arg) in action.args.iter().enumerate() {
        out.push_str(&minify_value(arg));
        if i < action.args.len() - 1 || !action.named_args.is_empty() {
            out.push(',');
        }
    }

    for (i, (name, value)) in action.named_args.iter().enumerate() {
        out.push_str(&format!("{}={}", name, minify_value(value)));
        if i < action.named_args.len() - 1 {
            out.push(',');
        }
    }

    out.push(')');

    if let Some(policy) = &action.policy {
        out.push_str(&format!(" P:{}", policy));
        if let Some(expr) = &action.policy_expr {
            out.push_str(&format!(":{}", expr));
        }
    }

    if let Some(priority) = action.priority {
        out.push_str(&format!(" PRIO={}", priority.as_wire()));
    }

    if let Some(reason) = &action.reason {
        out.push_str(" BECAUSE ");
        if reason_is_expression(reason) {
            out.push_str(reason);
        } else {
            out.push_str(&format!("\"{}\"", escape_string(reason)));
        }
    }

    out
}

fn minify_query(query: &QueryStatement) -> String {
    let mut out = format!("Q {}", query.expression);
    if let Some(constraint) = &query.constraint {
        out.push_str(&format!(" WHERE {}", constraint));
    }
    out
}

fn minify_assert(assert_stmt: &AssertStatement) -> String {
    format!("A {} = {}", assert_stmt.path, minify_value(&assert_stmt.value))
}

fn minify_control(control: &ControlStatement) -> String {
    let mut out = format!(
        "IF {} THEN {}",
        control.condition,
        minify_statement(&control.then_branch)
    );
    if let Some(else_branch) = &control.else_branch {
        out.push_str(&format!(" ELSE {}", minify_statement(else_branch)));
    }
    out
}

fn minify_event(event: &EventStatement) -> String {
    let mut out = format!("EVT {}(", event.event_name);

    for (i, arg) in event.args.iter().enumerate() {
        out.push_str(&minify_value(arg));
        if i < event.args.len() - 1 || !event.named_args.is_empty() {
            out.push(',');
        }
    }

    for (i, (name, value)) in event.named_args.iter().enumerate() {
        out.push_str(&format!("{}={}", name, minify_value(value)));
        if i < event.named_args.len() - 1 {
            out.push(',');
        }
    }

    out.push(')');
    out
}

fn minify_error(error: &ErrorStatement) -> String {
    let mut out = format!("ERR {}", error.error_code);
    if let Some(message) = &error.message {
        out.push_str(&format!(" \"{}\"", escape_string(message)));
    }
    out
}

fn minify_fold(fold: &FoldStatement) -> String {
    let mut out = format!("FOLD {} \"{}\"", fold.fold_id, escape_string(&fold.summary));
    if let Some(state) = &fold.state {
        out.push_str(&format!(" STATE {}", minify_object(state)));
    }
    out
}

fn minify_recall(recall: &RecallStatement) -> String {
    format!("RECALL {}", recall.fold_id)
}

fn minify_subscribe(sub: &SubscribeStatement) -> String {
    let mut out = format!("SUB {}", sub.topic);
    if let Some(filter) = &sub.filter_expr {
        out.push_str(&format!(" WHERE {}", filter));
    }
    out
}

fn minify_unsubscribe(unsub: &UnsubscribeStatement) -> String {
    format!("UNSUB {}", unsub.topic)
}

fn minify_knowledge(know: &KnowledgeStatement) -> String {
    format!(
        "KNOW {} = {} v {}",
        know.topic,
        minify_value(&know.value),
        know.version
    )
}

fn minify_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        // Debug formatting keeps the decimal point (`1.0`, not `1`), so a
        // float never re-parses as an integer.
        Value::Float(f) => format!("{:?}", f),
        Value::String(s) => format!("\"{}\"", escape_string(s)),
        Value::Path(p) => p.clone(),
        Value::List(items) => {
            let inner: Vec<String> = items.iter().map(minify_value).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(members) => minify_object(members),
    }
}

fn minify_object(members: &[(String, Value)]) -> String {
    let inner: Vec<String> = members
        .iter()
        .map(|(k, v)| format!("\"{}\":{}", escape_string(k), minify_value(v)))
        .collect();
    format!("{{{}}}", inner.join(","))
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Approximate token count for a wire string (~4 chars per token).
pub fn count_tokens(wire: &str) -> usize {
    wire.len().div_ceil(4)
}

/// Token usage comparison between the SAG wire form and a JSON equivalent.
/// The JSON rendering exists only for this comparison; it is not a wire
/// format.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenComparison {
    pub sag_length: usize,
    pub json_length: usize,
    pub sag_tokens: usize,
    pub json_tokens: usize,
    pub tokens_saved: i64,
    pub percent_saved: f64,
}

impl fmt::Display for TokenComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SAG: {} chars ({} tokens) vs JSON: {} chars ({} tokens) - Saved: {} tokens ({:.1}%)",
            self.sag_length,
            self.sag_tokens,
            self.json_length,
            self.json_tokens,
            self.tokens_saved,
            self.percent_saved
        )
    }
}

/// Compare token usage between the minified wire form and a JSON equivalent.
pub fn compare_with_json(message: &Message) -> TokenComparison {
    let wire = minify(message);
    let json = to_json_equivalent(message);

    let sag_tokens = count_tokens(&wire);
    let json_tokens = count_tokens(&json);
    let saved = json_tokens as i64 - sag_tokens as i64;
    let percent_saved = if json_tokens > 0 {
        (saved as f64 * 100.0) / json_tokens as f64
    } else {
        0.0
    };

    TokenComparison {
        sag_length: wire.len(),
        json_length: json.len(),
        sag_tokens,
        json_tokens,
        tokens_saved: saved,
        percent_saved,
    }
}

fn to_json_equivalent(message: &Message) -> String {
    let mut json = String::from("{");

    let h = &message.header;
    json.push_str("\"header\":{");
    json.push_str(&format!("\"version\":{},", h.version));
    json.push_str(&format!("\"messageId\":\"{}\",", escape_string(&h.message_id)));
    json.push_str(&format!("\"source\":\"{}\",", escape_string(&h.source)));
    json.push_str(&format!(
        "\"destination\":\"{}\",",
        escape_string(&h.destination)
    ));
    json.push_str(&format!("\"timestamp\":{}", h.timestamp));
    if let Some(corr) = &h.correlation {
        json.push_str(&format!(",\"correlation\":\"{}\"", escape_string(corr)));
    }
    if let Some(ttl) = h.ttl {
        json.push_str(&format!(",\"ttl\":{}", ttl));
    }
    json.push_str("},");

    json.push_str("\"statements\":[");
    for (i, stmt) in message.statements.iter().enumerate() {
        json.push_str(&format!("{{\"type\":\"{}\"", statement_type_name(stmt)));
        if let Statement::Action(action) = stmt {
            json.push_str(&format!(",\"verb\":\"{}\"", escape_string(&action.verb)));
            if !action.args.is_empty() {
                let args: Vec<String> = action.args.iter().map(json_value).collect();
                json.push_str(&format!(",\"args\":[{}]", args.join(",")));
            }
            if !action.named_args.is_empty() {
                let named: Vec<String> = action
                    .named_args
                    .iter()
                    .map(|(k, v)| format!("\"{}\":{}", escape_string(k), json_value(v)))
                    .collect();
                json.push_str(&format!(",\"namedArgs\":{{{}}}", named.join(",")));
            }
        }
        json.push('}');
        if i < message.statements.len() - 1 {
            json.push(',');
        }
    }
    json.push_str("]}");

    json
}

fn json_value(value: &Value) -> String {
    match value {
        Value::Path(p) => format!("\"{}\"", escape_string(p)),
        other => minify_value(other),
    }
}

fn statement_type_name(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Action(_) => "ActionStatement",
        Statement::Query(_) => "QueryStatement",
        Statement::Assert(_) => "AssertStatement",
        Statement::Control(_) => "ControlStatement",
        Statement::Event(_) => "EventStatement",
        Statement::Error(_) => "ErrorStatement",
        Statement::Fold(_) => "FoldStatement",
        Statement::Recall(_) => "RecallStatement",
        Statement::Subscribe(_) => "SubscribeStatement",
        Statement::Unsubscribe(_) => "UnsubscribeStatement",
        Statement::Knowledge(_) => "KnowledgeStatement",
    }
}
