//! Cross-agent knowledge propagation and causality scenarios
//!
//! Propagation happens the way it does in production: deltas are serialized
//! into a SAG message, travel as wire text, and are applied by the receiving
//! agent's engine.

use sag_core::{Message, Statement, Value};
use sag_dsl::{minify, parse};
use sag_engines::{CorrelationEngine, FoldEngine, KnowledgeEngine};

/// Wrap knowledge statements into a wire message from one agent to another.
fn knowledge_message(
    correlation: &CorrelationEngine,
    source: &str,
    destination: &str,
    statements: Vec<sag_core::KnowledgeStatement>,
) -> Message {
    Message::new(
        correlation.create_response_header(source, destination),
        statements.into_iter().map(Statement::Knowledge).collect(),
    )
}

#[test]
fn subscriber_receives_only_latest_version_over_the_wire() {
    let mut publisher = KnowledgeEngine::new("agent-a");
    let correlation = CorrelationEngine::new("agent-a");
    publisher.add_subscriber("agent-b", "system.**", None);

    publisher.assert_fact("system.cpu", Value::Int(85));
    publisher.assert_fact("system.cpu", Value::Int(90));

    let delta = publisher.compute_delta("agent-b");
    assert_eq!(delta.len(), 1);
    assert_eq!(delta[0].value, Value::Int(90));
    assert_eq!(delta[0].version, 2);

    // Serialize, transmit, re-parse, apply
    let wire = minify(&knowledge_message(
        &correlation,
        "agent-a",
        "agent-b",
        delta.clone(),
    ));
    let received = parse(&wire).expect("wire parse");
    let incoming: Vec<_> = received
        .statements
        .iter()
        .filter_map(|s| match s {
            Statement::Knowledge(k) => Some(k.clone()),
            _ => None,
        })
        .collect();

    let mut subscriber = KnowledgeEngine::new("agent-b");
    let applied = subscriber.apply_incoming(&incoming, "agent-a");
    assert_eq!(applied.len(), 1);
    assert_eq!(
        subscriber.get_fact("system.cpu"),
        Some(&(Value::Int(90), 2))
    );

    publisher.mark_delivered("agent-b", &delta);
    assert!(publisher.compute_delta("agent-b").is_empty());
}

#[test]
fn conflicts_resolve_by_version_not_arrival_order() {
    let mut engine = KnowledgeEngine::new("agent-c");

    // The newer version arrives first; the older one must lose even though
    // it arrives later.
    let newer = sag_core::KnowledgeStatement {
        topic: "deploy.status".to_string(),
        value: Value::from("done"),
        version: 4,
    };
    let older = sag_core::KnowledgeStatement {
        topic: "deploy.status".to_string(),
        value: Value::from("running"),
        version: 2,
    };

    assert_eq!(engine.apply_incoming(&[newer.clone()], "agent-a").len(), 1);
    assert!(engine.apply_incoming(&[older], "agent-b").is_empty());
    assert_eq!(
        engine.get_fact("deploy.status"),
        Some(&(Value::from("done"), 4))
    );
}

#[test]
fn filtered_subscription_propagates_only_matching_facts() {
    let mut publisher = KnowledgeEngine::new("agent-a");
    publisher.add_subscriber("alerts", "system.**", Some("system.cpu>80".to_string()));

    publisher.assert_fact("system.cpu", Value::Int(40));
    assert!(publisher.compute_delta("alerts").is_empty());

    publisher.assert_fact("system.cpu", Value::Int(95));
    let delta = publisher.compute_delta("alerts");
    assert_eq!(delta.len(), 1);
    assert_eq!(delta[0].value, Value::Int(95));
}

#[test]
fn correlated_conversation_traces_across_agents() {
    let mut engine_a = CorrelationEngine::new("a");
    let mut engine_b = CorrelationEngine::new("b");

    let request = Message::new(engine_a.create_response_header("a", "b"), Vec::new());
    engine_b.record_incoming(&request);

    let reply = Message::new(engine_b.create_response_header("b", "a"), Vec::new());
    engine_a.record_incoming(&reply);

    let followup = Message::new(engine_a.create_response_header("a", "b"), Vec::new());

    let log = vec![request.clone(), reply.clone(), followup.clone()];
    let thread =
        CorrelationEngine::trace_thread(&log, &followup.header.message_id);
    let ids: Vec<&str> = thread.iter().map(|m| m.header.message_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            request.header.message_id.as_str(),
            reply.header.message_id.as_str(),
            followup.header.message_id.as_str(),
        ]
    );

    let tree = CorrelationEngine::build_conversation_tree(&log);
    assert_eq!(
        tree[&request.header.message_id],
        vec![reply.header.message_id.clone()]
    );
}

#[test]
fn folded_conversation_survives_wire_round_trips() {
    let mut folds = FoldEngine::new();

    let history: Vec<Message> = (0..10)
        .map(|i| {
            parse(&format!(
                "H v 1 id=h{} src=a dst=b ts={}\nDO step(n={}); KNOW run.step = {} v {}",
                i,
                1000 + i,
                i,
                i,
                i + 1
            ))
            .expect("parse")
        })
        .collect();

    let stmt = folds.fold(&history, "ten steps", None);
    let restored = folds.unfold(&stmt.fold_id).expect("unfold");
    assert_eq!(restored, history);

    // The restored messages are still canonical wire messages
    for message in &restored {
        assert_eq!(parse(&minify(message)).expect("reparse"), *message);
    }
}

mod properties {
    use proptest::prelude::*;
    use sag_engines::{topic_matches, FoldEngine};
    use sag_test_utils::{arb_message, arb_path};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn fold_unfold_is_exact_for_any_history(
            history in prop::collection::vec(arb_message(), 0..8)
        ) {
            let mut folds = FoldEngine::new();
            let stmt = folds.fold(&history, "archived", None);
            let restored = folds.unfold(&stmt.fold_id).expect("unfold");
            prop_assert_eq!(restored, history);
        }

        #[test]
        fn double_star_matches_every_topic(topic in arb_path()) {
            prop_assert!(topic_matches("**", &topic));
        }

        #[test]
        fn literal_pattern_matches_only_itself(a in arb_path(), b in arb_path()) {
            prop_assert!(topic_matches(&a, &a));
            prop_assert_eq!(topic_matches(&a, &b), a == b);
        }

        #[test]
        fn single_star_matches_single_segments_only(topic in arb_path()) {
            let single_segment = !topic.contains('.');
            prop_assert_eq!(topic_matches("*", &topic), single_segment);
        }
    }
}

#[test]
fn knowledge_state_checkpoints_through_statements() {
    let mut original = KnowledgeEngine::new("agent-a");
    original.assert_fact("system.cpu", Value::Int(85));
    original.assert_fact("system.cpu", Value::Int(90));
    original.assert_fact("app.owner", Value::from("team-x"));

    // Export travels as a SAG message
    let exported = original.export_state();
    let correlation = CorrelationEngine::new("agent-a");
    let wire = minify(&knowledge_message(
        &correlation,
        "agent-a",
        "agent-a2",
        exported,
    ));

    let received = parse(&wire).expect("wire parse");
    let statements: Vec<_> = received
        .statements
        .iter()
        .filter_map(|s| match s {
            Statement::Knowledge(k) => Some(k.clone()),
            _ => None,
        })
        .collect();

    let mut restored = KnowledgeEngine::new("agent-a2");
    restored.import_state(&statements);
    assert_eq!(restored.get_fact("system.cpu"), Some(&(Value::Int(90), 2)));
    assert_eq!(
        restored.get_fact("app.owner"),
        Some(&(Value::from("team-x"), 1))
    );
}
