//! Knowledge propagation engine
//!
//! Per-agent fact store with per-topic versions, wildcard subscriptions with
//! per-topic delivery cursors, delta computation and last-writer-by-version
//! conflict resolution. When the fact count exceeds the budget the engine
//! compacts the oldest facts through the fold protocol; folded facts stay
//! recoverable by re-application.

use crate::FoldEngine;
use sag_core::{
    Context, FoldError, FoldStatement, KnowledgeStatement, MapContext, ProtocolConfig,
    SubscribeStatement, UnsubscribeStatement, Value,
};
use sag_dsl::evaluate;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Match a dotted topic against a pattern.
///
/// `*` matches exactly one segment; `**` matches one or more segments and
/// may sit anywhere in the pattern (`a.**.d`); literal segments match
/// case-sensitively. A bare `**` matches every topic.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('.').collect();
    let topic_segments: Vec<&str> = topic.split('.').collect();
    match_segments(&pattern_segments, &topic_segments)
}

fn match_segments(pattern: &[&str], topic: &[&str]) -> bool {
    match pattern.split_first() {
        None => topic.is_empty(),
        Some((&"**", rest)) => {
            // One or more segments, greedy from the shortest tail
            (1..=topic.len()).any(|consumed| match_segments(rest, &topic[consumed..]))
        }
        Some((&"*", rest)) => !topic.is_empty() && match_segments(rest, &topic[1..]),
        Some((literal, rest)) => {
            topic.first() == Some(literal) && match_segments(rest, &topic[1..])
        }
    }
}

#[derive(Debug, Clone)]
struct Subscription {
    pattern: String,
    filter: Option<String>,
    /// Last delivered version per topic.
    cursors: HashMap<String, u64>,
}

/// Per-agent knowledge engine.
#[derive(Debug)]
pub struct KnowledgeEngine {
    agent_id: String,
    budget: Option<usize>,
    facts: HashMap<String, (Value, u64)>,
    subscribers: HashMap<String, Subscription>,
    /// This agent's own subscription intents (pattern, filter).
    subscriptions: Vec<(String, Option<String>)>,
    folds: FoldEngine,
    compactions: Vec<FoldStatement>,
}

impl KnowledgeEngine {
    /// Engine with the configured default budget.
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self::with_budget(agent_id, Some(ProtocolConfig::default().knowledge_budget))
    }

    /// Engine with an explicit budget; `None` disables compaction.
    pub fn with_budget(agent_id: impl Into<String>, budget: Option<usize>) -> Self {
        Self {
            agent_id: agent_id.into(),
            budget,
            facts: HashMap::new(),
            subscribers: HashMap::new(),
            subscriptions: Vec::new(),
            folds: FoldEngine::new(),
            compactions: Vec::new(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    // ========================================================================
    // Local facts
    // ========================================================================

    /// Store a fact at the topic's next version and return the statement
    /// announcing it.
    pub fn assert_fact(&mut self, topic: impl Into<String>, value: Value) -> KnowledgeStatement {
        let topic = topic.into();
        let version = self.current_version(&topic) + 1;
        self.facts.insert(topic.clone(), (value.clone(), version));
        self.enforce_budget();
        KnowledgeStatement {
            topic,
            value,
            version,
        }
    }

    pub fn get_fact(&self, topic: &str) -> Option<&(Value, u64)> {
        self.facts.get(topic)
    }

    /// The stored version for a topic, zero when absent.
    pub fn current_version(&self, topic: &str) -> u64 {
        self.facts.get(topic).map(|(_, v)| *v).unwrap_or(0)
    }

    /// All facts on topics matching the pattern, topic-sorted.
    pub fn query_facts(&self, pattern: &str) -> Vec<(String, Value, u64)> {
        let mut results: Vec<(String, Value, u64)> = self
            .facts
            .iter()
            .filter(|(topic, _)| topic_matches(pattern, topic))
            .map(|(topic, (value, version))| (topic.clone(), value.clone(), *version))
            .collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    pub fn delete_fact(&mut self, topic: &str) -> bool {
        self.facts.remove(topic).is_some()
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Stored fact count relative to the budget (zero when unbudgeted).
    pub fn knowledge_pressure(&self) -> f64 {
        match self.budget {
            Some(budget) if budget > 0 => self.facts.len() as f64 / budget as f64,
            _ => 0.0,
        }
    }

    // ========================================================================
    // Own subscription intents
    // ========================================================================

    /// Record the intent to follow a pattern and return the statement to
    /// send to the publisher.
    pub fn subscribe(
        &mut self,
        pattern: impl Into<String>,
        filter: Option<String>,
    ) -> SubscribeStatement {
        let pattern = pattern.into();
        self.subscriptions.retain(|(p, _)| p != &pattern);
        self.subscriptions.push((pattern.clone(), filter.clone()));
        SubscribeStatement {
            topic: pattern,
            filter_expr: filter,
        }
    }

    pub fn unsubscribe(&mut self, pattern: &str) -> UnsubscribeStatement {
        self.subscriptions.retain(|(p, _)| p != pattern);
        UnsubscribeStatement {
            topic: pattern.to_string(),
        }
    }

    pub fn is_interested(&self, topic: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|(pattern, _)| topic_matches(pattern, topic))
    }

    pub fn subscriptions(&self) -> &[(String, Option<String>)] {
        &self.subscriptions
    }

    // ========================================================================
    // Subscribers and propagation
    // ========================================================================

    /// Register a subscriber. Cursors start at zero for every existing
    /// matching topic, so the first delta carries the current state.
    pub fn add_subscriber(
        &mut self,
        sub_id: impl Into<String>,
        pattern: impl Into<String>,
        filter: Option<String>,
    ) {
        let pattern = pattern.into();
        let cursors = self
            .facts
            .keys()
            .filter(|topic| topic_matches(&pattern, topic))
            .map(|topic| (topic.clone(), 0u64))
            .collect();
        self.subscribers.insert(
            sub_id.into(),
            Subscription {
                pattern,
                filter,
                cursors,
            },
        );
    }

    pub fn remove_subscriber(&mut self, sub_id: &str) -> bool {
        self.subscribers.remove(sub_id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Facts newer than the subscriber's cursors, pattern-matched and
    /// filter-approved, ordered by (topic, version). Does not advance the
    /// cursors; commit with `mark_delivered`.
    pub fn compute_delta(&self, sub_id: &str) -> Vec<KnowledgeStatement> {
        let Some(subscription) = self.subscribers.get(sub_id) else {
            return Vec::new();
        };

        let mut delta = Vec::new();
        for (topic, (value, version)) in &self.facts {
            if !topic_matches(&subscription.pattern, topic) {
                continue;
            }
            let cursor = subscription.cursors.get(topic).copied().unwrap_or(0);
            if *version <= cursor {
                continue;
            }
            if !filter_accepts(subscription.filter.as_deref(), topic, value) {
                continue;
            }
            delta.push(KnowledgeStatement {
                topic: topic.clone(),
                value: value.clone(),
                version: *version,
            });
        }

        delta.sort_by(|a, b| a.topic.cmp(&b.topic).then(a.version.cmp(&b.version)));
        delta
    }

    /// Commit a delivered delta: advance the subscriber's per-topic cursors.
    pub fn mark_delivered(&mut self, sub_id: &str, statements: &[KnowledgeStatement]) {
        let Some(subscription) = self.subscribers.get_mut(sub_id) else {
            return;
        };
        for stmt in statements {
            let cursor = subscription.cursors.entry(stmt.topic.clone()).or_insert(0);
            if stmt.version > *cursor {
                *cursor = stmt.version;
            }
        }
    }

    /// Apply statements from another agent. A statement is accepted only
    /// when its version is strictly newer than the stored one (ties reject
    /// the incoming). Returns the accepted subset.
    pub fn apply_incoming(
        &mut self,
        statements: &[KnowledgeStatement],
        from_agent: &str,
    ) -> Vec<KnowledgeStatement> {
        let mut applied = Vec::new();
        for stmt in statements {
            let current = self.current_version(&stmt.topic);
            if stmt.version > current {
                self.facts
                    .insert(stmt.topic.clone(), (stmt.value.clone(), stmt.version));
                applied.push(stmt.clone());
            } else {
                debug!(
                    topic = %stmt.topic,
                    incoming = stmt.version,
                    stored = current,
                    from = from_agent,
                    "rejected stale knowledge statement"
                );
            }
        }
        self.enforce_budget();
        applied
    }

    // ========================================================================
    // Budget compaction
    // ========================================================================

    /// Fold statements produced by budget compaction since the last call.
    pub fn take_compactions(&mut self) -> Vec<FoldStatement> {
        std::mem::take(&mut self.compactions)
    }

    /// Re-apply a compacted fold's facts at fresh versions. The store may
    /// sit over budget until the next assertion triggers compaction again.
    pub fn recall_compaction(&mut self, fold_id: &str) -> Result<usize, FoldError> {
        let state = self
            .folds
            .state(fold_id)
            .ok_or_else(|| FoldError::UnknownFoldId {
                fold_id: fold_id.to_string(),
            })?
            .to_vec();
        let count = state.len();
        for (topic, value) in state {
            let version = self.current_version(&topic) + 1;
            self.facts.insert(topic, (value, version));
        }
        Ok(count)
    }

    fn enforce_budget(&mut self) {
        let Some(budget) = self.budget else {
            return;
        };
        if self.facts.len() <= budget {
            return;
        }

        let excess = self.facts.len() - budget;
        let mut oldest: Vec<(String, Value, u64)> = self
            .facts
            .iter()
            .map(|(topic, (value, version))| (topic.clone(), value.clone(), *version))
            .collect();
        oldest.sort_by(|a, b| a.2.cmp(&b.2).then(a.0.cmp(&b.0)));
        oldest.truncate(excess);

        let state: Vec<(String, Value)> = oldest
            .iter()
            .map(|(topic, value, _)| (topic.clone(), value.clone()))
            .collect();
        let summary = format!("Folded {} knowledge facts", state.len());
        let fold_stmt = self.folds.fold(&[], summary, Some(state));
        debug!(
            agent = %self.agent_id,
            fold_id = %fold_stmt.fold_id,
            folded = oldest.len(),
            "knowledge budget exceeded, compacted oldest facts"
        );

        for (topic, _, _) in &oldest {
            self.facts.remove(topic);
        }
        self.compactions.push(fold_stmt);
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Full fact state as knowledge statements, topic-sorted.
    pub fn export_state(&self) -> Vec<KnowledgeStatement> {
        let mut statements: Vec<KnowledgeStatement> = self
            .facts
            .iter()
            .map(|(topic, (value, version))| KnowledgeStatement {
                topic: topic.clone(),
                value: value.clone(),
                version: *version,
            })
            .collect();
        statements.sort_by(|a, b| a.topic.cmp(&b.topic));
        statements
    }

    /// Replace the fact store with an exported state, versions included.
    pub fn import_state(&mut self, statements: &[KnowledgeStatement]) {
        self.facts.clear();
        for stmt in statements {
            self.facts
                .insert(stmt.topic.clone(), (stmt.value.clone(), stmt.version));
        }
    }

    pub fn clear(&mut self) {
        self.facts.clear();
        self.subscribers.clear();
        self.subscriptions.clear();
        self.folds.clear();
        self.compactions.clear();
    }
}

/// A filter passes when it is absent, or when it evaluates to null or true
/// against a context holding the fact under its topic name. Evaluation
/// failures skip the fact.
fn filter_accepts(filter: Option<&str>, topic: &str, value: &Value) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let mut context = MapContext::new();
    context.set(topic, value.clone());
    match evaluate(filter, &context) {
        Ok(Value::Null) | Ok(Value::Bool(true)) => true,
        Ok(_) => false,
        Err(e) => {
            warn!(filter, topic, error = %e, "subscription filter failed to evaluate");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Topic matching --

    #[test]
    fn test_topic_exact_match() {
        assert!(topic_matches("system.cpu", "system.cpu"));
        assert!(!topic_matches("system.cpu", "system.mem"));
        assert!(!topic_matches("system.cpu", "System.cpu"));
    }

    #[test]
    fn test_topic_single_level_wildcard() {
        assert!(topic_matches("system.*", "system.cpu"));
        assert!(topic_matches("system.*", "system.mem"));
        assert!(!topic_matches("system.*", "system.disk.usage"));
        assert!(!topic_matches("system.*", "other.cpu"));
        assert!(!topic_matches("system.*", "system"));
    }

    #[test]
    fn test_topic_multi_level_wildcard() {
        assert!(topic_matches("system.**", "system.cpu"));
        assert!(topic_matches("system.**", "system.disk.usage"));
        assert!(topic_matches("system.**", "system.disk.io.read"));
        assert!(!topic_matches("system.**", "other.cpu"));
        // ** consumes one or more segments, so the bare prefix is not a match
        assert!(!topic_matches("system.**", "system"));
    }

    #[test]
    fn test_bare_wildcards() {
        assert!(topic_matches("**", "system.cpu"));
        assert!(topic_matches("**", "anything"));
        assert!(topic_matches("**", "deeply.nested.topic.here"));
        assert!(topic_matches("*", "single"));
        assert!(!topic_matches("*", "two.segments"));
    }

    #[test]
    fn test_mid_pattern_double_star() {
        assert!(topic_matches("a.**.d", "a.b.d"));
        assert!(topic_matches("a.**.d", "a.b.c.d"));
        assert!(!topic_matches("a.**.d", "a.d"));
        assert!(!topic_matches("a.**.d", "a.b.c"));
    }

    // -- Facts and versions --

    #[test]
    fn test_assert_fact_returns_statement() {
        let mut engine = KnowledgeEngine::new("agent-a");
        let stmt = engine.assert_fact("system.cpu", Value::Int(85));
        assert_eq!(stmt.topic, "system.cpu");
        assert_eq!(stmt.value, Value::Int(85));
        assert_eq!(stmt.version, 1);
        assert_eq!(engine.get_fact("system.cpu"), Some(&(Value::Int(85), 1)));
        assert_eq!(engine.get_fact("missing"), None);
    }

    #[test]
    fn test_versions_are_per_topic_and_monotonic() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.assert_fact("a", Value::Int(1));
        engine.assert_fact("b", Value::Int(2));
        let second = engine.assert_fact("a", Value::Int(3));
        assert_eq!(second.version, 2);
        assert_eq!(engine.current_version("a"), 2);
        assert_eq!(engine.current_version("b"), 1);
        assert_eq!(engine.current_version("missing"), 0);
    }

    #[test]
    fn test_version_monotonicity_over_many_writes() {
        let mut engine = KnowledgeEngine::new("agent-a");
        let mut last = 0;
        for i in 0..20 {
            let stmt = engine.assert_fact("counter", Value::Int(i));
            assert!(stmt.version > last);
            last = stmt.version;
        }
    }

    #[test]
    fn test_query_facts() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.assert_fact("system.cpu", Value::Int(85));
        engine.assert_fact("system.mem", Value::Int(70));
        engine.assert_fact("app.errors", Value::Int(3));

        let results = engine.query_facts("system.*");
        let topics: Vec<&str> = results.iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(topics, vec!["system.cpu", "system.mem"]);
    }

    #[test]
    fn test_delete_fact() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.assert_fact("a", Value::Int(1));
        assert!(engine.delete_fact("a"));
        assert!(!engine.delete_fact("a"));
        assert_eq!(engine.fact_count(), 0);
    }

    // -- Own subscriptions --

    #[test]
    fn test_subscribe_unsubscribe_intents() {
        let mut engine = KnowledgeEngine::new("agent-a");
        let sub = engine.subscribe("system.*", None);
        assert_eq!(sub.topic, "system.*");
        assert!(engine.is_interested("system.cpu"));
        assert!(!engine.is_interested("app.errors"));

        let unsub = engine.unsubscribe("system.*");
        assert_eq!(unsub.topic, "system.*");
        assert!(!engine.is_interested("system.cpu"));
    }

    // -- Deltas --

    #[test]
    fn test_compute_delta_matches_pattern() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.add_subscriber("agent-b", "system.*", None);
        engine.assert_fact("system.cpu", Value::Int(85));
        engine.assert_fact("system.mem", Value::Int(70));
        engine.assert_fact("app.errors", Value::Int(3));

        let delta = engine.compute_delta("agent-b");
        let topics: Vec<&str> = delta.iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(topics, vec!["system.cpu", "system.mem"]);
    }

    #[test]
    fn test_delta_only_contains_latest_version() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.add_subscriber("agent-b", "system.**", None);
        engine.assert_fact("system.cpu", Value::Int(85));
        engine.assert_fact("system.cpu", Value::Int(90));

        let delta = engine.compute_delta("agent-b");
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].value, Value::Int(90));
        assert_eq!(delta[0].version, 2);
    }

    #[test]
    fn test_delta_then_mark_delivered_then_empty() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.add_subscriber("agent-b", "system.*", None);
        engine.assert_fact("system.cpu", Value::Int(50));
        engine.assert_fact("system.mem", Value::Int(60));

        let delta = engine.compute_delta("agent-b");
        assert_eq!(delta.len(), 2);
        engine.mark_delivered("agent-b", &delta);
        assert!(engine.compute_delta("agent-b").is_empty());

        // A new write re-opens the delta for just that topic
        engine.assert_fact("system.cpu", Value::Int(85));
        let delta = engine.compute_delta("agent-b");
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].topic, "system.cpu");
        assert_eq!(delta[0].value, Value::Int(85));
    }

    #[test]
    fn test_compute_delta_does_not_advance_cursor() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.add_subscriber("agent-b", "system.*", None);
        engine.assert_fact("system.cpu", Value::Int(85));

        assert_eq!(engine.compute_delta("agent-b").len(), 1);
        assert_eq!(engine.compute_delta("agent-b").len(), 1);
    }

    #[test]
    fn test_delta_ordering_topic_then_version() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.add_subscriber("agent-b", "**", None);
        engine.assert_fact("zeta", Value::Int(1));
        engine.assert_fact("alpha", Value::Int(2));
        engine.assert_fact("mid", Value::Int(3));

        let delta = engine.compute_delta("agent-b");
        let topics: Vec<&str> = delta.iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(topics, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_delta_for_unknown_subscriber_is_empty() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.assert_fact("a", Value::Int(1));
        assert!(engine.compute_delta("nobody").is_empty());
    }

    #[test]
    fn test_delta_filter_true_and_false() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.add_subscriber("agent-b", "system.*", Some("system.cpu>80".to_string()));
        engine.assert_fact("system.cpu", Value::Int(85));

        let delta = engine.compute_delta("agent-b");
        assert_eq!(delta.len(), 1);

        engine.assert_fact("system.cpu", Value::Int(40));
        let delta = engine.compute_delta("agent-b");
        assert!(delta.is_empty());
    }

    #[test]
    fn test_delta_filter_null_passes() {
        let mut engine = KnowledgeEngine::new("agent-a");
        // The filter references a path absent from the fact context
        engine.add_subscriber("agent-b", "system.*", Some("unrelated.path".to_string()));
        engine.assert_fact("system.cpu", Value::Int(85));

        let delta = engine.compute_delta("agent-b");
        assert_eq!(delta.len(), 1);
    }

    #[test]
    fn test_subscriber_added_after_facts_sees_them() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.assert_fact("system.cpu", Value::Int(85));
        engine.add_subscriber("agent-b", "system.**", None);

        let delta = engine.compute_delta("agent-b");
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].version, 1);
    }

    // -- Apply incoming --

    #[test]
    fn test_apply_incoming_accepts_newer() {
        let mut engine = KnowledgeEngine::new("agent-b");
        let incoming = vec![
            KnowledgeStatement {
                topic: "system.cpu".to_string(),
                value: Value::Int(85),
                version: 3,
            },
            KnowledgeStatement {
                topic: "system.mem".to_string(),
                value: Value::Int(70),
                version: 2,
            },
        ];
        let applied = engine.apply_incoming(&incoming, "agent-a");
        assert_eq!(applied.len(), 2);
        assert_eq!(engine.get_fact("system.cpu"), Some(&(Value::Int(85), 3)));
    }

    #[test]
    fn test_apply_incoming_rejects_stale_and_ties() {
        let mut engine = KnowledgeEngine::new("agent-b");
        engine.apply_incoming(
            &[KnowledgeStatement {
                topic: "system.cpu".to_string(),
                value: Value::Int(85),
                version: 3,
            }],
            "agent-a",
        );

        // Older version rejected
        let applied = engine.apply_incoming(
            &[KnowledgeStatement {
                topic: "system.cpu".to_string(),
                value: Value::Int(50),
                version: 1,
            }],
            "agent-a",
        );
        assert!(applied.is_empty());

        // Equal version rejected (ties favor the stored value)
        let applied = engine.apply_incoming(
            &[KnowledgeStatement {
                topic: "system.cpu".to_string(),
                value: Value::Int(99),
                version: 3,
            }],
            "agent-c",
        );
        assert!(applied.is_empty());
        assert_eq!(engine.get_fact("system.cpu"), Some(&(Value::Int(85), 3)));
    }

    // -- Budget compaction --

    #[test]
    fn test_budget_compaction_folds_oldest() {
        let mut engine = KnowledgeEngine::with_budget("agent-a", Some(5));
        for i in 0..8 {
            engine.assert_fact(format!("topic.{}", i), Value::Int(i));
        }
        assert!(engine.fact_count() <= 5);

        let compactions = engine.take_compactions();
        assert!(!compactions.is_empty());
        let folded_total: usize = compactions
            .iter()
            .map(|f| f.state.as_ref().map(|s| s.len()).unwrap_or(0))
            .sum();
        assert_eq!(folded_total, 3);
        assert!(engine.take_compactions().is_empty());
    }

    #[test]
    fn test_knowledge_pressure() {
        let mut engine = KnowledgeEngine::with_budget("agent-a", Some(10));
        for i in 0..5 {
            engine.assert_fact(format!("topic.{}", i), Value::Int(i));
        }
        assert!((engine.knowledge_pressure() - 0.5).abs() < f64::EPSILON);

        let unbudgeted = KnowledgeEngine::with_budget("agent-b", None);
        assert_eq!(unbudgeted.knowledge_pressure(), 0.0);
    }

    #[test]
    fn test_recall_compaction_restores_facts() {
        let mut engine = KnowledgeEngine::with_budget("agent-a", Some(2));
        engine.assert_fact("a", Value::Int(1));
        engine.assert_fact("b", Value::Int(2));
        engine.assert_fact("c", Value::Int(3));

        let compactions = engine.take_compactions();
        assert_eq!(compactions.len(), 1);
        let folded_topic = compactions[0]
            .state
            .as_ref()
            .and_then(|s| s.first())
            .map(|(t, _)| t.clone())
            .expect("folded state");
        assert_eq!(engine.get_fact(&folded_topic), None);

        let restored = engine.recall_compaction(&compactions[0].fold_id);
        assert_eq!(restored, Ok(1));
        assert!(engine.get_fact(&folded_topic).is_some());
    }

    #[test]
    fn test_recall_unknown_compaction_fails() {
        let mut engine = KnowledgeEngine::new("agent-a");
        let err = engine.recall_compaction("nope").expect_err("should fail");
        assert_eq!(err.code(), "UNKNOWN_FOLD_ID");
    }

    #[test]
    fn test_no_budget_never_compacts() {
        let mut engine = KnowledgeEngine::with_budget("agent-a", None);
        for i in 0..100 {
            engine.assert_fact(format!("topic.{}", i), Value::Int(i));
        }
        assert_eq!(engine.fact_count(), 100);
        assert!(engine.take_compactions().is_empty());
    }

    // -- Checkpointing --

    #[test]
    fn test_export_import_round_trip() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.assert_fact("system.cpu", Value::Int(85));
        engine.assert_fact("system.cpu", Value::Int(90));
        engine.assert_fact("app.name", Value::from("web"));

        let exported = engine.export_state();
        assert_eq!(exported.len(), 2);

        let mut restored = KnowledgeEngine::new("agent-b");
        restored.import_state(&exported);
        assert_eq!(restored.get_fact("system.cpu"), Some(&(Value::Int(90), 2)));
        assert_eq!(restored.get_fact("app.name"), Some(&(Value::from("web"), 1)));
    }

    #[test]
    fn test_clear() {
        let mut engine = KnowledgeEngine::new("agent-a");
        engine.assert_fact("a", Value::Int(1));
        engine.subscribe("a", None);
        engine.add_subscriber("agent-b", "a", None);
        engine.clear();
        assert_eq!(engine.fact_count(), 0);
        assert_eq!(engine.subscriber_count(), 0);
        assert!(engine.subscriptions().is_empty());
    }
}
