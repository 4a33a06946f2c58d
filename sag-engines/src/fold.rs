//! Fold engine: exact-fidelity context compression
//!
//! Folding archives an ordered message sequence under a fresh id with a
//! human-readable summary and an optional state snapshot. Unfolding returns
//! the archived sequence unchanged, element for element. That exact-fidelity
//! guarantee is what the fold protocol provides over summarization.

use sag_core::{FoldError, FoldStatement, Message, ProtocolConfig, RecallStatement, Value};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct FoldEntry {
    messages: Vec<Message>,
    summary: String,
    state: Option<Vec<(String, Value)>>,
}

/// Per-agent archive of folded message sequences.
#[derive(Debug, Clone, Default)]
pub struct FoldEngine {
    store: HashMap<String, FoldEntry>,
}

impl FoldEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archive `messages` and return the fold statement describing them.
    pub fn fold(
        &mut self,
        messages: &[Message],
        summary: impl Into<String>,
        state: Option<Vec<(String, Value)>>,
    ) -> FoldStatement {
        let summary = summary.into();
        let fold_id = self.fresh_fold_id();

        self.store.insert(
            fold_id.clone(),
            FoldEntry {
                messages: messages.to_vec(),
                summary: summary.clone(),
                state: state.clone(),
            },
        );

        FoldStatement {
            fold_id,
            summary,
            state,
        }
    }

    /// Recover the archived sequence for a fold id.
    pub fn unfold(&self, fold_id: &str) -> Result<Vec<Message>, FoldError> {
        self.store
            .get(fold_id)
            .map(|entry| entry.messages.clone())
            .ok_or_else(|| FoldError::UnknownFoldId {
                fold_id: fold_id.to_string(),
            })
    }

    /// Serve an on-wire `RECALL` statement.
    pub fn resolve_recall(&self, recall: &RecallStatement) -> Result<Vec<Message>, FoldError> {
        self.unfold(&recall.fold_id)
    }

    pub fn contains(&self, fold_id: &str) -> bool {
        self.store.contains_key(fold_id)
    }

    pub fn summary(&self, fold_id: &str) -> Option<&str> {
        self.store.get(fold_id).map(|entry| entry.summary.as_str())
    }

    pub fn state(&self, fold_id: &str) -> Option<&[(String, Value)]> {
        self.store
            .get(fold_id)
            .and_then(|entry| entry.state.as_deref())
    }

    pub fn remove(&mut self, fold_id: &str) -> bool {
        self.store.remove(fold_id).is_some()
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Whether a message window's token footprint has reached the given
    /// share of the budget.
    pub fn detect_pressure(messages: &[Message], budget: usize, threshold: f64) -> bool {
        let total: usize = messages
            .iter()
            .map(|m| sag_dsl::count_tokens(&sag_dsl::minify(m)))
            .sum();
        total as f64 >= budget as f64 * threshold
    }

    /// `detect_pressure` with the configured default threshold.
    pub fn detect_pressure_default(messages: &[Message], budget: usize) -> bool {
        Self::detect_pressure(
            messages,
            budget,
            ProtocolConfig::default().fold_pressure_threshold,
        )
    }

    fn fresh_fold_id(&self) -> String {
        loop {
            let id: String = Uuid::new_v4().simple().to_string()[..16].to_string();
            if !self.store.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sag_core::{Header, Statement};

    fn message(id: &str, body: &str) -> Message {
        sag_dsl::parse(&format!(
            "H v 1 id={} src=svc1 dst=svc2 ts=1000\n{}",
            id, body
        ))
        .expect("parse failed")
    }

    #[test]
    fn test_fold_returns_statement_with_fresh_id() {
        let mut engine = FoldEngine::new();
        let ms = vec![message("m1", "DO start()")];
        let stmt = engine.fold(&ms, "startup", None);
        assert!(!stmt.fold_id.is_empty());
        assert_eq!(stmt.summary, "startup");
        assert!(engine.contains(&stmt.fold_id));
    }

    #[test]
    fn test_fold_ids_are_unique() {
        let mut engine = FoldEngine::new();
        let ms = vec![message("m1", "DO start()")];
        let a = engine.fold(&ms, "a", None);
        let b = engine.fold(&ms, "b", None);
        assert_ne!(a.fold_id, b.fold_id);
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_unfold_restores_messages_exactly() {
        let mut engine = FoldEngine::new();
        let ms = vec![
            message("m1", "DO deploy(\"app1\",version=42) PRIO=HIGH BECAUSE balance>1000"),
            message("m2", "Q status WHERE healthy==true; A ready = true"),
            message("m3", "KNOW system.cpu = 85.2 v 3"),
        ];
        let stmt = engine.fold(&ms, "history", None);
        let restored = engine.unfold(&stmt.fold_id).expect("unfold failed");
        assert_eq!(restored, ms);
    }

    #[test]
    fn test_fold_fidelity_over_fifty_messages() {
        let mut engine = FoldEngine::new();
        let ms: Vec<Message> = (0..50)
            .map(|i| {
                message(
                    &format!("m{}", i),
                    &format!("DO step(n={}); EVT tick({})", i, i),
                )
            })
            .collect();
        let stmt = engine.fold(&ms, "fifty steps", None);
        let restored = engine.unfold(&stmt.fold_id).expect("unfold failed");
        assert_eq!(restored.len(), 50);
        for (original, recovered) in ms.iter().zip(&restored) {
            assert_eq!(original.header, recovered.header);
            assert_eq!(original.statements, recovered.statements);
        }
    }

    #[test]
    fn test_fold_with_state_snapshot() {
        let mut engine = FoldEngine::new();
        let state = vec![
            ("count".to_string(), Value::Int(5)),
            ("phase".to_string(), Value::from("done")),
        ];
        let stmt = engine.fold(&[], "state only", Some(state.clone()));
        assert_eq!(stmt.state.as_deref(), Some(state.as_slice()));
        assert_eq!(engine.state(&stmt.fold_id), Some(state.as_slice()));
        assert_eq!(engine.summary(&stmt.fold_id), Some("state only"));
    }

    #[test]
    fn test_unfold_unknown_id_fails() {
        let engine = FoldEngine::new();
        let err = engine.unfold("nope").expect_err("should fail");
        assert_eq!(err.code(), "UNKNOWN_FOLD_ID");
    }

    #[test]
    fn test_remove_and_clear() {
        let mut engine = FoldEngine::new();
        let stmt = engine.fold(&[], "x", None);
        assert!(engine.remove(&stmt.fold_id));
        assert!(!engine.remove(&stmt.fold_id));
        engine.fold(&[], "y", None);
        engine.clear();
        assert!(engine.is_empty());
    }

    #[test]
    fn test_resolve_recall_statement() {
        let mut engine = FoldEngine::new();
        let ms = vec![message("m1", "DO start()")];
        let stmt = engine.fold(&ms, "startup", None);
        let recall = sag_core::RecallStatement {
            fold_id: stmt.fold_id.clone(),
        };
        assert_eq!(engine.resolve_recall(&recall), Ok(ms));

        let missing = sag_core::RecallStatement {
            fold_id: "absent".to_string(),
        };
        assert!(engine.resolve_recall(&missing).is_err());
    }

    #[test]
    fn test_fold_statement_travels_on_wire() {
        let mut engine = FoldEngine::new();
        let stmt = engine.fold(&[], "compressed", Some(vec![("n".to_string(), Value::Int(1))]));
        let wire_message = Message::new(
            Header::new(1, "m9", "svc1", "svc2", 1000),
            vec![Statement::Fold(stmt.clone())],
        );
        let reparsed = sag_dsl::parse(&sag_dsl::minify(&wire_message)).expect("round trip");
        assert_eq!(reparsed.statements, vec![Statement::Fold(stmt)]);
    }

    #[test]
    fn test_detect_pressure() {
        let ms: Vec<Message> = (0..10)
            .map(|i| message(&format!("m{}", i), "DO work()"))
            .collect();
        assert!(FoldEngine::detect_pressure(&ms, 10, 0.7));
        assert!(!FoldEngine::detect_pressure(&ms, 100_000, 0.7));
        assert!(FoldEngine::detect_pressure_default(&ms, 10));
    }
}
