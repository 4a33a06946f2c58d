//! Correlation engine: message ids, threads and the causality tree
//!
//! Each agent owns one engine holding its id, a monotonic message counter
//! and the last received message id. Correlation linkage is by-id lookup
//! across a caller-owned message collection, never a back-pointer.

use chrono::Utc;
use sag_core::{Header, Message, ProtocolConfig};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct CorrelationEngine {
    agent_id: String,
    counter: AtomicU64,
    last_received: Option<String>,
    protocol_version: u32,
}

impl CorrelationEngine {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            counter: AtomicU64::new(0),
            last_received: None,
            protocol_version: ProtocolConfig::default().protocol_version,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Fresh `<agent-id>-<n>` message id, strictly increasing.
    pub fn generate_message_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.agent_id, n)
    }

    /// Remember the id of an incoming message for auto-correlation.
    pub fn record_incoming(&mut self, message: &Message) {
        self.last_received = Some(message.header.message_id.clone());
    }

    pub fn last_received(&self) -> Option<&str> {
        self.last_received.as_deref()
    }

    /// Header for a response to the last recorded incoming message (no
    /// correlation when nothing was recorded). Timestamps are seconds.
    pub fn create_response_header(&self, source: &str, destination: &str) -> Header {
        Header::new(
            self.protocol_version,
            self.generate_message_id(),
            source,
            destination,
            Utc::now().timestamp(),
        )
        .with_correlation(self.last_received.clone())
    }

    /// Header correlated to a specific message.
    pub fn create_header_in_response_to(
        &self,
        source: &str,
        destination: &str,
        in_response_to: &Message,
    ) -> Header {
        self.create_header_with_correlation(
            source,
            destination,
            &in_response_to.header.message_id,
        )
    }

    /// Header with an explicit correlation id.
    pub fn create_header_with_correlation(
        &self,
        source: &str,
        destination: &str,
        correlation_id: &str,
    ) -> Header {
        Header::new(
            self.protocol_version,
            self.generate_message_id(),
            source,
            destination,
            Utc::now().timestamp(),
        )
        .with_correlation(Some(correlation_id.to_string()))
    }

    /// Reset the last-received slot. The id counter keeps counting.
    pub fn clear(&mut self) {
        self.last_received = None;
    }

    /// Snapshot of the last-received slot for checkpointing.
    pub fn export_state(&self) -> Option<String> {
        self.last_received.clone()
    }

    pub fn import_state(&mut self, last_received: Option<String>) {
        self.last_received = last_received;
    }

    // ========================================================================
    // Static helpers over caller-owned collections
    // ========================================================================

    /// All messages correlated to `message_id`, in insertion order.
    pub fn find_responses<'m>(messages: &'m [Message], message_id: &str) -> Vec<&'m Message> {
        messages
            .iter()
            .filter(|m| m.header.correlation.as_deref() == Some(message_id))
            .collect()
    }

    /// Follow correlation links backward from `start_message_id` and return
    /// the thread oldest-first. A visited set breaks cycles.
    pub fn trace_thread<'m>(messages: &'m [Message], start_message_id: &str) -> Vec<&'m Message> {
        let by_id: HashMap<&str, &Message> = messages
            .iter()
            .map(|m| (m.header.message_id.as_str(), m))
            .collect();

        let mut thread = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = Some(start_message_id);

        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let Some(message) = by_id.get(id) else {
                break;
            };
            thread.push(*message);
            current = message.header.correlation.as_deref();
        }

        thread.reverse();
        thread
    }

    /// Parent id to direct child ids. Roots (null correlation) appear as
    /// keys with no parent entry pointing at them.
    pub fn build_conversation_tree(messages: &[Message]) -> HashMap<String, Vec<String>> {
        let mut tree: HashMap<String, Vec<String>> = HashMap::new();
        for message in messages {
            let id = message.header.message_id.clone();
            tree.entry(id.clone()).or_default();
            if let Some(parent) = &message.header.correlation {
                tree.entry(parent.clone()).or_default().push(id);
            }
        }
        tree
    }
}
