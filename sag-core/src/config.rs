//! Runtime configuration

use serde::{Deserialize, Serialize};

/// Shared runtime defaults for the protocol engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol version stamped into generated headers.
    pub protocol_version: u32,
    /// Soft bound on the number of facts a knowledge engine stores before
    /// compacting the oldest into a fold.
    pub knowledge_budget: usize,
    /// Fraction of a token budget at which fold pressure is reported.
    pub fold_pressure_threshold: f64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol_version: 1,
            knowledge_budget: 1000,
            fold_pressure_threshold: 0.7,
        }
    }
}
