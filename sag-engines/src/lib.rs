//! SAG Engines - Stateful Protocol Runtime
//!
//! The engines that sit behind the grammar: schema validation, the
//! four-layer sanitization firewall, the fold (context compression) engine,
//! the correlation/causality tracker and the topic-subscription knowledge
//! propagation engine.
//!
//! Every engine instance belongs to one agent and is single-threaded; all
//! cross-agent propagation happens by serializing statements onto the wire.

pub mod correlation;
pub mod fold;
pub mod guardrail;
pub mod knowledge;
pub mod profiles;
pub mod sanitizer;
pub mod schema;

pub use correlation::*;
pub use fold::*;
pub use guardrail::*;
pub use knowledge::*;
pub use profiles::*;
pub use sanitizer::*;
pub use schema::*;
