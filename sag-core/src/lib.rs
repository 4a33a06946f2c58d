//! SAG Core - Message Model
//!
//! Pure data structures with no engine behavior. All other crates depend on this.
//! This crate contains the message AST, wire values, schema definition types,
//! the evaluation context contract and the shared error types.

mod config;
mod context;
mod error;
mod message;
mod schema;
mod value;

pub use config::*;
pub use context::*;
pub use error::*;
pub use message::*;
pub use schema::*;
pub use value::*;
