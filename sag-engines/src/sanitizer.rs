//! Four-layer sanitization firewall
//!
//! Layer 1 parses the wire text and fails fast. Layers 2-4 (routing guard,
//! schema validation, guardrail check) all run and collect every error they
//! find, so a caller can fix many problems at once.

use crate::{GuardrailValidator, SchemaRegistry, SchemaValidator};
use sag_core::{ErrorStatement, MapContext, Message, RoutingError, Statement};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Allow-list registry: agent id to the destinations it may address.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, HashSet<String>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent with the destinations it is allowed to send to.
    pub fn register<I, S>(&mut self, agent_id: impl Into<String>, allowed_destinations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agents.insert(
            agent_id.into(),
            allowed_destinations.into_iter().map(Into::into).collect(),
        );
    }

    /// Extend an existing agent's allow-list (registering it if unknown).
    pub fn allow(&mut self, agent_id: &str, destination: impl Into<String>) {
        self.agents
            .entry(agent_id.to_string())
            .or_default()
            .insert(destination.into());
    }

    pub fn unregister(&mut self, agent_id: &str) {
        self.agents.remove(agent_id);
    }

    pub fn is_known(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    /// Routing check for one edge of the allow-list graph.
    pub fn check_route(&self, source: &str, destination: &str) -> Result<(), RoutingError> {
        let allowed = self
            .agents
            .get(source)
            .ok_or_else(|| RoutingError::UnknownSource {
                agent: source.to_string(),
            })?;
        if !self.is_known(destination) {
            return Err(RoutingError::UnknownDestination {
                agent: destination.to_string(),
            });
        }
        if !allowed.contains(destination) {
            return Err(RoutingError::DestinationNotAllowed {
                source_agent: source.to_string(),
                destination: destination.to_string(),
            });
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.agents.clear();
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Which firewall layer produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SanitizerLayer {
    Parse,
    Routing,
    Schema,
    Guardrail,
}

/// One typed sanitizer error: the layer, the machine-readable code and a
/// human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizerError {
    pub layer: SanitizerLayer,
    pub code: String,
    pub message: String,
}

impl SanitizerError {
    fn new(layer: SanitizerLayer, code: &str, message: String) -> Self {
        Self {
            layer,
            code: code.to_string(),
            message,
        }
    }

    pub fn to_error_statement(&self) -> ErrorStatement {
        ErrorStatement {
            error_code: self.code.clone(),
            message: Some(self.message.clone()),
        }
    }
}

/// Aggregate result of a sanitization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizeResult {
    pub valid: bool,
    pub message: Option<Message>,
    pub errors: Vec<SanitizerError>,
}

impl SanitizeResult {
    fn from_errors(message: Option<Message>, errors: Vec<SanitizerError>) -> Self {
        Self {
            valid: errors.is_empty(),
            message,
            errors,
        }
    }
}

/// The firewall. Owns the schema registry, the agent allow-list and the
/// guardrail context for one agent.
pub struct Sanitizer {
    schemas: SchemaRegistry,
    agents: AgentRegistry,
    context: MapContext,
}

impl Sanitizer {
    pub fn new(schemas: SchemaRegistry, agents: AgentRegistry, context: MapContext) -> Self {
        Self {
            schemas,
            agents,
            context,
        }
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Run all four layers on raw wire text.
    pub fn sanitize(&self, raw: &str) -> SanitizeResult {
        self.sanitize_inner(raw, None)
    }

    /// Run all four layers, additionally requiring that the header's source
    /// matches the agent the text was received from.
    pub fn sanitize_from(&self, raw: &str, from_agent: &str) -> SanitizeResult {
        self.sanitize_inner(raw, Some(from_agent))
    }

    fn sanitize_inner(&self, raw: &str, from_agent: Option<&str>) -> SanitizeResult {
        // Layer 1: grammar parse, fail fast
        let message = match sag_dsl::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                debug!(code = e.code(), "sanitizer rejected input at parse layer");
                return SanitizeResult::from_errors(
                    None,
                    vec![SanitizerError::new(
                        SanitizerLayer::Parse,
                        e.code(),
                        e.to_string(),
                    )],
                );
            }
        };

        let mut errors = self.check_message(&message);

        if let Some(claimed) = from_agent {
            if message.header.source != claimed {
                errors.insert(
                    0,
                    SanitizerError::new(
                        SanitizerLayer::Routing,
                        "ROUTING_DENIED",
                        format!(
                            "Header source '{}' does not match sending agent '{}'",
                            message.header.source, claimed
                        ),
                    ),
                );
            }
        }

        SanitizeResult::from_errors(Some(message), errors)
    }

    /// Run layers 2-4 on an already-constructed message (outbound checks).
    pub fn sanitize_message(&self, message: &Message) -> SanitizeResult {
        let errors = self.check_message(message);
        SanitizeResult::from_errors(Some(message.clone()), errors)
    }

    fn check_message(&self, message: &Message) -> Vec<SanitizerError> {
        let mut errors = Vec::new();

        // Layer 2: routing guard
        if let Err(e) = self
            .agents
            .check_route(&message.header.source, &message.header.destination)
        {
            debug!(code = e.code(), "sanitizer rejected message at routing layer");
            errors.push(SanitizerError::new(
                SanitizerLayer::Routing,
                e.code(),
                e.to_string(),
            ));
        }

        // Layer 3: schema validation for actions and events
        let validator = SchemaValidator::new(&self.schemas);
        for stmt in &message.statements {
            let result = match stmt {
                Statement::Action(action) => validator.validate(action),
                Statement::Event(event) => validator.validate_event(event),
                _ => Ok(()),
            };
            if let Err(e) = result {
                debug!(code = e.code(), "sanitizer rejected statement at schema layer");
                errors.push(SanitizerError::new(
                    SanitizerLayer::Schema,
                    e.code(),
                    e.to_string(),
                ));
            }
        }

        // Layer 4: guardrail check
        for stmt in &message.statements {
            if let Statement::Action(action) = stmt {
                if let Err(e) = GuardrailValidator::validate(action, &self.context) {
                    debug!(
                        code = e.code(),
                        "sanitizer rejected statement at guardrail layer"
                    );
                    errors.push(SanitizerError::new(
                        SanitizerLayer::Guardrail,
                        e.code(),
                        e.to_string(),
                    ));
                }
            }
        }

        errors
    }
}
