//! Schema registry and call validation

use regex::Regex;
use sag_core::{ActionStatement, ArgumentSpec, EventStatement, SchemaViolation, Value, VerbSchema};
use std::collections::HashMap;

/// Registry mapping verb names to their schemas.
///
/// Validation is opt-in: a verb with no registered schema always passes.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, VerbSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: VerbSchema) {
        self.schemas.insert(schema.verb_name.clone(), schema);
    }

    pub fn unregister(&mut self, verb_name: &str) {
        self.schemas.remove(verb_name);
    }

    pub fn get(&self, verb_name: &str) -> Option<&VerbSchema> {
        self.schemas.get(verb_name)
    }

    pub fn has(&self, verb_name: &str) -> bool {
        self.schemas.contains_key(verb_name)
    }

    pub fn registered_verbs(&self) -> Vec<&str> {
        let mut verbs: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        verbs.sort_unstable();
        verbs
    }

    pub fn clear(&mut self) {
        self.schemas.clear();
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Validates action and event calls against a registry.
///
/// Checks run in a fixed order so failure reports are deterministic:
/// positional arguments by index, then the positional count, then named
/// arguments in insertion order. Per argument, the type check runs first and
/// the value constraints after it: enum, then pattern, then range.
pub struct SchemaValidator<'reg> {
    registry: &'reg SchemaRegistry,
}

impl<'reg> SchemaValidator<'reg> {
    pub fn new(registry: &'reg SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, action: &ActionStatement) -> Result<(), SchemaViolation> {
        match self.registry.get(&action.verb) {
            Some(schema) => validate_call(schema, &action.args, &action.named_args),
            None => Ok(()),
        }
    }

    /// Events validate against the schema registered under their event name.
    pub fn validate_event(&self, event: &EventStatement) -> Result<(), SchemaViolation> {
        match self.registry.get(&event.event_name) {
            Some(schema) => validate_call(schema, &event.args, &event.named_args),
            None => Ok(()),
        }
    }
}

fn validate_call(
    schema: &VerbSchema,
    args: &[Value],
    named_args: &[(String, Value)],
) -> Result<(), SchemaViolation> {
    let by_name = |name: &str| named_args.iter().find(|(k, _)| k == name).map(|(_, v)| v);

    // Positional arguments, index 0 upward. A positional spec may also be
    // satisfied by a named argument carrying the spec's name.
    for (i, spec) in schema.positional_args.iter().enumerate() {
        match args.get(i).or_else(|| by_name(&spec.name)) {
            None => {
                if spec.required {
                    return Err(SchemaViolation::MissingArg {
                        arg: spec.name.clone(),
                    });
                }
            }
            Some(value) => {
                check_type(spec, value)?;
                check_constraints(spec, value)?;
            }
        }
    }

    if args.len() > schema.positional_args.len() && !schema.allow_extra_args {
        return Err(SchemaViolation::TooManyArgs {
            expected: schema.positional_args.len(),
            actual: args.len(),
        });
    }

    // Unknown named arguments
    let is_positional_name = |key: &str| schema.positional_args.iter().any(|s| s.name == key);
    for (key, _) in named_args {
        if schema.named_arg(key).is_none() && !is_positional_name(key) && !schema.allow_extra_args {
            return Err(SchemaViolation::InvalidArgs { arg: key.clone() });
        }
    }

    // Declared named arguments in insertion order
    for (key, spec) in &schema.named_args {
        match named_args.iter().find(|(k, _)| k == key) {
            None => {
                if spec.required {
                    return Err(SchemaViolation::MissingArg { arg: key.clone() });
                }
            }
            Some((_, value)) => {
                check_type(spec, value)?;
                check_constraints(spec, value)?;
            }
        }
    }

    Ok(())
}

fn check_type(spec: &ArgumentSpec, value: &Value) -> Result<(), SchemaViolation> {
    if spec.arg_type.accepts(value) {
        Ok(())
    } else {
        Err(SchemaViolation::TypeMismatch {
            arg: spec.name.clone(),
            expected: spec.arg_type,
            actual: value.type_name().to_string(),
        })
    }
}

/// Value constraints in fixed order: enum, pattern, range. Null passes all.
fn check_constraints(spec: &ArgumentSpec, value: &Value) -> Result<(), SchemaViolation> {
    if value.is_null() {
        return Ok(());
    }

    if let Some(allowed) = &spec.allowed_values {
        if !allowed.iter().any(|candidate| candidate.loose_eq(value)) {
            return Err(SchemaViolation::ValueNotAllowed {
                arg: spec.name.clone(),
                value: display_value(value),
            });
        }
    }

    if let Some(pattern) = &spec.pattern {
        if let Value::String(s) = value {
            if !full_match(pattern, s) {
                return Err(SchemaViolation::PatternMismatch {
                    arg: spec.name.clone(),
                    value: s.clone(),
                    pattern: pattern.clone(),
                });
            }
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = spec.min_value {
            if n < min {
                return Err(SchemaViolation::ValueOutOfRange {
                    arg: spec.name.clone(),
                    value: display_value(value),
                });
            }
        }
        if let Some(max) = spec.max_value {
            if n > max {
                return Err(SchemaViolation::ValueOutOfRange {
                    arg: spec.name.clone(),
                    value: display_value(value),
                });
            }
        }
    }

    Ok(())
}

/// Full-string match; the pattern itself was validated when the schema was
/// built, so a compile failure here only skips the check.
fn full_match(pattern: &str, text: &str) -> bool {
    match Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(re) => re.is_match(text),
        Err(_) => true,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format!("{:?}", f),
        Value::Bool(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}
