//! Verb schema definition types

use crate::{SchemaError, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared argument types for verb schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Object,
    Any,
}

impl ArgType {
    /// Type compatibility check. Null passes any declared type.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            ArgType::String => matches!(value, Value::String(_)),
            ArgType::Integer => matches!(value, Value::Int(_)),
            ArgType::Float => matches!(value, Value::Float(_)),
            ArgType::Boolean => matches!(value, Value::Bool(_)),
            ArgType::List => matches!(value, Value::List(_)),
            ArgType::Object => matches!(value, Value::Object(_)),
            ArgType::Any => true,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ArgType::Integer | ArgType::Float)
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::String => "STRING",
            ArgType::Integer => "INTEGER",
            ArgType::Float => "FLOAT",
            ArgType::Boolean => "BOOLEAN",
            ArgType::List => "LIST",
            ArgType::Object => "OBJECT",
            ArgType::Any => "ANY",
        };
        f.write_str(name)
    }
}

/// Specification of a single verb argument.
///
/// Beyond the declared type, three optional value constraints can be set:
/// an enum (`allowed_values`), a full-string regex (`pattern`, STRING only)
/// and a numeric range (`min_value`/`max_value`, numeric only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub arg_type: ArgType,
    pub required: bool,
    pub description: String,
    pub allowed_values: Option<Vec<Value>>,
    pub pattern: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl ArgumentSpec {
    pub fn new(
        name: impl Into<String>,
        arg_type: ArgType,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arg_type,
            required,
            description: description.into(),
            allowed_values: None,
            pattern: None,
            min_value: None,
            max_value: None,
        }
    }

    pub fn required(name: impl Into<String>, arg_type: ArgType, description: impl Into<String>) -> Self {
        Self::new(name, arg_type, true, description)
    }

    pub fn optional(name: impl Into<String>, arg_type: ArgType, description: impl Into<String>) -> Self {
        Self::new(name, arg_type, false, description)
    }

    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_range(mut self, min_value: f64, max_value: f64) -> Self {
        self.min_value = Some(min_value);
        self.max_value = Some(max_value);
        self
    }

    pub fn with_min(mut self, min_value: f64) -> Self {
        self.min_value = Some(min_value);
        self
    }

    pub fn with_max(mut self, max_value: f64) -> Self {
        self.max_value = Some(max_value);
        self
    }

    /// Constraint consistency checks applied when a schema is built.
    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        if self.pattern.is_some() && self.arg_type != ArgType::String {
            return Err(SchemaError::PatternOnNonString {
                arg: self.name.clone(),
                arg_type: self.arg_type,
            });
        }
        if (self.min_value.is_some() || self.max_value.is_some()) && !self.arg_type.is_numeric() {
            return Err(SchemaError::RangeOnNonNumeric {
                arg: self.name.clone(),
                arg_type: self.arg_type,
            });
        }
        if let Some(values) = &self.allowed_values {
            if values.is_empty() {
                return Err(SchemaError::EmptyAllowedValues {
                    arg: self.name.clone(),
                });
            }
        }
        if let Some(pattern) = &self.pattern {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(SchemaError::InvalidPattern {
                    arg: self.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Call-shape schema for one verb: ordered positional specs, named specs in
/// insertion order, and whether extra arguments are tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbSchema {
    pub verb_name: String,
    pub positional_args: Vec<ArgumentSpec>,
    pub named_args: Vec<(String, ArgumentSpec)>,
    pub allow_extra_args: bool,
}

impl VerbSchema {
    pub fn builder(verb_name: impl Into<String>) -> VerbSchemaBuilder {
        VerbSchemaBuilder {
            verb_name: verb_name.into(),
            positional_args: Vec::new(),
            named_args: Vec::new(),
            allow_extra_args: false,
        }
    }

    pub fn named_arg(&self, name: &str) -> Option<&ArgumentSpec> {
        self.named_args.iter().find(|(k, _)| k == name).map(|(_, s)| s)
    }
}

/// Builder for `VerbSchema`. `build` rejects inconsistent constraints:
/// a pattern on a non-STRING argument, a range on a non-numeric argument,
/// an empty enum, or an uncompilable pattern.
pub struct VerbSchemaBuilder {
    verb_name: String,
    positional_args: Vec<ArgumentSpec>,
    named_args: Vec<(String, ArgumentSpec)>,
    allow_extra_args: bool,
}

impl VerbSchemaBuilder {
    pub fn positional(mut self, spec: ArgumentSpec) -> Self {
        self.positional_args.push(spec);
        self
    }

    pub fn named(mut self, spec: ArgumentSpec) -> Self {
        self.named_args.push((spec.name.clone(), spec));
        self
    }

    pub fn allow_extra_args(mut self, allow: bool) -> Self {
        self.allow_extra_args = allow;
        self
    }

    pub fn build(self) -> Result<VerbSchema, SchemaError> {
        for spec in &self.positional_args {
            spec.validate()?;
        }
        for (_, spec) in &self.named_args {
            spec.validate()?;
        }
        Ok(VerbSchema {
            verb_name: self.verb_name,
            positional_args: self.positional_args,
            named_args: self.named_args,
            allow_extra_args: self.allow_extra_args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_compatibility() {
        assert!(ArgType::String.accepts(&Value::from("x")));
        assert!(!ArgType::String.accepts(&Value::Int(1)));
        assert!(ArgType::Integer.accepts(&Value::Int(1)));
        assert!(!ArgType::Integer.accepts(&Value::Float(1.0)));
        assert!(ArgType::Any.accepts(&Value::List(vec![])));
    }

    #[test]
    fn test_null_passes_any_type() {
        for t in [
            ArgType::String,
            ArgType::Integer,
            ArgType::Float,
            ArgType::Boolean,
            ArgType::List,
            ArgType::Object,
            ArgType::Any,
        ] {
            assert!(t.accepts(&Value::Null));
        }
    }

    #[test]
    fn test_builder_rejects_pattern_on_non_string() {
        let result = VerbSchema::builder("deploy")
            .positional(
                ArgumentSpec::required("count", ArgType::Integer, "").with_pattern(r"^\d+$"),
            )
            .build();
        assert!(matches!(result, Err(SchemaError::PatternOnNonString { .. })));
    }

    #[test]
    fn test_builder_rejects_range_on_non_numeric() {
        let result = VerbSchema::builder("deploy")
            .named(ArgumentSpec::optional("env", ArgType::String, "").with_range(0.0, 1.0))
            .build();
        assert!(matches!(result, Err(SchemaError::RangeOnNonNumeric { .. })));
    }

    #[test]
    fn test_builder_rejects_empty_enum() {
        let result = VerbSchema::builder("deploy")
            .named(ArgumentSpec::optional("env", ArgType::String, "").with_allowed_values(vec![]))
            .build();
        assert!(matches!(result, Err(SchemaError::EmptyAllowedValues { .. })));
    }

    #[test]
    fn test_builder_rejects_bad_regex() {
        let result = VerbSchema::builder("release")
            .positional(ArgumentSpec::required("version", ArgType::String, "").with_pattern("(["))
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidPattern { .. })));
    }

    #[test]
    fn test_builder_preserves_named_order() -> Result<(), SchemaError> {
        let schema = VerbSchema::builder("deploy")
            .named(ArgumentSpec::optional("version", ArgType::Integer, ""))
            .named(ArgumentSpec::optional("env", ArgType::String, ""))
            .build()?;
        let keys: Vec<&str> = schema.named_args.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["version", "env"]);
        assert!(schema.named_arg("env").is_some());
        Ok(())
    }
}
