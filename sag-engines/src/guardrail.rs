//! Guardrail validation
//!
//! An action's `BECAUSE` clause may carry a precondition expression. The
//! guardrail evaluates it against a caller-supplied context and rejects the
//! action when it does not hold.

use sag_core::{reason_is_expression, ActionStatement, Context, GuardrailViolation, Value};
use sag_dsl::evaluate;

pub struct GuardrailValidator;

impl GuardrailValidator {
    /// Check an action's reason expression against the context.
    ///
    /// Free-text reasons and absent reasons pass. A boolean result must be
    /// true; a non-boolean result passes when it is non-null.
    pub fn validate(
        action: &ActionStatement,
        context: &dyn Context,
    ) -> Result<(), GuardrailViolation> {
        let reason = match &action.reason {
            Some(r) if !r.trim().is_empty() => r,
            _ => return Ok(()),
        };

        if !reason_is_expression(reason) {
            return Ok(());
        }

        let result = evaluate(reason, context)?;
        match result {
            Value::Bool(true) => Ok(()),
            Value::Bool(false) => Err(GuardrailViolation::PreconditionFailed {
                reason: reason.clone(),
            }),
            Value::Null => Err(GuardrailViolation::PreconditionFailed {
                reason: "expression evaluated to null".to_string(),
            }),
            _ => Ok(()),
        }
    }
}
