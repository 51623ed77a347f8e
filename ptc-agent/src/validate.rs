//! Validating a `(return v)` value against the agent's configured
//! return signature, if any.

use ptc_runtime::Value;

/// Checked against every `return` value before a run is allowed to
/// terminate successfully.
pub trait ReturnValidator: Send + Sync {
    /// `Ok(())` if `value` satisfies the signature; `Err(message)`
    /// otherwise, shown back to the LLM verbatim.
    fn validate(&self, value: &Value) -> Result<(), String>;
}

/// Accepts any return value. The default when no signature is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidator;

impl ReturnValidator for NoValidator {
    fn validate(&self, _value: &Value) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_validator_accepts_anything() {
        assert!(NoValidator.validate(&Value::Nil).is_ok());
    }
}
