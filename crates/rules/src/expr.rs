//! Expression evaluation seam.
//!
//! [`ExpressionBinding`] owns the identifier slots a rule exposes to its
//! expression and delegates parsing and evaluation to an [`ExprEvaluator`].
//! The default backend is [`evalexpr`]; swapping in another grammar only
//! means implementing the trait.

use indexmap::IndexMap;
use thiserror::Error;

use evalexpr::{
    build_operator_tree, ContextWithMutableVariables, HashMapContext, Value,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("evaluation failed: {0}")]
    Eval(String),
}

/// Boolean expression backend.
pub trait ExprEvaluator {
    /// Check that `text` parses and references only `identifiers`.
    ///
    /// Must not depend on any current slot values; it is run before a rule
    /// subscribes to anything.
    fn preflight(&self, text: &str, identifiers: &[&str]) -> Result<(), ExprError>;

    /// Evaluate `text` to a boolean against the given bindings.
    fn eval_bool(&self, text: &str, bindings: &IndexMap<String, f64>) -> Result<bool, ExprError>;
}

/// [`evalexpr`]-backed evaluator.
///
/// All slots are published as floats. `evalexpr` compares floats and
/// integers across types for ordering operators but not for `==`, so rule
/// expressions should prefer `>=` / `<=` over exact equality against
/// integer literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvalexprEvaluator;

impl ExprEvaluator for EvalexprEvaluator {
    fn preflight(&self, text: &str, identifiers: &[&str]) -> Result<(), ExprError> {
        let node = build_operator_tree(text).map_err(|e| ExprError::Parse(e.to_string()))?;
        for ident in node.iter_variable_identifiers() {
            if !identifiers.contains(&ident) {
                return Err(ExprError::UnknownIdentifier(ident.to_string()));
            }
        }
        Ok(())
    }

    fn eval_bool(&self, text: &str, bindings: &IndexMap<String, f64>) -> Result<bool, ExprError> {
        let node = build_operator_tree(text).map_err(|e| ExprError::Parse(e.to_string()))?;
        let mut ctx = HashMapContext::new();
        for (ident, value) in bindings {
            ctx.set_value(ident.clone(), Value::Float(*value))
                .map_err(|e| ExprError::Eval(e.to_string()))?;
        }
        node.eval_boolean_with_context(&ctx)
            .map_err(|e| ExprError::Eval(e.to_string()))
    }
}

/// Identifier slots for one rule, in registration order.
pub struct ExpressionBinding {
    slots: IndexMap<String, f64>,
    evaluator: Box<dyn ExprEvaluator>,
}

impl ExpressionBinding {
    pub fn new() -> Self {
        Self::with_evaluator(Box::new(EvalexprEvaluator))
    }

    pub fn with_evaluator(evaluator: Box<dyn ExprEvaluator>) -> Self {
        Self {
            slots: IndexMap::new(),
            evaluator,
        }
    }

    /// Ensure a slot exists for `identifier`, initialised to 0.0.
    ///
    /// Re-registering keeps the current value.
    pub fn register(&mut self, identifier: &str) {
        self.slots.entry(identifier.to_string()).or_insert(0.0);
    }

    pub fn set(&mut self, identifier: &str, value: f64) {
        self.slots.insert(identifier.to_string(), value);
    }

    pub fn value(&self, identifier: &str) -> Option<f64> {
        self.slots.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.slots.contains_key(identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Pre-flight `text` against the registered identifiers.
    pub fn can_evaluate(&self, text: &str) -> Result<(), ExprError> {
        let idents: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        self.evaluator.preflight(text, &idents)
    }

    /// Evaluate `text` against the current slot values.
    pub fn evaluate(&self, text: &str) -> Result<bool, ExprError> {
        self.evaluator.eval_bool(text, &self.slots)
    }
}

impl Default for ExpressionBinding {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_slots_at_zero() {
        let mut binding = ExpressionBinding::new();
        binding.register("s010D");
        assert_eq!(binding.value("s010D"), Some(0.0));

        binding.set("s010D", 88.0);
        binding.register("s010D");
        assert_eq!(binding.value("s010D"), Some(88.0));
    }

    #[test]
    fn preflight_accepts_known_identifiers() {
        let mut binding = ExpressionBinding::new();
        binding.register("s010D");
        binding.register("s010C");
        assert_eq!(binding.can_evaluate("s010D > 120 && s010C > 4000"), Ok(()));
    }

    #[test]
    fn preflight_rejects_unknown_identifier() {
        let mut binding = ExpressionBinding::new();
        binding.register("s010D");
        assert_eq!(
            binding.can_evaluate("s010D > 120 && s0105 > 100"),
            Err(ExprError::UnknownIdentifier("s0105".into()))
        );
    }

    #[test]
    fn preflight_rejects_bad_syntax() {
        let binding = ExpressionBinding::new();
        assert!(matches!(
            binding.can_evaluate("s010D >"),
            Err(ExprError::Parse(_))
        ));
    }

    #[test]
    fn evaluates_against_current_slots() {
        let mut binding = ExpressionBinding::new();
        binding.register("s010D");
        assert_eq!(binding.evaluate("s010D > 120"), Ok(false));

        binding.set("s010D", 130.0);
        assert_eq!(binding.evaluate("s010D > 120"), Ok(true));
    }

    #[test]
    fn ordering_compares_floats_against_integer_literals() {
        let mut binding = ExpressionBinding::new();
        binding.register("s0105");
        binding.set("s0105", 105.0);
        assert_eq!(binding.evaluate("s0105 >= 105"), Ok(true));
        assert_eq!(binding.evaluate("s0105 < 105"), Ok(false));
    }

    #[test]
    fn non_boolean_result_is_an_eval_error() {
        let mut binding = ExpressionBinding::new();
        binding.register("s010D");
        assert!(matches!(
            binding.evaluate("s010D + 1"),
            Err(ExprError::Eval(_))
        ));
    }

    #[test]
    fn missing_binding_is_an_eval_error() {
        let binding = ExpressionBinding::new();
        assert!(matches!(
            binding.evaluate("s010D > 120"),
            Err(ExprError::Eval(_))
        ));
    }

    #[test]
    fn custom_evaluator_is_used() {
        struct AlwaysTrue;
        impl ExprEvaluator for AlwaysTrue {
            fn preflight(&self, _: &str, _: &[&str]) -> Result<(), ExprError> {
                Ok(())
            }
            fn eval_bool(&self, _: &str, _: &IndexMap<String, f64>) -> Result<bool, ExprError> {
                Ok(true)
            }
        }

        let binding = ExpressionBinding::with_evaluator(Box::new(AlwaysTrue));
        assert_eq!(binding.evaluate("anything at all"), Ok(true));
    }
}
