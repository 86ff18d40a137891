use thiserror::Error;

use crate::expr::ExprError;

/// Failures detected while configuring or activating a rule.
///
/// Activation reports the first failure it finds and leaves the rule
/// inactive with no subscriptions established.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// A sensor handle was already dead when it was registered, or went
    /// dead before activation.
    #[error("sensor reference is no longer valid")]
    InvalidReference,

    #[error("rule expression is empty")]
    EmptyRule,

    /// The expression names a sensor identifier that no bound sensor
    /// provides.
    #[error("identifier `{0}` does not match any bound sensor")]
    UnresolvedIdentifier(String),

    /// The evaluator rejected the expression text itself.
    #[error("expression cannot be evaluated: {0}")]
    UnevaluableExpression(String),
}

impl From<ExprError> for RuleError {
    fn from(err: ExprError) -> Self {
        match err {
            ExprError::UnknownIdentifier(ident) => RuleError::UnresolvedIdentifier(ident),
            ExprError::Parse(reason) | ExprError::Eval(reason) => {
                RuleError::UnevaluableExpression(reason)
            }
        }
    }
}
