//! Edge-triggered rule engine over live OBD-II sensor values.
//!
//! The pieces, bottom up:
//!
//! - [`ident`]: the `s<command>` identifier scheme rule expressions use to
//!   refer to sensors.
//! - [`expr`]: identifier slots plus the pluggable expression backend.
//! - [`rule`]: the rule itself. Activation validates everything before a
//!   single subscription is made; afterwards every sensor update triggers a
//!   re-evaluation, with one alert per `false -> true` transition.
//! - [`monitor`]: owns the sensor channels and installed rules, routes raw
//!   adapter responses to the right channel.
//! - [`config`] and [`validation`]: YAML rule files with a pre-build
//!   validation pass.

pub mod config;
pub mod error;
pub mod expr;
pub mod ident;
pub mod monitor;
pub mod rule;
pub mod validation;

pub use config::{load_rules_file, parse_rules, ConfigError, RuleDef, RulesFile};
pub use error::RuleError;
pub use expr::{EvalexprEvaluator, ExprError, ExprEvaluator, ExpressionBinding};
pub use monitor::{Monitor, MonitorError};
pub use rule::{Rule, SensorBinding, SharedRule};
pub use validation::{validate, ValidationResult};
