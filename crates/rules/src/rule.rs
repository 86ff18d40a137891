//! Edge-triggered rules over live sensor values.
//!
//! A [`Rule`] binds a boolean expression to a set of sensors. Once
//! activated it re-evaluates on every sensor update and raises a single
//! alert per `false -> true` transition. Dropping back to `false` re-arms
//! it silently.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use obdwatch_core::{AlertSink, ListenerHandle, SensorInput, SensorListener};

use crate::error::RuleError;
use crate::expr::ExpressionBinding;
use crate::ident::{command_for, extract_sensor_idents, identifier_for};

/// Shared, interiorly mutable rule handle used by sensor subscriptions.
pub type SharedRule = Rc<RefCell<Rule>>;

/// One sensor bound into a rule.
pub struct SensorBinding {
    identifier: String,
    command: String,
    handle: Weak<dyn SensorInput>,
}

impl SensorBinding {
    /// Expression identifier derived from the sensor command.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

pub struct Rule {
    name: String,
    expression: String,
    bound: Vec<SensorBinding>,
    binding: ExpressionBinding,
    satisfied: bool,
    activated: bool,
    sink: Option<Rc<dyn AlertSink>>,
}

impl Rule {
    pub fn new() -> Self {
        Rule {
            name: String::new(),
            expression: String::new(),
            bound: Vec::new(),
            binding: ExpressionBinding::new(),
            satisfied: false,
            activated: false,
            sink: None,
        }
    }

    /// Wrap the rule for sharing with sensor subscriptions.
    pub fn into_shared(self) -> SharedRule {
        Rc::new(RefCell::new(self))
    }

    pub fn set_rule_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn rule_name(&self) -> &str {
        &self.name
    }

    /// Replace the expression text. Takes effect on the next evaluation;
    /// activation checks are not re-run.
    pub fn set_rule(&mut self, expression: impl Into<String>) {
        self.expression = expression.into();
    }

    pub fn rule(&self) -> &str {
        &self.expression
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn sensors(&self) -> &[SensorBinding] {
        &self.bound
    }

    pub fn set_alert_sink(&mut self, sink: Rc<dyn AlertSink>) {
        self.sink = Some(sink);
    }

    /// Bind a sensor. The handle must be live at registration time; its
    /// identifier slot starts at 0.0 until the sensor first reports.
    pub fn add_sensor(&mut self, sensor: Weak<dyn SensorInput>) -> Result<(), RuleError> {
        let strong = sensor.upgrade().ok_or(RuleError::InvalidReference)?;
        let command = strong.command().to_string();
        let identifier = identifier_for(&command);
        self.binding.register(&identifier);
        debug!(rule = %self.name, command = %command, "sensor bound");
        self.bound.push(SensorBinding {
            identifier,
            command,
            handle: sensor,
        });
        Ok(())
    }

    pub fn validate_rule(&self) -> Result<(), RuleError> {
        if self.expression.is_empty() {
            return Err(RuleError::EmptyRule);
        }
        Ok(())
    }

    /// All activation checks, in order, with no side effects on failure.
    /// Returns the strong sensor references to subscribe against.
    fn preflight(&self) -> Result<Vec<Rc<dyn SensorInput>>, RuleError> {
        self.validate_rule()?;

        let mut channels = Vec::with_capacity(self.bound.len());
        for binding in &self.bound {
            channels.push(
                binding
                    .handle
                    .upgrade()
                    .ok_or(RuleError::InvalidReference)?,
            );
        }

        for ident in extract_sensor_idents(&self.expression) {
            let matched = command_for(ident)
                .map(|command| self.bound.iter().any(|b| b.command == command))
                .unwrap_or(false);
            if !matched {
                return Err(RuleError::UnresolvedIdentifier(ident.to_string()));
            }
        }

        self.binding.can_evaluate(&self.expression)?;
        Ok(channels)
    }

    /// Run the activation checks and subscribe to every bound sensor.
    ///
    /// Checks run strictly before any subscription, so a failed activation
    /// leaves no callbacks behind. Activating an already active rule is a
    /// no-op; the underlying subscriptions are deduplicated per handle
    /// either way.
    pub fn activate(rule: &SharedRule) -> Result<(), RuleError> {
        let channels = {
            let r = rule.borrow();
            if r.activated {
                debug!(rule = %r.name, "rule already active");
                return Ok(());
            }
            r.preflight()?
        };

        let weak: Weak<RefCell<Rule>> = Rc::downgrade(rule);
        let listener: ListenerHandle = weak;
        for channel in &channels {
            channel.subscribe(listener.clone());
        }

        let mut r = rule.borrow_mut();
        r.activated = true;
        info!(rule = %r.name, sensors = channels.len(), "rule activated");
        Ok(())
    }

    /// Unsubscribe from all bound sensors and mark the rule inactive.
    pub fn deactivate(rule: &SharedRule) {
        let weak: Weak<RefCell<Rule>> = Rc::downgrade(rule);
        let listener: ListenerHandle = weak;
        let mut r = rule.borrow_mut();
        if !r.activated {
            return;
        }
        for binding in &r.bound {
            if let Some(channel) = binding.handle.upgrade() {
                channel.unsubscribe(&listener);
            }
        }
        r.activated = false;
        debug!(rule = %r.name, "rule deactivated");
    }

    /// Re-evaluate the rule against current slot values.
    ///
    /// Until every bound sensor has reported at least once this returns a
    /// vacuous `true` without touching satisfaction state. An evaluation
    /// fault is logged and treated as `false`, so a broken expression can
    /// never raise an alert.
    pub fn check_if_satisfied(&mut self) -> bool {
        for binding in &self.bound {
            match binding.handle.upgrade() {
                Some(sensor) => {
                    if sensor.update_count() == 0 {
                        debug!(
                            rule = %self.name,
                            command = %binding.command,
                            "sensor has not reported yet, skipping evaluation"
                        );
                        return true;
                    }
                }
                None => {
                    warn!(
                        rule = %self.name,
                        command = %binding.command,
                        "bound sensor is gone, keeping previous result"
                    );
                    return self.satisfied;
                }
            }
        }

        let holds = match self.binding.evaluate(&self.expression) {
            Ok(holds) => holds,
            Err(err) => {
                warn!(
                    rule = %self.name,
                    error = %err,
                    "evaluation failed, treating rule as not satisfied"
                );
                false
            }
        };

        if holds && !self.satisfied {
            self.satisfied = true;
            info!(rule = %self.name, "rule satisfied");
            if let Some(sink) = &self.sink {
                sink.notify(&self.name);
            }
        } else if !holds {
            self.satisfied = false;
        }
        self.satisfied
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("expression", &self.expression)
            .field("satisfied", &self.satisfied)
            .field("activated", &self.activated)
            .finish_non_exhaustive()
    }
}

impl SensorListener for Rule {
    fn on_sensor_update(&mut self, command: &str, value: f64) {
        let Some(idx) = self.bound.iter().position(|b| b.command == command) else {
            debug!(rule = %self.name, command, "update for unbound command ignored");
            return;
        };
        let identifier = &self.bound[idx].identifier;
        self.binding.set(identifier, value);
        self.check_if_satisfied();
    }
}
