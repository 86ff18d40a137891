//! The monitor owns the sensor channels and the installed rules.

use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info};

use obdwatch_core::{
    parse_response, AlertSink, FrameError, SensorChannel, SensorSpec, StandardPid,
};

use crate::config::{RuleDef, RulesFile};
use crate::error::RuleError;
use crate::rule::{Rule, SharedRule};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("no registered sensor for command `{0}`")]
    UnknownSensor(String),

    #[error("a rule named `{0}` is already installed")]
    DuplicateRule(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Sensor registry plus installed rules.
///
/// Channels are keyed by their uppercase command code. Rules installed
/// through the monitor are wired to the registered channels and, when a
/// sink is configured, to the alert sink.
pub struct Monitor {
    sensors: IndexMap<String, Rc<SensorChannel>>,
    rules: Vec<SharedRule>,
    sink: Option<Rc<dyn AlertSink>>,
}

impl Monitor {
    pub fn new() -> Self {
        Monitor {
            sensors: IndexMap::new(),
            rules: Vec::new(),
            sink: None,
        }
    }

    /// Sink handed to rules installed after this call.
    pub fn set_alert_sink(&mut self, sink: Rc<dyn AlertSink>) {
        self.sink = Some(sink);
    }

    /// Register a channel for `spec`, or return the existing one for the
    /// same command.
    pub fn register_sensor(&mut self, spec: SensorSpec) -> Rc<SensorChannel> {
        let command = spec.command().to_string();
        self.sensors
            .entry(command)
            .or_insert_with(|| SensorChannel::new(spec))
            .clone()
    }

    /// Register a channel for every catalogued mode 01 PID.
    pub fn register_standard_sensors(&mut self) {
        for pid in StandardPid::ALL {
            self.register_sensor(SensorSpec::standard(pid));
        }
        debug!(sensors = self.sensors.len(), "standard sensors registered");
    }

    pub fn sensor(&self, command: &str) -> Option<&Rc<SensorChannel>> {
        self.sensors.get(&command.to_ascii_uppercase())
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn rules(&self) -> &[SharedRule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<SharedRule> {
        self.rules
            .iter()
            .find(|r| r.borrow().rule_name() == name)
            .cloned()
    }

    /// Build, wire and (unless disabled) activate a rule from its
    /// definition. A failed install leaves the monitor unchanged.
    pub fn install_rule(&mut self, def: &RuleDef) -> Result<SharedRule, MonitorError> {
        if self.rules.iter().any(|r| r.borrow().rule_name() == def.name) {
            return Err(MonitorError::DuplicateRule(def.name.clone()));
        }

        let mut rule = Rule::new();
        rule.set_rule_name(&def.name);
        rule.set_rule(&def.expression);
        if let Some(sink) = &self.sink {
            rule.set_alert_sink(sink.clone());
        }
        for command in &def.sensors {
            let channel = self
                .sensor(command)
                .ok_or_else(|| MonitorError::UnknownSensor(command.clone()))?;
            rule.add_sensor(channel.input_handle())?;
        }

        let rule = rule.into_shared();
        if def.enabled {
            Rule::activate(&rule)?;
        } else {
            debug!(rule = %def.name, "rule disabled, left inactive");
        }
        self.rules.push(rule.clone());
        Ok(rule)
    }

    /// Install every rule in the file. On the first failure the rules
    /// installed by this call are deactivated and removed again.
    pub fn install_rules(&mut self, file: &RulesFile) -> Result<usize, MonitorError> {
        let before = self.rules.len();
        for def in &file.rules {
            if let Err(err) = self.install_rule(def) {
                for rule in self.rules.split_off(before) {
                    Rule::deactivate(&rule);
                }
                return Err(err);
            }
        }
        info!(rules = file.rules.len(), "rules installed");
        Ok(file.rules.len())
    }

    /// Deactivate and drop the named rule.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        let Some(idx) = self
            .rules
            .iter()
            .position(|r| r.borrow().rule_name() == name)
        else {
            return false;
        };
        let rule = self.rules.remove(idx);
        Rule::deactivate(&rule);
        true
    }

    /// Feed a decoded value into the channel for `command`.
    pub fn ingest(&self, command: &str, value: f64) -> Result<(), MonitorError> {
        let channel = self
            .sensor(command)
            .ok_or_else(|| MonitorError::UnknownSensor(command.to_string()))?;
        channel.publish(value);
        Ok(())
    }

    /// Parse one adapter response line, decode it and publish the reading.
    /// Returns the command and decoded value.
    pub fn ingest_response(&self, line: &str) -> Result<(String, f64), MonitorError> {
        let frame = parse_response(line)?;
        let command = frame.command();
        let channel = self
            .sensor(&command)
            .ok_or_else(|| MonitorError::UnknownSensor(command.clone()))?;
        let value = channel.publish_response(&frame)?;
        Ok((command, value))
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, expression: &str, sensors: &[&str]) -> RuleDef {
        RuleDef {
            name: name.to_string(),
            expression: expression.to_string(),
            sensors: sensors.iter().map(|s| s.to_string()).collect(),
            enabled: true,
        }
    }

    #[test]
    fn register_sensor_is_idempotent_per_command() {
        let mut monitor = Monitor::new();
        let first = monitor.register_sensor(SensorSpec::standard(StandardPid::VehicleSpeed));
        let again = monitor.register_sensor(SensorSpec::standard(StandardPid::VehicleSpeed));
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(monitor.sensor_count(), 1);
    }

    #[test]
    fn install_wires_rule_to_channels() {
        let mut monitor = Monitor::new();
        monitor.register_standard_sensors();

        let rule = monitor
            .install_rule(&def("Speeding", "s010D > 120", &["010D"]))
            .unwrap();
        assert!(rule.borrow().is_activated());

        monitor.ingest("010D", 130.0).unwrap();
        assert!(rule.borrow().is_satisfied());
    }

    #[test]
    fn install_rejects_unknown_sensor() {
        let mut monitor = Monitor::new();
        let err = monitor
            .install_rule(&def("Speeding", "s010D > 120", &["010D"]))
            .unwrap_err();
        assert_eq!(err, MonitorError::UnknownSensor("010D".into()));
        assert!(monitor.rules().is_empty());
    }

    #[test]
    fn install_rejects_duplicate_name() {
        let mut monitor = Monitor::new();
        monitor.register_standard_sensors();

        monitor
            .install_rule(&def("Speeding", "s010D > 120", &["010D"]))
            .unwrap();
        let err = monitor
            .install_rule(&def("Speeding", "s010D > 150", &["010D"]))
            .unwrap_err();
        assert_eq!(err, MonitorError::DuplicateRule("Speeding".into()));
        assert_eq!(monitor.rules().len(), 1);
    }

    #[test]
    fn disabled_rule_is_installed_inactive() {
        let mut monitor = Monitor::new();
        monitor.register_standard_sensors();

        let mut definition = def("Speeding", "s010D > 120", &["010D"]);
        definition.enabled = false;
        let rule = monitor.install_rule(&definition).unwrap();
        assert!(!rule.borrow().is_activated());

        monitor.ingest("010D", 130.0).unwrap();
        assert!(!rule.borrow().is_satisfied());
    }

    #[test]
    fn failed_batch_install_rolls_back() {
        let mut monitor = Monitor::new();
        monitor.register_standard_sensors();

        let file = RulesFile {
            rules: vec![
                def("Good", "s010D > 120", &["010D"]),
                def("Bad", "s0199 > 0", &["0199"]),
            ],
        };
        let err = monitor.install_rules(&file).unwrap_err();
        assert_eq!(err, MonitorError::UnknownSensor("0199".into()));
        assert!(monitor.rules().is_empty());
        // The rolled back rule no longer listens.
        assert_eq!(monitor.sensor("010D").unwrap().listener_count(), 0);
    }

    #[test]
    fn remove_rule_unsubscribes() {
        let mut monitor = Monitor::new();
        monitor.register_standard_sensors();

        monitor
            .install_rule(&def("Speeding", "s010D > 120", &["010D"]))
            .unwrap();
        assert_eq!(monitor.sensor("010D").unwrap().listener_count(), 1);

        assert!(monitor.remove_rule("Speeding"));
        assert!(!monitor.remove_rule("Speeding"));
        assert_eq!(monitor.sensor("010D").unwrap().listener_count(), 0);
    }

    #[test]
    fn ingest_response_routes_to_channel() {
        let mut monitor = Monitor::new();
        monitor.register_standard_sensors();

        let rule = monitor
            .install_rule(&def("Redline", "s010C > 4000", &["010C"]))
            .unwrap();

        let (command, value) = monitor.ingest_response("41 0C 4E 20").unwrap();
        assert_eq!(command, "010C");
        assert_eq!(value, 5000.0);
        assert!(rule.borrow().is_satisfied());
    }

    #[test]
    fn ingest_response_rejects_unknown_command() {
        let monitor = Monitor::new();
        let err = monitor.ingest_response("41 0C 4E 20").unwrap_err();
        assert_eq!(err, MonitorError::UnknownSensor("010C".into()));
    }

    #[test]
    fn lowercase_lookup_finds_channel() {
        let mut monitor = Monitor::new();
        monitor.register_standard_sensors();
        assert!(monitor.sensor("010d").is_some());
        monitor.ingest("010d", 42.0).unwrap();
        assert_eq!(monitor.sensor("010D").unwrap().value(), 42.0);
    }
}
