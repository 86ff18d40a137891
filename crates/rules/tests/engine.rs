//! End-to-end scenarios: rules loaded from YAML, driven by adapter lines.

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use obdwatch_notify::MemorySink;
use obdwatch_rules::{
    load_rules_file, parse_rules, ConfigError, Monitor, MonitorError, RuleDef, RuleError,
};

fn monitor_with_sink() -> (Monitor, Rc<MemorySink>) {
    let sink = MemorySink::new();
    let mut monitor = Monitor::new();
    monitor.register_standard_sensors();
    monitor.set_alert_sink(sink.clone());
    (monitor, sink)
}

fn replay(monitor: &Monitor, log: &str) {
    for line in log.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let _ = monitor.ingest_response(line);
    }
}

#[test]
fn yaml_to_alert_round_trip() {
    let file = parse_rules(
        r#"
rules:
  - name: Speeding
    expression: "s010D > 120"
    sensors: ["010D"]
"#,
    )
    .unwrap();

    let (mut monitor, sink) = monitor_with_sink();
    monitor.install_rules(&file).unwrap();

    replay(&monitor, "41 0D 50\n41 0D 7F");
    assert_eq!(sink.rule_names(), vec!["Speeding"]);
}

#[test]
fn alert_fires_once_per_rising_edge() {
    let file = parse_rules(
        r#"
rules:
  - name: Speeding
    expression: "s010D > 120"
    sensors: ["010D"]
"#,
    )
    .unwrap();

    let (mut monitor, sink) = monitor_with_sink();
    monitor.install_rules(&file).unwrap();

    for speed in [100.0, 130.0, 140.0, 90.0, 125.0] {
        monitor.ingest("010D", speed).unwrap();
    }
    assert_eq!(sink.rule_names(), vec!["Speeding", "Speeding"]);
}

#[test]
fn no_alert_until_every_sensor_has_reported() {
    let file = parse_rules(
        r#"
rules:
  - name: Stalled
    expression: "s010D < 10 && s010C < 9000"
    sensors: ["010D", "010C"]
"#,
    )
    .unwrap();

    let (mut monitor, sink) = monitor_with_sink();
    monitor.install_rules(&file).unwrap();

    // Holds for the reported sensor and would hold for the 0.0 default,
    // but the rpm sensor has not reported yet.
    monitor.ingest("010D", 0.0).unwrap();
    assert!(sink.is_empty());

    monitor.ingest("010C", 750.0).unwrap();
    assert_eq!(sink.rule_names(), vec!["Stalled"]);
}

#[test]
fn earlier_reading_is_retained_for_joint_conditions() {
    let file = parse_rules(
        r#"
rules:
  - name: FastAndRevving
    expression: "s010D > 120 && s010C > 1000"
    sensors: ["010D", "010C"]
"#,
    )
    .unwrap();

    let (mut monitor, sink) = monitor_with_sink();
    monitor.install_rules(&file).unwrap();

    monitor.ingest("010D", 130.0).unwrap();
    assert!(sink.is_empty());

    // The speed reading from the earlier update still counts.
    monitor.ingest("010C", 2000.0).unwrap();
    assert_eq!(sink.rule_names(), vec!["FastAndRevving"]);
}

#[test]
fn failed_activation_leaves_no_listeners() {
    let (mut monitor, _sink) = monitor_with_sink();

    // Bypasses file validation to exercise the activation checks.
    let def = RuleDef {
        name: "Mismatched".to_string(),
        expression: "s010D > 120 && s0105 > 90".to_string(),
        sensors: vec!["010D".to_string()],
        enabled: true,
    };
    let err = monitor.install_rule(&def).unwrap_err();
    assert_eq!(
        err,
        MonitorError::Rule(RuleError::UnresolvedIdentifier("s0105".into()))
    );
    assert!(monitor.rules().is_empty());
    assert_eq!(monitor.sensor("010D").unwrap().listener_count(), 0);
}

#[test]
fn disabled_rule_never_subscribes_or_alerts() {
    let file = parse_rules(
        r#"
rules:
  - name: Speeding
    expression: "s010D > 120"
    sensors: ["010D"]
    enabled: false
"#,
    )
    .unwrap();

    let (mut monitor, sink) = monitor_with_sink();
    monitor.install_rules(&file).unwrap();

    assert_eq!(monitor.sensor("010D").unwrap().listener_count(), 0);
    monitor.ingest("010D", 200.0).unwrap();
    assert!(sink.is_empty());
}

#[test]
fn file_validation_reports_suggestions() {
    let err = parse_rules(
        r#"
rules:
  - name: Speeding
    expression: "s010d > 120"
    sensors: ["010D"]
"#,
    )
    .unwrap_err();

    match err {
        ConfigError::Validation(message) => {
            assert!(message.contains("s010d"));
            assert!(message.contains("did you mean `s010D`?"));
        }
        other => panic!("expected a validation error, got {other}"),
    }
}

#[test]
fn sample_files_drive_expected_alerts() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
    let file = load_rules_file(root.join("data/rules.yml")).unwrap();
    let log = fs::read_to_string(root.join("data/drive.log")).unwrap();

    let (mut monitor, sink) = monitor_with_sink();
    monitor.install_rules(&file).unwrap();
    replay(&monitor, &log);

    assert_eq!(
        sink.rule_names(),
        vec!["Speeding", "Overheating under load", "Redline", "Speeding"]
    );
}
