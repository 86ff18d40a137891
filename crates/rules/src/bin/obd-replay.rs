//! Replay a recorded adapter log against a rules file.
//!
//! Reads one adapter response per line, feeds each decoded reading into
//! the monitor and prints the alerts raised during the drive.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use obdwatch_core::SensorSpec;
use obdwatch_notify::{FanoutSink, JsonlSink, LogSink, MemorySink};
use obdwatch_rules::{load_rules_file, Monitor, MonitorError, RulesFile};

#[derive(Parser, Debug)]
#[command(
    name = "obd-replay",
    about = "Replay a recorded OBD-II adapter log against a rules file"
)]
struct Cli {
    /// Rules file (YAML)
    #[arg(long, env = "OBDWATCH_RULES", default_value = "data/rules.yml")]
    rules: PathBuf,

    /// Recorded adapter responses, one per line
    #[arg(long, env = "OBDWATCH_LOG", default_value = "data/drive.log")]
    log: PathBuf,

    /// Append raised alerts as JSONL to this file
    #[arg(long)]
    alerts_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let file = load_rules_file(&cli.rules)
        .with_context(|| format!("loading rules from {}", cli.rules.display()))?;

    let alerts = MemorySink::new();
    let mut fanout = FanoutSink::new();
    fanout.attach(Rc::new(LogSink));
    fanout.attach(alerts.clone());
    if let Some(path) = &cli.alerts_out {
        let journal = JsonlSink::create(path)
            .with_context(|| format!("opening alert journal {}", path.display()))?;
        fanout.attach(Rc::new(journal));
    }

    let mut monitor = Monitor::new();
    monitor.register_standard_sensors();
    register_custom_sensors(&mut monitor, &file);
    monitor.set_alert_sink(Rc::new(fanout));
    let installed = monitor.install_rules(&file)?;
    info!(rules = installed, sensors = monitor.sensor_count(), "monitor ready");

    let reader = BufReader::new(
        File::open(&cli.log).with_context(|| format!("opening log {}", cli.log.display()))?,
    );

    let mut readings = 0usize;
    let mut skipped = 0usize;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match apply_line(&monitor, &line) {
            Ok((command, value)) => {
                readings += 1;
                debug!(line = number + 1, command = %command, value, "reading applied");
            }
            Err(MonitorError::Frame(err)) => {
                skipped += 1;
                debug!(line = number + 1, error = %err, "line skipped");
            }
            Err(err) => {
                skipped += 1;
                warn!(line = number + 1, error = %err, "reading not applied");
            }
        }
    }

    info!(readings, skipped, alerts = alerts.len(), "replay finished");
    for event in alerts.events() {
        println!("{}  {}", event.at.to_rfc3339(), event.rule);
    }
    println!();
    let raised = alerts.rule_names();
    for rule in monitor.rules() {
        let rule = rule.borrow();
        let count = raised.iter().filter(|name| *name == rule.rule_name()).count();
        println!(
            "{:<30} alerts {:>3}   satisfied {}",
            rule.rule_name(),
            count,
            rule.is_satisfied()
        );
    }
    Ok(())
}

/// Channels for commands the rules file lists but the catalog lacks.
/// Custom channels take `<command> <value>` pairs, not raw frames.
fn register_custom_sensors(monitor: &mut Monitor, file: &RulesFile) {
    for def in &file.rules {
        for command in &def.sensors {
            if monitor.sensor(command).is_none() {
                monitor.register_sensor(SensorSpec::custom(
                    command.to_ascii_uppercase(),
                    format!("Custom sensor {command}"),
                    "",
                ));
            }
        }
    }
}

/// A log line is either a raw adapter frame (`41 0D 7F`) or a
/// `<command> <value>` pair (`0C00 1726`). Frames take precedence.
fn apply_line(monitor: &Monitor, line: &str) -> Result<(String, f64), MonitorError> {
    match monitor.ingest_response(line) {
        Ok(applied) => Ok(applied),
        Err(MonitorError::Frame(frame_err)) => match parse_pair(line) {
            Some((command, value)) => {
                monitor.ingest(&command, value)?;
                Ok((command.to_ascii_uppercase(), value))
            }
            None => Err(MonitorError::Frame(frame_err)),
        },
        Err(err) => Err(err),
    }
}

fn parse_pair(line: &str) -> Option<(String, f64)> {
    let mut tokens = line.split_whitespace();
    let command = tokens.next()?;
    let value: f64 = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Some((command.to_string(), value))
}
