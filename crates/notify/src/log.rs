use obdwatch_core::AlertSink;
use tracing::warn;

/// Sink that reports alerts through the structured log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn notify(&self, rule_name: &str) {
        warn!(rule = %rule_name, "rule alert");
    }

    fn name(&self) -> &str {
        "log"
    }
}
