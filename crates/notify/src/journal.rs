use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use obdwatch_core::AlertSink;

use crate::event::AlertEvent;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only JSONL journal, one alert per line, flushed per alert.
///
/// Delivery failures are logged and swallowed so a full disk cannot stall
/// rule evaluation.
pub struct JsonlSink {
    path: PathBuf,
    writer: RefCell<BufWriter<File>>,
}

impl JsonlSink {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(JsonlSink {
            path,
            writer: RefCell::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &AlertEvent) -> Result<(), SinkError> {
        let mut writer = self.writer.borrow_mut();
        serde_json::to_writer(&mut *writer, event)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl AlertSink for JsonlSink {
    fn notify(&self, rule_name: &str) {
        let event = AlertEvent::now(rule_name);
        if let Err(err) = self.append(&event) {
            warn!(
                path = %self.path.display(),
                error = %err,
                "failed to journal alert"
            );
        }
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn writes_one_json_line_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.jsonl");

        let sink = JsonlSink::create(&path).unwrap();
        sink.notify("Speeding");
        sink.notify("Redline");

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AlertEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.rule, "Speeding");
        let second: AlertEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.rule, "Redline");
    }

    #[test]
    fn appends_to_an_existing_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.jsonl");

        JsonlSink::create(&path).unwrap().notify("First");
        JsonlSink::create(&path).unwrap().notify("Second");

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
