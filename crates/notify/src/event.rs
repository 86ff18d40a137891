use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raised alert, timestamped at delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule: String,
    pub at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn now(rule: impl Into<String>) -> Self {
        AlertEvent {
            rule: rule.into(),
            at: Utc::now(),
        }
    }
}
