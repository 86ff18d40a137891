//! YAML rule files.
//!
//! ```yaml
//! rules:
//!   - name: Speeding
//!     expression: "s010D > 120"
//!     sensors: ["010D"]
//!   - name: Redline
//!     expression: "s010C > 6500"
//!     sensors: ["010C"]
//!     enabled: false
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::validation::validate;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid rules file: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesFile {
    pub rules: Vec<RuleDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    pub name: String,
    pub expression: String,
    /// Sensor command codes the rule binds, e.g. `"010D"`.
    pub sensors: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Parse and validate a rules document.
pub fn parse_rules(yaml: &str) -> Result<RulesFile, ConfigError> {
    let file: RulesFile = serde_yaml::from_str(yaml)?;
    let report = validate(&file);
    if !report.valid {
        let joined = report
            .errors
            .iter()
            .map(|e| match &e.suggestion {
                Some(suggestion) => format!("{}: {} ({suggestion})", e.path, e.message),
                None => format!("{}: {}", e.path, e.message),
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::Validation(joined));
    }
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, "{}", warning.message);
    }
    debug!(rules = file.rules.len(), "rules file parsed");
    Ok(file)
}

/// Load and validate a rules file from disk.
pub fn load_rules_file(path: impl AsRef<Path>) -> Result<RulesFile, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_rules(&contents)
}
