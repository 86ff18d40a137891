//! Structural validation for rule files, run before any rule is built.
//!
//! Catches the mistakes that would otherwise surface as activation errors
//! with less context: identifiers that match no listed sensor, expressions
//! that do not parse, duplicate names. Unknown identifiers get a fuzzy
//! "did you mean" suggestion.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use obdwatch_core::StandardPid;

use crate::config::{RuleDef, RulesFile};
use crate::expr::{EvalexprEvaluator, ExprError, ExprEvaluator};
use crate::ident::{extract_sensor_idents, identifier_for, IDENT_PREFIX};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub fn new() -> Self {
        ValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    pub fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest candidate within edit distance 2, if any.
fn fuzzy_match<'a>(target: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut best: Option<(usize, &'a str)> = None;
    for candidate in candidates {
        let distance = levenshtein(target, candidate);
        if best.map_or(true, |(d, _)| distance < d) {
            best = Some((distance, candidate));
        }
    }
    best.filter(|(d, _)| *d <= 2).map(|(_, c)| c.to_string())
}

/// Validate a whole rules file.
pub fn validate(file: &RulesFile) -> ValidationResult {
    let mut result = ValidationResult::new();
    if file.rules.is_empty() {
        result.warn("rules", "no rules defined");
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (idx, def) in file.rules.iter().enumerate() {
        let path = format!("rules[{idx}]");
        if !def.name.is_empty() && !seen.insert(def.name.as_str()) {
            result.error(
                format!("{path}.name"),
                format!("duplicate rule name `{}`", def.name),
            );
        }
        validate_def(def, &path, &mut result);
    }
    result
}

fn validate_def(def: &RuleDef, path: &str, result: &mut ValidationResult) {
    if def.name.is_empty() {
        result.error(format!("{path}.name"), "rule name must not be empty");
    }
    if def.expression.is_empty() {
        result.error(format!("{path}.expression"), "expression must not be empty");
    }
    if def.sensors.is_empty() {
        result.error(
            format!("{path}.sensors"),
            "at least one sensor command is required",
        );
    }

    let mut commands: Vec<String> = Vec::new();
    for command in &def.sensors {
        let normalized = command.to_ascii_uppercase();
        if commands.contains(&normalized) {
            result.error(
                format!("{path}.sensors"),
                format!("duplicate sensor command `{command}`"),
            );
            continue;
        }
        if StandardPid::from_command(&normalized).is_none() {
            result.warn(
                format!("{path}.sensors"),
                format!("`{command}` is not a catalogued mode 01 PID"),
            );
        }
        commands.push(normalized);
    }

    if def.expression.is_empty() {
        return;
    }

    let identifiers: Vec<String> = commands.iter().map(|c| identifier_for(c)).collect();
    let ident_refs: Vec<&str> = identifiers.iter().map(String::as_str).collect();
    let expr_path = format!("{path}.expression");

    let mut reported: HashSet<&str> = HashSet::new();
    for ident in extract_sensor_idents(&def.expression) {
        if ident_refs.contains(&ident) || !reported.insert(ident) {
            continue;
        }
        let message = format!("identifier `{ident}` matches no listed sensor");
        match fuzzy_match(ident, ident_refs.iter().copied()) {
            Some(close) => {
                result.error_with_suggestion(&expr_path, message, format!("did you mean `{close}`?"))
            }
            None => result.error(&expr_path, message),
        }
    }

    match EvalexprEvaluator.preflight(&def.expression, &ident_refs) {
        Ok(()) => {}
        Err(ExprError::Parse(reason)) => {
            result.error(&expr_path, format!("expression does not parse: {reason}"));
        }
        Err(ExprError::UnknownIdentifier(ident)) => {
            // Prefixed identifiers were already reported above.
            if !ident.starts_with(IDENT_PREFIX) {
                result.error(&expr_path, format!("unknown identifier `{ident}`"));
            }
        }
        Err(ExprError::Eval(reason)) => {
            result.error(&expr_path, reason);
        }
    }

    let referenced = extract_sensor_idents(&def.expression);
    for (command, identifier) in commands.iter().zip(&identifiers) {
        if !referenced.contains(&identifier.as_str()) {
            result.warn(
                format!("{path}.sensors"),
                format!("sensor `{command}` is never referenced by the expression"),
            );
        }
    }
}
