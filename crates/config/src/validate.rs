//! Configuration validation.
//!
//! Detects syntax errors, unknown or misspelled keys, type mismatches, and
//! settings that would keep the relay from starting.

use std::path::Path;

use serde_json::Value;

use crate::{env_subst::substitute_env, schema::SlackbaseConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "missing", "value", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "slack.bot_token"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

const SECTIONS: &[(&str, &[&str])] = &[
    ("slack", &["bot_token", "app_token", "user_token"]),
    ("keybase", &["binary", "team", "timeout_secs"]),
    ("sync", &["enabled", "initial_count", "channels"]),
    ("display", &["timezone"]),
];

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

fn unknown_key(path: String, key: &str, candidates: &[&str]) -> Diagnostic {
    let message = match suggest(key, candidates, 3) {
        Some(hint) => format!("unknown field \"{key}\" (did you mean \"{hint}\"?)"),
        None => format!("unknown field \"{key}\""),
    };
    Diagnostic::new(Severity::Warning, "unknown-field", path, message)
}

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) => {
            let ext = actual_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("toml");
            validate_str(&substitute_env(&content), ext)
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate raw config text in the format named by `ext`.
#[must_use]
pub fn validate_str(raw: &str, ext: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let parsed: Result<Value, String> = match ext {
        "toml" => toml::from_str(raw).map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        "json" => serde_json::from_str(raw).map_err(|e| e.to_string()),
        other => Err(format!("unsupported config format: .{other}")),
    };
    let value = match parsed {
        Ok(Value::Null) => Value::Object(serde_json::Map::new()),
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &mut diagnostics);

    match serde_json::from_value::<SlackbaseConfig>(value) {
        Ok(config) => diagnostics.extend(check_config(&config)),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(value: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(root) = value.as_object() else {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            "config root must be a table",
        ));
        return;
    };
    let section_names: Vec<&str> = SECTIONS.iter().map(|(name, _)| *name).collect();

    for (key, section) in root {
        let Some((_, fields)) = SECTIONS.iter().find(|(name, _)| name == key) else {
            diagnostics.push(unknown_key(key.clone(), key, &section_names));
            continue;
        };
        let Some(table) = section.as_object() else {
            continue;
        };
        for field in table.keys() {
            if !fields.contains(&field.as_str()) {
                diagnostics.push(unknown_key(format!("{key}.{field}"), field, fields));
            }
        }
    }
}

/// Semantic checks on a parsed config.
#[must_use]
pub fn check_config(config: &SlackbaseConfig) -> Vec<Diagnostic> {
    use secrecy::ExposeSecret;

    let mut diagnostics = Vec::new();

    for (path, token, prefix) in [
        ("slack.bot_token", &config.slack.bot_token, "xoxb-"),
        ("slack.app_token", &config.slack.app_token, "xapp-"),
    ] {
        let token = token.expose_secret();
        if token.is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "missing",
                path,
                "token is required",
            ));
        } else if token.contains("${") {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "missing",
                path,
                "environment placeholder was not resolved",
            ));
        } else if !token.starts_with(prefix) {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "value",
                path,
                format!("expected a token starting with \"{prefix}\""),
            ));
        }
    }

    if config.keybase.binary.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "keybase.binary",
            "binary must not be empty",
        ));
    }
    if config.keybase.timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "keybase.timeout_secs",
            "timeout must be greater than zero",
        ));
    }
    if config.keybase.team.is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "value",
            "keybase.team",
            "team not set; the Slack workspace domain is used",
        ));
    }

    if config.sync.initial_count == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "value",
            "sync.initial_count",
            "empty destination channels receive no history",
        ));
    }

    if config.display.tz().is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "value",
            "display.timezone",
            format!("unknown time zone \"{}\"", config.display.timezone),
        ));
    }

    diagnostics
}
