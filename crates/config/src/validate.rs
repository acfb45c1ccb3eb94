//! Configuration validation.
//!
//! Flags unknown or misspelled keys, type errors and values the client
//! cannot work with (bad URLs, a zero timeout).

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{
    env_subst::substitute_env,
    loader::{find_config_file, parse_config_value},
    schema::FiMoneyConfig,
};

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
    /// "syntax", "unknown-field", "type-error", "invalid-value" or "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "gateway.base_url"
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

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

const GATEWAY_KEYS: &[&str] = &["base_url", "timeout_secs"];
const SESSION_KEYS: &[&str] = &["server_url", "status_poll_secs"];
const DASHBOARD_KEYS: &[&str] = &["suggested_queries"];

/// Known sections, in suggestion order, and the keys each accepts.
const SECTIONS: &[(&str, &[&str])] = &[
    ("gateway", GATEWAY_KEYS),
    ("session", SESSION_KEYS),
    ("dashboard", DASHBOARD_KEYS),
];

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut curr = Vec::with_capacity(b.len() + 1);
        curr.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != *cb);
            curr.push(substitute.min(prev[j + 1] + 1).min(curr[j] + 1));
        }
        prev = curr;
    }
    prev[b.len()]
}

/// Closest candidate within an edit distance of 3.
fn suggest<'a>(needle: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| (1..=3).contains(d))
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

fn unknown_field(path: String, candidates: &[&str], key: &str) -> Diagnostic {
    let message = match suggest(key, candidates) {
        Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
        None => "unknown field".to_string(),
    };
    Diagnostic::new(Severity::Error, "unknown-field", path, message)
}

/// Validate the config file at `path`, or the discovered one when `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let Some(config_path) = path.map(Path::to_path_buf).or_else(|| find_config_file(None)) else {
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

    let mut result = match std::fs::read_to_string(&config_path) {
        Ok(raw) => validate_str(&raw, &config_path),
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
    result.config_path = Some(config_path);
    result
}

/// Validate raw config text; the format is taken from `path`'s extension.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value = match parse_config_value(&substitute_env(raw), path) {
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

    match serde_json::from_value::<FiMoneyConfig>(value) {
        Ok(config) => check_values(&config, &mut diagnostics),
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
    let Value::Object(root) = value else {
        return;
    };
    let sections: Vec<&str> = SECTIONS.iter().map(|(name, _)| *name).collect();

    for (section, body) in root {
        let Some((_, fields)) = SECTIONS.iter().find(|(name, _)| *name == section.as_str()) else {
            diagnostics.push(unknown_field(section.clone(), &sections, section));
            continue;
        };
        if let Value::Object(table) = body {
            for key in table.keys() {
                if !fields.contains(&key.as_str()) {
                    diagnostics.push(unknown_field(format!("{section}.{key}"), fields, key));
                }
            }
        }
    }
}

fn check_url(path: &str, raw: &str, diagnostics: &mut Vec<Diagnostic>) {
    let problem = match url::Url::parse(raw.trim()) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => return,
        Ok(u) => format!("unsupported scheme '{}'", u.scheme()),
        Err(e) => e.to_string(),
    };
    diagnostics.push(Diagnostic::new(
        Severity::Error,
        "invalid-value",
        path,
        format!("invalid url \"{raw}\": {problem}"),
    ));
}

fn check_values(config: &FiMoneyConfig, diagnostics: &mut Vec<Diagnostic>) {
    check_url("gateway.base_url", &config.gateway.base_url, diagnostics);
    check_url("session.server_url", &config.session.server_url, diagnostics);

    if config.gateway.timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "invalid-value",
            "gateway.timeout_secs",
            "timeout must be at least 1 second",
        ));
    }
    if (1..5).contains(&config.session.status_poll_secs) {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "invalid-value",
            "session.status_poll_secs",
            "polling more often than every 5 seconds puts load on the gateway",
        ));
    }
    for (i, query) in config.dashboard.suggested_queries.iter().enumerate() {
        if query.trim().is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "invalid-value",
                format!("dashboard.suggested_queries[{i}]"),
                "blank suggestion is never sent",
            ));
        }
    }
}
