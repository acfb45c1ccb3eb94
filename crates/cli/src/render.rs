//! Plain-text rendering of dashboard state for the terminal.

use {
    fimoney_client::{
        CapabilityState, InvocationResult, QueryResult, Resource, ResourceResult, Session,
        SessionStatus, StatusReport, Tool,
    },
    serde_json::Value,
};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// One status line. `capabilities` holds the tool and resource counts, shown
/// only while connected.
pub fn session(session: &Session, capabilities: Option<(usize, usize)>) -> String {
    let color = match session.status {
        SessionStatus::Connected => GREEN,
        SessionStatus::Connecting => YELLOW,
        SessionStatus::ConnectFailed => RED,
        SessionStatus::Disconnected => "",
    };
    let mut line = format!("{BOLD}{color}{}{RESET}", session.status);
    if let Some(url) = &session.server_url {
        line.push_str(&format!(" to {url}"));
    }
    if session.status == SessionStatus::Connected
        && let Some((tools, resources)) = capabilities
    {
        line.push_str(&format!(", {tools} tools, {resources} resources"));
    }
    if let Some(err) = &session.last_error {
        line.push_str(&format!(" ({err})"));
    }
    line
}

pub fn status_report(report: &StatusReport) -> String {
    match (&report.server_url, report.connected) {
        (Some(url), true) => format!("gateway reports connected to {url}"),
        (None, true) => "gateway reports connected".to_string(),
        (_, false) => "gateway reports not connected".to_string(),
    }
}

pub fn tools(tools: &[Tool], state: &CapabilityState) -> String {
    if let CapabilityState::Stale(reason) = state {
        return format!("{RED}tools unavailable{RESET}: {reason}");
    }
    if tools.is_empty() {
        return "No tools available.".to_string();
    }
    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    tools
        .iter()
        .map(|t| format!("  {:width$}  {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn resources(resources: &[Resource], state: &CapabilityState) -> String {
    if let CapabilityState::Stale(reason) = state {
        return format!("{RED}resources unavailable{RESET}: {reason}");
    }
    if resources.is_empty() {
        return "No resources available.".to_string();
    }
    resources
        .iter()
        .map(|r| format!("  {}  {}", r.uri, r.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn payload(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn failure(reason: &str) -> String {
    format!("{RED}error{RESET}: {reason}")
}

pub fn invocation(result: &InvocationResult) -> String {
    match result {
        InvocationResult::Success(value) => payload(value),
        InvocationResult::Failure(reason) => failure(reason),
    }
}

pub fn resource(result: &ResourceResult) -> String {
    match result {
        ResourceResult::Success(value) => payload(value),
        ResourceResult::Failure(reason) => failure(reason),
    }
}

pub fn query(result: &QueryResult) -> String {
    match result {
        QueryResult::Success(answer) => answer.clone(),
        QueryResult::Failure(reason) => failure(reason),
    }
}

pub fn suggestions(queries: &[String]) -> String {
    queries
        .iter()
        .enumerate()
        .map(|(i, q)| format!("  {}. {q}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
