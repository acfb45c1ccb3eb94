//! Gateway payloads, session snapshots and the reduced result types the
//! presentation layer renders.

use {
    serde::{Deserialize, Deserializer, Serialize},
    serde_json::Value,
};

// ── Transport failures ──────────────────────────────────────────────

/// The three failure classes surfaced by the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No response was received (refused, timed out, DNS failure, ...).
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    /// A response arrived carrying an application-level error.
    #[error("{}", server_error_message(.status, .detail))]
    ServerError { status: Option<u16>, detail: String },
    /// A response arrived but could not be read into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

fn server_error_message(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("HTTP {code}: {detail}"),
        None => detail.to_string(),
    }
}

impl TransportError {
    pub fn server(detail: impl Into<String>) -> Self {
        Self::ServerError {
            status: None,
            detail: detail.into(),
        }
    }

    pub(crate) fn map_detail(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            Self::NetworkUnreachable(detail) => Self::NetworkUnreachable(f(detail)),
            Self::ServerError { status, detail } => Self::ServerError {
                status,
                detail: f(detail),
            },
            Self::MalformedResponse(detail) => Self::MalformedResponse(f(detail)),
        }
    }
}

// ── Request bodies ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ConnectParams {
    pub server_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsCallParams {
    pub tool_name: String,
    pub arguments: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceReadParams {
    pub resource_uri: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryParams {
    pub query: String,
}

// ── Capabilities ────────────────────────────────────────────────────

/// A named remote operation exposed by the Fi Money server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

/// A readable artifact exposed by the Fi Money server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub uri: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `GET /tools` and `GET /resources` answer either with a bare array or
/// with the array wrapped in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "tools", alias = "resources")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
        }
    }
}

/// Freshness of the cached capability sets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CapabilityState {
    /// Nothing fetched yet in this session.
    #[default]
    Empty,
    Fresh,
    /// The last refresh failed; the sets are empty until the next success.
    Stale(String),
}

// ── Session ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    ConnectFailed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::ConnectFailed => write!(f, "connect failed"),
        }
    }
}

/// The client's view of its connection to the Fi Money server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub status: SessionStatus,
    /// Present only while `status` is `Connected`.
    pub server_url: Option<String>,
    pub last_error: Option<String>,
    /// Bumped on every transition into or out of `Connected`.
    pub epoch: u64,
}

impl Session {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }
}

/// Connectivity as reported by `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub connected: bool,
    pub server_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    connected: Option<bool>,
    status: Option<String>,
    server_url: Option<String>,
}

impl StatusReport {
    pub(crate) fn from_value(value: Value) -> Result<Self, TransportError> {
        let raw: RawStatus = serde_json::from_value(value)
            .map_err(|e| TransportError::MalformedResponse(format!("status: {e}")))?;
        let connected = match (raw.connected, raw.status.as_deref()) {
            (Some(connected), _) => connected,
            (None, Some(status)) => status.eq_ignore_ascii_case("connected"),
            (None, None) => {
                return Err(TransportError::MalformedResponse(
                    "status: missing connectivity indicator".into(),
                ));
            },
        };
        Ok(Self {
            connected,
            server_url: raw.server_url.filter(|url| !url.is_empty()),
        })
    }
}

// ── Results ─────────────────────────────────────────────────────────

/// Outcome of a tool invocation. The success payload is opaque.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success(Value),
    Failure(String),
}

/// Outcome of a resource read. The success payload is opaque.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceResult {
    Success(Value),
    Failure(String),
}

/// Outcome of a natural-language query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Success(String),
    Failure(String),
}

macro_rules! result_helpers {
    ($ty:ty) => {
        impl $ty {
            #[must_use]
            pub fn is_success(&self) -> bool {
                matches!(self, Self::Success(_))
            }

            /// The failure reason, if this is a failure.
            #[must_use]
            pub fn reason(&self) -> Option<&str> {
                match self {
                    Self::Success(_) => None,
                    Self::Failure(reason) => Some(reason),
                }
            }
        }

        impl crate::flight::Outcome for $ty {
            fn failure(reason: String) -> Self {
                Self::Failure(reason)
            }
        }
    };
}

result_helpers!(InvocationResult);
result_helpers!(ResourceResult);
result_helpers!(QueryResult);
