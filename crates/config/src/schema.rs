//! Config schema: gateway connection, session defaults and dashboard
//! presentation.

use serde::{Deserialize, Serialize};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiMoneyConfig {
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
    pub dashboard: DashboardConfig,
}

/// Where the gateway lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL every request is resolved against.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// MCP server URL offered when connecting.
    pub server_url: String,
    /// Background status poll interval; 0 disables polling.
    pub status_poll_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            status_poll_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Example questions offered in the query panel. Empty means the
    /// built-in set.
    pub suggested_queries: Vec<String>,
}
