//! HTTP transport to the Fi Money gateway.
//!
//! Plain JSON over HTTP: `GET` for listings and status, `POST` with a JSON
//! body for everything else. Responses are classified into the three
//! [`TransportError`] classes before they leave this module.

use std::{sync::Arc, time::Duration};

use {
    reqwest::{
        Client,
        header::{ACCEPT, CONTENT_TYPE},
    },
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    traits::{GatewayTransport, HttpMethod},
    types::TransportError,
};

const JSON: &str = "application/json";

/// reqwest-backed [`GatewayTransport`] bound to one base URL.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the gateway at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Arc<Self>> {
        let parsed = url::Url::parse(base_url.trim())
            .map_err(|e| Error::validation(format!("invalid gateway url '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "invalid gateway url '{base_url}': unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        if timeout.is_zero() {
            return Err(Error::validation("gateway timeout must be at least 1 second"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::validation(format!("failed to build HTTP client: {e}")))?;

        Ok(Arc::new(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn unreachable(method: HttpMethod, path: &str, err: &reqwest::Error) -> TransportError {
        let reason = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("could not connect: {err}")
        } else {
            err.to_string()
        };
        TransportError::NetworkUnreachable(format!("{method} {path}: {reason}"))
    }
}

/// Pull a human-readable reason out of an error body.
fn error_detail(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["detail", "error", "message"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| trimmed.to_string()),
        Ok(Value::String(s)) => s,
        _ => trimmed.to_string(),
    }
}

/// A 2xx body can still say the upstream session needs a fresh login.
fn check_login_required(value: &Value) -> std::result::Result<(), TransportError> {
    let Some(obj) = value.as_object() else {
        return Ok(());
    };
    if obj.get("status").and_then(Value::as_str) != Some("login_required") {
        return Ok(());
    }
    let detail = match obj.get("login_url").and_then(Value::as_str) {
        Some(url) => format!("login required (login url: {url})"),
        None => "login required".to_string(),
    };
    Err(TransportError::server(detail))
}

#[async_trait::async_trait]
impl GatewayTransport for HttpTransport {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> std::result::Result<Value, TransportError> {
        let url = self.endpoint(path);
        debug!(method = %method, url = %url, "client -> gateway");

        let mut req = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        }
        .header(ACCEPT, JSON)
        .header(CONTENT_TYPE, JSON);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Self::unreachable(method, path, &e))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Self::unreachable(method, path, &e))?;

        if !status.is_success() {
            let detail = error_detail(&text, status.canonical_reason().unwrap_or("request failed"));
            warn!(method = %method, path = %path, %status, detail = %detail, "gateway returned an error");
            return Err(TransportError::ServerError {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                TransportError::MalformedResponse(format!("{method} {path}: {e}"))
            })?
        };

        check_login_required(&value)?;
        debug!(method = %method, url = %url, %status, "gateway -> client");
        Ok(value)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
