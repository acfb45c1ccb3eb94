//! QueryCoordinator: free-text questions answered by the server's query
//! endpoint.

use std::sync::Arc;

use {serde_json::Value, tracing::info};

use crate::{
    error::{Error, Result},
    flight::FlightSlot,
    session::SessionHandle,
    traits::{GatewayTransport, HttpMethod},
    types::{QueryParams, QueryResult, TransportError},
};

pub const EMPTY_QUERY: &str = "empty query";
pub const NOT_CONNECTED: &str = "not connected";

/// Suggestions offered when no queries are configured.
pub const DEFAULT_SUGGESTIONS: &[&str] = &[
    "Show my net worth",
    "List my bank transactions",
    "Get my credit report",
    "Show EPF details",
    "List mutual fund transactions",
];

/// Pull the answer text out of a `/query` response.
fn answer_text(value: Value) -> std::result::Result<String, TransportError> {
    match value {
        Value::String(text) => Ok(text),
        Value::Object(mut map) => ["response", "answer", "result"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::String(text)) => Some(text),
                _ => None,
            })
            .ok_or_else(|| {
                TransportError::MalformedResponse("query: no answer text in response".into())
            }),
        other => Err(TransportError::MalformedResponse(format!(
            "query: expected text, got {other}"
        ))),
    }
}

pub struct QueryCoordinator {
    transport: Arc<dyn GatewayTransport>,
    session: SessionHandle,
    suggestions: Vec<String>,
    slot: FlightSlot<QueryResult>,
}

impl QueryCoordinator {
    pub(crate) fn new(
        transport: Arc<dyn GatewayTransport>,
        session: SessionHandle,
        suggestions: Vec<String>,
    ) -> Self {
        let suggestions = if suggestions.is_empty() {
            DEFAULT_SUGGESTIONS.iter().map(|s| (*s).to_string()).collect()
        } else {
            suggestions
        };
        Self {
            transport,
            session,
            suggestions,
            slot: FlightSlot::new(),
        }
    }

    /// Ask the server a question. Same supersede discipline as tool calls.
    pub async fn ask(&self, query_text: &str) -> QueryResult {
        let ticket = self.slot.issue(&self.session);
        let result = match self.dispatch(query_text).await {
            Ok(answer) => QueryResult::Success(answer),
            Err(Error::Transport(e)) => QueryResult::Failure(format!("server error: {e}")),
            Err(e) => QueryResult::Failure(e.to_string()),
        };
        self.slot.finish(ticket, &self.session, result).await
    }

    async fn dispatch(&self, query_text: &str) -> Result<String> {
        let query = query_text.trim();
        if query.is_empty() {
            return Err(Error::validation(EMPTY_QUERY));
        }
        if !self.session.is_connected() {
            return Err(Error::state(NOT_CONNECTED));
        }

        info!(chars = query.len(), "sending query");
        let body = serde_json::to_value(QueryParams {
            query: query.to_string(),
        })
        .map_err(|e| Error::validation(format!("failed to encode query: {e}")))?;
        let value = self
            .transport
            .request(HttpMethod::Post, "/query", Some(body))
            .await?;
        Ok(answer_text(value)?)
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub async fn current(&self) -> Option<QueryResult> {
        self.slot.current().await
    }

    pub async fn is_pending(&self) -> bool {
        self.slot.is_pending().await
    }

    pub async fn clear(&self) {
        self.slot.clear().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            flight::SUPERSEDED,
            session::session_channel,
            testing::{Reply, ScriptedTransport},
            types::SessionStatus,
        },
        serde_json::json,
    };

    fn connected(transport: Arc<ScriptedTransport>) -> Arc<QueryCoordinator> {
        let (writer, handle) = session_channel();
        writer.modify(|s| {
            s.status = SessionStatus::Connected;
            s.server_url = Some("http://localhost:3000".into());
            s.epoch = 1;
        });
        Arc::new(QueryCoordinator::new(transport, handle, Vec::new()))
    }

    #[tokio::test]
    async fn blank_query_never_reaches_transport() {
        let transport = ScriptedTransport::new();
        let coordinator = connected(transport.clone());

        assert_eq!(coordinator.ask("").await, QueryResult::Failure(EMPTY_QUERY.into()));
        assert_eq!(coordinator.ask("   ").await, QueryResult::Failure(EMPTY_QUERY.into()));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn query_while_disconnected_fails() {
        let transport = ScriptedTransport::new();
        let (_writer, handle) = session_channel();
        let coordinator = QueryCoordinator::new(transport.clone(), handle, Vec::new());

        let result = coordinator.ask("Show my net worth").await;
        assert_eq!(result, QueryResult::Failure(NOT_CONNECTED.into()));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn answer_text_is_returned() {
        let transport = ScriptedTransport::new();
        transport.on(
            "POST",
            "/query",
            Reply::ok(json!({"response": "Your net worth is ₹1,20,000"})),
        );
        let coordinator = connected(transport.clone());

        let result = coordinator.ask("  Show my net worth ").await;
        assert_eq!(
            result,
            QueryResult::Success("Your net worth is ₹1,20,000".into())
        );
        assert_eq!(
            transport.last_body("/query"),
            Some(json!({"query": "Show my net worth"}))
        );
    }

    #[tokio::test]
    async fn gateway_error_is_server_error() {
        let transport = ScriptedTransport::new();
        transport.on(
            "POST",
            "/query",
            Reply::err(TransportError::ServerError {
                status: Some(500),
                detail: "LLM unavailable".into(),
            }),
        );
        let coordinator = connected(transport);

        let result = coordinator.ask("Get my credit report").await;
        assert_eq!(
            result.reason(),
            Some("server error: HTTP 500: LLM unavailable")
        );
    }

    #[tokio::test]
    async fn unexpected_shape_is_server_error() {
        let transport = ScriptedTransport::new();
        transport.on("POST", "/query", Reply::ok(json!({"tokens": 12})));
        let coordinator = connected(transport);

        let result = coordinator.ask("Show EPF details").await;
        assert!(result.reason().unwrap().starts_with("server error: malformed response"));
    }

    #[tokio::test]
    async fn newer_query_supersedes_pending_one() {
        let transport = ScriptedTransport::new();
        let gate = transport.gate("POST", "/query", Reply::ok(json!("first")));
        transport.on("POST", "/query", Reply::ok(json!("second")));
        let coordinator = connected(transport);

        let slow = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.ask("Show my net worth").await })
        };
        gate.entered().await;
        let fast = coordinator.ask("List my bank transactions").await;
        gate.release();

        assert_eq!(fast, QueryResult::Success("second".into()));
        assert_eq!(slow.await.unwrap().reason(), Some(SUPERSEDED));
        assert_eq!(
            coordinator.current().await,
            Some(QueryResult::Success("second".into()))
        );
    }

    #[test]
    fn default_suggestions_are_used_when_none_configured() {
        let (_writer, handle) = session_channel();
        let coordinator = QueryCoordinator::new(ScriptedTransport::new(), handle, Vec::new());
        assert_eq!(coordinator.suggestions().len(), DEFAULT_SUGGESTIONS.len());

        let (_writer, handle) = session_channel();
        let coordinator = QueryCoordinator::new(ScriptedTransport::new(), handle, vec![
            "Show my SIPs".into(),
        ]);
        assert_eq!(coordinator.suggestions(), ["Show my SIPs".to_string()]);
    }
}
