//! InvocationCoordinator: validates user-entered tool arguments, calls the
//! tool through the gateway and reduces the outcome to an
//! [`InvocationResult`].

use std::sync::Arc;

use {
    serde_json::{Map, Value},
    tracing::{debug, info},
};

use crate::{
    error::{Error, Result},
    flight::FlightSlot,
    registry::CapabilityRegistry,
    session::SessionHandle,
    traits::{GatewayTransport, HttpMethod},
    types::{InvocationResult, ToolsCallParams},
};

/// Parse a raw argument string into a JSON object.
///
/// Blank input means "no arguments" and yields an empty object.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::validation("invalid arguments: expected a JSON object")),
        Err(e) => Err(Error::validation(format!("invalid arguments: {e}"))),
    }
}

pub struct InvocationCoordinator {
    transport: Arc<dyn GatewayTransport>,
    session: SessionHandle,
    registry: Arc<CapabilityRegistry>,
    slot: FlightSlot<InvocationResult>,
}

impl InvocationCoordinator {
    pub(crate) fn new(
        transport: Arc<dyn GatewayTransport>,
        session: SessionHandle,
        registry: Arc<CapabilityRegistry>,
    ) -> Self {
        Self {
            transport,
            session,
            registry,
            slot: FlightSlot::new(),
        }
    }

    /// Invoke `tool_name` with `raw_arguments` (JSON object text).
    ///
    /// A newer `invoke` supersedes this one: if it lands first, this call
    /// returns a superseded failure and never becomes the current result.
    pub async fn invoke(&self, tool_name: &str, raw_arguments: &str) -> InvocationResult {
        let ticket = self.slot.issue(&self.session);
        let result = match self.dispatch(tool_name, raw_arguments).await {
            Ok(value) => InvocationResult::Success(value),
            Err(Error::Transport(e)) => InvocationResult::Failure(format!("call failed: {e}")),
            Err(e) => InvocationResult::Failure(e.to_string()),
        };
        self.slot.finish(ticket, &self.session, result).await
    }

    async fn dispatch(&self, tool_name: &str, raw_arguments: &str) -> Result<Value> {
        if !self.session.is_connected() {
            return Err(Error::state("not connected"));
        }
        if self.registry.tool(tool_name).await.is_none() {
            return Err(Error::state(format!("unknown tool: {tool_name}")));
        }
        let arguments = parse_arguments(raw_arguments)?;

        info!(tool = %tool_name, args = arguments.len(), "calling tool");
        let body = serde_json::to_value(ToolsCallParams {
            tool_name: tool_name.to_string(),
            arguments,
        })
        .map_err(|e| Error::validation(format!("invalid arguments: {e}")))?;

        let value = self
            .transport
            .request(HttpMethod::Post, "/tools/call", Some(body))
            .await?;
        debug!(tool = %tool_name, "tool call returned");
        Ok(value)
    }

    /// The result of the newest invocation that has landed.
    pub async fn current(&self) -> Option<InvocationResult> {
        self.slot.current().await
    }

    pub async fn is_pending(&self) -> bool {
        self.slot.is_pending().await
    }

    pub async fn clear(&self) {
        self.slot.clear().await;
    }
}
