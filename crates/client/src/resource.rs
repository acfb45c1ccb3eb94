//! ResourceReader: reads a resource by URI through the gateway.

use std::sync::Arc;

use {serde_json::Value, tracing::info};

use crate::{
    error::{Error, Result},
    flight::FlightSlot,
    registry::CapabilityRegistry,
    session::SessionHandle,
    traits::{GatewayTransport, HttpMethod},
    types::{ResourceReadParams, ResourceResult},
};

pub struct ResourceReader {
    transport: Arc<dyn GatewayTransport>,
    session: SessionHandle,
    registry: Arc<CapabilityRegistry>,
    slot: FlightSlot<ResourceResult>,
}

impl ResourceReader {
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

    pub async fn read(&self, uri: &str) -> ResourceResult {
        let ticket = self.slot.issue(&self.session);
        let result = match self.dispatch(uri).await {
            Ok(value) => ResourceResult::Success(value),
            Err(Error::Transport(e)) => ResourceResult::Failure(format!("read failed: {e}")),
            Err(e) => ResourceResult::Failure(e.to_string()),
        };
        self.slot.finish(ticket, &self.session, result).await
    }

    async fn dispatch(&self, uri: &str) -> Result<Value> {
        if !self.session.is_connected() {
            return Err(Error::state("not connected"));
        }
        if self.registry.resource(uri).await.is_none() {
            return Err(Error::state(format!("unknown resource: {uri}")));
        }

        info!(uri = %uri, "reading resource");
        let body = serde_json::to_value(ResourceReadParams {
            resource_uri: uri.to_string(),
        })
        .map_err(|e| Error::validation(format!("failed to encode read request: {e}")))?;
        Ok(self
            .transport
            .request(HttpMethod::Post, "/resources/read", Some(body))
            .await?)
    }

    pub async fn current(&self) -> Option<ResourceResult> {
        self.slot.current().await
    }

    pub async fn is_pending(&self) -> bool {
        self.slot.is_pending().await
    }

    pub async fn clear(&self) {
        self.slot.clear().await;
    }
}
