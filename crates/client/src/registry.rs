//! CapabilityRegistry: the tools and resources offered by the connected
//! server, cached for the lifetime of the session.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    serde::de::DeserializeOwned,
    tokio::sync::RwLock,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Context, Error, Result},
    session::SessionHandle,
    traits::{GatewayTransport, HttpMethod},
    types::{CapabilityState, Listing, Resource, Tool, TransportError},
};

#[derive(Default)]
struct Capabilities {
    tools: Vec<Tool>,
    resources: Vec<Resource>,
    state: CapabilityState,
    /// Refresh generation the sets came from.
    generation: u64,
}

pub struct CapabilityRegistry {
    transport: Arc<dyn GatewayTransport>,
    session: SessionHandle,
    refreshes: AtomicU64,
    inner: RwLock<Capabilities>,
}

impl CapabilityRegistry {
    pub(crate) fn new(transport: Arc<dyn GatewayTransport>, session: SessionHandle) -> Self {
        Self {
            transport,
            session,
            refreshes: AtomicU64::new(0),
            inner: RwLock::new(Capabilities::default()),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> std::result::Result<Vec<T>, TransportError> {
        let value = self
            .transport
            .request(HttpMethod::Get, path, None)
            .await
            .context(format!("GET {path}"))?;
        let listing: Listing<T> = serde_json::from_value(value)
            .map_err(|e| TransportError::MalformedResponse(format!("GET {path}: {e}")))?;
        Ok(listing.into_items())
    }

    /// Fetch tools and resources and replace both cached sets.
    ///
    /// Either fetch failing leaves the registry Stale with empty sets; the
    /// session itself stays Connected.
    pub async fn refresh(&self) -> Result<()> {
        let session = self.session.snapshot();
        if !session.is_connected() {
            return Err(Error::state("not connected"));
        }
        let generation = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;

        let (tools, resources) = tokio::join!(
            self.fetch::<Tool>("/tools"),
            self.fetch::<Resource>("/resources")
        );

        let mut inner = self.inner.write().await;
        if self.session.epoch() != session.epoch {
            debug!("discarding capability refresh from a previous session");
            return Err(Error::state("session changed during capability refresh"));
        }
        if inner.generation > generation {
            debug!(generation, "discarding capability refresh overtaken by a newer one");
            return Ok(());
        }
        inner.generation = generation;

        match (tools, resources) {
            (Ok(tools), Ok(resources)) => {
                info!(
                    tools = tools.len(),
                    resources = resources.len(),
                    "capabilities refreshed"
                );
                inner.tools = tools;
                inner.resources = resources;
                inner.state = CapabilityState::Fresh;
                Ok(())
            },
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "capability refresh failed");
                inner.tools.clear();
                inner.resources.clear();
                inner.state = CapabilityState::Stale(e.to_string());
                Err(e.into())
            },
        }
    }

    /// Forget everything fetched in the current session.
    pub(crate) async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.tools.clear();
        inner.resources.clear();
        inner.state = CapabilityState::Empty;
    }

    pub async fn get_tools(&self) -> Vec<Tool> {
        self.inner.read().await.tools.clone()
    }

    pub async fn get_resources(&self) -> Vec<Resource> {
        self.inner.read().await.resources.clone()
    }

    pub async fn tool(&self, name: &str) -> Option<Tool> {
        self.inner
            .read()
            .await
            .tools
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }

    pub async fn resource(&self, uri: &str) -> Option<Resource> {
        self.inner
            .read()
            .await
            .resources
            .iter()
            .find(|r| r.uri == uri)
            .cloned()
    }

    pub async fn state(&self) -> CapabilityState {
        self.inner.read().await.state.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            session::session_channel,
            testing::{Reply, ScriptedTransport},
            types::SessionStatus,
        },
        serde_json::json,
    };

    fn connected_registry(transport: Arc<ScriptedTransport>) -> CapabilityRegistry {
        let (writer, handle) = session_channel();
        writer.modify(|s| {
            s.status = SessionStatus::Connected;
            s.server_url = Some("http://localhost:3000".into());
            s.epoch = 1;
        });
        CapabilityRegistry::new(transport, handle)
    }

    #[tokio::test]
    async fn empty_before_first_refresh() {
        let registry = connected_registry(ScriptedTransport::new());
        assert!(registry.get_tools().await.is_empty());
        assert!(registry.get_resources().await.is_empty());
        assert_eq!(registry.state().await, CapabilityState::Empty);
    }

    #[tokio::test]
    async fn refresh_replaces_both_sets() {
        let transport = ScriptedTransport::new();
        transport.on(
            "GET",
            "/tools",
            Reply::ok(json!([{"name": "fetch_bank_transactions", "description": "..."}])),
        );
        transport.on(
            "GET",
            "/resources",
            Reply::ok(json!({"resources": [{"uri": "fi://profile", "description": "Profile"}]})),
        );
        let registry = connected_registry(transport.clone());

        registry.refresh().await.unwrap();
        assert_eq!(registry.get_tools().await, vec![Tool {
            name: "fetch_bank_transactions".into(),
            description: "...".into(),
        }]);
        assert_eq!(
            registry.resource("fi://profile").await.unwrap().description,
            "Profile"
        );
        assert!(registry.tool("fetch_net_worth").await.is_none());
        assert_eq!(registry.state().await, CapabilityState::Fresh);
    }

    #[tokio::test]
    async fn refresh_is_replace_not_merge() {
        let transport = ScriptedTransport::new();
        transport.on("GET", "/tools", Reply::ok(json!([{"name": "a"}, {"name": "b"}])));
        transport.on("GET", "/tools", Reply::ok(json!([{"name": "c"}])));
        transport.on("GET", "/resources", Reply::ok(json!([])));
        let registry = connected_registry(transport);

        registry.refresh().await.unwrap();
        assert_eq!(registry.get_tools().await.len(), 2);
        registry.refresh().await.unwrap();
        let names: Vec<String> = registry
            .get_tools()
            .await
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["c"]);
    }

    #[tokio::test]
    async fn failed_fetch_marks_stale_and_empties() {
        let transport = ScriptedTransport::new();
        transport.on("GET", "/tools", Reply::ok(json!([{"name": "a"}])));
        transport.on("GET", "/tools", Reply::ok(json!({"unexpected": true})));
        transport.on("GET", "/resources", Reply::ok(json!([])));
        let registry = connected_registry(transport);

        registry.refresh().await.unwrap();
        let err = registry.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::MalformedResponse(_))
        ));
        assert!(registry.get_tools().await.is_empty());
        assert!(matches!(registry.state().await, CapabilityState::Stale(_)));
    }

    #[tokio::test]
    async fn resource_failure_also_marks_stale() {
        let transport = ScriptedTransport::new();
        transport.on("GET", "/tools", Reply::ok(json!([{"name": "a"}])));
        transport.on(
            "GET",
            "/resources",
            Reply::err(TransportError::NetworkUnreachable("refused".into())),
        );
        let registry = connected_registry(transport);

        assert!(registry.refresh().await.is_err());
        assert!(registry.get_tools().await.is_empty());
        match registry.state().await {
            CapabilityState::Stale(reason) => assert!(reason.contains("GET /resources")),
            other => panic!("expected stale, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_requires_connection() {
        let transport = ScriptedTransport::new();
        let (_writer, handle) = session_channel();
        let registry = CapabilityRegistry::new(transport.clone(), handle);
        assert_eq!(
            registry.refresh().await.unwrap_err(),
            Error::state("not connected")
        );
        assert_eq!(transport.calls(), 0);
    }
}
