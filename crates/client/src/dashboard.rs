//! The facade a presentation layer holds: one transport, one session, one
//! registry and the three coordinators, wired together.

use std::{sync::Arc, time::Duration};

use {tokio::task::JoinHandle, tokio_util::sync::CancellationToken, tracing::info};

use crate::{
    error::Result,
    invocation::InvocationCoordinator,
    query::QueryCoordinator,
    registry::CapabilityRegistry,
    resource::ResourceReader,
    session::{SessionController, SessionHandle, session_channel},
    traits::GatewayTransport,
    transport::HttpTransport,
    types::{InvocationResult, QueryResult, ResourceResult, Session},
};

pub struct Dashboard {
    session: Arc<SessionController>,
    registry: Arc<CapabilityRegistry>,
    invocations: InvocationCoordinator,
    resources: ResourceReader,
    queries: QueryCoordinator,
}

impl Dashboard {
    pub fn new(transport: Arc<dyn GatewayTransport>, suggestions: Vec<String>) -> Self {
        let (writer, handle) = session_channel();
        let registry = Arc::new(CapabilityRegistry::new(
            Arc::clone(&transport),
            handle.clone(),
        ));
        let session = Arc::new(SessionController::new(
            Arc::clone(&transport),
            Arc::clone(&registry),
            writer,
            handle.clone(),
        ));
        let invocations =
            InvocationCoordinator::new(Arc::clone(&transport), handle.clone(), Arc::clone(&registry));
        let resources =
            ResourceReader::new(Arc::clone(&transport), handle.clone(), Arc::clone(&registry));
        let queries = QueryCoordinator::new(transport, handle, suggestions);

        Self {
            session,
            registry,
            invocations,
            resources,
            queries,
        }
    }

    /// Dashboard talking to the gateway at `base_url` over HTTP.
    pub fn over_http(base_url: &str, timeout: Duration, suggestions: Vec<String>) -> Result<Self> {
        let transport = HttpTransport::new(base_url, timeout)?;
        info!(gateway = %transport.base_url(), "dashboard created");
        Ok(Self::new(transport, suggestions))
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn invocations(&self) -> &InvocationCoordinator {
        &self.invocations
    }

    pub fn resources(&self) -> &ResourceReader {
        &self.resources
    }

    pub fn queries(&self) -> &QueryCoordinator {
        &self.queries
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.session.snapshot()
    }

    #[must_use]
    pub fn watch(&self) -> SessionHandle {
        self.session.watch()
    }

    pub async fn connect(&self, server_url: &str) -> Result<()> {
        self.session.connect(server_url).await
    }

    /// Disconnect and drop the results shown for the old session.
    pub async fn disconnect(&self) -> Result<()> {
        self.session.disconnect().await?;
        self.clear_results().await;
        Ok(())
    }

    pub async fn invoke(&self, tool_name: &str, raw_arguments: &str) -> InvocationResult {
        self.invocations.invoke(tool_name, raw_arguments).await
    }

    pub async fn read(&self, uri: &str) -> ResourceResult {
        self.resources.read(uri).await
    }

    pub async fn ask(&self, query_text: &str) -> QueryResult {
        self.queries.ask(query_text).await
    }

    pub async fn clear_results(&self) {
        self.invocations.clear().await;
        self.resources.clear().await;
        self.queries.clear().await;
    }

    /// Start the background status poll. A zero interval starts nothing.
    pub fn start_status_poll(
        &self,
        every: Duration,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if every.is_zero() {
            return None;
        }
        Some(self.session.spawn_status_poll(every, cancel))
    }

    /// Presenter is going away: reset locally and forget every result.
    pub async fn shutdown(&self) {
        self.session.teardown().await;
        self.clear_results().await;
    }
}
