//! Scripted in-memory gateway for unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use {async_trait::async_trait, serde_json::Value, tokio::sync::watch};

use crate::{
    traits::{GatewayTransport, HttpMethod},
    types::TransportError,
};

/// Holds a scripted reply until the test releases it.
pub(crate) struct Gate {
    entered: watch::Sender<bool>,
    released: watch::Sender<bool>,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: watch::channel(false).0,
            released: watch::channel(false).0,
        })
    }

    /// Wait until a request is parked on this gate.
    pub(crate) async fn entered(&self) {
        let mut rx = self.entered.subscribe();
        let _ = rx.wait_for(|entered| *entered).await;
    }

    pub(crate) fn release(&self) {
        self.released.send_replace(true);
    }

    async fn pass(&self) {
        self.entered.send_replace(true);
        let mut rx = self.released.subscribe();
        let _ = rx.wait_for(|released| *released).await;
    }
}

#[derive(Clone)]
pub(crate) struct Reply {
    outcome: Result<Value, TransportError>,
    gate: Option<Arc<Gate>>,
}

impl Reply {
    pub(crate) fn ok(value: Value) -> Self {
        Self {
            outcome: Ok(value),
            gate: None,
        }
    }

    pub(crate) fn err(error: TransportError) -> Self {
        Self {
            outcome: Err(error),
            gate: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub path: String,
    pub body: Option<Value>,
}

/// Replies are queued per route; the last queued reply repeats.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(String, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

#[allow(clippy::unwrap_used)]
impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn on(&self, method: &str, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Queue a reply that is held back until the returned gate is released.
    pub(crate) fn gate(&self, method: &str, path: &str, mut reply: Reply) -> Arc<Gate> {
        let gate = Gate::new();
        reply.gate = Some(Arc::clone(&gate));
        self.on(method, path, reply);
        gate
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    pub(crate) fn last_body(&self, path: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.path == path)
            .and_then(|c| c.body.clone())
    }

    fn next_reply(&self, method: HttpMethod, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&(method.to_string(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl GatewayTransport for ScriptedTransport {
    #[allow(clippy::unwrap_used)]
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(Call {
            path: path.to_string(),
            body,
        });
        let Some(reply) = self.next_reply(method, path) else {
            return Err(TransportError::ServerError {
                status: Some(404),
                detail: format!("no scripted reply for {method} {path}"),
            });
        };
        if let Some(gate) = &reply.gate {
            gate.pass().await;
        }
        reply.outcome
    }

    fn base_url(&self) -> &str {
        "http://gateway.test"
    }
}
