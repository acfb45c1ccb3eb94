//! SessionController: the connection state machine.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──ok──▶ Connected
//!      ▲                        │                 │
//!      │                        └──err──▶ ConnectFailed
//!      └────────disconnect / session lost / teardown
//! ```
//!
//! The controller is the only writer of [`Session`]. Everyone else reads it
//! through a [`SessionHandle`].

use std::{sync::Arc, time::Duration};

use {
    serde_json::Value,
    tokio::{
        sync::{Mutex, watch},
        task::JoinHandle,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    registry::CapabilityRegistry,
    traits::{GatewayTransport, HttpMethod},
    types::{ConnectParams, Session, SessionStatus, StatusReport},
};

pub const SESSION_LOST: &str = "session lost";

/// Read-only view of the current [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Session>,
}

impl SessionHandle {
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.rx.borrow().status
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.rx.borrow().epoch
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.rx.borrow().is_connected()
    }

    /// Wait for the next session change.
    pub async fn changed(&mut self) -> Session {
        if self.rx.changed().await.is_err() {
            debug!("session writer dropped");
        }
        self.rx.borrow_and_update().clone()
    }
}

/// The single write side of the session channel.
pub(crate) struct SessionWriter {
    tx: watch::Sender<Session>,
}

impl SessionWriter {
    pub(crate) fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub(crate) fn modify(&self, f: impl FnOnce(&mut Session)) {
        self.tx.send_modify(f);
    }
}

pub(crate) fn session_channel() -> (SessionWriter, SessionHandle) {
    let (tx, rx) = watch::channel(Session::default());
    (SessionWriter { tx }, SessionHandle { rx })
}

/// Validate a user-entered server URL and return it trimmed.
pub fn validate_server_url(raw: &str) -> Result<String> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(Error::validation("server url is required"));
    }
    let parsed =
        url::Url::parse(url).map_err(|e| Error::validation(format!("invalid server url: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::validation(format!(
            "invalid server url: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    Ok(url.to_string())
}

/// Drives connect / disconnect / status against the gateway.
pub struct SessionController {
    transport: Arc<dyn GatewayTransport>,
    registry: Arc<CapabilityRegistry>,
    writer: SessionWriter,
    handle: SessionHandle,
    /// Held for the whole of a transition so transitions never interleave.
    transitions: Mutex<()>,
}

impl SessionController {
    pub(crate) fn new(
        transport: Arc<dyn GatewayTransport>,
        registry: Arc<CapabilityRegistry>,
        writer: SessionWriter,
        handle: SessionHandle,
    ) -> Self {
        Self {
            transport,
            registry,
            writer,
            handle,
            transitions: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.writer.snapshot()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn watch(&self) -> SessionHandle {
        let mut handle = self.handle.clone();
        handle.rx.borrow_and_update();
        handle
    }

    fn reject_busy(status: SessionStatus) -> Result<()> {
        match status {
            SessionStatus::Connecting => Err(Error::state("already connecting")),
            SessionStatus::Connected => Err(Error::state("already connected")),
            SessionStatus::Disconnected | SessionStatus::ConnectFailed => Ok(()),
        }
    }

    /// Connect the gateway to the Fi Money server at `url`.
    ///
    /// On success the capability registry is refreshed; a failed refresh
    /// leaves the session Connected.
    pub async fn connect(&self, url: &str) -> Result<()> {
        let url = validate_server_url(url)?;
        Self::reject_busy(self.handle.status())?;

        let guard = self.transitions.lock().await;
        let started = self.writer.snapshot();
        Self::reject_busy(started.status)?;

        self.writer.modify(|s| {
            s.status = SessionStatus::Connecting;
            s.server_url = None;
            s.last_error = None;
        });
        info!(server_url = %url, "connecting to Fi Money server");

        let body = serde_json::to_value(ConnectParams {
            server_url: url.clone(),
        })
        .map_err(|e| Error::validation(format!("failed to encode connect request: {e}")))?;
        let outcome = self
            .transport
            .request(HttpMethod::Post, "/connect", Some(body))
            .await;

        let current = self.writer.snapshot();
        if current.epoch != started.epoch || current.status != SessionStatus::Connecting {
            warn!(server_url = %url, "session torn down while connecting, ignoring response");
            return Err(Error::state("session torn down while connecting"));
        }

        match outcome {
            Ok(_) => {
                self.writer.modify(|s| {
                    s.status = SessionStatus::Connected;
                    s.server_url = Some(url.clone());
                    s.last_error = None;
                    s.epoch += 1;
                });
                info!(server_url = %url, "connected");
            },
            Err(e) => {
                let reason = format!("connect to {url} failed: {e}");
                warn!(server_url = %url, error = %e, "connect failed");
                self.writer.modify(|s| {
                    s.status = SessionStatus::ConnectFailed;
                    s.server_url = None;
                    s.last_error = Some(reason);
                });
                return Err(e.into());
            },
        }
        drop(guard);

        if let Err(e) = self.registry.refresh().await {
            warn!(error = %e, "capability refresh after connect failed");
        }
        Ok(())
    }

    /// Reset to Disconnected. The local reset happens even when the gateway
    /// rejects the disconnect; the remote failure is kept in `last_error`.
    pub async fn disconnect(&self) -> Result<()> {
        match self.handle.status() {
            SessionStatus::Disconnected => return Ok(()),
            SessionStatus::Connecting => return Err(Error::state("connect in progress")),
            SessionStatus::Connected | SessionStatus::ConnectFailed => {},
        }

        let _guard = self.transitions.lock().await;
        let remote_error = match self.writer.snapshot().status {
            SessionStatus::Disconnected => return Ok(()),
            SessionStatus::Connecting => return Err(Error::state("connect in progress")),
            SessionStatus::ConnectFailed => None,
            SessionStatus::Connected => match self
                .transport
                .request(HttpMethod::Post, "/disconnect", None)
                .await
            {
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "gateway disconnect failed, resetting locally");
                    Some(format!("disconnect failed: {e}"))
                },
            },
        };

        self.reset(remote_error).await;
        info!("disconnected");
        Ok(())
    }

    /// Ask the gateway whether the session is still alive.
    ///
    /// A not-connected report while locally Connected moves the session to
    /// Disconnected with the reason [`SESSION_LOST`].
    pub async fn status(&self) -> Result<StatusReport> {
        let Ok(_guard) = self.transitions.try_lock() else {
            return Err(Error::state("session operation in progress"));
        };
        let before = self.writer.snapshot();

        let value: Value = self
            .transport
            .request(HttpMethod::Get, "/status", None)
            .await?;
        let report = StatusReport::from_value(value)?;

        let now = self.writer.snapshot();
        if !report.connected && now.is_connected() && now.epoch == before.epoch {
            warn!(server_url = ?now.server_url, "gateway reports the session was lost");
            self.reset(Some(SESSION_LOST.to_string())).await;
        }
        Ok(report)
    }

    /// Local-only reset for when the presenter goes away. Any response still
    /// in flight is ignored when it lands.
    pub async fn teardown(&self) {
        if self.handle.status() == SessionStatus::Disconnected {
            return;
        }
        debug!("tearing down session");
        self.reset(None).await;
    }

    async fn reset(&self, last_error: Option<String>) {
        self.writer.modify(|s| {
            s.status = SessionStatus::Disconnected;
            s.server_url = None;
            s.last_error = last_error;
            s.epoch += 1;
        });
        self.registry.clear().await;
    }

    /// Poll [`status`](Self::status) every `every` while Connected, until
    /// `cancel` fires.
    pub fn spawn_status_poll(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if !controller.handle.is_connected() {
                            continue;
                        }
                        if let Err(e) = controller.status().await {
                            debug!(error = %e, "status poll failed");
                        }
                    },
                }
            }
            debug!("status poll stopped");
        })
    }
}
