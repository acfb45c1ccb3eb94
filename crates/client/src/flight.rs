//! Single-flight slot shared by the coordinators.
//!
//! Every request takes a ticket. Only the newest ticket may publish its
//! result as the slot's current result; older tickets that land later are
//! reported back to their caller as superseded and never overwrite it.

use std::sync::atomic::{AtomicU64, Ordering};

use {tokio::sync::Mutex, tracing::debug};

use crate::session::SessionHandle;

pub const SUPERSEDED: &str = "superseded by a newer request";
pub const SESSION_CHANGED: &str = "session changed while request was in flight";

/// A reduced result that can be built from a failure reason.
pub(crate) trait Outcome: Clone {
    fn failure(reason: String) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    id: u64,
    epoch: u64,
}

struct Landed<R> {
    settled: u64,
    current: Option<R>,
}

pub(crate) struct FlightSlot<R> {
    issued: AtomicU64,
    landed: Mutex<Landed<R>>,
}

impl<R: Outcome> FlightSlot<R> {
    pub(crate) fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            landed: Mutex::new(Landed {
                settled: 0,
                current: None,
            }),
        }
    }

    /// Start a request. Any request still in flight is superseded.
    pub(crate) fn issue(&self, session: &SessionHandle) -> Ticket {
        Ticket {
            id: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
            epoch: session.epoch(),
        }
    }

    /// Land a finished request and return what its caller should see.
    pub(crate) async fn finish(&self, ticket: Ticket, session: &SessionHandle, result: R) -> R {
        let mut landed = self.landed.lock().await;
        let latest = self.issued.load(Ordering::SeqCst) == ticket.id;

        if session.epoch() != ticket.epoch {
            debug!(ticket = ticket.id, "dropping result from a previous session");
            if latest {
                landed.settled = ticket.id;
                landed.current = None;
            }
            return R::failure(SESSION_CHANGED.into());
        }

        if !latest {
            debug!(ticket = ticket.id, "dropping superseded result");
            return R::failure(SUPERSEDED.into());
        }

        landed.settled = ticket.id;
        landed.current = Some(result.clone());
        result
    }

    /// The result of the newest request that has landed.
    pub(crate) async fn current(&self) -> Option<R> {
        self.landed.lock().await.current.clone()
    }

    /// Whether the newest request is still waiting for its result.
    pub(crate) async fn is_pending(&self) -> bool {
        let landed = self.landed.lock().await;
        self.issued.load(Ordering::SeqCst) > landed.settled
    }

    pub(crate) async fn clear(&self) {
        self.landed.lock().await.current = None;
    }
}
