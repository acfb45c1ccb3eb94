//! Client core for the Fi Money dashboard.
//!
//! This crate provides:
//! - JSON-over-HTTP transport to the gateway (`transport`)
//! - The connection state machine (`session`)
//! - Cached tools and resources for the live session (`registry`)
//! - Tool calls, resource reads and free-text queries (`invocation`,
//!   `resource`, `query`)
//! - A facade wiring all of the above together (`dashboard`)

pub mod dashboard;
pub mod error;
pub mod invocation;
pub mod query;
pub mod registry;
pub mod resource;
pub mod session;
pub mod traits;
pub mod transport;
pub mod types;

pub(crate) mod flight;

#[cfg(test)]
mod testing;

pub use {
    dashboard::Dashboard,
    error::{Error, Result},
    flight::{SESSION_CHANGED, SUPERSEDED},
    invocation::{InvocationCoordinator, parse_arguments},
    query::{DEFAULT_SUGGESTIONS, QueryCoordinator},
    registry::CapabilityRegistry,
    resource::ResourceReader,
    session::{SessionController, SessionHandle, validate_server_url},
    traits::{GatewayTransport, HttpMethod},
    transport::HttpTransport,
    types::{
        CapabilityState, InvocationResult, QueryResult, Resource, ResourceResult, Session,
        SessionStatus, StatusReport, Tool, TransportError,
    },
};
