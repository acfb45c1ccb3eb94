use crate::types::TransportError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Bad local input. Never reaches the gateway.
    #[error("{0}")]
    Validation(String),
    /// The operation is not valid for the current session state.
    #[error("{0}")]
    State(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Whether the failure was produced locally, without contacting the gateway.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::State(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// `.context()` for transport results: prefixes the failure detail while
/// keeping its transport class.
pub trait Context<T> {
    fn context(self, context: impl Into<String>) -> std::result::Result<T, TransportError>;
}

impl<T> Context<T> for std::result::Result<T, TransportError> {
    fn context(self, context: impl Into<String>) -> std::result::Result<T, TransportError> {
        let ctx = context.into();
        self.map_err(|source| source.map_detail(|detail| format!("{ctx}: {detail}")))
    }
}
