use crate::api::{ApiError, ErrorKind};

/// All errors possible to occur during reconciliation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error originating from the `kube-rs` crate
    #[error("Kubernetes reported error: {source}")]
    KubeError {
        #[from]
        source: kube::Error,
    },

    /// Error in user input or resource definition, typically missing
    /// or conflicting fields.
    #[error("Invalid resource: {0}")]
    UserInputError(String),

    /// Chrono date parsing error
    #[error("Failed to parse DateTime: {source}")]
    ChronoError {
        #[from]
        source: chrono::ParseError,
    },

    #[error("Out of range: {source}")]
    OutOfRangeError {
        #[from]
        source: chrono::OutOfRangeError,
    },

    #[error("Failed to serialize resource: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// A `timeouts` value that is not a valid duration string.
    #[error("Invalid duration '{value}': {message}")]
    DurationError { value: String, message: String },

    /// Error reported by the AgentCore control plane.
    #[error("AgentCore control plane error: {source}")]
    ApiError {
        #[from]
        source: ApiError,
    },

    /// The remote object could not be found after all allowed attempts.
    #[error("couldn't find resource: {0}")]
    NotFound(String),

    /// A lookup succeeded but returned nothing usable.
    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("timeout while waiting for state to become '{expected}' (last state: '{last_state}')")]
    Timeout {
        last_state: String,
        expected: String,
    },

    #[error(
        "unexpected state '{state}', wanted target '{expected}'. last error: {}",
        .reason.as_deref().unwrap_or("none")
    )]
    UnexpectedState {
        state: String,
        expected: String,
        reason: Option<String>,
    },

    /// The remote object was created but never reached its target
    /// status. The id is kept so the object is not leaked.
    #[error("{id} was created but is not usable: {source}")]
    Tainted {
        id: String,
        #[source]
        source: Box<Error>,
    },

    /// An in-place update was requested for a kind that only
    /// supports replacement.
    #[error("{0} does not support in-place updates")]
    Immutable(String),
}

impl Error {
    /// Returns the control plane classification, if this error
    /// originated from the control plane.
    pub fn api_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::ApiError { source } => Some(source.kind()),
            _ => None,
        }
    }

    /// True when the same operation is expected to succeed if it is
    /// attempted again later. Kubernetes errors are always retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::KubeError { .. } => true,
            Error::ApiError { source } => source.is_retryable(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) | Error::EmptyResult(_) => true,
            Error::ApiError { source } => source.is_not_found(),
            _ => false,
        }
    }

    /// Marks the error as having happened after `id` was created.
    pub fn tainted(self, id: &str) -> Error {
        Error::Tainted {
            id: id.to_owned(),
            source: Box::new(self),
        }
    }
}
