//! Error types for dotsync.

use serde::Serialize;

/// Top-level error type for the sync engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantError),
}

/// Failure domains surfaced to status consumers.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDomain {
    Config,
    Transport,
    Api,
    Action,
    Invariant,
}

/// Structured error payload for status surfaces.
///
/// Transports recover retryable failures internally; this envelope exists
/// for the cases that do reach a consumer, so the UI can distinguish
/// "stopped tracking, restore available" from hard failures.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncErrorPayload {
    pub domain: ErrorDomain,
    pub code: &'static str,
    pub retryable: bool,
    pub message: String,
}

impl SyncErrorPayload {
    fn new(
        domain: ErrorDomain,
        code: &'static str,
        retryable: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            code,
            retryable,
            message: message.into(),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Transport-layer errors. Recovered locally by retry within the adapter's
/// budget; never propagated to the UI as a hard error while budget remains.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No transport available for execution {execution_id}: {reason}")]
    Unavailable {
        execution_id: String,
        reason: String,
    },

    #[error("Push channel send failed: {reason}")]
    PushSendFailed { reason: String },

    #[error("Push channel closed: {reason}")]
    PushClosed { reason: String },

    #[error("Push event stream lagged, {skipped} events dropped")]
    PushLagged { skipped: u64 },

    #[error(
        "Polling stopped for execution {execution_id} after {consecutive} consecutive failures"
    )]
    PollingExhausted {
        execution_id: String,
        consecutive: u32,
    },
}

/// Request/response errors from the session API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Request rejected: {message}")]
    Rejected { message: String },
}

impl ApiError {
    /// Whether a polling loop should count this as a transient failure and
    /// keep trying (within budget) rather than stop immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidBody(_) | Self::Rejected { .. } => false,
        }
    }
}

/// Action handler errors (accept-and-start, restore, rerun).
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("No engine or fallback bound for {operation}")]
    NotBound { operation: &'static str },

    #[error("Another action is still in progress")]
    Busy,

    #[error("Start failed for execution {execution_id}: {reason}")]
    StartFailed {
        execution_id: String,
        reason: String,
    },

    #[error("Restore failed for execution {execution_id}: {reason}")]
    RestoreFailed {
        execution_id: String,
        reason: String,
    },

    #[error("Rerun failed for execution {execution_id}: {reason}")]
    RerunFailed {
        execution_id: String,
        reason: String,
    },
}

/// Invariant violations. These fail loudly to the caller: masking them
/// would corrupt deduplication and classification downstream.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
    #[error("{operation} requires an execution id")]
    MissingExecutionId { operation: &'static str },

    #[error("{operation} produced a malformed execution id: {value:?}")]
    MalformedExecutionId {
        operation: &'static str,
        value: String,
    },

    #[error("Response claimed success without a state for execution {execution_id}")]
    SuccessWithoutState { execution_id: String },

    #[error(
        "Rerun returned the original execution id {execution_id}; a frozen batch is never mutated"
    )]
    RerunReusedId { execution_id: String },
}

impl Error {
    /// Map engine errors into a structured surface for status consumers.
    pub fn to_payload(&self) -> SyncErrorPayload {
        match self {
            Self::Config(err) => SyncErrorPayload::new(
                ErrorDomain::Config,
                "config.invalid",
                false,
                err.to_string(),
            ),
            Self::Transport(err) => match err {
                TransportError::Unavailable { .. } => SyncErrorPayload::new(
                    ErrorDomain::Transport,
                    "transport.unavailable",
                    false,
                    err.to_string(),
                ),
                TransportError::PushSendFailed { .. } => SyncErrorPayload::new(
                    ErrorDomain::Transport,
                    "transport.push_send_failed",
                    true,
                    err.to_string(),
                ),
                TransportError::PushClosed { .. } => SyncErrorPayload::new(
                    ErrorDomain::Transport,
                    "transport.push_closed",
                    true,
                    err.to_string(),
                ),
                TransportError::PushLagged { .. } => SyncErrorPayload::new(
                    ErrorDomain::Transport,
                    "transport.push_lagged",
                    true,
                    err.to_string(),
                ),
                TransportError::PollingExhausted { .. } => SyncErrorPayload::new(
                    ErrorDomain::Transport,
                    "transport.polling_exhausted",
                    true,
                    err.to_string(),
                ),
            },
            Self::Api(err) => SyncErrorPayload::new(
                ErrorDomain::Api,
                "api.request_failed",
                err.is_transient(),
                err.to_string(),
            ),
            Self::Action(err) => match err {
                ActionError::NotBound { .. } => SyncErrorPayload::new(
                    ErrorDomain::Action,
                    "action.not_bound",
                    false,
                    err.to_string(),
                ),
                ActionError::Busy => {
                    SyncErrorPayload::new(ErrorDomain::Action, "action.busy", true, err.to_string())
                }
                ActionError::StartFailed { .. } => SyncErrorPayload::new(
                    ErrorDomain::Action,
                    "action.start_failed",
                    true,
                    err.to_string(),
                ),
                ActionError::RestoreFailed { .. } => SyncErrorPayload::new(
                    ErrorDomain::Action,
                    "action.restore_failed",
                    true,
                    err.to_string(),
                ),
                ActionError::RerunFailed { .. } => SyncErrorPayload::new(
                    ErrorDomain::Action,
                    "action.rerun_failed",
                    true,
                    err.to_string(),
                ),
            },
            Self::Invariant(err) => SyncErrorPayload::new(
                ErrorDomain::Invariant,
                "invariant.violated",
                false,
                err.to_string(),
            ),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.to_payload().retryable
    }
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_api_status_classification() {
        assert!(
            ApiError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }
            .is_transient()
        );
        assert!(
            ApiError::Status {
                status: 429,
                body: "slow down".to_string(),
            }
            .is_transient()
        );
        assert!(
            !ApiError::Status {
                status: 404,
                body: "no such execution".to_string(),
            }
            .is_transient()
        );
    }

    #[test]
    fn maps_transport_exhaustion_as_retryable() {
        let err = Error::from(TransportError::PollingExhausted {
            execution_id: "exec-1".to_string(),
            consecutive: 5,
        });
        let payload = err.to_payload();

        assert_eq!(payload.domain, ErrorDomain::Transport);
        assert_eq!(payload.code, "transport.polling_exhausted");
        assert!(payload.retryable);
    }

    #[test]
    fn maps_invariant_violations_as_fatal() {
        let err = Error::from(InvariantError::RerunReusedId {
            execution_id: "exec-1".to_string(),
        });
        let payload = err.to_payload();

        assert_eq!(payload.domain, ErrorDomain::Invariant);
        assert!(!payload.retryable);
    }

    #[test]
    fn maps_action_not_bound_as_terminal() {
        let err = Error::from(ActionError::NotBound {
            operation: "accept_and_start",
        });
        let payload = err.to_payload();

        assert_eq!(payload.code, "action.not_bound");
        assert!(!payload.retryable);
    }
}
