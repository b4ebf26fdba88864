//! Action handlers: thin orchestration over the execution-owning
//! collaborators.
//!
//! Handlers never panic the surface: delegate failures are logged at this
//! boundary and returned as values, and the busy flag is reset on every
//! path by an RAII guard, so a failed action can never leave the UI stuck
//! in a "processing" state. Responses that claim success without a
//! well-formed execution id are invariant violations and fail loudly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;

use crate::api::SessionApi;
use crate::engine::{ExecutionEngine, RerunOptions, StartOptions};
use crate::error::{ActionError, Error, InvariantError, Result};
use crate::model::ExecutionMessage;

/// Direct-mode fallback invoked by accept-and-start when no engine is
/// bound.
pub type AcceptFallback =
    Arc<dyn Fn(&str) -> BoxFuture<'static, std::result::Result<(), ActionError>> + Send + Sync>;

/// Accept/restore/rerun orchestration for one view of an execution.
pub struct ExecutionActions {
    engine: Option<Arc<dyn ExecutionEngine>>,
    api: Option<Arc<dyn SessionApi>>,
    session_id: Option<String>,
    accept_fallback: Option<AcceptFallback>,
    busy: Arc<AtomicBool>,
}

impl ExecutionActions {
    pub fn new() -> Self {
        Self {
            engine: None,
            api: None,
            session_id: None,
            accept_fallback: None,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn ExecutionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Remote start path for session-hosted executions.
    pub fn with_session(mut self, api: Arc<dyn SessionApi>, session_id: impl Into<String>) -> Self {
        self.api = Some(api);
        self.session_id = Some(session_id.into());
        self
    }

    /// Legacy/direct mode: invoked when no engine binding exists.
    pub fn with_accept_fallback(mut self, fallback: AcceptFallback) -> Self {
        self.accept_fallback = Some(fallback);
        self
    }

    /// Whether an action is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_busy(&self) -> std::result::Result<BusyGuard, ActionError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(ActionError::Busy);
        }
        Ok(BusyGuard(self.busy.clone()))
    }

    /// Accept the proposed batch and begin executing it, with an explicit
    /// non-auto-approve flag.
    pub async fn accept_and_start(&self, execution_id: &str) -> Result<()> {
        if execution_id.trim().is_empty() {
            return Err(Error::from(InvariantError::MissingExecutionId {
                operation: "accept_and_start",
            }));
        }
        let _busy = self.try_busy().map_err(Error::from)?;

        let outcome = self.dispatch_start(execution_id).await;
        if let Err(e) = &outcome {
            tracing::error!(execution_id, "accept-and-start failed: {e}");
        }
        outcome
    }

    async fn dispatch_start(&self, execution_id: &str) -> Result<()> {
        if let Some(engine) = &self.engine {
            return engine
                .start_execution(execution_id, StartOptions { auto_approve: false })
                .await
                .map_err(Error::from);
        }

        if let (Some(api), Some(session_id)) = (&self.api, &self.session_id) {
            let response = api
                .start_execution(session_id, execution_id, false)
                .await
                .map_err(Error::from)?;
            if !response.success {
                return Err(Error::from(ActionError::StartFailed {
                    execution_id: execution_id.to_string(),
                    reason: response.error.unwrap_or_else(|| "unspecified".to_string()),
                }));
            }
            let state = response.state.ok_or_else(|| {
                Error::from(InvariantError::SuccessWithoutState {
                    execution_id: execution_id.to_string(),
                })
            })?;
            if !well_formed_execution_id(&state.id) {
                return Err(Error::from(InvariantError::MalformedExecutionId {
                    operation: "accept_and_start",
                    value: state.id,
                }));
            }
            return Ok(());
        }

        if let Some(fallback) = &self.accept_fallback {
            return fallback(execution_id).await.map_err(Error::from);
        }

        Err(Error::from(ActionError::NotBound {
            operation: "accept_and_start",
        }))
    }

    /// Restore an interrupted batch. Only meaningful when the flow is
    /// interrupted; the engine re-attaches a live local transport, so the
    /// next subscription pick-up happens naturally.
    pub async fn restore(&self, execution_id: &str) -> Result<()> {
        if execution_id.trim().is_empty() {
            return Err(Error::from(InvariantError::MissingExecutionId {
                operation: "restore",
            }));
        }
        let _busy = self.try_busy().map_err(Error::from)?;

        let Some(engine) = &self.engine else {
            return Err(Error::from(ActionError::NotBound {
                operation: "restore",
            }));
        };
        let outcome = engine
            .restore_execution(execution_id)
            .await
            .map_err(Error::from);
        if let Err(e) = &outcome {
            tracing::error!(execution_id, "restore failed: {e}");
        }
        outcome
    }

    /// Re-run the plan of a completed batch. Returns the new execution id;
    /// the old, now-frozen batch is never mutated.
    pub async fn rerun(&self, message: &ExecutionMessage, opts: RerunOptions) -> Result<String> {
        let _busy = self.try_busy().map_err(Error::from)?;

        let Some(engine) = &self.engine else {
            return Err(Error::from(ActionError::NotBound { operation: "rerun" }));
        };
        let new_id = match engine.rerun_execution(message, opts).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(execution_id = %message.execution_id, "rerun failed: {e}");
                return Err(Error::from(e));
            }
        };

        if !well_formed_execution_id(&new_id) {
            return Err(Error::from(InvariantError::MalformedExecutionId {
                operation: "rerun",
                value: new_id,
            }));
        }
        if new_id == message.execution_id {
            return Err(Error::from(InvariantError::RerunReusedId {
                execution_id: new_id,
            }));
        }
        Ok(new_id)
    }
}

impl Default for ExecutionActions {
    fn default() -> Self {
        Self::new()
    }
}

fn well_formed_execution_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}

/// Resets the busy flag on drop, whatever path the handler took.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
