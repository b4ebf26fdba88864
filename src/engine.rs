//! Surface of the local execution-owning engine, as consumed by the sync
//! layer.
//!
//! The engine itself (signing, broadcasting, plan execution) lives outside
//! this crate; these traits are the seam. Events are a closed tagged union
//! so a new event kind is a compile-time-visible addition at every match
//! site.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ActionError;
use crate::model::{ExecutionArrayState, ExecutionMessage, ItemStatus, SimulationStatus};

/// Event emitted by the engine for one tracked execution.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Full replacement state for the batch.
    StateChanged(ExecutionArrayState),
    /// A single item moved; listeners refetch the full state.
    ItemStatusChanged {
        execution_id: String,
        item_id: String,
        status: ItemStatus,
    },
    /// Simulation progress for a single item.
    SimulationProgress {
        execution_id: String,
        item_id: String,
        status: SimulationStatus,
    },
    /// The batch was paused or resumed.
    PauseChanged { execution_id: String, paused: bool },
}

/// Options for starting an execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    pub auto_approve: bool,
}

/// Options for rerunning a frozen execution with the same plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct RerunOptions {
    pub auto_approve: bool,
}

/// Read handle to one tracked batch.
pub trait ExecutionArray: Send + Sync {
    fn get_state(&self) -> ExecutionArrayState;
}

/// Listener invoked for each engine event of a subscribed execution id.
pub type EngineListener = Box<dyn Fn(EngineEvent) + Send + Sync>;

/// Unsubscribe handle for an engine update stream. Unsubscribes on drop;
/// call [`UpdateGuard::unsubscribe`] to do it explicitly.
pub struct UpdateGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl UpdateGuard {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for UpdateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateGuard")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The execution-owning collaborator.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Read handle for a batch, or `None` when this engine does not track
    /// the id locally.
    fn get_execution_array(&self, execution_id: &str) -> Option<Arc<dyn ExecutionArray>>;

    /// Subscribe to the per-id update stream. `None` when the id is not
    /// tracked locally.
    fn on_execution_update(
        &self,
        execution_id: &str,
        listener: EngineListener,
    ) -> Option<UpdateGuard>;

    /// Begin executing an approved batch.
    async fn start_execution(
        &self,
        execution_id: &str,
        opts: StartOptions,
    ) -> std::result::Result<(), ActionError>;

    /// Re-attach an interrupted batch; the engine resumes local tracking,
    /// so a subsequent subscription pick-up happens naturally.
    async fn restore_execution(&self, execution_id: &str) -> std::result::Result<(), ActionError>;

    /// Re-run the plan of a frozen batch. Returns the new execution id;
    /// the old batch is never mutated.
    async fn rerun_execution(
        &self,
        message: &ExecutionMessage,
        opts: RerunOptions,
    ) -> std::result::Result<String, ActionError>;
}
