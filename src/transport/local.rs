//! Local adapter: the batch is owned by this client's engine.
//!
//! Cheapest transport and preferred whenever the engine tracks the id.
//! Partial events (item status, simulation progress, pause) refetch the
//! full state through the read handle; the gate decides whether anything
//! meaningful changed.

use std::sync::Arc;

use crate::engine::{EngineEvent, ExecutionEngine, UpdateGuard};
use crate::transport::UpdateGate;

pub(crate) fn attach_local(
    engine: &Arc<dyn ExecutionEngine>,
    execution_id: &str,
    gate: Arc<UpdateGate>,
) -> Option<UpdateGuard> {
    let handle = engine.get_execution_array(execution_id)?;
    let id = execution_id.to_string();

    let guard = engine.on_execution_update(
        execution_id,
        Box::new(move |event| {
            let state = match event {
                EngineEvent::StateChanged(state) => state,
                EngineEvent::ItemStatusChanged { .. }
                | EngineEvent::SimulationProgress { .. }
                | EngineEvent::PauseChanged { .. } => handle.get_state(),
            };
            if state.id != id {
                tracing::warn!(
                    execution_id = %id,
                    got = %state.id,
                    "dropping misrouted engine event"
                );
                return;
            }
            gate.offer(state);
        }),
    )?;

    tracing::debug!(execution_id, "local adapter attached");
    Some(guard)
}
