//! Polling adapter: request/response fallback when no push channel exists.
//!
//! Interval policy: poll at the preparation interval (2s default) while
//! the batch is still being assembled or approved; switch to the execution
//! interval (1s default) permanently once any item is observed in flight,
//! and probe at the execution interval every Nth preparation tick so a
//! start observed late is picked up quickly. Polling stops permanently
//! once the flow completes, once the consecutive-failure budget is spent,
//! or once the no-change budget is spent. That last case is reported as
//! "stopped tracking", not as fatal: the batch may still be recoverable
//! via restore.
//!
//! On each successful poll the adapter also checks whether the local
//! engine has begun tracking the id in the meantime; if so it attaches the
//! local adapter and hands off, preserving the illusion of one continuous
//! subscription.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::api::SessionApi;
use crate::backend::backend_status;
use crate::classify::is_flow_complete;
use crate::config::SyncConfig;
use crate::engine::{ExecutionEngine, UpdateGuard};
use crate::transport::{UpdateGate, local::attach_local};

/// Why a polling loop ended on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStop {
    /// Flow completion observed; the batch is settled.
    Completed,
    /// Consecutive request failures exhausted the retry budget.
    FailuresExhausted(u32),
    /// Nothing changed for the configured number of polls.
    UnchangedExhausted(u32),
}

pub(crate) struct PollArgs {
    pub api: Arc<dyn SessionApi>,
    pub engine: Option<Arc<dyn ExecutionEngine>>,
    pub gate: Arc<UpdateGate>,
    pub config: SyncConfig,
    pub session_id: String,
    pub execution_id: String,
    /// Invoked with the local guard when polling hands off to the local
    /// adapter.
    pub on_handoff: Box<dyn FnOnce(UpdateGuard) + Send>,
    /// Invoked when polling stops on its own (not on detach).
    pub on_stopped: Box<dyn FnOnce(PollStop) + Send>,
}

pub(crate) struct PollAttachment {
    pub shutdown: oneshot::Sender<()>,
    pub task: JoinHandle<()>,
}

pub(crate) fn attach_poll(args: PollArgs) -> PollAttachment {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let PollArgs {
            api,
            engine,
            gate,
            config,
            session_id,
            execution_id,
            on_handoff,
            on_stopped,
        } = args;
        tracing::debug!(%execution_id, "polling adapter attached");

        let mut fast = false;
        let mut prep_ticks: u32 = 0;
        let mut failures: u32 = 0;
        let mut unchanged: u32 = 0;

        loop {
            let probe_tick = !fast
                && prep_ticks > 0
                && config.preparation_ticks_per_probe > 0
                && prep_ticks.is_multiple_of(config.preparation_ticks_per_probe);
            let delay = if fast || probe_tick {
                config.execution_interval
            } else {
                config.preparation_interval
            };

            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!(%execution_id, "polling adapter detached");
                    return;
                }
                _ = sleep(delay) => {}
            }

            match api.fetch_execution(&session_id, &execution_id).await {
                Ok(response) if response.success => {
                    failures = 0;
                    match response.state {
                        Some(state) if state.id == execution_id => {
                            if state.is_executing
                                || state.items.iter().any(|i| i.status.is_in_flight())
                            {
                                fast = true;
                            }
                            let complete = is_flow_complete(&state);
                            if gate.offer(state) {
                                unchanged = 0;
                            } else {
                                unchanged += 1;
                            }
                            if complete {
                                tracing::debug!(%execution_id, "flow complete, polling stops");
                                on_stopped(PollStop::Completed);
                                return;
                            }
                        }
                        Some(state) => {
                            tracing::warn!(
                                %execution_id,
                                got = %state.id,
                                "dropping poll response for a different execution"
                            );
                            unchanged += 1;
                        }
                        None => {
                            // Batch not materialized on the session yet.
                            unchanged += 1;
                        }
                    }
                    if unchanged >= config.max_unchanged_polls {
                        tracing::info!(
                            %execution_id,
                            polls = unchanged,
                            "stopped tracking after unchanged polls"
                        );
                        on_stopped(PollStop::UnchangedExhausted(unchanged));
                        return;
                    }
                }
                Ok(response) => {
                    failures += 1;
                    tracing::debug!(
                        %execution_id,
                        consecutive = failures,
                        error = response.error.as_deref().unwrap_or("unspecified"),
                        "poll rejected by session"
                    );
                    if failures >= config.max_consecutive_failures {
                        on_stopped(PollStop::FailuresExhausted(failures));
                        return;
                    }
                }
                Err(e) => {
                    failures += 1;
                    tracing::debug!(%execution_id, consecutive = failures, "poll failed: {e}");
                    if failures >= config.max_consecutive_failures {
                        if e.is_transient() {
                            backend_status().mark_down();
                        }
                        tracing::info!(
                            %execution_id,
                            consecutive = failures,
                            "stopped tracking after repeated poll failures"
                        );
                        on_stopped(PollStop::FailuresExhausted(failures));
                        return;
                    }
                }
            }

            // Hand-off: the engine may have begun tracking the id since
            // the last tick (e.g. after a restore).
            if let Some(engine) = engine.as_ref()
                && engine.get_execution_array(&execution_id).is_some()
                && let Some(guard) = attach_local(engine, &execution_id, gate.clone())
            {
                // Bring the display up to the local truth; the gate drops
                // it when it matches what polling already delivered.
                if let Some(handle) = engine.get_execution_array(&execution_id) {
                    gate.offer(handle.get_state());
                }
                tracing::info!(%execution_id, "handing off polling to local adapter");
                on_handoff(guard);
                return;
            }

            if !fast {
                prep_ticks += 1;
            }
        }
    });

    PollAttachment {
        shutdown: shutdown_tx,
        task,
    }
}
