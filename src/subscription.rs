//! Subscription management: exactly one live transport per execution id.
//!
//! `attach` seeds the displayed value, decides which transport applies,
//! wires it through the shared accept gate, and returns a single handle
//! whose `detach` releases whatever ended up active. Control flow is a set
//! of explicit state transitions (idle → local | push | polling →
//! handed-off → detached) rather than nested conditionals, so hand-off and
//! re-entrancy behavior stay testable.
//!
//! Callers must detach before re-attaching whenever the execution id
//! changes. A change of callback identity alone is not a reason to
//! re-attach.

use std::sync::Arc;
use std::sync::Mutex;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::api::SessionApi;
use crate::classify::{FlowStatus, classify};
use crate::config::SyncConfig;
use crate::engine::{ExecutionEngine, UpdateGuard};
use crate::error::{Error, InvariantError, Result, TransportError};
use crate::model::{ExecutionArrayState, ExecutionMessage};
use crate::push::PushChannel;
use crate::scheduler::UpdateScheduler;
use crate::transport::poll::{PollArgs, PollStop, attach_poll};
use crate::transport::push::attach_push;
use crate::transport::{UpdateGate, local::attach_local};

/// Observer invoked from the apply path for every delivered state.
pub type StateObserver = Arc<dyn Fn(&ExecutionArrayState) + Send + Sync>;

/// Where a subscription currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// No transport attached; displaying a snapshot (frozen view).
    Idle,
    Local,
    Push,
    Polling,
    /// Polling replaced by the local adapter mid-subscription.
    HandedOff,
    /// Polling stopped on its own (completion or exhausted budgets).
    Stopped,
    Detached,
}

impl SubscriptionState {
    /// Whether state is currently arriving through a live transport.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Local | Self::Push | Self::Polling | Self::HandedOff
        )
    }
}

type Teardown = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct Shared {
    state: Mutex<SubscriptionState>,
    teardowns: Mutex<Vec<Teardown>>,
    stop_reason: Mutex<Option<PollStop>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(SubscriptionState::Idle),
            teardowns: Mutex::new(Vec::new()),
            stop_reason: Mutex::new(None),
        }
    }

    fn set_state(&self, next: SubscriptionState) {
        *self.state.lock().expect("subscription state lock") = next;
    }

    fn state(&self) -> SubscriptionState {
        *self.state.lock().expect("subscription state lock")
    }

    fn push_teardown(&self, teardown: Teardown) {
        self.teardowns
            .lock()
            .expect("subscription teardown lock")
            .push(teardown);
    }
}

/// Live subscription to one execution batch.
///
/// Dropping the handle without `detach` leaks the transport tasks until
/// the process ends; always detach on unmount or before re-attaching for a
/// different execution id.
pub struct SubscriptionHandle {
    execution_id: String,
    shared: Arc<Shared>,
    state_rx: watch::Receiver<Option<ExecutionArrayState>>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("execution_id", &self.execution_id)
            .finish_non_exhaustive()
    }
}

impl SubscriptionHandle {
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// The currently displayed state, if any.
    pub fn current(&self) -> Option<ExecutionArrayState> {
        self.state_rx.borrow().clone()
    }

    /// A fresh receiver on the displayed-state slot.
    pub fn state_rx(&self) -> watch::Receiver<Option<ExecutionArrayState>> {
        self.state_rx.clone()
    }

    /// The displayed-state slot as a stream.
    pub fn state_stream(&self) -> WatchStream<Option<ExecutionArrayState>> {
        WatchStream::new(self.state_rx.clone())
    }

    pub fn transport_state(&self) -> SubscriptionState {
        self.shared.state()
    }

    /// Why polling stopped, when it has.
    pub fn stop_reason(&self) -> Option<PollStop> {
        *self.shared.stop_reason.lock().expect("stop reason lock")
    }

    /// Classify the current state, feeding in whether a live transport is
    /// attached (drives the interrupted flag).
    pub fn flow(&self) -> Option<FlowStatus> {
        let live = self.transport_state().is_live();
        self.current().map(|state| classify(&state, live))
    }

    /// Tear down whichever transport(s) are active. Idempotent. A hand-off
    /// may have left two registered teardowns; both are released.
    pub async fn detach(&self) {
        let teardowns: Vec<Teardown> = {
            let mut held = self
                .shared
                .teardowns
                .lock()
                .expect("subscription teardown lock");
            held.drain(..).collect()
        };
        for teardown in teardowns {
            teardown().await;
        }
        self.shared.set_state(SubscriptionState::Detached);
        tracing::debug!(execution_id = %self.execution_id, "subscription detached");
    }
}

/// Attachment options beyond the message itself.
#[derive(Default)]
pub struct AttachOptions {
    /// Remote session hosting the execution, when there is one.
    pub session_id: Option<String>,
    /// Push channel to prefer over polling for remote tracking.
    pub push: Option<Arc<dyn PushChannel>>,
    /// Observer invoked from the apply path for each delivered state.
    pub on_state: Option<StateObserver>,
}

/// Chooses and wires exactly one live transport per execution id.
pub struct SubscriptionManager {
    config: SyncConfig,
    api: Option<Arc<dyn SessionApi>>,
}

impl SubscriptionManager {
    pub fn new(config: SyncConfig) -> Self {
        Self { config, api: None }
    }

    /// Session API used by the polling fallback.
    pub fn with_api(mut self, api: Arc<dyn SessionApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Attach a subscription for the execution referenced by `message`.
    ///
    /// Seeds the displayed value from the engine's local state when the id
    /// is tracked, else from the message snapshot. Remote tracking is
    /// needed iff a session id is supplied and the engine does not track
    /// the id; push is preferred over polling when a channel is supplied.
    pub async fn attach(
        &self,
        message: &ExecutionMessage,
        engine: Option<Arc<dyn ExecutionEngine>>,
        opts: AttachOptions,
    ) -> Result<SubscriptionHandle> {
        let execution_id = message.execution_id.trim();
        if execution_id.is_empty() {
            return Err(Error::from(InvariantError::MissingExecutionId {
                operation: "attach",
            }));
        }

        let local = engine
            .as_ref()
            .and_then(|e| e.get_execution_array(execution_id));
        let seed = local
            .as_ref()
            .map(|handle| handle.get_state())
            .or_else(|| message.execution_array.clone());

        let (watch_tx, state_rx) = watch::channel(seed.clone());
        let observer = opts.on_state;
        let scheduler = UpdateScheduler::spawn(
            self.config.apply_idle_gap,
            self.config.apply_ceiling,
            move |state| {
                if let Some(observer) = &observer {
                    observer(&state);
                }
                let _ = watch_tx.send(Some(state));
            },
        );
        let gate = Arc::new(UpdateGate::new(scheduler, seed));
        let shared = Arc::new(Shared::new());

        let remote_needed = opts.session_id.is_some() && local.is_none();
        if !remote_needed {
            if local.is_some()
                && let Some(engine) = engine.as_ref()
                && let Some(guard) = attach_local(engine, execution_id, gate.clone())
            {
                shared.set_state(SubscriptionState::Local);
                shared.push_teardown(local_teardown(guard));
            }
            // Otherwise: no session and no local tracking. The snapshot is
            // all there is; the view stays idle (frozen).
        } else if let Some(push) = opts.push {
            let session_id = opts.session_id.expect("checked by remote_needed");
            let attachment = attach_push(
                push,
                session_id,
                execution_id.to_string(),
                gate.clone(),
            )
            .await?;
            shared.set_state(SubscriptionState::Push);
            shared.push_teardown(Box::new(move || {
                Box::pin(async move {
                    let _ = attachment.shutdown.send(());
                    let _ = attachment.task.await;
                })
            }));
        } else {
            let session_id = opts.session_id.expect("checked by remote_needed");
            let api = self
                .api
                .clone()
                .ok_or_else(|| TransportError::Unavailable {
                    execution_id: execution_id.to_string(),
                    reason: "remote tracking needs a push channel or a session API".to_string(),
                })?;

            let handoff_shared = shared.clone();
            let on_handoff = Box::new(move |guard: UpdateGuard| {
                handoff_shared.push_teardown(local_teardown(guard));
                handoff_shared.set_state(SubscriptionState::HandedOff);
            });
            let stopped_shared = shared.clone();
            let on_stopped = Box::new(move |stop: PollStop| {
                *stopped_shared
                    .stop_reason
                    .lock()
                    .expect("stop reason lock") = Some(stop);
                stopped_shared.set_state(SubscriptionState::Stopped);
            });

            let attachment = attach_poll(PollArgs {
                api,
                engine: engine.clone(),
                gate: gate.clone(),
                config: self.config.clone(),
                session_id,
                execution_id: execution_id.to_string(),
                on_handoff,
                on_stopped,
            });
            shared.set_state(SubscriptionState::Polling);
            shared.push_teardown(Box::new(move || {
                Box::pin(async move {
                    let _ = attachment.shutdown.send(());
                    let _ = attachment.task.await;
                })
            }));
        }

        tracing::debug!(
            execution_id,
            transport = ?shared.state(),
            "subscription attached"
        );
        Ok(SubscriptionHandle {
            execution_id: execution_id.to_string(),
            shared,
            state_rx,
        })
    }
}

fn local_teardown(guard: UpdateGuard) -> Teardown {
    Box::new(move || {
        Box::pin(async move {
            guard.unsubscribe();
        })
    })
}
