//! Push adapter: batch state delivered over a client-held push channel.
//!
//! On attach the adapter announces interest with a subscribe command and
//! filters the shared inbound stream down to its execution id; on shutdown
//! it announces unsubscribe before the task exits, so a detach that
//! completes has definitely told the gateway.

use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::error::TransportError;
use crate::push::{PushChannel, PushCommand, PushEvent};
use crate::transport::UpdateGate;

pub(crate) struct PushAttachment {
    pub shutdown: oneshot::Sender<()>,
    pub task: JoinHandle<()>,
}

pub(crate) async fn attach_push(
    channel: Arc<dyn PushChannel>,
    session_id: String,
    execution_id: String,
    gate: Arc<UpdateGate>,
) -> Result<PushAttachment, TransportError> {
    // Take the receiver before announcing interest so no event can slip
    // between the subscribe command and the first recv.
    let mut events = channel.events();
    channel
        .send(PushCommand::SubscribeExecution {
            session_id: session_id.clone(),
            execution_id: execution_id.clone(),
        })
        .await?;
    tracing::debug!(%execution_id, "push adapter attached");

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                event = events.recv() => match event {
                    Ok(PushEvent::ExecutionUpdate { execution_id: id, state }) => {
                        if id != execution_id {
                            continue;
                        }
                        gate.offer(state);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            %execution_id,
                            skipped,
                            "push event stream lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!(%execution_id, "push channel closed");
                        break;
                    }
                },
            }
        }
        let _ = channel
            .send(PushCommand::UnsubscribeExecution {
                session_id,
                execution_id: execution_id.clone(),
            })
            .await;
        tracing::debug!(%execution_id, "push adapter detached");
    });

    Ok(PushAttachment {
        shutdown: shutdown_tx,
        task,
    })
}
