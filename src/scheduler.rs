//! Deferred application of accepted state changes.
//!
//! Transports can emit sub-second bursts (simulation progress especially);
//! applying each one synchronously on the interaction path causes visible
//! jank. Accepted states are queued to a dedicated apply task instead,
//! which lets a burst settle briefly before publishing but never sits on an
//! update longer than the configured ceiling.
//!
//! This is a scheduling policy, not a correctness mechanism: an update is
//! applied no earlier than it was accepted, and applied updates preserve
//! acceptance order, but intermediate states of a burst may be skipped and
//! no guarantee exists beyond that.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};

use crate::model::ExecutionArrayState;

/// Handle to the apply task. Dropping it closes the queue and ends the
/// task once the backlog drains.
pub struct UpdateScheduler {
    tx: mpsc::UnboundedSender<ExecutionArrayState>,
}

impl UpdateScheduler {
    /// Spawn the apply task. `apply` is the single write path into the
    /// displayed-state slot.
    pub fn spawn(
        idle_gap: Duration,
        ceiling: Duration,
        mut apply: impl FnMut(ExecutionArrayState) + Send + 'static,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ExecutionArrayState>();

        tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let deadline = Instant::now() + ceiling;
                let mut latest = first;
                let mut open = true;
                // Let the burst settle, bounded by the ceiling.
                loop {
                    let gap = idle_gap.min(deadline.saturating_duration_since(Instant::now()));
                    if gap.is_zero() {
                        break;
                    }
                    match timeout_at(Instant::now() + gap, rx.recv()).await {
                        Ok(Some(newer)) => latest = newer,
                        Ok(None) => {
                            open = false;
                            break;
                        }
                        Err(_) => break,
                    }
                }
                apply(latest);
                if !open {
                    break;
                }
                tokio::task::yield_now().await;
            }
            tracing::debug!("update scheduler apply task stopped");
        });

        Self { tx }
    }

    /// Queue an accepted state for application. Never blocks. Returns
    /// `false` if the apply task is gone (post-detach); the update is
    /// dropped, which is safe because a detached view no longer renders.
    pub fn schedule(&self, state: ExecutionArrayState) -> bool {
        self.tx.send(state).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::model::{ExecutionItem, ItemStatus};

    fn state_with_marker(marker: usize) -> ExecutionArrayState {
        ExecutionArrayState::new("exec-1").with_items(vec![ExecutionItem::new(
            format!("op-{marker}"),
            ItemStatus::Pending,
        )])
    }

    fn marker_of(state: &ExecutionArrayState) -> usize {
        state.items[0]
            .id
            .trim_start_matches("op-")
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn single_update_is_applied_within_ceiling() {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let sink = applied.clone();
        let scheduler = UpdateScheduler::spawn(
            Duration::from_millis(5),
            Duration::from_millis(100),
            move |state| sink.lock().unwrap().push(marker_of(&state)),
        );

        assert!(scheduler.schedule(state_with_marker(7)));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(applied.lock().unwrap().as_slice(), &[7]);
    }

    #[tokio::test]
    async fn burst_coalesces_and_preserves_acceptance_order() {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let sink = applied.clone();
        let scheduler = UpdateScheduler::spawn(
            Duration::from_millis(20),
            Duration::from_millis(100),
            move |state| sink.lock().unwrap().push(marker_of(&state)),
        );

        for marker in 0..5 {
            assert!(scheduler.schedule(state_with_marker(marker)));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let applied = applied.lock().unwrap();
        assert!(!applied.is_empty());
        assert!(applied.len() <= 5);
        // Applied markers are a strictly increasing subsequence ending at
        // the newest accepted state.
        assert!(applied.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*applied.last().unwrap(), 4);
    }

    #[tokio::test]
    async fn schedule_after_apply_task_death_reports_false() {
        let scheduler = UpdateScheduler::spawn(
            Duration::from_millis(1),
            Duration::from_millis(10),
            |_state| panic!("apply task died"),
        );
        assert!(scheduler.schedule(state_with_marker(0)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!scheduler.schedule(state_with_marker(1)));
    }
}
