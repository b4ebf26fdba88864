//! Transport adapters: the three interchangeable sources of batch state.
//!
//! Every adapter funnels through one [`UpdateGate`]: incoming states pass
//! the change detector against the last accepted state, and accepted ones
//! are handed to the deferred scheduler. There is no other write path into
//! the displayed state.

pub(crate) mod local;
pub mod poll;
pub(crate) mod push;

use std::sync::Mutex;

use crate::diff::has_changed;
use crate::model::ExecutionArrayState;
use crate::scheduler::UpdateScheduler;

/// Accept gate shared by whichever transport is live for one subscription.
pub(crate) struct UpdateGate {
    last_accepted: Mutex<Option<ExecutionArrayState>>,
    scheduler: UpdateScheduler,
}

impl UpdateGate {
    /// `seed` is the initially displayed value; it counts as already
    /// applied so the first transport event is only delivered if it
    /// actually differs.
    pub(crate) fn new(scheduler: UpdateScheduler, seed: Option<ExecutionArrayState>) -> Self {
        Self {
            last_accepted: Mutex::new(seed),
            scheduler,
        }
    }

    /// Offer a freshly received state. Returns whether it was accepted;
    /// rejected states are silently dropped (idempotent no-ops).
    pub(crate) fn offer(&self, next: ExecutionArrayState) -> bool {
        let mut last = self.last_accepted.lock().expect("update gate lock");
        if !has_changed(&next, last.as_ref()) {
            return false;
        }
        *last = Some(next.clone());
        drop(last);
        self.scheduler.schedule(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::model::{ExecutionItem, ItemStatus};

    fn gate_with_counter() -> (Arc<UpdateGate>, Arc<AtomicUsize>) {
        let applied = Arc::new(AtomicUsize::new(0));
        let counter = applied.clone();
        let scheduler = UpdateScheduler::spawn(
            Duration::from_millis(1),
            Duration::from_millis(20),
            move |_state| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        (Arc::new(UpdateGate::new(scheduler, None)), applied)
    }

    #[tokio::test]
    async fn duplicate_states_are_rejected() {
        let (gate, applied) = gate_with_counter();
        let state = ExecutionArrayState::new("exec-1")
            .with_items(vec![ExecutionItem::new("op-0", ItemStatus::Pending)]);

        assert!(gate.offer(state.clone()));
        assert!(!gate.offer(state.clone()));
        assert!(!gate.offer(state));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(applied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn seed_counts_as_already_applied() {
        let seed = ExecutionArrayState::new("exec-1")
            .with_items(vec![ExecutionItem::new("op-0", ItemStatus::Pending)]);
        let scheduler =
            UpdateScheduler::spawn(Duration::from_millis(1), Duration::from_millis(20), |_| {});
        let gate = UpdateGate::new(scheduler, Some(seed.clone()));

        assert!(!gate.offer(seed.clone()));

        let mut moved = seed;
        moved.items[0].status = ItemStatus::Executing;
        assert!(gate.offer(moved));
    }
}
