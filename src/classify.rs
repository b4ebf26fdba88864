//! Pure status classification: raw per-item statuses in, user-facing flow
//! state out.
//!
//! The predicates are evaluated in dependency order (complete before
//! executing/successful/failed) because later ones consult the earlier
//! results to resolve ties. An empty, non-executing batch is classified as
//! pending, never as successful or failed.

use serde::Serialize;

use crate::model::{ExecutionArrayState, ItemStatus};

/// Coarse user-facing flow state derived from [`FlowStatus`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Batch still being assembled or mixed progress with nothing driving.
    Pending,
    WaitingForApproval,
    Executing,
    /// Every item terminal but neither all-ok nor any failed (e.g. all
    /// cancelled).
    Complete,
    Successful,
    Failed,
    /// Displayed from a historical snapshot, abandoned mid-flight.
    Interrupted,
}

/// The full set of derived flow flags for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowStatus {
    pub is_waiting_for_approval: bool,
    pub is_flow_complete: bool,
    pub is_flow_executing: bool,
    pub is_flow_successful: bool,
    pub is_flow_failed: bool,
    pub is_flow_interrupted: bool,
}

impl FlowStatus {
    /// Collapse the flags into one coarse state for rendering.
    pub fn state(&self) -> FlowState {
        if self.is_flow_interrupted {
            FlowState::Interrupted
        } else if self.is_flow_successful {
            FlowState::Successful
        } else if self.is_flow_failed {
            FlowState::Failed
        } else if self.is_flow_complete {
            FlowState::Complete
        } else if self.is_flow_executing {
            FlowState::Executing
        } else if self.is_waiting_for_approval {
            FlowState::WaitingForApproval
        } else {
            FlowState::Pending
        }
    }
}

/// Derive the flow flags for a batch.
///
/// `live_transport` says whether a live transport is currently attached;
/// a batch seen only through a snapshot and not yet complete was abandoned
/// mid-flight and is reported interrupted (so a restore can be offered).
pub fn classify(state: &ExecutionArrayState, live_transport: bool) -> FlowStatus {
    let is_waiting_for_approval = is_waiting_for_approval(state);
    let is_flow_complete = is_flow_complete(state);
    let is_flow_executing = !is_flow_complete
        && (state.is_executing || state.items.iter().any(|i| i.status.is_in_flight()));
    let is_flow_successful =
        is_flow_complete && state.items.iter().all(|i| i.status.is_settled_ok());
    let is_flow_failed = is_flow_complete
        && !state.items.is_empty()
        && state.items.iter().any(|i| i.status == ItemStatus::Failed);
    let is_flow_interrupted = !live_transport && !is_flow_complete;

    FlowStatus {
        is_waiting_for_approval,
        is_flow_complete,
        is_flow_executing,
        is_flow_successful,
        is_flow_failed,
        is_flow_interrupted,
    }
}

/// Every item is still awaiting approval. An empty batch is not waiting
/// for approval: there is nothing to approve yet.
pub fn is_waiting_for_approval(state: &ExecutionArrayState) -> bool {
    !state.items.is_empty()
        && state
            .items
            .iter()
            .all(|i| matches!(i.status, ItemStatus::Pending | ItemStatus::Ready))
}

/// Every item has reached a terminal status. Empty batch is not complete.
pub fn is_flow_complete(state: &ExecutionArrayState) -> bool {
    !state.items.is_empty() && state.items.iter().all(|i| i.status.is_terminal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExecutionItem;

    fn batch(statuses: &[ItemStatus]) -> ExecutionArrayState {
        ExecutionArrayState::new("exec-1").with_items(
            statuses
                .iter()
                .enumerate()
                .map(|(i, s)| ExecutionItem::new(format!("op-{i}"), *s))
                .collect(),
        )
    }

    #[test]
    fn empty_batch_is_pending_not_waiting() {
        let state = batch(&[]);
        let flow = classify(&state, true);
        assert!(!flow.is_waiting_for_approval);
        assert!(!flow.is_flow_complete);
        assert!(!flow.is_flow_successful);
        assert!(!flow.is_flow_failed);
        assert_eq!(flow.state(), FlowState::Pending);
    }

    #[test]
    fn all_pending_or_ready_is_waiting_for_approval() {
        let flow = classify(&batch(&[ItemStatus::Pending, ItemStatus::Ready]), true);
        assert!(flow.is_waiting_for_approval);
        assert_eq!(flow.state(), FlowState::WaitingForApproval);

        let flow = classify(&batch(&[ItemStatus::Executing]), true);
        assert!(!flow.is_waiting_for_approval);
    }

    #[test]
    fn complete_requires_every_item_terminal() {
        let flow = classify(&batch(&[ItemStatus::Completed, ItemStatus::Failed]), true);
        assert!(flow.is_flow_complete);

        let flow = classify(&batch(&[ItemStatus::Completed, ItemStatus::Pending]), true);
        assert!(!flow.is_flow_complete);
    }

    #[test]
    fn engine_flag_or_item_status_means_executing() {
        let mut state = batch(&[ItemStatus::Pending]);
        state.is_executing = true;
        assert!(classify(&state, true).is_flow_executing);

        let flow = classify(&batch(&[ItemStatus::Signing]), true);
        assert!(flow.is_flow_executing);
        assert_eq!(flow.state(), FlowState::Executing);
    }

    #[test]
    fn complete_batch_is_never_executing() {
        let mut state = batch(&[ItemStatus::Completed]);
        // Engine flag left stale by a late update must not win over a
        // settled batch.
        state.is_executing = true;
        let flow = classify(&state, true);
        assert!(flow.is_flow_complete);
        assert!(!flow.is_flow_executing);
    }

    #[test]
    fn successful_and_failed_are_mutually_exclusive() {
        let cases: &[&[ItemStatus]] = &[
            &[],
            &[ItemStatus::Pending],
            &[ItemStatus::Completed],
            &[ItemStatus::Finalized, ItemStatus::Completed],
            &[ItemStatus::Completed, ItemStatus::Failed],
            &[ItemStatus::Failed],
            &[ItemStatus::Cancelled],
            &[ItemStatus::Cancelled, ItemStatus::Failed],
            &[ItemStatus::Executing, ItemStatus::Failed],
        ];
        for statuses in cases {
            let flow = classify(&batch(statuses), true);
            assert!(
                !(flow.is_flow_successful && flow.is_flow_failed),
                "successful and failed both set for {statuses:?}"
            );
        }
    }

    #[test]
    fn all_cancelled_is_complete_but_neither_successful_nor_failed() {
        let flow = classify(&batch(&[ItemStatus::Cancelled, ItemStatus::Cancelled]), true);
        assert!(flow.is_flow_complete);
        assert!(!flow.is_flow_successful);
        assert!(!flow.is_flow_failed);
        assert_eq!(flow.state(), FlowState::Complete);
    }

    #[test]
    fn snapshot_only_incomplete_batch_is_interrupted() {
        let flow = classify(&batch(&[ItemStatus::Executing]), false);
        assert!(flow.is_flow_interrupted);
        assert_eq!(flow.state(), FlowState::Interrupted);

        // A settled batch shown from history is frozen, not interrupted.
        let flow = classify(&batch(&[ItemStatus::Completed]), false);
        assert!(!flow.is_flow_interrupted);
        assert_eq!(flow.state(), FlowState::Successful);
    }

    #[test]
    fn finalized_counts_as_settled_ok() {
        let flow = classify(&batch(&[ItemStatus::Finalized, ItemStatus::Completed]), true);
        assert!(flow.is_flow_successful);
        assert!(!flow.is_flow_failed);
        assert_eq!(flow.state(), FlowState::Successful);
    }
}
