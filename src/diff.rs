//! Change detection for incoming batch states.
//!
//! Polling hands back a fresh allocation on every tick even when nothing
//! moved, so reference identity is useless and a full structural compare is
//! too noisy. This targeted diff checks exactly the fields that can change
//! the rendered flow status or a per-item badge, short-circuiting on the
//! first difference.

use crate::model::ExecutionArrayState;

/// Whether `next` differs meaningfully from the last-applied state.
///
/// Returns `true` unconditionally when there is no previous state; returns
/// `false` for the identical allocation. Metadata and warnings changes do
/// not count as changes.
pub fn has_changed(next: &ExecutionArrayState, previous: Option<&ExecutionArrayState>) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    if std::ptr::eq(next, previous) {
        return false;
    }

    if next.items.len() != previous.items.len() {
        return true;
    }

    for (n, p) in next.items.iter().zip(previous.items.iter()) {
        if n.id != p.id || n.status != p.status {
            return true;
        }
    }

    for (n, p) in next.items.iter().zip(previous.items.iter()) {
        let n_phase = n.simulation_status.as_ref().map(|s| s.phase);
        let p_phase = p.simulation_status.as_ref().map(|s| s.phase);
        if n_phase != p_phase {
            return true;
        }
    }

    for (n, p) in next.items.iter().zip(previous.items.iter()) {
        if n.estimated_fee != p.estimated_fee || n.effective_fee() != p.effective_fee() {
            return true;
        }
    }

    next.is_executing != previous.is_executing
}
