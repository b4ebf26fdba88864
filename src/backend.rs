//! Process-wide backend availability flag.
//!
//! The session backend is an optional enhancement layer: the client keeps
//! working against local engines and snapshots when it is unreachable. The
//! flag starts up (`false` = not down), transitions to down exactly once,
//! and replays the transition to listeners that register after the fact,
//! so a late-mounting consumer can never miss it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex};

use crate::api::SessionApi;

type DownListener = Box<dyn FnOnce() + Send>;

/// One-way backend-down latch with listener replay.
pub struct BackendStatus {
    down: AtomicBool,
    listeners: Mutex<Vec<DownListener>>,
}

impl BackendStatus {
    pub fn new() -> Self {
        Self {
            down: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::Acquire)
    }

    /// Latch the flag. The first call notifies every registered listener;
    /// subsequent calls are no-ops.
    pub fn mark_down(&self) {
        if self.down.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::warn!("session backend marked down, falling back to local tracking");
        let drained: Vec<DownListener> = {
            let mut listeners = self.listeners.lock().expect("backend listener lock");
            listeners.drain(..).collect()
        };
        for listener in drained {
            listener();
        }
    }

    /// Register a listener for the down transition. A listener registered
    /// after the transition fires immediately (replay), never silently
    /// misses it.
    pub fn on_down(&self, listener: impl FnOnce() + Send + 'static) {
        if self.is_down() {
            listener();
            return;
        }
        let mut listeners = self.listeners.lock().expect("backend listener lock");
        // The flag may have latched between the check and the lock.
        if self.is_down() {
            drop(listeners);
            listener();
        } else {
            listeners.push(Box::new(listener));
        }
    }
}

impl Default for BackendStatus {
    fn default() -> Self {
        Self::new()
    }
}

static BACKEND: LazyLock<BackendStatus> = LazyLock::new(BackendStatus::new);

/// The process-wide backend status.
pub fn backend_status() -> &'static BackendStatus {
    &BACKEND
}

/// Probe the backend health endpoint once, latching the down flag on
/// failure. Returns whether the backend answered healthy.
pub async fn probe_backend(api: &dyn SessionApi) -> bool {
    match api.health().await {
        Ok(true) => true,
        Ok(false) => {
            backend_status().mark_down();
            false
        }
        Err(e) => {
            tracing::debug!("backend health probe failed: {e}");
            backend_status().mark_down();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn starts_up_and_latches_one_way() {
        let status = BackendStatus::new();
        assert!(!status.is_down());
        status.mark_down();
        assert!(status.is_down());
        status.mark_down();
        assert!(status.is_down());
    }

    #[test]
    fn notifies_registered_listeners_exactly_once() {
        let status = BackendStatus::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        status.on_down(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        status.mark_down();
        status.mark_down();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replays_to_late_listeners() {
        let status = BackendStatus::new();
        status.mark_down();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        status.on_down(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
