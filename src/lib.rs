//! Execution state synchronization for chat-driven Polkadot operations.
//!
//! A conversation produces execution batches (multi-step blockchain
//! operations) whose true state may live in-process, behind a push
//! channel, or only be discoverable by polling. This crate keeps one
//! client-side view of one batch correct and responsive across all three:
//! it picks a transport, gates updates through a change detector, applies
//! them off the interaction path, and derives the user-facing flow state
//! from raw item statuses. It does not sign, broadcast, or decide what to
//! execute; those collaborators are reached through the traits in
//! [`engine`], [`api`], and [`push`].
//!
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use dotsync::api::HttpSessionApi;
//! use dotsync::config::SyncConfig;
//! use dotsync::model::ExecutionMessage;
//! use dotsync::subscription::{AttachOptions, SubscriptionManager};
//!
//! # async fn wire(message: ExecutionMessage) -> dotsync::Result<()> {
//! let api = Arc::new(HttpSessionApi::new("http://127.0.0.1:8000/api/")?);
//! let manager = SubscriptionManager::new(SyncConfig::default()).with_api(api);
//! let handle = manager
//!     .attach(
//!         &message,
//!         None,
//!         AttachOptions {
//!             session_id: Some("sess-1".to_string()),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! let mut states = handle.state_rx();
//! while states.changed().await.is_ok() {
//!     if let Some(state) = states.borrow().as_ref() {
//!         println!("{:?}", dotsync::classify(state, true).state());
//!     }
//! }
//! handle.detach().await;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod api;
pub mod backend;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod diff;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod push;
pub mod scheduler;
pub mod subscription;
pub mod transport;

pub use classify::{FlowState, FlowStatus, classify};
pub use dedup::dedupe_execution_entries;
pub use diff::has_changed;
pub use error::{Error, Result};
pub use model::{ChatEntry, ExecutionArrayState, ExecutionItem, ExecutionMessage, ItemStatus};
pub use subscription::{
    AttachOptions, SubscriptionHandle, SubscriptionManager, SubscriptionState,
};
pub use transport::poll::PollStop;
