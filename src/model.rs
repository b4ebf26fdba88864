//! Canonical shapes for execution batches and conversation entries.
//!
//! These types carry no behavior beyond constructors, serde, and small
//! predicates. The authoritative live value always flows through the
//! subscription layer; snapshots embedded in messages are best-effort
//! display fallbacks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a single blockchain operation within a batch.
///
/// Progression is strictly one-directional per item: a terminal status
/// never reverts to a non-terminal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Ready,
    Executing,
    Signing,
    Broadcasting,
    InBlock,
    Finalized,
    Completed,
    Failed,
    Cancelled,
}

impl ItemStatus {
    /// Terminal statuses: the item will not change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Finalized | Self::Failed | Self::Cancelled
        )
    }

    /// Statuses that mean the item is actively being driven right now.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Executing | Self::Signing | Self::Broadcasting)
    }

    /// Terminal and not failed/cancelled.
    pub fn is_settled_ok(self) -> bool {
        matches!(self, Self::Completed | Self::Finalized)
    }
}

/// Phase of a dry-run simulation attached to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPhase {
    Initializing,
    Forking,
    Executing,
    Analyzing,
    Validating,
    Simulating,
    Retrying,
    Complete,
    Error,
}

impl SimulationPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Result payload of a finished simulation. May carry a fee estimate that
/// supersedes the item's own `estimated_fee` for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Live simulation progress for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatus {
    pub phase: SimulationPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SimulationResult>,
}

/// One blockchain operation within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionItem {
    /// Stable identifier, unique within its batch.
    pub id: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_status: Option<SimulationStatus>,
    /// Fee estimate in the chain's display unit (e.g. DOT).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fee: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Informational only; never consulted for flow derivation.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl ExecutionItem {
    pub fn new(id: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            id: id.into(),
            status,
            simulation_status: None,
            estimated_fee: None,
            warnings: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Fee to display: the simulation-reported fee wins over the static
    /// estimate when both are present.
    pub fn effective_fee(&self) -> Option<Decimal> {
        self.simulation_status
            .as_ref()
            .and_then(|s| s.result.as_ref())
            .and_then(|r| r.estimated_fee)
            .or(self.estimated_fee)
    }
}

/// One execution batch: an ordered set of operations tracked as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionArrayState {
    /// Execution id (distinct from any message id referencing it).
    pub id: String,
    /// Execution order; stable across updates.
    #[serde(default)]
    pub items: Vec<ExecutionItem>,
    /// Engine-reported flag, independent of item-status aggregation.
    #[serde(default)]
    pub is_executing: bool,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub total_items: usize,
    #[serde(default)]
    pub completed_items: usize,
    #[serde(default)]
    pub failed_items: usize,
    #[serde(default)]
    pub cancelled_items: usize,
}

impl ExecutionArrayState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
            is_executing: false,
            is_paused: false,
            current_index: 0,
            total_items: 0,
            completed_items: 0,
            failed_items: 0,
            cancelled_items: 0,
        }
    }

    pub fn with_items(mut self, items: Vec<ExecutionItem>) -> Self {
        self.total_items = items.len();
        self.items = items;
        self.recount();
        self
    }

    /// Recompute the progress counters from item statuses.
    pub fn recount(&mut self) {
        self.completed_items = self
            .items
            .iter()
            .filter(|i| i.status.is_settled_ok())
            .count();
        self.failed_items = self
            .items
            .iter()
            .filter(|i| i.status == ItemStatus::Failed)
            .count();
        self.cancelled_items = self
            .items
            .iter()
            .filter(|i| i.status == ItemStatus::Cancelled)
            .count();
    }

    /// `total_items == 0` while the batch is still being assembled is a
    /// valid "preparing" state, not an error.
    pub fn is_preparing(&self) -> bool {
        self.items.is_empty()
    }

    /// `completed + failed + cancelled <= total`; `total == items.len()`
    /// once population has settled.
    pub fn counters_consistent(&self) -> bool {
        self.completed_items + self.failed_items + self.cancelled_items <= self.total_items
            && (self.items.is_empty() || self.total_items == self.items.len())
    }
}

/// A conversation-level pointer to an execution.
///
/// Created once by the external planner when a plan requiring execution is
/// produced. The embedded snapshot is mutated in place by transports as a
/// best-effort cache; live values flow through the subscription callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMessage {
    /// Message id, distinct from the execution id.
    pub id: Uuid,
    pub execution_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_array: Option<ExecutionArrayState>,
}

impl ExecutionMessage {
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id: execution_id.into(),
            timestamp: Utc::now(),
            execution_array: None,
        }
    }

    pub fn with_snapshot(mut self, state: ExecutionArrayState) -> Self {
        self.execution_array = Some(state);
        self
    }
}

/// One rendered entry of the conversation history.
///
/// Execution references may lack a resolvable execution id (e.g. a plan the
/// engine rejected before assigning one); those are excluded from
/// deduplication but still pass through for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatEntry {
    Execution {
        id: Uuid,
        timestamp: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        execution_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        execution_array: Option<ExecutionArrayState>,
    },
    Message {
        id: Uuid,
        timestamp: DateTime<Utc>,
        content: String,
    },
}

impl ChatEntry {
    pub fn execution_id(&self) -> Option<&str> {
        match self {
            Self::Execution { execution_id, .. } => execution_id.as_deref(),
            Self::Message { .. } => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Execution { timestamp, .. } | Self::Message { timestamp, .. } => *timestamp,
        }
    }
}
