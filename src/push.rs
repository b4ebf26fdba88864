//! Push-channel protocol and collaborator surface.
//!
//! The push channel is a client-held connection to the session gateway
//! (in practice a WebSocket); this crate only depends on its protocol
//! shape. Commands and events are closed tagged unions so the wire
//! vocabulary is exhaustive at every match site.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::TransportError;
use crate::model::ExecutionArrayState;

/// Outbound control messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushCommand {
    #[serde(rename = "subscribe-execution")]
    SubscribeExecution {
        session_id: String,
        execution_id: String,
    },
    #[serde(rename = "unsubscribe-execution")]
    UnsubscribeExecution {
        session_id: String,
        execution_id: String,
    },
}

/// Inbound state events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushEvent {
    #[serde(rename = "execution-update")]
    ExecutionUpdate {
        execution_id: String,
        state: ExecutionArrayState,
    },
}

/// A live push connection supplied by the embedding application.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Emit a control command to the gateway.
    async fn send(&self, command: PushCommand) -> std::result::Result<(), TransportError>;

    /// Subscribe to the inbound event stream. Each caller gets an
    /// independent receiver; events are fanned out to all of them.
    fn events(&self) -> broadcast::Receiver<PushEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExecutionItem, ItemStatus};

    #[test]
    fn commands_use_kebab_case_type_tags() {
        let cmd = PushCommand::SubscribeExecution {
            session_id: "sess-1".to_string(),
            execution_id: "exec-1".to_string(),
        };
        let encoded = serde_json::to_value(&cmd).unwrap();
        assert_eq!(encoded["type"], "subscribe-execution");
        assert_eq!(encoded["session_id"], "sess-1");

        let cmd = PushCommand::UnsubscribeExecution {
            session_id: "sess-1".to_string(),
            execution_id: "exec-1".to_string(),
        };
        let encoded = serde_json::to_value(&cmd).unwrap();
        assert_eq!(encoded["type"], "unsubscribe-execution");
    }

    #[test]
    fn execution_update_round_trips() {
        let event = PushEvent::ExecutionUpdate {
            execution_id: "exec-1".to_string(),
            state: ExecutionArrayState::new("exec-1")
                .with_items(vec![ExecutionItem::new("op-0", ItemStatus::Executing)]),
        };
        let encoded = serde_json::to_string(&event).unwrap();
        assert!(encoded.contains("\"type\":\"execution-update\""));
        let decoded: PushEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
    }
}
