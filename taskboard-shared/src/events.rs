/// Domain events
///
/// Services publish one event after each successful mutation, once the store
/// write has committed and the cache has been invalidated. Publishing is
/// fire-and-forget: a publisher must not block and cannot fail the operation.
///
/// # Example
///
/// ```
/// use taskboard_shared::events::{ChannelPublisher, DomainEvent, EventPublisher};
/// use uuid::Uuid;
///
/// let (publisher, mut rx) = ChannelPublisher::new();
/// let board_id = Uuid::new_v4();
/// publisher.publish(Uuid::new_v4(), DomainEvent::BoardDeleted { board_id });
///
/// let envelope = rx.try_recv().unwrap();
/// assert_eq!(envelope.event, DomainEvent::BoardDeleted { board_id });
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::access::ResourceRef;

/// State change worth telling the outside world about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    CompanyCreated { company_id: Uuid },
    CompanyUpdated { company_id: Uuid },
    CompanyDeleted { company_id: Uuid },

    BoardCreated { board_id: Uuid, company_id: Uuid },
    BoardUpdated { board_id: Uuid },
    BoardDeleted { board_id: Uuid },
    BoardUserAdded { board_id: Uuid, user_id: Uuid },
    BoardUserRemoved { board_id: Uuid, user_id: Uuid },

    ColumnCreated { column_id: Uuid, board_id: Uuid },
    ColumnDeleted { column_id: Uuid, board_id: Uuid },

    TaskCreated { task_id: Uuid, board_id: Uuid },
    TaskUpdated { task_id: Uuid, board_id: Uuid },
    TaskDeleted { task_id: Uuid, board_id: Uuid },

    MembershipGranted { membership_id: Uuid, user_id: Uuid, scope: ResourceRef },
    MembershipRevoked { membership_id: Uuid, user_id: Uuid, scope: ResourceRef },
}

impl DomainEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::CompanyCreated { .. } => "company_created",
            DomainEvent::CompanyUpdated { .. } => "company_updated",
            DomainEvent::CompanyDeleted { .. } => "company_deleted",
            DomainEvent::BoardCreated { .. } => "board_created",
            DomainEvent::BoardUpdated { .. } => "board_updated",
            DomainEvent::BoardDeleted { .. } => "board_deleted",
            DomainEvent::BoardUserAdded { .. } => "board_user_added",
            DomainEvent::BoardUserRemoved { .. } => "board_user_removed",
            DomainEvent::ColumnCreated { .. } => "column_created",
            DomainEvent::ColumnDeleted { .. } => "column_deleted",
            DomainEvent::TaskCreated { .. } => "task_created",
            DomainEvent::TaskUpdated { .. } => "task_updated",
            DomainEvent::TaskDeleted { .. } => "task_deleted",
            DomainEvent::MembershipGranted { .. } => "membership_granted",
            DomainEvent::MembershipRevoked { .. } => "membership_revoked",
        }
    }
}

/// An event with the acting user and publication time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub actor_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DomainEvent,
}

/// Outbound event sink
pub trait EventPublisher: Send + Sync {
    fn publish(&self, actor_id: Uuid, event: DomainEvent);
}

/// Publisher that only writes events to the log
#[derive(Debug, Clone, Default)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, actor_id: Uuid, event: DomainEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::info!(
                actor_id = %actor_id,
                event = event.name(),
                payload = %payload,
                "Domain event"
            ),
            Err(e) => tracing::warn!(event = event.name(), error = %e, "Failed to encode domain event"),
        }
    }
}

/// Publisher forwarding events to an in-process channel
///
/// Used by tests and by consumers running in the same process. Events are
/// dropped (with a debug log) once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<EventEnvelope>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, actor_id: Uuid, event: DomainEvent) {
        let envelope = EventEnvelope {
            actor_id,
            occurred_at: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope) {
            tracing::debug!(event = e.0.event.name(), "Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let board_id = Uuid::new_v4();
        let json = serde_json::to_value(DomainEvent::BoardUpdated { board_id }).unwrap();

        assert_eq!(json["type"], "board_updated");
        assert_eq!(json["board_id"], board_id.to_string());
    }

    #[test]
    fn test_envelope_flattens_event() {
        let envelope = EventEnvelope {
            actor_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event: DomainEvent::CompanyDeleted {
                company_id: Uuid::new_v4(),
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["type"], "company_deleted");
        assert!(json.get("actor_id").is_some());
    }

    #[test]
    fn test_channel_publisher_survives_dropped_receiver() {
        let (publisher, rx) = ChannelPublisher::new();
        drop(rx);

        publisher.publish(
            Uuid::new_v4(),
            DomainEvent::BoardDeleted {
                board_id: Uuid::new_v4(),
            },
        );
    }
}
