//! Resource identities
//!
//! Every authorization target is a [`ResourceRef`]: a resource kind tagged with
//! the row id. The kind set is closed; there is no runtime type inspection.
//!
//! ```text
//! ResourceRef::Company(id)   companies.id
//! ResourceRef::Board(id)     boards.id
//! ResourceRef::Task(id)      tasks.id
//! ResourceRef::User(id)      users.id, or the nil id for global checks
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of a resource a membership can be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resource_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Company,
    Board,
    Task,
    User,
}

impl ResourceType {
    /// All resource kinds
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Company,
        ResourceType::Board,
        ResourceType::Task,
        ResourceType::User,
    ];

    /// Converts the kind to its storage/display name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Company => "company",
            ResourceType::Board => "board",
            ResourceType::Task => "task",
            ResourceType::User => "user",
        }
    }

    /// Parses a kind from its storage name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "company" => Some(ResourceType::Company),
            "board" => Some(ResourceType::Board),
            "task" => Some(ResourceType::Task),
            "user" => Some(ResourceType::User),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed reference to a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ResourceRef {
    Company(Uuid),
    Board(Uuid),
    Task(Uuid),
    User(Uuid),
}

impl ResourceRef {
    /// Builds a reference from a stored `(resource_type, resource_id)` pair
    pub fn new(resource_type: ResourceType, id: Uuid) -> Self {
        match resource_type {
            ResourceType::Company => ResourceRef::Company(id),
            ResourceType::Board => ResourceRef::Board(id),
            ResourceType::Task => ResourceRef::Task(id),
            ResourceType::User => ResourceRef::User(id),
        }
    }

    /// The global administrative target (`User` kind with the nil id)
    ///
    /// Only direct memberships ever match it; it is never looked up in the
    /// hierarchy.
    pub fn global() -> Self {
        ResourceRef::User(Uuid::nil())
    }

    /// Returns true for the global administrative target
    pub fn is_global(&self) -> bool {
        matches!(self, ResourceRef::User(id) if id.is_nil())
    }

    pub fn id(&self) -> Uuid {
        match *self {
            ResourceRef::Company(id)
            | ResourceRef::Board(id)
            | ResourceRef::Task(id)
            | ResourceRef::User(id) => id,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceRef::Company(_) => ResourceType::Company,
            ResourceRef::Board(_) => ResourceType::Board,
            ResourceRef::Task(_) => ResourceType::Task,
            ResourceRef::User(_) => ResourceType::User,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_round_trips_through_str() {
        for kind in ResourceType::ALL {
            assert_eq!(ResourceType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceType::parse("department"), None);
    }

    #[test]
    fn test_resource_ref_accessors() {
        let id = Uuid::new_v4();
        let board = ResourceRef::new(ResourceType::Board, id);

        assert_eq!(board, ResourceRef::Board(id));
        assert_eq!(board.id(), id);
        assert_eq!(board.resource_type(), ResourceType::Board);
        assert_eq!(board.to_string(), format!("board:{}", id));
    }

    #[test]
    fn test_global_target() {
        assert!(ResourceRef::global().is_global());
        assert!(!ResourceRef::User(Uuid::new_v4()).is_global());
        assert!(!ResourceRef::Company(Uuid::nil()).is_global());
    }

    #[test]
    fn test_resource_ref_serializes_tagged() {
        let id = Uuid::nil();
        let json = serde_json::to_value(ResourceRef::Task(id)).unwrap();
        assert_eq!(json["type"], "task");
        assert_eq!(json["id"], id.to_string());
    }
}
