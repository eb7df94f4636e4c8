//! Cache key namespace
//!
//! Every cached value lives under one of two shapes:
//!
//! ```text
//! {kind}:{id}                      single entity        board:6f1c…
//! {kind}-by-{parentKind}:{id}      derived collection   boards-by-company:2b9e…
//! ```
//!
//! Writers invalidate the entity key plus every collection key whose result
//! could contain the entity, so all callers must build keys through these
//! helpers.

use std::time::Duration;
use uuid::Uuid;

/// TTL for mutable entities and their collections
pub const MUTABLE_TTL: Duration = Duration::from_secs(10 * 60);

/// TTL for near-immutable reference data
pub const REFERENCE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Upper bound applied to every TTL
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// `"{kind}:{id}"`
pub fn entity(kind: &str, id: Uuid) -> String {
    format!("{}:{}", kind, id)
}

/// `"{kind}-by-{parent_kind}:{parent_id}"`
pub fn collection(kind: &str, parent_kind: &str, parent_id: Uuid) -> String {
    format!("{}-by-{}:{}", kind, parent_kind, parent_id)
}

/// Prefix matching every key of one entity kind
pub fn kind_prefix(kind: &str) -> String {
    format!("{}:", kind)
}

pub fn user(id: Uuid) -> String {
    entity("user", id)
}

pub fn company(id: Uuid) -> String {
    entity("company", id)
}

pub fn board(id: Uuid) -> String {
    entity("board", id)
}

pub fn boards_by_company(company_id: Uuid) -> String {
    collection("boards", "company", company_id)
}

pub fn boards_by_user(user_id: Uuid) -> String {
    collection("boards", "user", user_id)
}

pub fn board_users_by_board(board_id: Uuid) -> String {
    collection("board-users", "board", board_id)
}

pub fn column(id: Uuid) -> String {
    entity("column", id)
}

pub fn columns_by_board(board_id: Uuid) -> String {
    collection("columns", "board", board_id)
}

pub fn task(id: Uuid) -> String {
    entity("task", id)
}

pub fn tasks_by_board(board_id: Uuid) -> String {
    collection("tasks", "board", board_id)
}

pub fn task_types_by_company(company_id: Uuid) -> String {
    collection("task-types", "company", company_id)
}

pub fn permissions_by_role(role_id: Uuid) -> String {
    collection("permissions", "role", role_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_and_collection_shapes() {
        let id = Uuid::nil();

        assert_eq!(board(id), format!("board:{}", id));
        assert_eq!(boards_by_company(id), format!("boards-by-company:{}", id));
        assert_eq!(permissions_by_role(id), format!("permissions-by-role:{}", id));
        assert_eq!(task_types_by_company(id), format!("task-types-by-company:{}", id));
    }

    #[test]
    fn test_kind_prefix_does_not_match_collections() {
        let id = Uuid::new_v4();
        let prefix = kind_prefix("board");

        assert!(board(id).starts_with(&prefix));
        assert!(!boards_by_company(id).starts_with(&prefix));
        assert!(!board_users_by_board(id).starts_with(&prefix));
    }

    #[test]
    fn test_ttl_policy() {
        assert_eq!(MUTABLE_TTL.as_secs(), 600);
        assert_eq!(REFERENCE_TTL.as_secs(), 2_592_000);
    }
}
