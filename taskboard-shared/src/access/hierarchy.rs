//! Resource hierarchy resolution
//!
//! The hierarchy is a fixed list of parent/child edges:
//!
//! ```text
//! Company
//!   └── Board   (boards.company_id)
//!         └── Task   (tasks.board_id)
//! ```
//!
//! `User` resources have no parent. Each kind's parent id is read from the
//! store via [`AccessStore::load_node`]; the edge table only decides which kind
//! that parent id refers to.

use std::sync::Arc;

use super::error::AccessError;
use super::resource::{ResourceRef, ResourceType};
use crate::store::{AccessStore, ResourceNode};

/// One parent/child edge of the resource hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyEdge {
    pub child: ResourceType,
    pub parent: ResourceType,
}

/// The complete resource hierarchy
pub const HIERARCHY: &[HierarchyEdge] = &[
    HierarchyEdge {
        child: ResourceType::Task,
        parent: ResourceType::Board,
    },
    HierarchyEdge {
        child: ResourceType::Board,
        parent: ResourceType::Company,
    },
];

/// Maximum number of parent hops followed from the starting resource
pub const MAX_DEPTH: usize = 3;

/// Returns the parent kind of `child`, if it has one
pub fn parent_type(child: ResourceType) -> Option<ResourceType> {
    HIERARCHY
        .iter()
        .find(|edge| edge.child == child)
        .map(|edge| edge.parent)
}

/// Resolves the ancestor chain of a resource
#[derive(Clone)]
pub struct HierarchyResolver {
    store: Arc<dyn AccessStore>,
}

impl HierarchyResolver {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self { store }
    }

    /// Returns the ancestors of `resource`, nearest first, ending at the root
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if the resource or any ancestor is deleted or absent
    /// - `HierarchyTooDeep` if more than [`MAX_DEPTH`] hops are needed
    /// - `Store` if the store fails
    pub async fn ancestor_chain(&self, resource: ResourceRef) -> Result<Vec<ResourceRef>, AccessError> {
        let lineage = self.lineage(resource).await?;

        Ok(lineage.into_iter().skip(1).map(|node| node.resource).collect())
    }

    /// Loads the resource and all its ancestors, the resource itself first
    ///
    /// The global target resolves to an empty lineage: it is a direct
    /// membership target only and is never looked up.
    pub async fn lineage(&self, resource: ResourceRef) -> Result<Vec<ResourceNode>, AccessError> {
        if resource.is_global() {
            return Ok(Vec::new());
        }

        let mut nodes = Vec::with_capacity(MAX_DEPTH + 1);
        let mut current = resource;

        loop {
            let node = self
                .store
                .load_node(current)
                .await?
                .ok_or(AccessError::ResourceNotFound(current))?;

            let parent = match (parent_type(current.resource_type()), node.parent_id) {
                (Some(kind), Some(parent_id)) => Some(ResourceRef::new(kind, parent_id)),
                _ => None,
            };

            nodes.push(node);

            match parent {
                Some(parent) => {
                    if nodes.len() > MAX_DEPTH {
                        return Err(AccessError::HierarchyTooDeep(resource));
                    }
                    current = parent;
                }
                None => break,
            }
        }

        tracing::trace!(resource = %resource, depth = nodes.len(), "Resolved resource lineage");

        Ok(nodes)
    }
}
