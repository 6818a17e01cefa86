//! Position domain model.
//!
//! # Responsibility
//! - Define the flat `Position` row shared by storage and API layers.
//! - Define `PositionTree`, an owned, read-only snapshot of one subtree.
//!
//! # Invariants
//! - `id` is assigned once at insert time and never changes.
//! - `parent_id == None` marks the (single) root of the hierarchy.
//! - A `PositionTree` owns its children; trees are rebuilt per read and never
//!   shared between requests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one position row.
pub type PositionId = Uuid;

/// Maximum name length accepted by the `positions.name` column.
pub const MAX_NAME_CHARS: usize = 255;

/// One row of the `positions` relation.
///
/// Serialized with camelCase keys (`parentId`) to match the HTTP contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: PositionId,
    pub name: String,
    pub description: String,
    /// `None` means this position is the root.
    pub parent_id: Option<PositionId>,
}

impl Position {
    /// Returns whether this row is a root (has no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Validated input for create and update operations.
///
/// Built by `validation::parse_position_draft`; never partially populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionDraft {
    pub name: String,
    pub description: String,
    pub parent_id: Option<PositionId>,
}

impl PositionDraft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parent_id: Option<PositionId>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parent_id,
        }
    }
}

/// A position with its fully expanded descendants.
///
/// The position fields are flattened so the JSON shape is
/// `{id, name, description, parentId, children: [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionTree {
    #[serde(flatten)]
    pub position: Position,
    pub children: Vec<PositionTree>,
}

impl PositionTree {
    /// Creates a tree node without children.
    pub fn leaf(position: Position) -> Self {
        Self {
            position,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> PositionId {
        self.position.id
    }

    /// Counts this node and all of its descendants.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(PositionTree::node_count)
            .sum::<usize>()
    }

    /// Returns the longest root-to-leaf path length, counting this node as 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(PositionTree::depth)
            .max()
            .unwrap_or(0)
    }

    /// Finds a node by id anywhere in this subtree (depth-first).
    pub fn find(&self, id: PositionId) -> Option<&PositionTree> {
        if self.id() == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}
