//! Sideways navigation between sibling variants.
//!
//! Moving to a sibling truncates the active path at the navigated node,
//! substitutes the target sibling, then descends into the target's subtree
//! picking the most recently created child at each level. The descent is a
//! deliberate policy, preserved exactly: the newest variant at each level is
//! the one the user last interacted with.

use serde::{Deserialize, Serialize};

use crate::message::MessageId;
use crate::tree::{Forest, MessageNode};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Previous,
    Next,
}

/// Position of a node among its sibling variants.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SiblingInfo {
    /// Zero-based position within the sibling list.
    pub index: usize,
    /// Total number of siblings, the node itself included.
    pub total: usize,
}

impl SiblingInfo {
    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.total
    }
}

fn siblings_of<'f>(forest: &'f Forest, node: &MessageNode) -> Option<&'f [MessageNode]> {
    match node.record.parent_id {
        None => Some(&forest.roots),
        Some(parent_id) => forest.find(parent_id).map(|parent| &parent.children[..]),
    }
}

/// Sibling position/count for a node, over the roots for root nodes and over
/// the parent's children otherwise. `None` if the id is not in the forest.
pub fn sibling_info(forest: &Forest, id: MessageId) -> Option<SiblingInfo> {
    let node = forest.find(id)?;
    let siblings = siblings_of(forest, node)?;
    let index = siblings.iter().position(|s| s.id() == id)?;
    Some(SiblingInfo {
        index,
        total: siblings.len(),
    })
}

/// Produce the active path after stepping from `id` to its previous/next
/// sibling, or `None` when there is no sibling in that direction (or the id
/// is not on the active path). Never mutates the tree.
pub fn navigate(
    forest: &Forest,
    active_path: &[MessageId],
    id: MessageId,
    direction: Direction,
) -> Option<Vec<MessageId>> {
    let node = forest.find(id)?;
    let siblings = siblings_of(forest, node)?;
    let index = siblings.iter().position(|s| s.id() == id)?;

    let target = match direction {
        Direction::Previous => {
            if index == 0 {
                return None;
            }
            &siblings[index - 1]
        }
        Direction::Next => {
            if index + 1 >= siblings.len() {
                return None;
            }
            &siblings[index + 1]
        }
    };

    let path_position = active_path.iter().position(|p| *p == id)?;

    let mut new_path = active_path[..path_position].to_vec();
    new_path.push(target.id());

    // Descend into the newest variant at each level until a leaf.
    let mut cursor = target;
    while let Some(latest) = cursor.latest_child() {
        new_path.push(latest.id());
        cursor = latest;
    }

    tracing::debug!(
        from = %id,
        to = %target.id(),
        direction = ?direction,
        depth = new_path.len(),
        "navigated to sibling branch"
    );

    Some(new_path)
}
