//! Active-path resolution.
//!
//! Two independent lookups, both O(depth): ancestry reconstruction straight
//! from the store's parent links, and projection of an active path onto the
//! derived forest for rendering. Neither walks the full tree.

use crate::error::StoreError;
use crate::message::{MessageId, MessageRecord};
use crate::store::MessageStore;
use crate::tree::{Forest, MessageNode};

/// Root-first list of full records from the conversation root down to `id`.
///
/// Follows `parent_id` links through the store; used to build the request
/// context for the model backend.
pub fn ancestry_of(store: &MessageStore, id: MessageId) -> Result<Vec<MessageRecord>, StoreError> {
    let mut chain = Vec::new();
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        let record = store.get(current).ok_or(StoreError::UnknownId(current))?;
        cursor = record.parent_id;
        chain.push(record.clone());
    }
    chain.reverse();
    Ok(chain)
}

/// Root-first list of ids from the conversation root down to `id`.
pub fn ancestry_ids(store: &MessageStore, id: MessageId) -> Result<Vec<MessageId>, StoreError> {
    Ok(ancestry_of(store, id)?.into_iter().map(|r| r.id).collect())
}

/// Project the active path onto the forest, producing the node sequence to
/// render. Ids that no longer resolve are dropped; no engine operation can
/// produce such a dangling reference, so this is purely defensive.
pub fn active_nodes<'f>(active_path: &[MessageId], forest: &'f Forest) -> Vec<&'f MessageNode> {
    if active_path.is_empty() {
        return Vec::new();
    }

    let index = forest.index();
    active_path
        .iter()
        .filter_map(|id| {
            let node = index.get(id).copied();
            if node.is_none() {
                tracing::warn!(
                    message_id = %id,
                    "active path references a message missing from the forest"
                );
            }
            node
        })
        .collect()
}
