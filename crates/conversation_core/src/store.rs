//! Copy-on-write message store.
//!
//! The store is the single source of truth for all message data. Every
//! mutation produces a wholly new store value, so readers never observe a
//! half-applied update; the previous value stays valid for as long as anyone
//! holds it. There is no delete operation: the tree only ever grows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::message::{MessageId, MessageRecord, RecordPatch};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MessageStore {
    /// O(1) lookup of any message by its id.
    records: HashMap<MessageId, MessageRecord>,

    /// Insertion order. Chronological sorts are stable, so same-timestamp
    /// siblings keep their creation order.
    order: Vec<MessageId>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MessageId) -> Option<&MessageRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate all records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &MessageRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Insert a new record, returning the updated store.
    ///
    /// Fails if the id is already present or the parent link dangles; the
    /// parent-link graph must stay a forest.
    pub fn with_added(&self, record: MessageRecord) -> Result<Self, StoreError> {
        if self.contains(record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        if let Some(parent_id) = record.parent_id {
            if !self.contains(parent_id) {
                return Err(StoreError::UnknownParent(parent_id));
            }
        }

        tracing::debug!(
            message_id = %record.id,
            parent_id = ?record.parent_id,
            role = ?record.role,
            store_len = self.len(),
            "MessageStore: adding record"
        );

        let mut next = self.clone();
        next.order.push(record.id);
        next.records.insert(record.id, record);
        Ok(next)
    }

    /// Fill in content/reasoning on an existing record, returning the updated
    /// store. Used only when a streaming response completes or is aborted.
    pub fn with_replaced(&self, id: MessageId, patch: RecordPatch) -> Result<Self, StoreError> {
        if !self.contains(id) {
            return Err(StoreError::UnknownId(id));
        }

        tracing::debug!(
            message_id = %id,
            has_content = patch.content.is_some(),
            has_reasoning = patch.reasoning.is_some(),
            "MessageStore: patching record"
        );

        let mut next = self.clone();
        let record = next
            .records
            .get_mut(&id)
            .ok_or(StoreError::UnknownId(id))?;
        if let Some(content) = patch.content {
            record.content = content;
        }
        if let Some(reasoning) = patch.reasoning {
            record.reasoning = Some(reasoning);
        }
        Ok(next)
    }
}
