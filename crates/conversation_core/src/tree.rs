//! Derived message forest.
//!
//! The forest is a disposable view over the store: it is rebuilt in full
//! after every mutation rather than maintained incrementally. Conversations
//! are small (tens to low hundreds of messages), and a full rebuild keeps the
//! copy-on-write discipline simple. No node reference may be retained across
//! a store mutation.

use std::collections::HashMap;

use serde::Serialize;

use crate::message::{MessageId, MessageRecord};
use crate::store::MessageStore;

/// A message record linked to its chronologically ordered children.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MessageNode {
    pub record: MessageRecord,
    pub children: Vec<MessageNode>,
    /// Root depth is 0; every child is parent depth + 1.
    pub depth: usize,
}

impl MessageNode {
    pub fn id(&self) -> MessageId {
        self.record.id
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The most recently created child, the branch a sideways navigation
    /// descends into.
    pub fn latest_child(&self) -> Option<&MessageNode> {
        self.children.last()
    }
}

/// The set of root-anchored trees derived from the flat message store.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct Forest {
    /// Root nodes in chronological order.
    pub roots: Vec<MessageNode>,
}

impl Forest {
    /// Build the full forest from the store.
    ///
    /// Two passes: group records under their parent, then construct nodes
    /// depth-first. Children and roots are sorted by `created_at` ascending;
    /// the sort is stable, so same-timestamp siblings keep insertion order.
    /// O(n log n) in message count.
    pub fn build(store: &MessageStore) -> Self {
        let mut children_of: HashMap<Option<MessageId>, Vec<&MessageRecord>> = HashMap::new();
        for record in store.records() {
            children_of.entry(record.parent_id).or_default().push(record);
        }
        for siblings in children_of.values_mut() {
            siblings.sort_by_key(|r| r.created_at);
        }

        fn build_node(
            record: &MessageRecord,
            depth: usize,
            children_of: &HashMap<Option<MessageId>, Vec<&MessageRecord>>,
        ) -> MessageNode {
            let children = children_of
                .get(&Some(record.id))
                .map(|kids| {
                    kids.iter()
                        .map(|kid| build_node(kid, depth + 1, children_of))
                        .collect()
                })
                .unwrap_or_default();
            MessageNode {
                record: record.clone(),
                children,
                depth,
            }
        }

        let roots = children_of
            .get(&None)
            .map(|roots| {
                roots
                    .iter()
                    .map(|root| build_node(root, 0, &children_of))
                    .collect()
            })
            .unwrap_or_default();

        Forest { roots }
    }

    /// Build an id → node index in one walk. Valid only for this forest value.
    pub fn index(&self) -> HashMap<MessageId, &MessageNode> {
        fn walk<'f>(node: &'f MessageNode, index: &mut HashMap<MessageId, &'f MessageNode>) {
            index.insert(node.id(), node);
            for child in &node.children {
                walk(child, index);
            }
        }

        let mut index = HashMap::new();
        for root in &self.roots {
            walk(root, &mut index);
        }
        index
    }

    pub fn find(&self, id: MessageId) -> Option<&MessageNode> {
        self.index().get(&id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use chrono::{Duration, Utc};

    fn seeded(contents: &[(&str, Option<usize>)]) -> (MessageStore, Vec<MessageId>) {
        // Each entry is (content, parent index); timestamps follow entry order.
        let base = Utc::now();
        let mut store = MessageStore::new();
        let mut ids = Vec::new();
        for (offset, (content, parent)) in contents.iter().enumerate() {
            let mut record =
                MessageRecord::new(*content, Role::User, parent.map(|index| ids[index]));
            record.created_at = base + Duration::milliseconds(offset as i64);
            ids.push(record.id);
            store = store.with_added(record).expect("add");
        }
        (store, ids)
    }

    #[test]
    fn builds_linked_forest_with_depths() {
        let (store, ids) = seeded(&[
            ("root", None),
            ("child", Some(0)),
            ("grandchild", Some(1)),
            ("sibling", Some(0)),
        ]);

        let forest = Forest::build(&store);
        assert_eq!(forest.roots.len(), 1);

        let root = &forest.roots[0];
        assert_eq!(root.depth, 0);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].id(), ids[1]);
        assert_eq!(root.children[0].depth, 1);
        assert_eq!(root.children[0].children[0].id(), ids[2]);
        assert_eq!(root.children[0].children[0].depth, 2);
        assert_eq!(root.children[1].id(), ids[3]);
    }

    #[test]
    fn rebuild_is_structurally_identical() {
        let (store, _) = seeded(&[("a", None), ("b", Some(0)), ("c", Some(0)), ("d", Some(2))]);

        assert_eq!(Forest::build(&store), Forest::build(&store));
    }

    #[test]
    fn siblings_are_sorted_chronologically_not_by_insertion() {
        let base = Utc::now();
        let root = MessageRecord::new("root", Role::User, None);
        // Inserted first but created later.
        let mut late = MessageRecord::new("late", Role::Assistant, Some(root.id));
        late.created_at = base + Duration::seconds(10);
        let mut early = MessageRecord::new("early", Role::Assistant, Some(root.id));
        early.created_at = base + Duration::seconds(1);

        let store = MessageStore::new()
            .with_added(root)
            .and_then(|s| s.with_added(late.clone()))
            .and_then(|s| s.with_added(early.clone()))
            .expect("add");

        let forest = Forest::build(&store);
        let children = &forest.roots[0].children;
        assert_eq!(children[0].id(), early.id);
        assert_eq!(children[1].id(), late.id);
        assert_eq!(forest.roots[0].latest_child().map(|n| n.id()), Some(late.id));
    }

    #[test]
    fn same_timestamp_siblings_keep_creation_order() {
        let stamp = Utc::now();
        let mut root = MessageRecord::new("root", Role::User, None);
        root.created_at = stamp;
        let mut first = MessageRecord::new("first", Role::Assistant, Some(root.id));
        first.created_at = stamp;
        let mut second = MessageRecord::new("second", Role::Assistant, Some(root.id));
        second.created_at = stamp;

        let store = MessageStore::new()
            .with_added(root)
            .and_then(|s| s.with_added(first.clone()))
            .and_then(|s| s.with_added(second.clone()))
            .expect("add");

        let forest = Forest::build(&store);
        let children = &forest.roots[0].children;
        assert_eq!(children[0].id(), first.id);
        assert_eq!(children[1].id(), second.id);
    }

    #[test]
    fn index_covers_every_node() {
        let (store, ids) = seeded(&[("a", None), ("b", Some(0)), ("c", Some(1)), ("d", None)]);

        let forest = Forest::build(&store);
        let index = forest.index();
        assert_eq!(index.len(), 4);
        for id in ids {
            assert!(index.contains_key(&id));
        }
    }
}
