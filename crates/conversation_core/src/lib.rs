//! `conversation_core` is the data model for branching, multi-variant
//! conversations: a copy-on-write message store, the derived message forest,
//! and the path/branch lookups an interface layer renders from.

pub mod error;
pub mod message;
pub mod navigate;
pub mod path;
pub mod store;
pub mod tree;

// Re-export the public API
pub use error::StoreError;
pub use message::{MessageId, MessageRecord, RecordPatch, Role};
pub use navigate::{navigate, sibling_info, Direction, SiblingInfo};
pub use path::{active_nodes, ancestry_ids, ancestry_of};
pub use store::MessageStore;
pub use tree::{Forest, MessageNode};
