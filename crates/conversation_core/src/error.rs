use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while manipulating a [`MessageStore`].
///
/// [`MessageStore`]: crate::store::MessageStore
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with this id is already present; ids are never reused.
    #[error("message {0} already exists in the store")]
    DuplicateId(Uuid),

    /// The referenced record does not exist.
    #[error("message {0} does not exist in the store")]
    UnknownId(Uuid),

    /// A new record referenced a parent that is not in the store.
    #[error("parent message {0} does not exist in the store")]
    UnknownParent(Uuid),
}
