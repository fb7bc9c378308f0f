use thiserror::Error;
use uuid::Uuid;

use conversation_core::StoreError;

/// Validation failures surfaced synchronously by the coordinator. None of
/// these mutate state; network failures never appear here, they terminate in
/// an assistant-role error record instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("message content cannot be empty")]
    EmptyMessageContent,

    #[error("a request is already in flight")]
    RequestInFlight,

    #[error("unknown message: {0}")]
    UnknownMessage(Uuid),

    #[error("message {0} is not a user message")]
    NotAUserMessage(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}
