//! `conversation_manager` orchestrates streaming, cancellable model requests
//! on top of the `conversation_core` message tree: send, regenerate, edit and
//! abort, with a single in-flight request at a time and push-based delta
//! delivery from an injected completion client.

pub mod client;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod streaming;

// Re-export the public API
pub use client::{ChatTurn, Completion, CompletionClient, CompletionError, DeltaSink};
pub use coordinator::{
    ChatCoordinator, RenderedMessage, StreamingSnapshot, EMPTY_REPLY_FALLBACK,
    INTERRUPTED_FALLBACK,
};
pub use error::EngineError;
// Core types that appear in this crate's signatures.
pub use conversation_core::{Direction, MessageId, Role, SiblingInfo};
pub use events::{ConversationUpdate, RequestOutcome};
pub use streaming::AbortHandle;
