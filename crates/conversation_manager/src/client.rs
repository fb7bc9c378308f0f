//! Contract with the injected model backend.
//!
//! The engine never talks to the network itself: it hands the client an
//! ancestry-ordered history of `{role, content}` turns plus a cancellation
//! token, and receives decoded text deltas back through a [`DeltaSink`]
//! while the call is in flight.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use conversation_core::Role;

/// One turn of request history. Visible content only; reasoning is never
/// echoed back into a request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// The settled result of a streaming completion.
#[derive(Clone, Debug, Default)]
pub struct Completion {
    pub content: String,
    pub reasoning: Option<String>,
}

/// Failure outcomes of a completion call. Cancellation is distinguishable
/// from every other failure and is not treated as an error by the engine.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("cancelled")]
    Cancelled,

    #[error("backend error: {0}")]
    Backend(String),
}

/// Push-based sink for decoded stream deltas. Implementations must tolerate
/// deltas arriving interleaved with an abort; late deltas are dropped.
pub trait DeltaSink: Send + Sync {
    fn reasoning_delta(&self, delta: &str);
    fn answer_delta(&self, delta: &str);
}

/// A streaming model backend. The engine creates a fresh cancellation token
/// per request; implementations should stop delivering deltas and return
/// [`CompletionError::Cancelled`] once it fires.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn stream_completion(
        &self,
        history: Vec<ChatTurn>,
        cancel: CancellationToken,
        sink: Arc<dyn DeltaSink>,
    ) -> Result<Completion, CompletionError>;
}
