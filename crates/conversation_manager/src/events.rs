//! Structured updates emitted to the renderer.
//!
//! Every mutation and every streaming delta pushes one update over the
//! coordinator's channel so an external view can mirror engine state without
//! polling. Deltas do not touch the message store; the record is only
//! materialized at completion or abort.

use serde::{Deserialize, Serialize};

use conversation_core::{MessageId, Role};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationUpdate {
    /// A record was inserted into the store.
    MessageAdded { message_id: MessageId, role: Role },

    /// A streaming response settled into its final record.
    MessageCompleted { message_id: MessageId },

    /// The active path moved (new message, navigation, or completion).
    PathChanged { active_path: Vec<MessageId> },

    RequestStarted,

    /// Accumulated reasoning text grew by `delta`.
    ReasoningDelta { delta: String, accumulated: String },

    /// Accumulated answer text grew by `delta`.
    AnswerDelta { delta: String, accumulated: String },

    RequestFinished { outcome: RequestOutcome },

    ConversationCleared,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Completed,
    /// User-initiated abort; partial content was kept.
    Interrupted,
    /// Backend failure; an error record was written in the reply's place.
    Failed,
}
