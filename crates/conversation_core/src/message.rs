use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a message record. Generated at creation, never reused.
pub type MessageId = Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single message variant in the conversation tree.
///
/// Records are immutable once stored; the only sanctioned mutation is the
/// content/reasoning fill-in applied through [`RecordPatch`] when a streaming
/// response completes or is aborted. Children are derived from `parent_id`
/// links, never stored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MessageRecord {
    pub id: MessageId,

    /// The visible text of the message.
    pub content: String,

    pub role: Role,

    /// Creation time, used only for deterministic chronological ordering
    /// of sibling variants.
    pub created_at: DateTime<Utc>,

    /// The preceding message in this branch, or `None` for a conversation root.
    pub parent_id: Option<MessageId>,

    /// The model's intermediate reasoning, present only on assistant records.
    /// Never sent back to the model in later requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl MessageRecord {
    pub fn new(content: impl Into<String>, role: Role, parent_id: Option<MessageId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            role,
            created_at: Utc::now(),
            parent_id,
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Fill-in applied to an existing record when its streaming response settles.
/// Fields left as `None` are preserved.
#[derive(Clone, Debug, Default)]
pub struct RecordPatch {
    pub content: Option<String>,
    pub reasoning: Option<String>,
}

impl RecordPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}
