//! Lifecycle coordinator.
//!
//! Owns the store, the active path, the in-flight flag and the streaming
//! buffers. Single-flight: at most one completion request is outstanding at
//! a time, guarded before any mutation. Every failure path terminates in
//! either a synchronous [`EngineError`] or a user-visible assistant record;
//! nothing propagates uncaught.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use conversation_core::{
    active_nodes, ancestry_ids, ancestry_of, navigate, sibling_info, Direction, Forest, MessageId,
    MessageRecord, MessageStore, RecordPatch, Role, SiblingInfo,
};

use crate::client::{ChatTurn, CompletionClient, CompletionError, DeltaSink};
use crate::error::EngineError;
use crate::events::{ConversationUpdate, RequestOutcome};
use crate::streaming::{AbortHandle, CoordinatorSink, InFlightRequest, RequestSlot, StreamBuffers};

/// Final content of an aborted reply that produced no deltas.
pub const INTERRUPTED_FALLBACK: &str = "[generation interrupted]";

/// Final content of a completed reply whose backend returned nothing.
pub const EMPTY_REPLY_FALLBACK: &str = "[empty response]";

/// One row of the render contract: everything the external renderer needs
/// for a node on the active path.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Whether this node is the one currently being streamed into.
    pub is_streaming: bool,
    pub siblings: SiblingInfo,
    /// Edit/regenerate are only offered while no request is in flight.
    pub can_edit: bool,
}

/// Live contents of the streaming buffers while a request is in flight.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct StreamingSnapshot {
    pub reasoning: String,
    pub answer: String,
}

/// Where the settled reply text lands.
enum PendingReply {
    /// Append a fresh assistant record under `parent` (the send path).
    Append { parent: MessageId },
    /// Fill in the placeholder created up front (regenerate/edit paths).
    Replace { id: MessageId },
}

pub struct ChatCoordinator {
    store: MessageStore,
    active_path: Vec<MessageId>,
    is_loading: bool,
    /// Placeholder record being streamed into, when one exists.
    pending_id: Option<MessageId>,
    /// Cancellation plumbing for the single outstanding request; `None`
    /// between requests so a stale abort has nothing to signal against.
    slot: RequestSlot,
    welcome: Option<String>,
    client: Arc<dyn CompletionClient>,
    updates: mpsc::UnboundedSender<ConversationUpdate>,
}

impl ChatCoordinator {
    pub fn new(
        client: Arc<dyn CompletionClient>,
    ) -> (Self, mpsc::UnboundedReceiver<ConversationUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            store: MessageStore::new(),
            active_path: Vec::new(),
            is_loading: false,
            pending_id: None,
            slot: Arc::new(Mutex::new(None)),
            welcome: None,
            client,
            updates: tx,
        };
        (coordinator, rx)
    }

    /// Like [`new`](Self::new), but seeds the conversation with a root
    /// assistant greeting and points the active path at it.
    pub fn with_welcome_message(
        client: Arc<dyn CompletionClient>,
        welcome: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<ConversationUpdate>) {
        let (mut coordinator, rx) = Self::new(client);
        coordinator.welcome = Some(welcome.into());
        coordinator.seed_welcome();
        (coordinator, rx)
    }

    fn seed_welcome(&mut self) {
        let Some(text) = self.welcome.clone() else {
            return;
        };
        let record = MessageRecord::new(text, Role::Assistant, None);
        let id = record.id;
        match self.store.with_added(record) {
            Ok(next) => {
                self.store = next;
                self.active_path = vec![id];
                self.emit(ConversationUpdate::MessageAdded {
                    message_id: id,
                    role: Role::Assistant,
                });
                self.emit_path_changed();
            }
            Err(err) => tracing::error!(error = %err, "failed to seed welcome message"),
        }
    }

    // ========== Read accessors ==========

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn active_path(&self) -> &[MessageId] {
        &self.active_path
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Handle for aborting whatever request is in flight, usable while a
    /// `send`/`regenerate`/`edit_user_message` future is being awaited.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            slot: self.slot.clone(),
        }
    }

    /// Signal the in-flight call to stop; no-op when nothing is in flight.
    pub fn abort_request(&self) -> bool {
        self.abort_handle().abort()
    }

    /// Live streaming buffers, `None` when no request is in flight.
    pub fn streaming_snapshot(&self) -> Option<StreamingSnapshot> {
        let guard = self.slot.lock().unwrap();
        guard.as_ref().map(|request| {
            let buffers = request.buffers.lock().unwrap();
            StreamingSnapshot {
                reasoning: buffers.reasoning.clone(),
                answer: buffers.answer.clone(),
            }
        })
    }

    /// The node sequence to render, one row per active-path entry.
    pub fn active_view(&self) -> Vec<RenderedMessage> {
        let forest = Forest::build(&self.store);
        active_nodes(&self.active_path, &forest)
            .into_iter()
            .map(|node| {
                let id = node.id();
                RenderedMessage {
                    id,
                    role: node.record.role,
                    content: node.record.content.clone(),
                    reasoning: node.record.reasoning.clone(),
                    is_streaming: self.is_loading && self.pending_id == Some(id),
                    siblings: sibling_info(&forest, id)
                        .unwrap_or(SiblingInfo { index: 0, total: 1 }),
                    can_edit: !self.is_loading,
                }
            })
            .collect()
    }

    // ========== Navigation ==========

    /// Step the active path sideways to `id`'s previous/next sibling,
    /// descending into the newest variant below it. `None` when there is no
    /// sibling in that direction.
    pub fn navigate_sibling(
        &mut self,
        id: MessageId,
        direction: Direction,
    ) -> Option<&[MessageId]> {
        let forest = Forest::build(&self.store);
        let new_path = navigate(&forest, &self.active_path, id, direction)?;
        self.active_path = new_path;
        self.emit_path_changed();
        Some(&self.active_path)
    }

    // ========== Lifecycle operations ==========

    /// Append a user turn at the end of the active path and request a reply.
    /// Returns the new user record's id.
    pub async fn send(&mut self, content: &str) -> Result<MessageId, EngineError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::EmptyMessageContent);
        }
        if self.is_loading {
            return Err(EngineError::RequestInFlight);
        }

        let parent = self.active_path.last().copied();
        let user = MessageRecord::new(content, Role::User, parent);
        let user_id = user.id;
        self.store = self.store.with_added(user)?;
        self.active_path.push(user_id);
        self.emit(ConversationUpdate::MessageAdded {
            message_id: user_id,
            role: Role::User,
        });
        self.emit_path_changed();

        tracing::info!(message_id = %user_id, parent_id = ?parent, "user message sent");

        let history = self.history_for(user_id)?;
        self.run_request(history, PendingReply::Append { parent: user_id })
            .await;
        Ok(user_id)
    }

    /// Produce a sibling variant of an existing reply. For an assistant
    /// target the new reply shares the target's parent; for a user target it
    /// becomes an alternative reply to that turn. The replaced output is
    /// never part of the request context. Returns the placeholder's id.
    pub async fn regenerate(&mut self, target_id: MessageId) -> Result<MessageId, EngineError> {
        if self.is_loading {
            return Err(EngineError::RequestInFlight);
        }
        let target = self
            .store
            .get(target_id)
            .ok_or(EngineError::UnknownMessage(target_id))?;

        let parent = match target.role {
            Role::Assistant => target.parent_id,
            Role::User => Some(target_id),
        };

        tracing::info!(target_id = %target_id, role = ?target.role, "regenerating reply");
        self.spawn_variant(parent).await
    }

    /// Edit a user turn by inserting a sibling variant carrying the new
    /// content, then generating a reply to it. Returns the new user
    /// record's id.
    pub async fn edit_user_message(
        &mut self,
        target_id: MessageId,
        new_content: &str,
    ) -> Result<MessageId, EngineError> {
        let new_content = new_content.trim();
        if new_content.is_empty() {
            return Err(EngineError::EmptyMessageContent);
        }
        if self.is_loading {
            return Err(EngineError::RequestInFlight);
        }
        let target = self
            .store
            .get(target_id)
            .ok_or(EngineError::UnknownMessage(target_id))?;
        if target.role != Role::User {
            return Err(EngineError::NotAUserMessage(target_id));
        }

        let sibling = MessageRecord::new(new_content, Role::User, target.parent_id);
        let sibling_id = sibling.id;
        self.store = self.store.with_added(sibling)?;
        self.emit(ConversationUpdate::MessageAdded {
            message_id: sibling_id,
            role: Role::User,
        });

        tracing::info!(target_id = %target_id, sibling_id = %sibling_id, "user message edited");

        self.spawn_variant(Some(sibling_id)).await?;
        Ok(sibling_id)
    }

    /// Abort any in-flight request and reset the conversation, re-seeding
    /// the welcome message when one was configured.
    pub fn clear_conversation(&mut self) {
        self.abort_request();
        self.store = MessageStore::new();
        self.active_path.clear();
        self.pending_id = None;
        self.emit(ConversationUpdate::ConversationCleared);
        self.seed_welcome();
        if self.welcome.is_none() {
            self.emit_path_changed();
        }
    }

    // ========== Internals ==========

    /// Insert a "generating" placeholder under `parent`, repoint the active
    /// path at it, and run the request that fills it in.
    async fn spawn_variant(
        &mut self,
        parent: Option<MessageId>,
    ) -> Result<MessageId, EngineError> {
        // History first: the placeholder itself must never enter the context.
        let history = match parent {
            Some(parent_id) => self.history_for(parent_id)?,
            None => Vec::new(),
        };

        let placeholder = MessageRecord::new("", Role::Assistant, parent);
        let placeholder_id = placeholder.id;
        self.store = self.store.with_added(placeholder)?;
        self.active_path = ancestry_ids(&self.store, placeholder_id)?;
        self.pending_id = Some(placeholder_id);
        self.emit(ConversationUpdate::MessageAdded {
            message_id: placeholder_id,
            role: Role::Assistant,
        });
        self.emit_path_changed();

        self.run_request(history, PendingReply::Replace { id: placeholder_id })
            .await;
        Ok(placeholder_id)
    }

    /// Ancestry of `id` as request turns: role and visible content only.
    fn history_for(&self, id: MessageId) -> Result<Vec<ChatTurn>, EngineError> {
        let ancestry = ancestry_of(&self.store, id)?;
        Ok(ancestry
            .into_iter()
            .map(|record| ChatTurn {
                role: record.role,
                content: record.content,
            })
            .collect())
    }

    /// Drive one completion request to a settled record. Infallible by
    /// design: completion, cancellation and backend failure each write
    /// their own record.
    async fn run_request(&mut self, history: Vec<ChatTurn>, reply: PendingReply) {
        let buffers = Arc::new(Mutex::new(StreamBuffers::default()));
        let token = CancellationToken::new();
        *self.slot.lock().unwrap() = Some(InFlightRequest {
            token: token.clone(),
            buffers: buffers.clone(),
        });
        self.is_loading = true;
        self.emit(ConversationUpdate::RequestStarted);

        tracing::info!(turns = history.len(), "starting completion request");

        let sink: Arc<dyn DeltaSink> = Arc::new(CoordinatorSink {
            buffers: buffers.clone(),
            updates: self.updates.clone(),
        });
        let client = Arc::clone(&self.client);
        let result = client.stream_completion(history, token, sink).await;

        let (answer, reasoning) = {
            let guard = buffers.lock().unwrap();
            (guard.answer.clone(), guard.reasoning.clone())
        };
        let buffered_reasoning = (!reasoning.is_empty()).then_some(reasoning);

        let outcome = match result {
            Ok(completion) => {
                let content = if !completion.content.is_empty() {
                    completion.content
                } else if !answer.is_empty() {
                    answer
                } else {
                    EMPTY_REPLY_FALLBACK.to_string()
                };
                let reasoning = completion.reasoning.or(buffered_reasoning);
                self.settle_reply(&reply, content, reasoning);
                RequestOutcome::Completed
            }
            Err(CompletionError::Cancelled) => {
                let content = if answer.is_empty() {
                    INTERRUPTED_FALLBACK.to_string()
                } else {
                    answer
                };
                self.settle_reply(&reply, content, buffered_reasoning);
                RequestOutcome::Interrupted
            }
            Err(CompletionError::Backend(err)) => {
                tracing::warn!(error = %err, "completion request failed");
                self.settle_reply(&reply, format!("Sorry, something went wrong: {err}"), None);
                RequestOutcome::Failed
            }
        };

        // Drop the slot so a stale abort cannot touch the next request.
        *self.slot.lock().unwrap() = None;
        self.is_loading = false;
        self.pending_id = None;
        self.emit(ConversationUpdate::RequestFinished { outcome });
    }

    /// Write the settled reply into the tree and repoint the active path at
    /// it. Store failures here cannot occur under the engine's invariants;
    /// they are logged rather than propagated.
    fn settle_reply(&mut self, reply: &PendingReply, content: String, reasoning: Option<String>) {
        let settled_id = match reply {
            PendingReply::Append { parent } => {
                let mut record = MessageRecord::new(content, Role::Assistant, Some(*parent));
                record.reasoning = reasoning;
                let id = record.id;
                match self.store.with_added(record) {
                    Ok(next) => self.store = next,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to append settled reply");
                        return;
                    }
                }
                self.emit(ConversationUpdate::MessageAdded {
                    message_id: id,
                    role: Role::Assistant,
                });
                id
            }
            PendingReply::Replace { id } => {
                let mut patch = RecordPatch::content(content);
                patch.reasoning = reasoning;
                match self.store.with_replaced(*id, patch) {
                    Ok(next) => self.store = next,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to fill in placeholder reply");
                        return;
                    }
                }
                *id
            }
        };

        match ancestry_ids(&self.store, settled_id) {
            Ok(path) => {
                self.active_path = path;
                self.emit_path_changed();
            }
            Err(err) => tracing::error!(error = %err, "settled reply has no ancestry"),
        }
        self.emit(ConversationUpdate::MessageCompleted {
            message_id: settled_id,
        });

        tracing::info!(message_id = %settled_id, "reply settled");
    }

    fn emit(&self, update: ConversationUpdate) {
        // A dropped receiver only means nobody is rendering.
        let _ = self.updates.send(update);
    }

    fn emit_path_changed(&self) {
        self.emit(ConversationUpdate::PathChanged {
            active_path: self.active_path.clone(),
        });
    }
}
