//! Per-request streaming state.
//!
//! Deltas accumulate in shared buffers instead of the message store, so the
//! tree is not rebuilt on every token. The buffers, together with the
//! request's cancellation token, live in a slot that is set when a request
//! starts and cleared when it settles; a stale [`AbortHandle`] therefore has
//! nothing to signal against once the request is gone.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::DeltaSink;
use crate::events::ConversationUpdate;

/// Accumulators for one in-flight request.
#[derive(Debug, Default)]
pub(crate) struct StreamBuffers {
    pub reasoning: String,
    pub answer: String,
    /// Set on abort; deltas arriving afterwards are dropped.
    pub closed: bool,
}

/// The coordinator's view of the single outstanding request.
pub(crate) struct InFlightRequest {
    pub token: CancellationToken,
    pub buffers: Arc<Mutex<StreamBuffers>>,
}

pub(crate) type RequestSlot = Arc<Mutex<Option<InFlightRequest>>>;

/// Cancels the request currently occupying the slot, if any.
///
/// Cloneable and callable from outside the coordinator while a send or
/// regenerate future is being awaited. Aborting when nothing is in flight is
/// a no-op.
#[derive(Clone)]
pub struct AbortHandle {
    pub(crate) slot: RequestSlot,
}

impl AbortHandle {
    /// Signal the in-flight call to stop. Returns whether a request was
    /// actually aborted.
    pub fn abort(&self) -> bool {
        let guard = self.slot.lock().unwrap();
        match guard.as_ref() {
            Some(request) => {
                {
                    let mut buffers = request.buffers.lock().unwrap();
                    if buffers.closed {
                        return false;
                    }
                    buffers.closed = true;
                }
                request.token.cancel();
                tracing::info!("abort requested for in-flight completion");
                true
            }
            None => {
                tracing::debug!("abort requested with no request in flight");
                false
            }
        }
    }
}

/// Sink handed to the completion client; appends deltas to the shared
/// buffers and mirrors them onto the update channel.
pub(crate) struct CoordinatorSink {
    pub buffers: Arc<Mutex<StreamBuffers>>,
    pub updates: mpsc::UnboundedSender<ConversationUpdate>,
}

impl DeltaSink for CoordinatorSink {
    fn reasoning_delta(&self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        let mut buffers = self.buffers.lock().unwrap();
        if buffers.closed {
            tracing::trace!(delta_len = delta.len(), "dropping reasoning delta after abort");
            return;
        }
        buffers.reasoning.push_str(delta);
        let _ = self.updates.send(ConversationUpdate::ReasoningDelta {
            delta: delta.to_string(),
            accumulated: buffers.reasoning.clone(),
        });
    }

    fn answer_delta(&self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        let mut buffers = self.buffers.lock().unwrap();
        if buffers.closed {
            tracing::trace!(delta_len = delta.len(), "dropping answer delta after abort");
            return;
        }
        buffers.answer.push_str(delta);
        let _ = self.updates.send(ConversationUpdate::AnswerDelta {
            delta: delta.to_string(),
            accumulated: buffers.answer.clone(),
        });
    }
}
