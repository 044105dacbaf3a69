//! ==============================================================================
//! chat.rs - the assistant chat widget
//! ==============================================================================
//!
//! purpose:
//!     keeps the chat transcript and the open/closed toggle, and turns each
//!     user message into one background generation request.
//!
//! relationships:
//!     - used by: dashboard.rs (send, toggle, snapshot)
//!     - used by: main.rs (shutdown on exit)
//!     - uses: llm.rs (TextGenerator)
//!
//! failure policy:
//!     every error, whatever its cause, becomes the same fallback reply in the
//!     transcript. nothing is retried.
//!
//! lifecycle:
//!     each send is its own tokio task. shutdown() aborts whatever is still in
//!     flight, so a torn-down widget never gets a late reply appended.
//!
//! ==============================================================================

use crate::domain::ChatMessage;
use crate::llm::TextGenerator;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// reply used when the request fails for any reason
pub const OFFLINE_REPLY: &str =
    "Sorry, I couldn't reach the hive assistant. Please check your connection and try again.";

/// reply used when the api answers with nothing
pub const EMPTY_REPLY: &str = "Sorry, I don't have an answer for that right now.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatState {
    pub open: bool,
    /// true while at least one request is in flight
    pub pending: bool,
    pub transcript: Vec<ChatMessage>,
    #[serde(skip)]
    pub(crate) in_flight: usize,
    #[serde(skip)]
    pub(crate) closed_for_good: bool,
}

/// clone-able handle to the widget state and its background requests
pub struct ChatWidget<G> {
    state: Arc<RwLock<ChatState>>,
    generator: Arc<G>,
    persona: Arc<str>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl<G> Clone for ChatWidget<G> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            generator: self.generator.clone(),
            persona: self.persona.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

impl<G: TextGenerator> ChatWidget<G> {
    pub fn new(generator: G, persona: impl Into<Arc<str>>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChatState::default())),
            generator: Arc::new(generator),
            persona: persona.into(),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// flip between open and closed; returns the new visibility
    pub async fn toggle(&self) -> bool {
        let mut state = self.state.write().await;
        state.open = !state.open;
        state.open
    }

    pub async fn snapshot(&self) -> ChatState {
        self.state.read().await.clone()
    }

    /// queue `text` for the assistant
    ///
    /// blank input is ignored and returns false. otherwise the user line is in
    /// the transcript before this returns; the reply lands later.
    pub async fn send(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        {
            let mut state = self.state.write().await;
            if state.closed_for_good {
                return false;
            }
            state.transcript.push(ChatMessage::user(text));
            state.in_flight += 1;
            state.pending = true;
        }

        let state = self.state.clone();
        let generator = self.generator.clone();
        let persona = self.persona.clone();
        let text = text.to_string();

        let handle = tokio::spawn(async move {
            let reply = match generator.generate(&persona, &text).await {
                Ok(reply) if !reply.trim().is_empty() => reply,
                Ok(_) => EMPTY_REPLY.to_string(),
                Err(e) => {
                    tracing::warn!("[CHAT] generation failed: {:#}", e);
                    OFFLINE_REPLY.to_string()
                }
            };

            let mut state = state.write().await;
            if state.closed_for_good {
                return;
            }
            state.transcript.push(ChatMessage::assistant(reply));
            state.in_flight = state.in_flight.saturating_sub(1);
            state.pending = state.in_flight > 0;
        });

        let mut tasks = self.tasks.lock().await;
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
        true
    }

    /// wait for every request sent so far to finish
    #[cfg(test)]
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.tasks.lock().await);
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// abort in-flight requests and refuse new ones
    ///
    /// the flag goes up first so a request spawned after the handles are
    /// taken still drops its reply.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write().await;
            state.closed_for_good = true;
            state.in_flight = 0;
            state.pending = false;
        }

        let handles = std::mem::take(&mut *self.tasks.lock().await);
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}
