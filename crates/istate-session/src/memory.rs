//! In-process host channel and resolver for tests and embedding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use istate_types::HandshakeResult;

use crate::error::{SessionError, SessionResult};
use crate::handshake::HostChannel;
use crate::reconcile::{ConflictChoice, ConflictPrompt, ConflictResolver};

/// Host channel that answers every handshake with a fixed result.
pub struct StaticHostChannel {
    response: Result<HandshakeResult, String>,
    requests: AtomicUsize,
}

impl StaticHostChannel {
    pub fn new(result: HandshakeResult) -> Self {
        Self {
            response: Ok(result),
            requests: AtomicUsize::new(0),
        }
    }

    /// A channel whose handshake always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of handshake requests received.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostChannel for StaticHostChannel {
    async fn init_interactive(&self) -> SessionResult<HandshakeResult> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(SessionError::Transport)
    }
}

/// Resolver that always gives the same answer and records what it was asked.
pub struct FixedResolver {
    choice: ConflictChoice,
    prompts: Mutex<Vec<ConflictPrompt>>,
}

impl FixedResolver {
    pub fn new(choice: ConflictChoice) -> Self {
        Self {
            choice,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of prompts answered.
    pub fn prompts(&self) -> usize {
        self.prompts.lock().expect("lock poisoned").len()
    }

    pub fn last_prompt(&self) -> Option<ConflictPrompt> {
        self.prompts.lock().expect("lock poisoned").last().cloned()
    }
}

#[async_trait]
impl ConflictResolver for FixedResolver {
    async fn choose(&self, prompt: &ConflictPrompt) -> ConflictChoice {
        self.prompts
            .lock()
            .expect("lock poisoned")
            .push(prompt.clone());
        self.choice
    }
}
