use std::fmt;

use ai::{Agent, AgentEvent};
use db::Database;
use tracing::{debug, warn};

use crate::answer::{AgentOutcome, normalize_answer};
use crate::message::{Message, Transcript};

/// Where the loop is while handling one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    QueryReceived,
    AnswerPending,
    AnswerRecorded,
}

/// Displays the conversation. Called once per appended message, immediately.
pub trait Renderer: Send {
    fn render_message(&mut self, message: &Message);

    /// Intermediate agent activity while an answer is pending.
    fn render_event(&mut self, _event: &AgentEvent) {}

    /// The transcript was reset; the greeting is rendered right after.
    fn clear(&mut self) {}
}

/// The question/answer loop over a [`Transcript`].
pub struct Conversation<R> {
    transcript: Transcript,
    state: LoopState,
    renderer: R,
}

impl<R> fmt::Debug for Conversation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("transcript", &self.transcript)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<R: Renderer> Conversation<R> {
    /// Starts from the greeting and renders it.
    pub fn new(renderer: R) -> Self {
        let mut conversation = Self {
            transcript: Transcript::new(),
            state: LoopState::Idle,
            renderer,
        };
        conversation.render_transcript();
        conversation
    }

    /// Back to the single greeting, whatever happened before.
    pub fn reset(&mut self) {
        debug!(messages = self.transcript.len(), "resetting transcript");
        self.transcript.reset();
        self.state = LoopState::Idle;
        self.renderer.clear();
        self.render_transcript();
    }

    /// Handles one question and returns the assistant message recorded for
    /// it. Blank input is ignored and returns `None`.
    ///
    /// Agent failures never escape: they are logged and recorded as
    /// [`FALLBACK_ANSWER`](crate::FALLBACK_ANSWER).
    pub async fn submit(
        &mut self,
        query: &str,
        agent: &dyn Agent,
        database: &dyn Database,
    ) -> Option<&Message> {
        if query.trim().is_empty() {
            return None;
        }

        self.state = LoopState::QueryReceived;
        self.append(Message::user(query));

        self.state = LoopState::AnswerPending;
        let renderer = &mut self.renderer;
        let result = agent
            .answer(query, database, &mut |event: AgentEvent| renderer.render_event(&event))
            .await;

        let outcome = AgentOutcome::from(result);
        if let AgentOutcome::Failure(reason) = &outcome {
            warn!(%reason, "agent failed, recording fallback answer");
        }

        self.state = LoopState::AnswerRecorded;
        self.append(Message::assistant(normalize_answer(&outcome)));

        self.state = LoopState::Idle;
        self.transcript.last()
    }

    fn append(&mut self, message: Message) {
        let message = self.transcript.push(message);
        self.renderer.render_message(message);
    }

    fn render_transcript(&mut self) {
        for message in self.transcript.messages() {
            self.renderer.render_message(message);
        }
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}
