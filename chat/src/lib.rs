//! Conversation state for one chat session: the transcript, the loop that
//! turns a question into exactly one assistant reply, and the rules that
//! collapse empty or failed answers into a single fallback message.

pub mod answer;
pub mod conversation;
pub mod message;
pub mod session;

pub use answer::{AgentOutcome, FALLBACK_ANSWER, SENTINEL_ANSWERS, normalize_answer};
pub use conversation::{Conversation, LoopState, Renderer};
pub use message::{GREETING, Message, Role, Transcript};
pub use session::ChatSession;
