//! Turn events emitted by the dialog engine
//!
//! Every mutating operation on a conversation's stack yields plain,
//! serializable event values, returned in the turn result. They are data,
//! not a bus: hosts log them, tests assert on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A flow was begun, either as the root or as a child
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowStarted {
    pub conversation_id: String,
    pub dialog_id: String,
    pub frame_id: Uuid,
    /// Stack depth of the new frame; 0 = root flow
    pub depth: usize,
    pub started_at: DateTime<Utc>,
}

/// A prompt was sent and the flow suspended awaiting the reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptIssued {
    pub conversation_id: String,
    pub dialog_id: String,
    pub prompt_text: String,
    /// True when re-issued after a failed reply
    pub retry: bool,
}

/// A reply was recognized and stored or handed to the next step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerCollected {
    pub conversation_id: String,
    pub dialog_id: String,
    /// Slot name for slot-filling dialogs; `None` for step flows
    pub slot: Option<String>,
    pub value: Value,
}

/// A reply failed recognition or validation; the prompt was re-issued
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognitionRetried {
    pub conversation_id: String,
    pub dialog_id: String,
    pub reason: String,
}

/// A flow finished and its frame was popped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowCompleted {
    pub conversation_id: String,
    pub dialog_id: String,
    pub frame_id: Uuid,
    pub output: Value,
    pub completed_at: DateTime<Utc>,
}

/// A cancellation token unwound the whole stack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationCancelled {
    pub conversation_id: String,
    /// The matched token, e.g. `quit`
    pub token: String,
    /// How many frames were discarded, partial values included
    pub discarded_frames: usize,
    pub cancelled_at: DateTime<Utc>,
}

/// All events a turn can produce
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DialogEvent {
    FlowStarted(FlowStarted),
    PromptIssued(PromptIssued),
    AnswerCollected(AnswerCollected),
    RecognitionRetried(RecognitionRetried),
    FlowCompleted(FlowCompleted),
    ConversationCancelled(ConversationCancelled),
}

impl DialogEvent {
    /// Stable name of the event variant
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::FlowStarted(_) => "FlowStarted",
            Self::PromptIssued(_) => "PromptIssued",
            Self::AnswerCollected(_) => "AnswerCollected",
            Self::RecognitionRetried(_) => "RecognitionRetried",
            Self::FlowCompleted(_) => "FlowCompleted",
            Self::ConversationCancelled(_) => "ConversationCancelled",
        }
    }
}
