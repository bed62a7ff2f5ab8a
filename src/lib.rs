//! Multi-step dialog orchestration engine
//!
//! This crate manages nested, resumable conversational flows over a sequence
//! of incoming messages. It provides:
//! - Prompt primitives (text, number, choice, confirm) with validation and
//!   retry
//! - Slot-filling dialogs that collect an ordered list of named answers
//! - A generalized step flow engine with branching and child-flow delegation
//! - A persisted per-conversation dialog stack that suspends at each prompt
//!   and resumes exactly where it left off
//! - A conversation router that begins the root flow and dispatches completed
//!   records to a result renderer
//!
//! Each turn is a discrete invocation: the engine loads the conversation's
//! stack, processes exactly one message to the next suspension point, and
//! saves the stack again, so the hosting process may restart between
//! messages without losing a flow's place.

pub mod descriptor;
pub mod engine;
pub mod error;
pub mod events;
pub mod flows;
pub mod persistence;
pub mod prompts;
pub mod render;
pub mod router;
pub mod stack;
pub mod value_objects;

// Re-export main types
pub use descriptor::{
    DialogBody, DialogDescriptor, DialogRegistry, StepContext, StepFn, StepOutcome,
};

pub use engine::{CANCEL_TOKENS, DialogStackManager, DialogTurnResult, TurnStatus, is_cancellation};

pub use error::DialogError;

pub use events::{
    AnswerCollected, ConversationCancelled, DialogEvent, FlowCompleted, FlowStarted, PromptIssued,
    RecognitionRetried,
};

pub use persistence::{InMemoryStackStore, StackStore};

pub use prompts::{RecognitionFailure, ValidatorFn, recognize};

pub use render::{SummaryKind, render};

pub use router::{ConversationRouter, OutboundSink};

pub use stack::{ConversationState, DialogStackFrame, FrameStatus, PendingPrompt};

pub use value_objects::{
    Choice, CollectedRecord, InboundMessage, OutboundReply, PromptKind, PromptSpec, SlotSpec,
};
