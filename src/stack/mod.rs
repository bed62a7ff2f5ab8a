//! Dialog stack frames and persisted conversation state
//!
//! A frame is the explicit activation record of one running flow: which
//! dialog it is, where its step cursor stands, the values collected so far,
//! and what it is waiting for. Everything needed to resume a suspended flow
//! lives here, so a conversation can be serialized between turns and picked
//! up by a later process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::descriptor::DialogRegistry;
use crate::error::DialogError;
use crate::value_objects::{Choice, CollectedRecord, OutboundReply, PromptKind, PromptSpec};

/// A prompt that has been issued and is awaiting the next user message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingPrompt {
    /// Kind of answer expected
    pub kind: PromptKind,
    /// Original question text
    pub text: String,
    /// Distinct text for re-issuing after a failed reply
    pub retry_text: Option<String>,
    /// Options for a choice prompt
    pub choices: Vec<Choice>,
    /// Name of the registered validator to run after recognition
    pub validator: Option<String>,
    /// Target slot name when issued by a slot-filling dialog
    pub slot: Option<String>,
}

impl PendingPrompt {
    /// Build the pending state for a prompt about to be issued
    pub fn from_spec(spec: PromptSpec, slot: Option<String>) -> Self {
        Self {
            kind: spec.kind,
            text: spec.text,
            retry_text: spec.retry_text,
            choices: spec.choices,
            validator: spec.validator,
            slot,
        }
    }

    /// The outbound reply that (re-)issues this prompt
    ///
    /// A retry substitutes the retry text when one is configured; the prompt
    /// itself stays the same logical question.
    pub fn reply(&self, retry: bool) -> OutboundReply {
        let text = if retry {
            self.retry_text.as_ref().unwrap_or(&self.text).clone()
        } else {
            self.text.clone()
        };
        OutboundReply::Prompt {
            text,
            choices: self.choices.clone(),
        }
    }
}

/// What a frame is waiting for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FrameStatus {
    /// Ready to run its next step or issue its next slot prompt
    AwaitingStepAdvance,
    /// Suspended on an issued prompt
    AwaitingPromptReply(PendingPrompt),
    /// Suspended while a child frame above it runs
    AwaitingChildCompletion,
    /// Finished; about to be popped
    Complete,
}

/// One activation record on the dialog stack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogStackFrame {
    /// Unique id of this activation
    pub frame_id: Uuid,
    /// The registered flow this frame runs
    pub dialog_id: String,
    /// Cursor into the flow's steps or slots
    pub step_index: usize,
    /// Values collected so far
    pub values: CollectedRecord,
    /// Current suspension state
    pub status: FrameStatus,
}

impl DialogStackFrame {
    /// Create a fresh frame for the named flow
    pub fn new(dialog_id: impl Into<String>, initial_values: Option<CollectedRecord>) -> Self {
        Self {
            frame_id: Uuid::new_v4(),
            dialog_id: dialog_id.into(),
            step_index: 0,
            values: initial_values.unwrap_or_default(),
            status: FrameStatus::AwaitingStepAdvance,
        }
    }

    /// Whether this frame has finished
    pub fn is_complete(&self) -> bool {
        self.status == FrameStatus::Complete
    }
}

/// Per-conversation state persisted between turns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    /// Active frames, bottom = root flow, top = innermost flow
    pub stack: Vec<DialogStackFrame>,
    /// When this state was last written
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// State with no active flows
    pub fn empty() -> Self {
        Self {
            stack: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Whether no flow is active
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Nesting depth of active flows
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Refresh the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Check a loaded stack against the registry before dispatching into it
    ///
    /// A stale or hand-edited store can reference flows that no longer exist
    /// or cursors past the end of a flow; such a stack must never be resumed
    /// by guessing, only surfaced.
    pub fn validate(
        &self,
        conversation_id: &str,
        registry: &DialogRegistry,
    ) -> Result<(), DialogError> {
        let top = self.stack.len().saturating_sub(1);
        for (position, frame) in self.stack.iter().enumerate() {
            let descriptor = registry.get(&frame.dialog_id).map_err(|_| {
                DialogError::corrupt(
                    conversation_id,
                    format!("frame references unregistered dialog '{}'", frame.dialog_id),
                )
            })?;
            if frame.step_index >= descriptor.step_count() {
                return Err(DialogError::corrupt(
                    conversation_id,
                    format!(
                        "step cursor {} out of range for dialog '{}'",
                        frame.step_index, frame.dialog_id
                    ),
                ));
            }
            let waiting_on_child = frame.status == FrameStatus::AwaitingChildCompletion;
            if position < top && !waiting_on_child {
                return Err(DialogError::corrupt(
                    conversation_id,
                    format!("inner frame '{}' is not awaiting its child", frame.dialog_id),
                ));
            }
            if position == top && (waiting_on_child || frame.is_complete()) {
                return Err(DialogError::corrupt(
                    conversation_id,
                    format!("top frame '{}' cannot accept a message", frame.dialog_id),
                ));
            }
        }
        Ok(())
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DialogDescriptor;
    use crate::value_objects::{PromptSpec, SlotSpec};

    fn registry() -> DialogRegistry {
        let mut registry = DialogRegistry::new();
        registry
            .register(DialogDescriptor::slots(
                "laptop",
                vec![
                    SlotSpec::new("company", PromptSpec::text("Company?")),
                    SlotSpec::new("colour", PromptSpec::text("Colour?")),
                ],
            ))
            .unwrap();
        registry
    }

    #[test]
    fn test_validate_accepts_suspended_frame() {
        let registry = registry();
        let mut state = ConversationState::empty();
        let mut frame = DialogStackFrame::new("laptop", None);
        frame.status = FrameStatus::AwaitingPromptReply(PendingPrompt::from_spec(
            PromptSpec::text("Company?"),
            Some("company".to_string()),
        ));
        state.stack.push(frame);

        assert!(state.validate("conv-1", &registry).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_dialog() {
        let registry = registry();
        let mut state = ConversationState::empty();
        state.stack.push(DialogStackFrame::new("vanished", None));

        let err = state.validate("conv-1", &registry).unwrap_err();
        assert!(matches!(err, DialogError::CorruptStack { .. }));
    }

    #[test]
    fn test_validate_rejects_out_of_range_cursor() {
        let registry = registry();
        let mut state = ConversationState::empty();
        let mut frame = DialogStackFrame::new("laptop", None);
        frame.step_index = 7;
        state.stack.push(frame);

        let err = state.validate("conv-1", &registry).unwrap_err();
        assert!(matches!(err, DialogError::CorruptStack { .. }));
    }
}
