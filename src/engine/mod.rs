//! Step flow engine and dialog stack manager
//!
//! The manager owns the persisted dialog stack for each conversation and
//! processes exactly one inbound message per call: load state, feed the
//! message to the top frame, run step functions until the next suspension
//! point, save state, return the turn's replies and events.
//!
//! Suspension points are exactly two: issuing a prompt (wait for the next
//! message) and beginning a child flow (wait for the child to complete).
//! A reserved cancellation token unwinds the whole stack before any frame
//! gets a chance to interpret the input as an answer.
//!
//! The hosting collaborator serializes turns per conversation: one message is
//! processed to completion before the next is accepted. Different
//! conversations are independent and may run in parallel.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::descriptor::{DialogBody, DialogRegistry, StepContext, StepOutcome};
use crate::error::DialogError;
use crate::events::{
    AnswerCollected, ConversationCancelled, DialogEvent, FlowCompleted, FlowStarted, PromptIssued,
    RecognitionRetried,
};
use crate::persistence::StackStore;
use crate::prompts::{self, RecognitionFailure};
use crate::stack::{ConversationState, DialogStackFrame, FrameStatus, PendingPrompt};
use crate::value_objects::{CollectedRecord, InboundMessage, OutboundReply, PromptSpec};

/// Inputs that cancel the whole conversation, checked before any dispatch
pub const CANCEL_TOKENS: [&str; 2] = ["quit", "exit"];

/// Whether the message text matches a cancellation token
pub fn is_cancellation(text: &str) -> bool {
    let token = text.trim();
    CANCEL_TOKENS.iter().any(|t| token.eq_ignore_ascii_case(t))
}

/// Outcome of processing one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// No flow is active; the caller should begin the root flow
    Empty,
    /// Flows remain suspended awaiting the next message
    Active,
    /// The stack emptied this turn
    Complete,
}

/// Everything one turn produced
#[derive(Debug, Clone)]
pub struct DialogTurnResult {
    pub status: TurnStatus,
    /// The root flow's result when `status` is `Complete`; `None` after a
    /// cancellation
    pub output: Option<Value>,
    /// Prompts and messages to deliver, in order
    pub replies: Vec<OutboundReply>,
    pub events: Vec<DialogEvent>,
}

impl DialogTurnResult {
    fn empty() -> Self {
        Self {
            status: TurnStatus::Empty,
            output: None,
            replies: Vec::new(),
            events: Vec::new(),
        }
    }

    fn active() -> Self {
        Self {
            status: TurnStatus::Active,
            ..Self::empty()
        }
    }
}

/// What the drive loop decided for the top frame
enum Advance {
    /// The frame suspended; the turn is over
    Suspend,
    /// A child frame begins above the current one
    PushChild(DialogStackFrame),
    /// The frame finished with this output
    Finish(Value),
}

/// Owns the persisted dialog stack of every conversation
pub struct DialogStackManager {
    registry: Arc<DialogRegistry>,
    store: Arc<dyn StackStore>,
}

impl DialogStackManager {
    pub fn new(registry: Arc<DialogRegistry>, store: Arc<dyn StackStore>) -> Self {
        Self { registry, store }
    }

    /// The registry this manager dispatches against
    pub fn registry(&self) -> &Arc<DialogRegistry> {
        &self.registry
    }

    /// Begin a registered flow on top of the conversation's stack
    ///
    /// Runs the flow up to its first suspension point and saves the stack.
    pub async fn begin(
        &self,
        conversation_id: &str,
        dialog_id: &str,
        initial_values: Option<CollectedRecord>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.registry.get(dialog_id)?;

        let mut state = self
            .store
            .load(conversation_id)
            .await?
            .unwrap_or_default();
        let mut out = DialogTurnResult::active();

        let frame = DialogStackFrame::new(dialog_id, initial_values);
        info!(conversation_id, dialog_id, depth = state.depth(), "beginning dialog");
        out.events.push(DialogEvent::FlowStarted(FlowStarted {
            conversation_id: conversation_id.to_string(),
            dialog_id: dialog_id.to_string(),
            frame_id: frame.frame_id,
            depth: state.depth(),
            started_at: Utc::now(),
        }));
        state.stack.push(frame);

        self.run_stack(conversation_id, &mut state, None, &mut out)?;
        state.touch();
        self.store.save(conversation_id, &state).await?;
        Ok(out)
    }

    /// Process one inbound message against the conversation's stack
    ///
    /// Returns `Empty` without touching anything when no flow is active:
    /// the caller decides which root flow to begin.
    pub async fn resume(
        &self,
        conversation_id: &str,
        message: &InboundMessage,
    ) -> Result<DialogTurnResult, DialogError> {
        let mut state = match self.store.load(conversation_id).await? {
            Some(state) if !state.is_empty() => state,
            _ => return Ok(DialogTurnResult::empty()),
        };
        state.validate(conversation_id, &self.registry)?;

        let mut out = DialogTurnResult::active();

        // Global interrupt: evaluated before any frame can read the input.
        if is_cancellation(&message.text) {
            let discarded = state.depth();
            state.stack.clear();
            state.touch();
            self.store.save(conversation_id, &state).await?;
            info!(conversation_id, discarded, "conversation cancelled");
            out.status = TurnStatus::Complete;
            out.events
                .push(DialogEvent::ConversationCancelled(ConversationCancelled {
                    conversation_id: conversation_id.to_string(),
                    token: message.text.trim().to_ascii_lowercase(),
                    discarded_frames: discarded,
                    cancelled_at: Utc::now(),
                }));
            return Ok(out);
        }

        let carry = match self.feed_message(conversation_id, &mut state, message, &mut out)? {
            Feed::Recognized(carry) => carry,
            Feed::Retrying => {
                state.touch();
                self.store.save(conversation_id, &state).await?;
                return Ok(out);
            }
        };

        self.run_stack(conversation_id, &mut state, carry, &mut out)?;
        state.touch();
        self.store.save(conversation_id, &state).await?;
        Ok(out)
    }

    /// Discard a conversation's stack, saving the emptied state
    pub async fn reset(&self, conversation_id: &str) -> Result<(), DialogError> {
        self.store
            .save(conversation_id, &ConversationState::empty())
            .await
    }

    /// Hand the message to the top frame: either as a pending prompt's reply
    /// or, for a frame that never prompted, as the raw step result.
    fn feed_message(
        &self,
        conversation_id: &str,
        state: &mut ConversationState,
        message: &InboundMessage,
        out: &mut DialogTurnResult,
    ) -> Result<Feed, DialogError> {
        let frame = state
            .stack
            .last_mut()
            .expect("resume dispatches only on a non-empty stack");

        match frame.status.clone() {
            FrameStatus::AwaitingPromptReply(pending) => {
                match self.recognize_reply(&pending, message)? {
                    Ok(value) => {
                        out.events.push(DialogEvent::AnswerCollected(AnswerCollected {
                            conversation_id: conversation_id.to_string(),
                            dialog_id: frame.dialog_id.clone(),
                            slot: pending.slot.clone(),
                            value: value.clone(),
                        }));
                        frame.step_index += 1;
                        frame.status = FrameStatus::AwaitingStepAdvance;
                        match pending.slot {
                            Some(name) => {
                                frame.values.insert(name, value);
                                Ok(Feed::Recognized(None))
                            }
                            None => Ok(Feed::Recognized(Some(value))),
                        }
                    }
                    Err(failure) => {
                        warn!(
                            conversation_id,
                            dialog_id = %frame.dialog_id,
                            reason = %failure.reason,
                            "reply not recognized, re-issuing prompt"
                        );
                        out.events
                            .push(DialogEvent::RecognitionRetried(RecognitionRetried {
                                conversation_id: conversation_id.to_string(),
                                dialog_id: frame.dialog_id.clone(),
                                reason: failure.reason,
                            }));
                        out.replies.push(pending.reply(true));
                        out.events.push(DialogEvent::PromptIssued(PromptIssued {
                            conversation_id: conversation_id.to_string(),
                            dialog_id: frame.dialog_id.clone(),
                            prompt_text: pending.text.clone(),
                            retry: true,
                        }));
                        Ok(Feed::Retrying)
                    }
                }
            }
            // Reachable only for flows whose current step reads raw text
            // instead of prompting; the message becomes the step's result.
            FrameStatus::AwaitingStepAdvance => Ok(Feed::Recognized(Some(Value::String(
                message.text.trim().to_string(),
            )))),
            FrameStatus::AwaitingChildCompletion | FrameStatus::Complete => Err(
                DialogError::corrupt(conversation_id, "top frame cannot accept a message"),
            ),
        }
    }

    /// Built-in recognition followed by the prompt's named validator
    ///
    /// The outer error is fatal (unregistered validator); the inner one is
    /// the ordinary retry path.
    fn recognize_reply(
        &self,
        pending: &PendingPrompt,
        message: &InboundMessage,
    ) -> Result<Result<Value, RecognitionFailure>, DialogError> {
        let value = match prompts::recognize(pending.kind, &pending.choices, message) {
            Ok(value) => value,
            Err(failure) => return Ok(Err(failure)),
        };
        if let Some(name) = &pending.validator {
            let validator = self.registry.validator(name)?;
            if let Err(reason) = validator(&value) {
                return Ok(Err(RecognitionFailure { reason }));
            }
        }
        Ok(Ok(value))
    }

    /// Run frames until the stack suspends or empties
    ///
    /// `carry` is the value handed to the next step: a recognized answer, a
    /// completed child's output, or a previous step's return value. It is
    /// never persisted; suspension only happens once it has been consumed.
    fn run_stack(
        &self,
        conversation_id: &str,
        state: &mut ConversationState,
        mut carry: Option<Value>,
        out: &mut DialogTurnResult,
    ) -> Result<(), DialogError> {
        loop {
            let depth = state.depth();
            if depth == 0 {
                out.status = TurnStatus::Complete;
                out.output = carry;
                return Ok(());
            }

            let action = {
                let frame = state.stack.last_mut().expect("depth checked above");
                let descriptor = self.registry.get(&frame.dialog_id)?.clone();
                match frame.status.clone() {
                    FrameStatus::AwaitingPromptReply(_) => Advance::Suspend,
                    FrameStatus::AwaitingChildCompletion => {
                        return Err(DialogError::corrupt(
                            conversation_id,
                            "top frame awaits a child that is not on the stack",
                        ));
                    }
                    FrameStatus::Complete => Advance::Finish(Value::Object(frame.values.clone())),
                    FrameStatus::AwaitingStepAdvance => match &descriptor.body {
                        DialogBody::Slots(slots) => {
                            if frame.step_index >= slots.len() {
                                Advance::Finish(Value::Object(frame.values.clone()))
                            } else {
                                let slot = slots[frame.step_index].clone();
                                self.issue_prompt(
                                    conversation_id,
                                    frame,
                                    slot.prompt,
                                    Some(slot.name),
                                    out,
                                )?;
                                Advance::Suspend
                            }
                        }
                        DialogBody::Steps(steps) => {
                            if frame.step_index >= steps.len() {
                                Advance::Finish(Value::Object(frame.values.clone()))
                            } else {
                                let step = steps[frame.step_index].clone();
                                let outcome = {
                                    let mut ctx =
                                        StepContext::new(&mut frame.values, carry.take());
                                    let outcome = (*step)(&mut ctx);
                                    for text in ctx.into_messages() {
                                        out.replies.push(OutboundReply::message(text));
                                    }
                                    outcome
                                };
                                match outcome {
                                    StepOutcome::Prompt(spec) => {
                                        self.issue_prompt(conversation_id, frame, spec, None, out)?;
                                        Advance::Suspend
                                    }
                                    StepOutcome::BeginChild {
                                        dialog_id,
                                        initial_values,
                                    } => {
                                        self.registry.get(&dialog_id)?;
                                        frame.status = FrameStatus::AwaitingChildCompletion;
                                        Advance::PushChild(DialogStackFrame::new(
                                            dialog_id,
                                            initial_values,
                                        ))
                                    }
                                    StepOutcome::End(value) => Advance::Finish(value),
                                }
                            }
                        }
                    },
                }
            };

            match action {
                Advance::Suspend => {
                    out.status = TurnStatus::Active;
                    return Ok(());
                }
                Advance::PushChild(child) => {
                    info!(
                        conversation_id,
                        dialog_id = %child.dialog_id,
                        depth,
                        "beginning child dialog"
                    );
                    out.events.push(DialogEvent::FlowStarted(FlowStarted {
                        conversation_id: conversation_id.to_string(),
                        dialog_id: child.dialog_id.clone(),
                        frame_id: child.frame_id,
                        depth,
                        started_at: Utc::now(),
                    }));
                    state.stack.push(child);
                }
                Advance::Finish(output) => {
                    let finished = state.stack.pop().expect("depth checked above");
                    info!(
                        conversation_id,
                        dialog_id = %finished.dialog_id,
                        "dialog completed"
                    );
                    out.events.push(DialogEvent::FlowCompleted(FlowCompleted {
                        conversation_id: conversation_id.to_string(),
                        dialog_id: finished.dialog_id,
                        frame_id: finished.frame_id,
                        output: output.clone(),
                        completed_at: Utc::now(),
                    }));
                    if let Some(parent) = state.stack.last_mut() {
                        // Only a parent suspended on this child resumes with
                        // its result; anything else keeps its own suspension.
                        if parent.status == FrameStatus::AwaitingChildCompletion {
                            parent.status = FrameStatus::AwaitingStepAdvance;
                            parent.step_index += 1;
                        }
                    }
                    carry = Some(output);
                }
            }
        }
    }

    /// Issue a prompt and suspend the frame on it
    fn issue_prompt(
        &self,
        conversation_id: &str,
        frame: &mut DialogStackFrame,
        spec: PromptSpec,
        slot: Option<String>,
        out: &mut DialogTurnResult,
    ) -> Result<(), DialogError> {
        // Unregistered validators are programmer errors; surface them at
        // issuance rather than when the reply arrives.
        if let Some(name) = &spec.validator {
            self.registry.validator(name)?;
        }
        let pending = PendingPrompt::from_spec(spec, slot);
        out.replies.push(pending.reply(false));
        out.events.push(DialogEvent::PromptIssued(PromptIssued {
            conversation_id: conversation_id.to_string(),
            dialog_id: frame.dialog_id.clone(),
            prompt_text: pending.text.clone(),
            retry: false,
        }));
        frame.status = FrameStatus::AwaitingPromptReply(pending);
        Ok(())
    }
}

/// Result of feeding the inbound message to the top frame
enum Feed {
    /// The message was consumed; the carried value goes to the next step
    Recognized(Option<Value>),
    /// Recognition failed; the prompt was re-issued and the turn is over
    Retrying,
}
