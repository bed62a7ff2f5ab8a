//! Conversation router
//!
//! Top-level entry point for inbound messages: resumes the conversation's
//! stack, begins the root flow when nothing is active, and dispatches
//! completion records to the outbound collaborator. The router never inspects
//! slot contents; it only routes a completed record to the renderer selected
//! by the record's summary kind.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::engine::{DialogStackManager, DialogTurnResult, TurnStatus};
use crate::error::DialogError;
use crate::render::{SummaryKind, render};
use crate::value_objects::{Choice, InboundMessage, OutboundReply};

/// Delivery side of the conversation channel
#[async_trait]
pub trait OutboundSink: Send + Sync {
    /// Send a question, optionally with quick-reply choices
    async fn send_prompt(
        &self,
        conversation_id: &str,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), DialogError>;

    /// Send an incidental message
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), DialogError>;

    /// Send a rendered summary document
    async fn send_card(&self, conversation_id: &str, document: Value) -> Result<(), DialogError>;
}

/// Routes each inbound message through the dialog stack
pub struct ConversationRouter {
    manager: DialogStackManager,
    sink: Arc<dyn OutboundSink>,
    root_dialog: String,
}

impl ConversationRouter {
    pub fn new(
        manager: DialogStackManager,
        sink: Arc<dyn OutboundSink>,
        root_dialog: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            sink,
            root_dialog: root_dialog.into(),
        }
    }

    /// Process one inbound message to its next suspension point
    ///
    /// The returned result is the same one the manager produced, after its
    /// replies have been delivered, so hosts can inspect status and events.
    pub async fn on_message(
        &self,
        message: &InboundMessage,
    ) -> Result<DialogTurnResult, DialogError> {
        let conversation_id = message.sender_id.as_str();

        let mut result = match self.manager.resume(conversation_id, message).await {
            Ok(result) => result,
            Err(err @ DialogError::CorruptStack { .. }) => {
                // Never guess a valid state: discard and restart the root.
                error!(conversation_id, %err, "discarding corrupt dialog stack");
                self.manager.reset(conversation_id).await?;
                self.manager
                    .begin(conversation_id, &self.root_dialog, None)
                    .await?
            }
            Err(err) => return Err(err),
        };

        if result.status == TurnStatus::Empty {
            result = self
                .manager
                .begin(conversation_id, &self.root_dialog, None)
                .await?;
        }

        for reply in &result.replies {
            match reply {
                OutboundReply::Prompt { text, choices } => {
                    self.sink.send_prompt(conversation_id, text, choices).await?;
                }
                OutboundReply::Message { text } => {
                    self.sink.send_message(conversation_id, text).await?;
                }
            }
        }

        if result.status == TurnStatus::Complete {
            if let Some(output) = &result.output {
                self.dispatch_result(conversation_id, output).await?;
            }
        }

        Ok(result)
    }

    /// Render a completion record and hand it to the sink
    ///
    /// Completion records carry `{"kind": ..., "values": {...}}`; outputs
    /// without a kind (e.g. a bare child record surfaced by a custom root)
    /// are not rendered.
    async fn dispatch_result(
        &self,
        conversation_id: &str,
        output: &Value,
    ) -> Result<(), DialogError> {
        let (kind, values) = match (output.get("kind"), output.get("values")) {
            (Some(Value::String(kind)), Some(Value::Object(values))) => (kind, values),
            _ => {
                debug!(conversation_id, "completion output carries no summary kind");
                return Ok(());
            }
        };
        let kind: SummaryKind = kind.parse()?;
        let document = render(kind, values);
        self.sink.send_card(conversation_id, document).await
    }
}
