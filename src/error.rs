//! Error types for the dialog engine
//!
//! Recognition and validation failures are not represented here: they are
//! recovered locally by re-issuing the pending prompt and never propagate
//! (see [`crate::prompts::RecognitionFailure`]). The variants below are the
//! operator-visible failures.

use thiserror::Error;

/// Errors surfaced by the dialog engine
#[derive(Debug, Error)]
pub enum DialogError {
    /// A flow or step referenced a dialog id that was never registered
    #[error("dialog '{0}' is not registered")]
    UnknownDialog(String),

    /// A dialog id was registered twice
    #[error("dialog '{0}' is already registered")]
    DuplicateDialog(String),

    /// A prompt referenced a validator that was never registered
    #[error("validator '{0}' is not registered")]
    UnknownValidator(String),

    /// A validator name was registered twice
    #[error("validator '{0}' is already registered")]
    DuplicateValidator(String),

    /// A completion record named a summary kind with no renderer
    #[error("unknown summary kind '{0}'")]
    UnknownSummaryKind(String),

    /// A persisted stack no longer matches the registered dialogs
    #[error("corrupt persisted stack for conversation '{conversation_id}': {reason}")]
    CorruptStack {
        conversation_id: String,
        reason: String,
    },

    /// The stack store failed to load or save conversation state
    #[error("stack store failure: {0}")]
    Store(String),

    /// The outbound collaborator failed to deliver a reply
    #[error("outbound delivery failure: {0}")]
    Outbound(String),
}

impl DialogError {
    /// Build a [`DialogError::CorruptStack`] for a conversation
    pub fn corrupt(conversation_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptStack {
            conversation_id: conversation_id.into(),
            reason: reason.into(),
        }
    }
}
