//! Value objects for the dialog engine

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message arriving from the conversation channel
///
/// `payload` carries the structured value of a quick-reply/action selection
/// when the channel supports them; the engine treats it as an alternative to
/// `text` for choice recognition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundMessage {
    /// Raw message text
    pub text: String,
    /// Channel identifier of the sender; used as the conversation key
    pub sender_id: String,
    /// Structured action payload, if the message came from a quick reply
    pub payload: Option<Value>,
}

impl InboundMessage {
    /// Create a plain text message
    pub fn text(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender_id: sender_id.into(),
            payload: None,
        }
    }

    /// Attach a quick-reply payload to the message
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A reply produced by the engine during a turn, delivered by the outbound
/// collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum OutboundReply {
    /// A question awaiting the next user message
    Prompt { text: String, choices: Vec<Choice> },
    /// An incidental message that does not suspend the flow
    Message { text: String },
}

impl OutboundReply {
    /// Create an incidental message reply
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }
}

/// The kind of answer a prompt collects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Free text, always recognized (trimmed)
    Text,
    /// A numeric literal
    Number,
    /// One of a configured set of choices
    Choice,
    /// A yes/no answer
    Confirm,
}

/// A selectable option for a choice prompt
///
/// `value` is the canonical recognized value; quick-reply channels post it
/// back as the action payload. It defaults to the label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Text shown to the user
    pub label: String,
    /// Canonical value recognized from either the label or a payload
    pub value: String,
}

impl Choice {
    /// Create a choice whose value equals its label
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            value: label.clone(),
            label,
        }
    }

    /// Override the posted-back value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

/// Everything needed to issue one prompt and recognize its reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptSpec {
    /// Kind of answer expected
    pub kind: PromptKind,
    /// Question text
    pub text: String,
    /// Distinct text used when re-issuing after a failed reply
    pub retry_text: Option<String>,
    /// Options for a choice prompt; empty for other kinds
    pub choices: Vec<Choice>,
    /// Name of a registered validator to run after recognition
    pub validator: Option<String>,
}

impl PromptSpec {
    fn new(kind: PromptKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            retry_text: None,
            choices: Vec::new(),
            validator: None,
        }
    }

    /// A free-text prompt
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(PromptKind::Text, text)
    }

    /// A numeric prompt
    pub fn number(text: impl Into<String>) -> Self {
        Self::new(PromptKind::Number, text)
    }

    /// A choice prompt over the given options
    pub fn choice(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        let mut spec = Self::new(PromptKind::Choice, text);
        spec.choices = choices;
        spec
    }

    /// A yes/no prompt
    pub fn confirm(text: impl Into<String>) -> Self {
        Self::new(PromptKind::Confirm, text)
    }

    /// Set the retry text used after a failed reply
    pub fn with_retry(mut self, retry_text: impl Into<String>) -> Self {
        self.retry_text = Some(retry_text.into());
        self
    }

    /// Attach a registered validator by name
    pub fn with_validator(mut self, name: impl Into<String>) -> Self {
        self.validator = Some(name.into());
        self
    }
}

/// One named field collected by a slot-filling dialog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotSpec {
    /// Field name, unique within its dialog
    pub name: String,
    /// Prompt used to collect the field
    pub prompt: PromptSpec,
}

impl SlotSpec {
    /// Create a slot collected by the given prompt
    pub fn new(name: impl Into<String>, prompt: PromptSpec) -> Self {
        Self {
            name: name.into(),
            prompt,
        }
    }
}

/// A completed flow's flat field-to-answer mapping
pub type CollectedRecord = serde_json::Map<String, Value>;
