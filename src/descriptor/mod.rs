//! Flow definitions and the dialog registry
//!
//! A [`DialogDescriptor`] is the immutable definition of a flow: an id plus
//! either an ordered list of step functions or an ordered list of slots.
//! Descriptors are built once at startup, registered in a [`DialogRegistry`],
//! and only ever referenced by id from runtime frames, which keeps the
//! persisted stack serializable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::DialogError;
use crate::prompts::ValidatorFn;
use crate::value_objects::{CollectedRecord, PromptSpec, SlotSpec};

/// What a step function can handle the turn with
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Issue a prompt and suspend until the reply arrives
    Prompt(PromptSpec),
    /// Begin a registered child flow and suspend until it completes
    BeginChild {
        dialog_id: String,
        initial_values: Option<CollectedRecord>,
    },
    /// End this flow with a result value
    End(Value),
}

impl StepOutcome {
    /// Begin the named child flow with no initial values
    pub fn begin_child(dialog_id: impl Into<String>) -> Self {
        Self::BeginChild {
            dialog_id: dialog_id.into(),
            initial_values: None,
        }
    }
}

/// The view of a frame a step function runs against
///
/// `values` is the frame's shared scratch space across steps; `result` is
/// either the previous step's return value or the just-recognized prompt
/// answer. Messages queued with [`StepContext::say`] are delivered before the
/// outcome's own reply.
pub struct StepContext<'a> {
    /// Collected values of the running frame
    pub values: &'a mut CollectedRecord,
    /// Most recent result handed to this step
    pub result: Option<Value>,
    messages: Vec<String>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(values: &'a mut CollectedRecord, result: Option<Value>) -> Self {
        Self {
            values,
            result,
            messages: Vec::new(),
        }
    }

    /// Queue an incidental outbound message for this turn
    pub fn say(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    /// Store the step's `result` under the given field name
    ///
    /// Convenience for the common "capture the previous answer, then move on"
    /// opening of a step.
    pub fn capture(&mut self, name: impl Into<String>) {
        if let Some(result) = self.result.take() {
            self.values.insert(name.into(), result);
        }
    }

    pub(crate) fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// One ordered step of a flow
pub type StepFn = Arc<dyn Fn(&mut StepContext) -> StepOutcome + Send + Sync>;

/// The body of a flow: free-form steps or a strict slot sequence
pub enum DialogBody {
    /// Ordered step functions with branching and child delegation
    Steps(Vec<StepFn>),
    /// Ordered independent prompts, one collected field each
    Slots(Vec<SlotSpec>),
}

impl fmt::Debug for DialogBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steps(steps) => f.debug_tuple("Steps").field(&steps.len()).finish(),
            Self::Slots(slots) => f.debug_tuple("Slots").field(slots).finish(),
        }
    }
}

/// Immutable definition of a flow
#[derive(Debug)]
pub struct DialogDescriptor {
    /// Unique flow identifier
    pub id: String,
    /// Ordered steps or slots
    pub body: DialogBody,
}

impl DialogDescriptor {
    /// Define a step flow
    pub fn steps(id: impl Into<String>, steps: Vec<StepFn>) -> Self {
        Self {
            id: id.into(),
            body: DialogBody::Steps(steps),
        }
    }

    /// Define a slot-filling flow
    pub fn slots(id: impl Into<String>, slots: Vec<SlotSpec>) -> Self {
        Self {
            id: id.into(),
            body: DialogBody::Slots(slots),
        }
    }

    /// Number of steps or slots in the body
    pub fn step_count(&self) -> usize {
        match &self.body {
            DialogBody::Steps(steps) => steps.len(),
            DialogBody::Slots(slots) => slots.len(),
        }
    }
}

/// Registry of flow definitions and named validators
///
/// Built once at startup and shared read-only afterwards. Lookups of
/// unregistered ids fail fast; they are programmer errors, never retried.
#[derive(Default)]
pub struct DialogRegistry {
    dialogs: HashMap<String, Arc<DialogDescriptor>>,
    validators: HashMap<String, ValidatorFn>,
}

impl DialogRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow definition
    pub fn register(&mut self, descriptor: DialogDescriptor) -> Result<(), DialogError> {
        if self.dialogs.contains_key(&descriptor.id) {
            return Err(DialogError::DuplicateDialog(descriptor.id));
        }
        self.dialogs
            .insert(descriptor.id.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Register a named validator for prompts to reference
    pub fn register_validator(
        &mut self,
        name: impl Into<String>,
        validator: ValidatorFn,
    ) -> Result<(), DialogError> {
        let name = name.into();
        if self.validators.contains_key(&name) {
            return Err(DialogError::DuplicateValidator(name));
        }
        self.validators.insert(name, validator);
        Ok(())
    }

    /// Look up a flow definition
    pub fn get(&self, dialog_id: &str) -> Result<&Arc<DialogDescriptor>, DialogError> {
        self.dialogs
            .get(dialog_id)
            .ok_or_else(|| DialogError::UnknownDialog(dialog_id.to_string()))
    }

    /// Look up a named validator
    pub fn validator(&self, name: &str) -> Result<&ValidatorFn, DialogError> {
        self.validators
            .get(name)
            .ok_or_else(|| DialogError::UnknownValidator(name.to_string()))
    }

    /// Whether a flow id is registered
    pub fn contains(&self, dialog_id: &str) -> bool {
        self.dialogs.contains_key(dialog_id)
    }
}

impl fmt::Debug for DialogRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogRegistry")
            .field("dialogs", &self.dialogs.keys().collect::<Vec<_>>())
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::PromptSpec;

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = DialogRegistry::new();
        registry
            .register(DialogDescriptor::slots(
                "laptop",
                vec![SlotSpec::new("company", PromptSpec::text("Company?"))],
            ))
            .unwrap();

        let duplicate = registry.register(DialogDescriptor::slots("laptop", vec![]));
        assert!(matches!(duplicate, Err(DialogError::DuplicateDialog(_))));
    }

    #[test]
    fn test_unknown_lookups_fail_fast() {
        let registry = DialogRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(DialogError::UnknownDialog(_))
        ));
        assert!(matches!(
            registry.validator("nope"),
            Err(DialogError::UnknownValidator(_))
        ));
    }
}
