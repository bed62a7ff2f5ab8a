//! Sample flows: guided laptop purchase, trip planning, user profile
//!
//! These are the flows the engine was built around, expressed as registered
//! descriptors. The root flow offers the laptop/trip branch as a choice
//! prompt, delegates to the chosen child, and wraps the child's record with
//! the summary kind the router renders it under.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::descriptor::{DialogDescriptor, DialogRegistry, StepContext, StepFn, StepOutcome};
use crate::error::DialogError;
use crate::prompts;
use crate::value_objects::{Choice, PromptSpec, SlotSpec};

/// Root flow offering the laptop/trip branch
pub const ROOT_DIALOG: &str = "root";
/// Slot-filling laptop purchase flow
pub const LAPTOP_DIALOG: &str = "laptop";
/// Trip planning flow with numeric prompts
pub const TRIP_DIALOG: &str = "trip";
/// Stand-alone profile flow with choice and date prompts
pub const USER_PROFILE_DIALOG: &str = "user-profile";

/// Name of the registered yyyy/mm/dd date validator
pub const DATE_VALIDATOR: &str = "date-yyyy-mm-dd";

const BUY_A_LAPTOP: &str = "Buy a laptop";
const PLAN_A_TRIP: &str = "Plan a trip";

fn step<F>(f: F) -> StepFn
where
    F: Fn(&mut StepContext) -> StepOutcome + Send + Sync + 'static,
{
    Arc::new(f)
}

fn action_prompt() -> PromptSpec {
    PromptSpec::choice(
        "What would you like to do?",
        vec![Choice::new(BUY_A_LAPTOP), Choice::new(PLAN_A_TRIP)],
    )
}

/// The laptop flow: four independent text slots, filled in order
pub fn laptop_dialog() -> DialogDescriptor {
    DialogDescriptor::slots(
        LAPTOP_DIALOG,
        vec![
            SlotSpec::new("company", PromptSpec::text("Enter the company name of the laptop.")),
            SlotSpec::new("colour", PromptSpec::text("Enter the colour of the laptop.")),
            SlotSpec::new("purpose", PromptSpec::text("Enter the purpose of buying a laptop.")),
            SlotSpec::new("budget", PromptSpec::text("Enter the budget for your laptop.")),
        ],
    )
}

/// The trip flow: two text questions, then two validated numeric ones
pub fn trip_dialog() -> DialogDescriptor {
    DialogDescriptor::steps(
        TRIP_DIALOG,
        vec![
            step(|_ctx| {
                StepOutcome::Prompt(PromptSpec::text("Please enter the country you want to visit."))
            }),
            step(|ctx| {
                ctx.capture("country");
                StepOutcome::Prompt(PromptSpec::text("Please enter the state you want to travel."))
            }),
            step(|ctx| {
                ctx.capture("state");
                StepOutcome::Prompt(
                    PromptSpec::number("Please enter the duration of the vacation.")
                        .with_retry("Please enter a number."),
                )
            }),
            step(|ctx| {
                ctx.capture("duration");
                StepOutcome::Prompt(
                    PromptSpec::number("Please enter your budget.")
                        .with_retry("Please enter a number."),
                )
            }),
            step(|ctx| {
                ctx.capture("budget");
                StepOutcome::End(Value::Object(ctx.values.clone()))
            }),
        ],
    )
}

/// The user-profile flow: name, gender, validated date of birth, marital
/// status, ending with a renderable profile record
pub fn user_profile_dialog() -> DialogDescriptor {
    DialogDescriptor::steps(
        USER_PROFILE_DIALOG,
        vec![
            step(|_ctx| StepOutcome::Prompt(PromptSpec::text("Please enter your name."))),
            step(|ctx| {
                let name = ctx
                    .result
                    .as_ref()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                ctx.say(format!("Thanks {name}."));
                ctx.capture("name");
                StepOutcome::Prompt(PromptSpec::choice(
                    "Please choose your gender.",
                    vec![Choice::new("Male"), Choice::new("Female"), Choice::new("Others")],
                ))
            }),
            step(|ctx| {
                ctx.capture("gender");
                StepOutcome::Prompt(
                    PromptSpec::text("Please enter your date of birth.")
                        .with_retry("Enter a valid date in YYYY/MM/DD format only.")
                        .with_validator(DATE_VALIDATOR),
                )
            }),
            step(|ctx| {
                ctx.capture("dob");
                StepOutcome::Prompt(PromptSpec::choice(
                    "Please choose your marital status.",
                    vec![Choice::new("Married"), Choice::new("Unmarried")],
                ))
            }),
            step(|ctx| {
                ctx.capture("marital_status");
                StepOutcome::End(json!({
                    "kind": "profile-summary",
                    "values": Value::Object(ctx.values.clone()),
                }))
            }),
        ],
    )
}

/// The root flow: choose a branch, run it as a child, wrap its record with
/// the summary kind for rendering
pub fn root_dialog() -> DialogDescriptor {
    DialogDescriptor::steps(
        ROOT_DIALOG,
        vec![
            step(|_ctx| StepOutcome::Prompt(action_prompt())),
            step(|ctx| {
                let choice = ctx
                    .result
                    .take()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                ctx.values.insert("choice".to_string(), Value::String(choice.clone()));
                if choice.eq_ignore_ascii_case(BUY_A_LAPTOP) {
                    StepOutcome::begin_child(LAPTOP_DIALOG)
                } else if choice.eq_ignore_ascii_case(PLAN_A_TRIP) {
                    StepOutcome::begin_child(TRIP_DIALOG)
                } else {
                    StepOutcome::End(Value::Object(ctx.values.clone()))
                }
            }),
            step(|ctx| {
                let record = ctx
                    .result
                    .take()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                let kind = match ctx.values.get("choice").and_then(Value::as_str) {
                    Some(choice) if choice.eq_ignore_ascii_case(BUY_A_LAPTOP) => "laptop-summary",
                    _ => "trip-summary",
                };
                StepOutcome::End(json!({ "kind": kind, "values": record }))
            }),
        ],
    )
}

/// Registry with all sample flows and their validators
pub fn sample_registry() -> Result<DialogRegistry, DialogError> {
    let mut registry = DialogRegistry::new();
    registry.register_validator(DATE_VALIDATOR, Arc::new(prompts::yyyy_mm_dd))?;
    registry.register(laptop_dialog())?;
    registry.register(trip_dialog())?;
    registry.register(user_profile_dialog())?;
    registry.register(root_dialog())?;
    Ok(registry)
}
