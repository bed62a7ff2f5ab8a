//! Prompt recognition
//!
//! Turns a raw inbound message into a typed answer value for a pending
//! prompt. Recognition failures are recovered locally by the engine
//! (re-issuing the prompt); they never propagate as errors.

use std::sync::Arc;

use serde_json::Value;

use crate::value_objects::{Choice, InboundMessage, PromptKind};

/// Synonyms accepted as an affirmative confirm answer
const YES_SYNONYMS: [&str; 8] = ["yes", "y", "yeah", "yep", "sure", "ok", "okay", "true"];

/// Synonyms accepted as a negative confirm answer
const NO_SYNONYMS: [&str; 5] = ["no", "n", "nope", "nah", "false"];

/// Why a reply was not recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionFailure {
    /// Short machine-readable reason, e.g. `not-a-number`
    pub reason: String,
}

impl RecognitionFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A custom check run after built-in recognition; the error string is the
/// operator-visible rejection reason
pub type ValidatorFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Recognize a reply against a prompt kind
///
/// Choice prompts match either the message text or the quick-reply payload,
/// case-insensitively, against each choice's label and value; the recognized
/// value is the choice's canonical `value`.
pub fn recognize(
    kind: PromptKind,
    choices: &[Choice],
    message: &InboundMessage,
) -> Result<Value, RecognitionFailure> {
    match kind {
        PromptKind::Text => Ok(Value::String(message.text.trim().to_string())),
        PromptKind::Number => recognize_number(&message.text),
        PromptKind::Choice => recognize_choice(choices, message),
        PromptKind::Confirm => recognize_confirm(&message.text),
    }
}

fn recognize_number(text: &str) -> Result<Value, RecognitionFailure> {
    let parsed: f64 = text
        .trim()
        .parse()
        .map_err(|_| RecognitionFailure::new("not-a-number"))?;
    if !parsed.is_finite() {
        return Err(RecognitionFailure::new("not-a-number"));
    }
    // Whole answers are stored as integers, fractional ones as floats
    let number = if parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
        serde_json::Number::from(parsed as i64)
    } else {
        serde_json::Number::from_f64(parsed).ok_or_else(|| RecognitionFailure::new("not-a-number"))?
    };
    Ok(Value::Number(number))
}

fn recognize_choice(
    choices: &[Choice],
    message: &InboundMessage,
) -> Result<Value, RecognitionFailure> {
    let mut candidates = Vec::new();
    if let Some(Value::String(payload)) = &message.payload {
        candidates.push(payload.as_str());
    }
    candidates.push(message.text.as_str());

    for candidate in candidates {
        let candidate = candidate.trim();
        for choice in choices {
            if candidate.eq_ignore_ascii_case(&choice.label)
                || candidate.eq_ignore_ascii_case(&choice.value)
            {
                return Ok(Value::String(choice.value.clone()));
            }
        }
    }
    Err(RecognitionFailure::new("not-a-valid-choice"))
}

fn recognize_confirm(text: &str) -> Result<Value, RecognitionFailure> {
    let normalized = text.trim().to_ascii_lowercase();
    if YES_SYNONYMS.contains(&normalized.as_str()) {
        Ok(Value::Bool(true))
    } else if NO_SYNONYMS.contains(&normalized.as_str()) {
        Ok(Value::Bool(false))
    } else {
        Err(RecognitionFailure::new("not-a-confirmation"))
    }
}

/// Validator for `yyyy/mm/dd` dates, including calendar checks
///
/// Matches the date-of-birth rule of the user-profile flow: four-digit year,
/// slash-separated, and a day that actually exists in the given month.
pub fn yyyy_mm_dd(value: &Value) -> Result<(), String> {
    let text = value
        .as_str()
        .ok_or_else(|| "expected a date string".to_string())?;
    let parts: Vec<&str> = text.trim().split('/').collect();
    if parts.len() != 3 || parts[0].len() != 4 {
        return Err(format!("'{text}' is not a yyyy/mm/dd date"));
    }
    let numbers: Option<Vec<u32>> = parts.iter().map(|p| p.parse().ok()).collect();
    let valid = match numbers.as_deref() {
        Some([year, month, day]) => {
            chrono::NaiveDate::from_ymd_opt(*year as i32, *month, *day).is_some()
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("'{text}' is not a yyyy/mm/dd date"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(text: &str) -> InboundMessage {
        InboundMessage::text("user-1", text)
    }

    #[test]
    fn test_text_recognition_trims() {
        let value = recognize(PromptKind::Text, &[], &msg("  Acme  ")).unwrap();
        assert_eq!(value, json!("Acme"));
    }

    #[test]
    fn test_number_recognition() {
        assert_eq!(recognize(PromptKind::Number, &[], &msg("1500")).unwrap(), json!(1500));
        assert_eq!(recognize(PromptKind::Number, &[], &msg(" 2.5 ")).unwrap(), json!(2.5));

        let failure = recognize(PromptKind::Number, &[], &msg("a lot")).unwrap_err();
        assert_eq!(failure.reason, "not-a-number");
    }

    #[test]
    fn test_choice_recognition_is_case_insensitive() {
        let choices = vec![Choice::new("Buy a laptop"), Choice::new("Plan a trip")];

        let value = recognize(PromptKind::Choice, &choices, &msg("BUY A LAPTOP")).unwrap();
        assert_eq!(value, json!("Buy a laptop"));

        assert!(recognize(PromptKind::Choice, &choices, &msg("buy a boat")).is_err());
    }

    #[test]
    fn test_choice_recognition_accepts_payload() {
        let choices = vec![Choice::new("Buy a laptop"), Choice::new("Plan a trip")];
        let message = msg("tapped a button").with_payload(json!("Plan a trip"));

        let value = recognize(PromptKind::Choice, &choices, &message).unwrap();
        assert_eq!(value, json!("Plan a trip"));
    }

    #[test]
    fn test_confirm_recognition() {
        assert_eq!(recognize(PromptKind::Confirm, &[], &msg("Yes")).unwrap(), json!(true));
        assert_eq!(recognize(PromptKind::Confirm, &[], &msg("nope")).unwrap(), json!(false));
        assert!(recognize(PromptKind::Confirm, &[], &msg("perhaps")).is_err());
    }

    #[test]
    fn test_date_validator() {
        assert!(yyyy_mm_dd(&json!("1990/05/17")).is_ok());
        assert!(yyyy_mm_dd(&json!("1990/02/30")).is_err());
        assert!(yyyy_mm_dd(&json!("17/05/1990")).is_err());
        assert!(yyyy_mm_dd(&json!("soon")).is_err());
    }
}
