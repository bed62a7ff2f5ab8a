//! Integration tests for the conversation router
//!
//! These verify the complete flow of a conversation including:
//! - Beginning the root flow on the first message
//! - Choice selection by text and by quick-reply payload
//! - Summary card dispatch on completion
//! - Cancellation and corrupt-stack recovery

use std::sync::Arc;

use async_trait::async_trait;
use dialog_flow::{
    Choice, ConversationRouter, ConversationState, DialogError, DialogStackFrame,
    DialogStackManager, InMemoryStackStore, InboundMessage, OutboundSink, StackStore, TurnStatus,
    flows,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

/// Sink that records everything the router delivers
#[derive(Default)]
struct RecordingSink {
    prompts: Mutex<Vec<(String, Vec<Choice>)>>,
    messages: Mutex<Vec<String>>,
    cards: Mutex<Vec<Value>>,
}

#[async_trait]
impl OutboundSink for RecordingSink {
    async fn send_prompt(
        &self,
        _conversation_id: &str,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), DialogError> {
        self.prompts
            .lock()
            .await
            .push((text.to_string(), choices.to_vec()));
        Ok(())
    }

    async fn send_message(&self, _conversation_id: &str, text: &str) -> Result<(), DialogError> {
        self.messages.lock().await.push(text.to_string());
        Ok(())
    }

    async fn send_card(&self, _conversation_id: &str, document: Value) -> Result<(), DialogError> {
        self.cards.lock().await.push(document);
        Ok(())
    }
}

fn router() -> (ConversationRouter, Arc<RecordingSink>, Arc<InMemoryStackStore>) {
    let registry = Arc::new(flows::sample_registry().unwrap());
    let store = Arc::new(InMemoryStackStore::new());
    let sink = Arc::new(RecordingSink::default());
    let manager = DialogStackManager::new(registry, store.clone());
    let router = ConversationRouter::new(manager, sink.clone(), flows::ROOT_DIALOG);
    (router, sink, store)
}

fn msg(text: &str) -> InboundMessage {
    InboundMessage::text("user-1", text)
}

#[tokio::test]
async fn test_first_message_begins_root_flow() {
    let (router, sink, _store) = router();

    let result = router.on_message(&msg("hello")).await.unwrap();
    assert_eq!(result.status, TurnStatus::Active);

    let prompts = sink.prompts.lock().await;
    assert_eq!(prompts.len(), 1);
    let (text, choices) = &prompts[0];
    assert_eq!(text, "What would you like to do?");
    let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Buy a laptop", "Plan a trip"]);
}

#[tokio::test]
async fn test_choice_matches_text_case_insensitively() {
    let (router, sink, _store) = router();

    router.on_message(&msg("hi")).await.unwrap();
    router.on_message(&msg("BUY A LAPTOP")).await.unwrap();

    let prompts = sink.prompts.lock().await;
    assert_eq!(prompts.last().unwrap().0, "Enter the company name of the laptop.");
}

#[tokio::test]
async fn test_choice_matches_quick_reply_payload() {
    let (router, sink, _store) = router();

    router.on_message(&msg("hi")).await.unwrap();
    let tap = msg("tapped a button").with_payload(json!("Plan a trip"));
    router.on_message(&tap).await.unwrap();

    let prompts = sink.prompts.lock().await;
    assert_eq!(
        prompts.last().unwrap().0,
        "Please enter the country you want to visit."
    );
}

#[tokio::test]
async fn test_completed_laptop_flow_renders_summary_card() {
    let (router, sink, _store) = router();

    router.on_message(&msg("hi")).await.unwrap();
    router.on_message(&msg("Buy a laptop")).await.unwrap();
    for answer in ["Acme", "silver", "gaming", "1500"] {
        router.on_message(&msg(answer)).await.unwrap();
    }

    let cards = sink.cards.lock().await;
    assert_eq!(cards.len(), 1);
    let card = &cards[0];
    assert_eq!(card["title"], json!("Laptop request"));

    let rows: Vec<&str> = card["body"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["columns"][1]["items"][0]["text"].as_str().unwrap())
        .collect();
    assert_eq!(rows, vec!["Acme", "silver", "gaming", "1500"]);
}

#[tokio::test]
async fn test_cancellation_produces_no_card_and_restarts_cleanly() {
    let (router, sink, store) = router();

    router.on_message(&msg("hi")).await.unwrap();
    router.on_message(&msg("Plan a trip")).await.unwrap();
    router.on_message(&msg("Japan")).await.unwrap();

    let result = router.on_message(&msg("Exit")).await.unwrap();
    assert_eq!(result.status, TurnStatus::Complete);
    assert!(sink.cards.lock().await.is_empty());
    assert!(store.load("user-1").await.unwrap().unwrap().is_empty());

    // The next message starts the root flow over.
    router.on_message(&msg("hello again")).await.unwrap();
    let prompts = sink.prompts.lock().await;
    assert_eq!(prompts.last().unwrap().0, "What would you like to do?");
}

#[tokio::test]
async fn test_corrupt_stack_restarts_root_flow() {
    let (router, sink, store) = router();

    // A stack referencing a flow that is no longer registered.
    let mut state = ConversationState::empty();
    state.stack.push(DialogStackFrame::new("decommissioned-flow", None));
    store.save("user-1", &state).await.unwrap();

    let result = router.on_message(&msg("hello")).await.unwrap();
    assert_eq!(result.status, TurnStatus::Active);

    // The corrupt stack was discarded and the root flow begun instead.
    let prompts = sink.prompts.lock().await;
    assert_eq!(prompts.last().unwrap().0, "What would you like to do?");
    let saved = store.load("user-1").await.unwrap().unwrap();
    assert_eq!(saved.depth(), 1);
    assert_eq!(saved.stack[0].dialog_id, flows::ROOT_DIALOG);
}

#[tokio::test]
async fn test_incidental_step_messages_are_delivered() {
    // A router whose root flow is the profile dialog, which thanks the user
    // between its first two prompts.
    let registry = Arc::new(flows::sample_registry().unwrap());
    let store = Arc::new(InMemoryStackStore::new());
    let sink = Arc::new(RecordingSink::default());
    let manager = DialogStackManager::new(registry, store);
    let router = ConversationRouter::new(manager, sink.clone(), flows::USER_PROFILE_DIALOG);

    router.on_message(&msg("hello")).await.unwrap();
    router.on_message(&msg("Alice")).await.unwrap();

    assert_eq!(*sink.messages.lock().await, vec!["Thanks Alice.".to_string()]);
}
