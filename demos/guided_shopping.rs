//! Guided Shopping Example
//!
//! This example demonstrates how to:
//! - Register the sample flows and start a conversation
//! - Answer prompts turn by turn, including a nested child flow
//! - Receive the rendered summary card on completion
//! - Cancel a flow mid-way with "quit"

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dialog_flow::{
    Choice, ConversationRouter, DialogError, DialogStackManager, InMemoryStackStore,
    InboundMessage, OutboundSink, flows,
};
use serde_json::Value;

/// Sink that prints replies to the console
struct ConsoleSink;

#[async_trait]
impl OutboundSink for ConsoleSink {
    async fn send_prompt(
        &self,
        _conversation_id: &str,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), DialogError> {
        if choices.is_empty() {
            println!("bot> {text}");
        } else {
            let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();
            println!("bot> {text} [{}]", labels.join(" | "));
        }
        Ok(())
    }

    async fn send_message(&self, _conversation_id: &str, text: &str) -> Result<(), DialogError> {
        println!("bot> {text}");
        Ok(())
    }

    async fn send_card(&self, _conversation_id: &str, document: Value) -> Result<(), DialogError> {
        println!("bot> Here is your information:");
        println!("{}", serde_json::to_string_pretty(&document).unwrap_or_default());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let registry = Arc::new(flows::sample_registry()?);
    let store = Arc::new(InMemoryStackStore::new());
    let manager = DialogStackManager::new(registry, store);
    let router = ConversationRouter::new(manager, Arc::new(ConsoleSink), flows::ROOT_DIALOG);

    println!("=== Buying a laptop ===\n");
    let script = ["hello", "Buy a laptop", "Acme", "silver", "gaming", "1500"];
    for line in script {
        println!("user> {line}");
        router
            .on_message(&InboundMessage::text("alice", line))
            .await?;
    }

    println!("\n=== Cancelling a trip mid-way ===\n");
    for line in ["hi", "Plan a trip", "Japan", "quit", "hello again"] {
        println!("user> {line}");
        router
            .on_message(&InboundMessage::text("bob", line))
            .await?;
    }

    Ok(())
}
