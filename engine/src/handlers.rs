//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: Interactive conversation with the assistant
//! - ask: One question, one reply
//! - suggestions: List the canned questions
//! - key set / delete / status: Manage the backend API key

use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::assistant::orchestrator::KEYCHAIN_SERVICE;
use crate::assistant::{AssistantOrchestrator, SubmitError, SUGGESTED_QUESTIONS};
use crate::config::Config;
use crate::secrets::credential::GEMINI_KEY_NAME;
use crate::secrets::{validate_credential, CredentialSource, SecretManager};
use sdk::errors::{EngineError, ErrorExt};
use sdk::Message;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// What a line typed into the chat prompt means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Send this text to the assistant
    Utterance(String),
    Clear,
    Reset,
    Suggest,
    Quit,
    /// Slash command nobody handles
    Unknown(String),
}

impl ChatInput {
    /// Parse one line of chat input; a bare number picks a suggested question.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if let Ok(index) = line.parse::<usize>() {
            if let Some(question) = index
                .checked_sub(1)
                .and_then(|i| SUGGESTED_QUESTIONS.get(i))
            {
                return Self::Utterance((*question).to_string());
            }
        }

        match line {
            "/clear" => Self::Clear,
            "/reset" => Self::Reset,
            "/suggest" | "/suggestions" => Self::Suggest,
            "/quit" | "/exit" => Self::Quit,
            cmd if cmd.starts_with('/') => Self::Unknown(cmd.to_string()),
            text => Self::Utterance(text.to_string()),
        }
    }
}

fn print_message(message: &Message, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let speaker = match message.role() {
                sdk::MessageRole::User => "You",
                sdk::MessageRole::Assistant => "MedAssist",
            };
            println!("[{}] {}:", message.display_time(), speaker);
            println!("{}", message.text());
            println!();
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(message)?);
        }
    }
    Ok(())
}

fn print_suggestions() {
    println!("Suggested questions:");
    for (i, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }
    println!();
}

/// Run an interactive conversation on stdin/stdout
pub async fn handle_chat(config: &Config, format: OutputFormat) -> Result<()> {
    let orchestrator = AssistantOrchestrator::from_config(config);

    for message in orchestrator.conversation().iter() {
        print_message(message, format)?;
    }
    if matches!(format, OutputFormat::Text) {
        print_suggestions();
        println!("Type a question, a suggestion number, /clear, /reset or /quit.");
        println!();
    }

    let mut typing = orchestrator.subscribe_typing();
    let indicator = tokio::spawn(async move {
        while typing.changed().await.is_ok() {
            if *typing.borrow_and_update() {
                eprintln!("  MedAssist is typing...");
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if matches!(format, OutputFormat::Text) {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Quit => break,
            ChatInput::Suggest => print_suggestions(),
            ChatInput::Unknown(cmd) => println!("Unknown command: {}", cmd),
            ChatInput::Clear => match orchestrator.clear() {
                Ok(()) => {
                    for message in orchestrator.conversation().iter() {
                        print_message(message, format)?;
                    }
                }
                Err(e) => println!("{}", e.user_hint()),
            },
            ChatInput::Reset => {
                orchestrator.reset();
                for message in orchestrator.conversation().iter() {
                    print_message(message, format)?;
                }
            }
            ChatInput::Utterance(text) => match orchestrator.submit_utterance(&text).await {
                Ok(reply) => print_message(&reply, format)?,
                Err(SubmitError::EmptyUtterance) => {}
                Err(e) => println!("{}", e.user_hint()),
            },
        }
    }

    drop(orchestrator);
    indicator.abort();
    Ok(())
}

/// Ask a single question and print the reply
pub async fn handle_ask(utterance: String, config: &Config, format: OutputFormat) -> Result<()> {
    let orchestrator = AssistantOrchestrator::from_config(config);

    let reply = orchestrator
        .submit_utterance(&utterance)
        .await
        .map_err(|e| anyhow::anyhow!("{}. {}", e, e.user_hint()))?;

    match format {
        OutputFormat::Text => {
            println!("{}", reply.text());
        }
        OutputFormat::Json => {
            let output = json!({
                "reply": reply,
                "session": orchestrator.session_id().map(|id| id.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// List the suggested questions
pub fn handle_suggestions(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_suggestions(),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&SUGGESTED_QUESTIONS)?);
        }
    }
    Ok(())
}

/// Prompt for the API key without echo and store it in the keychain
pub fn handle_key_set(format: OutputFormat) -> Result<()> {
    let key = rpassword::prompt_password_stdout("Gemini API key: ")
        .context("Failed to read API key")?;

    let key = validate_credential(Some(&key))
        .map_err(EngineError::from)
        .map_err(|e| anyhow::anyhow!("{}. {}", e, e.user_hint()))?;

    SecretManager::new(KEYCHAIN_SERVICE)
        .set_secret(GEMINI_KEY_NAME, key.unsecure())
        .map_err(|e| anyhow::anyhow!("{}. {}", e, e.user_hint()))?;

    match format {
        OutputFormat::Text => println!("Stored in keychain."),
        OutputFormat::Json => println!("{}", json!({ "stored": true })),
    }
    Ok(())
}

/// Remove the API key from the keychain
pub fn handle_key_delete(format: OutputFormat) -> Result<()> {
    SecretManager::new(KEYCHAIN_SERVICE)
        .delete_secret(GEMINI_KEY_NAME)
        .map_err(|e| anyhow::anyhow!("{}. {}", e, e.user_hint()))?;

    match format {
        OutputFormat::Text => println!("Removed from keychain."),
        OutputFormat::Json => println!("{}", json!({ "deleted": true })),
    }
    Ok(())
}

/// Report where the key comes from and whether it would be accepted
pub fn handle_key_status(config: &Config, format: OutputFormat) -> Result<()> {
    let var = &config.assistant.api_key_env;
    let keychain = Arc::new(SecretManager::new(KEYCHAIN_SERVICE));

    let in_env = std::env::var(var)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    let in_keychain = keychain.has_secret(GEMINI_KEY_NAME);
    let verdict = CredentialSource::env_with_keychain(var.clone(), keychain).resolve();

    match format {
        OutputFormat::Text => {
            println!("Backend key:");
            println!(
                "  {:<20} {}",
                format!("${}", var),
                if in_env { "set" } else { "not set" }
            );
            println!(
                "  {:<20} {}",
                "Keychain",
                if in_keychain { "stored" } else { "not stored" }
            );
            match &verdict {
                Ok(_) => println!("  {:<20} usable", "Status"),
                Err(e) => {
                    println!("  {:<20} {}", "Status", e);
                    println!();
                    println!("Answers will come from the offline protocol engine.");
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "env_var": var,
                "env_set": in_env,
                "keychain": in_keychain,
                "usable": verdict.is_ok(),
                "problem": verdict.err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
