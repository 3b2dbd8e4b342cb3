/// Example showing the assistant answering without a backend key
///
/// With no credential configured every reply comes from the clinical protocol
/// rules, so this runs without network access.
///
/// Run with: cargo run --example offline_assistant
use medassist_engine::assistant::{AssistantOrchestrator, SUGGESTED_QUESTIONS};
use medassist_engine::config::Config;
use medassist_engine::secrets::CredentialSource;
use medassist_engine::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    init_telemetry();

    let orchestrator =
        AssistantOrchestrator::with_credentials(&Config::default(), CredentialSource::fixed(None));

    for question in SUGGESTED_QUESTIONS {
        println!("> {}", question);
        let reply = orchestrator
            .submit_utterance(question)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        println!("{}\n", reply.text());
    }

    println!("Conversation holds {} messages", orchestrator.conversation().len());
    Ok(())
}
