// MedAssist clinical virtual assistant
// Main entry point for the medassist binary

use clap::Parser;
use medassist_engine::cli::{Cli, Command, KeyAction};
use medassist_engine::config::{Config, ConfigOrigin};
use medassist_engine::handlers::{
    handle_ask, handle_chat, handle_key_delete, handle_key_set, handle_key_status,
    handle_suggestions, OutputFormat,
};
use medassist_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let (config, origin) = if let Some(config_path) = &cli.config {
        (
            Config::load_from_path(config_path)?,
            ConfigOrigin::Loaded(config_path.clone()),
        )
    } else {
        Config::load_or_create()?
    };

    // --log beats the config file; RUST_LOG beats both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    match &origin {
        ConfigOrigin::Created(path) => {
            tracing::info!("Wrote default configuration to {:?}", path)
        }
        ConfigOrigin::Loaded(path) => tracing::debug!("Loaded configuration from {:?}", path),
    }

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::debug!("MedAssist v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Chat => handle_chat(&config, format).await,

        Command::Ask { utterance } => {
            tracing::debug!("Asking a single question ({} chars)", utterance.chars().count());
            handle_ask(utterance, &config, format).await
        }

        Command::Suggestions => handle_suggestions(format),

        Command::Key { action } => {
            tracing::debug!("Key management: {:?}", action);
            match action {
                KeyAction::Set => handle_key_set(format),
                KeyAction::Delete => handle_key_delete(format),
                KeyAction::Status => handle_key_status(&config, format),
            }
        }
    }
}
