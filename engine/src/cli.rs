//! CLI interface for MedAssist
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for talking to the clinical assistant.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MedAssist clinical virtual assistant
///
/// Answers clinician questions through a remote model backend, falling back to
/// built-in clinical protocol answers when the backend is unavailable.
#[derive(Parser, Debug)]
#[command(name = "medassist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive conversation
    Chat,

    /// Ask a single question and print the reply
    Ask {
        /// The question to ask
        utterance: String,
    },

    /// List the suggested questions
    Suggestions,

    /// Manage the backend API key in the OS keychain
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

/// Backend key management actions
#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Store the API key (read from a hidden prompt)
    Set,

    /// Remove the stored API key
    Delete,

    /// Show where the API key would be read from and whether it is usable
    Status,
}
