//! MedAssist Engine Library
//!
//! This library provides the clinical assistant messaging core used by the
//! `medassist` binary and by integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Model backend abstraction layer
pub mod llm;

/// Assistant messaging core
pub mod assistant;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
