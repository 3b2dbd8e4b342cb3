//! Error types and handling
//!
//! This module provides the error types shared by the MedAssist engine and its
//! front ends. Errors implement [`ErrorExt`], which gives user-facing hints and
//! says whether the error is recoverable.
//!
//! # Security
//!
//! Hints are static strings. They never include secrets, credentials or any
//! text typed by the clinician.

use thiserror::Error;

/// Extensions every engine-facing error provides
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain:
    /// - Secrets (API keys, tokens)
    /// - Utterance text, which may identify a patient
    /// - Internal implementation details
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors go away by retrying or by fixing input. Non-recoverable
    /// errors need the operator to change configuration.
    fn is_recoverable(&self) -> bool;
}

/// Engine-level error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::Config("unknown log level".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(!error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Credential errors
    #[error("Credential error: {0}")]
    Credential(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Credential(_) => {
                "The assistant backend key is missing or invalid. Answers will come from the offline protocol engine"
            }
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Credential(_) => false,
            Self::KeyringError(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_do_not_echo_details() {
        let err = EngineError::Config("sk-secret-value".to_string());
        assert!(!err.user_hint().contains("sk-secret-value"));
    }

    #[test]
    fn test_recoverability() {
        assert!(!EngineError::Credential("placeholder".into()).is_recoverable());
        assert!(EngineError::KeyringError("locked".into()).is_recoverable());
    }
}
