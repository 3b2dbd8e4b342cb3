//! Backend credential resolution and validation
//!
//! The credential is read when a remote session is created, never per message.
//! A value that is missing, a known template placeholder, or implausibly short is
//! rejected before any network attempt.

use super::{SecretManager, SecretString};
use sdk::errors::EngineError;
use std::sync::Arc;

/// Keychain entry holding the Gemini key
pub const GEMINI_KEY_NAME: &str = "gemini_api_key";

/// Values shipped in example env files that must never be sent to the backend
const PLACEHOLDER_CREDENTIALS: &[&str] = &["your_gemini_api_key_here", "your_api_key_here"];

/// Shortest value accepted as a real key
pub const MIN_CREDENTIAL_LEN: usize = 10;

/// Why a credential was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("backend API key is not configured")]
    Missing,

    #[error("backend API key is still the template placeholder")]
    Placeholder,

    #[error("backend API key is too short ({len} characters)")]
    TooShort { len: usize },
}

impl From<CredentialError> for EngineError {
    fn from(e: CredentialError) -> Self {
        EngineError::Credential(e.to_string())
    }
}

/// Validate a raw credential value.
pub fn validate_credential(raw: Option<&str>) -> Result<SecretString, CredentialError> {
    let value = raw.map(str::trim).unwrap_or_default();

    if value.is_empty() {
        return Err(CredentialError::Missing);
    }
    if PLACEHOLDER_CREDENTIALS
        .iter()
        .any(|p| value.eq_ignore_ascii_case(p))
    {
        return Err(CredentialError::Placeholder);
    }
    let len = value.chars().count();
    if len < MIN_CREDENTIAL_LEN {
        return Err(CredentialError::TooShort { len });
    }

    Ok(SecretString::new(value))
}

/// Where the backend credential comes from
#[derive(Clone)]
pub enum CredentialSource {
    /// Named environment variable, then the OS keychain if one is attached
    Environment {
        var: String,
        keychain: Option<Arc<SecretManager>>,
    },

    /// A value injected by the embedding application
    Fixed(Option<SecretString>),
}

impl CredentialSource {
    /// Environment-only source
    pub fn env(var: impl Into<String>) -> Self {
        Self::Environment {
            var: var.into(),
            keychain: None,
        }
    }

    /// Environment source that falls back to the keychain
    pub fn env_with_keychain(var: impl Into<String>, keychain: Arc<SecretManager>) -> Self {
        Self::Environment {
            var: var.into(),
            keychain: Some(keychain),
        }
    }

    /// Fixed source; `None` behaves like an unset credential
    pub fn fixed(value: Option<&str>) -> Self {
        Self::Fixed(value.map(SecretString::new))
    }

    /// Read the current raw value without validating it.
    pub fn read(&self) -> Option<SecretString> {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::Environment { var, keychain } => {
                if let Some(value) = std::env::var(var).ok().filter(|v| !v.trim().is_empty()) {
                    return Some(SecretString::new(value));
                }

                let manager = keychain.as_ref()?;
                match manager.get_secret(GEMINI_KEY_NAME) {
                    Ok(value) => value.map(SecretString::new),
                    Err(e) => {
                        tracing::debug!("Keychain lookup skipped: {}", e);
                        None
                    }
                }
            }
        }
    }

    /// Read and validate.
    pub fn resolve(&self) -> Result<SecretString, CredentialError> {
        let raw = self.read();
        validate_credential(raw.as_ref().map(SecretString::unsecure))
    }

    /// [`resolve`](Self::resolve) with the keychain lookup moved onto the blocking pool
    pub async fn resolve_async(&self) -> Result<SecretString, CredentialError> {
        match self {
            Self::Environment {
                keychain: Some(_), ..
            } => {
                let source = self.clone();
                tokio::task::spawn_blocking(move || source.resolve())
                    .await
                    .unwrap_or_else(|e| {
                        tracing::debug!("Credential lookup task failed: {}", e);
                        Err(CredentialError::Missing)
                    })
            }
            _ => self.resolve(),
        }
    }
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment { var, keychain } => f
                .debug_struct("Environment")
                .field("var", var)
                .field("keychain", &keychain.is_some())
                .finish(),
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
        }
    }
}
