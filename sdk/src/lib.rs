//! MedAssist SDK
//!
//! Shared types used by the engine and by anything that renders a conversation.
//! Front ends depend on this crate only; they never see the remote session.

/// Error types and handling
pub mod errors;

/// Conversation message types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use types::{Message, MessageId, MessageIdGenerator, MessageRole};
