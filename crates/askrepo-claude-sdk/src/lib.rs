//! Claude Code SDK for askrepo
//!
//! This crate wraps Claude Code in a small SDK surface: a one-shot query
//! against a working directory that yields a typed stream of native
//! messages plus a completion signal. Callers never deal with the process
//! underneath - launch problems, exit codes, and malformed output all
//! surface as [`SdkError`] or typed [`ClaudeMessage`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use askrepo_claude_sdk::ClaudeAgentClient;
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClaudeAgentClient::new("claude").with_model("claude-sonnet-4-5");
//!     let mut query = client.query(Path::new("."), "What does this crate do?")?;
//!
//!     while let Some(message) = query.next_message().await {
//!         println!("{message:?}");
//!     }
//!     query.finish().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

// Re-export main types
pub use client::{ClaudeAgentClient, Query};
pub use error::SdkError;
pub use types::{AssistantMessage, ClaudeMessage, ContentItem};
