//! Backend adapters for external coding agents.
//!
//! Three backends produce the same normalized event stream:
//! - `cursor` - Cursor CLI, strict `type`/`subtype` NDJSON output
//! - `gemini` - Gemini CLI, lenient NDJSON output with text accumulation
//! - `claude` - Claude Code, driven through `askrepo-claude-sdk`
//!
//! The [`AgentDispatcher`] resolves the configured backend once and exposes
//! a single `start` operation; every backend hands back the same
//! [`RunHandle`] shape, so consumers never branch on the agent kind.

mod claude;
mod cursor;
mod gemini;
mod process;

pub mod dispatcher;
pub mod handle;
pub mod prompt;

pub use dispatcher::AgentDispatcher;
pub use handle::RunHandle;
