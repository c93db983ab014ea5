//! Startup configuration.
//!
//! Flags win over `ASKREPO_*` environment variables; everything is
//! resolved exactly once, before the server starts taking requests. In
//! particular the agent kind is parsed here so a bad value fails fast
//! instead of mid-stream.

use std::path::PathBuf;

use askrepo_core::{AgentError, AgentKind};
use clap::Parser;

/// askrepo server: ask questions about cached repositories.
#[derive(Parser, Debug)]
#[command(name = "askrepo-server", about = "Ask questions about cached repositories via coding agents")]
pub struct Args {
    /// HTTP listen address
    #[arg(long, default_value = "127.0.0.1:8787")]
    pub listen: String,

    /// Directory holding the cached repositories
    #[arg(long)]
    pub projects_dir: Option<PathBuf>,

    /// Agent backend: cursor, gemini, or claude
    #[arg(long)]
    pub agent: Option<String>,

    /// Override the agent executable (name or full path)
    #[arg(long)]
    pub agent_command: Option<String>,

    /// Model identifier, used by the claude backend
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL missing projects are cloned from, e.g. https://github.com/myorg
    #[arg(long)]
    pub clone_base: Option<String>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub projects_dir: PathBuf,
    pub agent_kind: AgentKind,
    pub agent_command: Option<String>,
    pub model: Option<String>,
    pub clone_base: Option<String>,
}

impl Config {
    pub fn resolve(args: Args) -> Result<Self, AgentError> {
        let kind = args
            .agent
            .or_else(|| env_var("ASKREPO_AGENT"))
            .unwrap_or_else(|| "cursor".to_string());
        let agent_kind: AgentKind = kind.parse()?;

        let projects_dir = args
            .projects_dir
            .or_else(|| env_var("ASKREPO_PROJECTS_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("projects"));

        Ok(Self {
            listen: args.listen,
            projects_dir,
            agent_kind,
            agent_command: args.agent_command.or_else(|| env_var("ASKREPO_AGENT_COMMAND")),
            model: args.model.or_else(|| env_var("ASKREPO_MODEL")),
            clone_base: args.clone_base.or_else(|| env_var("ASKREPO_CLONE_BASE")),
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
