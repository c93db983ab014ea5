//! Shared server state.

use askrepo_agents::AgentDispatcher;
use askrepo_projects::ProjectStore;

use crate::config::Config;

/// Everything a request handler needs, built once at startup and shared
/// via `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: AgentDispatcher,
    pub projects: ProjectStore,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            dispatcher: AgentDispatcher::new(
                config.agent_kind,
                config.agent_command.clone(),
                config.model.clone(),
            ),
            projects: ProjectStore::new(&config.projects_dir, config.clone_base.clone()),
        }
    }
}
