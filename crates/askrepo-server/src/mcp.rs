//! MCP (Model Context Protocol) server implementation.
//!
//! Provides MCP tools for interacting with askrepo:
//! - `list_projects` - List the cached repositories
//! - `question` - Ask a question about one repository, with progress
//!   notifications while the agent works

use std::sync::Arc;

use axum::Router;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{
        CallToolResult, Content, ProgressNotificationParam, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use askrepo_core::AgentEvent;

use crate::state::AppState;

/// MCP server for askrepo operations.
#[derive(Clone)]
pub struct AskRepoMcpServer {
    state: Arc<AppState>,
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

// ============================================================================
// Tool Parameter Types
// ============================================================================

/// Parameters for the question tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QuestionParams {
    /// Name of the cached repository to ask about.
    pub library: String,

    /// The natural-language question.
    pub prompt: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl AskRepoMcpServer {
    /// Create a new MCP server with the given AppState.
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    /// List the repositories available for questions.
    #[tool(description = "List the cached repositories that questions can be asked about.")]
    async fn list_projects(&self) -> Result<CallToolResult, McpError> {
        match self.state.projects.list().await {
            Ok(projects) => {
                info!(count = projects.len(), "Listed projects via MCP");
                Ok(CallToolResult::success(vec![Content::text(
                    serde_json::to_string_pretty(&projects).unwrap_or_else(|_| "[]".to_string()),
                )]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    /// Ask a question about one repository.
    #[tool(description = "Ask a natural-language question about a cached repository. \
        Relays the agent's progress as notifications and returns the final answer as markdown.")]
    async fn question(
        &self,
        Parameters(params): Parameters<QuestionParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let path = match self.state.projects.ensure_fresh(&params.library).await {
            Ok(path) => path,
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(e.to_string())]));
            }
        };

        // A launch failure is reported before any events: the caller gets
        // installation guidance instead of a half-open run.
        let mut handle = match self.state.dispatcher.start(&path, &params.prompt) {
            Ok(handle) => handle,
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(e.to_string())]));
            }
        };

        let progress_token = ctx.meta.get_progress_token();
        let mut statuses: Vec<String> = Vec::new();
        let mut progress: u32 = 0;
        let mut outcome: Option<Result<String, String>> = None;

        while let Some(event) = handle.next_event().await {
            match event {
                AgentEvent::Status { status } => {
                    // Monotonically non-decreasing, capped below 100 until
                    // the run actually completes.
                    progress = (progress + 1).min(99);
                    if let Some(token) = &progress_token {
                        let _ = ctx
                            .peer
                            .notify_progress(ProgressNotificationParam {
                                progress_token: token.clone(),
                                progress: progress.into(),
                                total: Some(100u32.into()),
                                message: Some(status.clone()),
                            })
                            .await;
                    }
                    statuses.push(status);
                }
                AgentEvent::Result { result, .. } => {
                    outcome = Some(Ok(result));
                }
                AgentEvent::Error { error } => {
                    outcome = Some(Err(error));
                }
            }
        }
        handle.finished().await;

        if let Some(token) = &progress_token {
            let _ = ctx
                .peer
                .notify_progress(ProgressNotificationParam {
                    progress_token: token.clone(),
                    progress: 100u32.into(),
                    total: Some(100u32.into()),
                    message: Some("Completed".to_string()),
                })
                .await;
        }

        info!(
            library = %params.library,
            statuses = statuses.len(),
            success = matches!(outcome, Some(Ok(_))),
            "Question run finished via MCP"
        );

        match outcome {
            Some(Ok(text)) => Ok(CallToolResult::success(vec![Content::text(
                compose_final_text(&text, &statuses),
            )])),
            Some(Err(error)) => Ok(CallToolResult::error(vec![Content::text(error)])),
            None => Ok(CallToolResult::error(vec![Content::text(
                "The run ended without a result.".to_string(),
            )])),
        }
    }
}

/// Final answer plus the status log, for visibility into what the agent did.
fn compose_final_text(result: &str, statuses: &[String]) -> String {
    if statuses.is_empty() {
        return result.to_string();
    }
    let mut text = String::from(result);
    text.push_str("\n\n---\nProgress log:\n");
    for status in statuses {
        text.push_str("- ");
        text.push_str(status);
        text.push('\n');
    }
    text
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl ServerHandler for AskRepoMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "askrepo-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "askrepo MCP Server - Ask questions about cached repositories. \
                 Use list_projects to see what is available, then question to get \
                 an answer from the configured coding agent."
                    .to_string(),
            ),
        }
    }
}

// ============================================================================
// HTTP Server Setup
// ============================================================================

/// Create an axum Router for the MCP HTTP server.
///
/// Handles MCP protocol requests over the Streamable HTTP transport;
/// mount it alongside the JSON API.
pub fn create_mcp_router(state: Arc<AppState>, ct: CancellationToken) -> Router {
    let state_clone = state.clone();
    let service = StreamableHttpService::new(
        move || Ok(AskRepoMcpServer::new(state_clone.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            cancellation_token: ct,
            ..Default::default()
        },
    );

    info!("MCP server initialized with Streamable HTTP transport");

    Router::new().nest_service("/mcp", service)
}
