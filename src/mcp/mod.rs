//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides an MCP server that exposes the expense tracker as tools for AI agent
//! integration. The server communicates via JSON-RPC over stdio. The configured category and
//! budget documents are also exposed as MCP resources.

/// Checks if the server has been initialized and returns an error if not.
macro_rules! require_init {
    ($self:expr) => {
        if !$self.check_initialized().await {
            return Self::uninitialized();
        }
    };
}

mod mcp_utils;
mod tools;

use crate::model::Budgets;
use crate::Config;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{
    AnnotateAble, CallToolResult, Implementation, ListResourcesResult, PaginatedRequestParam,
    ProtocolVersion, RawResource, ReadResourceRequestParam, ReadResourceResult, ResourceContents,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::stdio;
use rmcp::ErrorData as McpError;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

const CATEGORIES_URI: &str = "expense://categories";
const BUDGETS_URI: &str = "expense://budgets";

/// The expenses MCP server.
#[derive(Debug, Clone)]
pub(crate) struct ExpenseServer {
    initialized: Arc<Mutex<bool>>,
    config: Arc<Config>,
    tool_router: ToolRouter<ExpenseServer>,
}

impl ExpenseServer {
    /// Creates a new ExpenseServer with the given configuration.
    pub(crate) fn new(config: Config) -> Self {
        Self {
            initialized: Arc::new(Mutex::new(false)),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    async fn check_initialized(&self) -> bool {
        *self.initialized.lock().await
    }

    fn uninitialized() -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::error(vec![rmcp::model::Content::text(
            "You have not yet initialized the service. Please call initialize_service first.",
        )]))
    }
}

#[tool_handler]
impl ServerHandler for ExpenseServer {
    /// Returns server information sent to the MCP client during initialization.
    ///
    /// The `instructions` field is intended by the specification to be the primary way to
    /// communicate the server's purpose and usage to AI agents. Agents tend to consider this
    /// reading as optional, so the full instructions are instead returned by a required
    /// `initialize_service` tool that gates all the others.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "expenses".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INTRO.md").into()),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            meta: None,
            resources: vec![
                RawResource::new(CATEGORIES_URI, "categories").no_annotation(),
                RawResource::new(BUDGETS_URI, "budgets").no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let text = match uri.as_str() {
            CATEGORIES_URI => serde_json::to_string_pretty(self.config.categories())
                .map_err(|e| McpError::internal_error(e.to_string(), None))?,
            BUDGETS_URI => {
                let budgets = Budgets::load(&self.config.budgets_path())
                    .await
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                serde_json::to_string_pretty(&budgets)
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?
            }
            other => {
                return Err(McpError::resource_not_found(
                    "resource_not_found",
                    Some(serde_json::json!({ "uri": other })),
                ));
            }
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function starts the MCP
/// server and blocks until the client disconnects or an error occurs.
pub(crate) async fn run_server(config: Config, io: Io) -> crate::Result<()> {
    use crate::error::{ErrorType, IntoResult};
    let server = ExpenseServer::new(config);
    info!("Starting MCP server...");

    let service = match io {
        Io::Stdio => server
            .serve(stdio())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
        #[cfg(test)]
        Io::Mock(stream) => server
            .serve(stream)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
    };

    info!("MCP server running, waiting for requests...");

    // Wait for the server to complete (client disconnects or error)
    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))
        .pub_result(ErrorType::Service)?;

    info!("MCP server shut down");
    Ok(())
}
