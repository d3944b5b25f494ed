//! MCP server implementation for llamacloud-mcp.
//!
//! The published tool set is decided at startup from the command line, so
//! discovery and invocation are implemented directly on [`ServerHandler`]
//! rather than through the rmcp tool macros.

mod helpers;
pub mod server;

use std::sync::Arc;

use llamacloud_core::{RequestRouter, ToolDescriptor, ToolRegistry};
use rmcp::model::{
    CallToolRequestParams,
    CallToolResult,
    Content,
    Implementation,
    ListToolsResult,
    PaginatedRequestParams,
    ServerCapabilities,
    ServerInfo,
    Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const SERVER_NAME: &str = "llamacloud-mcp";

/// MCP server wrapper around the tool registry and request router.
#[derive(Debug, Clone)]
pub struct LlamaCloudMcp {
    tools: Arc<[Tool]>,
    instructions: Arc<str>,
    router: RequestRouter,
}

impl LlamaCloudMcp {
    #[must_use]
    pub fn new(registry: &ToolRegistry, router: RequestRouter) -> Self {
        let tools: Vec<Tool> = registry.descriptors().iter().map(to_tool).collect();
        Self {
            tools: tools.into(),
            instructions: instructions_for(registry).into(),
            router,
        }
    }

    /// Discovery payload, identical on every call.
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.to_vec()
    }

    /// Runs one tool call and shapes the result for the protocol.
    ///
    /// # Errors
    /// Returns the route failure as MCP error data tagged with its kind.
    pub async fn call(
        &self,
        tool_name: &str,
        arguments: Option<&Map<String, Value>>,
    ) -> Result<CallToolResult, ErrorData> {
        let output = self
            .router
            .handle(tool_name, arguments)
            .await
            .map_err(|err| {
                warn!(tool = tool_name, kind = err.code(), "tool call failed: {err}");
                helpers::map_route_err(&err)
            })?;
        Ok(CallToolResult::success(vec![Content::text(output.content)]))
    }
}

fn to_tool(descriptor: &ToolDescriptor) -> Tool {
    Tool::new(
        descriptor.name.clone(),
        descriptor.description.clone(),
        Arc::new(descriptor.input_schema.clone()),
    )
}

fn instructions_for(registry: &ToolRegistry) -> String {
    let mut text = String::from(
        "llamacloud-mcp answers questions from LlamaCloud managed indexes.\n\
         Call a tool with a natural-language `query`; the result is the matching \
         passages, best match first, separated by blank lines.\n\nTools:",
    );
    for definition in registry.definitions() {
        text.push_str("\n- `");
        text.push_str(&definition.tool_name);
        text.push_str("`: ");
        text.push_str(&definition.index_name);
        text.push_str(" - ");
        text.push_str(&definition.description);
    }
    text
}

impl ServerHandler for LlamaCloudMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(self.instructions.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        debug!(tool = %request.name, "call_tool");
        self.call(&request.name, request.arguments.as_ref()).await
    }
}
