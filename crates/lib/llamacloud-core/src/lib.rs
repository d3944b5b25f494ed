//! Core types and services for llamacloud-mcp.
//!
//! This crate turns command-line tool specifications into named tools, binds
//! each tool to a remote `LlamaCloud` index, and routes tool calls to the bound
//! index through the [`retrieval::Retriever`] seam. It has no knowledge of the
//! MCP wire types; the `llamacloud-mcp` crate adapts it to rmcp.

pub mod binder;
pub mod retrieval;
pub mod router;
pub mod spec;
pub mod tools;

pub use binder::{BindError, BoundIndexes, CloudSettings, IndexBinder, IndexHandle};
pub use retrieval::{
    ApiKey, IndexTarget, LlamaCloudConfig, LlamaCloudRetriever, RetrieveError, Retriever,
    ScoredNode,
};
pub use router::{RequestRouter, RouteError, ToolOutput};
pub use spec::{
    ParsedSpecs, SpecError, SpecWarning, ToolDefinition, parse_tool_specs, tool_name_for,
};
pub use tools::{RegistryError, ToolDescriptor, ToolRegistry};
