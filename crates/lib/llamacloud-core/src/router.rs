//! Dispatches tool calls to the bound index.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::binder::BoundIndexes;
use crate::retrieval::RetrieveError;

/// Separator placed between retrieved chunks.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Successful tool-call payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
}

/// Per-request failures. None of them stop the server.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("query parameter is required")]
    MissingQuery,
    #[error("retrieval failed: {0}")]
    RetrievalFailed(#[source] RetrieveError),
}

impl RouteError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::MissingQuery => "MISSING_QUERY",
            Self::RetrievalFailed(_) => "RETRIEVAL_FAILED",
        }
    }
}

impl From<RetrieveError> for RouteError {
    fn from(err: RetrieveError) -> Self {
        Self::RetrievalFailed(err)
    }
}

/// Stateless request router over the startup-time index bindings.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    indexes: Arc<BoundIndexes>,
}

impl RequestRouter {
    #[must_use]
    pub const fn new(indexes: Arc<BoundIndexes>) -> Self {
        Self { indexes }
    }

    #[must_use]
    pub fn indexes(&self) -> &BoundIndexes {
        &self.indexes
    }

    /// Runs one tool call. The retrieval round-trip is the only await point.
    ///
    /// # Errors
    /// [`RouteError::UnknownTool`] and [`RouteError::MissingQuery`] are raised
    /// before the retrieval engine is contacted; engine failures surface as
    /// [`RouteError::RetrievalFailed`] and are not retried.
    pub async fn handle(
        &self,
        tool_name: &str,
        arguments: Option<&Map<String, Value>>,
    ) -> Result<ToolOutput, RouteError> {
        let handle = self
            .indexes
            .get(tool_name)
            .ok_or_else(|| RouteError::UnknownTool(tool_name.to_string()))?;
        let query = query_argument(arguments).ok_or(RouteError::MissingQuery)?;

        debug!(
            tool = tool_name,
            index = handle.index_name(),
            "routing query"
        );
        let nodes = handle.retrieve(&query).await?;

        let content = nodes
            .iter()
            .map(|node| node.text.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);
        Ok(ToolOutput { content })
    }
}

/// Reads `arguments.query` as text. Scalars use their display form and
/// arrays or objects their JSON text; null, absent and `""` are `None`.
fn query_argument(arguments: Option<&Map<String, Value>>) -> Option<String> {
    let query = match arguments?.get("query")? {
        Value::Null => return None,
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other @ (Value::Array(_) | Value::Object(_)) => other.to_string(),
    };
    (!query.is_empty()).then_some(query)
}
