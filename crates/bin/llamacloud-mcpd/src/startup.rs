use std::sync::Arc;

use llamacloud_core::{
    BindError, IndexBinder, LlamaCloudRetriever, RegistryError, RequestRouter, RetrieveError,
    SpecError, ToolRegistry, parse_tool_specs,
};
use llamacloud_mcp::LlamaCloudMcp;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, ServerConfig};

/// Anything that stops the daemon before it serves its first request.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Client(#[from] RetrieveError),
}

impl StartupError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_INVALID",
            Self::Spec(err) => err.code(),
            Self::Registry(err) => err.code(),
            Self::Bind(err) => err.code(),
            Self::Client(_) => "CLIENT_INIT_FAILED",
        }
    }
}

/// Parses the tool specifications, binds every tool, and returns the ready
/// server. Runs to completion before any transport is opened.
pub fn build_server<S: AsRef<str>>(
    tokens: &[S],
    config: &ServerConfig,
) -> Result<LlamaCloudMcp, StartupError> {
    let parsed = parse_tool_specs(tokens)?;
    let registry = ToolRegistry::new(parsed.definitions)?;

    let retriever = Arc::new(LlamaCloudRetriever::new(&config.llamacloud)?);
    let bound = IndexBinder::new(config.cloud.clone(), retriever).bind(&registry)?;
    info!(
        tools = bound.len(),
        project = %config.cloud.project_name,
        skipped = parsed.warnings.len(),
        "startup complete"
    );

    let router = RequestRouter::new(Arc::new(bound));
    Ok(LlamaCloudMcp::new(&registry, router))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Transport;

    use llamacloud_core::{CloudSettings, LlamaCloudConfig};

    fn config(api_key: Option<&str>) -> ServerConfig {
        ServerConfig {
            cloud: CloudSettings::new(None, api_key.map(str::to_string)),
            llamacloud: LlamaCloudConfig::default(),
            transport: Transport::Stdio,
        }
    }

    #[test]
    fn builds_server_with_tools_in_order() {
        let server = build_server(
            &[
                "--index",
                "Docs",
                "--description",
                "Company handbook",
                "--index",
                "Wiki",
                "--description",
                "Engineering wiki",
            ],
            &config(Some("llx-key")),
        )
        .expect("startup succeeds");

        let names: Vec<_> = server
            .tools()
            .iter()
            .map(|tool| tool.name.to_string())
            .collect();
        assert_eq!(names, ["get_information_docs", "get_information_wiki"]);
    }

    #[test]
    fn no_arguments_is_fatal() {
        let tokens: [&str; 0] = [];
        let err = build_server(&tokens, &config(Some("llx-key"))).unwrap_err();
        assert_eq!(err.code(), "NO_ARGUMENTS");
    }

    #[test]
    fn missing_credential_is_fatal() {
        let err = build_server(
            &["--index", "Docs", "--description", "handbook"],
            &config(None),
        )
        .unwrap_err();
        assert_eq!(err.code(), "CONFIG_MISSING");
        assert_eq!(err.to_string(), "LLAMA_CLOUD_API_KEY is not set");
    }

    #[test]
    fn colliding_tool_names_are_fatal() {
        let err = build_server(
            &[
                "--index",
                "Sales-Q3",
                "--description",
                "first",
                "--index",
                "sales q3",
                "--description",
                "second",
            ],
            &config(Some("llx-key")),
        )
        .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_TOOL_NAME");
    }
}
