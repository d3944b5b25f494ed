//! Daemon entry point for the `LlamaCloud` MCP server.
//!
//! Reads tool specifications from the command line and settings from the
//! environment, binds every tool, then serves MCP over stdio or streamable
//! HTTP. Logs go to stderr so stdout stays free for the protocol.

mod config;
mod startup;

use std::process::ExitCode;

use llamacloud_mcp::LlamaCloudMcp;
use llamacloud_mcp::server::{serve_stdio, serve_streamable_http};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, Transport};
use crate::startup::{StartupError, build_server};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let (service, transport) = match startup() {
        Ok(ready) => ready,
        Err(err) => {
            error!(code = err.code(), "{err}");
            return ExitCode::FAILURE;
        }
    };

    let served = match transport {
        Transport::Stdio => serve_stdio(service).await,
        Transport::Http(http) => serve_streamable_http(service, http).await,
    };
    if let Err(err) = served {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn startup() -> Result<(LlamaCloudMcp, Transport), StartupError> {
    let config = ServerConfig::from_env()?;
    let tokens: Vec<String> = std::env::args().skip(1).collect();
    let service = build_server(&tokens, &config)?;
    Ok((service, config.transport))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
