use clap::{Parser, builder::BoolishValueParser};
use std::net::SocketAddr;
use std::time::Duration;

use llamacloud_core::binder::DEFAULT_PROJECT_NAME;
use llamacloud_core::retrieval::{DEFAULT_BASE_URL, LlamaCloudConfig};
use llamacloud_core::CloudSettings;
use llamacloud_mcp::server::McpHttpServerConfig;
use thiserror::Error;

const PROGRAM_NAME: &str = "llamacloud-mcpd";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings read from the environment. The command line itself carries the
/// tool specifications, so these are never parsed from argv.
#[derive(Parser, Debug)]
#[command(name = PROGRAM_NAME, version, about = "LlamaCloud MCP daemon.")]
struct EnvArgs {
    #[arg(long, env = "LLAMA_CLOUD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "LLAMA_CLOUD_PROJECT_NAME", default_value = DEFAULT_PROJECT_NAME)]
    project_name: String,

    #[arg(long, env = "LLAMA_CLOUD_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(
        long,
        env = "LLAMA_CLOUD_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout_secs: u64,

    #[arg(long, env = "LLAMACLOUD_MCP_HTTP_ADDR")]
    http_addr: Option<String>,

    #[arg(
        long,
        env = "LLAMACLOUD_MCP_STATEFUL",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    stateful: bool,
}

/// How the MCP protocol is carried.
#[derive(Debug, Clone)]
pub enum Transport {
    Stdio,
    Http(McpHttpServerConfig),
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub cloud: CloudSettings,
    pub llamacloud: LlamaCloudConfig,
    pub transport: Transport,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] clap::Error),
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args = EnvArgs::try_parse_from([PROGRAM_NAME])?;
        Self::try_from(args)
    }
}

impl TryFrom<EnvArgs> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: EnvArgs) -> Result<Self, Self::Error> {
        let base_url = args.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "LLAMA_CLOUD_BASE_URL",
                value: args.base_url,
            });
        }
        if args.timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "LLAMA_CLOUD_TIMEOUT_SECS",
                value: args.timeout_secs.to_string(),
            });
        }
        let timeout = Duration::from_secs(args.timeout_secs);
        let llamacloud = LlamaCloudConfig::new(base_url).with_timeout(timeout);

        let transport = match args.http_addr.filter(|value| !value.trim().is_empty()) {
            None => Transport::Stdio,
            Some(value) => {
                let Ok(addr) = value.trim().parse::<SocketAddr>() else {
                    return Err(ConfigError::InvalidSetting {
                        name: "LLAMACLOUD_MCP_HTTP_ADDR",
                        value,
                    });
                };
                let http = McpHttpServerConfig::new(addr);
                Transport::Http(http.with_stateful_mode(args.stateful))
            }
        };

        Ok(Self {
            cloud: CloudSettings::new(Some(args.project_name), args.api_key),
            llamacloud,
            transport,
        })
    }
}
