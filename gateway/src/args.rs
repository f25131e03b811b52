use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Thin HTTP edge shim over the gateway core: OpenAI and Anthropic
/// compatible chat endpoints, plus read-only admin introspection.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Path to the gateway TOML configuration file.
    #[arg(long, env = "GATEWAY_CONFIG", default_value = "gateway.toml")]
    pub config: PathBuf,

    /// Address the HTTP server binds to.
    #[arg(long, env = "GATEWAY_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Log filter string, e.g. "info" or "gateway=debug,gateway_core=debug".
    #[arg(long, env = "GATEWAY_LOG", default_value = "info")]
    pub log_filter: String,
}
