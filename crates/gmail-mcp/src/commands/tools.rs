//! Tool listing.

use gmail_mcp_core::{Config, ProxyClient};
use gmail_mcp_server::protocol::ListToolsResult;

/// Print the tool definitions in `tools/list` shape.
pub fn print_tools(config: &Config) -> anyhow::Result<()> {
    let proxy = ProxyClient::new(&config.backend_url, config.request_timeout())?;
    let registry = gmail_mcp_tools::build_registry(config, proxy)?;

    let listing = ListToolsResult {
        tools: registry.definitions(),
    };
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}
