//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize logging to stdout.
///
/// `RUST_LOG` takes precedence over the built-in filters when set.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        "gmail_mcp=debug,gmail_mcp_core=debug,gmail_mcp_server=debug,gmail_mcp_tools=debug,tower_http=debug"
    } else {
        "gmail_mcp=info,gmail_mcp_server=info,tower_http=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .init();
}
