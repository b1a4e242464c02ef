//! The mcp command handler.

use crate::commands::Out;
use crate::mcp::{run_server, Io};
use crate::{Config, Result};

/// Runs the MCP server on stdio. Blocks until the client disconnects.
pub async fn mcp(config: Config) -> Result<Out<()>> {
    run_server(config, Io::Stdio).await?;
    Ok(Out::new_message("MCP server stopped"))
}
