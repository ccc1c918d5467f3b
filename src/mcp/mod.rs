//! MCP server for dashboard search
//!
//! Exposes collection listing, index builds and semantic search as tools.

mod server;

pub use server::run_mcp_server;
