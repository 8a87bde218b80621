//! HTTP surface for the focus workspace: actor resolution, the REST action
//! feed, and the MCP protocol endpoint with its session router.

pub mod auth;
pub mod mcp;
pub mod rest;
pub mod rpc;
pub mod server;

pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
