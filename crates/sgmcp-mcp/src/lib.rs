//! MCP tool server over the Sourcegraph backends: JSON-RPC dispatch, tool
//! definitions, drain lifecycle, and the streamable HTTP and SSE transports.

pub mod http;
pub mod lifecycle;
pub mod protocol;
pub mod server;
pub mod tools;

pub use http::{TransportError, run_servers};
pub use lifecycle::Lifecycle;
pub use server::McpServer;
