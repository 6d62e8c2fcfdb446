//! Model Context Protocol (MCP) facing module
//!
//! Defines the value shapes the bridge exchanges with the external MCP
//! server machinery: resource/tool definitions and tool-call results.
//! The registration and notification contract lives in
//! [`crate::bridge::McpSurface`].

/// MCP value types
pub mod types;

pub use types::{McpResource, McpResourceContent, McpToolDefinition, ToolCallResult, ToolContent};
