// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde_derive::{Deserialize, Serialize};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The JSON-RPC revision spoken on every transport. Requests
/// with any other value in their `jsonrpc` field get rejected
/// with an INVALID_REQUEST error.
pub const JSONRPC_VERSION: &str = "2.0";

/// The revision of the tool-call protocol advertised in the
/// initialize handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

// The standard JSON-RPC error codes. Tool-level failures (a bad
// hex code, say) never use these, they come back as a successful
// response carrying a result with `isError` set.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// A request id. JSON-RPC allows either a number or a string,
/// and clients use both, so we have to be able to echo either
/// form back unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// A single inbound JSON-RPC message.
///
/// Notifications arrive as requests with no id, and must never
/// generate a response frame.
#[derive(Serialize, Deserialize, Debug)]
pub struct Request {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// A single outbound JSON-RPC message. Exactly one of `result`
/// and `error` is set.
#[derive(Serialize, Deserialize, Debug)]
pub struct Response {
    pub jsonrpc: String,
    /// Echoes the request id. None serializes as `null`, which is
    /// what the spec calls for when the request id could not even
    /// be parsed out of the inbound frame.
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Option<RequestId>, result: serde_json::Value) -> Self {
        Response { jsonrpc: String::from(JSONRPC_VERSION), id, result: Some(result), error: None }
    }

    pub fn failure(id: Option<RequestId>, code: i64, message: String) -> Self {
        Response {
            jsonrpc: String::from(JSONRPC_VERSION),
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

/// A protocol-level error attached to a response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// The reply to an `initialize` request.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Identifies the server implementation to the client.
#[derive(Serialize, Deserialize, Debug)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// The capability blob advertised during the handshake. We only
/// ever serve tools, so that is the only capability modeled.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// A tool descriptor, as returned by `tools/list`.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// A JSON schema describing the arguments object.
    pub input_schema: serde_json::Value,
}

/// The reply to a `tools/list` request.
#[derive(Serialize, Deserialize, Debug)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<Tool>,
}

/// The params blob of a `tools/call` request.
#[derive(Serialize, Deserialize, Debug)]
pub struct CallToolParams {
    /// The name of the tool being invoked.
    #[serde(default)]
    pub name: String,
    /// The arguments object. Defaults to null when the client
    /// leaves it off entirely, which tool handlers must treat
    /// the same as an empty object with the argument missing.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// The reply to a `tools/call` request.
///
/// Failures of the tool itself (as opposed to failures of the
/// protocol) are flagged with `is_error` and described in the
/// content rather than being surfaced as an RpcError, so that
/// the caller on the far end can read the failure text.
#[derive(Serialize, Deserialize, Debug)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// A successful text result.
    pub fn text(text: String) -> Self {
        CallToolResult { content: vec![Content::Text { text }], is_error: false }
    }

    /// A tool-level error result.
    pub fn error(text: String) -> Self {
        CallToolResult { content: vec![Content::Text { text }], is_error: true }
    }
}

/// A chunk of tool result content. Only text content exists for
/// now, but the wire format tags each chunk so more kinds can be
/// added without breaking old clients.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// The color lookup result rendered to callers.
///
/// Field names and order are the wire contract shared by the
/// one-shot CLI and the `get_color_info` tool: keys are exactly
/// `hex`, `name`, and `rgb`, with `rgb` holding the literal
/// pattern `rgb(R, G, B)` in decimal. `hex` echoes the caller's
/// input verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ColorInfo {
    pub hex: String,
    pub name: String,
    pub rgb: String,
}
