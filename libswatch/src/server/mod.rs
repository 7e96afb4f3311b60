// Copyright 2023 Google LLC
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

/*! The transport-independent tool server.

Each transport adapter (stdio, http, sse) frames requests its own
way, but they all funnel into [`Server::handle_frame`], which owns
the JSON-RPC dispatch and the tool handlers. The color core knows
nothing about any of this.
*/

use std::sync::Arc;

use serde_json::json;
use swatch_protocol::{
    CallToolParams, CallToolResult, ColorInfo, InitializeResult, ListToolsResult, Request,
    RequestId, Response, ServerCapabilities, ServerInfo, Tool, ToolsCapability, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, MCP_PROTOCOL_VERSION, METHOD_NOT_FOUND,
    PARSE_ERROR,
};
use tracing::{debug, instrument, warn};

use crate::{color, consts, palette, palette::Palette};

pub mod http;
pub mod sse;
pub mod stdio;

/// The name of the one tool we serve. Wire contract, do not rename.
const GET_COLOR_INFO: &str = "get_color_info";

pub struct Server {
    /// The reference palette, fully constructed before any
    /// transport starts accepting and read-only from then on,
    /// so handler threads can share it without locking.
    palette: Palette,
}

impl Server {
    pub fn new(palette: Palette) -> Arc<Self> {
        Arc::new(Server { palette })
    }

    /// Handles one raw JSON-RPC frame and returns the serialized
    /// response frame, if the request calls for one. Notifications
    /// and unserializable responses produce None.
    #[instrument(skip_all)]
    pub fn handle_frame(&self, raw: &str) -> Option<String> {
        let request: Request = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(err) => {
                warn!("unparsable frame: {}", err);
                let resp = Response::failure(None, PARSE_ERROR, format!("parse error: {err}"));
                return serialize_response(resp);
            }
        };

        let resp = self.handle_request(request)?;
        serialize_response(resp)
    }

    /// The method dispatch. Requests without an id are
    /// notifications and never get a response.
    fn handle_request(&self, request: Request) -> Option<Response> {
        debug!("dispatching method '{}'", request.method);

        if request.jsonrpc != JSONRPC_VERSION {
            let id = request.id?;
            return Some(Response::failure(
                Some(id),
                INVALID_REQUEST,
                format!("unsupported jsonrpc version '{}'", request.jsonrpc),
            ));
        }

        if request.method.starts_with("notifications/") {
            return None;
        }
        let id = request.id?;

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(id)),
            "ping" => Some(Response::success(Some(id), json!({}))),
            "tools/list" => Some(self.handle_tools_list(id)),
            "tools/call" => Some(self.handle_tools_call(id, request.params)),
            method => Some(Response::failure(
                Some(id),
                METHOD_NOT_FOUND,
                format!("method '{method}' not found"),
            )),
        }
    }

    fn handle_initialize(&self, id: RequestId) -> Response {
        let result = InitializeResult {
            protocol_version: String::from(MCP_PROTOCOL_VERSION),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: Some(false) }),
            },
            server_info: ServerInfo {
                name: String::from(consts::SERVER_NAME),
                version: String::from(env!("CARGO_PKG_VERSION")),
            },
        };
        result_response(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> Response {
        let result = ListToolsResult {
            tools: vec![Tool {
                name: String::from(GET_COLOR_INFO),
                description: String::from(
                    "Retrieves information about a color given its hex code.",
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "hexCode": {
                            "type": "string",
                            "description": "The hex code of the color (e.g., #FF0000)."
                        }
                    },
                    "required": ["hexCode"]
                }),
            }],
        };
        result_response(id, &result)
    }

    fn handle_tools_call(&self, id: RequestId, params: Option<serde_json::Value>) -> Response {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(err)) => {
                return Response::failure(
                    Some(id),
                    INVALID_PARAMS,
                    format!("malformed tools/call params: {err}"),
                );
            }
            None => {
                return Response::failure(
                    Some(id),
                    INVALID_PARAMS,
                    String::from("missing tools/call params"),
                );
            }
        };

        match params.name.as_str() {
            GET_COLOR_INFO => {
                let result = self.get_color_info(&params.arguments);
                result_response(id, &result)
            }
            name => {
                Response::failure(Some(id), INVALID_PARAMS, format!("unknown tool '{name}'"))
            }
        }
    }

    /// The tool itself: hex in, nearest named color out. Bad
    /// input is a tool-level error result rather than a protocol
    /// error so the calling model gets to read the message.
    fn get_color_info(&self, arguments: &serde_json::Value) -> CallToolResult {
        let hex = match arguments.get("hexCode").and_then(|v| v.as_str()) {
            Some(hex) => hex,
            None => {
                return CallToolResult::error(String::from(
                    "missing required argument 'hexCode'",
                ));
            }
        };

        let rgb = match color::parse_hex(hex) {
            Ok(rgb) => rgb,
            Err(err) => return CallToolResult::error(err.to_string()),
        };
        let name = match palette::nearest_color(rgb, &self.palette) {
            Ok(name) => name,
            Err(err) => return CallToolResult::error(err.to_string()),
        };

        let info =
            ColorInfo { hex: String::from(hex), name: String::from(name), rgb: rgb.to_string() };
        match serde_json::to_string(&info) {
            Ok(text) => CallToolResult::text(text),
            Err(err) => CallToolResult::error(format!("encoding result: {err}")),
        }
    }
}

fn result_response<T: serde::Serialize>(id: RequestId, result: &T) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Response::success(Some(id), value),
        Err(err) => Response::failure(
            Some(id),
            INTERNAL_ERROR,
            format!("encoding response: {err}"),
        ),
    }
}

fn serialize_response(resp: Response) -> Option<String> {
    match serde_json::to_string(&resp) {
        Ok(raw) => Some(raw),
        Err(err) => {
            warn!("dropping unserializable response: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_server() -> Arc<Server> {
        Server::new(Palette::builtin().clone())
    }

    fn dispatch(raw: &str) -> serde_json::Value {
        let resp = test_server().handle_frame(raw).expect("a response frame");
        serde_json::from_str(&resp).expect("response to be valid json")
    }

    #[test]
    fn initialize_handshake() {
        let resp = dispatch(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#);
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(resp["result"]["serverInfo"]["name"], "swatch");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn initialized_notification_is_silent() {
        let server = test_server();
        let resp =
            server.handle_frame(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(resp.is_none());
    }

    #[test]
    fn ping() {
        let resp = dispatch(r#"{"jsonrpc":"2.0","id":"p1","method":"ping"}"#);
        assert_eq!(resp["id"], "p1");
        assert_eq!(resp["result"], serde_json::json!({}));
    }

    #[test]
    fn tools_list() {
        let resp = dispatch(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#);
        let tools = resp["result"]["tools"].as_array().expect("a tools array");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "get_color_info");
        assert_eq!(tools[0]["inputSchema"]["required"][0], "hexCode");
    }

    #[test]
    fn tools_call_round_trip() {
        let resp = dispatch(
            r##"{"jsonrpc":"2.0","id":3,"method":"tools/call",
               "params":{"name":"get_color_info","arguments":{"hexCode":"#FF0000"}}}"##,
        );
        assert_eq!(resp["result"]["isError"], false);
        let text = resp["result"]["content"][0]["text"].as_str().expect("text content");
        let info: serde_json::Value = serde_json::from_str(text).expect("payload to be json");
        assert_eq!(info["hex"], "#FF0000");
        assert_eq!(info["name"], "red");
        assert_eq!(info["rgb"], "rgb(255, 0, 0)");
    }

    #[test]
    fn tools_call_bad_hex_is_tool_error() {
        let resp = dispatch(
            r##"{"jsonrpc":"2.0","id":4,"method":"tools/call",
               "params":{"name":"get_color_info","arguments":{"hexCode":"#ZZZZZZ"}}}"##,
        );
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().expect("text content");
        assert!(text.contains("invalid hex code"), "unexpected text: {text}");
    }

    #[test]
    fn tools_call_missing_argument_is_tool_error() {
        let resp = dispatch(
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call",
               "params":{"name":"get_color_info","arguments":{}}}"#,
        );
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().expect("text content");
        assert!(text.contains("hexCode"), "unexpected text: {text}");
    }

    #[test]
    fn tools_call_unknown_tool() {
        let resp = dispatch(
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call",
               "params":{"name":"paint_the_house","arguments":{}}}"#,
        );
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn unknown_method() {
        let resp = dispatch(r#"{"jsonrpc":"2.0","id":7,"method":"sessions/attach"}"#);
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn garbage_frame_is_parse_error() {
        let resp = dispatch("{this is not json");
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert!(resp["id"].is_null());
    }

    #[test]
    fn wrong_jsonrpc_version() {
        let resp = dispatch(r#"{"jsonrpc":"1.0","id":8,"method":"ping"}"#);
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
    }
}
