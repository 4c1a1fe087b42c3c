//! MCP method routing

use minecraft_mcp_core::{McpError, Result, error_codes};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::catalog::Catalog;
use crate::dispatch::Dispatcher;
use crate::mcp::{
    InitializeParams, InitializeResult, ListChanged, PROTOCOL_VERSION, Request,
    ResourcesCapability, Response, ServerCapabilities, ServerInfo,
};

/// Minecraft MCP server: tools behind dispatch, plus the static catalog
pub struct McpServer {
    info: ServerInfo,
    dispatcher: Dispatcher,
    catalog: Catalog,
}

impl McpServer {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        dispatcher: Dispatcher,
        catalog: Catalog,
    ) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            dispatcher,
            catalog,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Answer one request; notifications yield `None`
    pub async fn handle_request(&self, request: Request) -> Option<Response> {
        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id.clone();
        let result = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.dispatcher.tools() })),
            "tools/call" => self.call_tool(request.params).await,
            "resources/list" => Ok(json!({ "resources": self.catalog.resources() })),
            "resources/templates/list" => {
                Ok(json!({ "resourceTemplates": self.catalog.resource_templates() }))
            }
            "resources/read" => self.read_resource(request.params),
            "prompts/list" => Ok(json!({ "prompts": self.catalog.prompts() })),
            "prompts/get" => self.get_prompt(request.params),
            _ => {
                return Some(Response::error(
                    id,
                    error_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                ));
            }
        };

        Some(match result {
            Ok(value) => Response::success(id, value),
            Err(e) => Response::error(id, rpc_code(&e), e.to_string()),
        })
    }

    fn initialize(&self, params: Value) -> Result<Value> {
        let params: InitializeParams = parse_params(params)?;
        debug!(
            "Client {} {} (protocol {})",
            params.client_info.name, params.client_info.version, params.protocol_version
        );

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ListChanged {
                    list_changed: false,
                },
                resources: ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                },
                prompts: ListChanged {
                    list_changed: false,
                },
            },
            server_info: self.info.clone(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn call_tool(&self, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct ToolCallParams {
            name: String,
            #[serde(default)]
            arguments: Value,
        }

        let params: ToolCallParams = parse_params(params)?;
        let response = self.dispatcher.call(&params.name, params.arguments).await?;
        Ok(serde_json::to_value(response)?)
    }

    fn read_resource(&self, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct ReadParams {
            uri: String,
        }

        let params: ReadParams = parse_params(params)?;
        let contents = self
            .catalog
            .read(&params.uri)
            .ok_or_else(|| McpError::InvalidParams(format!("Unknown resource: {}", params.uri)))?;
        Ok(json!({ "contents": [contents] }))
    }

    fn get_prompt(&self, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct GetParams {
            name: String,
        }

        let params: GetParams = parse_params(params)?;
        let prompt = self
            .catalog
            .prompt(&params.name)
            .ok_or_else(|| McpError::InvalidParams(format!("Unknown prompt: {}", params.name)))?;
        Ok(serde_json::to_value(prompt)?)
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn rpc_code(err: &McpError) -> i32 {
    match err {
        McpError::InvalidParams(_) | McpError::Protocol(_) => error_codes::INVALID_PARAMS,
        _ => error_codes::INTERNAL_ERROR,
    }
}
