//! The MCP tool surface over a shared [`SpecRegistry`].

use crate::{prompts, resources};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, GetPromptRequestParam, GetPromptResult, Implementation,
    ListPromptsResult, ListResourcesResult, PaginatedRequestParam, ProtocolVersion,
    ReadResourceRequestParam, ReadResourceResult, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use serde_json::{Value, json};
use specatlas_registry::example::{curl_example, fetch_example, sketch_operation};
use specatlas_registry::registry::{
    LoadedSpec, OperationFilter, OperationQuery, SpecRegistry,
};
use std::sync::Arc;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddSpecRequest {
    /// Identifier the spec will be registered under.
    pub id: String,
    /// URL or filesystem path of the document.
    pub location: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SpecIdRequest {
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ValidateSpecRequest {
    /// URL or filesystem path of the document to check.
    pub location: String,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ListOperationsRequest {
    /// Restrict to one registered spec.
    pub spec_id: Option<String>,
    /// Exact tag match.
    pub tag: Option<String>,
    /// HTTP method, case-insensitive.
    pub method: Option<String>,
    /// Regular expression matched against the templated path.
    pub path_pattern: Option<String>,
    /// Case-insensitive substring over summary, description, operationId, and path.
    pub text: Option<String>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct GetOperationRequest {
    /// Restrict to one registered spec.
    pub spec_id: Option<String>,
    /// Resolve by operationId (must match exactly one operation).
    pub operation_id: Option<String>,
    /// HTTP method, case-insensitive; used together with `path`.
    pub method: Option<String>,
    /// Exact templated path, e.g. `/pets/{petId}`.
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct GenerateExampleRequest {
    pub spec_id: Option<String>,
    pub operation_id: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    /// Which declared server to target (defaults to the first).
    pub server_index: Option<usize>,
}

/// SpecAtlas MCP service: registry management tools plus `openapi://` resources and
/// prompt templates.
#[derive(Clone)]
pub struct AtlasService {
    registry: Arc<SpecRegistry>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl AtlasService {
    #[must_use]
    pub fn new(registry: Arc<SpecRegistry>) -> Self {
        Self {
            registry,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Register an OpenAPI/Swagger document (URL or file path) under an id. \
                          Re-adding an existing id replaces it.")]
    async fn add_spec(
        &self,
        Parameters(req): Parameters<AddSpecRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.registry.add(&req.id, &req.location).await {
            Ok(spec) => json_result(&spec_summary(&spec)),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to load spec '{}' from '{}': {e}",
                req.id, req.location,
            ))])),
        }
    }

    #[tool(description = "Remove a registered spec")]
    async fn remove_spec(
        &self,
        Parameters(req): Parameters<SpecIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let message = if self.registry.remove(&req.id) {
            format!("Removed spec '{}'", req.id)
        } else {
            format!("No spec registered under '{}'", req.id)
        };
        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    #[tool(description = "Re-fetch a registered spec from its original location")]
    async fn reload_spec(
        &self,
        Parameters(req): Parameters<SpecIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.registry.reload(&req.id).await {
            Ok(spec) => json_result(&spec_summary(&spec)),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to reload spec '{}': {e}",
                req.id,
            ))])),
        }
    }

    #[tool(description = "Check whether a document is a loadable OpenAPI/Swagger spec, \
                          without registering it")]
    async fn validate_spec(
        &self,
        Parameters(req): Parameters<ValidateSpecRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.registry.validate(&req.location).await {
            Ok(report) => json_result(&report),
            Err(e) => {
                let payload = json!({ "valid": false, "error": e.to_string() });
                let text = to_pretty(&payload)?;
                Ok(CallToolResult::error(vec![Content::text(text)]))
            }
        }
    }

    #[tool(description = "List all registered specs with their metadata")]
    async fn list_specs(&self) -> Result<CallToolResult, McpError> {
        let specs: Vec<Value> = self.registry.list().iter().map(|s| spec_summary(s)).collect();
        json_result(&json!({ "count": specs.len(), "specs": specs }))
    }

    #[tool(description = "Search operations across registered specs. All filters are \
                          combined with AND.")]
    async fn list_operations(
        &self,
        Parameters(req): Parameters<ListOperationsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let operations = self.registry.search_operations(&OperationFilter {
            spec_id: req.spec_id,
            tag: req.tag,
            method: req.method,
            path_pattern: req.path_pattern,
            text: req.text,
            limit: req.limit,
        });
        json_result(&json!({ "count": operations.len(), "operations": operations }))
    }

    #[tool(description = "Resolve one operation by operationId, or by method + path, and \
                          return its full definition")]
    async fn get_operation(
        &self,
        Parameters(req): Parameters<GetOperationRequest>,
    ) -> Result<CallToolResult, McpError> {
        let query = OperationQuery {
            spec_id: req.spec_id,
            operation_id: req.operation_id,
            method: req.method,
            path: req.path,
        };
        match self.registry.find_operation(&query) {
            Some(op) => json_result(&json!({
                "specId": op.spec_id,
                "operationId": op.operation_id,
                "method": op.method,
                "path": op.path,
                "tags": op.tags,
                "summary": op.summary,
                "description": op.description,
                "definition": op.raw_operation.as_ref(),
            })),
            None => Ok(CallToolResult::success(vec![Content::text(
                "No operation matched. An ambiguous operationId also resolves to nothing; \
                 narrow with spec_id or query by method + path.",
            )])),
        }
    }

    #[tool(description = "Generate a ready-to-run request example (cURL and JS fetch) for \
                          one operation")]
    async fn generate_request_example(
        &self,
        Parameters(req): Parameters<GenerateExampleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let query = OperationQuery {
            spec_id: req.spec_id,
            operation_id: req.operation_id,
            method: req.method,
            path: req.path,
        };
        let Some(op) = self.registry.find_operation(&query) else {
            return Ok(CallToolResult::success(vec![Content::text(
                "No operation matched; nothing to generate.",
            )]));
        };
        let Some(spec) = self.registry.get(&op.spec_id) else {
            return Ok(CallToolResult::success(vec![Content::text(
                "The operation's spec is no longer registered.",
            )]));
        };

        let rendered = sketch_operation(&spec, &op, req.server_index.unwrap_or(0))
            .and_then(|sketch| {
                let curl = curl_example(&sketch)?;
                let fetch = fetch_example(&sketch)?;
                Ok(format!(
                    "## {} {}\n\n### cURL\n```bash\n{curl}\n```\n\n### fetch\n```js\n{fetch}\n```",
                    op.method.as_str().to_uppercase(),
                    sketch.path,
                ))
            });
        match rendered {
            Ok(markdown) => Ok(CallToolResult::success(vec![Content::text(markdown)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Cannot build an example for this operation: {e}",
            ))])),
        }
    }
}

#[tool_handler]
impl ServerHandler for AtlasService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "SpecAtlas indexes OpenAPI/Swagger documents. Register specs with add_spec, \
                 discover operations with list_operations, inspect one with get_operation, \
                 and produce runnable examples with generate_request_example."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: resources::list(&self.registry),
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        resources::read(&self.registry, &request.uri)
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            prompts: prompts::definitions(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        prompts::render(&request.name, request.arguments)
    }
}

fn spec_summary(spec: &LoadedSpec) -> Value {
    json!({
        "id": spec.id,
        "title": spec.title(),
        "version": spec.api_version(),
        "specVersion": spec.version,
        "sourceLocation": spec.source_location,
        "loadedAt": spec.loaded_at.to_rfc3339(),
        "operationCount": spec.operations.len(),
    })
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(to_pretty(
        value,
    )?)]))
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {e}"), None))
}
