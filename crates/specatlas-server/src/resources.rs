//! `openapi://` resources over the registry.
//!
//! Three addressable forms per registered spec:
//! - `openapi://{specId}/spec`: the dereferenced document
//! - `openapi://{specId}/operations`: a light operation listing
//! - `openapi://{specId}/operations/{opKey}`: one operation, where `opKey` is an
//!   operationId or `method:path` (split on the first colon, so templated paths with
//!   further colons survive)

use rmcp::ErrorData as McpError;
use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use serde_json::json;
use specatlas_registry::index::{HttpMethod, IndexedOperation};
use specatlas_registry::registry::{LoadedSpec, SpecRegistry};

const SCHEME: &str = "openapi://";

pub fn list(registry: &SpecRegistry) -> Vec<Resource> {
    let mut out = Vec::new();
    for spec in registry.list() {
        let title = spec.title().unwrap_or(&spec.id).to_string();
        out.push(resource(
            format!("{SCHEME}{}/spec", spec.id),
            format!("{title} (full spec)"),
            "The dereferenced OpenAPI document".to_string(),
        ));
        out.push(resource(
            format!("{SCHEME}{}/operations", spec.id),
            format!("{title} (operations)"),
            "All indexed operations of the spec".to_string(),
        ));
    }
    out
}

pub fn read(registry: &SpecRegistry, uri: &str) -> Result<ReadResourceResult, McpError> {
    let Some(rest) = uri.strip_prefix(SCHEME) else {
        return Err(McpError::invalid_params(
            format!("Unsupported resource URI (expected {SCHEME}...): {uri}"),
            None,
        ));
    };
    let Some((spec_id, selector)) = rest.split_once('/') else {
        return Err(McpError::invalid_params(
            format!("Resource URI is missing a selector after the spec id: {uri}"),
            None,
        ));
    };

    let spec = registry
        .get(spec_id)
        .ok_or_else(|| McpError::resource_not_found(format!("Unknown spec '{spec_id}'"), None))?;

    let payload = match selector {
        "spec" => serde_json::to_string_pretty(spec.dereferenced.as_ref()),
        "operations" => serde_json::to_string_pretty(&operation_listing(&spec)),
        _ => {
            let Some(op_key) = selector.strip_prefix("operations/") else {
                return Err(McpError::invalid_params(
                    format!("Unsupported resource selector '{selector}' in {uri}"),
                    None,
                ));
            };
            let op = find_by_key(&spec, op_key).ok_or_else(|| {
                McpError::resource_not_found(
                    format!("No operation '{op_key}' in spec '{spec_id}'"),
                    None,
                )
            })?;
            serde_json::to_string_pretty(&operation_detail(op))
        }
    }
    .map_err(|e| McpError::internal_error(format!("Failed to serialize resource: {e}"), None))?;

    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(payload, uri)],
    })
}

/// Match an operation by id, or by `method:path` when the key carries a colon.
fn find_by_key<'a>(spec: &'a LoadedSpec, op_key: &str) -> Option<&'a IndexedOperation> {
    if let Some((method, path)) = op_key.split_once(':')
        && let Some(method) = HttpMethod::parse(method)
    {
        return spec
            .operations
            .iter()
            .find(|o| o.method == method && o.path == path);
    }
    spec.operations
        .iter()
        .find(|o| o.operation_id.as_deref() == Some(op_key))
}

fn operation_listing(spec: &LoadedSpec) -> serde_json::Value {
    json!({
        "specId": spec.id,
        "operations": spec
            .operations
            .iter()
            .map(|o| {
                json!({
                    "operationId": o.operation_id,
                    "method": o.method,
                    "path": o.path,
                    "summary": o.summary,
                })
            })
            .collect::<Vec<_>>(),
    })
}

fn operation_detail(op: &IndexedOperation) -> serde_json::Value {
    json!({
        "specId": op.spec_id,
        "operationId": op.operation_id,
        "method": op.method,
        "path": op.path,
        "tags": op.tags,
        "summary": op.summary,
        "description": op.description,
        "definition": op.raw_operation.as_ref(),
    })
}

fn resource(uri: String, name: String, description: String) -> Resource {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description);
    raw.mime_type = Some("application/json".to_string());
    raw.no_annotation()
}
