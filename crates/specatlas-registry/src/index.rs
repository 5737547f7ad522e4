//! Flattening a dereferenced document into addressable operation records.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The fixed HTTP verb set, in canonical indexing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// All verbs, in the order path items are scanned.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }

    /// Parse a verb, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP operation extracted from a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedOperation {
    /// Owning spec id (back-reference, not ownership).
    pub spec_id: String,
    /// Document-declared identifier; not guaranteed present or unique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub method: HttpMethod,
    /// The raw templated path, exactly as declared (e.g. `/pets/{id}`).
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The dereferenced per-operation object; shared across clones, never mutated.
    #[serde(skip)]
    pub raw_operation: Arc<Value>,
}

/// Flatten a dereferenced document into operation records.
///
/// Paths are visited in declaration order; per path, verbs in [`HttpMethod::ALL`] order,
/// skipping absent verbs. Path-item level `parameters` are not indexed, only explicitly
/// declared per-verb objects. The result is deterministic for a given document revision.
#[must_use]
pub fn index_operations(spec_id: &str, document: &Value) -> Vec<IndexedOperation> {
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for method in HttpMethod::ALL {
            let Some(op) = item.get(method.as_str()).filter(|v| v.is_object()) else {
                continue;
            };
            out.push(IndexedOperation {
                spec_id: spec_id.to_string(),
                operation_id: str_field(op, "operationId"),
                method,
                path: path.clone(),
                tags: op.get("tags").and_then(Value::as_array).map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                }),
                summary: str_field(op, "summary"),
                description: str_field(op, "description"),
                raw_operation: Arc::new(op.clone()),
            });
        }
    }
    out
}

fn str_field(op: &Value, key: &str) -> Option<String> {
    op.get(key).and_then(Value::as_str).map(str::to_string)
}
