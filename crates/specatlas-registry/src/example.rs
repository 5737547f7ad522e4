//! Textual request examples and path templating.
//!
//! Renders a fully-resolved request (base URL, method, filled path, query, headers,
//! optional body) into a cURL command line and a JS `fetch` snippet. Presentation only;
//! nothing here issues a request.

use crate::error::{RegistryError, Result};
use crate::index::{HttpMethod, IndexedOperation};
use crate::registry::LoadedSpec;
use crate::sample::sample_from_schema;
use regex::Regex;
use serde_json::{Map, Value, json};
use url::Url;

/// A resolved request, ready to render.
#[derive(Debug, Clone)]
pub struct RequestSketch {
    pub base_url: String,
    pub method: HttpMethod,
    /// Path with placeholders already filled.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Render a cURL invocation.
///
/// # Errors
///
/// Returns an error if base URL + path do not form a valid absolute URL.
pub fn curl_example(req: &RequestSketch) -> Result<String> {
    let url = build_url(&req.base_url, &req.path, &req.query)?;
    let mut lines = vec![format!(
        "curl -X {} \"{}\"",
        req.method.as_str().to_uppercase(),
        url
    )];

    for (name, value) in &req.headers {
        lines.push(format!("  -H \"{name}: {value}\""));
    }

    if let Some(body) = present_body(req) {
        lines.push(format!("  -d '{}'", pretty(body)?));
    }

    Ok(lines.join(" \\\n"))
}

/// Render a JS `fetch` snippet.
///
/// # Errors
///
/// Returns an error if base URL + path do not form a valid absolute URL.
pub fn fetch_example(req: &RequestSketch) -> Result<String> {
    let url = build_url(&req.base_url, &req.path, &req.query)?;

    let headers: Map<String, Value> = req
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    let body_line = match present_body(req) {
        Some(body) => format!("\n  body: JSON.stringify({}),", pretty(body)?),
        None => String::new(),
    };

    Ok(format!(
        "const res = await fetch({url}, {{\n  method: {method},\n  headers: {headers},{body_line}\n}});\nconsole.log(res.status, await res.text());",
        url = js_string(url.as_str())?,
        method = js_string(&req.method.as_str().to_uppercase())?,
        headers = pretty(&Value::Object(headers))?,
    ))
}

/// Fill `{name}` placeholders in a templated path with dummy values: names ending in
/// `id`/`Id`/`ID` become `123`, everything else becomes `sample`.
#[must_use]
pub fn fill_path_params(path: &str) -> String {
    let re = Regex::new(r"\{([^}]+)\}").unwrap();
    re.replace_all(path, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        if name.ends_with("id") || name.ends_with("Id") || name.ends_with("ID") {
            "123"
        } else {
            "sample"
        }
    })
    .into_owned()
}

/// Assemble a representative request for an indexed operation.
///
/// Query values come from each parameter's `example`/`default` (else `"sample"`);
/// header and cookie parameters are omitted; the path is filled via
/// [`fill_path_params`]. A request body takes the first declared media type as
/// `Content-Type` and derives its payload from the media `example`, the first of its
/// `examples`, or a schema sample. Every sketch carries `Accept: application/json`.
///
/// # Errors
///
/// Returns an error if no absolute base URL can be resolved for the spec.
pub fn sketch_operation(
    spec: &LoadedSpec,
    op: &IndexedOperation,
    server_index: usize,
) -> Result<RequestSketch> {
    let base_url = spec.base_url(server_index)?;
    let path = fill_path_params(&op.path);

    let mut query = Vec::new();
    if let Some(params) = op.raw_operation.get("parameters").and_then(Value::as_array) {
        for param in params {
            if param.get("in").and_then(Value::as_str) != Some("query") {
                continue;
            }
            let Some(name) = param.get("name").and_then(Value::as_str) else {
                continue;
            };
            let value = param
                .get("example")
                .or_else(|| param.get("default"))
                .cloned()
                .unwrap_or_else(|| json!("sample"));
            query.push((name.to_string(), value_to_string(&value)));
        }
    }

    let mut headers = Vec::new();
    let mut body = None;
    if let Some(content) = op
        .raw_operation
        .pointer("/requestBody/content")
        .and_then(Value::as_object)
        && let Some((content_type, media)) = content.iter().next()
    {
        headers.push(("Content-Type".to_string(), content_type.clone()));
        body = if let Some(example) = media.get("example") {
            Some(example.clone())
        } else if let Some(examples) = media.get("examples").and_then(Value::as_object) {
            examples
                .values()
                .next()
                .map(|e| e.get("value").cloned().unwrap_or(Value::Null))
        } else {
            media.get("schema").map(sample_from_schema)
        };
    }
    headers.push(("Accept".to_string(), "application/json".to_string()));

    Ok(RequestSketch {
        base_url,
        method: op.method,
        path,
        query,
        headers,
        body,
    })
}

fn present_body(req: &RequestSketch) -> Option<&Value> {
    req.body.as_ref().filter(|b| !b.is_null())
}

fn pretty(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// A JSON string literal doubles as a JS string literal.
fn js_string(s: &str) -> Result<String> {
    Ok(serde_json::to_string(s)?)
}

fn build_url(base_url: &str, path: &str, query: &[(String, String)]) -> Result<Url> {
    let joined = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url = Url::parse(&joined)
        .map_err(|e| RegistryError::OpenApi(format!("Invalid request URL '{joined}': {e}")))?;

    if !query.is_empty() {
        let mut qs = String::new();
        for (i, (key, value)) in query.iter().enumerate() {
            if i > 0 {
                qs.push('&');
            }
            qs.push_str(&encode_query_component(key));
            qs.push('=');
            qs.push_str(&encode_query_component(value));
        }
        url.set_query(Some(&qs));
    }

    Ok(url)
}

fn encode_query_component(s: &str) -> String {
    // Percent-encode everything except unreserved: ALPHA / DIGIT / "-" / "." / "_" / "~".
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
