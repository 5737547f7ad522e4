//! Document loading, parsing, and `$ref` dereferencing.
//!
//! Real-world `OpenAPI` specs frequently rely on references split across files (or URLs).
//! The loader supports:
//! - Local refs (`#/...`)
//! - File refs (`./common.yaml#/...`, `/abs/path/spec.yaml#/...`, `file:///...#/...`)
//! - URL refs (`https://example.com/common.yaml#/...`)
//!
//! Key detail: `$ref` resolution is **relative to the document that contains the `$ref`**,
//! so every resolution step carries the current document id (`DocId`).
//!
//! Dereferencing runs in two phases: first the closure of referenced documents is fetched
//! into a cache, then the tree is expanded synchronously against that cache. Cyclic refs
//! are left in place as literal `$ref` nodes so the output stays finite.

use crate::error::{RegistryError, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Identity of one document participating in resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocId {
    Url(Url),
    File(PathBuf),
}

impl DocId {
    /// Parse a spec location into a document identifier (URL or file path).
    ///
    /// # Errors
    ///
    /// Returns an error if the location is an invalid URL or invalid file URL.
    pub fn parse(location: &str) -> Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|e| {
                RegistryError::OpenApi(format!("Invalid spec URL '{location}': {e}"))
            })?;
            Ok(DocId::Url(strip_fragment(url)))
        } else if location.starts_with("file://") {
            let url = Url::parse(location).map_err(|e| {
                RegistryError::OpenApi(format!("Invalid spec file URL '{location}': {e}"))
            })?;
            let path = url.to_file_path().map_err(|()| {
                RegistryError::OpenApi(format!(
                    "Invalid file URL (cannot convert to path): {location}",
                ))
            })?;
            Ok(DocId::File(canonicalize_best_effort(path)))
        } else {
            Ok(DocId::File(canonicalize_best_effort(PathBuf::from(
                location,
            ))))
        }
    }

    /// Resolve the document part of a `$ref` against this document.
    fn join(&self, doc_part: &str) -> Result<DocId> {
        if doc_part.is_empty() {
            return Ok(self.clone());
        }

        if doc_part.starts_with("http://") || doc_part.starts_with("https://") {
            let url = Url::parse(doc_part)
                .map_err(|e| RegistryError::Reference(format!("Bad $ref URL '{doc_part}': {e}")))?;
            return Ok(DocId::Url(strip_fragment(url)));
        }

        if doc_part.starts_with("file://") {
            let url = Url::parse(doc_part).map_err(|e| {
                RegistryError::Reference(format!("Bad $ref file URL '{doc_part}': {e}"))
            })?;
            let path = url.to_file_path().map_err(|()| {
                RegistryError::Reference(format!("Bad $ref file URL (not a path): {doc_part}"))
            })?;
            return Ok(DocId::File(canonicalize_best_effort(path)));
        }

        match self {
            DocId::Url(base) => {
                let joined = base.join(doc_part).map_err(|e| {
                    RegistryError::Reference(format!(
                        "Failed to resolve relative $ref '{doc_part}' against base {base}: {e}",
                    ))
                })?;
                Ok(DocId::Url(strip_fragment(joined)))
            }
            DocId::File(base) => {
                // Absolute paths stay absolute.
                let resolved = if Path::new(doc_part).is_absolute() {
                    PathBuf::from(doc_part)
                } else {
                    base.parent()
                        .unwrap_or_else(|| Path::new("."))
                        .join(doc_part)
                };
                Ok(DocId::File(canonicalize_best_effort(resolved)))
            }
        }
    }

    fn display(&self) -> String {
        match self {
            DocId::Url(u) => u.to_string(),
            DocId::File(p) => p.display().to_string(),
        }
    }
}

fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

fn canonicalize_best_effort(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

/// Document-version variants, detected at the load boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecVersion {
    #[serde(rename = "swagger-2.0")]
    Swagger2,
    #[serde(rename = "openapi-3.0")]
    OpenApi30,
    #[serde(rename = "openapi-3.1")]
    OpenApi31,
}

impl SpecVersion {
    /// Detect the version from the document's `openapi`/`swagger` field.
    #[must_use]
    pub fn detect(document: &Value) -> Option<Self> {
        if let Some(v) = document.get("openapi").and_then(Value::as_str) {
            if v.starts_with("3.1") {
                return Some(SpecVersion::OpenApi31);
            }
            if v.starts_with("3.") {
                return Some(SpecVersion::OpenApi30);
            }
            return None;
        }
        if let Some(v) = document.get("swagger").and_then(Value::as_str)
            && v.starts_with('2')
        {
            return Some(SpecVersion::Swagger2);
        }
        None
    }

    /// The raw version string declared by the document, if any.
    #[must_use]
    pub fn declared(document: &Value) -> Option<&str> {
        document
            .get("openapi")
            .or_else(|| document.get("swagger"))
            .and_then(Value::as_str)
    }
}

/// A document as produced by [`SpecLoader::load`]: the parsed form before and after
/// reference resolution, plus the detected version.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub raw: Value,
    pub dereferenced: Value,
    pub version: SpecVersion,
}

/// Result of an independent [`SpecLoader::validate`] pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub version: SpecVersion,
    pub declared_version: String,
    pub info: Value,
    pub path_count: usize,
}

/// Fetches, parses, and dereferences `OpenAPI`/Swagger documents.
#[derive(Debug, Clone)]
pub struct SpecLoader {
    client: Client,
}

impl SpecLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Load a document from a URL or filesystem path: parse the raw form, detect the
    /// version, and produce a fully dereferenced tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the document (or any referenced document) cannot be fetched
    /// or parsed, if a `$ref` points nowhere, or if no version field is recognized.
    pub async fn load(&self, location: &str) -> Result<LoadedDocument> {
        let root = DocId::parse(location)?;
        let text = self.fetch_text(&root).await?;
        let raw = parse_document(&text, location)?;
        let version = SpecVersion::detect(&raw).ok_or_else(|| {
            RegistryError::OpenApi(format!(
                "'{location}' does not declare a supported 'openapi' or 'swagger' version",
            ))
        })?;
        let dereferenced = self.dereference(&root, &raw).await?;
        Ok(LoadedDocument {
            raw,
            dereferenced,
            version,
        })
    }

    /// Check a document without loading it into any registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched/parsed, declares no supported
    /// version, or has no object-valued `paths`.
    pub async fn validate(&self, location: &str) -> Result<ValidationReport> {
        let root = DocId::parse(location)?;
        let text = self.fetch_text(&root).await?;
        let document = parse_document(&text, location)?;

        let version = SpecVersion::detect(&document).ok_or_else(|| {
            RegistryError::OpenApi(format!(
                "'{location}' does not declare a supported 'openapi' or 'swagger' version",
            ))
        })?;
        let Some(paths) = document.get("paths").and_then(Value::as_object) else {
            return Err(RegistryError::OpenApi(format!(
                "'{location}' has no object-valued 'paths'",
            )));
        };

        Ok(ValidationReport {
            valid: true,
            version,
            declared_version: SpecVersion::declared(&document).unwrap_or_default().to_string(),
            info: document.get("info").cloned().unwrap_or(Value::Null),
            path_count: paths.len(),
        })
    }

    async fn fetch_text(&self, doc: &DocId) -> Result<String> {
        match doc {
            DocId::File(path) => std::fs::read_to_string(path).map_err(|e| {
                RegistryError::SpecReadFile {
                    path: path.display().to_string(),
                    source: e,
                }
            }),
            DocId::Url(url) => {
                tracing::debug!("Fetching document from {url}");
                let resp = self.client.get(url.clone()).send().await.map_err(|e| {
                    RegistryError::SpecFetch {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                })?;
                resp.text().await.map_err(|e| RegistryError::SpecReadBody {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Produce a self-contained tree with every reachable `$ref` expanded.
    async fn dereference(&self, root: &DocId, raw: &Value) -> Result<Value> {
        let mut docs: HashMap<DocId, Arc<Value>> = HashMap::new();
        docs.insert(root.clone(), Arc::new(raw.clone()));

        // Phase 1: fetch the closure of referenced documents.
        let mut pending: Vec<DocId> = vec![root.clone()];
        while let Some(doc_id) = pending.pop() {
            let doc = Arc::clone(&docs[&doc_id]);
            let mut targets = Vec::new();
            collect_ref_targets(&doc_id, &doc, &mut targets);

            for target in targets {
                if docs.contains_key(&target) {
                    continue;
                }
                let text = self.fetch_text(&target).await?;
                let parsed = parse_document(&text, &target.display())?;
                docs.insert(target.clone(), Arc::new(parsed));
                pending.push(target);
            }
        }

        // Phase 2: pure expansion against the closed document set.
        let mut active = Vec::new();
        expand(root, raw, &docs, &mut active)
    }
}

impl Default for SpecLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a document body. JSON is a valid subset of YAML, so one parser covers both.
fn parse_document(text: &str, location: &str) -> Result<Value> {
    serde_yaml::from_str(text).map_err(|e| RegistryError::SpecParse {
        location: location.to_string(),
        source: e,
    })
}

/// Split a `$ref` into its target document and optional JSON pointer.
fn split_ref(current_doc: &DocId, reference: &str) -> Result<(DocId, Option<String>)> {
    let (doc_part, frag_part) = match reference.split_once('#') {
        Some((d, f)) => (d, Some(f)),
        None => (reference, None),
    };

    let target_doc = current_doc.join(doc_part)?;

    let pointer = match frag_part {
        Some("") | None => None,
        Some(frag) if frag.starts_with('/') => Some(frag.to_string()),
        Some(_) => {
            return Err(RegistryError::Reference(format!(
                "Unsupported $ref fragment (expected JSON pointer starting with '/'): {reference}",
            )));
        }
    };

    Ok((target_doc, pointer))
}

fn canonical_ref_key(current_doc: &DocId, reference: &str) -> Result<String> {
    let (target_doc, pointer) = split_ref(current_doc, reference)?;
    let mut key = match &target_doc {
        DocId::Url(u) => format!("url:{u}"),
        DocId::File(p) => format!("file:{}", p.display()),
    };
    if let Some(ptr) = pointer {
        key.push('#');
        key.push_str(&ptr);
    }
    Ok(key)
}

/// The `$ref` string of a reference node, if `value` is one.
fn ref_target(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}

/// Collect the document ids referenced (directly) from `value`.
fn collect_ref_targets(doc_id: &DocId, value: &Value, out: &mut Vec<DocId>) {
    match value {
        Value::Object(map) => {
            if let Some(reference) = ref_target(value)
                && let Ok((target, _)) = split_ref(doc_id, reference)
            {
                out.push(target);
            }
            for v in map.values() {
                collect_ref_targets(doc_id, v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_ref_targets(doc_id, v, out);
            }
        }
        _ => {}
    }
}

/// Expand every `$ref` in `value`, tracking the active resolution chain so cycles are
/// left in place rather than looping.
fn expand(
    doc_id: &DocId,
    value: &Value,
    docs: &HashMap<DocId, Arc<Value>>,
    active: &mut Vec<String>,
) -> Result<Value> {
    if let Some(reference) = ref_target(value) {
        let key = canonical_ref_key(doc_id, reference)?;
        if active.contains(&key) {
            // Cycle: keep the $ref node literal so the output stays finite.
            return Ok(value.clone());
        }

        let (target_doc, pointer) = split_ref(doc_id, reference)?;
        let target = docs.get(&target_doc).ok_or_else(|| {
            RegistryError::Reference(format!(
                "Unresolved $ref '{}' (document {} was not loaded)",
                reference,
                target_doc.display(),
            ))
        })?;

        let selected = match &pointer {
            Some(ptr) => target.pointer(ptr).ok_or_else(|| {
                RegistryError::Reference(format!(
                    "Unresolved $ref '{}' (doc {}, missing pointer '{}')",
                    reference,
                    target_doc.display(),
                    ptr,
                ))
            })?,
            None => target.as_ref(),
        }
        .clone();

        active.push(key);
        let expanded = expand(&target_doc, &selected, docs, active);
        active.pop();
        return expanded;
    }

    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), expand(doc_id, v, docs, active)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|v| expand(doc_id, v, docs, active))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_detect_version() {
        assert_eq!(
            SpecVersion::detect(&json!({"openapi": "3.0.3"})),
            Some(SpecVersion::OpenApi30)
        );
        assert_eq!(
            SpecVersion::detect(&json!({"openapi": "3.1.0"})),
            Some(SpecVersion::OpenApi31)
        );
        assert_eq!(
            SpecVersion::detect(&json!({"swagger": "2.0"})),
            Some(SpecVersion::Swagger2)
        );
        assert_eq!(SpecVersion::detect(&json!({"openapi": "4.0.0"})), None);
        assert_eq!(SpecVersion::detect(&json!({"title": "nope"})), None);
    }

    #[tokio::test]
    async fn test_load_resolves_local_refs() {
        let dir = tempdir().unwrap();
        let root_path = dir.path().join("root.yaml");
        fs::write(
            &root_path,
            r#"
openapi: "3.0.0"
info:
  title: t
  version: "1"
components:
  schemas:
    Pet:
      type: object
      properties:
        name: { type: string }
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
"#,
        )
        .unwrap();

        let loader = SpecLoader::new();
        let doc = loader.load(&root_path.display().to_string()).await.unwrap();
        assert_eq!(doc.version, SpecVersion::OpenApi30);

        // The raw form keeps the $ref; the dereferenced form inlines it.
        assert!(
            doc.raw
                .pointer("/paths/~1pets/get/responses/200/content/application~1json/schema/$ref")
                .is_some()
        );
        assert_eq!(
            doc.dereferenced.pointer(
                "/paths/~1pets/get/responses/200/content/application~1json/schema/properties/name/type"
            ),
            Some(&json!("string"))
        );
    }

    #[tokio::test]
    async fn test_load_resolves_external_file_refs() {
        let dir = tempdir().unwrap();
        let common_path = dir.path().join("common.yaml");
        let root_path = dir.path().join("root.yaml");

        fs::write(
            &common_path,
            r"
components:
  schemas:
    Widget:
      type: object
      properties:
        size: { type: integer }
",
        )
        .unwrap();

        fs::write(
            &root_path,
            r#"
openapi: "3.0.0"
info:
  title: t
  version: "1"
paths:
  /widgets:
    post:
      operationId: createWidget
      requestBody:
        content:
          application/json:
            schema:
              $ref: "./common.yaml#/components/schemas/Widget"
      responses:
        "200":
          description: ok
"#,
        )
        .unwrap();

        let loader = SpecLoader::new();
        let doc = loader.load(&root_path.display().to_string()).await.unwrap();
        assert_eq!(
            doc.dereferenced.pointer(
                "/paths/~1widgets/post/requestBody/content/application~1json/schema/properties/size/type"
            ),
            Some(&json!("integer"))
        );
    }

    #[tokio::test]
    async fn test_cyclic_refs_are_left_in_place() {
        let dir = tempdir().unwrap();
        let root_path = dir.path().join("root.yaml");
        fs::write(
            &root_path,
            r#"
openapi: "3.0.0"
info:
  title: t
  version: "1"
components:
  schemas:
    Node:
      type: object
      properties:
        next:
          $ref: '#/components/schemas/Node'
paths:
  /nodes:
    get:
      operationId: listNodes
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Node'
"#,
        )
        .unwrap();

        let loader = SpecLoader::new();
        let doc = loader.load(&root_path.display().to_string()).await.unwrap();

        // One level is expanded; the self-reference below it stays a literal $ref node.
        let schema = doc
            .dereferenced
            .pointer("/paths/~1nodes/get/responses/200/content/application~1json/schema")
            .unwrap();
        assert_eq!(schema.pointer("/type"), Some(&json!("object")));
        assert!(schema.pointer("/properties/next/$ref").is_some());
    }

    #[tokio::test]
    async fn test_validate_reports_version_and_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spec.json");
        fs::write(
            &path,
            r#"{"swagger": "2.0", "info": {"title": "Legacy", "version": "9"}, "paths": {"/a": {}, "/b": {}}}"#,
        )
        .unwrap();

        let loader = SpecLoader::new();
        let report = loader.validate(&path.display().to_string()).await.unwrap();
        assert!(report.valid);
        assert_eq!(report.version, SpecVersion::Swagger2);
        assert_eq!(report.declared_version, "2.0");
        assert_eq!(report.path_count, 2);
        assert_eq!(report.info.pointer("/title"), Some(&json!("Legacy")));
    }

    #[tokio::test]
    async fn test_validate_rejects_missing_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spec.yaml");
        fs::write(&path, "openapi: \"3.0.0\"\ninfo: { title: t, version: \"1\" }\n").unwrap();

        let loader = SpecLoader::new();
        let err = loader
            .validate(&path.display().to_string())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("paths"));
    }
}
