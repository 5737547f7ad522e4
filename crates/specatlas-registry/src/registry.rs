//! The in-memory spec registry: load, index, look up, and search.

use crate::error::{RegistryError, Result};
use crate::index::{HttpMethod, IndexedOperation, index_operations};
use crate::loader::{SpecLoader, SpecVersion, ValidationReport};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// One registered spec: the loaded document plus its flattened operation index.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub id: String,
    /// The location the document was loaded from, verbatim.
    pub source_location: String,
    pub version: SpecVersion,
    pub raw: Arc<Value>,
    pub dereferenced: Arc<Value>,
    pub loaded_at: DateTime<Utc>,
    pub operations: Vec<IndexedOperation>,
}

impl LoadedSpec {
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.raw.pointer("/info/title").and_then(Value::as_str)
    }

    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.raw.pointer("/info/version").and_then(Value::as_str)
    }

    /// Candidate base URLs, in document order.
    ///
    /// Swagger 2 synthesizes one from `schemes`/`host`/`basePath`; OpenAPI 3 lists
    /// `servers[].url`. A document declaring neither gets the single relative entry `/`.
    #[must_use]
    pub fn server_urls(&self) -> Vec<String> {
        let urls = match self.version {
            SpecVersion::Swagger2 => {
                let host = self.raw.get("host").and_then(Value::as_str);
                host.map(|host| {
                    let scheme = self
                        .raw
                        .get("schemes")
                        .and_then(Value::as_array)
                        .and_then(|s| s.first())
                        .and_then(Value::as_str)
                        .unwrap_or("https");
                    let base_path = self
                        .raw
                        .get("basePath")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    vec![format!("{scheme}://{host}{base_path}")]
                })
                .unwrap_or_default()
            }
            SpecVersion::OpenApi30 | SpecVersion::OpenApi31 => self
                .raw
                .get("servers")
                .and_then(Value::as_array)
                .map(|servers| {
                    servers
                        .iter()
                        .filter_map(|s| s.get("url").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };
        if urls.is_empty() {
            vec!["/".to_string()]
        } else {
            urls
        }
    }

    /// Resolve one server entry to an absolute base URL.
    ///
    /// An out-of-range index clamps to the last entry. Relative entries are resolved
    /// against the source location when that is itself a URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry is relative and the spec was loaded from a file,
    /// since no network origin exists to resolve it against.
    pub fn base_url(&self, server_index: usize) -> Result<String> {
        let urls = self.server_urls();
        let entry = &urls[server_index.min(urls.len() - 1)];

        if entry.starts_with("http://") || entry.starts_with("https://") {
            return Ok(entry.clone());
        }

        if self.source_location.starts_with("http://")
            || self.source_location.starts_with("https://")
        {
            let base = Url::parse(&self.source_location).map_err(|e| {
                RegistryError::OpenApi(format!(
                    "Invalid source URL '{}': {e}",
                    self.source_location,
                ))
            })?;
            let mut joined = base.join(entry).map_err(|e| {
                RegistryError::OpenApi(format!(
                    "Cannot resolve server URL '{entry}' against '{base}': {e}",
                ))
            })?;
            joined.set_fragment(None);
            return Ok(joined.to_string());
        }

        Err(RegistryError::OpenApi(format!(
            "Spec '{}' declares the relative server URL '{entry}' and was not loaded from a URL",
            self.id,
        )))
    }
}

/// Criteria for [`SpecRegistry::find_operation`]. Empty criteria match nothing.
#[derive(Debug, Clone, Default)]
pub struct OperationQuery {
    /// Restrict the haystack to one spec.
    pub spec_id: Option<String>,
    pub operation_id: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
}

/// Conjunctive filters for [`SpecRegistry::search_operations`].
#[derive(Debug, Clone, Default)]
pub struct OperationFilter {
    pub spec_id: Option<String>,
    pub tag: Option<String>,
    pub method: Option<String>,
    /// Regular expression matched against the templated path.
    pub path_pattern: Option<String>,
    /// Case-insensitive substring over summary, description, operationId, and path.
    pub text: Option<String>,
    pub limit: Option<usize>,
}

/// Thread-safe collection of loaded specs, listed in insertion order.
///
/// Loading happens outside the lock; only the final swap-in holds it, so readers never
/// wait on the network.
#[derive(Debug, Default)]
pub struct SpecRegistry {
    loader: SpecLoader,
    specs: RwLock<Vec<Arc<LoadedSpec>>>,
}

impl SpecRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_loader(loader: SpecLoader) -> Self {
        Self {
            loader,
            specs: RwLock::new(Vec::new()),
        }
    }

    /// Load a document and register it under `id`. Re-adding an existing id replaces it
    /// in place, keeping its position in [`SpecRegistry::list`].
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails; the previously registered spec (if any) stays
    /// untouched in that case.
    pub async fn add(&self, id: &str, location: &str) -> Result<Arc<LoadedSpec>> {
        let document = self.loader.load(location).await?;
        let operations = index_operations(id, &document.dereferenced);
        tracing::info!(
            spec_id = id,
            location,
            operations = operations.len(),
            "Registered spec"
        );

        let spec = Arc::new(LoadedSpec {
            id: id.to_string(),
            source_location: location.to_string(),
            version: document.version,
            raw: Arc::new(document.raw),
            dereferenced: Arc::new(document.dereferenced),
            loaded_at: Utc::now(),
            operations,
        });

        let mut specs = self.specs.write();
        match specs.iter_mut().find(|s| s.id == id) {
            Some(slot) => *slot = Arc::clone(&spec),
            None => specs.push(Arc::clone(&spec)),
        }
        Ok(spec)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<LoadedSpec>> {
        self.specs.read().iter().find(|s| s.id == id).cloned()
    }

    /// All registered specs, in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<LoadedSpec>> {
        self.specs.read().clone()
    }

    /// Re-fetch a registered spec from its recorded source location.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SpecNotFound`] for an unknown id, or a load error if the
    /// source has become unreadable (the stale spec stays registered then).
    pub async fn reload(&self, id: &str) -> Result<Arc<LoadedSpec>> {
        let location = self
            .get(id)
            .ok_or_else(|| RegistryError::SpecNotFound(id.to_string()))?
            .source_location
            .clone();
        self.add(id, &location).await
    }

    /// Remove a spec. Returns whether it was registered.
    pub fn remove(&self, id: &str) -> bool {
        let mut specs = self.specs.write();
        let before = specs.len();
        specs.retain(|s| s.id != id);
        specs.len() != before
    }

    /// Check a document without registering it.
    ///
    /// # Errors
    ///
    /// Propagates loader fetch/parse/structure errors.
    pub async fn validate(&self, location: &str) -> Result<ValidationReport> {
        self.loader.validate(location).await
    }

    /// Resolve a query to at most one operation.
    ///
    /// Resolution is staged: an `operation_id` that matches exactly one operation wins;
    /// an ambiguous or absent `operation_id` falls through to method + exact-path
    /// matching; no stage matching yields `None`. Never an error.
    #[must_use]
    pub fn find_operation(&self, query: &OperationQuery) -> Option<IndexedOperation> {
        let haystack = self.haystack(query.spec_id.as_deref());

        if let Some(op_id) = query.operation_id.as_deref() {
            let mut matches = haystack
                .iter()
                .filter(|o| o.operation_id.as_deref() == Some(op_id));
            if let Some(first) = matches.next()
                && matches.next().is_none()
            {
                return Some(first.clone());
            }
        }

        if let (Some(method), Some(path)) = (query.method.as_deref(), query.path.as_deref()) {
            let method = method.to_ascii_lowercase();
            return haystack
                .iter()
                .find(|o| o.method.as_str() == method && o.path == path)
                .cloned();
        }

        None
    }

    /// Filter operations. Filters are conjunctive and applied in a fixed order: tag,
    /// method, path pattern, free text, then the result cap. An invalid `path_pattern`
    /// regex yields an empty result rather than an error.
    #[must_use]
    pub fn search_operations(&self, filter: &OperationFilter) -> Vec<IndexedOperation> {
        let mut ops = self.haystack(filter.spec_id.as_deref());

        if let Some(tag) = filter.tag.as_deref() {
            ops.retain(|o| {
                o.tags
                    .as_deref()
                    .is_some_and(|tags| tags.iter().any(|t| t == tag))
            });
        }

        if let Some(method) = filter.method.as_deref() {
            ops.retain(|o| o.method.as_str().eq_ignore_ascii_case(method));
        }

        if let Some(pattern) = filter.path_pattern.as_deref() {
            match Regex::new(pattern) {
                Ok(re) => ops.retain(|o| re.is_match(&o.path)),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "Invalid path pattern, returning no matches");
                    ops.clear();
                }
            }
        }

        if let Some(text) = filter.text.as_deref() {
            let needle = text.to_lowercase();
            ops.retain(|o| {
                [
                    o.summary.as_deref(),
                    o.description.as_deref(),
                    o.operation_id.as_deref(),
                    Some(o.path.as_str()),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            });
        }

        if let Some(limit) = filter.limit {
            ops.truncate(limit);
        }
        ops
    }

    /// Candidate operations, in spec insertion order then index order.
    fn haystack(&self, spec_id: Option<&str>) -> Vec<IndexedOperation> {
        self.specs
            .read()
            .iter()
            .filter(|s| spec_id.is_none_or(|id| s.id == id))
            .flat_map(|s| s.operations.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn write_spec(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    const PETS: &str = r#"
openapi: "3.0.0"
info: { title: Pets, version: "1.0" }
servers:
  - url: https://pets.example.com/v1
paths:
  /pets:
    get:
      operationId: listPets
      tags: [pets]
      summary: List pets
    post:
      operationId: createPet
      tags: [pets, write]
  /pets/{petId}:
    get:
      operationId: getPet
      tags: [pets]
      description: Fetch one pet
"#;

    const ORDERS: &str = r#"
swagger: "2.0"
info: { title: Orders, version: "2.0" }
host: orders.example.com
schemes: [https]
basePath: /api
paths:
  /orders:
    get:
      operationId: listOrders
      tags: [orders]
  /pets:
    get:
      operationId: listPets
"#;

    async fn registry_with_both(dir: &TempDir) -> SpecRegistry {
        let registry = SpecRegistry::new();
        let pets = write_spec(dir, "pets.yaml", PETS);
        let orders = write_spec(dir, "orders.yaml", ORDERS);
        registry
            .add("pets", &pets.display().to_string())
            .await
            .unwrap();
        registry
            .add("orders", &orders.display().to_string())
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_add_get_list_in_insertion_order() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;

        let listed: Vec<String> = registry.list().iter().map(|s| s.id.clone()).collect();
        assert_eq!(listed, vec!["pets", "orders"]);

        let pets = registry.get("pets").unwrap();
        assert_eq!(pets.title(), Some("Pets"));
        assert_eq!(pets.api_version(), Some("1.0"));
        assert_eq!(pets.version, SpecVersion::OpenApi30);
        assert_eq!(pets.operations.len(), 3);
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_readd_replaces_in_place() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;
        let other = write_spec(&dir, "other.yaml", ORDERS);

        registry
            .add("pets", &other.display().to_string())
            .await
            .unwrap();

        let listed: Vec<String> = registry.list().iter().map(|s| s.id.clone()).collect();
        assert_eq!(listed, vec!["pets", "orders"]);
        assert_eq!(registry.get("pets").unwrap().title(), Some("Orders"));
    }

    #[tokio::test]
    async fn test_reload_refreshes_from_source() {
        let dir = tempdir().unwrap();
        let registry = SpecRegistry::new();
        let path = write_spec(&dir, "pets.yaml", PETS);
        let first = registry
            .add("pets", &path.display().to_string())
            .await
            .unwrap();

        let reloaded = registry.reload("pets").await.unwrap();
        assert_eq!(reloaded.operations, first.operations);
        assert!(reloaded.loaded_at >= first.loaded_at);

        let err = registry.reload("missing").await.unwrap_err();
        assert!(matches!(err, RegistryError::SpecNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;

        assert!(registry.remove("pets"));
        assert!(!registry.remove("pets"));
        assert!(registry.get("pets").is_none());
        assert_eq!(registry.list().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_unique_operation_id() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;

        let op = registry
            .find_operation(&OperationQuery {
                operation_id: Some("getPet".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(op.spec_id, "pets");
        assert_eq!(op.path, "/pets/{petId}");
    }

    #[tokio::test]
    async fn test_ambiguous_operation_id_falls_through() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;

        // listPets exists in both specs: alone it resolves nothing.
        assert!(
            registry
                .find_operation(&OperationQuery {
                    operation_id: Some("listPets".to_string()),
                    ..Default::default()
                })
                .is_none()
        );

        // Scoped to one spec, it is unique again.
        let op = registry
            .find_operation(&OperationQuery {
                spec_id: Some("orders".to_string()),
                operation_id: Some("listPets".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(op.spec_id, "orders");

        // Ambiguous id plus method and path uses the fallback stage.
        let op = registry
            .find_operation(&OperationQuery {
                spec_id: Some("pets".to_string()),
                operation_id: Some("listPets".to_string()),
                method: Some("GET".to_string()),
                path: Some("/pets".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(op.operation_id.as_deref(), Some("listPets"));
    }

    #[tokio::test]
    async fn test_find_by_method_and_path() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;

        let op = registry
            .find_operation(&OperationQuery {
                spec_id: Some("pets".to_string()),
                method: Some("POST".to_string()),
                path: Some("/pets".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(op.operation_id.as_deref(), Some("createPet"));

        // Path matching is exact, never templated.
        assert!(
            registry
                .find_operation(&OperationQuery {
                    spec_id: Some("pets".to_string()),
                    method: Some("get".to_string()),
                    path: Some("/pets/123".to_string()),
                    ..Default::default()
                })
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_search_filters_are_conjunctive() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;

        assert_eq!(registry.search_operations(&OperationFilter::default()).len(), 5);

        let hits = registry.search_operations(&OperationFilter {
            tag: Some("pets".to_string()),
            method: Some("GET".to_string()),
            ..Default::default()
        });
        assert_eq!(hits.len(), 2);

        let hits = registry.search_operations(&OperationFilter {
            path_pattern: Some("^/pets".to_string()),
            text: Some("one pet".to_string()),
            ..Default::default()
        });
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].operation_id.as_deref(), Some("getPet"));

        let hits = registry.search_operations(&OperationFilter {
            limit: Some(2),
            ..Default::default()
        });
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_search_invalid_regex_is_empty_not_error() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;

        let hits = registry.search_operations(&OperationFilter {
            path_pattern: Some("(".to_string()),
            ..Default::default()
        });
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_server_urls_and_base_url() {
        let dir = tempdir().unwrap();
        let registry = registry_with_both(&dir).await;

        let pets = registry.get("pets").unwrap();
        assert_eq!(pets.server_urls(), vec!["https://pets.example.com/v1"]);
        assert_eq!(pets.base_url(0).unwrap(), "https://pets.example.com/v1");
        // Out-of-range index clamps.
        assert_eq!(pets.base_url(9).unwrap(), "https://pets.example.com/v1");

        let orders = registry.get("orders").unwrap();
        assert_eq!(orders.base_url(0).unwrap(), "https://orders.example.com/api");
    }

    #[tokio::test]
    async fn test_relative_server_url_from_file_spec_errors() {
        let dir = tempdir().unwrap();
        let registry = SpecRegistry::new();
        let path = write_spec(
            &dir,
            "bare.yaml",
            "openapi: \"3.0.0\"\ninfo: { title: t, version: \"1\" }\npaths: {}\n",
        );
        registry
            .add("bare", &path.display().to_string())
            .await
            .unwrap();

        let spec = registry.get("bare").unwrap();
        assert_eq!(spec.server_urls(), vec!["/"]);
        assert!(spec.base_url(0).is_err());
    }
}
