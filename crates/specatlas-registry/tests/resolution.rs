//! End-to-end pass over one spec: register, search, resolve, render an example.

use specatlas_registry::example::{curl_example, fetch_example, sketch_operation};
use specatlas_registry::registry::{OperationFilter, OperationQuery, SpecRegistry};
use std::fs;
use tempfile::tempdir;

const WIDGETS: &str = r#"
openapi: "3.0.0"
info:
  title: Widget Service
  version: "1.0.0"
servers:
  - url: https://widgets.example.com/api
paths:
  /widgets:
    get:
      operationId: listWidgets
      summary: List widgets
      tags: [widgets]
  /widgets/{id}:
    get:
      operationId: getWidget
      summary: Get one widget
      tags: [widgets]
      parameters:
        - name: id
          in: path
          required: true
          schema: { type: string }
        - name: verbose
          in: query
          schema: { type: boolean }
      responses:
        "200":
          description: ok
"#;

#[tokio::test]
async fn test_register_search_resolve_and_render() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("widgets.yaml");
    fs::write(&path, WIDGETS).unwrap();

    let registry = SpecRegistry::new();
    registry
        .add("widgets", &path.display().to_string())
        .await
        .unwrap();

    // A path-pattern search narrowed by text finds exactly the detail operation.
    let hits = registry.search_operations(&OperationFilter {
        path_pattern: Some("^/widgets/".to_string()),
        text: Some("one widget".to_string()),
        ..Default::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].operation_id.as_deref(), Some("getWidget"));

    // Resolving the same operation by id yields the identical record.
    let found = registry
        .find_operation(&OperationQuery {
            operation_id: Some("getWidget".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(found, hits[0]);

    // Rendered examples target the filled path on the declared server.
    let spec = registry.get("widgets").unwrap();
    let sketch = sketch_operation(&spec, &found, 0).unwrap();
    assert_eq!(sketch.path, "/widgets/123");
    assert!(sketch.body.is_none());

    let curl = curl_example(&sketch).unwrap();
    assert!(curl.starts_with(
        "curl -X GET \"https://widgets.example.com/api/widgets/123?verbose=sample\""
    ));
    assert!(curl.contains("-H \"Accept: application/json\""));
    assert!(!curl.contains("-d"));

    let fetch = fetch_example(&sketch).unwrap();
    assert!(fetch.contains("https://widgets.example.com/api/widgets/123?verbose=sample"));
    assert!(fetch.contains("method: \"GET\""));
    assert!(!fetch.contains("body:"));
}
