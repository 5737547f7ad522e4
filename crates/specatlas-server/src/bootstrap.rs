//! Pre-serve spec loading from a sources manifest.

use anyhow::{Context, Result};
use serde::Deserialize;
use specatlas_registry::registry::SpecRegistry;
use std::path::Path;

/// Default manifest looked up in the working directory when nothing is configured.
pub const DEFAULT_SOURCES_FILE: &str = "openapi-sources.json";

/// One bootstrap entry: register `location` under `id`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpecSource {
    pub id: String,
    pub location: String,
}

/// Resolve the configured sources to a list of entries.
///
/// `configured` is either an inline JSON array or a path to a JSON file holding one.
/// With nothing configured, the default manifest file is used when it exists, and an
/// empty list otherwise.
pub fn load_sources(configured: Option<&str>) -> Result<Vec<SpecSource>> {
    let text = match configured {
        Some(value) if value.trim_start().starts_with('[') => value.to_string(),
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sources file '{path}'"))?,
        None => {
            if !Path::new(DEFAULT_SOURCES_FILE).exists() {
                return Ok(Vec::new());
            }
            std::fs::read_to_string(DEFAULT_SOURCES_FILE)
                .with_context(|| format!("Failed to read '{DEFAULT_SOURCES_FILE}'"))?
        }
    };
    serde_json::from_str(&text).context("Sources must be a JSON array of {id, location}")
}

/// Register every source, logging and skipping entries that fail to load. A bad entry
/// must not keep the server from starting.
pub async fn apply(registry: &SpecRegistry, sources: &[SpecSource]) {
    for source in sources {
        match registry.add(&source.id, &source.location).await {
            Ok(spec) => {
                tracing::info!(
                    spec_id = source.id,
                    operations = spec.operations.len(),
                    "Bootstrapped spec"
                );
            }
            Err(e) => {
                tracing::warn!(
                    spec_id = source.id,
                    location = source.location,
                    error = %e,
                    "Skipping bootstrap entry"
                );
            }
        }
    }
}
