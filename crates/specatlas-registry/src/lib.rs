//! Spec registry core for SpecAtlas.
//!
//! This crate owns the in-memory model behind the SpecAtlas MCP server:
//! - loading and dereferencing `OpenAPI`/Swagger documents ([`loader`])
//! - flattening a document into addressable operations ([`index`])
//! - the stateful registry with identity and filtered search ([`registry`])
//! - best-effort sample synthesis from JSON-Schema fragments ([`sample`])
//! - textual request examples ([`example`])
//!
//! It intentionally contains **no** MCP transport or CLI concerns.

pub mod error;
pub mod example;
pub mod index;
pub mod loader;
pub mod registry;
pub mod sample;
