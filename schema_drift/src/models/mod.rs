//! Declared schema sources
//!
//! The declared side comes either from a schema file or from Rust types
//! registered with a [`ModelRegistry`].

pub mod file;
pub mod registry;

// Re-export key types
pub use file::{write_schema_file, DeclaredSchemaFile, SchemaFile, SchemaFormat};
pub use registry::{map_rust_type, DeclaredEntity, ModelInfo, ModelRegistry};
