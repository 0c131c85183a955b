//! Schema module for schema_drift
//!
//! This module holds the driver-neutral schema model, normalization, the diff
//! engine and drift reports.

pub mod dialect;
pub mod diff;
pub mod normalizer;
pub mod report;
pub mod types;

// Re-export key types
pub use dialect::{Dialect, DialectProfile};
pub use diff::{DiffAction, DiffEngine, DiffKind};
pub use normalizer::SchemaNormalizer;
pub use report::{DriftReport, DriftStatus, DriftSummary, Severity};
pub use types::{ColumnModel, DefaultValue, IndexModel, SchemaModel, TableModel, TypeDescriptor};
