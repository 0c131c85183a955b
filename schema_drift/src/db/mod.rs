//! Database module for schema_drift
//!
//! This module connects to the live database and reads its catalog.

pub mod connection;
pub mod introspect;

// Re-export key types
pub use connection::DatabaseConnection;
pub use introspect::LiveIntrospector;
