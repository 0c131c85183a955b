//! Schema sources
//!
//! A schema source is a collaborator that produces a fully materialized raw
//! [`SchemaModel`]: the live database catalog on one side, the application's
//! declared entities on the other.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::schema::types::SchemaModel;

/// Which side of the comparison a snapshot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSide {
    Declared,
    Live,
}

impl fmt::Display for SchemaSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSide::Declared => f.write_str("declared"),
            SchemaSide::Live => f.write_str("live"),
        }
    }
}

/// Schema source trait
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// The side this source supplies
    fn side(&self) -> SchemaSide;

    /// Produce a raw, non-normalized snapshot
    async fn snapshot(&self) -> Result<SchemaModel>;
}

/// A snapshot that is already in memory
#[derive(Debug, Clone)]
pub struct StaticSchema {
    side: SchemaSide,
    model: SchemaModel,
}

impl StaticSchema {
    pub fn new(side: SchemaSide, model: SchemaModel) -> Self {
        Self { side, model }
    }

    pub fn declared(model: SchemaModel) -> Self {
        Self::new(SchemaSide::Declared, model)
    }

    pub fn live(model: SchemaModel) -> Self {
        Self::new(SchemaSide::Live, model)
    }
}

#[async_trait]
impl SchemaSource for StaticSchema {
    fn side(&self) -> SchemaSide {
        self.side
    }

    async fn snapshot(&self) -> Result<SchemaModel> {
        Ok(self.model.clone())
    }
}
