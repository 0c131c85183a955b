//! Declared schema files
//!
//! A schema file lists tables with their columns and indexes in TOML, JSON or
//! YAML. The `snapshot` command writes the same layout, so a captured live
//! schema can be compared offline later.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::DeclaredConfig;
use crate::error::{Error, Result};
use crate::schema::types::{
    ColumnModel, DefaultValue, IndexModel, SchemaModel, TableModel, TypeDescriptor,
};
use crate::source::{SchemaSide, SchemaSource};

/// Serialization format of a schema file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Toml,
    Json,
    Yaml,
}

impl SchemaFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("toml") => Ok(SchemaFormat::Toml),
            Some("json") => Ok(SchemaFormat::Json),
            Some("yaml") | Some("yml") => Ok(SchemaFormat::Yaml),
            _ => Err(Error::ConfigError(format!(
                "Unsupported schema file extension: {}",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaFormat::Toml => f.write_str("toml"),
            SchemaFormat::Json => f.write_str("json"),
            SchemaFormat::Yaml => f.write_str("yaml"),
        }
    }
}

/// On-disk layout of a schema file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub tables: Vec<TableDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Falls back to the file's default nullability when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl SchemaFile {
    pub fn parse(content: &str, format: SchemaFormat) -> Result<Self> {
        let file = match format {
            SchemaFormat::Toml => toml::from_str(content)
                .map_err(|e| Error::SerializationError(e.to_string()))?,
            SchemaFormat::Json => serde_json::from_str(content)?,
            SchemaFormat::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(file)
    }

    pub fn render(&self, format: SchemaFormat) -> Result<String> {
        let content = match format {
            SchemaFormat::Toml => toml::to_string_pretty(self)?,
            SchemaFormat::Json => serde_json::to_string_pretty(self)?,
            SchemaFormat::Yaml => serde_yaml::to_string(self)?,
        };
        Ok(content)
    }

    /// Describe a snapshot; every column spells out its nullability
    pub fn from_model(model: &SchemaModel) -> Self {
        let tables = model
            .tables
            .values()
            .map(|table| TableDef {
                name: table.name.clone(),
                columns: table
                    .columns
                    .values()
                    .map(|column| ColumnDef {
                        name: column.name.clone(),
                        data_type: column.data_type.as_ref().map(TypeDescriptor::to_string),
                        nullable: Some(column.nullable),
                        default: column.default.as_ref().map(|d| d.as_str().to_string()),
                    })
                    .collect(),
                indexes: table
                    .indexes
                    .values()
                    .map(|index| IndexDef {
                        name: index.name.clone(),
                        columns: index.columns.clone(),
                        unique: index.unique,
                    })
                    .collect(),
            })
            .collect();

        Self { tables }
    }

    /// Build a raw snapshot; duplicate names are malformed
    pub fn into_model(self, default_nullable: bool) -> Result<SchemaModel> {
        let mut model = SchemaModel::new();

        for table_def in self.tables {
            let mut table = TableModel::new(&table_def.name);

            for column_def in table_def.columns {
                table.add_column(ColumnModel {
                    name: column_def.name,
                    data_type: column_def.data_type.as_deref().map(TypeDescriptor::parse),
                    nullable: column_def.nullable.unwrap_or(default_nullable),
                    default: column_def.default.as_deref().map(DefaultValue::new),
                })?;
            }

            for index_def in table_def.indexes {
                table.add_index(IndexModel {
                    name: index_def.name,
                    columns: index_def.columns,
                    unique: index_def.unique,
                })?;
            }

            model.add_table(table)?;
        }

        Ok(model)
    }
}

/// Schema source reading a schema file
///
/// Supplies the declared side by default; [`DeclaredSchemaFile::as_side`]
/// lets a saved live snapshot stand in for the database.
#[derive(Debug, Clone)]
pub struct DeclaredSchemaFile {
    path: PathBuf,
    default_nullable: bool,
    side: SchemaSide,
}

impl DeclaredSchemaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_nullable: true,
            side: SchemaSide::Declared,
        }
    }

    pub fn from_config(config: &DeclaredConfig) -> Self {
        Self::new(&config.path).with_default_nullable(config.default_nullable.unwrap_or(true))
    }

    /// Nullability of columns that do not state it
    pub fn with_default_nullable(mut self, default_nullable: bool) -> Self {
        self.default_nullable = default_nullable;
        self
    }

    pub fn as_side(mut self, side: SchemaSide) -> Self {
        self.side = side;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse already-read file content
    pub fn load_str(&self, content: &str) -> Result<SchemaModel> {
        let format = SchemaFormat::from_path(&self.path)?;
        SchemaFile::parse(content, format)?.into_model(self.default_nullable)
    }

    pub fn load(&self) -> Result<SchemaModel> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.read_error(e))?;
        self.load_str(&content)
    }

    fn read_error(&self, error: std::io::Error) -> Error {
        Error::CollaboratorUnavailable {
            side: self.side,
            message: format!("failed to read {}: {}", self.path.display(), error),
        }
    }
}

/// Write a snapshot as a schema file, in the format given by the extension
pub fn write_schema_file(path: &Path, model: &SchemaModel) -> Result<()> {
    let format = SchemaFormat::from_path(path)?;
    let content = SchemaFile::from_model(model).render(format)?;
    std::fs::write(path, content)?;

    tracing::info!(path = %path.display(), %format, "Wrote schema file");
    Ok(())
}

#[async_trait]
impl SchemaSource for DeclaredSchemaFile {
    fn side(&self) -> SchemaSide {
        self.side
    }

    async fn snapshot(&self) -> Result<SchemaModel> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.read_error(e))?;

        let model = self.load_str(&content)?;
        tracing::debug!(
            path = %self.path.display(),
            tables = model.tables.len(),
            "Loaded schema file"
        );
        Ok(model)
    }
}
