//! Model registry for schema_drift
//!
//! Collects the application's declared entities (usually structs deriving
//! `DeclaredTable`) into the declared side of a comparison.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::schema::types::{SchemaModel, TableModel, TypeDescriptor};
use crate::source::{SchemaSide, SchemaSource};

/// An application type that declares one table
pub trait DeclaredEntity {
    /// Name of the Rust type, for diagnostics
    fn entity_name() -> &'static str;

    /// The table this entity expects to exist
    fn table_model() -> Result<TableModel>;
}

/// Information about a registered model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    build: fn() -> Result<TableModel>,
}

/// Registry of declared entities
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelInfo>,
    tables: Vec<TableModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type
    pub fn register<T: DeclaredEntity>(&mut self) -> &mut Self {
        tracing::debug!(entity = T::entity_name(), "Registered model");
        self.models.push(ModelInfo {
            name: T::entity_name().to_string(),
            build: T::table_model,
        });
        self
    }

    /// Register a table built by hand
    pub fn register_table(&mut self, table: TableModel) -> &mut Self {
        self.tables.push(table);
        self
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.tables.is_empty()
    }

    /// Build the declared schema; two entities claiming one table is malformed
    pub fn to_schema_model(&self) -> Result<SchemaModel> {
        let mut schema = SchemaModel::new();

        for model in &self.models {
            let table = (model.build)().map_err(|e| match e {
                Error::TypeMappingError(message) => {
                    Error::TypeMappingError(format!("{}: {}", model.name, message))
                }
                other => other,
            })?;
            schema.add_table(table)?;
        }

        for table in &self.tables {
            schema.add_table(table.clone())?;
        }

        Ok(schema)
    }
}

#[async_trait]
impl SchemaSource for ModelRegistry {
    fn side(&self) -> SchemaSide {
        SchemaSide::Declared
    }

    async fn snapshot(&self) -> Result<SchemaModel> {
        self.to_schema_model()
    }
}

/// Map a Rust field type to the SQL type it is stored as
///
/// `Option<T>` maps like `T`; nullability is decided by the caller.
pub fn map_rust_type(rust_type: &str) -> Result<TypeDescriptor> {
    let compact: String = rust_type.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(inner) = compact
        .strip_prefix("Option<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return map_rust_type(inner);
    }

    // Drop the module path of plain types: std::string::String
    let base = if compact.contains('<') {
        compact.as_str()
    } else {
        compact.rsplit("::").next().unwrap_or(&compact)
    };

    let sql_type = match base {
        "String" | "&str" | "&'staticstr" => "VARCHAR(255)",
        "i8" | "i16" => "SMALLINT",
        "i32" => "INTEGER",
        "i64" => "BIGINT",
        "u8" | "u16" | "u32" => "INTEGER",
        "u64" => "BIGINT",
        "f32" => "REAL",
        "f64" => "DOUBLE PRECISION",
        "bool" => "BOOLEAN",
        t if t.contains("Vec<u8>") => "BYTEA",
        t if t.contains("NaiveDateTime") => "TIMESTAMP",
        t if t.contains("NaiveDate") => "DATE",
        t if t.contains("NaiveTime") => "TIME",
        t if t.contains("DateTime") => "TIMESTAMP WITH TIME ZONE",
        t if t.contains("Uuid") => "UUID",
        t if t.contains("Decimal") => "NUMERIC(20,6)",
        t if t.contains("Json") || t.contains("Value") => "JSONB",
        _ => {
            return Err(Error::TypeMappingError(format!(
                "no SQL type for Rust type '{}'; set db_type explicitly",
                rust_type
            )))
        }
    };

    Ok(TypeDescriptor::parse(sql_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::ColumnModel;
    use rstest::rstest;

    struct Customer;

    impl DeclaredEntity for Customer {
        fn entity_name() -> &'static str {
            "Customer"
        }

        fn table_model() -> Result<TableModel> {
            TableModel::new("customers")
                .with_column(ColumnModel::new("id", map_rust_type("i64")?).nullable(false))
        }
    }

    struct Broken;

    impl DeclaredEntity for Broken {
        fn entity_name() -> &'static str {
            "Broken"
        }

        fn table_model() -> Result<TableModel> {
            TableModel::new("broken").with_column(ColumnModel::new("x", map_rust_type("HashSet<u8>")?))
        }
    }

    #[rstest]
    #[case("String", "VARCHAR(255)")]
    #[case("i64", "BIGINT")]
    #[case("Option<i32>", "INTEGER")]
    #[case("Vec < u8 >", "BYTEA")]
    #[case("chrono::NaiveDateTime", "TIMESTAMP")]
    #[case("chrono::DateTime<chrono::Utc>", "TIMESTAMP WITH TIME ZONE")]
    #[case("rust_decimal::Decimal", "NUMERIC(20,6)")]
    #[case("serde_json::Value", "JSONB")]
    fn test_map_rust_type(#[case] rust_type: &str, #[case] expected: &str) {
        assert_eq!(map_rust_type(rust_type).unwrap().to_string(), expected);
    }

    #[test]
    fn test_registry_builds_schema() {
        let mut registry = ModelRegistry::new();
        registry
            .register::<Customer>()
            .register_table(TableModel::new("audit_log"));

        let schema = registry.to_schema_model().unwrap();
        assert_eq!(schema.tables.keys().collect::<Vec<_>>(), vec!["customers", "audit_log"]);
        assert_eq!(registry.models()[0].name, "Customer");
    }

    #[test]
    fn test_duplicate_table_is_malformed() {
        let mut registry = ModelRegistry::new();
        registry.register::<Customer>().register::<Customer>();

        assert!(matches!(
            registry.to_schema_model(),
            Err(Error::MalformedSchema(_))
        ));
    }

    #[test]
    fn test_unmapped_type_names_the_entity() {
        let mut registry = ModelRegistry::new();
        registry.register::<Broken>();

        match registry.to_schema_model() {
            Err(Error::TypeMappingError(message)) => assert!(message.starts_with("Broken:")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
