//! Type definitions for driver-neutral schema snapshots

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A snapshot of a relational schema at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
    pub tables: IndexMap<String, TableModel>,
}

impl SchemaModel {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the schema, rejecting a second table with the same name
    pub fn add_table(&mut self, table: TableModel) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Err(Error::MalformedSchema(format!(
                "duplicate table '{}'",
                table.name
            )));
        }

        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Builder form of [`SchemaModel::add_table`]
    pub fn with_table(mut self, table: TableModel) -> Result<Self> {
        self.add_table(table)?;
        Ok(self)
    }

    pub fn table(&self, name: &str) -> Option<&TableModel> {
        self.tables.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Copy of this schema without the named tables
    pub fn without_tables(&self, names: &[String]) -> Self {
        let tables = self
            .tables
            .iter()
            .filter(|(name, _)| !names.iter().any(|n| n == *name))
            .map(|(name, table)| (name.clone(), table.clone()))
            .collect();

        Self { tables }
    }
}

/// A table with its columns and secondary indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableModel {
    pub name: String,
    pub columns: IndexMap<String, ColumnModel>,
    pub indexes: IndexMap<String, IndexModel>,
}

impl TableModel {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: ColumnModel) -> Result<()> {
        if self.columns.contains_key(&column.name) {
            return Err(Error::MalformedSchema(format!(
                "duplicate column '{}' in table '{}'",
                column.name, self.name
            )));
        }

        self.columns.insert(column.name.clone(), column);
        Ok(())
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: IndexModel) -> Result<()> {
        if self.indexes.contains_key(&index.name) {
            return Err(Error::MalformedSchema(format!(
                "duplicate index '{}' on table '{}'",
                index.name, self.name
            )));
        }

        self.indexes.insert(index.name.clone(), index);
        Ok(())
    }

    pub fn with_column(mut self, column: ColumnModel) -> Result<Self> {
        self.add_column(column)?;
        Ok(self)
    }

    pub fn with_index(mut self, index: IndexModel) -> Result<Self> {
        self.add_index(index)?;
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnModel> {
        self.columns.get(name)
    }
}

/// A column definition
///
/// `data_type` is optional only so that a snapshot missing a type can be
/// represented and rejected; normalization and comparison refuse such columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnModel {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: Option<TypeDescriptor>,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnModel {
    /// Create a new nullable column with the given name and type
    pub fn new(name: &str, data_type: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            data_type: Some(data_type),
            nullable: true,
            default: None,
        }
    }

    /// Create a column whose type the source could not report
    pub fn untyped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: None,
            nullable: true,
            default: None,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(DefaultValue::new(default));
        self
    }

    /// The column type, or a malformed-schema error naming the column
    pub fn require_type(&self, table: &str) -> Result<&TypeDescriptor> {
        self.data_type.as_ref().ok_or_else(|| {
            Error::MalformedSchema(format!(
                "column '{}.{}' has no type",
                table, self.name
            ))
        })
    }
}

/// A secondary index; column order is significant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexModel {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexModel {
    pub fn new(name: &str, columns: &[&str], unique: bool) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        }
    }

    /// True when both indexes cover the same columns in the same order with the same uniqueness
    pub fn same_definition(&self, other: &IndexModel) -> bool {
        self.columns == other.columns && self.unique == other.unique
    }
}

impl fmt::Display for IndexModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unique {
            write!(f, "UNIQUE ")?;
        }
        write!(f, "({})", self.columns.join(", "))
    }
}

/// A logical type name plus its parameters, e.g. `NUMERIC(10,2)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TypeDescriptor {
    pub name: String,
    pub params: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(name: &str, params: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Parse a catalog or declared type string
    ///
    /// Text after the parameter list is kept as part of the name, so
    /// `timestamp(3) with time zone` becomes `timestamp with time zone` with
    /// parameter `3`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        let (Some(open), Some(close)) = (raw.find('('), raw.rfind(')')) else {
            return Self {
                name: raw.to_string(),
                params: Vec::new(),
            };
        };
        if close < open {
            return Self {
                name: raw.to_string(),
                params: Vec::new(),
            };
        }

        let head = raw[..open].trim_end();
        let tail = raw[close + 1..].trim_start();
        let name = if tail.is_empty() {
            head.to_string()
        } else if tail.starts_with('[') {
            format!("{}{}", head, tail)
        } else {
            format!("{} {}", head, tail)
        };

        let params = raw[open + 1..close]
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Self { name, params }
    }
}

impl From<String> for TypeDescriptor {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for TypeDescriptor {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<TypeDescriptor> for String {
    fn from(descriptor: TypeDescriptor) -> Self {
        descriptor.to_string()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Array suffixes go after the parameter list: VARCHAR(20)[]
        let (base, suffix) = match self.name.find("[]") {
            Some(pos) if !self.params.is_empty() => self.name.split_at(pos),
            _ => (self.name.as_str(), ""),
        };

        write!(f, "{}", base)?;
        if !self.params.is_empty() {
            write!(f, "({})", self.params.join(","))?;
        }
        write!(f, "{}", suffix)
    }
}

/// A column default, kept as literal or expression text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefaultValue(String);

impl DefaultValue {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_type_parameters() {
        assert_eq!(TypeDescriptor::parse("NUMERIC(10, 2)"), TypeDescriptor::new("NUMERIC", &["10", "2"]));
        assert_eq!(TypeDescriptor::parse("varchar"), TypeDescriptor::new("varchar", &[]));
        assert_eq!(
            TypeDescriptor::parse("timestamp(3) with time zone"),
            TypeDescriptor::new("timestamp with time zone", &["3"])
        );
        assert_eq!(
            TypeDescriptor::parse("character varying(20)[]"),
            TypeDescriptor::new("character varying[]", &["20"])
        );
    }

    #[test]
    fn displays_canonical_form() {
        assert_eq!(TypeDescriptor::parse("NUMERIC( 10 , 2 )").to_string(), "NUMERIC(10,2)");
        assert_eq!(TypeDescriptor::new("VARCHAR[]", &["20"]).to_string(), "VARCHAR(20)[]");
        assert_eq!(TypeDescriptor::new("TEXT", &[]).to_string(), "TEXT");
    }

    #[test]
    fn rejects_duplicate_identities() {
        let mut schema = SchemaModel::new();
        schema.add_table(TableModel::new("orders")).unwrap();
        assert!(matches!(
            schema.add_table(TableModel::new("orders")),
            Err(Error::MalformedSchema(_))
        ));

        let mut table = TableModel::new("orders");
        table.add_column(ColumnModel::new("id", "INTEGER".into())).unwrap();
        assert!(matches!(
            table.add_column(ColumnModel::new("id", "BIGINT".into())),
            Err(Error::MalformedSchema(_))
        ));

        table.add_index(IndexModel::new("ix_orders_id", &["id"], false)).unwrap();
        assert!(table.add_index(IndexModel::new("ix_orders_id", &["id"], true)).is_err());
    }

    #[test]
    fn missing_type_is_reported() {
        let column = ColumnModel::untyped("status");
        let err = column.require_type("orders").unwrap_err();
        assert_eq!(err.to_string(), "Malformed schema: column 'orders.status' has no type");
    }

    #[test]
    fn serializes_type_as_text() {
        let column = ColumnModel::new("total", TypeDescriptor::parse("NUMERIC(10,2)")).nullable(false);
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(json["type"], "NUMERIC(10,2)");
        assert_eq!(json["nullable"], false);
    }
}
