//! Live schema introspection
//!
//! Reads tables, columns and secondary indexes from a database catalog into a
//! raw [`SchemaModel`]. Type names and defaults are kept as the catalog prints
//! them; making them comparable is the normalizer's job.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::{FromRow, MySql, Pool, Postgres, Row, Sqlite};

use crate::config::DatabaseConfig;
use crate::db::connection::DatabaseConnection;
use crate::error::Result;
use crate::schema::types::{ColumnModel, DefaultValue, IndexModel, SchemaModel, TableModel, TypeDescriptor};
use crate::source::{SchemaSide, SchemaSource};

/// Catalog reader for one database engine
#[async_trait]
trait Analyzer {
    /// Analyze every base table in the schema
    async fn analyze_tables(&self, schema_name: Option<&str>) -> Result<Vec<TableModel>>;
}

/// Live-schema source backed by a database connection
pub struct LiveIntrospector {
    connection: DatabaseConnection,
    schema: Option<String>,
}

impl LiveIntrospector {
    /// Create an introspector over an open connection
    pub fn new(connection: DatabaseConnection, schema: Option<String>) -> Self {
        Self { connection, schema }
    }

    /// Connect using the database configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let connection = DatabaseConnection::connect(config).await?;
        Ok(Self::new(connection, config.schema.clone()))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Read the current database schema
    pub async fn introspect(&self) -> Result<SchemaModel> {
        let schema_name = self.schema.as_deref();

        let tables = match &self.connection {
            DatabaseConnection::Postgres(pool) => {
                PostgresAnalyzer { pool }.analyze_tables(schema_name).await?
            }
            DatabaseConnection::MySql(pool) => {
                MySqlAnalyzer { pool }.analyze_tables(schema_name).await?
            }
            DatabaseConnection::Sqlite(pool) => {
                SqliteAnalyzer { pool }.analyze_tables(schema_name).await?
            }
        };

        let mut model = SchemaModel::new();
        for table in tables {
            model.add_table(table)?;
        }

        tracing::info!(
            dialect = %self.connection.dialect(),
            tables = model.tables.len(),
            "Introspected live schema"
        );

        Ok(model)
    }
}

#[async_trait]
impl SchemaSource for LiveIntrospector {
    fn side(&self) -> SchemaSide {
        SchemaSide::Live
    }

    async fn snapshot(&self) -> Result<SchemaModel> {
        self.introspect().await
    }
}

#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: Option<String>,
    is_nullable: String,
    column_default: Option<String>,
}

impl ColumnRow {
    fn into_column(self) -> ColumnModel {
        let mut column = match self.data_type.as_deref().map(str::trim) {
            Some(data_type) if !data_type.is_empty() => {
                ColumnModel::new(&self.column_name, TypeDescriptor::parse(data_type))
            }
            _ => ColumnModel::untyped(&self.column_name),
        };

        column.nullable = self.is_nullable.eq_ignore_ascii_case("YES");
        column.default = self.column_default.as_deref().map(DefaultValue::new);
        column
    }
}

#[derive(FromRow)]
struct IndexRow {
    index_name: String,
    column_name: String,
    is_unique: bool,
}

/// Fold per-column index rows (already in key order) into indexes
fn collect_indexes(table: &mut TableModel, rows: impl IntoIterator<Item = IndexRow>) -> Result<()> {
    let mut indexes: IndexMap<String, IndexModel> = IndexMap::new();

    for row in rows {
        indexes
            .entry(row.index_name.clone())
            .or_insert_with(|| IndexModel {
                name: row.index_name,
                columns: Vec::new(),
                unique: row.is_unique,
            })
            .columns
            .push(row.column_name);
    }

    for index in indexes.into_values() {
        table.add_index(index)?;
    }

    Ok(())
}

/// PostgreSQL schema analyzer
struct PostgresAnalyzer<'a> {
    pool: &'a Pool<Postgres>,
}

#[async_trait]
impl<'a> Analyzer for PostgresAnalyzer<'a> {
    async fn analyze_tables(&self, schema_name: Option<&str>) -> Result<Vec<TableModel>> {
        let schema = schema_name.unwrap_or("public");
        let mut tables = Vec::new();

        let sql = r#"
            SELECT c.relname::text AS table_name
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relkind IN ('r', 'p')
            ORDER BY c.relname
        "#;

        let table_rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(schema)
            .fetch_all(self.pool)
            .await?;

        for row in table_rows {
            let mut table = TableModel::new(&row.table_name);

            // format_type keeps modifiers: character varying(20), numeric(10,2)
            let sql = r#"
                SELECT
                    a.attname::text AS column_name,
                    pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
                    CASE WHEN a.attnotnull THEN 'NO' ELSE 'YES' END AS is_nullable,
                    pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS column_default
                FROM pg_catalog.pg_attribute a
                JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
                JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                LEFT JOIN pg_catalog.pg_attrdef d
                    ON d.adrelid = a.attrelid AND d.adnum = a.attnum
                WHERE n.nspname = $1
                    AND c.relname = $2
                    AND a.attnum > 0
                    AND NOT a.attisdropped
                ORDER BY a.attnum
            "#;

            let column_rows = sqlx::query_as::<_, ColumnRow>(sql)
                .bind(schema)
                .bind(&row.table_name)
                .fetch_all(self.pool)
                .await?;

            for col in column_rows {
                table.add_column(col.into_column())?;
            }

            // Key order comes from indkey, not from attnum
            let sql = r#"
                SELECT
                    i.relname::text AS index_name,
                    a.attname::text AS column_name,
                    ix.indisunique AS is_unique
                FROM pg_catalog.pg_index ix
                JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
                JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
                JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
                CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_catalog.pg_attribute a
                    ON a.attrelid = t.oid AND a.attnum = k.attnum
                WHERE n.nspname = $1
                    AND t.relname = $2
                    AND NOT ix.indisprimary
                ORDER BY i.relname, k.ord
            "#;

            let index_rows = sqlx::query_as::<_, IndexRow>(sql)
                .bind(schema)
                .bind(&row.table_name)
                .fetch_all(self.pool)
                .await?;

            collect_indexes(&mut table, index_rows)?;

            tracing::debug!(
                table = %table.name,
                columns = table.columns.len(),
                indexes = table.indexes.len(),
                "Analyzed table"
            );
            tables.push(table);
        }

        Ok(tables)
    }
}

#[derive(FromRow)]
struct MySqlColumnRow {
    column_name: String,
    data_type: Option<String>,
    is_nullable: String,
    column_default: Option<String>,
    extra: Option<String>,
}

#[derive(FromRow)]
struct MySqlIndexRow {
    index_name: String,
    column_name: Option<String>,
    non_unique: i64,
}

/// MySQL prints string defaults without quotes; quote literals so they compare
/// like the other dialects
fn mysql_default_literal(default: &str, extra: Option<&str>) -> String {
    let generated = extra
        .map(|e| e.to_uppercase().contains("DEFAULT_GENERATED"))
        .unwrap_or(false);
    let upper = default.trim().to_uppercase();

    if generated
        || default.starts_with('\'')
        || upper == "NULL"
        || upper.starts_with("CURRENT_TIMESTAMP")
        || default.trim().parse::<f64>().is_ok()
    {
        default.to_string()
    } else {
        format!("'{}'", default.replace('\'', "''"))
    }
}

/// MySQL schema analyzer
struct MySqlAnalyzer<'a> {
    pool: &'a Pool<MySql>,
}

#[async_trait]
impl<'a> Analyzer for MySqlAnalyzer<'a> {
    async fn analyze_tables(&self, schema_name: Option<&str>) -> Result<Vec<TableModel>> {
        let mut tables = Vec::new();

        // Without a configured schema, use the connection's current database
        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
              AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let table_rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(schema_name)
            .fetch_all(self.pool)
            .await?;

        for row in table_rows {
            let mut table = TableModel::new(&row.table_name);

            let sql = r#"
                SELECT
                    CAST(COLUMN_NAME AS CHAR) AS column_name,
                    CAST(COLUMN_TYPE AS CHAR) AS data_type,
                    CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                    CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                    CAST(EXTRA AS CHAR) AS extra
                FROM information_schema.COLUMNS
                WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
                ORDER BY ORDINAL_POSITION
            "#;

            let column_rows = sqlx::query_as::<_, MySqlColumnRow>(sql)
                .bind(schema_name)
                .bind(&row.table_name)
                .fetch_all(self.pool)
                .await?;

            for col in column_rows {
                let column_default = col
                    .column_default
                    .as_deref()
                    .map(|d| mysql_default_literal(d, col.extra.as_deref()));

                let column = ColumnRow {
                    column_name: col.column_name,
                    data_type: col.data_type,
                    is_nullable: col.is_nullable,
                    column_default,
                }
                .into_column();

                table.add_column(column)?;
            }

            let sql = r#"
                SELECT
                    CAST(INDEX_NAME AS CHAR) AS index_name,
                    CAST(COLUMN_NAME AS CHAR) AS column_name,
                    CAST(NON_UNIQUE AS SIGNED) AS non_unique
                FROM information_schema.STATISTICS
                WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
                  AND TABLE_NAME = ?
                  AND INDEX_NAME <> 'PRIMARY'
                ORDER BY INDEX_NAME, SEQ_IN_INDEX
            "#;

            let index_rows = sqlx::query_as::<_, MySqlIndexRow>(sql)
                .bind(schema_name)
                .bind(&row.table_name)
                .fetch_all(self.pool)
                .await?;

            // Functional key parts have no column name
            let index_rows = index_rows.into_iter().filter_map(|r| {
                Some(IndexRow {
                    index_name: r.index_name,
                    column_name: r.column_name?,
                    is_unique: r.non_unique == 0,
                })
            });
            collect_indexes(&mut table, index_rows)?;

            tables.push(table);
        }

        Ok(tables)
    }
}

fn quote_sqlite_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite schema analyzer
struct SqliteAnalyzer<'a> {
    pool: &'a Pool<Sqlite>,
}

#[async_trait]
impl<'a> Analyzer for SqliteAnalyzer<'a> {
    async fn analyze_tables(&self, _schema_name: Option<&str>) -> Result<Vec<TableModel>> {
        let mut tables = Vec::new();

        let sql = r#"
            SELECT name AS table_name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;
        let table_rows = sqlx::query_as::<_, TableRow>(sql)
            .fetch_all(self.pool)
            .await?;

        for row in table_rows {
            let mut table = TableModel::new(&row.table_name);
            let quoted = quote_sqlite_identifier(&row.table_name);

            let pragma = format!("PRAGMA table_info({})", quoted);
            let columns = sqlx::query(&pragma).fetch_all(self.pool).await?;

            for col in columns {
                let name: String = col.try_get("name")?;
                let data_type: String = col.try_get("type")?;
                let notnull: i64 = col.try_get("notnull")?;
                let dflt_value: Option<String> = col.try_get("dflt_value")?;
                let pk: i64 = col.try_get("pk")?;

                // A column declared without a type has BLOB affinity
                let data_type = if data_type.trim().is_empty() {
                    "BLOB".to_string()
                } else {
                    data_type
                };

                let mut column = ColumnModel::new(&name, TypeDescriptor::parse(&data_type))
                    .nullable(notnull == 0 && pk == 0);
                column.default = dflt_value.as_deref().map(DefaultValue::new);

                table.add_column(column)?;
            }

            let pragma = format!("PRAGMA index_list({})", quoted);
            let index_list = sqlx::query(&pragma).fetch_all(self.pool).await?;

            let mut index_rows = Vec::new();
            for index in index_list {
                let index_name: String = index.try_get("name")?;
                let unique: i64 = index.try_get("unique")?;
                let origin: String = index.try_get("origin")?;

                // Primary keys and the unnamed indexes behind UNIQUE constraints
                if origin == "pk" || index_name.starts_with("sqlite_autoindex_") {
                    continue;
                }

                let pragma = format!("PRAGMA index_info({})", quote_sqlite_identifier(&index_name));
                let mut key_parts = Vec::new();
                for part in sqlx::query(&pragma).fetch_all(self.pool).await? {
                    let seqno: i64 = part.try_get("seqno")?;
                    let column_name: Option<String> = part.try_get("name")?;
                    if let Some(column_name) = column_name {
                        key_parts.push((seqno, column_name));
                    }
                }
                key_parts.sort_by_key(|(seqno, _)| *seqno);

                index_rows.extend(key_parts.into_iter().map(|(_, column_name)| IndexRow {
                    index_name: index_name.clone(),
                    column_name,
                    is_unique: unique != 0,
                }));
            }

            // index_list order is not alphabetical; keep output stable
            index_rows.sort_by(|a, b| a.index_name.cmp(&b.index_name));
            collect_indexes(&mut table, index_rows)?;

            tables.push(table);
        }

        Ok(tables)
    }
}
