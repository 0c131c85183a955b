use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use schema_drift::config::{Config, DatabaseConfig};
use schema_drift::models::write_schema_file;
use schema_drift::schema::DiffKind;
use schema_drift::{DeclaredSchemaFile, DriftChecker, Error, SchemaSide, SchemaSource};

const DECLARED_TOML: &str = r#"
[[tables]]
name = "orders"

[[tables.columns]]
name = "id"
type = "INTEGER"
nullable = false

[[tables.columns]]
name = "status"
type = "VARCHAR(20)"
default = "'new'"
"#;

const DECLARED_JSON: &str = r#"{
  "tables": [
    {
      "name": "orders",
      "columns": [
        {"name": "id", "type": "INTEGER", "nullable": false},
        {"name": "status", "type": "VARCHAR(20)", "default": "'new'"}
      ]
    }
  ]
}"#;

const DECLARED_YAML: &str = "\
tables:
  - name: orders
    columns:
      - name: id
        type: INTEGER
        nullable: false
      - name: status
        type: VARCHAR(20)
        default: \"'new'\"
";

const LIVE_TOML: &str = r#"
[[tables]]
name = "orders"

[[tables.columns]]
name = "id"
type = "int4"
nullable = false

[[tables.columns]]
name = "status"
type = "character varying(20)"
default = "'new'::character varying"

[[tables.columns]]
name = "total"
type = "numeric(10,2)"
nullable = true
"#;

fn postgres_checker() -> DriftChecker {
    let database = DatabaseConfig::from_url("postgres://localhost/app").unwrap();
    DriftChecker::new(Config::new(database, None)).unwrap()
}

#[rstest]
#[case("declared.toml", DECLARED_TOML)]
#[case("declared.json", DECLARED_JSON)]
#[case("declared.yaml", DECLARED_YAML)]
#[tokio::test]
async fn test_declared_formats_agree(#[case] file_name: &str, #[case] content: &str) {
    let dir = TempDir::new().unwrap();
    let declared_path = dir.path().join(file_name);
    let live_path = dir.path().join("live.toml");
    fs::write(&declared_path, content).unwrap();
    fs::write(&live_path, LIVE_TOML).unwrap();

    let declared = DeclaredSchemaFile::new(&declared_path);
    let live = DeclaredSchemaFile::new(&live_path).as_side(SchemaSide::Live);

    let report = postgres_checker().check(&declared, &live).await.unwrap();

    assert_eq!(report.actions().len(), 1);
    assert_eq!(report.actions()[0].kind(), DiffKind::RemoveColumn);
    assert_eq!(report.render(), "- column orders.total NUMERIC(10,2) NULL\n");
}

#[tokio::test]
async fn test_missing_declared_file_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let live_path = dir.path().join("live.toml");
    fs::write(&live_path, LIVE_TOML).unwrap();

    let declared = DeclaredSchemaFile::new(dir.path().join("missing.toml"));
    let live = DeclaredSchemaFile::new(&live_path).as_side(SchemaSide::Live);

    let err = postgres_checker().check(&declared, &live).await.unwrap_err();
    assert!(matches!(
        err,
        Error::CollaboratorUnavailable { side: SchemaSide::Declared, .. }
    ));
}

#[tokio::test]
async fn test_unparseable_live_file_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let declared_path = dir.path().join("declared.toml");
    let live_path = dir.path().join("live.json");
    fs::write(&declared_path, DECLARED_TOML).unwrap();
    fs::write(&live_path, "{ not json").unwrap();

    let declared = DeclaredSchemaFile::new(&declared_path);
    let live = DeclaredSchemaFile::new(&live_path).as_side(SchemaSide::Live);

    let err = postgres_checker().check(&declared, &live).await.unwrap_err();
    assert!(matches!(
        err,
        Error::CollaboratorUnavailable { side: SchemaSide::Live, .. }
    ));
}

#[tokio::test]
async fn test_untyped_declared_column_is_malformed() {
    let dir = TempDir::new().unwrap();
    let declared_path = dir.path().join("declared.toml");
    fs::write(
        &declared_path,
        "[[tables]]\nname = \"orders\"\n\n[[tables.columns]]\nname = \"id\"\n",
    )
    .unwrap();

    let declared = DeclaredSchemaFile::new(&declared_path);
    let snapshot = declared.snapshot().await.unwrap();

    let err = postgres_checker().compare(&snapshot, &snapshot).unwrap_err();
    assert!(matches!(err, Error::MalformedSchema(_)));
}

#[test]
fn test_written_snapshot_compares_clean() {
    let dir = TempDir::new().unwrap();
    let live_path = dir.path().join("live.toml");
    fs::write(&live_path, LIVE_TOML).unwrap();

    let live = DeclaredSchemaFile::new(&live_path).load().unwrap();
    let saved_path = dir.path().join("saved.yaml");
    write_schema_file(&saved_path, &live).unwrap();

    let saved = DeclaredSchemaFile::new(&saved_path)
        .with_default_nullable(false)
        .load()
        .unwrap();

    assert_eq!(saved, live);
    assert!(!postgres_checker().compare(&saved, &live).unwrap().has_drift());
}

#[test]
fn test_default_nullable_from_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("declared.toml");
    fs::write(
        &path,
        "[[tables]]\nname = \"t\"\n\n[[tables.columns]]\nname = \"c\"\ntype = \"TEXT\"\n",
    )
    .unwrap();

    let config = schema_drift::config::DeclaredConfig {
        path: path.to_string_lossy().into_owned(),
        default_nullable: Some(false),
    };
    let model = DeclaredSchemaFile::from_config(&config).load().unwrap();

    assert!(!model.table("t").unwrap().columns["c"].nullable);
}
