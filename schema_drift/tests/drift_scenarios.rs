use pretty_assertions::assert_eq;
use rstest::rstest;

use std::collections::HashMap;

use schema_drift::config::{Config, DatabaseConfig, DialectConfig};
use schema_drift::schema::{
    ColumnModel, DefaultValue, Dialect, DiffAction, DiffEngine, DiffKind, IndexModel, SchemaModel,
    SchemaNormalizer, Severity, TableModel, TypeDescriptor,
};
use schema_drift::{DriftChecker, DriftStatus, SchemaSide, StaticSchema};

fn checker(dialect: &str) -> DriftChecker {
    let database = DatabaseConfig {
        driver: dialect.to_string(),
        url: String::new(),
        pool_size: None,
        timeout_seconds: Some(5),
        schema: None,
    };
    DriftChecker::new(Config::new(database, None)).unwrap()
}

fn column(name: &str, data_type: &str) -> ColumnModel {
    ColumnModel::new(name, TypeDescriptor::parse(data_type))
}

fn schema(tables: Vec<TableModel>) -> SchemaModel {
    tables
        .into_iter()
        .try_fold(SchemaModel::new(), |schema, table| schema.with_table(table))
        .unwrap()
}

fn declared_orders() -> TableModel {
    TableModel::new("orders")
        .with_column(column("id", "INTEGER").nullable(false))
        .unwrap()
        .with_column(column("status", "VARCHAR(20)").default("'new'"))
        .unwrap()
}

#[test]
fn test_undeclared_live_column_is_the_only_action() {
    let mut live = declared_orders()
        .with_column(column("total", "NUMERIC(10,2)"))
        .unwrap();
    live.columns["status"].default = Some(DefaultValue::new("'new'::character varying"));

    let report = checker("postgres")
        .compare(&schema(vec![declared_orders()]), &schema(vec![live]))
        .unwrap();

    assert!(report.has_drift());
    assert_eq!(report.actions().len(), 1);
    assert_eq!(report.actions()[0].kind(), DiffKind::RemoveColumn);
    assert_eq!(report.actions()[0].column(), Some("total"));
    assert_eq!(report.render(), "- column orders.total NUMERIC(10,2) NULL\n");
}

#[test]
fn test_missing_table_has_no_column_actions() {
    let declared = schema(vec![TableModel::new("customers")
        .with_column(column("id", "BIGINT").nullable(false))
        .unwrap()]);

    let report = checker("postgres").compare(&declared, &SchemaModel::new()).unwrap();

    assert_eq!(
        report.actions(),
        &[DiffAction::AddTable {
            table: "customers".to_string()
        }]
    );
    assert_eq!(report.highest_severity(), Some(Severity::Error));
}

#[test]
fn test_empty_schemas_have_no_drift() {
    let report = checker("generic")
        .compare(&SchemaModel::new(), &SchemaModel::new())
        .unwrap();

    assert!(!report.has_drift());
    assert!(report.actions().is_empty());
    assert_eq!(report.status(), DriftStatus::NoDrift);
}

#[rstest]
#[case("postgres")]
#[case("mysql")]
#[case("sqlite")]
#[case("generic")]
fn test_identical_schemas_have_no_drift(#[case] dialect: &str) {
    let model = schema(vec![declared_orders()
        .with_index(IndexModel::new("ix_orders_status", &["status", "id"], false))
        .unwrap()]);

    let report = checker(dialect).compare(&model, &model).unwrap();
    assert!(!report.has_drift(), "{}", report);
}

#[test]
fn test_type_synonyms_are_not_drift() {
    let declared = schema(vec![TableModel::new("t")
        .with_column(column("a", "INT"))
        .unwrap()
        .with_column(column("b", "int4"))
        .unwrap()]);
    let live = schema(vec![TableModel::new("T")
        .with_column(column("A", "integer"))
        .unwrap()
        .with_column(column("B", "INTEGER"))
        .unwrap()]);

    assert!(!checker("postgres").compare(&declared, &live).unwrap().has_drift());
}

#[rstest]
#[case("VARCHAR(50)", "VARCHAR(100)")]
#[case("NUMERIC(10,2)", "NUMERIC(12,2)")]
#[case("VARCHAR", "TEXT")]
fn test_width_and_type_changes_are_drift(#[case] declared_type: &str, #[case] live_type: &str) {
    let declared = schema(vec![TableModel::new("t").with_column(column("c", declared_type)).unwrap()]);
    let live = schema(vec![TableModel::new("t").with_column(column("c", live_type)).unwrap()]);

    let report = checker("postgres").compare(&declared, &live).unwrap();

    assert_eq!(report.actions().len(), 1);
    assert_eq!(report.actions()[0].kind(), DiffKind::ModifyColumnType);
}

#[test]
fn test_mysql_display_width_is_not_drift() {
    let declared = schema(vec![TableModel::new("t").with_column(column("c", "INT")).unwrap()]);
    let live = schema(vec![TableModel::new("t").with_column(column("c", "int(11)")).unwrap()]);

    assert!(!checker("mysql").compare(&declared, &live).unwrap().has_drift());
    assert!(checker("postgres").compare(&declared, &live).unwrap().has_drift());
}

#[rstest]
#[case("bigint(20) unsigned", "BIGINT UNSIGNED")]
#[case("tinyint(3) unsigned", "TINYINT UNSIGNED")]
#[case("smallint(5) unsigned", "SMALLINT UNSIGNED")]
#[case("mediumint(8) unsigned", "MEDIUMINT UNSIGNED")]
#[case("int(10) unsigned", "INT UNSIGNED")]
#[case("int(10) unsigned zerofill", "INT UNSIGNED ZEROFILL")]
fn test_mysql_unsigned_display_width_is_not_drift(#[case] live_type: &str, #[case] declared_type: &str) {
    let declared = schema(vec![TableModel::new("t").with_column(column("c", declared_type)).unwrap()]);
    let live = schema(vec![TableModel::new("t").with_column(column("c", live_type)).unwrap()]);

    let report = checker("mysql").compare(&declared, &live).unwrap();
    assert!(!report.has_drift(), "{}", report);
}

#[test]
fn test_mysql_signedness_change_is_drift() {
    let declared = schema(vec![TableModel::new("t").with_column(column("c", "BIGINT")).unwrap()]);
    let live = schema(vec![TableModel::new("t")
        .with_column(column("c", "bigint(20) unsigned"))
        .unwrap()]);

    let report = checker("mysql").compare(&declared, &live).unwrap();
    assert_eq!(
        report.render(),
        "~ column t.c type: declared BIGINT, live BIGINT UNSIGNED\n"
    );
}

#[test]
fn test_quoted_enum_type_and_cast_are_not_drift() {
    let declared = schema(vec![TableModel::new("orders")
        .with_column(column("status", "OrderStatus").default("'open'"))
        .unwrap()
        .with_column(column("stage", "public.\"Order Stage\"").default("'draft'"))
        .unwrap()]);
    let live = schema(vec![TableModel::new("orders")
        .with_column(column("status", "\"OrderStatus\"").default("'open'::\"OrderStatus\""))
        .unwrap()
        .with_column(column("stage", "public.\"Order Stage\"").default("'draft'::public.\"Order Stage\""))
        .unwrap()]);

    let report = checker("postgres").compare(&declared, &live).unwrap();
    assert!(!report.has_drift(), "{}", report);
}

#[test]
fn test_parameterized_alias_from_config_is_not_drift() {
    let mut config = Config::new(DatabaseConfig::from_url("postgres://db/app").unwrap(), None);
    config.dialect = Some(DialectConfig {
        type_aliases: Some(HashMap::from([("money".to_string(), "numeric(19,4)".to_string())])),
        ..DialectConfig::default()
    });
    let checker = DriftChecker::new(config).unwrap();

    let declared = schema(vec![TableModel::new("t").with_column(column("c", "NUMERIC(19,4)")).unwrap()]);
    let live = schema(vec![TableModel::new("t").with_column(column("c", "money")).unwrap()]);
    assert!(!checker.compare(&declared, &live).unwrap().has_drift());

    let narrower = schema(vec![TableModel::new("t").with_column(column("c", "NUMERIC(10,2)")).unwrap()]);
    assert_eq!(
        checker.compare(&narrower, &live).unwrap().render(),
        "~ column t.c type: declared NUMERIC(10,2), live NUMERIC(19,4)\n"
    );
}

#[test]
fn test_report_order_is_deterministic() {
    let declared = schema(vec![
        TableModel::new("zebra")
            .with_column(column("b", "TEXT").nullable(false))
            .unwrap()
            .with_column(column("a", "TEXT"))
            .unwrap(),
        TableModel::new("apple").with_column(column("id", "INT")).unwrap(),
        TableModel::new("mango").with_column(column("id", "INT")).unwrap(),
    ]);
    let live = schema(vec![
        TableModel::new("mango")
            .with_column(column("id", "BIGINT"))
            .unwrap()
            .with_index(IndexModel::new("ix_mango_id", &["id"], false))
            .unwrap(),
        TableModel::new("zebra")
            .with_column(column("a", "TEXT").default("'x'"))
            .unwrap()
            .with_column(column("c", "TEXT"))
            .unwrap()
            .with_column(column("b", "TEXT"))
            .unwrap(),
        TableModel::new("banana"),
    ]);

    let checker = checker("postgres");
    let first = checker.compare(&declared, &live).unwrap();
    let second = checker.compare(&declared, &live).unwrap();

    assert_eq!(first.render(), second.render());
    assert_eq!(
        first.render(),
        "+ table apple\n\
         - table banana\n\
         ~ column mango.id type: declared INTEGER, live BIGINT\n\
         - index mango.ix_mango_id (id)\n\
         - column zebra.c TEXT NULL\n\
         ~ column zebra.a default: declared (none), live 'x'\n\
         ~ column zebra.b nullability: declared NOT NULL, live NULL\n"
    );
}

#[test]
fn test_engine_and_normalizer_compose_without_checker() {
    let normalizer = SchemaNormalizer::for_dialect(Dialect::Postgres);
    let declared = normalizer.normalize(&schema(vec![declared_orders()])).unwrap();
    let live = normalizer.normalize(&schema(vec![declared_orders()])).unwrap();

    assert!(DiffEngine::new().compare(&declared, &live).unwrap().is_empty());
}

#[tokio::test]
async fn test_check_with_static_sources() {
    let declared = StaticSchema::declared(schema(vec![declared_orders()]));
    let live = StaticSchema::new(SchemaSide::Live, SchemaModel::new());

    let report = checker("postgres").check(&declared, &live).await.unwrap();

    assert_eq!(report.status(), DriftStatus::DriftDetected);
    assert_eq!(report.status().code(), 1);
}
