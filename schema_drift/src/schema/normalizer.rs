//! Schema normalization
//!
//! Two snapshots taken from different places (a database catalog and an
//! application's entity definitions) spell the same schema differently. The
//! normalizer rewrites both into one canonical form so that only real drift
//! survives comparison.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::schema::dialect::{Dialect, DialectProfile};
use crate::schema::types::{
    ColumnModel, DefaultValue, IndexModel, SchemaModel, TableModel, TypeDescriptor,
};
use crate::utils::naming::strip_identifier_quotes;

/// Upper bound on array and alias passes for one type name
const MAX_ALIAS_PASSES: usize = 16;

/// MySQL integer attributes that follow the base type name
const TYPE_MODIFIERS: &[&str] = &["UNSIGNED", "SIGNED", "ZEROFILL"];

/// A `::type` cast as PostgreSQL prints it in stored defaults
///
/// Either part of a schema-qualified name may be a quoted identifier, which can
/// hold spaces and doubled quotes (`::public."Order ""Status"""`).
static CAST_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^::\s*(?:(?:"(?:[^"]|"")*"|[a-z_][a-z0-9_]*)\.)?(?:"(?:[^"]|"")*"|[a-z_][a-z0-9_]*(?:\s+(?:varying|precision|with|without|time|zone))*)(?:\s*\(\s*\d+(?:\s*,\s*\d+)*\s*\))?(?:\[\])*"#,
    )
    .expect("cast pattern is valid")
});

static NUMERIC_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?$").expect("numeric pattern is valid"));

/// Canonicalizes identifiers, types and defaults according to a dialect profile
#[derive(Debug, Clone, Default)]
pub struct SchemaNormalizer {
    profile: DialectProfile,
}

impl SchemaNormalizer {
    pub fn new(profile: DialectProfile) -> Self {
        Self { profile }
    }

    pub fn for_dialect(dialect: Dialect) -> Self {
        Self::new(DialectProfile::for_dialect(dialect))
    }

    pub fn profile(&self) -> &DialectProfile {
        &self.profile
    }

    /// Normalize a whole snapshot
    ///
    /// Fails when a column has no type, or when two entities collapse onto one
    /// identifier (e.g. `Orders` and `orders` in a case-insensitive dialect).
    pub fn normalize(&self, schema: &SchemaModel) -> Result<SchemaModel> {
        let mut normalized = SchemaModel::new();

        for table in schema.tables.values() {
            normalized.add_table(self.normalize_table(table)?)?;
        }

        tracing::debug!(
            tables = normalized.tables.len(),
            dialect = %self.profile.dialect,
            "Normalized schema"
        );

        Ok(normalized)
    }

    fn normalize_table(&self, table: &TableModel) -> Result<TableModel> {
        let mut normalized = TableModel::new(&self.normalize_identifier(&table.name));

        for column in table.columns.values() {
            let data_type = column.require_type(&table.name)?;

            let mut normalized_column = ColumnModel::new(
                &self.normalize_identifier(&column.name),
                self.normalize_type(data_type),
            )
            .nullable(column.nullable);
            normalized_column.default = column
                .default
                .as_ref()
                .and_then(|default| self.normalize_default(default));

            normalized.add_column(normalized_column)?;
        }

        for index in table.indexes.values() {
            normalized.add_index(IndexModel {
                name: self.normalize_identifier(&index.name),
                columns: index
                    .columns
                    .iter()
                    .map(|column| self.normalize_identifier(column))
                    .collect(),
                unique: index.unique,
            })?;
        }

        Ok(normalized)
    }

    /// Strip identifier quoting and fold case unless the dialect is case-sensitive
    pub fn normalize_identifier(&self, name: &str) -> String {
        let stripped = strip_identifier_quotes(name);

        if self.profile.case_sensitive {
            stripped.to_string()
        } else {
            stripped.to_lowercase()
        }
    }

    /// Map a type to its canonical spelling
    ///
    /// Unknown types are only upper-cased and unquoted. `VARCHAR` and `TEXT`
    /// are different types and stay different. Trailing `UNSIGNED`/`ZEROFILL`
    /// attributes are kept, but aliases and display widths apply to the base.
    pub fn normalize_type(&self, data_type: &TypeDescriptor) -> TypeDescriptor {
        let spelled = collapse_whitespace(&unquote_type_name(&data_type.name)).to_uppercase();
        let (mut base, modifiers) = split_type_modifiers(&spelled);
        let mut dimensions = 0;
        let mut alias_params = Vec::new();

        for _ in 0..MAX_ALIAS_PASSES {
            while let Some(stripped) = base.strip_suffix("[]") {
                dimensions += 1;
                base = stripped.trim_end().to_string();
            }

            let resolved = self.profile.resolve_alias(&base);
            if resolved.name == base {
                break;
            }
            if !resolved.params.is_empty() {
                alias_params = resolved.params;
            }
            base = resolved.name;
        }

        // An alias target may itself end in attributes (`u64 -> bigint unsigned`)
        let (base, mut all_modifiers) = split_type_modifiers(&base);
        all_modifiers.extend(modifiers);

        let params = if self.profile.params_are_cosmetic(&base) {
            Vec::new()
        } else if data_type.params.is_empty() {
            alias_params
        } else {
            data_type.params.iter().map(|p| p.trim().to_string()).collect()
        };

        let mut name = base;
        for modifier in all_modifiers {
            name.push(' ');
            name.push_str(&modifier);
        }
        name.push_str(&"[]".repeat(dimensions));

        TypeDescriptor { name, params }
    }

    /// Canonicalize a default; `None` means the default is equivalent to no default
    ///
    /// This is a heuristic that errs towards treating two spellings as equal:
    /// wrapping parentheses and `::type` casts are dropped, numeric literals are
    /// unquoted, and expressions are lower-cased outside string literals.
    pub fn normalize_default(&self, default: &DefaultValue) -> Option<DefaultValue> {
        let mut current = default.as_str().trim().to_string();

        // Rewrites never grow the text, so this reaches a fixed point
        loop {
            let next = self.rewrite_default(&current);
            if next == current {
                break;
            }
            current = next;
        }

        if current.is_empty() || current.eq_ignore_ascii_case("null") {
            None
        } else {
            Some(DefaultValue::new(&current))
        }
    }

    fn rewrite_default(&self, value: &str) -> String {
        let value = strip_wrapping_parens(value.trim());
        let value = if self.profile.strip_default_casts {
            strip_casts(value)
        } else {
            value.to_string()
        };

        match single_literal(&value) {
            Some(inner) if NUMERIC_LITERAL.is_match(inner) => inner.to_string(),
            Some(_) => value,
            None => fold_expression(&value),
        }
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove identifier quoting from a possibly schema-qualified type name
///
/// `public."Order ""Status"""` becomes `public.Order "Status"`.
fn unquote_type_name(name: &str) -> String {
    if !name.contains('"') {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    let mut quoted = false;
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '"' {
            out.push(c);
        } else if quoted && chars.peek() == Some(&'"') {
            chars.next();
            out.push('"');
        } else {
            quoted = !quoted;
        }
    }

    out
}

/// Split trailing integer attributes off an upper-cased type name
fn split_type_modifiers(name: &str) -> (String, Vec<String>) {
    let mut words: Vec<&str> = name.split(' ').collect();
    let mut modifiers = Vec::new();

    while words.len() > 1 {
        match words.last() {
            Some(word) if TYPE_MODIFIERS.contains(word) => {
                modifiers.push(word.to_string());
                words.pop();
            }
            _ => break,
        }
    }
    modifiers.reverse();

    (words.join(" "), modifiers)
}

/// Drop every pair of parentheses that encloses the whole value
fn strip_wrapping_parens(mut value: &str) -> &str {
    while let Some(inner) = enclosed(value) {
        value = inner;
    }
    value
}

/// The contents of `value` if one parenthesis pair wraps all of it
fn enclosed(value: &str) -> Option<&str> {
    if !(value.starts_with('(') && value.ends_with(')')) {
        return None;
    }

    let mut depth = 0usize;
    let mut in_literal = false;
    let last = value.len() - 1;

    for (i, c) in value.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != last {
                    return None;
                }
            }
            _ => {}
        }
    }

    (depth == 0 && !in_literal).then(|| value[1..last].trim())
}

/// Remove every `::type` cast that sits outside a string literal
fn strip_casts(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_literal = false;
    let mut i = 0;

    while i < value.len() {
        let rest = &value[i..];

        if !in_literal && rest.starts_with("::") {
            if let Some(cast) = CAST_SUFFIX.find(rest) {
                i += cast.end();
                continue;
            }
        }

        let Some(c) = rest.chars().next() else {
            break;
        };
        if c == '\'' {
            in_literal = !in_literal;
        }
        out.push(c);
        i += c.len_utf8();
    }

    out.trim_end().to_string()
}

/// The contents of `value` if it is exactly one single-quoted literal
fn single_literal(value: &str) -> Option<&str> {
    let body = value.strip_prefix('\'')?.strip_suffix('\'')?;

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            // A quote inside the body must be an escaped pair
            if chars.next() != Some('\'') {
                return None;
            }
        }
    }

    Some(body)
}

/// Lower-case and collapse whitespace outside string literals
fn fold_expression(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_literal = false;
    let mut pending_space = false;

    for c in value.chars() {
        if c == '\'' {
            in_literal = !in_literal;
        }

        if in_literal || c == '\'' {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        } else if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.extend(c.to_lowercase());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn postgres() -> SchemaNormalizer {
        SchemaNormalizer::for_dialect(Dialect::Postgres)
    }

    #[rstest]
    #[case("INT", "INTEGER")]
    #[case("int4", "INTEGER")]
    #[case("integer", "INTEGER")]
    #[case("character varying(255)", "VARCHAR(255)")]
    #[case("numeric(10, 2)", "NUMERIC(10,2)")]
    #[case("timestamp without time zone", "TIMESTAMP")]
    #[case("timestamptz", "TIMESTAMP WITH TIME ZONE")]
    #[case("_int4", "INTEGER[]")]
    #[case("int4[]", "INTEGER[]")]
    #[case("text", "TEXT")]
    #[case("varchar", "VARCHAR")]
    #[case("my_enum", "MY_ENUM")]
    fn test_type_aliases(#[case] raw: &str, #[case] expected: &str) {
        let normalized = postgres().normalize_type(&TypeDescriptor::parse(raw));
        assert_eq!(normalized.to_string(), expected);
    }

    #[test]
    fn test_varchar_and_text_stay_distinct() {
        let normalizer = postgres();
        assert_ne!(
            normalizer.normalize_type(&"VARCHAR".into()),
            normalizer.normalize_type(&"TEXT".into())
        );
    }

    #[test]
    fn test_mysql_display_widths_are_dropped() {
        let normalizer = SchemaNormalizer::for_dialect(Dialect::MySql);
        assert_eq!(normalizer.normalize_type(&"int(11)".into()).to_string(), "INTEGER");
        assert_eq!(normalizer.normalize_type(&"tinyint(1)".into()).to_string(), "TINYINT");
        assert_eq!(normalizer.normalize_type(&"boolean".into()).to_string(), "TINYINT");
        assert_eq!(normalizer.normalize_type(&"varchar(20)".into()).to_string(), "VARCHAR(20)");
    }

    #[rstest]
    #[case("bigint(20) unsigned", "BIGINT UNSIGNED", "BIGINT UNSIGNED")]
    #[case("tinyint(3) unsigned", "TINYINT UNSIGNED", "TINYINT UNSIGNED")]
    #[case("smallint(5) unsigned", "SMALLINT UNSIGNED", "SMALLINT UNSIGNED")]
    #[case("mediumint(8) unsigned", "MEDIUMINT UNSIGNED", "MEDIUMINT UNSIGNED")]
    #[case("int(10) unsigned", "INT UNSIGNED", "INTEGER UNSIGNED")]
    #[case("int(10) unsigned zerofill", "INTEGER UNSIGNED ZEROFILL", "INTEGER UNSIGNED ZEROFILL")]
    fn test_mysql_unsigned_display_widths_are_dropped(
        #[case] live: &str,
        #[case] declared: &str,
        #[case] expected: &str,
    ) {
        let normalizer = SchemaNormalizer::for_dialect(Dialect::MySql);
        let live = normalizer.normalize_type(&live.into());

        assert_eq!(live, normalizer.normalize_type(&declared.into()));
        assert_eq!(live.to_string(), expected);
    }

    #[test]
    fn test_unsigned_decimal_keeps_precision() {
        let normalizer = SchemaNormalizer::for_dialect(Dialect::MySql);
        let normalized = normalizer.normalize_type(&"decimal(10,2) unsigned".into());

        assert_eq!(normalized, TypeDescriptor::new("NUMERIC UNSIGNED", &["10", "2"]));
        assert_ne!(normalized, normalizer.normalize_type(&"decimal(12,2) unsigned".into()));
    }

    #[rstest]
    #[case("\"OrderStatus\"", "OrderStatus")]
    #[case("public.\"OrderStatus\"", "public.OrderStatus")]
    #[case("\"Order Status\"", "order status")]
    #[case("\"OrderStatus\"[]", "orderstatus[]")]
    fn test_quoted_user_types(#[case] live: &str, #[case] declared: &str) {
        let normalizer = postgres();
        assert_eq!(
            normalizer.normalize_type(&live.into()),
            normalizer.normalize_type(&declared.into())
        );
    }

    #[test]
    fn test_alias_target_parameters_are_inherited() {
        let normalizer = SchemaNormalizer::new(
            DialectProfile::for_dialect(Dialect::Postgres).with_alias("money", "numeric(19,4)"),
        );

        let live = normalizer.normalize_type(&"money".into());
        assert_eq!(live, normalizer.normalize_type(&"NUMERIC(19,4)".into()));
        assert_eq!(live.to_string(), "NUMERIC(19,4)");

        // Explicit parameters on the source win over the alias target
        assert_eq!(
            normalizer.normalize_type(&"money(10,2)".into()).to_string(),
            "NUMERIC(10,2)"
        );
        assert_eq!(normalizer.normalize_type(&live), live);
    }

    #[rstest]
    #[case("'new'::character varying", Some("'new'"))]
    #[case("'new'", Some("'new'"))]
    #[case("('new')", Some("'new'"))]
    #[case("'it''s'::text", Some("'it''s'"))]
    #[case("'42'::integer", Some("42"))]
    #[case("(-1)", Some("-1"))]
    #[case("0", Some("0"))]
    #[case("CURRENT_TIMESTAMP", Some("current_timestamp"))]
    #[case("now()", Some("now()"))]
    #[case("nextval('Orders_id_seq'::regclass)", Some("nextval('Orders_id_seq')"))]
    #[case("'{}'::jsonb", Some("'{}'"))]
    #[case("NULL::character varying", None)]
    #[case("NULL", None)]
    #[case("  ", None)]
    #[case("'a::b'", Some("'a::b'"))]
    #[case("'2020-01-01 00:00:00'::timestamp without time zone", Some("'2020-01-01 00:00:00'"))]
    #[case("'open'::\"Order Status\"", Some("'open'"))]
    #[case("'open'::public.\"Order Status\"", Some("'open'"))]
    #[case("'open'::\"Sales\".\"Order \"\"Status\"\"\"", Some("'open'"))]
    #[case("'open'::\"OrderStatus\"[]", Some("'open'"))]
    fn test_default_normalization(#[case] raw: &str, #[case] expected: Option<&str>) {
        let normalized = postgres().normalize_default(&DefaultValue::new(raw));
        assert_eq!(normalized.as_ref().map(DefaultValue::as_str), expected);
    }

    #[test]
    fn test_deeply_nested_defaults_normalize_in_one_call() {
        let normalizer = postgres();
        let raw = format!("{}0{}", "(".repeat(20), ")".repeat(20));

        let once = normalizer.normalize_default(&DefaultValue::new(&raw));
        assert_eq!(once, Some(DefaultValue::new("0")));

        let cast = format!("{}'new'::text{}", "(".repeat(40), ")".repeat(40));
        let once = normalizer.normalize_default(&DefaultValue::new(&cast));
        assert_eq!(once, Some(DefaultValue::new("'new'")));
        assert_eq!(once.as_ref().and_then(|d| normalizer.normalize_default(d)), once);
    }

    #[test]
    fn test_casts_kept_when_profile_disables_stripping() {
        let normalizer = SchemaNormalizer::for_dialect(Dialect::Sqlite);
        let normalized = normalizer.normalize_default(&DefaultValue::new("'new'::text"));
        assert_eq!(normalized, Some(DefaultValue::new("'new'::text")));
    }

    #[rstest]
    #[case("\"Orders\"", false, "orders")]
    #[case("Orders", false, "orders")]
    #[case("`Orders`", false, "orders")]
    #[case("\"Orders\"", true, "Orders")]
    fn test_identifiers(#[case] raw: &str, #[case] case_sensitive: bool, #[case] expected: &str) {
        let normalizer = SchemaNormalizer::new(
            DialectProfile::for_dialect(Dialect::Postgres).with_case_sensitive(case_sensitive),
        );
        assert_eq!(normalizer.normalize_identifier(raw), expected);
    }

    fn sample_schema() -> SchemaModel {
        let orders = TableModel::new("\"Orders\"")
            .with_column(ColumnModel::new("ID", "int4".into()).nullable(false))
            .and_then(|t| {
                t.with_column(
                    ColumnModel::new("Status", "character varying(20)".into())
                        .default("('new'::character varying)"),
                )
            })
            .and_then(|t| t.with_column(ColumnModel::new("Tags", "_text".into())))
            .and_then(|t| t.with_index(IndexModel::new("IX_Status", &["Status", "ID"], false)))
            .unwrap();

        SchemaModel::new().with_table(orders).unwrap()
    }

    #[test]
    fn test_normalize_schema() {
        let normalized = postgres().normalize(&sample_schema()).unwrap();
        let orders = normalized.table("orders").unwrap();

        assert_eq!(orders.column("id").unwrap().data_type, Some("INTEGER".into()));
        assert_eq!(orders.column("status").unwrap().default, Some(DefaultValue::new("'new'")));
        assert_eq!(orders.column("tags").unwrap().data_type, Some("TEXT[]".into()));
        assert_eq!(orders.indexes["ix_status"].columns, vec!["status", "id"]);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let normalizer = postgres();
        let once = normalizer.normalize(&sample_schema()).unwrap();
        let twice = normalizer.normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_case_collisions_are_malformed() {
        let schema = SchemaModel::new()
            .with_table(TableModel::new("Orders"))
            .and_then(|s| s.with_table(TableModel::new("orders")))
            .unwrap();

        let err = postgres().normalize(&schema).unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));

        let case_sensitive =
            SchemaNormalizer::new(DialectProfile::default().with_case_sensitive(true));
        assert_eq!(case_sensitive.normalize(&schema).unwrap().tables.len(), 2);
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let table = TableModel::new("orders")
            .with_column(ColumnModel::untyped("status"))
            .unwrap();
        let schema = SchemaModel::new().with_table(table).unwrap();

        assert!(matches!(
            postgres().normalize(&schema),
            Err(Error::MalformedSchema(_))
        ));
    }
}
