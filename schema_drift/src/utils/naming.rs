//! Naming utilities for schema_drift
//!
//! Identifier handling shared by the normalizer and by tables declared from
//! Rust structs.

use inflector::Inflector;

/// Format a name according to a pattern with placeholders
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Snake-cased, optionally pluralized table name for a model type name
pub fn get_table_name(model_name: &str, pluralize: bool) -> String {
    let name = model_name.to_snake_case();

    if pluralize {
        // Irregular plurals the inflector gets wrong
        match name.to_lowercase().as_str() {
            "person" => "people".to_string(),
            "child" => "children".to_string(),
            "man" => "men".to_string(),
            "woman" => "women".to_string(),
            "mouse" => "mice".to_string(),
            _ => name.to_plural(),
        }
    } else {
        name
    }
}

/// Get index name from table and columns according to pattern
pub fn get_index_name(pattern: &str, table_name: &str, columns: &[String]) -> String {
    let columns_str = columns.join("_");

    format_name(pattern, &[("table", table_name), ("columns", &columns_str)])
}

/// Remove surrounding identifier quotes: `"x"`, `` `x` `` and `[x]`
///
/// Nested quoting is removed completely, so the result never starts and ends
/// with a matching quote pair.
pub fn strip_identifier_quotes(name: &str) -> &str {
    let mut current = name.trim();

    loop {
        let inner = ['"', '`']
            .iter()
            .find_map(|q| {
                current
                    .strip_prefix(*q)
                    .and_then(|rest| rest.strip_suffix(*q))
            })
            .or_else(|| {
                current
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
            });

        match inner {
            Some(inner) => current = inner.trim(),
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(true, "OrderLine", "order_lines")]
    #[case(false, "OrderLine", "order_line")]
    #[case(false, "order_line", "order_line")]
    #[case(true, "Category", "categories")]
    #[case(true, "Person", "people")]
    fn test_table_names(#[case] pluralize: bool, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(get_table_name(input, pluralize), expected);
    }

    #[test]
    fn test_index_name_pattern() {
        assert_eq!(
            get_index_name("ux_{table}_{columns}", "users", &["email".to_string()]),
            "ux_users_email"
        );
    }

    #[rstest]
    #[case("\"Orders\"", "Orders")]
    #[case("`orders`", "orders")]
    #[case("[Order Lines]", "Order Lines")]
    #[case("\"\"orders\"\"", "orders")]
    #[case("  orders ", "orders")]
    #[case("or\"ders", "or\"ders")]
    fn test_strip_identifier_quotes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_identifier_quotes(input), expected);
    }
}
