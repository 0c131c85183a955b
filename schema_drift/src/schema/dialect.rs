//! Dialect profiles
//!
//! A profile holds the per-database rules the normalizer applies: identifier
//! case folding, type synonyms, and default-value cast stripping.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::config::DialectConfig;
use crate::error::{Error, Result};
use crate::schema::types::TypeDescriptor;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
    Generic,
}

impl Dialect {
    /// Map a configured driver name to a dialect
    pub fn from_driver(driver: &str) -> Result<Self> {
        driver.parse()
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "generic" => Ok(Dialect::Generic),
            other => Err(Error::ConfigError(format!("Unsupported dialect: {}", other))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Synonyms understood by every dialect
const COMMON_ALIASES: &[(&str, &str)] = &[
    ("INT", "INTEGER"),
    ("INT4", "INTEGER"),
    ("INT8", "BIGINT"),
    ("INT2", "SMALLINT"),
    ("BOOL", "BOOLEAN"),
    ("DECIMAL", "NUMERIC"),
    ("DEC", "NUMERIC"),
    ("CHARACTER VARYING", "VARCHAR"),
    ("CHARACTER", "CHAR"),
    ("FLOAT8", "DOUBLE PRECISION"),
    ("DOUBLE", "DOUBLE PRECISION"),
    ("FLOAT4", "REAL"),
    ("TIMESTAMP WITHOUT TIME ZONE", "TIMESTAMP"),
    ("TIMESTAMPTZ", "TIMESTAMP WITH TIME ZONE"),
    ("TIME WITHOUT TIME ZONE", "TIME"),
    ("TIMETZ", "TIME WITH TIME ZONE"),
];

const POSTGRES_ALIASES: &[(&str, &str)] = &[
    ("_INT4", "INTEGER[]"),
    ("_INT8", "BIGINT[]"),
    ("_TEXT", "TEXT[]"),
    ("_VARCHAR", "VARCHAR[]"),
    ("BIT VARYING", "VARBIT"),
];

const MYSQL_ALIASES: &[(&str, &str)] = &[("BOOLEAN", "TINYINT")];

/// MySQL reports display widths such as `int(11)` that carry no storage meaning
///
/// Listed by base name; `UNSIGNED` and `ZEROFILL` are split off before lookup.
const MYSQL_DISPLAY_WIDTH_TYPES: &[&str] = &["TINYINT", "SMALLINT", "MEDIUMINT", "INTEGER", "BIGINT"];

/// Normalization rules for one dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectProfile {
    pub dialect: Dialect,
    pub case_sensitive: bool,
    pub strip_default_casts: bool,
    type_aliases: HashMap<String, TypeDescriptor>,
    cosmetic_params: HashSet<String>,
}

impl DialectProfile {
    /// Built-in profile for a dialect
    pub fn for_dialect(dialect: Dialect) -> Self {
        let mut profile = Self {
            dialect,
            case_sensitive: false,
            strip_default_casts: matches!(dialect, Dialect::Postgres | Dialect::Generic),
            type_aliases: HashMap::new(),
            cosmetic_params: HashSet::new(),
        };

        profile.extend_aliases(COMMON_ALIASES);
        match dialect {
            Dialect::Postgres => profile.extend_aliases(POSTGRES_ALIASES),
            Dialect::MySql => {
                profile.extend_aliases(MYSQL_ALIASES);
                profile.cosmetic_params = MYSQL_DISPLAY_WIDTH_TYPES
                    .iter()
                    .map(|t| t.to_string())
                    .collect();
            }
            Dialect::Sqlite | Dialect::Generic => {}
        }

        profile
    }

    /// Built-in profile adjusted by user configuration
    pub fn from_config(dialect: Dialect, config: Option<&DialectConfig>) -> Self {
        let mut profile = Self::for_dialect(dialect);
        let Some(config) = config else {
            return profile;
        };

        if let Some(case_sensitive) = config.case_sensitive {
            profile.case_sensitive = case_sensitive;
        }
        if let Some(strip) = config.strip_default_casts {
            profile.strip_default_casts = strip;
        }
        if let Some(aliases) = &config.type_aliases {
            for (alias, canonical) in aliases {
                profile.add_alias(alias, canonical);
            }
        }

        profile
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.add_alias(alias, canonical);
        self
    }

    /// Register a synonym; both sides are compared upper-cased
    ///
    /// The target may carry parameters (`money -> numeric(19,4)`), which a
    /// source type without parameters inherits.
    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        let target = TypeDescriptor::parse(canonical);
        self.type_aliases.insert(
            canonical_key(alias),
            TypeDescriptor {
                name: canonical_key(&target.name),
                params: target.params,
            },
        );
    }

    /// Resolve a type name through the alias table until it stops changing
    ///
    /// Chains (`a -> b -> c`) resolve to their end and cycles stop at the first
    /// repeat, so resolving a resolved name is a no-op. The result carries the
    /// parameters of the last target in the chain that declared any.
    pub fn resolve_alias(&self, name: &str) -> TypeDescriptor {
        let mut resolved = TypeDescriptor::new(name, &[]);
        let mut seen = HashSet::new();

        while let Some(next) = self.type_aliases.get(&resolved.name) {
            if !seen.insert(resolved.name.clone()) || next.name == resolved.name {
                break;
            }
            resolved.name = next.name.clone();
            if !next.params.is_empty() {
                resolved.params = next.params.clone();
            }
        }

        resolved
    }

    /// Whether parameters of this canonical base type are display-only
    pub fn params_are_cosmetic(&self, canonical: &str) -> bool {
        self.cosmetic_params.contains(canonical)
    }

    fn extend_aliases(&mut self, aliases: &[(&str, &str)]) {
        for (alias, canonical) in aliases {
            self.add_alias(alias, canonical);
        }
    }
}

impl Default for DialectProfile {
    fn default() -> Self {
        Self::for_dialect(Dialect::Generic)
    }
}

fn canonical_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
