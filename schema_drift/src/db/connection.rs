//! Database connection handling
//!
//! This module opens the connection pool used for live-schema introspection.

use sqlx::{
    mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions, MySql, Pool,
    Postgres, Sqlite,
};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::schema::dialect::Dialect;

/// Enumeration of supported database types
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
    Sqlite(Pool<Sqlite>),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        // Introspection runs a handful of sequential queries
        let pool_size = config.pool_size.unwrap_or(2);
        let timeout = config.timeout();

        tracing::debug!(driver = %config.driver, pool_size, "Connecting to database");

        match Dialect::from_driver(&config.driver)? {
            Dialect::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::Postgres(pool))
            }
            Dialect::MySql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::MySql(pool))
            }
            Dialect::Sqlite => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::Sqlite(pool))
            }
            Dialect::Generic => Err(Error::DatabaseError(format!(
                "Unsupported database driver: {}",
                config.driver
            ))),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseConnection::Postgres(_) => Dialect::Postgres,
            DatabaseConnection::MySql(_) => Dialect::MySql,
            DatabaseConnection::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Close the pool and wait for connections to finish
    pub async fn close(&self) {
        match self {
            DatabaseConnection::Postgres(pool) => pool.close().await,
            DatabaseConnection::MySql(pool) => pool.close().await,
            DatabaseConnection::Sqlite(pool) => pool.close().await,
        }
    }
}
