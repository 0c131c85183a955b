//! schema_drift: detects drift between the schema an application declares and
//! the schema a live database actually has
//!
//! Both sides are snapshotted into a driver-neutral [`SchemaModel`], normalized
//! through a dialect profile so cosmetic differences vanish, and compared. The
//! result is a [`DriftReport`] listing ordered, typed [`DiffAction`]s, with a
//! status that maps onto process exit codes (0 no drift, 1 drift, 2 failure).

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod source;
pub mod utils;

use std::time::Duration;

// Re-export main types for easier access
pub use config::Config;
pub use db::{DatabaseConnection, LiveIntrospector};
pub use error::{Error, Result};
pub use models::{DeclaredEntity, DeclaredSchemaFile, ModelRegistry};
pub use schema::{
    DiffAction, DiffEngine, DiffKind, DriftReport, DriftStatus, SchemaModel, SchemaNormalizer,
    Severity,
};
pub use schema_drift_macros::DeclaredTable;
pub use source::{SchemaSide, SchemaSource, StaticSchema};

/// Load a configuration file and build a checker for it
pub fn init(config_path: &str) -> Result<DriftChecker> {
    let config = config::load_from_file(config_path)?;
    DriftChecker::new(config)
}

/// Runs one drift check: snapshot both sides, normalize, diff, report
pub struct DriftChecker {
    config: Config,
    normalizer: SchemaNormalizer,
    engine: DiffEngine,
}

impl DriftChecker {
    /// Create a checker; fails if the configured driver is unknown
    pub fn new(config: Config) -> Result<Self> {
        let normalizer = SchemaNormalizer::new(config.dialect_profile()?);

        Ok(Self {
            config,
            normalizer,
            engine: DiffEngine::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn normalizer(&self) -> &SchemaNormalizer {
        &self.normalizer
    }

    /// Compare two raw snapshots that are already in memory
    pub fn compare(&self, declared: &SchemaModel, live: &SchemaModel) -> Result<DriftReport> {
        let declared = self.prepare(SchemaSide::Declared, declared)?;
        let live = self.prepare(SchemaSide::Live, live)?;

        let actions = self.engine.compare(&declared, &live)?;
        let report = DriftReport::new(actions);

        tracing::info!(
            drift = report.has_drift(),
            errors = report.summary().errors,
            warnings = report.summary().warnings,
            "Schema comparison finished"
        );

        Ok(report)
    }

    /// Snapshot both sources concurrently and compare them
    ///
    /// Each snapshot is bounded by the configured timeout. Nothing is compared
    /// unless both snapshots succeed.
    pub async fn check<D, L>(&self, declared: &D, live: &L) -> Result<DriftReport>
    where
        D: SchemaSource + ?Sized,
        L: SchemaSource + ?Sized,
    {
        let timeout = self.config.database.timeout();

        let (declared, live) = tokio::try_join!(
            fetch_snapshot(declared, timeout),
            fetch_snapshot(live, timeout),
        )?;

        self.compare(&declared, &live)
    }

    /// Check the configured declared file against the configured database
    pub async fn run(&self) -> Result<DriftReport> {
        let declared = self.declared_source()?;
        let live = self.connect_live().await?;

        let report = self.check(&declared, &live).await;
        live.connection().close().await;

        report
    }

    /// Raw snapshot of the configured database
    pub async fn snapshot_live(&self) -> Result<SchemaModel> {
        let live = self.connect_live().await?;
        let snapshot = fetch_snapshot(&live, self.config.database.timeout()).await;
        live.connection().close().await;

        Ok(snapshot?.without_tables(&self.config.comparison.ignore_tables))
    }

    fn declared_source(&self) -> Result<DeclaredSchemaFile> {
        let declared = self.config.declared.as_ref().ok_or_else(|| {
            Error::ConfigError("No declared schema configured; set [declared] path".to_string())
        })?;

        Ok(DeclaredSchemaFile::from_config(declared))
    }

    async fn connect_live(&self) -> Result<LiveIntrospector> {
        LiveIntrospector::connect(&self.config.database)
            .await
            .map_err(|e| Error::from_source(SchemaSide::Live, e))
    }

    /// Normalize one side and drop ignored tables
    fn prepare(&self, side: SchemaSide, raw: &SchemaModel) -> Result<SchemaModel> {
        let normalized = self
            .normalizer
            .normalize(raw)
            .map_err(|e| Error::from_source(side, e))?;

        let ignored: Vec<String> = self
            .config
            .comparison
            .ignore_tables
            .iter()
            .map(|t| self.normalizer.normalize_identifier(t))
            .collect();

        Ok(normalized.without_tables(&ignored))
    }
}

async fn fetch_snapshot<S>(source: &S, timeout: Duration) -> Result<SchemaModel>
where
    S: SchemaSource + ?Sized,
{
    let side = source.side();

    match tokio::time::timeout(timeout, source.snapshot()).await {
        Ok(Ok(model)) => {
            tracing::debug!(%side, tables = model.tables.len(), "Fetched snapshot");
            Ok(model)
        }
        Ok(Err(e)) => {
            let error = Error::from_source(side, e);
            tracing::error!(%side, error = %error, "Snapshot failed");
            Err(error)
        }
        Err(_) => {
            tracing::error!(%side, "Snapshot timed out");
            Err(Error::CollaboratorUnavailable {
                side,
                message: format!("timed out after {}s", timeout.as_secs()),
            })
        }
    }
}
