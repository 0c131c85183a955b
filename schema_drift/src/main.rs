//! schema_drift CLI
//!
//! Compares the declared schema with a live database and exits with 0 when
//! they match, 1 when drift was found, and 2 when the check could not run.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use schema_drift::config::{load_from_file, Config, DatabaseConfig, DeclaredConfig, OutputFormat};
use schema_drift::models::{write_schema_file, DeclaredSchemaFile, SchemaFile, SchemaFormat};
use schema_drift::schema::dialect::Dialect;
use schema_drift::utils::logging::{default_logging, init_logging};
use schema_drift::{DriftChecker, DriftReport, DriftStatus, SchemaSide};

/// Detect drift between declared and live database schemas.
#[derive(Parser)]
#[command(name = "schema_drift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL; overrides the configured one.
    #[arg(short, long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Report format; overrides the configured one.
    #[arg(short, long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the declared schema with the live database.
    Check {
        /// Declared schema file (TOML, JSON or YAML); overrides the configured one.
        #[arg(long)]
        declared: Option<PathBuf>,
    },

    /// Compare two schema files without a database.
    Diff {
        /// Declared schema file.
        declared: PathBuf,

        /// Live schema file, e.g. written by `snapshot`.
        live: PathBuf,

        /// Dialect used for normalization when no configuration is given.
        #[arg(long)]
        dialect: Option<String>,
    },

    /// Write the live database schema in the schema-file format.
    Snapshot {
        /// Output file; its extension picks the format. Prints TOML when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(status) => status.into(),
        Err(e) => {
            tracing::error!(error = %e, "Drift check failed");
            eprintln!("error: {:#}", e);
            DriftStatus::Failure.into()
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<DriftStatus> {
    let mut config = load_config(&cli)?;

    // Setup logging
    let logging = match (&config.logging, cli.verbose) {
        (Some(logging), false) => logging.clone(),
        (_, verbose) => default_logging(if verbose { "debug" } else { "warn" }),
    };
    init_logging(&logging).context("Failed to initialize logging")?;

    let format = cli.format.unwrap_or_else(|| config.output_format());

    match cli.command {
        Commands::Check { declared } => {
            if let Some(path) = declared {
                config.declared = Some(DeclaredConfig {
                    path: path.to_string_lossy().into_owned(),
                    default_nullable: config.declared.as_ref().and_then(|d| d.default_nullable),
                });
            }

            let checker = DriftChecker::new(config)?;
            let report = checker.run().await?;
            print_report(&report, format)?;
            Ok(report.status())
        }
        Commands::Diff {
            declared,
            live,
            dialect,
        } => {
            if let Some(dialect) = dialect {
                config.database.driver = dialect.parse::<Dialect>()?.to_string();
            }
            let default_nullable = config
                .declared
                .as_ref()
                .and_then(|d| d.default_nullable)
                .unwrap_or(true);

            let declared = DeclaredSchemaFile::new(declared)
                .with_default_nullable(default_nullable)
                .load()?;
            let live = DeclaredSchemaFile::new(live)
                .with_default_nullable(default_nullable)
                .as_side(SchemaSide::Live)
                .load()?;

            let report = DriftChecker::new(config)?.compare(&declared, &live)?;
            print_report(&report, format)?;
            Ok(report.status())
        }
        Commands::Snapshot { output } => {
            let model = DriftChecker::new(config)?.snapshot_live().await?;

            match output {
                Some(path) => write_schema_file(&path, &model)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => {
                    let rendered = SchemaFile::from_model(&model).render(SchemaFormat::Toml)?;
                    std::io::stdout().write_all(rendered.as_bytes())?;
                }
            }
            Ok(DriftStatus::NoDrift)
        }
    }
}

/// Configuration file if given, with the database URL flag on top
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match (&cli.config, &cli.database_url) {
        (Some(path), url) => {
            let path = path.to_string_lossy();
            let mut config = load_from_file(&path)
                .with_context(|| format!("Failed to load configuration from {}", path))?;
            if let Some(url) = url {
                let database = DatabaseConfig::from_url(url)?;
                config.database.driver = database.driver;
                config.database.url = database.url;
            }
            config
        }
        (None, Some(url)) => Config::new(DatabaseConfig::from_url(url)?, None),
        (None, None) => match &cli.command {
            // Offline comparison needs no database
            Commands::Diff { .. } => Config::new(
                DatabaseConfig {
                    driver: Dialect::Generic.to_string(),
                    url: String::new(),
                    pool_size: None,
                    timeout_seconds: None,
                    schema: None,
                },
                None,
            ),
            _ => anyhow::bail!("No database configured; pass --config or --database-url"),
        },
    };

    Ok(config)
}

fn print_report(report: &DriftReport, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Human => report.render(),
        OutputFormat::Json => format!("{}\n", report.to_json()?),
    };

    std::io::stdout().write_all(rendered.as_bytes())?;
    Ok(())
}
