//! wiretwin command-line front end
//!
//! Fingerprints and diffs entries of a capture archive, and validates, infers
//! and profiles JSON bodies against schemas.
//!
//! Usage:
//!   wiretwin --archive capture.json fingerprint <entry_id>
//!   wiretwin --archive capture.json diff <baseline_id> <candidate_id>
//!   wiretwin schema validate <schema_file> <sample>...
//!   wiretwin schema infer <sample>...
//!   wiretwin schema stats <schema_file> <sample>...
//!
//! Results are printed to stdout as pretty JSON; logs go to stderr.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use wiretwin_core::{
    Config, DiffRequest, FingerprintEngine, InMemoryEntryCache, InMemoryEntryStore,
};
use wiretwin_schema::{field_stats, infer, parse, Format, InferOptions, Validator};

#[derive(Parser, Debug)]
#[command(name = "wiretwin")]
#[command(author, version, about = "Compare captured HTTP entries and check body schemas")]
struct Cli {
    /// Capture archive (JSON) holding sessions and side channels
    #[arg(short, long, global = true, env = "WIRETWIN_ARCHIVE")]
    archive: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long, global = true, env = "WIRETWIN_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the fingerprint of one entry
    Fingerprint {
        entry_id: String,

        /// Session holding the entry ("active" resolves to the archive's active session)
        #[arg(short, long, default_value = "active")]
        session: String,
    },

    /// Compare two entries of the same session
    Diff {
        baseline_id: String,
        candidate_id: String,

        #[arg(short, long, default_value = "active")]
        session: String,

        /// Skip the TLS comparison
        #[arg(long)]
        no_tls: bool,

        /// Skip the HTTP/2 comparison
        #[arg(long)]
        no_http2: bool,

        /// Skip header presence and value comparison
        #[arg(long)]
        no_headers: bool,

        /// Skip header order comparison
        #[arg(long)]
        no_header_order: bool,

        /// Extra header to ignore (repeatable); replaces the configured list
        #[arg(long = "ignore-header")]
        ignore_headers: Vec<String>,

        /// Extra query key to ignore (repeatable); replaces the configured list
        #[arg(long = "ignore-query-key")]
        ignore_query_keys: Vec<String>,
    },

    /// Schema tooling for JSON bodies
    #[command(subcommand)]
    Schema(SchemaCommand),
}

#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Validate samples against a schema
    Validate {
        schema: PathBuf,
        #[arg(required = true)]
        samples: Vec<PathBuf>,

        /// record-type, fluent-dsl or json-schema (guessed from the extension when omitted)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Infer a JSON Schema from samples
    Infer {
        #[arg(required = true)]
        samples: Vec<PathBuf>,

        /// Treat keys that are null in any sample as optional
        #[arg(long)]
        nullable_optional: bool,

        /// Force additionalProperties on every inferred object
        #[arg(long)]
        additional_properties: Option<bool>,
    },

    /// Per-field statistics of samples under a schema
    Stats {
        schema: PathBuf,
        #[arg(required = true)]
        samples: Vec<PathBuf>,

        #[arg(short, long)]
        format: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Fingerprint { entry_id, session } => {
            let engine = fingerprint_engine(cli.archive.as_deref(), &config)?;
            let fingerprint = engine
                .generate(&session, &entry_id, Some(&config.fingerprint))
                .await?;
            print_json(&fingerprint)?;
        }
        Command::Diff {
            baseline_id,
            candidate_id,
            session,
            no_tls,
            no_http2,
            no_headers,
            no_header_order,
            ignore_headers,
            ignore_query_keys,
        } => {
            let engine = config.diff_engine(fingerprint_engine(cli.archive.as_deref(), &config)?);
            let request = DiffRequest {
                session_id: session,
                compare_tls: no_tls.then_some(false),
                compare_http2: no_http2.then_some(false),
                compare_headers: no_headers.then_some(false),
                compare_header_order: no_header_order.then_some(false),
                ignore_headers: (!ignore_headers.is_empty()).then_some(ignore_headers),
                ignore_query_keys: (!ignore_query_keys.is_empty()).then_some(ignore_query_keys),
                ..DiffRequest::new(baseline_id, candidate_id)
            };
            let result = engine.diff(&request).await?;
            print_json(&result)?;
        }
        Command::Schema(command) => return run_schema(command),
    }

    Ok(ExitCode::SUCCESS)
}

fn fingerprint_engine(archive: Option<&Path>, config: &Config) -> anyhow::Result<FingerprintEngine> {
    let Some(path) = archive else {
        bail!("--archive is required for this command");
    };
    let store = InMemoryEntryStore::load_from_file(path)
        .with_context(|| format!("failed to load archive {}", path.display()))?;
    let cache = InMemoryEntryCache::new(config.cache.clone());
    Ok(FingerprintEngine::new(Arc::new(store), Arc::new(cache)))
}

fn run_schema(command: SchemaCommand) -> anyhow::Result<ExitCode> {
    match command {
        SchemaCommand::Validate {
            schema,
            samples,
            format,
        } => {
            let format = resolve_format(&schema, format.as_deref())?;
            let text = read_text(&schema)?;
            let validator = Validator::new(&text, format)
                .with_context(|| format!("invalid schema {}", schema.display()))?;

            let mut invalid = 0usize;
            let mut reports = Vec::with_capacity(samples.len());
            for sample in &samples {
                let bytes = std::fs::read(sample)
                    .with_context(|| format!("failed to read {}", sample.display()))?;
                let result = match validator.validate(&bytes) {
                    Ok(result) => result,
                    Err(e) => wiretwin_schema::ValidationResult {
                        valid: false,
                        errors: vec![e.to_string()],
                    },
                };
                if !result.valid {
                    invalid += 1;
                }
                reports.push(json!({
                    "file": sample.display().to_string(),
                    "valid": result.valid,
                    "errors": result.errors,
                }));
            }

            debug!("{} of {} samples invalid", invalid, samples.len());
            print_json(&json!({
                "schema": schema.display().to_string(),
                "format": format,
                "warnings": validator.warnings(),
                "valid": invalid == 0,
                "samples": reports,
            }))?;

            Ok(if invalid == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        SchemaCommand::Infer {
            samples,
            nullable_optional,
            additional_properties,
        } => {
            let bodies = read_samples(&samples)?;
            let opts = InferOptions {
                mark_nullable_as_optional: nullable_optional,
                additional_properties,
                ..Default::default()
            };
            let result = infer(&bodies, &opts);
            info!("Inferred schema from {} samples", result.sample_count);
            print_json(&result)?;
            Ok(ExitCode::SUCCESS)
        }
        SchemaCommand::Stats {
            schema,
            samples,
            format,
        } => {
            let format = resolve_format(&schema, format.as_deref())?;
            let parsed = parse(&read_text(&schema)?, format)
                .with_context(|| format!("invalid schema {}", schema.display()))?;
            let bodies = read_samples(&samples)?;
            print_json(&field_stats(&parsed.schema, &bodies))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_format(schema: &Path, explicit: Option<&str>) -> anyhow::Result<Format> {
    if let Some(format) = explicit {
        return Ok(format.parse()?);
    }
    match Format::from_extension(schema) {
        Some(format) => Ok(format),
        None => bail!(
            "cannot guess the schema format of {}; pass --format",
            schema.display()
        ),
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_samples(paths: &[PathBuf]) -> anyhow::Result<Vec<Vec<u8>>> {
    paths
        .iter()
        .map(|p| std::fs::read(p).with_context(|| format!("failed to read {}", p.display())))
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
