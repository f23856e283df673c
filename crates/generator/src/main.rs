//! QuizForge Generator
//!
//! Seeds the question bank for NEET practice:
//! 1. Walks the subject → chapter taxonomy
//! 2. Resolves (or creates) a topic per chapter
//! 3. Assembles 100-question sets from curated and generic templates
//! 4. Writes each set in batches inside one transaction

mod assembler;
mod batcher;
mod errors;
mod orchestrator;
mod progress;
mod retry;
mod taxonomy;
mod templates;
mod topics;

use crate::errors::GeneratorError;
use crate::orchestrator::Orchestrator;
use crate::progress::ProgressReport;
use crate::taxonomy::Taxonomy;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use quizforge_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    metrics::{register_metrics, METRICS_PREFIX, PERSIST_BUCKETS},
    store::{MemoryStore, QuestionStore},
    VERSION,
};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quizforge")]
#[command(author, version, about = "Generate NEET practice question sets", long_about = None)]
struct Cli {
    /// Configuration file; layered config/ files and APP__ variables otherwise
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and store question sets (default)
    Generate(GenerateArgs),
    /// Show curated versus placeholder counts per topic
    Progress,
}

#[derive(Args, Debug, Default)]
struct GenerateArgs {
    /// Stop after this many sets
    #[arg(long)]
    target_sets: Option<u32>,

    /// Questions per set
    #[arg(long)]
    set_size: Option<usize>,

    /// Seed for reproducible generic questions
    #[arg(long)]
    seed: Option<u64>,

    /// Generate into memory without touching the database
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Generate(GenerateArgs::default()));

    let overrides = match &command {
        Command::Generate(args) => Some(args),
        Command::Progress => None,
    };
    let config = match load_config(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.observability);
    info!("Starting QuizForge Generator v{}", VERSION);

    if let Err(e) = init_metrics(&config.observability) {
        warn!(error = %e, "Metrics exporter disabled");
    }

    let span = info_span!("run", service = %config.observability.service_name);
    let result = async {
        match command {
            Command::Generate(args) => generate(&config, args.dry_run).await,
            Command::Progress => progress(&config).await,
        }
    }
    .instrument(span)
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(
                code = e.code().as_code(),
                error = %e,
                transient = e.is_transient(),
                "Generator failed"
            );
            eprintln!("\nError: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&str>, args: Option<&GenerateArgs>) -> Result<AppConfig, GeneratorError> {
    let mut config = match path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .map_err(|e| GeneratorError::ConfigError(e.to_string()))?;

    if let Some(args) = args {
        apply_overrides(&mut config, args);
    }

    config
        .validate()
        .map_err(|e| GeneratorError::ConfigError(e.to_string()))?;
    Ok(config)
}

/// Command-line flags take precedence over files and environment
fn apply_overrides(config: &mut AppConfig, args: &GenerateArgs) {
    if let Some(target) = args.target_sets {
        config.generator.total_sets_target = target;
    }
    if let Some(set_size) = args.set_size {
        config.generator.set_size = set_size;
    }
    if args.seed.is_some() {
        config.generator.seed = args.seed;
    }
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // stdout carries the run summary, so logs go to stderr
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn init_metrics(config: &ObservabilityConfig) -> Result<(), GeneratorError> {
    register_metrics();
    if config.metrics_port == 0 {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_set_persist_duration_seconds", METRICS_PREFIX)),
            PERSIST_BUCKETS,
        )
        .and_then(|builder| builder.install())
        .map_err(|e| GeneratorError::ConfigError(format!("metrics exporter: {}", e)))?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

async fn open_store(config: &AppConfig, dry_run: bool) -> Result<Arc<dyn QuestionStore>, GeneratorError> {
    if dry_run {
        info!("Dry run: using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let repository = Repository::new(DbPool::new(&config.database).await?);
    repository.ping().await?;
    Ok(Arc::new(repository))
}

async fn generate(config: &AppConfig, dry_run: bool) -> Result<(), GeneratorError> {
    let generator = &config.generator;
    println!(
        "Starting generation of up to {} question sets ({} questions each){}",
        generator.total_sets_target,
        generator.set_size,
        if dry_run { " [dry run]" } else { "" }
    );

    let store = open_store(config, dry_run).await?;
    let mut orchestrator = Orchestrator::from_config(store, config)?;
    let report = orchestrator.run().await?;

    println!("\n{}", report);
    println!("Question generation completed successfully!");
    Ok(())
}

async fn progress(config: &AppConfig) -> Result<(), GeneratorError> {
    let store = open_store(config, false).await?;
    let report = progress_report(store.as_ref(), config).await?;
    println!("{}", report);
    Ok(())
}

async fn progress_report(store: &dyn QuestionStore, config: &AppConfig) -> Result<ProgressReport, GeneratorError> {
    let order: Vec<_> = Taxonomy::from_config(config.generator.taxonomy.as_deref())?
        .subjects()
        .collect();
    ProgressReport::collect(store, &order).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config_path() -> String {
        format!("{}/../../config/default.toml", env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn test_parse_generate_flags() {
        let cli = Cli::try_parse_from([
            "quizforge",
            "generate",
            "--target-sets",
            "3",
            "--set-size",
            "10",
            "--seed",
            "7",
            "--dry-run",
        ])
        .unwrap();

        let Some(Command::Generate(args)) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(args.target_sets, Some(3));
        assert_eq!(args.set_size, Some(10));
        assert_eq!(args.seed, Some(7));
        assert!(args.dry_run);
    }

    #[test]
    fn test_no_subcommand_and_global_config() {
        let cli = Cli::try_parse_from(["quizforge"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["quizforge", "progress", "--config", "custom.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Progress)));
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = AppConfig::default();
        let args = GenerateArgs {
            target_sets: Some(12),
            seed: Some(99),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.generator.total_sets_target, 12);
        assert_eq!(config.generator.seed, Some(99));
        assert_eq!(config.generator.set_size, 100);
    }

    #[test]
    fn test_zero_set_size_flag_rejected() {
        let args = GenerateArgs {
            set_size: Some(0),
            ..Default::default()
        };
        let err = load_config(Some(&default_config_path()), Some(&args)).unwrap_err();

        assert!(matches!(err, GeneratorError::ConfigError(_)));
        assert!(err.to_string().contains("generator.set_size"));
    }

    #[tokio::test]
    async fn test_dry_run_generates_in_memory() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            &GenerateArgs {
                target_sets: Some(2),
                set_size: Some(10),
                seed: Some(5),
                dry_run: true,
            },
        );

        generate(&config, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_progress_report_follows_taxonomy_order() {
        let store = MemoryStore::new();
        let mut config = AppConfig::default();
        config.generator.set_size = 10;
        config.generator.total_sets_target = 1;

        Orchestrator::from_config(Arc::new(store.clone()), &config)
            .unwrap()
            .run()
            .await
            .unwrap();

        let report = progress_report(&store, &config).await.unwrap();
        let text = report.to_string();
        assert!(text.contains("Total Questions: 10"), "{}", text);
        assert!(text.find("PHYSICS").unwrap() < text.find("CHEMISTRY").unwrap());
    }
}
