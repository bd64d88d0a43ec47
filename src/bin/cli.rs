use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use stackflow::prelude::*;
use stackflow::workflow::PurgeSummary;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_CONFIG: &str = "stackflow.yml";

#[derive(Parser)]
#[command(name = "stackflow")]
#[command(about = "Deploy and purge cloud infrastructure stacks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the project config file (default: stackflow.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Stack-management API endpoint (overrides config)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the service into an environment
    Deploy {
        /// Name of the target environment
        #[arg(value_name = "ENVIRONMENT")]
        environment: String,

        /// Image tag to deploy (default: repo revision, then "latest")
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Tear down every stack the tool created
    Purge,
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) -> anyhow::Result<()> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let filter = if verbose {
        "stackflow=debug"
    } else {
        "stackflow=info"
    };

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("stackflow");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
    Ok(())
}

#[cfg(not(feature = "otel"))]
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "stackflow=debug"
    } else {
        "stackflow=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    {
        if let Err(e) = init_otel_tracing(cli.verbose) {
            eprintln!("Failed to initialise OpenTelemetry: {}", e);
            return ExitCode::from(2);
        }
    }

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Setup failed");
            ExitCode::from(2)
        }
    }
}

/// Explicit paths must exist; the default one may be absent
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(DEFAULT_CONFIG).exists() => Ok(Config::load(DEFAULT_CONFIG)?),
        None => {
            tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG);
            Ok(Config::default())
        }
    }
}

/// Set the flag on the first interrupt; true once a second one arrives
async fn watch_interrupts<F, Fut>(mut interrupted: F, flag: Arc<AtomicBool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupted().await.is_err() {
        return false;
    }
    tracing::warn!("Interrupted, cancelling after the current poll (Ctrl-C again to exit)");
    flag.store(true, Ordering::SeqCst);

    interrupted().await.is_ok()
}

/// Flag the tracker checks before every poll
fn cancellation_flag() -> Arc<AtomicBool> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, flag).await {
            tracing::error!("Interrupted again, exiting");
            std::process::exit(130);
        }
    });
    cancelled
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.api.endpoint = endpoint;
    }

    let ctx = Context::http(config, cancellation_flag())?;

    match cli.command {
        Commands::Deploy { environment, tag } => deploy(ctx, environment, tag).await,
        Commands::Purge => purge(ctx).await,
    }
}

async fn deploy(ctx: Context, environment: String, tag: Option<String>) -> anyhow::Result<bool> {
    match DeployWorkflow::new(ctx, environment, tag).run().await {
        Ok(outcome) => {
            println!(
                "Deployed '{}' ({}) to stack '{}'",
                outcome.service.name, outcome.tag.tag, outcome.deployed.stack.name
            );
            if let Some(arn) = &outcome.deployed.job_definition_arn {
                println!("Job definition: {}", arn);
            }
            Ok(true)
        }
        Err(e) => {
            tracing::error!(error = %e, "Deploy failed");
            Ok(false)
        }
    }
}

async fn purge(ctx: Context) -> anyhow::Result<bool> {
    let mut stdout = std::io::stdout();
    match PurgeWorkflow::new(ctx).run(&mut stdout).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(true)
        }
        Err(e) => {
            tracing::error!(error = %e, "Purge failed");
            Ok(false)
        }
    }
}

fn print_summary(summary: &PurgeSummary) {
    println!(
        "\nPurge: {} stacks, {} steps, {} succeeded, {} failed",
        summary.discovered,
        summary.planned,
        summary.report.succeeded,
        summary.report.failed()
    );
    for failure in &summary.report.failures {
        println!("  ✗ {}: {}", failure.step, failure.error);
    }
}
