#![warn(clippy::all, rust_2018_idioms)]

use acm_collector::app::aws_services::collect_acm_certificates;
use acm_collector::app::collector::CollectorConfig;
use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str =
    "acm_collector=info,aws_config=warn,aws_sigv4=warn,aws_smithy_runtime=warn,aws_smithy_runtime_api=warn,hyper=warn";

/// Collect and describe every ACM certificate across AWS regions
#[derive(Debug, Parser)]
#[command(
    name = "acm-collector",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT"), ")")
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, env = "ACM_COLLECTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Region to collect; repeat to collect several. Overrides the config file
    #[arg(short, long = "region", value_name = "REGION")]
    regions: Vec<String>,

    /// Named AWS profile. Overrides the config file
    #[arg(long)]
    profile: Option<String>,

    /// Write the JSON snapshot here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_logging() {
    // stdout carries the snapshot, so logs go to stderr
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
        return;
    }

    // Must run after the subscriber is installed
    if let Err(e) = install_log_bridge() {
        eprintln!("Failed to initialize log-to-tracing bridge: {}", e);
    }
}

/// Route `log` records from dependencies into `tracing`.
///
/// Records from this crate are skipped: the `log_*` macros already emit them through
/// `tracing` directly.
fn install_log_bridge() -> Result<(), log::SetLoggerError> {
    tracing_log::LogTracer::builder()
        .ignore_crate(env!("CARGO_CRATE_NAME"))
        .init()
}

fn resolve_config(cli: &Cli) -> Result<CollectorConfig> {
    let mut config = match &cli.config {
        Some(path) => CollectorConfig::load(path)?,
        None => match CollectorConfig::default_path() {
            Some(path) => CollectorConfig::load_or_default(&path)?,
            None => CollectorConfig::default(),
        },
    };

    if !cli.regions.is_empty() {
        config.regions = cli.regions.clone();
    }
    if cli.profile.is_some() {
        config.profile = cli.profile.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    if config.regions.is_empty() {
        warn!("No regions configured, the snapshot will be empty");
    }

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }
    let sdk_config = loader.load().await;
    let credentials = sdk_config
        .credentials_provider()
        .context("No AWS credentials provider could be resolved")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling collection");
            on_interrupt.cancel();
        }
    });

    info!("Collecting ACM certificates in {} regions", config.regions.len());
    let snapshot =
        collect_acm_certificates(&sdk_config, &credentials, &config.regions, &config, &cancel)
            .await
            .context("ACM collection failed")?;

    // Sorted keys keep snapshots diffable
    let snapshot: BTreeMap<_, _> = snapshot.into_iter().collect();
    match &cli.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(file, &snapshot)?;
            info!("Snapshot written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &snapshot)?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("capture buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("capture buffer")).into_owned()
        }
    }

    #[test]
    fn test_log_bridge_forwards_dependency_records_once() {
        let _ = install_log_bridge();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            log::warn!(target: "aws_smithy_runtime::client", "dependency record via log");
            acm_collector::log_warn!("collector record via macros");
        });

        let output = captured.text();
        assert!(
            output.contains("dependency record via log"),
            "log records from dependencies reach tracing: {}",
            output
        );
        assert_eq!(
            output.matches("collector record via macros").count(),
            1,
            "crate records are emitted once: {}",
            output
        );
    }
}
