use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use rebind_core::app::{RecoveryBuilder, RecoveryConfig};
use rebind_core::domain::{LiveGraph, RecoveryError, RecoveryPhase};
use rebind_core::impls::{BrokerObjectFactory, JsonFileRecordStore};

/// Restore durable broker configuration from a record snapshot.
#[derive(Debug, Parser)]
#[command(name = "rebind-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one recovery pass over a JSON record file and print a summary.
    Recover {
        /// JSON array of persisted records.
        records: PathBuf,

        /// TOML file with `on_malformed` / `on_unresolved` policies.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip failing records instead of aborting (overrides --config).
        #[arg(long)]
        permissive: bool,

        /// Declare the standard exchanges before reading records.
        #[arg(long)]
        standard_exchanges: bool,
    },
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    phase: RecoveryPhase,
    records_read: usize,
    resolved: usize,
    exchanges: Vec<&'a str>,
    queues: Vec<&'a str>,
    bindings: Vec<String>,
    failures: &'a [RecoveryError],
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Recover {
            records,
            config,
            permissive,
            standard_exchanges,
        } => match recover(records, config, permissive, standard_exchanges).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("{e}");
                ExitCode::from(2)
            }
        },
    }
}

async fn recover(
    records: PathBuf,
    config: Option<PathBuf>,
    permissive: bool,
    standard_exchanges: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = match (permissive, config) {
        (true, _) => RecoveryConfig::permissive(),
        (false, Some(path)) => RecoveryConfig::load(&path)?,
        (false, None) => RecoveryConfig::default(),
    };

    let factory = Arc::new(BrokerObjectFactory::default());
    let mut graph = LiveGraph::new();
    if standard_exchanges {
        let declared = factory.declare_standard_exchanges(&mut graph)?;
        tracing::info!(exchanges = declared.len(), "standard exchanges declared");
    }

    let coordinator = RecoveryBuilder::with_broker_defaults()
        .config(config)
        .factory(factory)
        .build()?;
    tracing::info!(
        types = ?coordinator.registry().registered_types(),
        "recoverers registered"
    );
    let store = JsonFileRecordStore::new(records);
    let outcome = coordinator.recover_from_store(&store, &mut graph).await?;

    let summary = Summary {
        phase: outcome.phase,
        records_read: outcome.records_read,
        resolved: outcome.resolved.len(),
        exchanges: graph.exchanges().map(|e| e.name.as_str()).collect(),
        queues: graph.queues().map(|q| q.name.as_str()).collect(),
        bindings: graph
            .bindings()
            .map(|b| format!("{} -[{}]-> {}", b.exchange.name, b.binding_key, b.queue.name))
            .collect(),
        failures: &outcome.failures,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(if outcome.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
