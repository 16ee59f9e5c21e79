use anyhow::Context;
use cert_ledger_core::{
    chain::ChainStore,
    constants::{MAX_POW_DIFFICULTY, MIN_POW_DIFFICULTY, POW_TARGET_DIFFICULTY},
    Ledger, LedgerConfig,
};
use cert_ledger_storage::{JsonFileStore, SledStore};
use clap::{Parser, ValueEnum};
use std::{net::SocketAddr, path::PathBuf};
use tracing::{info, Level};

mod constants;
mod routes;

use constants::{DEFAULT_DATA_DIR, DEFAULT_LISTEN, SLED_DIR_NAME};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Single chain.json file
    Json,
    /// Embedded sled database
    Sled,
}

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Data directory for the chain
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = Backend::Json)]
    backend: Backend,

    /// Leading zero bits required of each sealed block (8 = hex prefix "00")
    #[arg(
        long,
        default_value_t = POW_TARGET_DIFFICULTY,
        value_parser = clap::value_parser!(u32)
            .range(MIN_POW_DIFFICULTY as i64..=MAX_POW_DIFFICULTY as i64)
    )]
    difficulty: u32,
}

fn open_store(args: &Args) -> anyhow::Result<Box<dyn ChainStore>> {
    Ok(match args.backend {
        Backend::Json => Box::new(JsonFileStore::in_dir(&args.data_dir)),
        Backend::Sled => Box::new(
            SledStore::open(args.data_dir.join(SLED_DIR_NAME))
                .with_context(|| format!("opening sled under {}", args.data_dir.display()))?,
        ),
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for ctrl-c");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let store = open_store(&args)?;
    let config = LedgerConfig::default().with_difficulty(args.difficulty);
    let ledger = Ledger::open(store, config).context("opening ledger")?;
    info!(
        blocks = ledger.len(),
        valid = ledger.is_chain_valid(),
        backend = ?args.backend,
        "ledger ready"
    );

    let app = routes::router(routes::AppState::new(ledger));

    let addr: SocketAddr = args.listen.parse()?;
    info!("cert-ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
