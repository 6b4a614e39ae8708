mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use will_core::config::WillConfig;
use will_core::traits::ISessionProvider;
use will_storage::OfflineStore;
use will_sync::{
    ConnectivityMonitor, HttpCounterService, StaticSession, SyncCoordinator, TapOutcome,
    WillCounter,
};

use commands::{Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "will")]
#[command(about = "Daily tap counter with offline buffering and reconciliation", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User to sign in as
    #[arg(short, long)]
    user: Option<String>,

    /// Bearer token sent to the counter API
    #[arg(long)]
    token: Option<String>,

    /// Counter API base URL (overrides sync.endpoint_url)
    #[arg(long)]
    endpoint: Option<String>,

    /// Database path (overrides storage.db_path)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Start with the network reported as disconnected
    #[arg(long)]
    start_offline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => WillConfig::from_file(path)?,
        None => WillConfig::default(),
    };
    if let Some(endpoint) = args.endpoint {
        config.sync.endpoint_url = Some(endpoint);
    }
    if let Some(db) = &args.db {
        config.storage.db_path = db.display().to_string();
    }

    will_observability::try_init_from_config(&config.observability);

    let store = Arc::new(OfflineStore::open(&config.storage).context("opening offline store")?);
    tracing::info!(db = %config.storage.db_path, "offline store ready");

    let session = Arc::new(StaticSession::new());
    if let Some(user) = args.user {
        session.sign_in(user, args.token);
    }
    let remote = Arc::new(
        HttpCounterService::from_config(&config.sync, session.clone())
            .context("building counter API client")?,
    );

    let connectivity = ConnectivityMonitor::new(!args.start_offline);
    let coordinator = Arc::new(SyncCoordinator::new(
        store,
        remote,
        session.clone(),
        connectivity.clone(),
        config.sync.clone(),
    ));
    let counter = WillCounter::new(Arc::clone(&coordinator));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_loop = tokio::spawn(Arc::clone(&coordinator).run(shutdown_rx));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        match command {
            Command::Tap(n) => {
                for _ in 0..n {
                    match counter.increment().await {
                        Ok(TapOutcome::Sent { record }) => println!("sent, today: {}", record.count),
                        Ok(TapOutcome::Buffered { pending }) => println!("buffered, pending: {pending}"),
                        Err(e) => println!("tap lost: {e}"),
                    }
                }
            }
            Command::Online => {
                connectivity.set_connected(true);
                println!("online");
            }
            Command::Offline => {
                connectivity.set_connected(false);
                println!("offline");
            }
            Command::Sync => println!("{:?}", coordinator.sync_offline_data().await),
            Command::Refresh => match counter.refresh().await {
                Ok(Some(record)) => println!("today: {}", record.count),
                Ok(None) => println!("no record for today"),
                Err(e) => println!("refresh failed: {e}"),
            },
            Command::Status => print_status(&coordinator, session.as_ref()).await,
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    let _ = shutdown_tx.send(true);
    sync_loop.await.context("sync loop panicked")?;
    Ok(())
}

async fn print_status(coordinator: &SyncCoordinator, session: &dyn ISessionProvider) {
    let user = session
        .current_user()
        .map_or_else(|| "-".to_string(), |u| u.to_string());
    let pending = match coordinator.pending_count().await {
        will_core::Stored::Value(n) => n.to_string(),
        will_core::Stored::Unavailable { reason } => format!("unavailable ({reason})"),
    };
    println!("user:      {user}");
    println!("connected: {}", coordinator.connectivity().is_connected());
    println!("offline:   {}", coordinator.is_offline().await.or_default());
    println!("state:     {}", coordinator.state());
    println!("pending:   {pending}");
    println!("perceived: {}", coordinator.perceived_count().await);
}
