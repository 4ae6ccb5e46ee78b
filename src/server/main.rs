use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;
use vox_session::server::{
    LifecycleController, MemoryStorage, SessionRepository, WebSocketListener,
};

#[derive(Parser)]
#[command(name = "vox-session", about = "Anonymous voice chat matchmaking and signaling server")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Tell a requester immediately when nobody is waiting, instead of
    /// leaving it searching silently.
    #[arg(long, default_value_t = false)]
    notify_unmatched: bool,

    /// Seconds between session stats log lines (0 disables).
    #[arg(long, default_value_t = 60)]
    stats_interval: u64,
}

#[tokio::main]
pub async fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vox_session=debug"));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(true)
        .init();

    let args = Args::parse();
    let storage = Arc::new(MemoryStorage::new());
    let controller = Arc::new(
        LifecycleController::new(storage.clone(), storage.clone())
            .notify_unmatched(args.notify_unmatched),
    );

    if args.stats_interval > 0 {
        let stats_storage = storage.clone();
        let interval = Duration::from_secs(args.stats_interval);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match stats_storage.counts().await {
                    Ok(counts) => tracing::info!(
                        active = counts.active,
                        waiting = counts.waiting,
                        connected = counts.connected,
                        "Session stats"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Failed to read session stats"),
                }
            }
        });
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = WebSocketListener::new(controller, addr);
    listener.run().await;
}
