use anyhow::Result;
use clickd::{default_socket_path, CommandDispatcher, InputInjector, Server, TreeScanner};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let socket_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_socket_path);

    // Both subsystems may be absent (no accessibility bus, no uinput
    // access); the service still answers, degraded.
    let engine = match clickd::platforms::create_engine().await {
        Ok(engine) => Some(engine),
        Err(e) => {
            warn!(error = %e, "accessibility engine unavailable; scans will be empty");
            None
        }
    };
    let injector = InputInjector::new();
    if !injector.available() {
        warn!("input injection unavailable; clicks fall back to native actions only");
    }

    let dispatcher = CommandDispatcher::new(TreeScanner::new(engine), injector);
    let server = Server::bind(&socket_path)?;
    info!(path = %socket_path.display(), "clickd ready");

    server
        .serve(dispatcher, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
