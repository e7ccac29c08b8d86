use std::net::SocketAddr;

use dispatch::{Dispatcher, DispatchConfig, Env};
use tracing_subscriber::prelude::*;

fn load_env() -> Env {
    dotenvy::dotenv().ok();
    envy::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to parse environment, falling back to defaults");
        Env::default()
    })
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let env = load_env();
    let addr = SocketAddr::from((
        env.host.parse::<std::net::IpAddr>().unwrap_or([0, 0, 0, 0].into()),
        env.port,
    ));
    let config = DispatchConfig::new(&env);
    let dispatcher = Dispatcher::new(config);
    let app = dispatch::router(dispatcher);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("shutdown_signal_received");
}
