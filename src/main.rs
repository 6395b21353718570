use docgate::config::{Config, redact_uri};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        loglevel = %cfg.basic.loglevel,
        body_limit = cfg.basic.body_limit
    );
    for (name, uri) in &cfg.databases {
        info!(database = %name, uri = %redact_uri(uri), "database configured");
    }

    // Build axum router and serve
    let state = docgate::router::GatewayState::from_config(&cfg);
    info!(
        collections = ?state.models.schemas().names(),
        "structural contracts registered"
    );
    let app = docgate::router::gateway_router(state, cfg.basic.body_limit);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
