use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use reminder_cell::ReminderScheduler;
use shared_config::AppConfig;
use shared_database::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API server");

    let config = AppConfig::from_env();
    info!(
        "Store backend: {}",
        if config.is_redis_configured() { "redis" } else { "in-memory" }
    );
    let port = config.server_port;
    let scheduler_enabled = config.reminder_scheduler_enabled;

    let state = AppState::from_config(config)
        .await
        .context("failed to initialize the store")?;

    // The in-process sweep loop is optional; deployments with an external cron call
    // POST /reminders/sweep instead.
    let scheduler = scheduler_enabled.then(|| Arc::new(ReminderScheduler::from_state(&state)));
    let scheduler_task = scheduler.clone().map(|scheduler| {
        tokio::spawn(async move { scheduler.run().await })
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let (Some(scheduler), Some(task)) = (scheduler, scheduler_task) {
        scheduler.shutdown();
        match task.await {
            Ok(sweeps) => info!("Reminder scheduler finished after {} sweeps", sweeps),
            Err(e) => warn!("Reminder scheduler task ended abnormally: {}", e),
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
