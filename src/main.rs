use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_registration::api::router;
use course_registration::config::AppConfig;
use course_registration::open_store;
use course_registration::services::ReconcileScheduler;
use course_registration::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "course_registration=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;
    info!("using {:?} storage", config.storage);

    let store = open_store(&config).await?;

    if let Some(interval) = config.reconcile_interval {
        let scheduler = ReconcileScheduler::new(store.clone(), interval);
        tokio::spawn(scheduler.start());
    }

    let app = router(AppState::new(store));

    let addr = config.addr();
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
