//! Practice Exam - local front end for timed practice sections
//!
//! This is the main entry point for the practice-exam application.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use practice_exam::{
    config::Config,
    create_router,
    services::JsonCatalog,
    shutdown_signal,
    state::AppState,
    store::FileStore,
    timer::SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("practice_exam={},tower_http=info", config.log_level()))
        .init();

    info!("Starting practice-exam v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, catalog={}, store={}",
        config.host,
        config.port,
        config.catalog.display(),
        config.store.display()
    );

    let catalog = JsonCatalog::from_path(&config.catalog)
        .with_context(|| format!("loading catalog {}", config.catalog.display()))?;
    let store = FileStore::open(&config.store);

    let state = Arc::new(AppState::new(
        Arc::new(catalog),
        Arc::new(store),
        Arc::new(SystemClock),
        config.banner_duration_ms(),
        config.port,
        config.host.clone(),
    ));

    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /tests                                  - List practice tests");
    info!("  GET    /test/:test_id/section/:section_id        - Open a section and start its timer");
    info!("  POST   /test/:test_id/section/:section_id/answer - Record an answer");
    info!("  POST   /test/:test_id/section/:section_id/submit - Submit and grade");
    info!("  GET    /test/:test_id/section/:section_id/report - Graded report");
    info!("  DELETE /test/:test_id/section/:section_id        - Leave a section");
    info!("  GET    /dashboard                              - Role-based dashboard");
    info!("  GET    /health                                 - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Deadlines stay in the store so open sections resume on the next run
    state.shutdown();
    info!("Server shutdown complete");
    Ok(())
}
