use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use teamline_api::state::AppState;
use teamline_bridge::SlackBridge;
use teamline_gateway::rooms::RoomRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teamline=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("TEAMLINE_DB_PATH").unwrap_or_else(|_| "teamline.db".into());
    let host = std::env::var("TEAMLINE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TEAMLINE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = teamline_db::Database::open(&PathBuf::from(&db_path))?;

    // The room registry lives for the whole process; it is the single
    // fan-out point for every broadcast.
    let rooms = RoomRegistry::new();

    let bridge = SlackBridge::from_env();
    if bridge.is_some() {
        info!("External chat mirror configured");
    }

    let state = AppState::new(Arc::new(db), rooms, bridge);

    let app = teamline_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Teamline server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
