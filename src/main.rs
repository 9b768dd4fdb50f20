use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flashdeck::{config, db, handlers, state::AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "flashdeck=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let app_config = config::load_config();

  if let Err(e) = app_config.scheduler.validate() {
    tracing::error!("Refusing to start: {}", e);
    std::process::exit(1);
  }

  let pool = db::init_db(&app_config.database_path).expect("Failed to initialize database");
  let store = Arc::new(db::SqliteStore::new(pool));

  let bind_addr = app_config.bind_addr();
  let port = app_config.server_port;
  let app = handlers::router(AppState::new(store, app_config));

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
