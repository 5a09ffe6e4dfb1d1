mod config;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use dojo_api::AppStateInner;

use crate::config::{Config, Environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dojo=debug,dojo_api=debug,dojo_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.environment == Environment::Dev && config.jwt_secret == "dev-secret-change-me" {
        warn!("Using the development JWT secret; set DOJO_JWT_SECRET before exposing this server");
    }

    // Init database
    let db = dojo_db::Database::open(&config.db_path)?;
    for username in &config.staff_users {
        if db.set_staff(username, true)? {
            info!("Granted staff to {}", username);
        } else {
            warn!("DOJO_STAFF_USERS names unknown user '{}'", username);
        }
    }

    tokio::fs::create_dir_all(&config.media_dir).await?;

    let state = AppStateInner::new(db, config.jwt_secret.clone(), config.media_dir.clone());

    let app = dojo_api::router(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    info!("Dojo server listening on {} ({:?})", config.addr, config.environment);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring malformed origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
