use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::error;

use dojo_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Root for uploaded files, served under `/media`.
    pub media_dir: PathBuf,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>, media_dir: impl Into<PathBuf>) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret: jwt_secret.into(),
            media_dir: media_dir.into(),
        })
    }
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
        })?
}

/// The local calendar date that "current quarter" stats and default record dates use.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
