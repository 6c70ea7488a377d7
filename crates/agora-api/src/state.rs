use std::sync::Arc;

use agora_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret: jwt_secret.into(),
        })
    }
}

/// Run a blocking database call off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, crate::ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            crate::ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(crate::ApiError::from)
}
