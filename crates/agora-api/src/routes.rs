use axum::{
    Router, middleware,
    routing::get,
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{messages, threads};

/// All thread and message routes. Every route requires a bearer token.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/threads", get(threads::list_threads).post(threads::create_thread))
        .route("/threads/{thread_id}", get(threads::get_thread))
        .route(
            "/threads/{thread_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/threads/{thread_id}/messages/since", get(messages::get_messages_since))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
