pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod records;
pub mod rooms;
pub mod state;
pub mod users;
mod validate;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All HTTP routes. Reads are public; writes pass through `require_auth`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/profiles", get(users::home))
        .route("/users/{user_id}", get(users::user_profile))
        .route("/users/{user_id}/stats", get(users::stats))
        .route("/users/{user_id}/records/{kind}", get(records::list_records))
        .route("/rooms", get(rooms::rooms))
        .route("/rooms/{room_id}", get(rooms::room))
        .route("/topics", get(rooms::topics))
        .route("/activity", get(rooms::activity))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/me", put(users::update_user))
        .route(
            "/users/me/picture",
            put(users::upload_picture).layer(DefaultBodyLimit::max(users::MAX_PICTURE_SIZE)),
        )
        .route("/users/{user_id}/records/{kind}", post(records::create_record))
        .route("/records/{record_id}", put(records::update_record).delete(records::delete_record))
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/{room_id}", put(rooms::update_room).delete(rooms::delete_room))
        .route("/rooms/{room_id}/messages", post(messages::send_message))
        .route("/messages/{message_id}", delete(messages::delete_message))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/media", ServeDir::new(&state.media_dir))
}
