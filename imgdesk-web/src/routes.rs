//! Route definitions for the web console

use crate::{handlers, AppState};
use axum::{
    routing::get,
    Router,
};

/// Pages and form targets; all of them run inside a session
pub fn console_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/images", get(handlers::list_images))
        .route(
            "/image",
            get(handlers::new_image).post(handlers::create_image),
        )
        .route(
            "/image/{id}",
            get(handlers::show_image)
                .put(handlers::update_image)
                .delete(handlers::delete_image)
                // HTML forms can only POST; `_method` picks the verb
                .post(handlers::override_method),
        )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health_check))
}
