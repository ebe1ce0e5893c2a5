use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Registration, login and the read side of the blog. Unpublished posts answer 404 here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Identity ---
        .route("/auth/register", post(handlers::users::register_user))
        .route("/auth/login", post(handlers::users::login_user))
        // GET /posts?page=&limit=&sort=&category=&tags=&author=&search=
        .route("/posts", get(handlers::posts::get_posts))
        .route("/posts/{id}", get(handlers::posts::get_post_details))
        // GET /posts/{id}/comments
        // Comments nested into reply threads.
        .route("/posts/{id}/comments", get(handlers::comments::get_post_comments))
        // --- Taxonomy ---
        .route("/categories", get(handlers::taxonomy::get_categories))
        .route("/tags", get(handlers::taxonomy::get_tags))
}
