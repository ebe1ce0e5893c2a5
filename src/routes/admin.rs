use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Moderation and oversight, nested under `/admin`. The router is wrapped in the same
/// authentication layer as the authenticated routes; the admin role itself is checked by
/// the policy inside each handler.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Users, posts, comments, likes and the size of the review queue.
        .route("/stats", get(handlers::admin::get_admin_stats))
        // GET /admin/posts?status=pending
        .route("/posts", get(handlers::admin::get_admin_posts))
        .route("/posts/{id}/approve", post(handlers::admin::approve_post))
        .route("/posts/{id}/reject", post(handlers::admin::reject_post))
        // GET lists accounts; POST creates one with an explicit role.
        .route(
            "/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
}
