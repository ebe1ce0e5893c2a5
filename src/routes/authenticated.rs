use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Everything a signed-in user can do. The `AuthUser` layer sits on top of this router, so
/// every handler receives a validated identity; ownership rules are left to the policy.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Profile ---
        .route("/me", get(handlers::users::get_me))
        // GET /me/posts
        // The requester's posts, including pending and rejected ones.
        .route("/me/posts", get(handlers::posts::get_my_posts))
        .route("/users/{id}", get(handlers::users::get_user))
        // --- Posts ---
        .route("/posts", post(handlers::posts::create_post))
        .route(
            "/posts/{id}",
            put(handlers::posts::update_post).delete(handlers::posts::delete_post),
        )
        // POST/DELETE /posts/{id}/like
        // One like per (user, post).
        .route(
            "/posts/{id}/like",
            post(handlers::posts::like_post).delete(handlers::posts::unlike_post),
        )
        // POST /uploads/thumbnail
        // Presigned PUT URL; the image goes straight to object storage.
        .route(
            "/uploads/thumbnail",
            post(handlers::posts::get_thumbnail_upload_url),
        )
        // --- Comments ---
        .route("/posts/{id}/comments", post(handlers::comments::add_comment))
        // DELETE /posts/comments/{id}
        // Removes the comment together with every reply below it.
        .route(
            "/posts/comments/{id}",
            delete(handlers::comments::delete_comment),
        )
        // --- Taxonomy ---
        // Category creation is admin-only; the handler asks the policy.
        .route("/categories", post(handlers::taxonomy::create_category))
        .route("/tags", post(handlers::taxonomy::create_tag))
}
