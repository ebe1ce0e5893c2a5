use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use super::{
    posts::{PostQuery, list_page},
    users::create_account,
};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{AdminDashboardStats, Page, Post, PostStatus, RegisterRequest, User},
    policy::{self, Action, Resource},
    response::ApiResponse,
};

/// get_admin_stats
///
/// [Admin Route] Global counters for the dashboard.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Counters", body = AdminDashboardStats),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn get_admin_stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<AdminDashboardStats>> {
    policy::authorize(&auth, Action::ViewDashboard, &Resource::System)?;
    Ok(ApiResponse::ok(state.repo.get_stats().await?))
}

/// get_admin_posts
///
/// [Admin Route] Posts in any moderation state. Pass `status=pending` for the review queue.
#[utoipa::path(
    get,
    path = "/admin/posts",
    params(PostQuery),
    responses(
        (status = 200, description = "One page of posts", body = [Post]),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn get_admin_posts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<ApiResponse<Page<Post>>> {
    policy::authorize(&auth, Action::ModeratePosts, &Resource::System)?;
    let filter = query.into_filter()?;
    Ok(ApiResponse::ok(list_page(&state, filter).await?))
}

async fn moderate(
    auth: &AuthUser,
    state: &AppState,
    id: Uuid,
    status: PostStatus,
) -> Result<ApiResponse<Post>> {
    policy::authorize(auth, Action::ModeratePosts, &Resource::System)?;

    let post = state
        .repo
        .set_post_status(id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    tracing::info!(post_id = %id, moderator = %auth.id, status = ?status, "post moderated");
    Ok(ApiResponse::ok(post))
}

/// approve_post
///
/// [Admin Route] Publishes a post on the public routes.
#[utoipa::path(
    post,
    path = "/admin/posts/{id}/approve",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Approved", body = Post),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn approve_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Post>> {
    moderate(&auth, &state, id, PostStatus::Approved).await
}

/// reject_post
///
/// [Admin Route] Hides a post from the public routes.
#[utoipa::path(
    post,
    path = "/admin/posts/{id}/reject",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Rejected", body = Post),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn reject_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Post>> {
    moderate(&auth, &state, id, PostStatus::Rejected).await
}

/// list_users
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<User>>> {
    policy::authorize(&auth, Action::ManageUsers, &Resource::System)?;
    Ok(ApiResponse::ok(state.repo.list_users().await?))
}

/// create_user
///
/// [Admin Route] Creates an account with the requested `role` (default `user`). This is the
/// only way to create another admin.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Missing fields, short password or email taken"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<User>> {
    policy::authorize(&auth, Action::ManageUsers, &Resource::System)?;

    let role = payload.role.unwrap_or_default();
    let user = create_account(&state, payload, role).await?;
    tracing::info!(user_id = %user.id, created_by = %auth.id, "account created by admin");
    Ok(ApiResponse::created(user))
}
