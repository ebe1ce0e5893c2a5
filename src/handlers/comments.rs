use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use super::posts::load_public_post;
use crate::{
    AppState,
    auth::AuthUser,
    comment_tree,
    error::Result,
    models::{Comment, CommentDeletion, CommentThread, CreateCommentRequest},
    response::ApiResponse,
};

/// add_comment
///
/// [Authenticated Route] Adds a comment to a post. With `parentCommentId` the comment becomes
/// a reply and is listed in the parent's `replies`.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Post not found or not published, or parent comment not found")
    )
)]
pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<ApiResponse<Comment>> {
    let comment = comment_tree::create_comment(
        state.repo.as_ref(),
        post_id,
        &auth,
        payload.content,
        payload.parent_comment_id,
    )
    .await?;

    Ok(ApiResponse::created(comment))
}

/// delete_comment
///
/// [Authenticated Route] Deletes a comment and all of its replies, recursively. Only the
/// comment's author or an admin may do this.
#[utoipa::path(
    delete,
    path = "/posts/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Deleted", body = CommentDeletion),
        (status = 403, description = "Not author or admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<ApiResponse<CommentDeletion>> {
    let deleted =
        comment_tree::delete_comment_subtree(state.repo.as_ref(), comment_id, &auth).await?;

    Ok(ApiResponse::with_message(
        CommentDeletion { deleted },
        "Comment deleted successfully",
    ))
}

/// get_post_comments
///
/// [Public Route] The comments of an approved post, nested into threads.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Threads, oldest first"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<ApiResponse<Vec<CommentThread>>> {
    load_public_post(&state, post_id).await?;

    let comments = state.repo.get_post_comments(post_id).await?;
    Ok(ApiResponse::ok(comment_tree::build_threads(comments)))
}
