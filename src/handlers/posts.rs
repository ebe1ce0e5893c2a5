use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use super::required;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{
        CreatePostRequest, Like, NewPost, Page, Post, PostFilter, PostSort, PostStatus,
        PresignedUrlRequest, PresignedUrlResponse, UpdatePostRequest,
    },
    policy::{self, Action, Resource},
    response::ApiResponse,
    storage,
};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// PostQuery
///
/// Query parameters accepted by the post listings (GET /posts, /me/posts, /admin/posts).
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostQuery {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size, 1 to 100 (default 10).
    pub limit: Option<u32>,
    /// `createdAt`, `-createdAt` (default), `updatedAt`, `-updatedAt`, `title` or `-title`.
    pub sort: Option<String>,
    /// Only posts in this category.
    pub category: Option<String>,
    /// Comma-separated tag names; a post matches if it has any of them.
    pub tags: Option<String>,
    /// Only posts by this author.
    pub author: Option<Uuid>,
    /// Case-insensitive match on title or body.
    pub search: Option<String>,
    /// Moderation status. Ignored on the public listing, which only shows approved posts.
    pub status: Option<PostStatus>,
}

impl PostQuery {
    /// Validates the raw parameters into a repository filter.
    pub fn into_filter(self) -> Result<PostFilter> {
        let sort = match self.sort.as_deref() {
            None | Some("") => PostSort::default(),
            Some(raw) => PostSort::parse(raw)
                .ok_or_else(|| AppError::validation(format!("Unsupported sort: {raw}")))?,
        };

        let tags = self
            .tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(PostFilter {
            status: self.status,
            author_id: self.author,
            category: self.category.filter(|c| !c.trim().is_empty()),
            tags,
            search: self.search.filter(|s| !s.trim().is_empty()),
            sort,
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        })
    }
}

pub(crate) async fn list_page(state: &AppState, filter: PostFilter) -> Result<Page<Post>> {
    let (items, total) = state.repo.list_posts(&filter).await?;
    Ok(Page {
        items,
        total,
        page: filter.page,
        limit: filter.limit,
    })
}

/// Loads a post or answers 404.
pub(crate) async fn load_post(state: &AppState, id: Uuid) -> Result<Post> {
    state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))
}

/// Loads a post that is visible on the public routes (approved), or answers 404.
pub(crate) async fn load_public_post(state: &AppState, id: Uuid) -> Result<Post> {
    let post = load_post(state, id).await?;
    if post.status != PostStatus::Approved {
        return Err(AppError::not_found("Post not found"));
    }
    Ok(post)
}

/// Loads a post the requester may interact with (see [`policy::may_view_post`]), or
/// answers 404.
pub(crate) async fn load_visible_post(
    state: &AppState,
    id: Uuid,
    auth: &AuthUser,
) -> Result<Post> {
    let post = load_post(state, id).await?;
    if !policy::may_view_post(auth, &post) {
        return Err(AppError::not_found("Post not found"));
    }
    Ok(post)
}

/// get_posts
///
/// [Public Route] Approved posts with filtering, search, sorting and pagination.
#[utoipa::path(
    get,
    path = "/posts",
    params(PostQuery),
    responses(
        (status = 200, description = "One page of approved posts", body = [Post]),
        (status = 400, description = "Unsupported sort")
    )
)]
pub async fn get_posts(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<ApiResponse<Page<Post>>> {
    let mut filter = query.into_filter()?;
    filter.status = Some(PostStatus::Approved);
    Ok(ApiResponse::ok(list_page(&state, filter).await?))
}

/// get_post_details
///
/// [Public Route] A single approved post.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found or not approved")
    )
)]
pub async fn get_post_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Post>> {
    Ok(ApiResponse::ok(load_public_post(&state, id).await?))
}

/// get_my_posts
///
/// [Authenticated Route] The requester's posts in every moderation state.
#[utoipa::path(
    get,
    path = "/me/posts",
    params(PostQuery),
    responses((status = 200, description = "My posts", body = [Post]))
)]
pub async fn get_my_posts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<ApiResponse<Page<Post>>> {
    let mut filter = query.into_filter()?;
    filter.author_id = Some(auth.id);
    Ok(ApiResponse::ok(list_page(&state, filter).await?))
}

/// create_post
///
/// [Authenticated Route] Submits a post. It stays `pending` until an admin approves it.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Missing title or body")
    )
)]
pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<ApiResponse<Post>> {
    let title = required(&payload.title, "Post title is required")?;
    let body = required(&payload.body, "Post body is required")?;

    let post = state
        .repo
        .create_post(NewPost {
            title,
            body,
            thumbnail: payload.thumbnail_key.filter(|k| !k.is_empty()),
            categories: payload.categories,
            tags: payload.tags,
            author_id: auth.id,
        })
        .await?;

    tracing::info!(post_id = %post.id, author = %auth.id, "post created");
    Ok(ApiResponse::created(post))
}

/// update_post
///
/// [Authenticated Route] Partial update by the author or an admin. Blank title/body values
/// keep the stored text.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not author or admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<ApiResponse<Post>> {
    let post = load_post(&state, id).await?;
    policy::authorize(
        &auth,
        Action::UpdatePost,
        &Resource::Post {
            author_id: post.author_id,
        },
    )?;

    let changes = UpdatePostRequest {
        title: payload.title.filter(|t| !t.trim().is_empty()),
        body: payload.body.filter(|b| !b.trim().is_empty()),
        thumbnail_key: payload.thumbnail_key.filter(|k| !k.is_empty()),
        ..payload
    };

    let updated = state
        .repo
        .update_post(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    Ok(ApiResponse::ok(updated))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post with its comments and likes. Author or admin only.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not author or admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    let post = load_post(&state, id).await?;
    policy::authorize(
        &auth,
        Action::DeletePost,
        &Resource::Post {
            author_id: post.author_id,
        },
    )?;

    if !state.repo.delete_post(id).await? {
        return Err(AppError::not_found("Post not found"));
    }

    tracing::info!(post_id = %id, requester = %auth.id, "post deleted");
    Ok(ApiResponse::message("Post deleted successfully"))
}

/// like_post
///
/// [Authenticated Route] Records a like. One like per user per post; a repeat is a 409.
/// Unpublished posts can only be liked by their author or an admin.
#[utoipa::path(
    post,
    path = "/posts/{id}/like",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Liked"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Duplicate")
    )
)]
pub async fn like_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    load_visible_post(&state, id, &auth).await?;

    let like = Like {
        user_id: auth.id,
        post_id: id,
    };
    if !state.repo.like_post(like).await? {
        return Err(AppError::Conflict("Post already liked".to_string()));
    }
    Ok(ApiResponse::message("Post liked"))
}

/// unlike_post
///
/// [Authenticated Route] Withdraws the requester's like.
#[utoipa::path(
    delete,
    path = "/posts/{id}/like",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Like removed"),
        (status = 404, description = "Post not found or not liked")
    )
)]
pub async fn unlike_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    load_visible_post(&state, id, &auth).await?;

    let like = Like {
        user_id: auth.id,
        post_id: id,
    };
    if !state.repo.unlike_post(like).await? {
        return Err(AppError::not_found("Like not found"));
    }
    Ok(ApiResponse::message("Like removed"))
}

/// get_thumbnail_upload_url
///
/// [Authenticated Route] A 10-minute presigned PUT URL for a post thumbnail. Only image
/// content types are accepted.
#[utoipa::path(
    post,
    path = "/uploads/thumbnail",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Not an image")
    )
)]
pub async fn get_thumbnail_upload_url(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<ApiResponse<PresignedUrlResponse>> {
    if !storage::is_image(&payload.file_type) {
        return Err(AppError::validation("File type not supported"));
    }

    let resource_key = storage::thumbnail_key(&payload.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&resource_key, &payload.file_type)
        .await?;

    Ok(ApiResponse::ok(PresignedUrlResponse {
        upload_url,
        resource_key,
    }))
}
