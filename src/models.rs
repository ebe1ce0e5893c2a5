use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations (Mapped to Postgres ENUM types) ---

/// Role
///
/// The RBAC field stored on every user (`user_role` in Postgres).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// PostStatus
///
/// Moderation state of a post (`post_status` in Postgres). Every post starts out `Pending`
/// and only `Approved` posts are visible on the public routes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "post_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. The password hash is loaded for
/// credential checks but is never serialized into a response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Post
///
/// A blog post from the `posts` table. `like_count` is not a column; it is computed from
/// `post_likes` by every query that returns posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    // Storage key of the thumbnail, produced by the presigned upload flow.
    pub thumbnail: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    // FK to users.id (owner).
    pub author_id: Uuid,
    pub status: PostStatus,
    pub like_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment row from the `comments` table. The tree shape is stored only in
/// `parent_comment_id`; `replies` is derived by the repository from the children that point
/// back at this comment, in creation order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
    #[sqlx(skip)]
    pub replies: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    // Loaded via a JOIN on users.
    #[sqlx(default)]
    pub author_name: Option<String>,
}

impl Comment {
    /// A root comment has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_comment_id.is_none()
    }
}

/// CommentThread
///
/// A comment together with its nested replies, as returned by the thread view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Number of comments in this thread, the root included.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(thread) = stack.pop() {
            count += 1;
            stack.extend(thread.replies.iter());
        }
        count
    }

    /// Levels of replies below the root; a thread with no replies has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0)];
        while let Some((thread, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(thread.replies.iter().map(|r| (r, level + 1)));
        }
        deepest
    }
}

/// Category
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Tag
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Like
///
/// One (user, post) vote in `post_likes`. The composite primary key makes liking idempotent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Like {
    pub user_id: Uuid,
    pub post_id: Uuid,
}

// --- Repository Inputs (Internal) ---

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub thumbnail: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub author_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
}

/// PostSort
///
/// Whitelisted orderings for post listings, parsed from the `sort` query parameter
/// (`createdAt`, `-createdAt`, `updatedAt`, `-updatedAt`, `title`, `-title`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    CreatedAsc,
    #[default]
    CreatedDesc,
    UpdatedAsc,
    UpdatedDesc,
    TitleAsc,
    TitleDesc,
}

impl PostSort {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(PostSort::CreatedAsc),
            "-createdAt" => Some(PostSort::CreatedDesc),
            "updatedAt" => Some(PostSort::UpdatedAsc),
            "-updatedAt" => Some(PostSort::UpdatedDesc),
            "title" => Some(PostSort::TitleAsc),
            "-title" => Some(PostSort::TitleDesc),
            _ => None,
        }
    }

    /// ORDER BY clause for the `posts p` alias. Ties are broken by id for stable paging.
    pub fn order_by(&self) -> &'static str {
        match self {
            PostSort::CreatedAsc => " ORDER BY p.created_at ASC, p.id ASC",
            PostSort::CreatedDesc => " ORDER BY p.created_at DESC, p.id DESC",
            PostSort::UpdatedAsc => " ORDER BY p.updated_at ASC, p.id ASC",
            PostSort::UpdatedDesc => " ORDER BY p.updated_at DESC, p.id DESC",
            PostSort::TitleAsc => " ORDER BY p.title ASC, p.id ASC",
            PostSort::TitleDesc => " ORDER BY p.title DESC, p.id DESC",
        }
    }
}

/// PostFilter
///
/// The validated form of a listing request, shared by both repository implementations.
#[derive(Debug, Clone)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub author_id: Option<Uuid>,
    pub category: Option<String>,
    // Matches posts carrying ANY of these tags.
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub sort: PostSort,
    pub page: u32,
    pub limit: u32,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            status: None,
            author_id: None,
            category: None,
            tags: vec![],
            search: None,
            sort: PostSort::default(),
            page: 1,
            limit: 10,
        }
    }
}

impl PostFilter {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /auth/register and POST /admin/users. Missing fields deserialize
/// as empty strings so that the handler can answer with a 400 and a readable message.
/// `role` is only honored on the admin route.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// LoginResponse
///
/// Bearer token plus the profile it was issued for.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// CreatePostRequest
///
/// Input payload for POST /posts. `thumbnail_key` is the resource key returned by the
/// thumbnail upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// UpdatePostRequest
///
/// Partial update payload for PUT /posts/{id}. Only `Some` fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// CreateCommentRequest
///
/// Input payload for POST /posts/{postId}/comments. A present `parentCommentId` makes the
/// new comment a reply.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    #[serde(
        default,
        rename = "parentCommentId",
        alias = "parent_comment_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived thumbnail upload URL (POST /uploads/thumbnail).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "cover.png")]
    pub filename: String,
    /// The MIME type. Only `image/*` is accepted.
    #[schema(example = "image/png")]
    pub file_type: String,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to pass as `thumbnail_key`.
    pub resource_key: String,
}

/// --- Output Schemas ---

/// Page
///
/// One page of a listing plus the total number of matching records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// CommentDeletion
///
/// Result of a subtree deletion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentDeletion {
    pub deleted: u64,
}

/// AdminDashboardStats
///
/// Output schema for GET /admin/stats.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_posts: i64,
    pub total_comments: i64,
    pub total_likes: i64,
    /// Posts still waiting for moderation.
    pub pending_posts: i64,
}
