use crate::{
    error::Result,
    models::{
        AdminDashboardStats, Category, Comment, Like, NewComment, NewPost, NewUser, Post,
        PostFilter, PostStatus, Tag, UpdatePostRequest, User,
    },
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers, the auth extractor and the
/// comment tree manager only ever see `Arc<dyn Repository>`, so Postgres and the in-memory
/// store are interchangeable.
///
/// Every method returns `Result`: a storage failure is propagated to the caller and reported
/// as a 500, never swallowed into an empty value.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;

    // --- Posts ---
    async fn create_post(&self, post: NewPost) -> Result<Post>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>>;
    /// One page of posts matching `filter`, plus the total number of matches.
    async fn list_posts(&self, filter: &PostFilter) -> Result<(Vec<Post>, i64)>;
    /// Partial update; only `Some` fields of `req` are written.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Result<Option<Post>>;
    /// Deletes the post together with its comments and likes.
    async fn delete_post(&self, id: Uuid) -> Result<bool>;
    async fn set_post_status(&self, id: Uuid, status: PostStatus) -> Result<Option<Post>>;
    // Idempotent: true only if a new like was recorded.
    async fn like_post(&self, like: Like) -> Result<bool>;
    async fn unlike_post(&self, like: Like) -> Result<bool>;

    // --- Comments ---
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;
    /// Single comment with its derived `replies` filled in.
    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>>;
    /// Ids of the direct replies of `id`, oldest first.
    async fn get_reply_ids(&self, id: Uuid) -> Result<Vec<Uuid>>;
    /// Every comment of a post, oldest first, with `replies` filled in.
    async fn get_post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;
    /// Removes one record. Callers delete its replies first.
    async fn delete_comment(&self, id: Uuid) -> Result<bool>;

    // --- Categories & Tags ---
    async fn create_category(&self, name: &str) -> Result<Category>;
    async fn find_category(&self, name: &str) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn create_tag(&self, name: &str) -> Result<Tag>;
    async fn find_tag(&self, name: &str) -> Result<Option<Tag>>;
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    // --- Admin ---
    async fn get_stats(&self) -> Result<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Fills every comment's `replies` from the `parent_comment_id` of the others.
/// Input order is preserved, so oldest-first input yields oldest-first replies.
pub(crate) fn attach_reply_ids(comments: &mut [Comment]) {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for c in comments.iter() {
        if let Some(parent) = c.parent_comment_id {
            children.entry(parent).or_default().push(c.id);
        }
    }
    for c in comments.iter_mut() {
        c.replies = children.remove(&c.id).unwrap_or_default();
    }
}
