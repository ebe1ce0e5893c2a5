use super::{Repository, attach_reply_ids};
use crate::{
    error::{AppError, Result},
    models::{
        AdminDashboardStats, Category, Comment, Like, NewComment, NewPost, NewUser, Post,
        PostFilter, PostSort, PostStatus, Tag, UpdatePostRequest, User,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Store {
    users: Vec<User>,
    // Insertion order doubles as the tie breaker for equal timestamps.
    posts: Vec<Post>,
    likes: HashSet<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
}

impl Store {
    fn like_count(&self, post_id: Uuid) -> i64 {
        self.likes.iter().filter(|(_, p)| *p == post_id).count() as i64
    }

    fn post_view(&self, post: &Post) -> Post {
        Post {
            like_count: self.like_count(post.id),
            ..post.clone()
        }
    }

    fn with_author(&self, comment: &Comment) -> Comment {
        let author_name = self
            .users
            .iter()
            .find(|u| u.id == comment.author_id)
            .map(|u| u.name.clone());
        Comment {
            author_name,
            ..comment.clone()
        }
    }

    fn reply_ids(&self, id: Uuid) -> Vec<Uuid> {
        self.comments
            .iter()
            .filter(|c| c.parent_comment_id == Some(id))
            .map(|c| c.id)
            .collect()
    }
}

fn matches_filter(post: &Post, filter: &PostFilter) -> bool {
    if filter.status.is_some_and(|s| s != post.status) {
        return false;
    }
    if filter.author_id.is_some_and(|a| a != post.author_id) {
        return false;
    }
    if let Some(category) = &filter.category {
        if !post.categories.contains(category) {
            return false;
        }
    }
    if !filter.tags.is_empty() && !filter.tags.iter().any(|t| post.tags.contains(t)) {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !post.title.to_lowercase().contains(&needle)
            && !post.body.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    true
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory. It follows the same semantics as the
/// Postgres implementation (derived replies, cascading post deletion, idempotent likes) and
/// backs the handler, router and comment tree tests. Each call takes the lock once; nothing
/// spans multiple calls, mirroring the absence of transactions in the real store.
pub struct InMemoryRepository {
    store: RwLock<Store>,
    /// When true, every operation fails with an internal error.
    should_fail: bool,
    /// Number of comment deletions allowed before `delete_comment` starts failing.
    delete_budget: AtomicUsize,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
            should_fail: false,
            delete_budget: AtomicUsize::new(usize::MAX),
        }
    }

    fn check(&self) -> Result<()> {
        if self.should_fail {
            return Err(AppError::Internal("simulated repository failure".to_string()));
        }
        Ok(())
    }
}

// Test support: fault injection and inspection.
impl InMemoryRepository {
    /// A repository whose every call fails, for exercising 500 paths.
    #[doc(hidden)]
    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    /// A repository whose comment deletions fail after `budget` successful ones.
    #[doc(hidden)]
    pub fn with_delete_budget(budget: usize) -> Self {
        Self {
            delete_budget: AtomicUsize::new(budget),
            ..Self::new()
        }
    }

    /// Ids of every stored comment, in insertion order.
    #[doc(hidden)]
    pub async fn comment_ids(&self) -> Vec<Uuid> {
        self.store.read().await.comments.iter().map(|c| c.id).collect()
    }

    /// Overwrites a comment's parent without any integrity check. Lets tests build the
    /// corrupted (cyclic) shapes that a relational store would refuse.
    #[doc(hidden)]
    pub async fn set_parent_unchecked(&self, id: Uuid, parent: Option<Uuid>) -> bool {
        let mut store = self.store.write().await;
        match store.comments.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.parent_comment_id = parent;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.check()?;
        let mut store = self.store.write().await;
        if store.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::validation("Email already taken"));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        store.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.check()?;
        Ok(self.store.read().await.users.clone())
    }

    // --- POSTS ---

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        self.check()?;
        let now = Utc::now();
        let created = Post {
            id: Uuid::new_v4(),
            title: post.title,
            body: post.body,
            thumbnail: post.thumbnail,
            categories: post.categories,
            tags: post.tags,
            author_id: post.author_id,
            status: PostStatus::Pending,
            like_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.write().await.posts.push(created.clone());
        Ok(created)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(store
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| store.post_view(p)))
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<(Vec<Post>, i64)> {
        self.check()?;
        let store = self.store.read().await;

        let mut matching: Vec<(usize, &Post)> = store
            .posts
            .iter()
            .enumerate()
            .filter(|(_, p)| matches_filter(p, filter))
            .collect();

        matching.sort_by(|(ia, a), (ib, b)| {
            let ord = match filter.sort {
                PostSort::CreatedAsc | PostSort::CreatedDesc => a.created_at.cmp(&b.created_at),
                PostSort::UpdatedAsc | PostSort::UpdatedDesc => a.updated_at.cmp(&b.updated_at),
                PostSort::TitleAsc | PostSort::TitleDesc => a.title.cmp(&b.title),
            }
            .then(ia.cmp(ib));
            match filter.sort {
                PostSort::CreatedDesc | PostSort::UpdatedDesc | PostSort::TitleDesc => {
                    ord.reverse()
                }
                _ => ord,
            }
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(0))
            .take(filter.limit as usize)
            .map(|(_, p)| store.post_view(p))
            .collect();

        Ok((page, total))
    }

    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Result<Option<Post>> {
        self.check()?;
        let mut store = self.store.write().await;
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(body) = req.body {
            post.body = body;
        }
        if let Some(key) = req.thumbnail_key {
            post.thumbnail = Some(key);
        }
        if let Some(categories) = req.categories {
            post.categories = categories;
        }
        if let Some(tags) = req.tags {
            post.tags = tags;
        }
        post.updated_at = Utc::now();

        let updated = post.clone();
        Ok(Some(store.post_view(&updated)))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        self.check()?;
        let mut store = self.store.write().await;
        let before = store.posts.len();
        store.posts.retain(|p| p.id != id);
        if store.posts.len() == before {
            return Ok(false);
        }
        // Replies attached from other posts go too, as the parent foreign key cascades.
        let mut removed: HashSet<Uuid> = store
            .comments
            .iter()
            .filter(|c| c.post_id == id)
            .map(|c| c.id)
            .collect();
        loop {
            let more: Vec<Uuid> = store
                .comments
                .iter()
                .filter(|c| !removed.contains(&c.id))
                .filter(|c| c.parent_comment_id.is_some_and(|p| removed.contains(&p)))
                .map(|c| c.id)
                .collect();
            if more.is_empty() {
                break;
            }
            removed.extend(more);
        }
        store.comments.retain(|c| !removed.contains(&c.id));
        store.likes.retain(|(_, p)| *p != id);
        Ok(true)
    }

    async fn set_post_status(&self, id: Uuid, status: PostStatus) -> Result<Option<Post>> {
        self.check()?;
        let mut store = self.store.write().await;
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.status = status;
        post.updated_at = Utc::now();
        let updated = post.clone();
        Ok(Some(store.post_view(&updated)))
    }

    async fn like_post(&self, like: Like) -> Result<bool> {
        self.check()?;
        Ok(self
            .store
            .write()
            .await
            .likes
            .insert((like.user_id, like.post_id)))
    }

    async fn unlike_post(&self, like: Like) -> Result<bool> {
        self.check()?;
        Ok(self
            .store
            .write()
            .await
            .likes
            .remove(&(like.user_id, like.post_id)))
    }

    // --- COMMENTS ---

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        self.check()?;
        let mut store = self.store.write().await;
        // Same references the comments table enforces with foreign keys.
        if !store.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(AppError::not_found("Post not found"));
        }
        if let Some(parent) = comment.parent_comment_id {
            if !store.comments.iter().rev().any(|c| c.id == parent) {
                return Err(AppError::not_found("Parent comment not found"));
            }
        }
        let now = Utc::now();
        let created = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content,
            parent_comment_id: comment.parent_comment_id,
            replies: vec![],
            created_at: now,
            updated_at: now,
            author_name: None,
        };
        store.comments.push(created.clone());
        Ok(store.with_author(&created))
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(store.comments.iter().find(|c| c.id == id).map(|c| Comment {
            replies: store.reply_ids(c.id),
            ..store.with_author(c)
        }))
    }

    async fn get_reply_ids(&self, id: Uuid) -> Result<Vec<Uuid>> {
        self.check()?;
        Ok(self.store.read().await.reply_ids(id))
    }

    async fn get_post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        self.check()?;
        let store = self.store.read().await;
        let mut comments: Vec<Comment> = store
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| store.with_author(c))
            .collect();
        attach_reply_ids(&mut comments);
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        self.check()?;
        let allowed = self
            .delete_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(AppError::Internal("simulated delete failure".to_string()));
        }

        let mut store = self.store.write().await;
        let before = store.comments.len();
        store.comments.retain(|c| c.id != id);
        Ok(store.comments.len() < before)
    }

    // --- CATEGORIES & TAGS ---

    async fn create_category(&self, name: &str) -> Result<Category> {
        self.check()?;
        let mut store = self.store.write().await;
        if store.categories.iter().any(|c| c.name == name) {
            return Err(AppError::validation("Category already exists"));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.categories.push(category.clone());
        Ok(category)
    }

    async fn find_category(&self, name: &str) -> Result<Option<Category>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(store.categories.iter().find(|c| c.name == name).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.check()?;
        let mut categories = self.store.read().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        self.check()?;
        let mut store = self.store.write().await;
        if store.tags.iter().any(|t| t.name == name) {
            return Err(AppError::validation("Tag already exists"));
        }
        let now = Utc::now();
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.tags.push(tag.clone());
        Ok(tag)
    }

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(store.tags.iter().find(|t| t.name == name).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.check()?;
        let mut tags = self.store.read().await.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    // --- ADMIN ---

    async fn get_stats(&self) -> Result<AdminDashboardStats> {
        self.check()?;
        let store = self.store.read().await;
        Ok(AdminDashboardStats {
            total_users: store.users.len() as i64,
            total_posts: store.posts.len() as i64,
            total_comments: store.comments.len() as i64,
            total_likes: store.likes.len() as i64,
            pending_posts: store
                .posts
                .iter()
                .filter(|p| p.status == PostStatus::Pending)
                .count() as i64,
        })
    }
}
