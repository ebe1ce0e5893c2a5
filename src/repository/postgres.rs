use super::{Repository, attach_reply_ids};
use crate::{
    error::{AppError, Result},
    models::{
        AdminDashboardStats, Category, Comment, Like, NewComment, NewPost, NewUser, Post,
        PostFilter, PostStatus, Tag, UpdatePostRequest, User,
    },
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

/// Column list for posts under the alias `p`. `like_count` is computed on every read.
const POST_COLUMNS: &str = r#"
    p.id, p.title, p.body, p.thumbnail, p.categories, p.tags, p.author_id, p.status,
    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
    p.created_at, p.updated_at
"#;

/// Column list for comments under the alias `c`, joined with the author (`u`).
const COMMENT_COLUMNS: &str = r#"
    c.id, c.post_id, c.author_id, c.content, c.parent_comment_id,
    c.created_at, c.updated_at, u.name AS author_name
"#;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are checked at runtime
/// (`query_as` + `FromRow`) so the crate builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translates a unique-constraint violation into a 400 with `message`; anything else stays
/// a database error.
fn unique_violation(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::validation(message),
        _ => AppError::Database(e),
    }
}

/// Translates a foreign-key violation on a new comment into the matching 404. It fires when
/// the post or parent is deleted between the existence check and the insert.
fn missing_comment_reference(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            match db.constraint() {
                Some("comments_parent_fkey") => {
                    return AppError::not_found("Parent comment not found");
                }
                Some("comments_post_fkey") => return AppError::not_found("Post not found"),
                _ => {}
            }
        }
    }
    AppError::Database(e)
}

/// Appends the WHERE clause of a post listing. Shared by the page query and the count query.
fn push_post_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    builder.push(" WHERE TRUE");

    if let Some(status) = filter.status {
        builder.push(" AND p.status = ");
        builder.push_bind(status);
    }

    if let Some(author_id) = filter.author_id {
        builder.push(" AND p.author_id = ");
        builder.push_bind(author_id);
    }

    if let Some(category) = &filter.category {
        builder.push(" AND ");
        builder.push_bind(category.clone());
        builder.push(" = ANY(p.categories)");
    }

    if !filter.tags.is_empty() {
        // Array overlap: the post carries at least one of the requested tags.
        builder.push(" AND p.tags && ");
        builder.push_bind(filter.tags.clone());
    }

    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        builder.push(" AND (p.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR p.body ILIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }
}

/// An ILIKE pattern matching `term` as a literal substring. `%`, `_` and the escape
/// character itself lose their wildcard meaning.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.name)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unique_violation(e, "Email already taken"))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    // --- POSTS ---

    /// create_post
    ///
    /// Inserts a new post in the `pending` state. The CTE lets the insert return the same
    /// column shape (including `like_count`) as every other post query.
    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let sql = format!(
            r#"
            WITH p AS (
                INSERT INTO posts (id, title, body, thumbnail, categories, tags, author_id, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', NOW(), NOW())
                RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p
            "#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::new_v4())
            .bind(post.title)
            .bind(post.body)
            .bind(post.thumbnail)
            .bind(post.categories)
            .bind(post.tags)
            .bind(post.author_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_posts
    ///
    /// Dynamic filtering with `QueryBuilder` so that every user-supplied value is bound, never
    /// interpolated. The ORDER BY fragment comes from the `PostSort` whitelist.
    async fn list_posts(&self, filter: &PostFilter) -> Result<(Vec<Post>, i64)> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM posts p");
        push_post_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p"));
        push_post_filters(&mut builder, filter);
        builder.push(filter.sort.order_by());
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(filter.limit));
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset());

        let posts = builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?;

        Ok((posts, total))
    }

    /// update_post
    ///
    /// Uses `COALESCE` so that `None` fields keep their stored value.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Result<Option<Post>> {
        let sql = format!(
            r#"
            WITH p AS (
                UPDATE posts
                SET title = COALESCE($2, title),
                    body = COALESCE($3, body),
                    thumbnail = COALESCE($4, thumbnail),
                    categories = COALESCE($5, categories),
                    tags = COALESCE($6, tags),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p
            "#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.body)
            .bind(req.thumbnail_key)
            .bind(req.categories)
            .bind(req.tags)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// delete_post
    ///
    /// Comments and likes are removed by `ON DELETE CASCADE` on their post foreign key.
    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_post_status(&self, id: Uuid, status: PostStatus) -> Result<Option<Post>> {
        let sql = format!(
            r#"
            WITH p AS (
                UPDATE posts SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p
            "#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// like_post
    ///
    /// `ON CONFLICT DO NOTHING` makes the insert idempotent; a duplicate affects zero rows.
    async fn like_post(&self, like: Like) -> Result<bool> {
        let res = sqlx::query(
            "INSERT INTO post_likes (user_id, post_id, created_at) VALUES ($1, $2, NOW()) ON CONFLICT DO NOTHING",
        )
        .bind(like.user_id)
        .bind(like.post_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn unlike_post(&self, like: Like) -> Result<bool> {
        let res = sqlx::query("DELETE FROM post_likes WHERE user_id = $1 AND post_id = $2")
            .bind(like.user_id)
            .bind(like.post_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- COMMENTS ---

    /// insert_comment
    ///
    /// Inserts and joins with `users` in one round trip to return the enriched comment.
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let sql = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (id, post_id, author_id, content, parent_comment_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS} FROM c LEFT JOIN users u ON u.id = c.author_id
            "#
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::new_v4())
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(comment.content)
            .bind(comment.parent_comment_id)
            .fetch_one(&self.pool)
            .await
            .map_err(missing_comment_reference)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c LEFT JOIN users u ON u.id = c.author_id WHERE c.id = $1"
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match comment {
            Some(mut c) => {
                c.replies = self.get_reply_ids(c.id).await?;
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    async fn get_reply_ids(&self, id: Uuid) -> Result<Vec<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM comments WHERE parent_comment_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c LEFT JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#
        );
        let mut comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        attach_reply_ids(&mut comments);
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- CATEGORIES & TAGS ---

    async fn create_category(&self, name: &str) -> Result<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, created_at, updated_at) VALUES ($1, $2, NOW(), NOW()) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "Category already exists"))
    }

    async fn find_category(&self, name: &str) -> Result<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (id, name, created_at, updated_at) VALUES ($1, $2, NOW(), NOW()) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "Tag already exists"))
    }

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        Ok(sqlx::query_as::<_, Tag>(
            "SELECT id, name, created_at, updated_at FROM tags WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(sqlx::query_as::<_, Tag>(
            "SELECT id, name, created_at, updated_at FROM tags ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    // --- ADMIN ---

    /// get_stats
    ///
    /// Compiles all counters for the administrative dashboard.
    async fn get_stats(&self) -> Result<AdminDashboardStats> {
        let count = |sql: &'static str| sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool);

        Ok(AdminDashboardStats {
            total_users: count("SELECT COUNT(*) FROM users").await?,
            total_posts: count("SELECT COUNT(*) FROM posts").await?,
            total_comments: count("SELECT COUNT(*) FROM comments").await?,
            total_likes: count("SELECT COUNT(*) FROM post_likes").await?,
            pending_posts: count("SELECT COUNT(*) FROM posts WHERE status = 'pending'").await?,
        })
    }
}
