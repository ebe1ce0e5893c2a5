use blog_backend::{
    AppError, InMemoryRepository,
    auth::AuthUser,
    comment_tree::{
        self, MAX_THREAD_DEPTH, build_threads, collect_subtree, create_comment,
        delete_comment_subtree,
    },
    models::{Comment, NewComment, NewPost, NewUser, PostStatus, Role},
    repository::Repository,
};
use uuid::Uuid;

// --- Fixtures ---

struct Fixture {
    repo: InMemoryRepository,
    post_id: Uuid,
    alice: AuthUser,
    bob: AuthUser,
    admin: AuthUser,
}

async fn register(repo: &InMemoryRepository, name: &str, role: Role) -> AuthUser {
    let user = repo
        .create_user(NewUser {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "unused".to_string(),
            role,
        })
        .await
        .unwrap();
    AuthUser {
        id: user.id,
        role: user.role,
    }
}

async fn fixture_with(repo: InMemoryRepository) -> Fixture {
    let alice = register(&repo, "alice", Role::User).await;
    let bob = register(&repo, "bob", Role::User).await;
    let admin = register(&repo, "root", Role::Admin).await;
    let post = repo
        .create_post(NewPost {
            title: "Threads".to_string(),
            body: "Discuss.".to_string(),
            thumbnail: None,
            categories: vec![],
            tags: vec![],
            author_id: alice.id,
        })
        .await
        .unwrap();
    repo.set_post_status(post.id, PostStatus::Approved)
        .await
        .unwrap();

    Fixture {
        repo,
        post_id: post.id,
        alice,
        bob,
        admin,
    }
}

async fn fixture() -> Fixture {
    fixture_with(InMemoryRepository::new()).await
}

impl Fixture {
    async fn comment(&self, author: &AuthUser, content: &str, parent: Option<Uuid>) -> Comment {
        create_comment(
            &self.repo,
            self.post_id,
            author,
            content.to_string(),
            parent,
        )
        .await
        .unwrap()
    }

    async fn exists(&self, id: Uuid) -> bool {
        self.repo.get_comment(id).await.unwrap().is_some()
    }

    async fn replies_of(&self, id: Uuid) -> Vec<Uuid> {
        self.repo.get_comment(id).await.unwrap().unwrap().replies
    }
}

// --- Creation ---

#[tokio::test]
async fn test_root_comment_has_no_parent_and_no_replies() {
    let fx = fixture().await;
    let c = fx.comment(&fx.alice, "first!", None).await;

    assert!(c.is_root());
    assert!(c.replies.is_empty());
    assert_eq!(c.post_id, fx.post_id);
    assert_eq!(c.author_id, fx.alice.id);
    assert_eq!(c.author_name.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_reply_is_listed_exactly_once_under_parent() {
    let fx = fixture().await;
    let parent = fx.comment(&fx.alice, "question", None).await;
    let reply = fx.comment(&fx.bob, "answer", Some(parent.id)).await;

    assert_eq!(reply.parent_comment_id, Some(parent.id));
    assert_eq!(fx.replies_of(parent.id).await, vec![reply.id]);
}

#[tokio::test]
async fn test_replies_keep_creation_order() {
    let fx = fixture().await;
    let parent = fx.comment(&fx.alice, "poll", None).await;
    let r1 = fx.comment(&fx.bob, "a", Some(parent.id)).await;
    let r2 = fx.comment(&fx.alice, "b", Some(parent.id)).await;
    let r3 = fx.comment(&fx.bob, "c", Some(parent.id)).await;

    assert_eq!(fx.replies_of(parent.id).await, vec![r1.id, r2.id, r3.id]);
}

#[tokio::test]
async fn test_blank_content_is_rejected_and_nothing_is_stored() {
    let fx = fixture().await;
    let err = create_comment(&fx.repo, fx.post_id, &fx.alice, "   ".to_string(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(fx.repo.comment_ids().await.is_empty());
}

#[tokio::test]
async fn test_comment_on_missing_post_is_not_found() {
    let fx = fixture().await;
    let err = create_comment(&fx.repo, Uuid::new_v4(), &fx.alice, "hi".to_string(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(msg) if msg == "Post not found"));
}

#[tokio::test]
async fn test_unpublished_post_only_takes_comments_from_author_and_admin() {
    let fx = fixture().await;
    fx.repo
        .set_post_status(fx.post_id, PostStatus::Pending)
        .await
        .unwrap();

    let err = create_comment(&fx.repo, fx.post_id, &fx.bob, "hi".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(msg) if msg == "Post not found"));
    assert!(fx.repo.comment_ids().await.is_empty());

    fx.comment(&fx.alice, "note to self", None).await;
    fx.comment(&fx.admin, "moderator note", None).await;
    assert_eq!(fx.repo.comment_ids().await.len(), 2);
}

#[tokio::test]
async fn test_reply_to_missing_parent_is_not_found() {
    let fx = fixture().await;
    let err = create_comment(
        &fx.repo,
        fx.post_id,
        &fx.alice,
        "hi".to_string(),
        Some(Uuid::new_v4()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::NotFound(msg) if msg == "Parent comment not found"));
    assert!(fx.repo.comment_ids().await.is_empty());
}

#[tokio::test]
async fn test_parent_deleted_before_insert_is_not_found() {
    let fx = fixture().await;
    let parent = fx.comment(&fx.alice, "soon gone", None).await;
    assert!(fx.repo.delete_comment(parent.id).await.unwrap());

    // The write itself refuses the dangling parent, whatever was checked before it.
    let err = fx
        .repo
        .insert_comment(NewComment {
            post_id: fx.post_id,
            author_id: fx.bob.id,
            content: "late reply".to_string(),
            parent_comment_id: Some(parent.id),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(msg) if msg == "Parent comment not found"));
    assert!(fx.repo.comment_ids().await.is_empty());
}

// --- Subtree deletion ---

#[tokio::test]
async fn test_delete_leaf_removes_one_record() {
    let fx = fixture().await;
    let c = fx.comment(&fx.alice, "lonely", None).await;

    let deleted = delete_comment_subtree(&fx.repo, c.id, &fx.alice)
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    assert!(!fx.exists(c.id).await);
}

#[tokio::test]
async fn test_delete_chain_removes_every_descendant() {
    let fx = fixture().await;
    let a = fx.comment(&fx.alice, "a", None).await;
    let b = fx.comment(&fx.bob, "b", Some(a.id)).await;
    let c = fx.comment(&fx.alice, "c", Some(b.id)).await;
    let d = fx.comment(&fx.bob, "d", Some(c.id)).await;

    let deleted = delete_comment_subtree(&fx.repo, a.id, &fx.alice)
        .await
        .unwrap();

    assert_eq!(deleted, 4);
    for id in [a.id, b.id, c.id, d.id] {
        assert!(!fx.exists(id).await);
    }
}

#[tokio::test]
async fn test_delete_branch_leaves_siblings_and_ancestors() {
    // C1 has replies C2 and C3; C3 has reply C4. Deleting C3 must leave C1 and C2.
    let fx = fixture().await;
    let c1 = fx.comment(&fx.alice, "C1", None).await;
    let c2 = fx.comment(&fx.bob, "C2", Some(c1.id)).await;
    let c3 = fx.comment(&fx.bob, "C3", Some(c1.id)).await;
    let c4 = fx.comment(&fx.alice, "C4", Some(c3.id)).await;

    let deleted = delete_comment_subtree(&fx.repo, c3.id, &fx.bob)
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    assert!(!fx.exists(c3.id).await);
    assert!(!fx.exists(c4.id).await);
    assert!(fx.exists(c1.id).await);
    assert!(fx.exists(c2.id).await);
    // The deleted reply no longer shows up under its parent.
    assert_eq!(fx.replies_of(c1.id).await, vec![c2.id]);
}

#[tokio::test]
async fn test_delete_whole_thread_from_root() {
    let fx = fixture().await;
    let c1 = fx.comment(&fx.alice, "C1", None).await;
    let c2 = fx.comment(&fx.bob, "C2", Some(c1.id)).await;
    let c3 = fx.comment(&fx.bob, "C3", Some(c1.id)).await;
    let c4 = fx.comment(&fx.alice, "C4", Some(c3.id)).await;
    let other = fx.comment(&fx.bob, "unrelated", None).await;

    let deleted = delete_comment_subtree(&fx.repo, c1.id, &fx.alice)
        .await
        .unwrap();

    assert_eq!(deleted, 4);
    for id in [c1.id, c2.id, c3.id, c4.id] {
        assert!(!fx.exists(id).await);
    }
    assert_eq!(fx.repo.comment_ids().await, vec![other.id]);
}

#[tokio::test]
async fn test_delete_root_of_chain_keeps_unrelated_comment() {
    // C1 <- C2 <- C3 on one post, plus an unrelated root C4.
    let fx = fixture().await;
    let c1 = fx.comment(&fx.alice, "C1", None).await;
    let c2 = fx.comment(&fx.bob, "C2", Some(c1.id)).await;
    let c3 = fx.comment(&fx.alice, "C3", Some(c2.id)).await;
    let c4 = fx.comment(&fx.bob, "C4", None).await;

    let deleted = delete_comment_subtree(&fx.repo, c1.id, &fx.alice)
        .await
        .unwrap();

    assert_eq!(deleted, 3);
    for id in [c1.id, c2.id, c3.id] {
        assert!(!fx.exists(id).await);
    }
    assert!(fx.exists(c4.id).await);
}

#[tokio::test]
async fn test_author_may_delete_others_replies_under_own_comment() {
    // Authorization is checked against the top comment only.
    let fx = fixture().await;
    let root = fx.comment(&fx.alice, "mine", None).await;
    let reply = fx.comment(&fx.bob, "bob's reply", Some(root.id)).await;

    delete_comment_subtree(&fx.repo, root.id, &fx.alice)
        .await
        .unwrap();

    assert!(!fx.exists(reply.id).await);
}

#[tokio::test]
async fn test_non_author_delete_is_forbidden_and_changes_nothing() {
    let fx = fixture().await;
    let root = fx.comment(&fx.alice, "mine", None).await;
    let reply = fx.comment(&fx.alice, "also mine", Some(root.id)).await;

    let err = delete_comment_subtree(&fx.repo, root.id, &fx.bob)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(fx.exists(root.id).await);
    assert!(fx.exists(reply.id).await);
}

#[tokio::test]
async fn test_admin_may_delete_any_subtree() {
    let fx = fixture().await;
    let root = fx.comment(&fx.alice, "spam", None).await;
    fx.comment(&fx.bob, "more spam", Some(root.id)).await;

    let deleted = delete_comment_subtree(&fx.repo, root.id, &fx.admin)
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    assert!(fx.repo.comment_ids().await.is_empty());
}

#[tokio::test]
async fn test_delete_missing_comment_is_not_found() {
    let fx = fixture().await;
    let err = delete_comment_subtree(&fx.repo, Uuid::new_v4(), &fx.admin)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(msg) if msg == "Comment not found"));
}

#[tokio::test]
async fn test_collect_subtree_orders_children_before_parents() {
    let fx = fixture().await;
    let a = fx.comment(&fx.alice, "a", None).await;
    let b = fx.comment(&fx.bob, "b", Some(a.id)).await;
    let c = fx.comment(&fx.bob, "c", Some(a.id)).await;
    let d = fx.comment(&fx.alice, "d", Some(b.id)).await;

    let order = collect_subtree(&fx.repo, a.id).await.unwrap();
    let pos = |id: Uuid| order.iter().position(|x| *x == id).unwrap();

    assert_eq!(order.len(), 4);
    assert_eq!(order.last(), Some(&a.id));
    assert!(pos(d.id) < pos(b.id));
    assert!(pos(b.id) < pos(a.id));
    assert!(pos(c.id) < pos(a.id));
}

#[tokio::test]
async fn test_deep_chain_does_not_exhaust_the_stack() {
    let fx = fixture().await;
    let root = fx.comment(&fx.alice, "0", None).await;
    let mut parent = root.id;
    for i in 1..2_000 {
        parent = fx.comment(&fx.alice, &i.to_string(), Some(parent)).await.id;
    }

    let deleted = delete_comment_subtree(&fx.repo, root.id, &fx.alice)
        .await
        .unwrap();

    assert_eq!(deleted, 2_000);
    assert!(fx.repo.comment_ids().await.is_empty());
}

#[tokio::test]
async fn test_cycle_terminates_and_deletes_each_record_once() {
    let fx = fixture().await;
    let a = fx.comment(&fx.alice, "a", None).await;
    let b = fx.comment(&fx.alice, "b", Some(a.id)).await;
    let c = fx.comment(&fx.alice, "c", Some(b.id)).await;
    // Corrupt the tree: a -> b -> c -> a
    assert!(fx.repo.set_parent_unchecked(a.id, Some(c.id)).await);

    let order = collect_subtree(&fx.repo, a.id).await.unwrap();
    assert_eq!(order.len(), 3);

    let deleted = delete_comment_subtree(&fx.repo, a.id, &fx.alice)
        .await
        .unwrap();

    assert_eq!(deleted, 3);
    assert!(fx.repo.comment_ids().await.is_empty());
}

#[tokio::test]
async fn test_partial_failure_keeps_completed_deletions() {
    let fx = fixture_with(InMemoryRepository::with_delete_budget(2)).await;
    let a = fx.comment(&fx.alice, "a", None).await;
    let b = fx.comment(&fx.alice, "b", Some(a.id)).await;
    let c = fx.comment(&fx.alice, "c", Some(b.id)).await;
    let d = fx.comment(&fx.alice, "d", Some(c.id)).await;

    let err = delete_comment_subtree(&fx.repo, a.id, &fx.alice)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    // Children go first, so the two deepest records are gone and the rest remain.
    assert!(!fx.exists(d.id).await);
    assert!(!fx.exists(c.id).await);
    assert!(fx.exists(b.id).await);
    assert!(fx.exists(a.id).await);
}

// --- Thread view ---

#[tokio::test]
async fn test_build_threads_nests_replies() {
    let fx = fixture().await;
    let c1 = fx.comment(&fx.alice, "C1", None).await;
    let c2 = fx.comment(&fx.bob, "C2", Some(c1.id)).await;
    let c3 = fx.comment(&fx.bob, "C3", Some(c1.id)).await;
    let c4 = fx.comment(&fx.alice, "C4", Some(c3.id)).await;
    let c5 = fx.comment(&fx.bob, "C5", None).await;

    let comments = fx.repo.get_post_comments(fx.post_id).await.unwrap();
    let threads = build_threads(comments);

    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].comment.id, c1.id);
    assert_eq!(threads[0].size(), 4);
    assert_eq!(threads[0].replies[0].comment.id, c2.id);
    assert_eq!(threads[0].replies[1].comment.id, c3.id);
    assert_eq!(threads[0].replies[1].replies[0].comment.id, c4.id);
    assert_eq!(threads[1].comment.id, c5.id);
    assert!(threads[1].replies.is_empty());
}

#[tokio::test]
async fn test_build_threads_skips_cycles() {
    let fx = fixture().await;
    let root = fx.comment(&fx.alice, "root", None).await;
    let a = fx.comment(&fx.alice, "a", None).await;
    let b = fx.comment(&fx.alice, "b", Some(a.id)).await;
    fx.repo.set_parent_unchecked(a.id, Some(b.id)).await;

    let threads = comment_tree::build_threads(fx.repo.get_post_comments(fx.post_id).await.unwrap());

    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].comment.id, root.id);
}

#[tokio::test]
async fn test_build_threads_flattens_replies_below_the_depth_cap() {
    let fx = fixture().await;
    let mut chain = vec![fx.comment(&fx.alice, "level 0", None).await.id];
    for level in 1..MAX_THREAD_DEPTH + 5 {
        let parent = chain.last().copied();
        chain.push(fx.comment(&fx.bob, &format!("level {level}"), parent).await.id);
    }

    let threads = build_threads(fx.repo.get_post_comments(fx.post_id).await.unwrap());

    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].size(), chain.len());
    assert_eq!(threads[0].depth(), MAX_THREAD_DEPTH);

    let mut anchor = &threads[0];
    for _ in 0..MAX_THREAD_DEPTH - 1 {
        anchor = &anchor.replies[0];
    }
    assert_eq!(anchor.comment.id, chain[MAX_THREAD_DEPTH - 1]);

    // Everything from the cap down sits side by side, in thread order.
    let flat: Vec<Uuid> = anchor.replies.iter().map(|r| r.comment.id).collect();
    assert_eq!(flat, chain[MAX_THREAD_DEPTH..].to_vec());
    assert!(anchor.replies.iter().all(|r| r.replies.is_empty()));
}

#[tokio::test]
async fn test_deleting_a_post_removes_its_comments() {
    let fx = fixture().await;
    let c1 = fx.comment(&fx.alice, "C1", None).await;
    fx.comment(&fx.bob, "C2", Some(c1.id)).await;

    assert!(fx.repo.delete_post(fx.post_id).await.unwrap());
    assert!(fx.repo.comment_ids().await.is_empty());
}
