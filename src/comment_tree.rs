//! Comment Tree Manager.
//!
//! Comments form a forest per post. The only stored edge is `parent_comment_id`; a comment's
//! replies are whatever comments point back at it. This module creates comments (roots or
//! replies), deletes whole reply subtrees, and assembles nested thread views.
//!
//! Deletion walks the tree with an explicit stack and a visited set, so neither a deep
//! thread nor a corrupted cycle can blow the call stack or loop forever.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{Comment, CommentThread, NewComment},
    policy::{self, Action, Resource},
    repository::Repository,
};

/// create_comment
///
/// Creates a root comment, or a reply when `parent_comment_id` is given. The reply shows up
/// in the parent's `replies` as soon as it is stored; there is no second write to keep in
/// sync. The parent is not required to belong to `post_id`.
///
/// Only approved posts take comments from everyone; a pending or rejected post answers
/// 404 unless `author` wrote it or is an admin.
pub async fn create_comment(
    repo: &dyn Repository,
    post_id: Uuid,
    author: &AuthUser,
    content: String,
    parent_comment_id: Option<Uuid>,
) -> Result<Comment> {
    if content.trim().is_empty() {
        return Err(AppError::validation("Comment content is required"));
    }

    match repo.get_post(post_id).await? {
        Some(post) if policy::may_view_post(author, &post) => {}
        _ => return Err(AppError::not_found("Post not found")),
    }

    if let Some(parent_id) = parent_comment_id {
        if repo.get_comment(parent_id).await?.is_none() {
            return Err(AppError::not_found("Parent comment not found"));
        }
    }

    let comment = repo
        .insert_comment(NewComment {
            post_id,
            author_id: author.id,
            content,
            parent_comment_id,
        })
        .await?;

    tracing::info!(
        comment_id = %comment.id,
        post_id = %post_id,
        parent = ?parent_comment_id,
        "comment created"
    );

    Ok(comment)
}

/// delete_comment_subtree
///
/// Deletes `comment_id` and every reply reachable from it, children before parents.
/// Authorization is checked once, against the top comment only.
///
/// Each record is removed by its own repository call with no surrounding transaction: if one
/// of them fails, the records already deleted stay deleted and the error is returned.
///
/// Returns the number of records removed.
pub async fn delete_comment_subtree(
    repo: &dyn Repository,
    comment_id: Uuid,
    requester: &AuthUser,
) -> Result<u64> {
    let comment = repo
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;

    policy::authorize(
        requester,
        Action::DeleteComment,
        &Resource::Comment {
            author_id: comment.author_id,
        },
    )?;

    let order = collect_subtree(repo, comment_id).await?;

    let mut deleted = 0;
    for id in order {
        if repo.delete_comment(id).await? {
            deleted += 1;
        }
    }

    tracing::info!(
        comment_id = %comment_id,
        requester = %requester.id,
        deleted,
        "comment subtree deleted"
    );

    Ok(deleted)
}

/// collect_subtree
///
/// Every comment id reachable from `root` through replies, ordered so that each comment comes
/// after all of its descendants (safe deletion order). `root` is always last.
///
/// Ids met a second time are skipped: a well-formed tree never repeats one, so a repeat can
/// only mean a corrupted cycle.
pub async fn collect_subtree(repo: &dyn Repository, root: Uuid) -> Result<Vec<Uuid>> {
    let mut visited = HashSet::new();
    let mut discovered = Vec::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            tracing::warn!(comment_id = %id, root = %root, "cycle in comment replies, skipping");
            continue;
        }
        discovered.push(id);
        stack.extend(repo.get_reply_ids(id).await?);
    }

    // Discovery is pre-order, so every child appears after its parent; reversing it puts
    // children first.
    discovered.reverse();
    Ok(discovered)
}

/// Replies nested deeper than this are listed flat under their ancestor at this depth, so
/// a thread view is never more than `MAX_THREAD_DEPTH` levels below its root.
pub const MAX_THREAD_DEPTH: usize = 32;

/// build_threads
///
/// Nests a post's flat, oldest-first comment list into threads. Roots are comments without
/// a parent; replies keep their input order. Comments that cannot be reached from a root are
/// left out.
///
/// Nesting stops at [`MAX_THREAD_DEPTH`]: every deeper descendant becomes a sibling at that
/// level, in thread order. Both passes use explicit stacks, so a long reply chain costs heap,
/// not call depth.
pub fn build_threads(comments: Vec<Comment>) -> Vec<CommentThread> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let mut roots = Vec::new();
    for c in &comments {
        match c.parent_comment_id {
            Some(parent) => children.entry(parent).or_default().push(c.id),
            None => roots.push(c.id),
        }
    }

    // Pre-order walk from every root, recording the comment each one is displayed under.
    let mut placement: Vec<(Uuid, Option<Uuid>)> = Vec::with_capacity(comments.len());
    let mut visited = HashSet::new();
    let mut stack: Vec<(Uuid, Option<Uuid>, usize)> =
        roots.into_iter().rev().map(|id| (id, None, 0)).collect();

    while let Some((id, shown_under, depth)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        placement.push((id, shown_under));

        let Some(replies) = children.get(&id) else {
            continue;
        };
        let (anchor, next_depth) = if depth < MAX_THREAD_DEPTH {
            (Some(id), depth + 1)
        } else {
            (shown_under, depth)
        };
        stack.extend(replies.iter().rev().map(|child| (*child, anchor, next_depth)));
    }

    // In reverse pre-order every comment comes after everything displayed beneath it, so
    // its replies are complete by the time it is wrapped.
    let mut by_id: HashMap<Uuid, Comment> = comments.into_iter().map(|c| (c.id, c)).collect();
    let mut pending: HashMap<Uuid, Vec<CommentThread>> = HashMap::new();
    let mut threads = Vec::new();

    for (id, shown_under) in placement.into_iter().rev() {
        let Some(comment) = by_id.remove(&id) else {
            continue;
        };
        let mut replies = pending.remove(&id).unwrap_or_default();
        replies.reverse();

        let thread = CommentThread { comment, replies };
        match shown_under {
            Some(parent) => pending.entry(parent).or_default().push(thread),
            None => threads.push(thread),
        }
    }

    threads.reverse();
    threads
}
