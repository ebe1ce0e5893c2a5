//! Authorization policy.
//!
//! Every role and ownership check in the service goes through [`evaluate`], a pure function
//! of (subject, action, resource). Handlers call [`authorize`] and never compare roles or
//! author ids themselves.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{Post, PostStatus},
};

/// Something a subject wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// See or interact with a post that is not (yet) approved.
    ViewPost,
    UpdatePost,
    DeletePost,
    DeleteComment,
    /// Approve or reject posts, or list posts of any status.
    ModeratePosts,
    ManageCategories,
    /// List accounts or create them with a chosen role.
    ManageUsers,
    ViewUser,
    ViewDashboard,
}

/// What the action is applied to, reduced to the facts the policy needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Post { author_id: Uuid },
    Comment { author_id: Uuid },
    User { id: Uuid },
    /// Service-wide resources (moderation queue, categories, dashboards).
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Admins may do anything. Everyone else may modify what they authored and view themselves.
pub fn evaluate(subject: &AuthUser, action: Action, resource: &Resource) -> Decision {
    if subject.is_admin() {
        return Decision::Allow;
    }

    let allowed = match (action, resource) {
        (
            Action::ViewPost | Action::UpdatePost | Action::DeletePost,
            Resource::Post { author_id },
        ) => {
            *author_id == subject.id
        }
        (Action::DeleteComment, Resource::Comment { author_id }) => *author_id == subject.id,
        (Action::ViewUser, Resource::User { id }) => *id == subject.id,
        _ => false,
    };

    if allowed { Decision::Allow } else { Decision::Deny }
}

/// [`evaluate`], with `Deny` turned into a 403.
pub fn authorize(subject: &AuthUser, action: Action, resource: &Resource) -> Result<(), AppError> {
    match evaluate(subject, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::debug!(user_id = %subject.id, ?action, ?resource, "authorization denied");
            Err(AppError::forbidden(denial_message(action)))
        }
    }
}

fn denial_message(action: Action) -> &'static str {
    match action {
        Action::ViewPost => "Not authorized to view this post",
        Action::UpdatePost => "Not authorized to update this post",
        Action::DeletePost => "Not authorized to delete this post",
        Action::DeleteComment => "Not authorized to delete this comment",
        Action::ViewUser => "Not authorized to view this user",
        Action::ModeratePosts
        | Action::ManageCategories
        | Action::ManageUsers
        | Action::ViewDashboard => "Admin access required!",
    }
}

/// Approved posts are open to everyone; unpublished ones only to their author and admins.
/// Callers answer 404 rather than 403 so that hidden posts do not reveal themselves.
pub fn may_view_post(subject: &AuthUser, post: &Post) -> bool {
    post.status == PostStatus::Approved
        || evaluate(
            subject,
            Action::ViewPost,
            &Resource::Post {
                author_id: post.author_id,
            },
        ) == Decision::Allow
}
