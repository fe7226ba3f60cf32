//! Response shapes. Authors and follow targets are rendered by handle.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Comment, CommentId, Group, GroupId, Post, PostId, Role, User, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

impl PostView {
    pub fn new(post: Post, author: impl Into<String>) -> Self {
        Self {
            id: post.id,
            author: author.into(),
            text: post.text,
            pub_date: post.pub_date,
            image: post.image,
            group: post.group,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub author: String,
    pub post: PostId,
    pub text: String,
    pub created: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: Comment, author: impl Into<String>) -> Self {
        Self {
            id: comment.id,
            author: author.into(),
            post: comment.post,
            text: comment.text,
            created: comment.created,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub id: GroupId,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<Group> for GroupView {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

/// `user` follows `following`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowView {
    pub user: String,
    pub following: String,
}

impl FollowView {
    pub fn new(user: impl Into<String>, following: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            following: following.into(),
        }
    }
}

/// Public part of a user record; the credential hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub handle: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            handle: user.handle,
            role: user.role,
            joined_at: user.joined_at,
        }
    }
}
