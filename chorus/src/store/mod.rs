//! Resource store: persistence for users, groups, posts, comments and follow edges.
//!
//! Every mutating operation takes the acting identity explicitly and performs
//! the ownership check and the write as one atomic unit: under a single lock
//! for [`MemoryStore`], inside a single Lua script for [`RedisStore`]. A
//! resource removed by a concurrent request surfaces as `NotFound`.
//!
//! Listings are newest first by creation timestamp, ties broken by ascending
//! id. Groups carry no timestamp and list by ascending id.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use self::redis::{RedisStore, SERVICE};

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::{
    config::ListingSettings,
    errors::{Error, FollowViolation, ValidationError},
    models::{
        Comment, CommentId, CommentPatch, Follow, FollowQuery, Group, GroupId, GroupPatch, Identity, Listing, NewComment,
        NewFollow, NewGroup, NewPost, NewUser, Page, Post, PostId, PostPatch, PostQuery, User, UserId,
    },
};

#[allow(async_fn_in_trait)]
pub trait Store {
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;
    async fn user(&self, id: UserId) -> Result<Option<User>, Error>;
    async fn user_by_handle(&self, handle: &str) -> Result<Option<User>, Error>;

    async fn list_groups(&self, page: &Page) -> Result<Listing<Group>, Error>;
    async fn group(&self, id: GroupId) -> Result<Option<Group>, Error>;
    async fn create_group(&self, actor: Option<&Identity>, group: NewGroup) -> Result<Group, Error>;
    async fn update_group(&self, actor: Option<&Identity>, id: GroupId, patch: GroupPatch) -> Result<Group, Error>;
    /// Removes the group; its posts stay and lose their group reference.
    async fn delete_group(&self, actor: Option<&Identity>, id: GroupId) -> Result<(), Error>;

    /// Following-feed mode requires an actor and fails with `Unauthenticated` otherwise.
    async fn list_posts(&self, actor: Option<&Identity>, query: &PostQuery) -> Result<Listing<Post>, Error>;
    async fn post(&self, id: PostId) -> Result<Option<Post>, Error>;
    /// Author and publication date come from the actor and the server clock.
    async fn create_post(&self, actor: Option<&Identity>, post: NewPost) -> Result<Post, Error>;
    async fn update_post_if_owner(&self, actor: Option<&Identity>, id: PostId, patch: PostPatch)
    -> Result<Post, Error>;
    /// Removes the post together with its comments.
    async fn delete_post_if_owner(&self, actor: Option<&Identity>, id: PostId) -> Result<(), Error>;

    /// Fails with `NotFound` when the post does not exist.
    async fn list_comments(&self, post: PostId, page: &Page) -> Result<Listing<Comment>, Error>;
    /// Fails with `NotFound` when the post does not exist; `None` when the
    /// comment does not exist under that post.
    async fn comment(&self, post: PostId, id: CommentId) -> Result<Option<Comment>, Error>;
    async fn create_comment(
        &self,
        actor: Option<&Identity>,
        post: PostId,
        comment: NewComment,
    ) -> Result<Comment, Error>;
    async fn update_comment_if_owner(
        &self,
        actor: Option<&Identity>,
        post: PostId,
        id: CommentId,
        patch: CommentPatch,
    ) -> Result<Comment, Error>;
    async fn delete_comment_if_owner(&self, actor: Option<&Identity>, post: PostId, id: CommentId)
    -> Result<(), Error>;

    /// Edges whose follower is the actor.
    async fn list_follows(&self, actor: Option<&Identity>, query: &FollowQuery) -> Result<Listing<Follow>, Error>;
    async fn create_follow(&self, actor: Option<&Identity>, follow: NewFollow) -> Result<Follow, Error>;
    /// Removes the actor's edge to the user with handle `following`.
    async fn delete_follow(&self, actor: Option<&Identity>, following: &str) -> Result<(), Error>;
}

/// Follow invariants, checked before an edge is persisted.
///
/// Storage enforces pair uniqueness on its own; a duplicate it rejects is
/// reported through this same violation type.
pub fn validate_follow(
    follower: UserId,
    followed: UserId,
    already_following: bool,
) -> Result<(), FollowViolation> {
    if follower == followed {
        return Err(FollowViolation::SelfFollow);
    }
    if already_following {
        return Err(FollowViolation::DuplicateFollow);
    }
    Ok(())
}

/// Mutations need an authenticated actor before anything else is looked at.
pub(crate) fn require_actor(actor: Option<&Identity>) -> Result<&Identity, Error> {
    actor.ok_or(Error::Unauthenticated)
}

pub(crate) fn unknown_reference(field: &str, id: impl std::fmt::Display) -> Error {
    Error::Validation(ValidationError::single(
        field,
        "not_found",
        format!("invalid pk \"{id}\" - object does not exist"),
    ))
}

pub(crate) fn duplicate_value(field: &str, value: &str) -> Error {
    Error::Validation(ValidationError::single(
        field,
        "unique",
        format!("an entry with {field} \"{value}\" already exists"),
    ))
}

/// Newest first, then ascending id.
pub(crate) fn newest_first<I: Ord>(a: (&DateTime<Utc>, I), b: (&DateTime<Utc>, I)) -> Ordering {
    b.0.cmp(a.0).then_with(|| a.1.cmp(&b.1))
}

/// Case-insensitive substring match used by follow search.
pub(crate) fn matches_search(handle: &str, search: Option<&str>) -> bool {
    match search.map(str::trim) {
        None | Some("") => true,
        Some(term) => handle.to_lowercase().contains(&term.to_lowercase()),
    }
}

/// Cuts one page out of an already ordered list.
pub(crate) fn paginate<T>(items: Vec<T>, page: &Page, listing: &ListingSettings) -> Listing<T> {
    let (offset, limit) = listing.window(page);
    let count = items.len();
    Listing {
        count,
        items: items.into_iter().skip(offset).take(limit).collect(),
    }
}
