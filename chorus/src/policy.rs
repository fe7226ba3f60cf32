//! Ownership policy: decides whether an actor may perform an action on a resource.
//!
//! `authorize` is total over every (actor, action, resource) combination the
//! stores can produce. Rules, in precedence order:
//!
//! 1. reads of posts, groups and comments are always allowed, anonymous included;
//! 2. creating posts, comments and follow edges needs an authenticated actor;
//! 3. posts and comments are mutated only by their author;
//! 4. follow edges are deleted (and listed) only by their follower and are never updated;
//! 5. groups are managed only by administrators.

use std::fmt;

use crate::{
    errors::Error,
    models::{Comment, Follow, Group, Identity, Post},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Scope an action is evaluated against. Collection variants stand for list/create.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Posts,
    Post(&'a Post),
    Groups,
    Group(&'a Group),
    /// Comments under the given post.
    Comments(&'a Post),
    Comment(&'a Comment),
    /// The actor's own follow edges.
    Follows,
    Follow(&'a Follow),
}

impl Resource<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Posts | Resource::Post(_) => "post",
            Resource::Groups | Resource::Group(_) => "group",
            Resource::Comments(_) | Resource::Comment(_) => "comment",
            Resource::Follows | Resource::Follow(_) => "follow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Forbidden,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts a denial into the matching error for `action` on `resource`.
    pub fn into_result(self, action: Action, resource: &Resource<'_>) -> Result<(), Error> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason.into_error(action, resource.kind())),
        }
    }
}

impl DenyReason {
    pub fn into_error(self, action: Action, kind: &'static str) -> Error {
        match self {
            DenyReason::Unauthenticated => Error::Unauthenticated,
            DenyReason::Forbidden => Error::Forbidden {
                reason: format!("only the owner may {action} this {kind}").into(),
            },
            DenyReason::Unsupported => Error::Unsupported {
                action: format!("{action} {kind}").into(),
            },
        }
    }
}

impl From<DenyReason> for Error {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => Error::Unauthenticated,
            DenyReason::Forbidden => Error::Forbidden {
                reason: "not the owner".into(),
            },
            DenyReason::Unsupported => Error::Unsupported {
                action: "operation not supported".into(),
            },
        }
    }
}

/// Evaluates the ownership rules for one request.
pub fn authorize(actor: Option<&Identity>, action: Action, resource: Resource<'_>) -> Decision {
    use Action::*;
    use DenyReason::*;

    let decision = match (action, resource) {
        (Read, Resource::Posts | Resource::Post(_)) => Decision::Allow,
        (Read, Resource::Groups | Resource::Group(_)) => Decision::Allow,
        (Read, Resource::Comments(_) | Resource::Comment(_)) => Decision::Allow,
        (Read, Resource::Follows) => authenticated(actor),
        (Read, Resource::Follow(edge)) => owned_by(actor, edge.follower),

        (Create, Resource::Posts | Resource::Comments(_) | Resource::Follows) => authenticated(actor),
        // A single post, comment or edge is never a creation target.
        (Create, Resource::Post(_) | Resource::Comment(_) | Resource::Follow(_)) => Decision::Deny(Unsupported),

        (Update | Delete, Resource::Post(post)) => owned_by(actor, post.author),
        (Update | Delete, Resource::Comment(comment)) => owned_by(actor, comment.author),
        (Delete, Resource::Follow(edge)) => owned_by(actor, edge.follower),
        (Update, Resource::Follow(_)) => Decision::Deny(Unsupported),

        (Create, Resource::Groups) | (Update | Delete, Resource::Group(_)) => administrator(actor),
        (Create, Resource::Group(_)) => Decision::Deny(Unsupported),

        (Update | Delete, Resource::Posts | Resource::Groups | Resource::Comments(_) | Resource::Follows) => {
            Decision::Deny(Unsupported)
        }
    };

    if let Decision::Deny(reason) = decision {
        log::debug!(
            "denied {action} on {} for actor {:?}: {reason:?}",
            resource.kind(),
            actor.map(|identity| identity.user)
        );
    }
    decision
}

/// Shorthand for `authorize(..).into_result(..)`.
pub fn ensure(actor: Option<&Identity>, action: Action, resource: Resource<'_>) -> Result<(), Error> {
    authorize(actor, action, resource).into_result(action, &resource)
}

fn authenticated(actor: Option<&Identity>) -> Decision {
    match actor {
        Some(_) => Decision::Allow,
        None => Decision::Deny(DenyReason::Unauthenticated),
    }
}

fn owned_by(actor: Option<&Identity>, owner: crate::models::UserId) -> Decision {
    match actor {
        Some(identity) if identity.user == owner => Decision::Allow,
        Some(_) => Decision::Deny(DenyReason::Forbidden),
        None => Decision::Deny(DenyReason::Unauthenticated),
    }
}

fn administrator(actor: Option<&Identity>) -> Decision {
    match actor {
        Some(identity) if identity.is_admin() => Decision::Allow,
        Some(_) => Decision::Deny(DenyReason::Forbidden),
        None => Decision::Deny(DenyReason::Unauthenticated),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{CommentId, FollowId, GroupId, PostId, UserId};

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn post(author: UserId) -> Post {
        Post {
            id: PostId(10),
            author,
            text: "hello".into(),
            pub_date: Utc::now(),
            image: None,
            group: None,
        }
    }

    fn comment(author: UserId) -> Comment {
        Comment {
            id: CommentId(20),
            author,
            post: PostId(10),
            text: "reply".into(),
            created: Utc::now(),
        }
    }

    fn group() -> Group {
        Group {
            id: GroupId(1),
            title: "Rust".into(),
            slug: "rust".into(),
            description: String::new(),
        }
    }

    fn edge(follower: UserId, followed: UserId) -> Follow {
        Follow {
            id: FollowId(5),
            follower,
            followed,
            created: Utc::now(),
        }
    }

    #[test]
    fn reads_are_public() {
        let post = post(ALICE);
        let comment = comment(ALICE);
        let group = group();
        for resource in [
            Resource::Posts,
            Resource::Post(&post),
            Resource::Groups,
            Resource::Group(&group),
            Resource::Comments(&post),
            Resource::Comment(&comment),
        ] {
            assert_eq!(authorize(None, Action::Read, resource), Decision::Allow);
        }
    }

    #[test]
    fn creation_needs_an_actor() {
        let post = post(ALICE);
        let bob = Identity::member(BOB);
        for resource in [Resource::Posts, Resource::Comments(&post), Resource::Follows] {
            assert_eq!(
                authorize(None, Action::Create, resource),
                Decision::Deny(DenyReason::Unauthenticated)
            );
            assert_eq!(authorize(Some(&bob), Action::Create, resource), Decision::Allow);
        }
    }

    #[test]
    fn only_the_author_mutates_a_post() {
        let post = post(ALICE);
        let alice = Identity::member(ALICE);
        let bob = Identity::member(BOB);
        for action in [Action::Update, Action::Delete] {
            assert_eq!(authorize(Some(&alice), action, Resource::Post(&post)), Decision::Allow);
            assert_eq!(
                authorize(Some(&bob), action, Resource::Post(&post)),
                Decision::Deny(DenyReason::Forbidden)
            );
        }
    }

    #[test]
    fn comment_ownership_is_comment_scoped() {
        // Bob wrote the comment on Alice's post: Alice may not touch it.
        let comment = comment(BOB);
        let alice = Identity::member(ALICE);
        let bob = Identity::member(BOB);
        assert_eq!(
            authorize(Some(&alice), Action::Delete, Resource::Comment(&comment)),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(authorize(Some(&bob), Action::Update, Resource::Comment(&comment)), Decision::Allow);
    }

    #[test]
    fn follow_edges_belong_to_the_follower() {
        let edge = edge(ALICE, BOB);
        let alice = Identity::member(ALICE);
        let bob = Identity::member(BOB);
        assert_eq!(authorize(Some(&alice), Action::Delete, Resource::Follow(&edge)), Decision::Allow);
        assert_eq!(
            authorize(Some(&bob), Action::Delete, Resource::Follow(&edge)),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            authorize(Some(&alice), Action::Update, Resource::Follow(&edge)),
            Decision::Deny(DenyReason::Unsupported)
        );
        assert_eq!(
            authorize(None, Action::Read, Resource::Follows),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn groups_are_administrative() {
        let group = group();
        let member = Identity::member(ALICE);
        let admin = Identity::admin(BOB);
        assert_eq!(
            authorize(Some(&member), Action::Create, Resource::Groups),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            authorize(None, Action::Delete, Resource::Group(&group)),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(authorize(Some(&admin), Action::Update, Resource::Group(&group)), Decision::Allow);
    }

    #[test]
    fn every_combination_yields_a_decision() {
        let post = post(ALICE);
        let comment = comment(ALICE);
        let group = group();
        let edge = edge(ALICE, BOB);
        let resources = [
            Resource::Posts,
            Resource::Post(&post),
            Resource::Groups,
            Resource::Group(&group),
            Resource::Comments(&post),
            Resource::Comment(&comment),
            Resource::Follows,
            Resource::Follow(&edge),
        ];
        let alice = Identity::member(ALICE);
        let admin = Identity::admin(BOB);
        for actor in [None, Some(&alice), Some(&admin)] {
            for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
                for resource in resources {
                    let decision = authorize(actor, action, resource);
                    if action == Action::Update && matches!(resource, Resource::Follow(_)) {
                        assert_eq!(decision, Decision::Deny(DenyReason::Unsupported));
                    }
                }
            }
        }
    }

    #[test]
    fn denial_maps_to_error_kind() {
        let post = post(ALICE);
        let bob = Identity::member(BOB);
        let err = ensure(Some(&bob), Action::Delete, Resource::Post(&post)).expect_err("denied");
        assert_eq!(err.kind(), crate::errors::ErrorKind::Forbidden);
    }
}
