use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::{
    Store, duplicate_value, matches_search, newest_first, paginate, require_actor, unknown_reference, validate_follow,
};
use crate::{
    config::ListingSettings,
    errors::Error,
    models::{
        Comment, CommentId, CommentPatch, Follow, FollowId, FollowQuery, Group, GroupId, GroupPatch, Identity, Listing,
        NewComment, NewFollow, NewGroup, NewPost, NewUser, Page, Post, PostId, PostPatch, PostQuery, User, UserId,
    },
    policy::{Action, Resource, ensure},
};

/// Process-local store. One mutex guards every table, so each operation sees
/// and leaves a consistent snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    listing: ListingSettings,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    handles: HashMap<String, UserId>,
    groups: BTreeMap<GroupId, Group>,
    slugs: HashMap<String, GroupId>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    follows: BTreeMap<FollowId, Follow>,
    pairs: HashMap<(UserId, UserId), FollowId>,
    sequences: Sequences,
    last_stamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Sequences {
    users: u64,
    groups: u64,
    posts: u64,
    comments: u64,
    follows: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl Tables {
    /// Creation timestamps never repeat or move backwards within one store.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn existing_post(&self, id: PostId) -> Result<&Post, Error> {
        self.posts.get(&id).ok_or_else(|| Error::not_found("post", id))
    }

    fn existing_comment(&self, post: PostId, id: CommentId) -> Result<&Comment, Error> {
        self.existing_post(post)?;
        self.comments
            .get(&id)
            .filter(|comment| comment.post == post)
            .ok_or_else(|| Error::not_found("comment", id))
    }

    fn check_group_reference(&self, group: Option<GroupId>) -> Result<(), Error> {
        match group {
            Some(id) if !self.groups.contains_key(&id) => Err(unknown_reference("group", id)),
            _ => Ok(()),
        }
    }

    fn followed_by(&self, follower: UserId) -> HashSet<UserId> {
        self.follows
            .values()
            .filter(|edge| edge.follower == follower)
            .map(|edge| edge.followed)
            .collect()
    }

    fn user_by_handle(&self, handle: &str) -> Option<&User> {
        self.handles.get(handle).and_then(|id| self.users.get(id))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(listing: ListingSettings) -> Self {
        Self {
            tables: Mutex::default(),
            listing,
        }
    }
}

impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        user.validate()?;
        let mut tables = self.tables.lock();
        if tables.handles.contains_key(&user.handle) {
            return Err(duplicate_value("handle", &user.handle));
        }
        let id = UserId(next(&mut tables.sequences.users));
        let created = User {
            id,
            handle: user.handle,
            credential_hash: user.credential_hash,
            role: user.role,
            joined_at: tables.stamp(),
        };
        tables.handles.insert(created.handle.clone(), id);
        tables.users.insert(id, created.clone());
        log::info!("registered user {} ({id})", created.handle);
        Ok(created)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, Error> {
        Ok(self.tables.lock().users.get(&id).cloned())
    }

    async fn user_by_handle(&self, handle: &str) -> Result<Option<User>, Error> {
        Ok(self.tables.lock().user_by_handle(handle).cloned())
    }

    async fn list_groups(&self, page: &Page) -> Result<Listing<Group>, Error> {
        let tables = self.tables.lock();
        let groups = tables.groups.values().cloned().collect();
        Ok(paginate(groups, page, &self.listing))
    }

    async fn group(&self, id: GroupId) -> Result<Option<Group>, Error> {
        Ok(self.tables.lock().groups.get(&id).cloned())
    }

    async fn create_group(&self, actor: Option<&Identity>, group: NewGroup) -> Result<Group, Error> {
        require_actor(actor)?;
        ensure(actor, Action::Create, Resource::Groups)?;
        group.validate()?;
        let mut tables = self.tables.lock();
        if tables.slugs.contains_key(&group.slug) {
            return Err(duplicate_value("slug", &group.slug));
        }
        let id = GroupId(next(&mut tables.sequences.groups));
        let created = Group {
            id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.slugs.insert(created.slug.clone(), id);
        tables.groups.insert(id, created.clone());
        Ok(created)
    }

    async fn update_group(&self, actor: Option<&Identity>, id: GroupId, patch: GroupPatch) -> Result<Group, Error> {
        require_actor(actor)?;
        let mut tables = self.tables.lock();
        let group = tables.groups.get_mut(&id).ok_or_else(|| Error::not_found("group", id))?;
        ensure(actor, Action::Update, Resource::Group(group))?;
        patch.validate()?;
        patch.apply(group);
        Ok(group.clone())
    }

    async fn delete_group(&self, actor: Option<&Identity>, id: GroupId) -> Result<(), Error> {
        require_actor(actor)?;
        let mut tables = self.tables.lock();
        let group = tables.groups.get(&id).ok_or_else(|| Error::not_found("group", id))?;
        ensure(actor, Action::Delete, Resource::Group(group))?;
        let slug = group.slug.clone();
        tables.groups.remove(&id);
        tables.slugs.remove(&slug);
        let mut detached = 0;
        for post in tables.posts.values_mut().filter(|post| post.group == Some(id)) {
            post.group = None;
            detached += 1;
        }
        log::info!("deleted group {id}, detached {detached} posts");
        Ok(())
    }

    async fn list_posts(&self, actor: Option<&Identity>, query: &PostQuery) -> Result<Listing<Post>, Error> {
        ensure(actor, Action::Read, Resource::Posts)?;
        let tables = self.tables.lock();
        let authors = if query.following {
            Some(tables.followed_by(require_actor(actor)?.user))
        } else {
            None
        };
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|post| query.group.is_none() || post.group == query.group)
            .filter(|post| authors.as_ref().is_none_or(|authors| authors.contains(&post.author)))
            .cloned()
            .collect();
        posts.sort_by(|a, b| newest_first((&a.pub_date, a.id), (&b.pub_date, b.id)));
        Ok(paginate(posts, &query.page, &self.listing))
    }

    async fn post(&self, id: PostId) -> Result<Option<Post>, Error> {
        Ok(self.tables.lock().posts.get(&id).cloned())
    }

    async fn create_post(&self, actor: Option<&Identity>, post: NewPost) -> Result<Post, Error> {
        let author = require_actor(actor)?.user;
        ensure(actor, Action::Create, Resource::Posts)?;
        post.validate()?;
        let mut tables = self.tables.lock();
        tables.check_group_reference(post.group)?;
        let id = PostId(next(&mut tables.sequences.posts));
        let created = Post {
            id,
            author,
            text: post.text,
            pub_date: tables.stamp(),
            image: post.image,
            group: post.group,
        };
        tables.posts.insert(id, created.clone());
        Ok(created)
    }

    async fn update_post_if_owner(
        &self,
        actor: Option<&Identity>,
        id: PostId,
        patch: PostPatch,
    ) -> Result<Post, Error> {
        require_actor(actor)?;
        let mut tables = self.tables.lock();
        let current = tables.existing_post(id)?;
        ensure(actor, Action::Update, Resource::Post(current))?;
        patch.validate()?;
        tables.check_group_reference(patch.resulting_group(current.group))?;
        let post = tables.posts.get_mut(&id).ok_or_else(|| Error::not_found("post", id))?;
        patch.apply(post);
        Ok(post.clone())
    }

    async fn delete_post_if_owner(&self, actor: Option<&Identity>, id: PostId) -> Result<(), Error> {
        require_actor(actor)?;
        let mut tables = self.tables.lock();
        ensure(actor, Action::Delete, Resource::Post(tables.existing_post(id)?))?;
        tables.posts.remove(&id);
        let before = tables.comments.len();
        tables.comments.retain(|_, comment| comment.post != id);
        log::debug!("deleted post {id} with {} comments", before - tables.comments.len());
        Ok(())
    }

    async fn list_comments(&self, post: PostId, page: &Page) -> Result<Listing<Comment>, Error> {
        let tables = self.tables.lock();
        tables.existing_post(post)?;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|comment| comment.post == post)
            .cloned()
            .collect();
        comments.sort_by(|a, b| newest_first((&a.created, a.id), (&b.created, b.id)));
        Ok(paginate(comments, page, &self.listing))
    }

    async fn comment(&self, post: PostId, id: CommentId) -> Result<Option<Comment>, Error> {
        let tables = self.tables.lock();
        tables.existing_post(post)?;
        Ok(tables.comments.get(&id).filter(|comment| comment.post == post).cloned())
    }

    async fn create_comment(
        &self,
        actor: Option<&Identity>,
        post: PostId,
        comment: NewComment,
    ) -> Result<Comment, Error> {
        let author = require_actor(actor)?.user;
        let mut tables = self.tables.lock();
        ensure(actor, Action::Create, Resource::Comments(tables.existing_post(post)?))?;
        comment.validate()?;
        let id = CommentId(next(&mut tables.sequences.comments));
        let created = Comment {
            id,
            author,
            post,
            text: comment.text,
            created: tables.stamp(),
        };
        tables.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn update_comment_if_owner(
        &self,
        actor: Option<&Identity>,
        post: PostId,
        id: CommentId,
        patch: CommentPatch,
    ) -> Result<Comment, Error> {
        require_actor(actor)?;
        let mut tables = self.tables.lock();
        ensure(actor, Action::Update, Resource::Comment(tables.existing_comment(post, id)?))?;
        patch.validate()?;
        let comment = tables.comments.get_mut(&id).ok_or_else(|| Error::not_found("comment", id))?;
        patch.apply(comment);
        Ok(comment.clone())
    }

    async fn delete_comment_if_owner(
        &self,
        actor: Option<&Identity>,
        post: PostId,
        id: CommentId,
    ) -> Result<(), Error> {
        require_actor(actor)?;
        let mut tables = self.tables.lock();
        ensure(actor, Action::Delete, Resource::Comment(tables.existing_comment(post, id)?))?;
        tables.comments.remove(&id);
        Ok(())
    }

    async fn list_follows(&self, actor: Option<&Identity>, query: &FollowQuery) -> Result<Listing<Follow>, Error> {
        ensure(actor, Action::Read, Resource::Follows)?;
        let follower = require_actor(actor)?.user;
        let tables = self.tables.lock();
        let mut edges: Vec<Follow> = tables
            .follows
            .values()
            .filter(|edge| edge.follower == follower)
            .filter(|edge| {
                tables
                    .users
                    .get(&edge.followed)
                    .is_some_and(|user| matches_search(&user.handle, query.search.as_deref()))
            })
            .cloned()
            .collect();
        edges.sort_by(|a, b| newest_first((&a.created, a.id), (&b.created, b.id)));
        Ok(paginate(edges, &query.page, &self.listing))
    }

    async fn create_follow(&self, actor: Option<&Identity>, follow: NewFollow) -> Result<Follow, Error> {
        let follower = require_actor(actor)?.user;
        ensure(actor, Action::Create, Resource::Follows)?;
        let mut tables = self.tables.lock();
        let followed = tables
            .user_by_handle(&follow.following)
            .map(|user| user.id)
            .ok_or_else(|| unknown_reference("following", &follow.following))?;
        validate_follow(follower, followed, tables.pairs.contains_key(&(follower, followed)))?;
        let id = FollowId(next(&mut tables.sequences.follows));
        let created = Follow {
            id,
            follower,
            followed,
            created: tables.stamp(),
        };
        tables.pairs.insert((follower, followed), id);
        tables.follows.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_follow(&self, actor: Option<&Identity>, following: &str) -> Result<(), Error> {
        let follower = require_actor(actor)?.user;
        let mut tables = self.tables.lock();
        let followed = tables
            .user_by_handle(following)
            .map(|user| user.id)
            .ok_or_else(|| Error::not_found("user", following))?;
        let edge = tables
            .pairs
            .get(&(follower, followed))
            .and_then(|id| tables.follows.get(id))
            .ok_or_else(|| Error::not_found("follow", following))?;
        ensure(actor, Action::Delete, Resource::Follow(edge))?;
        let id = edge.id;
        tables.follows.remove(&id);
        tables.pairs.remove(&(follower, followed));
        Ok(())
    }
}
