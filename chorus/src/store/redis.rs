use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, cmd};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{Store, matches_search, paginate, require_actor, unknown_reference, validate_follow};
use crate::{
    config::ListingSettings,
    errors::{Error, FollowViolation},
    id::{generate_token_id, padded},
    keys::{COMMENTS, FOLLOWS, GROUPS, KeyContext, POSTS, USERS},
    models::{
        Comment, CommentId, CommentPatch, Follow, FollowId, FollowQuery, Group, GroupId, GroupPatch, Identity, Listing,
        NewComment, NewFollow, NewGroup, NewPost, NewUser, Page, Post, PostId, PostPatch, PostQuery, User, UserId,
    },
    policy::{Action, Resource, ensure},
    runtime::{
        DeleteCascade, EntityCreate, EntityDelete, EntityPatch, FieldAssignment, FieldIndex, FieldIndexMove,
        IndexEntry, MutationCommand, MutationExecutor, OwnerGuard, RedisExecutor, RequiredReference, UniqueClaim,
    },
};

/// Service segment of every key this store writes.
pub const SERVICE: &str = "chorus";

/// Score for collections listed purely by id.
const FLAT_SCORE: &str = "0";

/// Seconds a scratch set for a feed query may outlive a failed cleanup.
const SCRATCH_TTL_SECS: u64 = 30;

/// Inclusive `ZRANGE` ranks for a page. Both ends saturate at `i64::MAX`,
/// which Redis answers with an empty range.
fn rank_range(offset: usize, limit: usize) -> (i64, i64) {
    let last = offset.saturating_add(limit.saturating_sub(1));
    (
        i64::try_from(offset).unwrap_or(i64::MAX),
        i64::try_from(last).unwrap_or(i64::MAX),
    )
}

/// Redis-backed store. Documents are JSON strings; listings are sorted sets
/// scored by negated creation time in microseconds with zero-padded id members.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    service: String,
    listing: ListingSettings,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, listing: ListingSettings) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            service: SERVICE.to_string(),
            listing,
        }
    }

    pub async fn connect(url: &str, prefix: impl Into<String>, listing: ListingSettings) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, prefix, listing))
    }

    /// Scopes every key under a different service segment.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, &self.service)
    }

    /// Deletes every key under this store's prefix and service.
    pub async fn clear(&self) -> Result<u64, Error> {
        const SCAN_COUNT: usize = 512;
        let pattern = self.keys().service_pattern();
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            if !batch.is_empty() {
                let count: u64 = cmd("DEL").arg(&batch).query_async(&mut conn).await?;
                removed += count;
            }
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(removed)
    }

    async fn execute(&self, command: MutationCommand) -> Result<Value, Error> {
        let mut conn = self.conn.clone();
        let mut executor = RedisExecutor::new(&mut conn);
        executor.execute(command).await
    }

    async fn next_id(&self, collection: &str) -> Result<u64, Error> {
        let mut conn = self.conn.clone();
        let id: u64 = cmd("INCR").arg(self.keys().sequence(collection)).query_async(&mut conn).await?;
        Ok(id)
    }

    async fn get<T: DeserializeOwned>(&self, collection: &str, id: u64) -> Result<Option<T>, Error> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = cmd("GET").arg(self.keys().entity(collection, id)).query_async(&mut conn).await?;
        raw.as_deref().map(decode::<T>).transpose()
    }

    /// Loads the documents behind sorted-set members, skipping ones deleted meanwhile.
    async fn get_members<T: DeserializeOwned>(&self, collection: &str, members: &[String]) -> Result<Vec<T>, Error> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let prefix = self.keys().entity_prefix(collection);
        let keys: Vec<String> = members.iter().map(|member| format!("{prefix}{member}")).collect();
        let mut conn = self.conn.clone();
        let raw: Vec<Option<String>> = cmd("MGET").arg(&keys).query_async(&mut conn).await?;
        raw.iter().flatten().map(|json| decode(json)).collect()
    }

    async fn all_members(&self, index_key: &str) -> Result<Vec<String>, Error> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = cmd("ZRANGE").arg(index_key).arg(0).arg(-1).query_async(&mut conn).await?;
        Ok(members)
    }

    async fn page_of<T: DeserializeOwned>(
        &self,
        index_key: &str,
        collection: &str,
        page: &Page,
    ) -> Result<Listing<T>, Error> {
        let (offset, limit) = self.listing.window(page);
        let (start, stop) = rank_range(offset, limit);
        let mut conn = self.conn.clone();
        let (count, members): (usize, Vec<String>) = redis::pipe()
            .cmd("ZCARD")
            .arg(index_key)
            .cmd("ZRANGE")
            .arg(index_key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await?;
        let items = self.get_members(collection, &members).await?;
        Ok(Listing { count, items })
    }

    /// Posts by any of `authors`, optionally narrowed to one group.
    async fn feed_page(&self, authors: &[UserId], group: Option<GroupId>, page: &Page) -> Result<Listing<Post>, Error> {
        if authors.is_empty() {
            return Ok(Listing::empty());
        }
        let keys = self.keys();
        let scratch = keys.scratch(&format!("feed:{}", generate_token_id()));
        let sources: Vec<String> = authors
            .iter()
            .map(|author| keys.index_by(POSTS, "author", author.0))
            .collect();
        let (offset, limit) = self.listing.window(page);
        let (start, stop) = rank_range(offset, limit);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("ZUNIONSTORE")
            .arg(&scratch)
            .arg(sources.len())
            .arg(&sources)
            .ignore();
        if let Some(group) = group {
            pipe.cmd("ZINTERSTORE")
                .arg(&scratch)
                .arg(2)
                .arg(&scratch)
                .arg(keys.index_by(POSTS, "group", group.0))
                .arg("WEIGHTS")
                .arg(1)
                .arg(0)
                .ignore();
        }
        pipe.cmd("EXPIRE")
            .arg(&scratch)
            .arg(SCRATCH_TTL_SECS)
            .ignore()
            .cmd("ZCARD")
            .arg(&scratch)
            .cmd("ZRANGE")
            .arg(&scratch)
            .arg(start)
            .arg(stop)
            .cmd("DEL")
            .arg(&scratch)
            .ignore();

        let mut conn = self.conn.clone();
        let (count, members): (usize, Vec<String>) = pipe.query_async(&mut conn).await?;
        let items = self.get_members(POSTS, &members).await?;
        Ok(Listing { count, items })
    }

    async fn followed_by(&self, follower: UserId) -> Result<Vec<Follow>, Error> {
        let members = self.all_members(&self.keys().index_by(FOLLOWS, "follower", follower.0)).await?;
        self.get_members(FOLLOWS, &members).await
    }

    async fn existing_post(&self, id: PostId) -> Result<Post, Error> {
        self.get(POSTS, id.0).await?.ok_or_else(|| Error::not_found("post", id))
    }

    async fn existing_comment(&self, post: PostId, id: CommentId) -> Result<Comment, Error> {
        self.existing_post(post).await?;
        self.get::<Comment>(COMMENTS, id.0)
            .await?
            .filter(|comment| comment.post == post)
            .ok_or_else(|| Error::not_found("comment", id))
    }
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, Error> {
    serde_json::from_str(raw).map_err(|err| Error::other(format!("failed to deserialize entity: {err}")))
}

fn encode<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|err| Error::other(format!("failed to serialize entity: {err}")))
}

fn assign<T: Serialize>(field: &str, value: &T) -> Result<FieldAssignment, Error> {
    FieldAssignment::new(field, value).map_err(|err| Error::other(format!("failed to serialize {field}: {err}")))
}

/// Decodes the document returned by a patch script.
fn patched<T: DeserializeOwned>(response: &Value) -> Result<T, Error> {
    let json = response
        .get("entity_json")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::other("patch response missing entity_json"))?;
    decode(json)
}

/// Newest first: more recent timestamps get lower scores.
fn recency_score(at: &DateTime<Utc>) -> String {
    (-at.timestamp_micros()).to_string()
}

fn owner_guard(field: &str, owner: UserId) -> Option<OwnerGuard> {
    Some(OwnerGuard {
        field: field.to_string(),
        expected: owner.to_string(),
    })
}

impl Store for RedisStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        user.validate()?;
        let id = self.next_id(USERS).await?;
        let created = User {
            id: UserId(id),
            handle: user.handle,
            credential_hash: user.credential_hash,
            role: user.role,
            joined_at: Utc::now(),
        };
        let keys = self.keys();
        self.execute(MutationCommand::CreateEntity(EntityCreate {
            entity: "user",
            key: keys.entity(USERS, id),
            entity_id: id.to_string(),
            payload_json: encode(&created)?,
            required: Vec::new(),
            unique_constraints: vec![UniqueClaim {
                field: "handle".into(),
                key: keys.unique(USERS, "handle", &created.handle),
                value: created.handle.clone(),
            }],
            indexes: vec![IndexEntry {
                key: keys.index_all(USERS),
                score: FLAT_SCORE.into(),
                member: padded(id),
            }],
        }))
        .await?;
        log::info!("registered user {} ({id})", created.handle);
        Ok(created)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, Error> {
        self.get(USERS, id.0).await
    }

    async fn user_by_handle(&self, handle: &str) -> Result<Option<User>, Error> {
        let mut conn = self.conn.clone();
        let id: Option<u64> = cmd("GET")
            .arg(self.keys().unique(USERS, "handle", handle))
            .query_async(&mut conn)
            .await?;
        match id {
            Some(id) => self.get(USERS, id).await,
            None => Ok(None),
        }
    }

    async fn list_groups(&self, page: &Page) -> Result<Listing<Group>, Error> {
        self.page_of(&self.keys().index_all(GROUPS), GROUPS, page).await
    }

    async fn group(&self, id: GroupId) -> Result<Option<Group>, Error> {
        self.get(GROUPS, id.0).await
    }

    async fn create_group(&self, actor: Option<&Identity>, group: NewGroup) -> Result<Group, Error> {
        require_actor(actor)?;
        ensure(actor, Action::Create, Resource::Groups)?;
        group.validate()?;
        let id = self.next_id(GROUPS).await?;
        let created = Group {
            id: GroupId(id),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        let keys = self.keys();
        self.execute(MutationCommand::CreateEntity(EntityCreate {
            entity: "group",
            key: keys.entity(GROUPS, id),
            entity_id: id.to_string(),
            payload_json: encode(&created)?,
            required: Vec::new(),
            unique_constraints: vec![UniqueClaim {
                field: "slug".into(),
                key: keys.unique(GROUPS, "slug", &created.slug),
                value: created.slug.clone(),
            }],
            indexes: vec![IndexEntry {
                key: keys.index_all(GROUPS),
                score: FLAT_SCORE.into(),
                member: padded(id),
            }],
        }))
        .await?;
        Ok(created)
    }

    async fn update_group(&self, actor: Option<&Identity>, id: GroupId, patch: GroupPatch) -> Result<Group, Error> {
        require_actor(actor)?;
        let current: Group = self.get(GROUPS, id.0).await?.ok_or_else(|| Error::not_found("group", id))?;
        ensure(actor, Action::Update, Resource::Group(&current))?;
        patch.validate()?;
        let mut assignments = Vec::new();
        if let Some(title) = &patch.title {
            assignments.push(assign("title", title)?);
        }
        if let Some(description) = &patch.description {
            assignments.push(assign("description", description)?);
        }
        let response = self
            .execute(MutationCommand::PatchEntity(EntityPatch {
                entity: "group",
                key: self.keys().entity(GROUPS, id.0),
                entity_id: id.to_string(),
                owner_guard: None,
                assignments,
                required: Vec::new(),
                reindex: Vec::new(),
            }))
            .await?;
        patched(&response)
    }

    async fn delete_group(&self, actor: Option<&Identity>, id: GroupId) -> Result<(), Error> {
        require_actor(actor)?;
        let current: Group = self.get(GROUPS, id.0).await?.ok_or_else(|| Error::not_found("group", id))?;
        ensure(actor, Action::Delete, Resource::Group(&current))?;
        let keys = self.keys();
        let response = self
            .execute(MutationCommand::DeleteEntity(EntityDelete {
                entity: "group",
                key: keys.entity(GROUPS, id.0),
                entity_id: id.to_string(),
                member: padded(id.0),
                owner_guard: None,
                indexes: vec![keys.index_all(GROUPS)],
                field_indexes: Vec::new(),
                unique_keys: vec![keys.unique(GROUPS, "slug", &current.slug)],
                cascades: vec![DeleteCascade::detach(
                    keys.index_by(POSTS, "group", id.0),
                    keys.entity_prefix(POSTS),
                    "group",
                )],
            }))
            .await?;
        let detached = response.get("cascaded").and_then(Value::as_u64).unwrap_or_default();
        log::info!("deleted group {id}, detached {detached} posts");
        Ok(())
    }

    async fn list_posts(&self, actor: Option<&Identity>, query: &PostQuery) -> Result<Listing<Post>, Error> {
        ensure(actor, Action::Read, Resource::Posts)?;
        if query.following {
            let follower = require_actor(actor)?.user;
            let authors: Vec<UserId> = self
                .followed_by(follower)
                .await?
                .into_iter()
                .map(|edge| edge.followed)
                .collect();
            return self.feed_page(&authors, query.group, &query.page).await;
        }
        let keys = self.keys();
        let index = match query.group {
            Some(group) => keys.index_by(POSTS, "group", group.0),
            None => keys.index_all(POSTS),
        };
        self.page_of(&index, POSTS, &query.page).await
    }

    async fn post(&self, id: PostId) -> Result<Option<Post>, Error> {
        self.get(POSTS, id.0).await
    }

    async fn create_post(&self, actor: Option<&Identity>, post: NewPost) -> Result<Post, Error> {
        let author = require_actor(actor)?.user;
        ensure(actor, Action::Create, Resource::Posts)?;
        post.validate()?;
        let id = self.next_id(POSTS).await?;
        let created = Post {
            id: PostId(id),
            author,
            text: post.text,
            pub_date: Utc::now(),
            image: post.image,
            group: post.group,
        };
        let keys = self.keys();
        let score = recency_score(&created.pub_date);
        let mut indexes = vec![
            IndexEntry {
                key: keys.index_all(POSTS),
                score: score.clone(),
                member: padded(id),
            },
            IndexEntry {
                key: keys.index_by(POSTS, "author", author.0),
                score: score.clone(),
                member: padded(id),
            },
        ];
        let mut required = Vec::new();
        if let Some(group) = created.group {
            required.push(RequiredReference {
                field: "group".into(),
                key: keys.entity(GROUPS, group.0),
                value: group.to_string(),
            });
            indexes.push(IndexEntry {
                key: keys.index_by(POSTS, "group", group.0),
                score,
                member: padded(id),
            });
        }
        self.execute(MutationCommand::CreateEntity(EntityCreate {
            entity: "post",
            key: keys.entity(POSTS, id),
            entity_id: id.to_string(),
            payload_json: encode(&created)?,
            required,
            unique_constraints: Vec::new(),
            indexes,
        }))
        .await?;
        Ok(created)
    }

    async fn update_post_if_owner(
        &self,
        actor: Option<&Identity>,
        id: PostId,
        patch: PostPatch,
    ) -> Result<Post, Error> {
        require_actor(actor)?;
        let current = self.existing_post(id).await?;
        ensure(actor, Action::Update, Resource::Post(&current))?;
        patch.validate()?;

        let keys = self.keys();
        let mut assignments = Vec::new();
        let mut required = Vec::new();
        if let Some(text) = &patch.text {
            assignments.push(assign("text", text)?);
        }
        if let Some(image) = &patch.image {
            assignments.push(assign("image", image)?);
        }
        if let Some(group) = &patch.group {
            assignments.push(assign("group", group)?);
            if let Some(group) = group {
                required.push(RequiredReference {
                    field: "group".into(),
                    key: keys.entity(GROUPS, group.0),
                    value: group.to_string(),
                });
            }
        }
        let response = self
            .execute(MutationCommand::PatchEntity(EntityPatch {
                entity: "post",
                key: keys.entity(POSTS, id.0),
                entity_id: id.to_string(),
                owner_guard: owner_guard("author", current.author),
                assignments,
                required,
                reindex: vec![FieldIndexMove {
                    field: "group".into(),
                    prefix: keys.index_by_prefix(POSTS, "group"),
                    score: recency_score(&current.pub_date),
                    member: padded(id.0),
                }],
            }))
            .await?;
        patched(&response)
    }

    async fn delete_post_if_owner(&self, actor: Option<&Identity>, id: PostId) -> Result<(), Error> {
        require_actor(actor)?;
        let current = self.existing_post(id).await?;
        ensure(actor, Action::Delete, Resource::Post(&current))?;
        let keys = self.keys();
        let response = self
            .execute(MutationCommand::DeleteEntity(EntityDelete {
                entity: "post",
                key: keys.entity(POSTS, id.0),
                entity_id: id.to_string(),
                member: padded(id.0),
                owner_guard: owner_guard("author", current.author),
                indexes: vec![keys.index_all(POSTS), keys.index_by(POSTS, "author", current.author.0)],
                field_indexes: vec![FieldIndex {
                    field: "group".into(),
                    prefix: keys.index_by_prefix(POSTS, "group"),
                }],
                unique_keys: Vec::new(),
                cascades: vec![DeleteCascade::delete(
                    keys.index_by(COMMENTS, "post", id.0),
                    keys.entity_prefix(COMMENTS),
                )],
            }))
            .await?;
        let removed = response.get("cascaded").and_then(Value::as_u64).unwrap_or_default();
        log::debug!("deleted post {id} with {removed} comments");
        Ok(())
    }

    async fn list_comments(&self, post: PostId, page: &Page) -> Result<Listing<Comment>, Error> {
        self.existing_post(post).await?;
        self.page_of(&self.keys().index_by(COMMENTS, "post", post.0), COMMENTS, page)
            .await
    }

    async fn comment(&self, post: PostId, id: CommentId) -> Result<Option<Comment>, Error> {
        self.existing_post(post).await?;
        Ok(self
            .get::<Comment>(COMMENTS, id.0)
            .await?
            .filter(|comment| comment.post == post))
    }

    async fn create_comment(
        &self,
        actor: Option<&Identity>,
        post: PostId,
        comment: NewComment,
    ) -> Result<Comment, Error> {
        let author = require_actor(actor)?.user;
        let parent = self.existing_post(post).await?;
        ensure(actor, Action::Create, Resource::Comments(&parent))?;
        comment.validate()?;
        let id = self.next_id(COMMENTS).await?;
        let created = Comment {
            id: CommentId(id),
            author,
            post,
            text: comment.text,
            created: Utc::now(),
        };
        let keys = self.keys();
        let result = self
            .execute(MutationCommand::CreateEntity(EntityCreate {
                entity: "comment",
                key: keys.entity(COMMENTS, id),
                entity_id: id.to_string(),
                payload_json: encode(&created)?,
                required: vec![RequiredReference {
                    field: "post".into(),
                    key: keys.entity(POSTS, post.0),
                    value: post.to_string(),
                }],
                unique_constraints: Vec::new(),
                indexes: vec![IndexEntry {
                    key: keys.index_by(COMMENTS, "post", post.0),
                    score: recency_score(&created.created),
                    member: padded(id),
                }],
            }))
            .await;
        match result {
            Ok(_) => Ok(created),
            // The post vanished between the lookup and the write.
            Err(Error::Validation(err)) if err.has("post", "not_found") => Err(Error::not_found("post", post)),
            Err(err) => Err(err),
        }
    }

    async fn update_comment_if_owner(
        &self,
        actor: Option<&Identity>,
        post: PostId,
        id: CommentId,
        patch: CommentPatch,
    ) -> Result<Comment, Error> {
        require_actor(actor)?;
        let current = self.existing_comment(post, id).await?;
        ensure(actor, Action::Update, Resource::Comment(&current))?;
        patch.validate()?;
        let mut assignments = Vec::new();
        if let Some(text) = &patch.text {
            assignments.push(assign("text", text)?);
        }
        let response = self
            .execute(MutationCommand::PatchEntity(EntityPatch {
                entity: "comment",
                key: self.keys().entity(COMMENTS, id.0),
                entity_id: id.to_string(),
                owner_guard: owner_guard("author", current.author),
                assignments,
                required: Vec::new(),
                reindex: Vec::new(),
            }))
            .await?;
        patched(&response)
    }

    async fn delete_comment_if_owner(
        &self,
        actor: Option<&Identity>,
        post: PostId,
        id: CommentId,
    ) -> Result<(), Error> {
        require_actor(actor)?;
        let current = self.existing_comment(post, id).await?;
        ensure(actor, Action::Delete, Resource::Comment(&current))?;
        let keys = self.keys();
        self.execute(MutationCommand::DeleteEntity(EntityDelete {
            entity: "comment",
            key: keys.entity(COMMENTS, id.0),
            entity_id: id.to_string(),
            member: padded(id.0),
            owner_guard: owner_guard("author", current.author),
            indexes: vec![keys.index_by(COMMENTS, "post", post.0)],
            field_indexes: Vec::new(),
            unique_keys: Vec::new(),
            cascades: Vec::new(),
        }))
        .await?;
        Ok(())
    }

    async fn list_follows(&self, actor: Option<&Identity>, query: &FollowQuery) -> Result<Listing<Follow>, Error> {
        ensure(actor, Action::Read, Resource::Follows)?;
        let follower = require_actor(actor)?.user;
        let index = self.keys().index_by(FOLLOWS, "follower", follower.0);
        let search = query.search.as_deref().map(str::trim).filter(|term| !term.is_empty());
        if search.is_none() {
            return self.page_of(&index, FOLLOWS, &query.page).await;
        }

        let edges = self.followed_by(follower).await?;
        let members: Vec<String> = edges.iter().map(|edge| padded(edge.followed.0)).collect();
        let handles: HashMap<UserId, String> = self
            .get_members::<User>(USERS, &members)
            .await?
            .into_iter()
            .map(|user| (user.id, user.handle))
            .collect();
        let matching = edges
            .into_iter()
            .filter(|edge| {
                handles
                    .get(&edge.followed)
                    .is_some_and(|handle| matches_search(handle, search))
            })
            .collect();
        Ok(paginate(matching, &query.page, &self.listing))
    }

    async fn create_follow(&self, actor: Option<&Identity>, follow: NewFollow) -> Result<Follow, Error> {
        let follower = require_actor(actor)?.user;
        ensure(actor, Action::Create, Resource::Follows)?;
        let followed = self
            .user_by_handle(&follow.following)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| unknown_reference("following", &follow.following))?;
        // Duplicates are caught atomically by the pair claim below.
        validate_follow(follower, followed, false)?;

        let id = self.next_id(FOLLOWS).await?;
        let created = Follow {
            id: FollowId(id),
            follower,
            followed,
            created: Utc::now(),
        };
        let keys = self.keys();
        let result = self
            .execute(MutationCommand::CreateEntity(EntityCreate {
                entity: "follow",
                key: keys.entity(FOLLOWS, id),
                entity_id: id.to_string(),
                payload_json: encode(&created)?,
                required: vec![RequiredReference {
                    field: "following".into(),
                    key: keys.entity(USERS, followed.0),
                    value: follow.following.clone(),
                }],
                unique_constraints: vec![UniqueClaim {
                    field: "pair".into(),
                    key: keys.follow_pair(follower.0, followed.0),
                    value: format!("{follower}:{followed}"),
                }],
                indexes: vec![IndexEntry {
                    key: keys.index_by(FOLLOWS, "follower", follower.0),
                    score: recency_score(&created.created),
                    member: padded(id),
                }],
            }))
            .await;
        match result {
            Ok(_) => Ok(created),
            Err(Error::Validation(err)) if err.has("pair", "unique") => Err(FollowViolation::DuplicateFollow.into()),
            Err(err) => Err(err),
        }
    }

    async fn delete_follow(&self, actor: Option<&Identity>, following: &str) -> Result<(), Error> {
        let follower = require_actor(actor)?.user;
        let followed = self
            .user_by_handle(following)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| Error::not_found("user", following))?;
        let keys = self.keys();
        let pair_key = keys.follow_pair(follower.0, followed.0);
        let mut conn = self.conn.clone();
        let id: Option<u64> = cmd("GET").arg(&pair_key).query_async(&mut conn).await?;
        let edge: Follow = match id {
            Some(id) => self.get(FOLLOWS, id).await?,
            None => None,
        }
        .ok_or_else(|| Error::not_found("follow", following))?;
        ensure(actor, Action::Delete, Resource::Follow(&edge))?;
        self.execute(MutationCommand::DeleteEntity(EntityDelete {
            entity: "follow",
            key: keys.entity(FOLLOWS, edge.id.0),
            entity_id: edge.id.to_string(),
            member: padded(edge.id.0),
            owner_guard: owner_guard("follower", edge.follower),
            indexes: vec![keys.index_by(FOLLOWS, "follower", follower.0)],
            field_indexes: Vec::new(),
            unique_keys: vec![pair_key],
            cascades: Vec::new(),
        }))
        .await?;
        Ok(())
    }
}
