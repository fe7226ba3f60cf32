use crate::id::padded;

pub const USERS: &str = "users";
pub const GROUPS: &str = "groups";
pub const POSTS: &str = "posts";
pub const COMMENTS: &str = "comments";
pub const FOLLOWS: &str = "follows";

/// Common key-construction helpers for the Redis layout.
///
/// Entity ids are zero-padded so that sorted-set members with equal scores
/// come back in ascending id order.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str) -> Self {
        Self { prefix, service }
    }

    pub fn entity(&self, collection: &str, entity_id: u64) -> String {
        self.entity_prefix(collection) + &padded(entity_id)
    }

    /// Prefix that, followed by a padded id, yields an entity key.
    pub fn entity_prefix(&self, collection: &str) -> String {
        format!("{}:{}:{}:", self.prefix, self.service, collection)
    }

    pub fn sequence(&self, collection: &str) -> String {
        format!("{}:{}:seq:{}", self.prefix, self.service, collection)
    }

    pub fn unique(&self, collection: &str, field: &str, value: &str) -> String {
        format!("{}:{}:{}:unique:{}:{}", self.prefix, self.service, collection, field, value)
    }

    pub fn follow_pair(&self, follower: u64, followed: u64) -> String {
        self.unique(FOLLOWS, "pair", &format!("{}:{}", padded(follower), padded(followed)))
    }

    /// Sorted set listing every entity of a collection.
    pub fn index_all(&self, collection: &str) -> String {
        format!("{}:{}:{}:idx:all", self.prefix, self.service, collection)
    }

    /// Prefix of the sorted sets grouping `collection` entities by `field`.
    pub fn index_by_prefix(&self, collection: &str, field: &str) -> String {
        format!("{}:{}:{}:idx:{}:", self.prefix, self.service, collection, field)
    }

    pub fn index_by(&self, collection: &str, field: &str, value: u64) -> String {
        self.index_by_prefix(collection, field) + &padded(value)
    }

    pub fn refresh_token(&self, jti: &str) -> String {
        format!("{}:{}:refresh:{}", self.prefix, self.service, jti)
    }

    /// Short-lived key for intermediate set operations.
    pub fn scratch(&self, name: &str) -> String {
        format!("{}:{}:tmp:{}", self.prefix, self.service, name)
    }

    /// Glob matching every key of this service, for test cleanup.
    pub fn service_pattern(&self) -> String {
        format!("{}:{}:*", self.prefix, self.service)
    }
}
