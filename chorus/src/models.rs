//! Entity and input types for users, groups, posts, comments and follow edges.
//!
//! Input types (`NewPost`, `PostPatch`, ...) carry no identity or timestamp
//! fields; the store assigns those. Unknown fields in a body are ignored on
//! deserialization.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    errors::{ValidationError, ValidationResult},
    validators::{self, GROUP_TITLE_MAX_LEN},
};

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(UserId);
entity_id!(GroupId);
entity_id!(PostId);
entity_id!(CommentId);
entity_id!(FollowId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    /// Operators allowed to manage groups.
    Admin,
}

/// The bare identity carried by a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: UserId,
    pub role: Role,
}

impl Identity {
    pub fn member(user: UserId) -> Self {
        Self {
            user,
            role: Role::Member,
        }
    }

    pub fn admin(user: UserId) -> Self {
        Self { user, role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub handle: String,
    pub credential_hash: String,
    #[serde(default)]
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            user: self.id,
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub group: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author: UserId,
    pub post: PostId,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// Directed edge `follower -> followed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub id: FollowId,
    pub follower: UserId,
    pub followed: UserId,
    pub created: DateTime<Utc>,
}

/// Registration payload handed to the store once the password has been hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub handle: String,
    pub credential_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        validators::check_handle("handle", &self.handle, &mut issues);
        ValidationError::new(issues).into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl NewGroup {
    pub fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        validators::check_text("title", &self.title, &mut issues);
        validators::check_max_chars("title", &self.title, GROUP_TITLE_MAX_LEN, &mut issues);
        validators::check_slug("slug", &self.slug, &mut issues);
        validators::check_text("description", &self.description, &mut issues);
        ValidationError::new(issues).into_result()
    }
}

/// Slug is fixed once a group exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl GroupPatch {
    pub fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        if let Some(title) = &self.title {
            validators::check_text("title", title, &mut issues);
            validators::check_max_chars("title", title, GROUP_TITLE_MAX_LEN, &mut issues);
        }
        if let Some(description) = &self.description {
            validators::check_text("description", description, &mut issues);
        }
        ValidationError::new(issues).into_result()
    }

    pub fn apply(self, group: &mut Group) {
        if let Some(title) = self.title {
            group.title = title;
        }
        if let Some(description) = self.description {
            group.description = description;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub group: Option<GroupId>,
}

impl NewPost {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            group: None,
        }
    }

    pub fn in_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        validators::check_text("text", &self.text, &mut issues);
        validators::check_image_ref("image", self.image.as_deref(), &mut issues);
        ValidationError::new(issues).into_result()
    }
}

/// Partial post update. `Some(None)` clears an optional field, `None` leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub group: Option<Option<GroupId>>,
}

impl PostPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        if let Some(text) = &self.text {
            validators::check_text("text", text, &mut issues);
        }
        if let Some(image) = &self.image {
            validators::check_image_ref("image", image.as_deref(), &mut issues);
        }
        ValidationError::new(issues).into_result()
    }

    /// Group the post will reference after the patch, given its current group.
    pub fn resulting_group(&self, current: Option<GroupId>) -> Option<GroupId> {
        match self.group {
            Some(group) => group,
            None => current,
        }
    }

    pub fn apply(self, post: &mut Post) {
        if let Some(text) = self.text {
            post.text = text;
        }
        if let Some(image) = self.image {
            post.image = image;
        }
        if let Some(group) = self.group {
            post.group = group;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub text: String,
}

impl NewComment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        validators::check_text("text", &self.text, &mut issues);
        ValidationError::new(issues).into_result()
    }
}

/// A comment's post reference is immutable, so only the text can change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPatch {
    #[serde(default)]
    pub text: Option<String>,
}

impl CommentPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        if let Some(text) = &self.text {
            validators::check_text("text", text, &mut issues);
        }
        ValidationError::new(issues).into_result()
    }

    pub fn apply(self, comment: &mut Comment) {
        if let Some(text) = self.text {
            comment.text = text;
        }
    }
}

/// Follow request body: the target is named by handle.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFollow {
    pub following: String,
}

impl NewFollow {
    pub fn new(following: impl Into<String>) -> Self {
        Self {
            following: following.into(),
        }
    }
}

/// Limit/offset window over a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }
}

/// One window of a listing plus the total number of matching items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> Listing<T> {
    pub fn empty() -> Self {
        Self {
            count: 0,
            items: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            count: self.count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    #[serde(default)]
    pub group: Option<GroupId>,
    /// Restrict to authors the requesting actor follows.
    #[serde(default)]
    pub following: bool,
    #[serde(flatten)]
    pub page: Page,
}

impl PostQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_group(group: GroupId) -> Self {
        Self {
            group: Some(group),
            ..Self::default()
        }
    }

    pub fn following_feed() -> Self {
        Self {
            following: true,
            ..Self::default()
        }
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowQuery {
    /// Case-insensitive substring of the followed handle.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

impl FollowQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            page: Page::default(),
        }
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
