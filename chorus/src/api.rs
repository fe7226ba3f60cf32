//! Request facade: resolves the bearer token, calls the store and renders views.
//!
//! Read paths treat an absent or invalid token as anonymous. Write paths, the
//! following feed and follow listings fail with `Unauthenticated` instead.

use std::collections::HashMap;

use crate::{
    auth::{Credentials, PasswordHasher, RefreshLedger, Refreshed, TokenPair, TokenService},
    errors::{Error, ValidationError},
    models::{
        CommentId, CommentPatch, FollowQuery, GroupId, GroupPatch, Identity, Listing, NewComment, NewFollow, NewGroup,
        NewPost, NewUser, Page, PostId, PostPatch, PostQuery, Role, UserId,
    },
    policy::{Action, Resource, ensure},
    store::Store,
    validators,
    views::{CommentView, FollowView, GroupView, PostView, UserView},
};

pub struct Api<S, L> {
    store: S,
    tokens: TokenService<L>,
    hasher: PasswordHasher,
}

impl<S, L> Api<S, L>
where
    S: Store,
    L: RefreshLedger,
{
    pub fn new(store: S, tokens: TokenService<L>, hasher: PasswordHasher) -> Self {
        Self { store, tokens, hasher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tokens(&self) -> &TokenService<L> {
        &self.tokens
    }

    fn reader(&self, bearer: Option<&str>) -> Option<Identity> {
        bearer.and_then(|token| self.tokens.identify(token).ok())
    }

    fn writer(&self, bearer: Option<&str>) -> Result<Identity, Error> {
        let token = bearer.ok_or(Error::Unauthenticated)?;
        self.tokens.identify(token)
    }

    async fn handle_of(&self, cache: &mut HashMap<UserId, String>, id: UserId) -> Result<String, Error> {
        if let Some(handle) = cache.get(&id) {
            return Ok(handle.clone());
        }
        let user = self.store.user(id).await?.ok_or_else(|| Error::not_found("user", id))?;
        cache.insert(id, user.handle.clone());
        Ok(user.handle)
    }

    // Identity

    pub async fn register(&self, handle: &str, password: &str, role: Role) -> Result<UserView, Error> {
        let mut issues = Vec::new();
        validators::check_text("password", password, &mut issues);
        ValidationError::new(issues).into_result()?;
        let user = self
            .store
            .create_user(NewUser {
                handle: handle.to_string(),
                credential_hash: self.hasher.hash(password),
                role,
            })
            .await?;
        Ok(user.into())
    }

    /// Exchanges credentials for a token pair. Unknown handles and wrong
    /// passwords fail identically.
    pub async fn obtain_tokens(&self, credentials: &Credentials) -> Result<TokenPair, Error> {
        let Some(user) = self.store.user_by_handle(&credentials.handle).await? else {
            self.hasher.verify_absent(&credentials.password);
            log::debug!("rejected credentials for unknown handle {}", credentials.handle);
            return Err(Error::InvalidCredentials);
        };
        if !self.hasher.verify(&credentials.password, &user.credential_hash) {
            log::debug!("rejected credentials for {}", credentials.handle);
            return Err(Error::InvalidCredentials);
        }
        self.tokens.issue(&user.identity()).await
    }

    pub async fn refresh_token(&self, refresh: &str) -> Result<Refreshed, Error> {
        self.tokens.refresh(refresh).await
    }

    // Posts

    pub async fn list_posts(&self, bearer: Option<&str>, query: &PostQuery) -> Result<Listing<PostView>, Error> {
        let actor = if query.following {
            Some(self.writer(bearer)?)
        } else {
            self.reader(bearer)
        };
        let listing = self.store.list_posts(actor.as_ref(), query).await?;
        let mut handles = HashMap::new();
        let mut items = Vec::with_capacity(listing.items.len());
        for post in listing.items {
            let author = self.handle_of(&mut handles, post.author).await?;
            items.push(PostView::new(post, author));
        }
        Ok(Listing {
            count: listing.count,
            items,
        })
    }

    pub async fn get_post(&self, bearer: Option<&str>, id: PostId) -> Result<PostView, Error> {
        let actor = self.reader(bearer);
        let post = self.store.post(id).await?.ok_or_else(|| Error::not_found("post", id))?;
        ensure(actor.as_ref(), Action::Read, Resource::Post(&post))?;
        let author = self.handle_of(&mut HashMap::new(), post.author).await?;
        Ok(PostView::new(post, author))
    }

    pub async fn create_post(&self, bearer: Option<&str>, body: NewPost) -> Result<PostView, Error> {
        let actor = self.writer(bearer)?;
        let post = self.store.create_post(Some(&actor), body).await?;
        let author = self.handle_of(&mut HashMap::new(), post.author).await?;
        log::info!("created post {} by {author}", post.id);
        Ok(PostView::new(post, author))
    }

    pub async fn update_post(&self, bearer: Option<&str>, id: PostId, patch: PostPatch) -> Result<PostView, Error> {
        let actor = self.writer(bearer)?;
        let post = self.store.update_post_if_owner(Some(&actor), id, patch).await?;
        let author = self.handle_of(&mut HashMap::new(), post.author).await?;
        Ok(PostView::new(post, author))
    }

    pub async fn delete_post(&self, bearer: Option<&str>, id: PostId) -> Result<(), Error> {
        let actor = self.writer(bearer)?;
        self.store.delete_post_if_owner(Some(&actor), id).await?;
        log::info!("deleted post {id}");
        Ok(())
    }

    // Groups

    pub async fn list_groups(&self, bearer: Option<&str>, page: &Page) -> Result<Listing<GroupView>, Error> {
        let actor = self.reader(bearer);
        ensure(actor.as_ref(), Action::Read, Resource::Groups)?;
        Ok(self.store.list_groups(page).await?.map(GroupView::from))
    }

    pub async fn get_group(&self, bearer: Option<&str>, id: GroupId) -> Result<GroupView, Error> {
        let actor = self.reader(bearer);
        let group = self.store.group(id).await?.ok_or_else(|| Error::not_found("group", id))?;
        ensure(actor.as_ref(), Action::Read, Resource::Group(&group))?;
        Ok(group.into())
    }

    pub async fn create_group(&self, bearer: Option<&str>, body: NewGroup) -> Result<GroupView, Error> {
        let actor = self.writer(bearer)?;
        let group = self.store.create_group(Some(&actor), body).await?;
        log::info!("created group {} ({})", group.slug, group.id);
        Ok(group.into())
    }

    pub async fn update_group(&self, bearer: Option<&str>, id: GroupId, patch: GroupPatch) -> Result<GroupView, Error> {
        let actor = self.writer(bearer)?;
        Ok(self.store.update_group(Some(&actor), id, patch).await?.into())
    }

    pub async fn delete_group(&self, bearer: Option<&str>, id: GroupId) -> Result<(), Error> {
        let actor = self.writer(bearer)?;
        self.store.delete_group(Some(&actor), id).await
    }

    // Comments

    pub async fn list_comments(
        &self,
        bearer: Option<&str>,
        post: PostId,
        page: &Page,
    ) -> Result<Listing<CommentView>, Error> {
        let actor = self.reader(bearer);
        let listing = self.store.list_comments(post, page).await?;
        let mut handles = HashMap::new();
        let mut items = Vec::with_capacity(listing.items.len());
        for comment in listing.items {
            ensure(actor.as_ref(), Action::Read, Resource::Comment(&comment))?;
            let author = self.handle_of(&mut handles, comment.author).await?;
            items.push(CommentView::new(comment, author));
        }
        Ok(Listing {
            count: listing.count,
            items,
        })
    }

    pub async fn get_comment(&self, bearer: Option<&str>, post: PostId, id: CommentId) -> Result<CommentView, Error> {
        let actor = self.reader(bearer);
        let comment = self
            .store
            .comment(post, id)
            .await?
            .ok_or_else(|| Error::not_found("comment", id))?;
        ensure(actor.as_ref(), Action::Read, Resource::Comment(&comment))?;
        let author = self.handle_of(&mut HashMap::new(), comment.author).await?;
        Ok(CommentView::new(comment, author))
    }

    pub async fn create_comment(
        &self,
        bearer: Option<&str>,
        post: PostId,
        body: NewComment,
    ) -> Result<CommentView, Error> {
        let actor = self.writer(bearer)?;
        let comment = self.store.create_comment(Some(&actor), post, body).await?;
        let author = self.handle_of(&mut HashMap::new(), comment.author).await?;
        Ok(CommentView::new(comment, author))
    }

    pub async fn update_comment(
        &self,
        bearer: Option<&str>,
        post: PostId,
        id: CommentId,
        patch: CommentPatch,
    ) -> Result<CommentView, Error> {
        let actor = self.writer(bearer)?;
        let comment = self.store.update_comment_if_owner(Some(&actor), post, id, patch).await?;
        let author = self.handle_of(&mut HashMap::new(), comment.author).await?;
        Ok(CommentView::new(comment, author))
    }

    pub async fn delete_comment(&self, bearer: Option<&str>, post: PostId, id: CommentId) -> Result<(), Error> {
        let actor = self.writer(bearer)?;
        self.store.delete_comment_if_owner(Some(&actor), post, id).await
    }

    // Follows

    pub async fn list_follows(&self, bearer: Option<&str>, query: &FollowQuery) -> Result<Listing<FollowView>, Error> {
        let actor = self.writer(bearer)?;
        let listing = self.store.list_follows(Some(&actor), query).await?;
        let mut handles = HashMap::new();
        let mut items = Vec::with_capacity(listing.items.len());
        for edge in listing.items {
            let user = self.handle_of(&mut handles, edge.follower).await?;
            let following = self.handle_of(&mut handles, edge.followed).await?;
            items.push(FollowView::new(user, following));
        }
        Ok(Listing {
            count: listing.count,
            items,
        })
    }

    pub async fn create_follow(&self, bearer: Option<&str>, body: NewFollow) -> Result<FollowView, Error> {
        let actor = self.writer(bearer)?;
        let edge = self.store.create_follow(Some(&actor), body).await?;
        let mut handles = HashMap::new();
        let user = self.handle_of(&mut handles, edge.follower).await?;
        let following = self.handle_of(&mut handles, edge.followed).await?;
        log::info!("{user} now follows {following}");
        Ok(FollowView::new(user, following))
    }

    pub async fn delete_follow(&self, bearer: Option<&str>, following: &str) -> Result<(), Error> {
        let actor = self.writer(bearer)?;
        self.store.delete_follow(Some(&actor), following).await
    }
}
