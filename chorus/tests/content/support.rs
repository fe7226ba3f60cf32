use std::sync::Arc;

use tokio::sync::Barrier;

pub(crate) use chorus::{
    Api, Credentials, Error, ErrorKind, FollowViolation, GroupId, Listing, MemoryLedger, MemoryStore, NewComment,
    NewFollow, NewGroup, NewPost, Page, PasswordHasher, PostId, PostPatch, PostQuery, Role, Store, TokenService,
    TokenSettings,
};

pub(crate) const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

pub(crate) type TestApi = Api<MemoryStore, MemoryLedger>;

pub(crate) fn api() -> TestApi {
    api_with(TokenSettings::default())
}

pub(crate) fn api_with(settings: TokenSettings) -> TestApi {
    Api::new(
        MemoryStore::new(),
        TokenService::new(SECRET, settings, MemoryLedger::new()),
        PasswordHasher::new(2),
    )
}

/// Registers a member and returns its access token.
pub(crate) async fn member(api: &TestApi, handle: &str) -> String {
    api.register(handle, "correct horse", Role::Member).await.expect("register");
    login(api, handle).await
}

pub(crate) async fn admin(api: &TestApi, handle: &str) -> String {
    api.register(handle, "correct horse", Role::Admin).await.expect("register admin");
    login(api, handle).await
}

pub(crate) async fn login(api: &TestApi, handle: &str) -> String {
    api.obtain_tokens(&Credentials::new(handle, "correct horse"))
        .await
        .expect("obtain tokens")
        .access
}

pub(crate) async fn group(api: &TestApi, token: &str, slug: &str) -> GroupId {
    api.create_group(
        Some(token),
        NewGroup {
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            description: format!("All about {slug}"),
        },
    )
    .await
    .expect("create group")
    .id
}

pub(crate) async fn post(api: &TestApi, token: &str, text: &str) -> PostId {
    api.create_post(Some(token), NewPost::new(text)).await.expect("create post").id
}

pub(crate) fn texts(listing: &Listing<chorus::PostView>) -> Vec<&str> {
    listing.items.iter().map(|post| post.text.as_str()).collect()
}

pub(crate) fn has_issue(err: &Error, field: &str, code: &str) -> bool {
    err.validation_issues()
        .iter()
        .any(|issue| issue.field == field && issue.code == code)
}

/// Attempts per contended operation in the concurrency tests.
pub(crate) const ATTEMPTS: usize = 16;

/// Runs `attempts` copies of `task` on separate runtime tasks, released together.
pub(crate) async fn race<F, Fut, T>(attempts: usize, task: F) -> Vec<Result<T, Error>>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
    T: Send + 'static,
{
    let barrier = Arc::new(Barrier::new(attempts));
    let handles: Vec<_> = (0..attempts)
        .map(|attempt| {
            let barrier = Arc::clone(&barrier);
            let work = task(attempt);
            tokio::spawn(async move {
                barrier.wait().await;
                work.await
            })
        })
        .collect();
    let mut results = Vec::with_capacity(attempts);
    for handle in handles {
        results.push(handle.await.expect("task panicked"));
    }
    results
}
