use std::sync::Arc;

use chorus::FollowQuery;

use super::support::*;

#[tokio::test]
async fn follow_by_handle() {
    let api = api();
    let alice = member(&api, "alice").await;
    member(&api, "bob").await;

    let view = api
        .create_follow(Some(&alice), NewFollow::new("bob"))
        .await
        .expect("follow");
    assert_eq!(view.user, "alice");
    assert_eq!(view.following, "bob");

    let listing = api.list_follows(Some(&alice), &FollowQuery::default()).await.expect("list");
    assert_eq!(listing.count, 1);
    assert_eq!(listing.items[0].following, "bob");
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let api = api();
    let alice = member(&api, "alice").await;
    let err = api
        .create_follow(Some(&alice), NewFollow::new("alice"))
        .await
        .expect_err("self follow");
    assert_eq!(err.follow_violation(), Some(FollowViolation::SelfFollow));
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
}

#[tokio::test]
async fn duplicate_follow_is_rejected() {
    let api = api();
    let alice = member(&api, "alice").await;
    member(&api, "bob").await;
    api.create_follow(Some(&alice), NewFollow::new("bob"))
        .await
        .expect("first follow");
    let err = api
        .create_follow(Some(&alice), NewFollow::new("bob"))
        .await
        .expect_err("duplicate");
    assert_eq!(err.follow_violation(), Some(FollowViolation::DuplicateFollow));
}

#[tokio::test]
async fn unknown_handle_is_a_validation_error() {
    let api = api();
    let alice = member(&api, "alice").await;
    let err = api
        .create_follow(Some(&alice), NewFollow::new("nobody"))
        .await
        .expect_err("unknown");
    assert!(has_issue(&err, "following", "not_found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_follows_create_one_edge() {
    let api = Arc::new(api());
    let alice = member(&api, "alice").await;
    member(&api, "bob").await;

    let results = race(ATTEMPTS, |_| {
        let api = Arc::clone(&api);
        let alice = alice.clone();
        async move { api.create_follow(Some(&alice), NewFollow::new("bob")).await.map(|_| ()) }
    })
    .await;

    let created = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(created, 1);
    assert!(results.iter().filter_map(|result| result.as_ref().err()).all(|err| {
        err.follow_violation() == Some(FollowViolation::DuplicateFollow)
    }));

    let listing = api.list_follows(Some(&alice), &FollowQuery::default()).await.expect("list");
    assert_eq!(listing.count, 1);
}

#[tokio::test]
async fn follow_listing_requires_a_valid_token() {
    let api = api();
    let err = api
        .list_follows(None, &FollowQuery::default())
        .await
        .expect_err("anonymous");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    let err = api
        .list_follows(Some("expired-or-forged"), &FollowQuery::default())
        .await
        .expect_err("bad token");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn listing_shows_only_own_edges_and_searches_by_handle() {
    let api = api();
    let alice = member(&api, "alice").await;
    let carol = member(&api, "carol").await;
    member(&api, "bob").await;
    member(&api, "BobbyTables").await;
    for handle in ["bob", "BobbyTables", "carol"] {
        api.create_follow(Some(&alice), NewFollow::new(handle))
            .await
            .expect("follow");
    }
    api.create_follow(Some(&carol), NewFollow::new("bob"))
        .await
        .expect("carol follows bob");

    let all = api.list_follows(Some(&alice), &FollowQuery::default()).await.expect("list");
    assert_eq!(all.count, 3);
    assert!(all.items.iter().all(|edge| edge.user == "alice"));

    let bobs = api.list_follows(Some(&alice), &FollowQuery::search("BOB")).await.expect("search");
    let mut handles: Vec<&str> = bobs.items.iter().map(|edge| edge.following.as_str()).collect();
    handles.sort_unstable();
    assert_eq!(handles, vec!["BobbyTables", "bob"]);
}

#[tokio::test]
async fn unfollow_removes_the_edge() {
    let api = api();
    let alice = member(&api, "alice").await;
    member(&api, "bob").await;
    api.create_follow(Some(&alice), NewFollow::new("bob"))
        .await
        .expect("follow");

    api.delete_follow(Some(&alice), "bob").await.expect("unfollow");
    let listing = api.list_follows(Some(&alice), &FollowQuery::default()).await.expect("list");
    assert_eq!(listing.count, 0);

    let err = api.delete_follow(Some(&alice), "bob").await.expect_err("already gone");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    api.create_follow(Some(&alice), NewFollow::new("bob"))
        .await
        .expect("follow again after unfollow");
}

#[tokio::test]
async fn following_feed_shows_followed_authors_only() {
    let api = api();
    let alice = member(&api, "alice").await;
    let bob = member(&api, "bob").await;
    let carol = member(&api, "carol").await;
    post(&api, &bob, "from bob").await;
    post(&api, &carol, "from carol").await;
    post(&api, &alice, "from alice").await;
    api.create_follow(Some(&alice), NewFollow::new("bob"))
        .await
        .expect("follow");

    let feed = api
        .list_posts(Some(&alice), &PostQuery::following_feed())
        .await
        .expect("feed");
    assert_eq!(texts(&feed), vec!["from bob"]);

    let err = api
        .list_posts(None, &PostQuery::following_feed())
        .await
        .expect_err("anonymous feed");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn empty_following_feed() {
    let api = api();
    let alice = member(&api, "alice").await;
    let bob = member(&api, "bob").await;
    post(&api, &bob, "unseen").await;
    let feed = api
        .list_posts(Some(&alice), &PostQuery::following_feed())
        .await
        .expect("feed");
    assert_eq!(feed, Listing::empty());
}
