use std::sync::Arc;

use super::support::*;

#[tokio::test]
async fn anonymous_readers_see_posts_newest_first() {
    let api = api();
    let alice = member(&api, "alice").await;
    post(&api, &alice, "first").await;
    post(&api, &alice, "second").await;
    post(&api, &alice, "third").await;

    let listing = api.list_posts(None, &PostQuery::all()).await.expect("list");
    assert_eq!(listing.count, 3);
    assert_eq!(texts(&listing), vec!["third", "second", "first"]);
    assert!(listing.items.iter().all(|post| post.author == "alice"));
}

#[tokio::test]
async fn invalid_token_reads_as_anonymous() {
    let api = api();
    let alice = member(&api, "alice").await;
    let id = post(&api, &alice, "hello").await;

    let view = api.get_post(Some("not-a-token"), id).await.expect("read");
    assert_eq!(view.text, "hello");
}

#[tokio::test]
async fn create_requires_authentication() {
    let api = api();
    let err = api.create_post(None, NewPost::new("hi")).await.expect_err("anonymous");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let err = api
        .create_post(Some("garbage"), NewPost::new("hi"))
        .await
        .expect_err("bad token");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn author_and_date_come_from_the_server() {
    let api = api();
    let alice = member(&api, "alice").await;
    let before = chrono::Utc::now();
    let body: NewPost =
        serde_json::from_str(r#"{"text":"mine","author":"mallory","pub_date":"2001-01-01T00:00:00Z"}"#)
            .expect("parse body");
    let view = api.create_post(Some(&alice), body).await.expect("create");
    assert_eq!(view.author, "alice");
    assert!(view.pub_date >= before);
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let api = api();
    let alice = member(&api, "alice").await;
    let err = api
        .create_post(Some(&alice), NewPost::new("   "))
        .await
        .expect_err("blank");
    assert!(has_issue(&err, "text", "blank"));
}

#[tokio::test]
async fn unknown_group_reference_is_a_validation_error() {
    let api = api();
    let alice = member(&api, "alice").await;
    let err = api
        .create_post(Some(&alice), NewPost::new("hi").in_group(GroupId(99)))
        .await
        .expect_err("unknown group");
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    assert!(has_issue(&err, "group", "not_found"));
}

#[tokio::test]
async fn only_the_author_may_edit() {
    let api = api();
    let alice = member(&api, "alice").await;
    let bob = member(&api, "bob").await;
    let id = post(&api, &alice, "original").await;

    let err = api
        .update_post(Some(&bob), id, PostPatch::text("hijacked"))
        .await
        .expect_err("not owner");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = api.delete_post(Some(&bob), id).await.expect_err("not owner");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let view = api
        .update_post(Some(&alice), id, PostPatch::text("edited"))
        .await
        .expect("owner edit");
    assert_eq!(view.text, "edited");
    assert_eq!(api.get_post(None, id).await.expect("read").text, "edited");
}

#[tokio::test]
async fn missing_post_wins_over_ownership() {
    let api = api();
    let bob = member(&api, "bob").await;
    let err = api
        .update_post(Some(&bob), PostId(404), PostPatch::text("x"))
        .await
        .expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn ownership_is_checked_before_validation() {
    let api = api();
    let alice = member(&api, "alice").await;
    let bob = member(&api, "bob").await;
    let id = post(&api, &alice, "original").await;
    let err = api
        .update_post(Some(&bob), id, PostPatch::text(""))
        .await
        .expect_err("forbidden first");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn patch_can_clear_the_group() {
    let api = api();
    let root = admin(&api, "root").await;
    let alice = member(&api, "alice").await;
    let rust = group(&api, &root, "rust").await;
    let id = api
        .create_post(Some(&alice), NewPost::new("in a group").in_group(rust))
        .await
        .expect("create")
        .id;

    let patch: PostPatch = serde_json::from_str(r#"{"group":null}"#).expect("parse");
    let view = api.update_post(Some(&alice), id, patch).await.expect("clear group");
    assert_eq!(view.group, None);
    assert_eq!(view.text, "in a group");
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments() {
    let api = api();
    let alice = member(&api, "alice").await;
    let bob = member(&api, "bob").await;
    let id = post(&api, &alice, "soon gone").await;
    api.create_comment(Some(&bob), id, NewComment::new("nice"))
        .await
        .expect("comment");

    api.delete_post(Some(&alice), id).await.expect("delete");

    let err = api.get_post(None, id).await.expect_err("gone");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = api
        .list_comments(None, id, &Page::default())
        .await
        .expect_err("comments gone with post");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_deletes_leave_one_winner() {
    let api = Arc::new(api());
    let alice = member(&api, "alice").await;
    let id = post(&api, &alice, "contested").await;

    let results = race(ATTEMPTS, |_| {
        let api = Arc::clone(&api);
        let alice = alice.clone();
        async move { api.delete_post(Some(&alice), id).await }
    })
    .await;

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .all(|err| err.kind() == ErrorKind::NotFound)
    );
}

#[tokio::test]
async fn huge_offsets_yield_empty_pages() {
    let api = api();
    let alice = member(&api, "alice").await;
    post(&api, &alice, "only").await;

    let listing = api
        .list_posts(None, &PostQuery::all().page(Page::new(10, usize::MAX)))
        .await
        .expect("list");
    assert_eq!(listing.count, 1);
    assert!(listing.items.is_empty());
}

#[tokio::test]
async fn group_filter_and_pagination() {
    let api = api();
    let root = admin(&api, "root").await;
    let alice = member(&api, "alice").await;
    let rust = group(&api, &root, "rust").await;
    for n in 0..4 {
        api.create_post(Some(&alice), NewPost::new(format!("rust {n}")).in_group(rust))
            .await
            .expect("create");
    }
    post(&api, &alice, "elsewhere").await;

    let page = api
        .list_posts(None, &PostQuery::in_group(rust).page(Page::new(2, 1)))
        .await
        .expect("list");
    assert_eq!(page.count, 4);
    assert_eq!(texts(&page), vec!["rust 2", "rust 1"]);
}
