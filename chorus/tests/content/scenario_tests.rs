use super::support::*;

#[tokio::test]
async fn post_round_trip_keeps_caller_fields_and_assigns_the_rest() {
    let api = api();
    let root = admin(&api, "root").await;
    let alice = member(&api, "alice").await;
    let rust = group(&api, &root, "rust").await;

    let body: NewPost = serde_json::from_value(serde_json::json!({
        "text": "round trip",
        "group": rust.0,
        "id": 999,
        "author": "mallory",
        "pub_date": "1999-12-31T23:59:59Z",
        "likes": 12,
    }))
    .expect("parse body");
    let created = api.create_post(Some(&alice), body).await.expect("create");
    let fetched = api.get_post(None, created.id).await.expect("read back");

    assert_eq!(fetched, created);
    assert_eq!(fetched.text, "round trip");
    assert_eq!(fetched.group, Some(rust));
    assert_ne!(fetched.id, PostId(999));
    assert_eq!(fetched.author, "alice");
    assert_ne!(fetched.pub_date.to_rfc3339(), "1999-12-31T23:59:59+00:00");
}

#[tokio::test]
async fn stranger_cannot_delete_but_author_can() {
    let api = api();
    let a = member(&api, "user_a").await;
    let b = member(&api, "user_b").await;
    let p1 = post(&api, &a, "P1").await;

    let err = api.delete_post(Some(&b), p1).await.expect_err("B deletes P1");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    api.get_post(None, p1).await.expect("P1 still there");

    api.delete_post(Some(&a), p1).await.expect("A deletes P1");
    let err = api.get_post(None, p1).await.expect_err("P1 gone");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn following_feed_is_newest_first() {
    let api = api();
    let a = member(&api, "user_a").await;
    let b = member(&api, "user_b").await;
    let c = member(&api, "user_c").await;
    post(&api, &b, "b1").await;
    post(&api, &c, "c1").await;
    post(&api, &b, "b2").await;
    post(&api, &b, "b3").await;

    api.create_follow(Some(&a), NewFollow::new("user_b"))
        .await
        .expect("A follows B");
    let feed = api
        .list_posts(Some(&a), &PostQuery::following_feed())
        .await
        .expect("feed");
    assert_eq!(texts(&feed), vec!["b3", "b2", "b1"]);
    assert!(feed.items.iter().all(|post| post.author == "user_b"));
}

#[tokio::test]
async fn anonymous_post_fails_then_token_post_uses_token_identity() {
    let api = api();
    let body = || -> NewPost {
        serde_json::from_str(r#"{"text":"hello","author":"someone_else"}"#).expect("parse body")
    };

    let err = api.create_post(None, body()).await.expect_err("anonymous");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert_eq!(api.list_posts(None, &PostQuery::all()).await.expect("list").count, 0);

    let a = member(&api, "user_a").await;
    api.register("someone_else", "pw", Role::Member).await.expect("register");
    let view = api.create_post(Some(&a), body()).await.expect("authenticated");
    assert_eq!(view.author, "user_a");
}

#[tokio::test]
async fn store_and_api_agree_on_ownership_errors() {
    let api = api();
    let a = member(&api, "user_a").await;
    let p1 = post(&api, &a, "P1").await;

    let err = api
        .store()
        .delete_post_if_owner(None, p1)
        .await
        .expect_err("anonymous store delete");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert!(api.store().post(p1).await.expect("read").is_some());
}
