use chrono::{Duration, Utc};

use super::support::*;

#[tokio::test]
async fn wrong_password_and_unknown_handle_fail_alike() {
    let api = api();
    member(&api, "alice").await;
    let err = api
        .obtain_tokens(&Credentials::new("alice", "wrong"))
        .await
        .expect_err("wrong password");
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    let err = api
        .obtain_tokens(&Credentials::new("nobody", "correct horse"))
        .await
        .expect_err("unknown handle");
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn registration_validates_input() {
    let api = api();
    let err = api.register("alice", " ", Role::Member).await.expect_err("blank password");
    assert!(has_issue(&err, "password", "blank"));
    let err = api
        .register("has space", "pw", Role::Member)
        .await
        .expect_err("bad handle");
    assert!(has_issue(&err, "handle", "invalid"));

    api.register("alice", "pw", Role::Member).await.expect("register");
    let err = api.register("alice", "pw", Role::Member).await.expect_err("taken");
    assert!(has_issue(&err, "handle", "unique"));
}

#[tokio::test]
async fn refresh_rotates_and_is_single_use() {
    let api = api();
    api.register("alice", "pw", Role::Member).await.expect("register");
    let pair = api
        .obtain_tokens(&Credentials::new("alice", "pw"))
        .await
        .expect("tokens");

    let refreshed = api.refresh_token(&pair.refresh).await.expect("refresh");
    let rotated = refreshed.refresh.expect("rotation issues a new refresh token");
    assert_ne!(rotated, pair.refresh);
    api.tokens().identify(&refreshed.access).expect("new access token works");

    let err = api.refresh_token(&pair.refresh).await.expect_err("reused");
    assert_eq!(err.kind(), ErrorKind::InvalidOrExpiredToken);
    api.refresh_token(&rotated).await.expect("rotated token works once");
}

#[tokio::test]
async fn refresh_without_rotation_keeps_the_refresh_token() {
    let api = api_with(TokenSettings {
        rotate_refresh: false,
        ..TokenSettings::default()
    });
    api.register("alice", "pw", Role::Member).await.expect("register");
    let pair = api
        .obtain_tokens(&Credentials::new("alice", "pw"))
        .await
        .expect("tokens");
    for _ in 0..2 {
        let refreshed = api.refresh_token(&pair.refresh).await.expect("refresh");
        assert!(refreshed.refresh.is_none());
    }
}

#[tokio::test]
async fn token_kinds_are_not_interchangeable() {
    let api = api();
    api.register("alice", "pw", Role::Member).await.expect("register");
    let pair = api
        .obtain_tokens(&Credentials::new("alice", "pw"))
        .await
        .expect("tokens");
    let err = api.refresh_token(&pair.access).await.expect_err("access as refresh");
    assert_eq!(err.kind(), ErrorKind::InvalidOrExpiredToken);
    let err = api
        .create_post(Some(&pair.refresh), NewPost::new("hi"))
        .await
        .expect_err("refresh as access");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn expired_access_token_is_rejected() {
    let api = api();
    api.register("alice", "pw", Role::Member).await.expect("register");
    let pair = api
        .obtain_tokens(&Credentials::new("alice", "pw"))
        .await
        .expect("tokens");
    let tokens = api.tokens();
    let later = Utc::now() + tokens.settings().access_ttl + Duration::seconds(1);
    let err = tokens.identify_at(&pair.access, later).expect_err("expired");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let claims = tokens.decode(&pair.access).expect("signature still valid");
    assert!(claims.is_expired_at(later));
}

#[tokio::test]
async fn expired_refresh_token_is_rejected() {
    let api = api();
    api.register("alice", "pw", Role::Member).await.expect("register");
    let pair = api
        .obtain_tokens(&Credentials::new("alice", "pw"))
        .await
        .expect("tokens");
    let tokens = api.tokens();
    let later = Utc::now() + tokens.settings().refresh_ttl + Duration::seconds(1);
    let err = tokens.refresh_at(&pair.refresh, later).await.expect_err("expired");
    assert_eq!(err.kind(), ErrorKind::InvalidOrExpiredToken);
}

#[tokio::test]
async fn tampered_tokens_fail_verification() {
    let api = api();
    api.register("alice", "pw", Role::Member).await.expect("register");
    let pair = api
        .obtain_tokens(&Credentials::new("alice", "pw"))
        .await
        .expect("tokens");
    let mut tampered = pair.access.clone();
    let last = tampered.pop().expect("non-empty token");
    tampered.push(if last == 'A' { 'B' } else { 'A' });
    assert!(api.tokens().decode(&tampered).is_err());

    let foreign = TokenService::new(b"another-secret-that-is-long-enough!!", TokenSettings::default(), MemoryLedger::new());
    assert!(foreign.decode(&pair.access).is_err());
}
