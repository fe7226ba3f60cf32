use chorus::GroupPatch;

use super::support::*;

#[tokio::test]
async fn only_admins_manage_groups() {
    let api = api();
    let alice = member(&api, "alice").await;
    let body = NewGroup {
        title: "Rust".into(),
        slug: "rust".into(),
        description: "Systems talk".into(),
    };
    let err = api.create_group(None, body.clone()).await.expect_err("anonymous");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    let err = api.create_group(Some(&alice), body).await.expect_err("member");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn slugs_are_unique() {
    let api = api();
    let root = admin(&api, "root").await;
    group(&api, &root, "rust").await;
    let err = api
        .create_group(
            Some(&root),
            NewGroup {
                title: "Rust again".into(),
                slug: "rust".into(),
                description: "Second try".into(),
            },
        )
        .await
        .expect_err("duplicate slug");
    assert!(has_issue(&err, "slug", "unique"));
}

#[tokio::test]
async fn groups_list_by_ascending_id() {
    let api = api();
    let root = admin(&api, "root").await;
    for slug in ["zeta", "alpha", "mid"] {
        group(&api, &root, slug).await;
    }
    let listing = api.list_groups(None, &Page::default()).await.expect("list");
    let slugs: Vec<&str> = listing.items.iter().map(|group| group.slug.as_str()).collect();
    assert_eq!(slugs, vec!["zeta", "alpha", "mid"]);
}

#[tokio::test]
async fn admin_can_retitle_a_group() {
    let api = api();
    let root = admin(&api, "root").await;
    let id = group(&api, &root, "rust").await;
    let view = api
        .update_group(
            Some(&root),
            id,
            GroupPatch {
                title: Some("Rustaceans".into()),
                description: None,
            },
        )
        .await
        .expect("update");
    assert_eq!(view.title, "Rustaceans");
    assert_eq!(view.slug, "rust");
}

#[tokio::test]
async fn deleting_a_group_detaches_its_posts() {
    let api = api();
    let root = admin(&api, "root").await;
    let alice = member(&api, "alice").await;
    let rust = group(&api, &root, "rust").await;
    let id = api
        .create_post(Some(&alice), NewPost::new("grouped").in_group(rust))
        .await
        .expect("create")
        .id;

    api.delete_group(Some(&root), rust).await.expect("delete group");

    let view = api.get_post(None, id).await.expect("post survives");
    assert_eq!(view.group, None);
    let err = api.get_group(None, rust).await.expect_err("group gone");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let listing = api.list_posts(None, &PostQuery::in_group(rust)).await.expect("list");
    assert_eq!(listing.count, 0);
}
