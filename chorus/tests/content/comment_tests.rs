use chorus::{CommentId, CommentPatch};

use super::support::*;

#[tokio::test]
async fn comments_are_scoped_to_their_post() {
    let api = api();
    let alice = member(&api, "alice").await;
    let first = post(&api, &alice, "first").await;
    let second = post(&api, &alice, "second").await;
    let comment = api
        .create_comment(Some(&alice), first, NewComment::new("on first"))
        .await
        .expect("comment");
    assert_eq!(comment.post, first);
    assert_eq!(comment.author, "alice");

    let err = api
        .get_comment(None, second, comment.id)
        .await
        .expect_err("wrong post");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let listing = api.list_comments(None, second, &Page::default()).await.expect("list");
    assert_eq!(listing.count, 0);
}

#[tokio::test]
async fn commenting_on_a_missing_post_is_not_found() {
    let api = api();
    let alice = member(&api, "alice").await;
    let err = api
        .create_comment(Some(&alice), PostId(77), NewComment::new("hello?"))
        .await
        .expect_err("missing post");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn comments_list_newest_first() {
    let api = api();
    let alice = member(&api, "alice").await;
    let bob = member(&api, "bob").await;
    let id = post(&api, &alice, "thread").await;
    for text in ["one", "two", "three"] {
        api.create_comment(Some(&bob), id, NewComment::new(text))
            .await
            .expect("comment");
    }
    let listing = api.list_comments(None, id, &Page::default()).await.expect("list");
    let texts: Vec<&str> = listing.items.iter().map(|comment| comment.text.as_str()).collect();
    assert_eq!(texts, vec!["three", "two", "one"]);
}

#[tokio::test]
async fn only_the_comment_author_may_edit_or_delete() {
    let api = api();
    let alice = member(&api, "alice").await;
    let bob = member(&api, "bob").await;
    let id = post(&api, &alice, "thread").await;
    let comment = api
        .create_comment(Some(&bob), id, NewComment::new("bob says"))
        .await
        .expect("comment")
        .id;

    // The post author does not own comments under it.
    let err = api
        .update_comment(Some(&alice), id, comment, CommentPatch::text("edited"))
        .await
        .expect_err("not owner");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = api
        .delete_comment(Some(&alice), id, comment)
        .await
        .expect_err("not owner");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let edited = api
        .update_comment(Some(&bob), id, comment, CommentPatch::text("bob edits"))
        .await
        .expect("owner edit");
    assert_eq!(edited.text, "bob edits");

    api.delete_comment(Some(&bob), id, comment).await.expect("owner delete");
    let err = api.get_comment(None, id, comment).await.expect_err("deleted");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn anonymous_comment_mutations_are_unauthenticated() {
    let api = api();
    let alice = member(&api, "alice").await;
    let id = post(&api, &alice, "thread").await;
    let err = api
        .create_comment(None, id, NewComment::new("drive-by"))
        .await
        .expect_err("anonymous");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    let err = api
        .delete_comment(None, id, CommentId(1))
        .await
        .expect_err("anonymous");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}
