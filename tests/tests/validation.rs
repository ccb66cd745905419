use pretty_assertions::assert_eq;
use quill::Error;
use serde_json::json;
use tests::blog;

fn messages(err: &Error) -> Vec<String> {
    err.violations()
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_database() {
    let (client, log) = blog().await;
    let users = client.model("User");

    let err = users
        .find_unique(json!({ "where": { "name": "Ann" } }))
        .await
        .unwrap_err();
    assert!(err.is_invalid_input(), "{err}");
    assert_eq!(messages(&err), ["where: requires a unique filter on one of `id`, `email`"]);

    let err = users
        .find_many(json!({ "where": { "role": "OWNER" }, "take": "ten" }))
        .await
        .unwrap_err();
    let found = messages(&err);
    assert!(found.iter().any(|m| m.starts_with("where.role: ")), "{err}");
    assert!(found.iter().any(|m| m.starts_with("take: ")), "{err}");

    let err = client
        .model("Post")
        .create(json!({ "data": { "title": "orphan" } }))
        .await
        .unwrap_err();
    assert_eq!(messages(&err), ["data: one of `author`, `authorId` is required"]);

    let err = users
        .find_many(json!({ "select": { "id": true }, "include": { "posts": true } }))
        .await
        .unwrap_err();
    assert_eq!(messages(&err), ["`select` and `include` cannot be used together"]);

    assert!(log.statements().is_empty(), "{:#?}", log.statements());
}

#[tokio::test]
async fn unknown_models_are_reported() {
    let (client, _) = blog().await;

    let err = client.model("Comment").find_many(json!({})).await.unwrap_err();
    assert!(!err.is_invalid_input());
    assert!(err.to_string().contains("Comment"), "{err}");
}

#[tokio::test]
async fn database_errors_surface() {
    let (client, _) = blog().await;
    let users = client.model("User");

    users
        .create(json!({ "data": { "email": "dup@example.com" } }))
        .await
        .unwrap();
    let err = users
        .create(json!({ "data": { "email": "dup@example.com" } }))
        .await
        .unwrap_err();
    assert!(!err.is_invalid_input(), "{err}");

    // The failed insert was rolled back; the client keeps working.
    assert_eq!(users.count(json!({})).await.unwrap(), quill::Value::Int(1));
}
