use pretty_assertions::assert_eq;
use quill::Value;
use serde_json::json;
use tests::blog;

#[tokio::test]
async fn create_and_find() {
    let (client, _) = blog().await;
    let users = client.model("User");

    let created = users
        .create(json!({
            "data": { "email": "alice@example.com", "name": "Alice" },
            "select": { "id": true, "email": true, "name": true, "role": true },
        }))
        .await
        .unwrap();
    assert_eq!(
        created.to_json(),
        json!({ "id": 1, "email": "alice@example.com", "name": "Alice", "role": "USER" })
    );

    let found = users
        .find_unique(json!({ "where": { "email": "alice@example.com" } }))
        .await
        .unwrap();
    assert!(matches!(found.get("createdAt"), Some(Value::DateTime(_))), "{found:?}");
    assert_eq!(found.get("name"), Some(&Value::from("Alice")));

    let missing = users.find_unique(json!({ "where": { "id": 42 } })).await.unwrap();
    assert_eq!(missing, Value::Null);

    let err = users
        .find_unique_or_throw(json!({ "where": { "id": 42 } }))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn update_and_delete() {
    let (client, _) = blog().await;
    let users = client.model("User");
    let posts = client.model("Post");

    users
        .create(json!({ "data": { "email": "bob@example.com" } }))
        .await
        .unwrap();
    posts
        .create(json!({ "data": { "title": "Hello", "authorId": 1 } }))
        .await
        .unwrap();

    let updated = users
        .update(json!({
            "where": { "id": 1 },
            "data": { "name": "Bob", "role": "ADMIN" },
            "select": { "name": true, "role": true },
        }))
        .await
        .unwrap();
    assert_eq!(updated.to_json(), json!({ "name": "Bob", "role": "ADMIN" }));

    let post = posts
        .update(json!({
            "where": { "id": 1 },
            "data": { "views": { "increment": 5 }, "published": { "set": true } },
            "select": { "views": true, "published": true },
        }))
        .await
        .unwrap();
    assert_eq!(post.to_json(), json!({ "views": 5, "published": true }));

    let err = users
        .update(json!({ "where": { "id": 9 }, "data": { "name": "Nobody" } }))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");

    let deleted = posts
        .delete(json!({ "where": { "id": 1 }, "select": { "title": true } }))
        .await
        .unwrap();
    assert_eq!(deleted.to_json(), json!({ "title": "Hello" }));
    assert_eq!(posts.count(json!({})).await.unwrap(), Value::Int(0));
}

#[tokio::test]
async fn batch_writes_return_counts() {
    let (client, _) = blog().await;
    let users = client.model("User");

    let created = users
        .create_many(json!({
            "data": [
                { "email": "a@example.com" },
                { "email": "b@example.com" },
                { "email": "c@example.com", "role": "ADMIN" },
            ],
        }))
        .await
        .unwrap();
    assert_eq!(created.to_json(), json!({ "count": 3 }));

    let skipped = users
        .create_many(json!({
            "data": [{ "email": "a@example.com" }, { "email": "d@example.com" }],
            "skipDuplicates": true,
        }))
        .await
        .unwrap();
    assert_eq!(skipped.to_json(), json!({ "count": 1 }));

    let updated = users
        .update_many(json!({ "where": { "role": "USER" }, "data": { "name": "member" } }))
        .await
        .unwrap();
    assert_eq!(updated.to_json(), json!({ "count": 3 }));

    let returned = users
        .update_many_and_return(json!({
            "where": { "role": "ADMIN" },
            "data": { "name": "admin" },
            "select": { "email": true, "name": true },
        }))
        .await
        .unwrap();
    assert_eq!(returned.to_json(), json!([{ "email": "c@example.com", "name": "admin" }]));

    let deleted = users
        .delete_many(json!({ "where": { "name": "member" } }))
        .await
        .unwrap();
    assert_eq!(deleted.to_json(), json!({ "count": 3 }));
    assert_eq!(users.count(json!({})).await.unwrap(), Value::Int(1));
}

#[tokio::test]
async fn create_many_and_return_reads_rows_back() {
    let (client, _) = blog().await;
    let tags = client.model("Tag");

    let created = tags
        .create_many_and_return(json!({
            "data": [{ "name": "rust" }, { "name": "sql" }],
            "select": { "name": true },
        }))
        .await
        .unwrap();
    assert_eq!(created.to_json(), json!([{ "name": "rust" }, { "name": "sql" }]));
}

#[tokio::test]
async fn upsert_creates_then_updates() {
    let (client, _) = blog().await;
    let users = client.model("User");

    let args = json!({
        "where": { "email": "eve@example.com" },
        "create": { "email": "eve@example.com", "name": "Eve" },
        "update": { "name": "Eve again" },
        "select": { "name": true },
    });

    let first = users.upsert(args.clone()).await.unwrap();
    assert_eq!(first.to_json(), json!({ "name": "Eve" }));

    let second = users.upsert(args).await.unwrap();
    assert_eq!(second.to_json(), json!({ "name": "Eve again" }));
    assert_eq!(users.count(json!({})).await.unwrap(), Value::Int(1));
}

#[tokio::test]
async fn exists_checks_for_any_match() {
    let (client, _) = blog().await;
    let users = client.model("User");

    assert_eq!(users.exists(json!({})).await.unwrap(), Value::Bool(false));
    users
        .create(json!({ "data": { "email": "x@example.com" } }))
        .await
        .unwrap();
    assert_eq!(
        users.exists(json!({ "where": { "email": { "endsWith": "@example.com" } } })).await.unwrap(),
        Value::Bool(true)
    );
}

#[tokio::test]
async fn omitted_fields_stay_out_of_results() {
    let mut builder = quill::Client::builder();
    builder.schema(tests::blog_schema()).omit("User", "createdAt");
    let (client, _) = tests::setup_with(&mut builder, tests::BLOG_DDL).await;
    let users = client.model("User");

    let created = users
        .create(json!({ "data": { "email": "o@example.com" } }))
        .await
        .unwrap();
    assert_eq!(
        created.to_json(),
        json!({ "id": 1, "email": "o@example.com", "name": null, "role": "USER" })
    );

    let with_date = users
        .find_first(json!({ "omit": { "createdAt": false, "role": true } }))
        .await
        .unwrap();
    assert!(with_date.get("createdAt").is_some());
    assert!(with_date.get("role").is_none());
}
