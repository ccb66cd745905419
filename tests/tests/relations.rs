use pretty_assertions::assert_eq;
use quill::Value;
use serde_json::json;
use tests::blog;

#[tokio::test]
async fn nested_create_across_relations() {
    let (client, _) = blog().await;

    let user = client
        .model("User")
        .create(json!({
            "data": {
                "email": "ann@example.com",
                "profile": { "create": { "bio": "writes about databases" } },
                "posts": {
                    "create": [
                        {
                            "title": "Joins",
                            "tags": { "connectOrCreate": [
                                { "where": { "name": "sql" }, "create": { "name": "sql" } },
                            ] },
                        },
                        {
                            "title": "Indexes",
                            "tags": { "connectOrCreate": [
                                { "where": { "name": "sql" }, "create": { "name": "sql" } },
                                { "where": { "name": "perf" }, "create": { "name": "perf" } },
                            ] },
                        },
                    ],
                },
            },
            "select": {
                "email": true,
                "profile": { "select": { "bio": true } },
                "posts": {
                    "select": { "title": true, "tags": { "select": { "name": true }, "orderBy": { "name": "asc" } } },
                    "orderBy": { "title": "asc" },
                },
            },
        }))
        .await
        .unwrap();

    assert_eq!(
        user.to_json(),
        json!({
            "email": "ann@example.com",
            "profile": { "bio": "writes about databases" },
            "posts": [
                { "title": "Indexes", "tags": [{ "name": "perf" }, { "name": "sql" }] },
                { "title": "Joins", "tags": [{ "name": "sql" }] },
            ],
        })
    );
    assert_eq!(client.model("Tag").count(json!({})).await.unwrap(), Value::Int(2));
}

#[tokio::test]
async fn include_and_relation_counts() {
    let (client, _) = blog().await;
    let users = client.model("User");

    users
        .create(json!({
            "data": {
                "email": "ben@example.com",
                "posts": { "create": [{ "title": "a", "views": 1 }, { "title": "b", "views": 5 }] },
            },
        }))
        .await
        .unwrap();
    users
        .create(json!({ "data": { "email": "cat@example.com" } }))
        .await
        .unwrap();

    let found = users
        .find_many(json!({
            "select": {
                "email": true,
                "profile": true,
                "posts": { "where": { "views": { "gt": 2 } }, "select": { "title": true } },
                "_count": { "select": { "posts": true } },
            },
            "orderBy": { "email": "asc" },
        }))
        .await
        .unwrap();

    assert_eq!(
        found.to_json(),
        json!([
            { "email": "ben@example.com", "profile": null, "posts": [{ "title": "b" }], "_count": { "posts": 2 } },
            { "email": "cat@example.com", "profile": null, "posts": [], "_count": { "posts": 0 } },
        ])
    );

    let post = client
        .model("Post")
        .find_first(json!({
            "where": { "title": "a" },
            "include": { "author": { "select": { "email": true } } },
            "omit": { "views": true, "published": true },
        }))
        .await
        .unwrap();
    assert_eq!(
        post.to_json(),
        json!({ "id": 1, "title": "a", "authorId": 1, "author": { "email": "ben@example.com" } })
    );
}

#[tokio::test]
async fn nested_updates_on_many_to_many() {
    let (client, _) = blog().await;

    client
        .model("Tag")
        .create_many(json!({ "data": [{ "name": "a" }, { "name": "b" }, { "name": "c" }] }))
        .await
        .unwrap();
    client
        .model("User")
        .create(json!({
            "data": {
                "email": "dan@example.com",
                "posts": { "create": { "title": "p", "tags": { "connect": [{ "name": "a" }, { "name": "b" }] } } },
            },
        }))
        .await
        .unwrap();

    let posts = client.model("Post");
    let tag_names = |value: Value| {
        value.to_json()["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tag| tag["name"].as_str().unwrap().to_string())
            .collect::<Vec<_>>()
    };
    let select = json!({ "tags": { "select": { "name": true }, "orderBy": { "name": "asc" } } });

    let updated = posts
        .update(json!({
            "where": { "id": 1 },
            "data": { "tags": { "disconnect": { "name": "a" }, "connect": { "name": "c" } } },
            "select": select,
        }))
        .await
        .unwrap();
    assert_eq!(tag_names(updated), ["b", "c"]);

    let updated = posts
        .update(json!({
            "where": { "id": 1 },
            "data": { "tags": { "set": [{ "name": "a" }] } },
            "select": select,
        }))
        .await
        .unwrap();
    assert_eq!(tag_names(updated), ["a"]);

    // Unlinking leaves the tags themselves in place.
    assert_eq!(client.model("Tag").count(json!({})).await.unwrap(), Value::Int(3));
}

#[tokio::test]
async fn nested_updates_on_one_to_many() {
    let (client, _) = blog().await;
    let users = client.model("User");

    users
        .create(json!({
            "data": {
                "email": "eve@example.com",
                "posts": { "create": [{ "title": "draft" }, { "title": "final" }] },
            },
        }))
        .await
        .unwrap();

    let user = users
        .update(json!({
            "where": { "email": "eve@example.com" },
            "data": {
                "posts": {
                    "updateMany": { "where": { "title": "final" }, "data": { "published": true } },
                    "deleteMany": { "title": "draft" },
                    "create": { "title": "sequel" },
                },
            },
            "select": {
                "posts": { "select": { "title": true, "published": true }, "orderBy": { "id": "asc" } },
            },
        }))
        .await
        .unwrap();

    assert_eq!(
        user.to_json(),
        json!({
            "posts": [
                { "title": "final", "published": true },
                { "title": "sequel", "published": false },
            ],
        })
    );
}

#[tokio::test]
async fn optional_to_one_can_be_removed() {
    let (client, _) = blog().await;
    let users = client.model("User");

    users
        .create(json!({
            "data": { "email": "fay@example.com", "profile": { "create": { "bio": "hi" } } },
        }))
        .await
        .unwrap();

    let user = users
        .update(json!({
            "where": { "id": 1 },
            "data": { "profile": { "delete": true } },
            "select": { "profile": true },
        }))
        .await
        .unwrap();
    assert_eq!(user.to_json(), json!({ "profile": null }));
    assert_eq!(client.model("Profile").count(json!({})).await.unwrap(), Value::Int(0));
}

#[tokio::test]
async fn failed_nested_write_rolls_back() {
    let (client, log) = blog().await;

    let err = client
        .model("User")
        .create(json!({
            "data": {
                "email": "gus@example.com",
                "posts": { "connect": { "id": 99 } },
            },
        }))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");

    assert_eq!(client.model("User").count(json!({})).await.unwrap(), Value::Int(0));
    assert!(
        log.statements().iter().any(|sql| sql.starts_with("ROLLBACK")),
        "{:#?}",
        log.statements()
    );
}

#[tokio::test]
async fn to_one_upsert_honors_its_filter() {
    let (client, _) = blog().await;
    let posts = client.model("Post");

    posts
        .create(json!({
            "data": { "title": "hello", "author": { "create": { "email": "ann@example.com" } } },
        }))
        .await
        .unwrap();

    // The linked author does not match, so a new one is created and linked.
    let post = posts
        .update(json!({
            "where": { "id": 1 },
            "data": {
                "author": {
                    "upsert": {
                        "where": { "email": "nobody@example.com" },
                        "create": { "email": "ben@example.com" },
                        "update": { "name": "renamed" },
                    },
                },
            },
            "select": { "author": { "select": { "email": true } } },
        }))
        .await
        .unwrap();
    assert_eq!(post.to_json(), json!({ "author": { "email": "ben@example.com" } }));

    // Now it matches and is updated in place.
    let post = posts
        .update(json!({
            "where": { "id": 1 },
            "data": {
                "author": {
                    "upsert": {
                        "where": { "email": "ben@example.com" },
                        "create": { "email": "cat@example.com" },
                        "update": { "name": "Ben" },
                    },
                },
            },
            "select": { "author": { "select": { "email": true, "name": true } } },
        }))
        .await
        .unwrap();
    assert_eq!(
        post.to_json(),
        json!({ "author": { "email": "ben@example.com", "name": "Ben" } })
    );

    let users = client
        .model("User")
        .find_many(json!({ "select": { "email": true, "name": true }, "orderBy": { "id": "asc" } }))
        .await
        .unwrap();
    assert_eq!(
        users.to_json(),
        json!([
            { "email": "ann@example.com", "name": null },
            { "email": "ben@example.com", "name": "Ben" },
        ])
    );
}
