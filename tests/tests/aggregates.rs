use pretty_assertions::assert_eq;
use quill::{Client, Value};
use serde_json::json;
use tests::blog;

async fn seed(client: &Client) {
    client
        .model("User")
        .create_many(json!({ "data": [{ "email": "a@example.com" }, { "email": "b@example.com" }] }))
        .await
        .unwrap();
    client
        .model("Post")
        .create_many(json!({
            "data": [
                { "title": "one", "views": 10, "authorId": 1, "published": true },
                { "title": "two", "views": 2, "authorId": 1 },
                { "title": "three", "views": 6, "authorId": 2, "published": true },
            ],
        }))
        .await
        .unwrap();
}

#[tokio::test]
async fn count_rows_and_fields() {
    let (client, _) = blog().await;
    seed(&client).await;
    let users = client.model("User");

    assert_eq!(users.count(json!({})).await.unwrap(), Value::Int(2));
    assert_eq!(
        client
            .model("Post")
            .count(json!({ "where": { "published": true } }))
            .await
            .unwrap(),
        Value::Int(2)
    );

    // Null names are not counted.
    let counts = users
        .count(json!({ "select": { "_all": true, "name": true } }))
        .await
        .unwrap();
    assert_eq!(counts.to_json(), json!({ "_all": 2, "name": 0 }));
}

#[tokio::test]
async fn aggregate_over_filtered_rows() {
    let (client, _) = blog().await;
    seed(&client).await;

    let result = client
        .model("Post")
        .aggregate(json!({
            "_count": true,
            "_avg": { "views": true },
            "_sum": { "views": true },
            "_min": { "views": true, "title": true },
            "_max": { "views": true },
        }))
        .await
        .unwrap();
    assert_eq!(
        result.to_json(),
        json!({
            "_count": 3,
            "_avg": { "views": 6.0 },
            "_sum": { "views": 18 },
            "_min": { "views": 2, "title": "one" },
            "_max": { "views": 10 },
        })
    );

    // Aggregates over no rows are null, counts are zero.
    let empty = client
        .model("Post")
        .aggregate(json!({
            "where": { "views": { "gt": 100 } },
            "_count": { "_all": true },
            "_sum": { "views": true },
        }))
        .await
        .unwrap();
    assert_eq!(empty.to_json(), json!({ "_count": { "_all": 0 }, "_sum": { "views": null } }));

    // Pagination applies before aggregation.
    let top_two = client
        .model("Post")
        .aggregate(json!({ "orderBy": { "views": "desc" }, "take": 2, "_sum": { "views": true } }))
        .await
        .unwrap();
    assert_eq!(top_two.to_json(), json!({ "_sum": { "views": 16 } }));
}

#[tokio::test]
async fn group_by_with_having_and_order() {
    let (client, _) = blog().await;
    seed(&client).await;
    let posts = client.model("Post");

    let groups = posts
        .group_by(json!({
            "by": ["authorId"],
            "_count": { "_all": true },
            "_sum": { "views": true },
            "orderBy": { "authorId": "asc" },
        }))
        .await
        .unwrap();
    assert_eq!(
        groups.to_json(),
        json!([
            { "authorId": 1, "_count": { "_all": 2 }, "_sum": { "views": 12 } },
            { "authorId": 2, "_count": { "_all": 1 }, "_sum": { "views": 6 } },
        ])
    );

    let busy = posts
        .group_by(json!({
            "by": ["authorId"],
            "having": { "views": { "_sum": { "gt": 10 } } },
            "_max": { "views": true },
        }))
        .await
        .unwrap();
    assert_eq!(busy.to_json(), json!([{ "authorId": 1, "_max": { "views": 10 } }]));

    let by_published = posts
        .group_by(json!({
            "by": ["published"],
            "where": { "authorId": 1 },
            "_count": true,
            "orderBy": { "published": "desc" },
        }))
        .await
        .unwrap();
    assert_eq!(
        by_published.to_json(),
        json!([{ "published": true, "_count": 1 }, { "published": false, "_count": 1 }])
    );
}

#[tokio::test]
async fn group_by_rejects_ungrouped_order() {
    let (client, log) = blog().await;

    let err = client
        .model("Post")
        .group_by(json!({ "by": ["authorId"], "orderBy": { "title": "asc" } }))
        .await
        .unwrap_err();
    assert!(err.is_invalid_input(), "{err}");
    assert!(log.statements().is_empty());
}
