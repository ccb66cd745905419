use pretty_assertions::assert_eq;
use quill::{
    schema::{FieldDef, FieldDefault, ModelDef, Provider},
    Client, Schema,
};
use serde_json::json;
use tests::blog;

async fn seed(client: &Client) {
    client
        .model("User")
        .create_many(json!({
            "data": [
                { "email": "ann@example.com", "name": "Ann", "role": "ADMIN" },
                { "email": "ben@example.com", "name": "Ben" },
                { "email": "cat@test.dev" },
            ],
        }))
        .await
        .unwrap();
    client
        .model("Post")
        .create_many(json!({
            "data": [
                { "title": "Rust tips", "published": true, "views": 10, "authorId": 1 },
                { "title": "SQL tricks", "published": false, "views": 3, "authorId": 1 },
                { "title": "Rusty nails", "published": true, "views": 7, "authorId": 2 },
            ],
        }))
        .await
        .unwrap();
}

async fn emails(client: &Client, mut args: serde_json::Value) -> serde_json::Value {
    args["select"] = json!({ "email": true });
    args["orderBy"] = json!({ "id": "asc" });
    client.model("User").find_many(args).await.unwrap().to_json()
}

#[tokio::test]
async fn string_and_list_operators() {
    let (client, _) = blog().await;
    seed(&client).await;

    assert_eq!(
        emails(&client, json!({ "where": { "email": { "endsWith": "example.com" } } })).await,
        json!([{ "email": "ann@example.com" }, { "email": "ben@example.com" }])
    );
    assert_eq!(
        emails(&client, json!({ "where": { "name": { "in": ["Ben", "Zed"] } } })).await,
        json!([{ "email": "ben@example.com" }])
    );
    assert_eq!(
        emails(&client, json!({ "where": { "name": null } })).await,
        json!([{ "email": "cat@test.dev" }])
    );
    assert_eq!(
        emails(&client, json!({ "where": { "name": { "not": null } } })).await,
        json!([{ "email": "ann@example.com" }, { "email": "ben@example.com" }])
    );
}

#[tokio::test]
async fn logical_combinators() {
    let (client, _) = blog().await;
    seed(&client).await;

    assert_eq!(
        emails(
            &client,
            json!({ "where": { "OR": [{ "role": "ADMIN" }, { "email": { "contains": "test" } }] } })
        )
        .await,
        json!([{ "email": "ann@example.com" }, { "email": "cat@test.dev" }])
    );
    assert_eq!(
        emails(&client, json!({ "where": { "NOT": { "role": "ADMIN" }, "name": { "not": null } } })).await,
        json!([{ "email": "ben@example.com" }])
    );
    // An empty OR matches nothing, an empty AND everything.
    assert_eq!(emails(&client, json!({ "where": { "OR": [] } })).await, json!([]));
    assert_eq!(
        emails(&client, json!({ "where": { "AND": [] } })).await.as_array().map(Vec::len),
        Some(3)
    );
}

#[tokio::test]
async fn relation_filters() {
    let (client, _) = blog().await;
    seed(&client).await;

    assert_eq!(
        emails(&client, json!({ "where": { "posts": { "some": { "published": false } } } })).await,
        json!([{ "email": "ann@example.com" }])
    );
    assert_eq!(
        emails(&client, json!({ "where": { "posts": { "none": {} } } })).await,
        json!([{ "email": "cat@test.dev" }])
    );
    // `every` holds for users without posts.
    assert_eq!(
        emails(&client, json!({ "where": { "posts": { "every": { "published": true } } } })).await,
        json!([{ "email": "ben@example.com" }, { "email": "cat@test.dev" }])
    );

    let titles = client
        .model("Post")
        .find_many(json!({
            "where": { "author": { "is": { "role": "ADMIN" } } },
            "select": { "title": true },
            "orderBy": { "title": "asc" },
        }))
        .await
        .unwrap();
    assert_eq!(titles.to_json(), json!([{ "title": "Rust tips" }, { "title": "SQL tricks" }]));
}

#[tokio::test]
async fn ordering_and_pagination() {
    let (client, _) = blog().await;
    seed(&client).await;
    let posts = client.model("Post");

    let by_views = posts
        .find_many(json!({ "select": { "views": true }, "orderBy": { "views": "desc" } }))
        .await
        .unwrap();
    assert_eq!(by_views.to_json(), json!([{ "views": 10 }, { "views": 7 }, { "views": 3 }]));

    let page = posts
        .find_many(json!({
            "select": { "id": true },
            "orderBy": { "id": "asc" },
            "skip": 1,
            "take": 1,
        }))
        .await
        .unwrap();
    assert_eq!(page.to_json(), json!([{ "id": 2 }]));

    // A negative take counts back from the end, keeping the requested order.
    let last_two = posts
        .find_many(json!({ "select": { "id": true }, "orderBy": { "id": "asc" }, "take": -2 }))
        .await
        .unwrap();
    assert_eq!(last_two.to_json(), json!([{ "id": 2 }, { "id": 3 }]));

    let by_author = posts
        .find_many(json!({
            "select": { "title": true },
            "orderBy": [{ "author": { "email": "desc" } }, { "views": "asc" }],
        }))
        .await
        .unwrap();
    assert_eq!(
        by_author.to_json(),
        json!([{ "title": "Rusty nails" }, { "title": "SQL tricks" }, { "title": "Rust tips" }])
    );

    let first = posts
        .find_first(json!({ "where": { "published": true }, "orderBy": { "views": "asc" }, "select": { "title": true } }))
        .await
        .unwrap();
    assert_eq!(first.to_json(), json!({ "title": "Rusty nails" }));
}

#[tokio::test]
async fn cursor_pagination() {
    let (client, _) = blog().await;
    seed(&client).await;

    let after = client
        .model("Post")
        .find_many(json!({
            "cursor": { "id": 2 },
            "select": { "id": true },
            "orderBy": { "id": "asc" },
        }))
        .await
        .unwrap();
    assert_eq!(after.to_json(), json!([{ "id": 2 }, { "id": 3 }]));
}

#[tokio::test]
async fn cursor_ties_on_null_keys() {
    let (client, _) = blog().await;
    client
        .model("User")
        .create_many(json!({
            "data": [
                { "email": "ann@example.com", "name": "Ann" },
                { "email": "nil1@example.com" },
                { "email": "nil2@example.com" },
            ],
        }))
        .await
        .unwrap();

    // SQLite sorts NULLs first, so they come last when descending.
    let rest = client
        .model("User")
        .find_many(json!({
            "cursor": { "id": 2 },
            "select": { "id": true },
            "orderBy": [{ "name": "desc" }, { "id": "asc" }],
        }))
        .await
        .unwrap();
    assert_eq!(rest.to_json(), json!([{ "id": 2 }, { "id": 3 }]));
}

fn cells_schema() -> Schema {
    Schema::new(Provider::Sqlite).model(
        ModelDef::new("Cell")
            .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
            .field(FieldDef::new("a", "Int"))
            .field(FieldDef::new("b", "Int")),
    )
}

const CELLS_DDL: &[&str] =
    &[r#"CREATE TABLE "Cell" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "a" INTEGER NOT NULL, "b" INTEGER NOT NULL)"#];

#[tokio::test]
async fn keyset_cursor_matches_a_linear_scan() {
    let (client, _) = tests::setup(cells_schema(), CELLS_DDL).await;
    let cells = client.model("Cell");

    // Inserted out of order so ids say nothing about the ordering.
    let grid = [(2, 0), (0, 1), (1, 2), (0, 0), (2, 2), (1, 0), (0, 2), (2, 1), (1, 1)];
    let data: Vec<_> = grid.iter().map(|(a, b)| json!({ "a": a, "b": b })).collect();
    cells.create_many(json!({ "data": data })).await.unwrap();

    // Ids ordered by (a asc, b desc).
    let mut ordered: Vec<(i64, i64, i64)> = grid
        .iter()
        .enumerate()
        .map(|(i, (a, b))| (*a, *b, i as i64 + 1))
        .collect();
    ordered.sort_by(|x, y| x.0.cmp(&y.0).then(y.1.cmp(&x.1)));
    let ordered: Vec<i64> = ordered.into_iter().map(|(_, _, id)| id).collect();

    for cursor in 1..=9i64 {
        let at = ordered.iter().position(|id| *id == cursor).unwrap();

        for take in [None, Some(2i64), Some(-2), Some(-4)] {
            let expected: Vec<i64> = match take {
                None => ordered[at..].to_vec(),
                Some(n) if n >= 0 => ordered[at..].iter().take(n as usize).copied().collect(),
                Some(n) => {
                    let start = (at + 1).saturating_sub(n.unsigned_abs() as usize);
                    ordered[start..=at].to_vec()
                }
            };

            let mut args = json!({
                "cursor": { "id": cursor },
                "select": { "id": true },
                "orderBy": [{ "a": "asc" }, { "b": "desc" }],
            });
            if let Some(take) = take {
                args["take"] = json!(take);
            }

            let found = cells.find_many(args).await.unwrap().to_json();
            let ids: Vec<i64> = found
                .as_array()
                .unwrap()
                .iter()
                .map(|row| row["id"].as_i64().unwrap())
                .collect();
            assert_eq!(ids, expected, "cursor {cursor}, take {take:?}");
        }
    }
}

fn docs_schema() -> Schema {
    Schema::new(Provider::Sqlite).model(
        ModelDef::new("Doc")
            .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
            .field(FieldDef::new("meta", "Json").optional()),
    )
}

const DOCS_DDL: &[&str] = &[r#"CREATE TABLE "Doc" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "meta" TEXT)"#];

async fn docs_matching(client: &Client, sentinel: &str) -> serde_json::Value {
    let args = json!({
        "where": { "meta": { "equals": { "$type": sentinel } } },
        "select": { "id": true },
        "orderBy": { "id": "asc" },
    });
    client.model("Doc").find_many(args).await.unwrap().to_json()
}

#[tokio::test]
async fn json_nulls_are_told_apart() {
    let (client, log) = tests::setup(docs_schema(), DOCS_DDL).await;
    let docs = client.model("Doc");

    for meta in [json!({ "$type": "JsonNull" }), json!({ "$type": "DbNull" }), json!({ "a": 1 })] {
        docs.create(json!({ "data": { "meta": meta } })).await.unwrap();
    }

    let stored = client
        .query_raw(r#"SELECT "meta" FROM "Doc" ORDER BY "id""#, vec![])
        .await
        .unwrap();
    assert_eq!(stored[0].get("meta"), Some(&quill::Value::String("null".into())));
    assert_eq!(stored[1].get("meta"), Some(&quill::Value::Null));

    assert_eq!(docs_matching(&client, "JsonNull").await, json!([{ "id": 1 }]));
    assert_eq!(docs_matching(&client, "DbNull").await, json!([{ "id": 2 }]));
    assert_eq!(docs_matching(&client, "AnyNull").await, json!([{ "id": 1 }, { "id": 2 }]));

    log.clear();
    let err = docs
        .create(json!({ "data": { "meta": { "$type": "AnyNull" } } }))
        .await
        .unwrap_err();
    assert!(err.is_invalid_input(), "{err}");
    assert!(log.statements().is_empty());
    assert_eq!(docs.count(json!({})).await.unwrap(), quill::Value::Int(3));
}
