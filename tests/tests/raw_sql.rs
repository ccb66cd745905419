use pretty_assertions::assert_eq;
use quill::Value;
use serde_json::json;
use tests::blog;

#[tokio::test]
async fn execute_and_query_raw() {
    let (client, log) = blog().await;

    let inserted = client
        .execute_raw(
            r#"INSERT INTO "User" ("email", "name", "role", "createdAt") VALUES (?1, ?2, 'USER', '2024-01-01T00:00:00.000Z'), (?3, NULL, 'ADMIN', '2024-01-02T00:00:00.000Z')"#,
            vec!["raw@example.com".into(), "Raw".into(), "admin@example.com".into()],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(log.statements().len(), 1);

    let rows = client
        .query_raw(
            r#"SELECT "id", "email", "name" FROM "User" WHERE "role" = ?1 ORDER BY "id""#,
            vec!["USER".into()],
        )
        .await
        .unwrap();
    assert_eq!(
        Value::List(rows).to_json(),
        json!([{ "id": 1, "email": "raw@example.com", "name": "Raw" }])
    );

    // Rows written behind the client's back are visible to it.
    let user = client
        .model("User")
        .find_unique(json!({ "where": { "email": "admin@example.com" }, "select": { "role": true, "createdAt": true } }))
        .await
        .unwrap();
    assert_eq!(
        user.to_json(),
        json!({ "role": "ADMIN", "createdAt": "2024-01-02T00:00:00.000Z" })
    );
}

#[tokio::test]
async fn raw_errors_are_reported() {
    let (client, _) = blog().await;

    assert!(client.execute_raw("SELECT FROM nowhere", vec![]).await.is_err());

    let err = client
        .query_raw("SELECT ?1", vec![Value::AnyNull])
        .await
        .unwrap_err();
    assert!(err.is_invalid_input(), "{err}");
}
