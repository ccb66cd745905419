use pretty_assertions::assert_eq;
use quill::{
    schema::{EnumDef, FieldDef, FieldDefault, ModelDef, Provider, RelationInfo},
    Schema, Value,
};
use serde_json::json;

fn schema() -> Schema {
    Schema::new(Provider::Sqlite)
        .model(
            ModelDef::new("Account")
                .map("accounts")
                .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
                .field(FieldDef::new("fullName", "String").map("full_name"))
                .field(FieldDef::new("status", "Status"))
                .field(FieldDef::new("entries", "Entry").array().relation(RelationInfo::back())),
        )
        .model(
            ModelDef::new("Entry")
                .map("ledger_entries")
                .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
                .field(FieldDef::new("amount", "Int"))
                .field(FieldDef::new("account", "Account").relation(RelationInfo::new(&["accountId"], &["id"])))
                .field(FieldDef::new("accountId", "Int").map("account_id").foreign_key_for("account")),
        )
        .enum_def(EnumDef::new("Status", &["ACTIVE", "CLOSED"]).map("ACTIVE", "active").map("CLOSED", "closed"))
}

const DDL: &[&str] = &[
    r#"CREATE TABLE "accounts" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "full_name" TEXT NOT NULL,
        "status" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE "ledger_entries" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "amount" INTEGER NOT NULL,
        "account_id" INTEGER NOT NULL REFERENCES "accounts" ("id")
    )"#,
];

#[tokio::test]
async fn logical_names_map_to_storage_names() {
    let (client, log) = tests::setup(schema(), DDL).await;
    let accounts = client.model("Account");

    let created = accounts
        .create(json!({
            "data": {
                "fullName": "Ann Example",
                "status": "ACTIVE",
                "entries": { "create": [{ "amount": 5 }, { "amount": -2 }] },
            },
            "include": { "entries": { "select": { "amount": true }, "orderBy": { "id": "asc" } } },
        }))
        .await
        .unwrap();
    assert_eq!(
        created.to_json(),
        json!({
            "id": 1,
            "fullName": "Ann Example",
            "status": "ACTIVE",
            "entries": [{ "amount": 5 }, { "amount": -2 }],
        })
    );

    let statements = log.statements();
    assert!(statements.iter().any(|sql| sql.contains(r#""accounts""#)), "{statements:#?}");
    assert!(statements.iter().any(|sql| sql.contains(r#""full_name""#)), "{statements:#?}");
    assert!(statements.iter().any(|sql| sql.contains(r#""ledger_entries""#)), "{statements:#?}");

    let stored = client
        .query_raw(r#"SELECT "full_name", "status" FROM "accounts""#, vec![])
        .await
        .unwrap();
    assert_eq!(
        Value::List(stored).to_json(),
        json!([{ "full_name": "Ann Example", "status": "active" }])
    );
}

#[tokio::test]
async fn filters_and_aggregates_use_storage_names() {
    let (client, _) = tests::setup(schema(), DDL).await;
    let accounts = client.model("Account");

    accounts
        .create_many(json!({
            "data": [
                { "fullName": "Open", "status": "ACTIVE" },
                { "fullName": "Shut", "status": "CLOSED" },
            ],
        }))
        .await
        .unwrap();
    client
        .model("Entry")
        .create_many(json!({
            "data": [
                { "amount": 3, "accountId": 1 },
                { "amount": 4, "accountId": 1 },
                { "amount": 9, "accountId": 2 },
            ],
        }))
        .await
        .unwrap();

    let closed = accounts
        .find_many(json!({
            "where": { "status": { "in": ["CLOSED"] } },
            "select": { "fullName": true, "status": true },
        }))
        .await
        .unwrap();
    assert_eq!(closed.to_json(), json!([{ "fullName": "Shut", "status": "CLOSED" }]));

    let with_small_entries = accounts
        .find_many(json!({
            "where": { "entries": { "every": { "amount": { "lt": 5 } } } },
            "select": { "fullName": true },
        }))
        .await
        .unwrap();
    assert_eq!(with_small_entries.to_json(), json!([{ "fullName": "Open" }]));

    let totals = client
        .model("Entry")
        .group_by(json!({
            "by": ["accountId"],
            "_sum": { "amount": true },
            "orderBy": { "accountId": "asc" },
        }))
        .await
        .unwrap();
    assert_eq!(
        totals.to_json(),
        json!([
            { "accountId": 1, "_sum": { "amount": 7 } },
            { "accountId": 2, "_sum": { "amount": 9 } },
        ])
    );

    let renamed = accounts
        .update(json!({
            "where": { "id": 2 },
            "data": { "fullName": "Reopened", "status": "ACTIVE" },
            "select": { "fullName": true, "status": true },
        }))
        .await
        .unwrap();
    assert_eq!(renamed.to_json(), json!({ "fullName": "Reopened", "status": "ACTIVE" }));
}
