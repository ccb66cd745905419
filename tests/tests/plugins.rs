use pretty_assertions::assert_eq;
use quill::{
    bail,
    driver::RowSet,
    schema::{FieldDef, FieldDefault, ModelDef, Provider},
    stmt::{self, Statement},
    Client, QueryPlugin, Result, Schema, Value,
};
use quill_sql::Serializer;
use serde_json::json;

use std::sync::{Arc, Mutex};

fn schema() -> Schema {
    Schema::new(Provider::Sqlite).model(
        ModelDef::new("Note")
            .map("notes")
            .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
            .field(FieldDef::new("body", "String").map("note_body")),
    )
}

const DDL: &[&str] = &[r#"CREATE TABLE "notes" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "note_body" TEXT NOT NULL)"#];

/// Records the SQL of every statement it sees.
#[derive(Debug, Default, Clone)]
struct Recorder {
    seen: Arc<Mutex<Vec<String>>>,
    rows: Arc<Mutex<usize>>,
}

impl QueryPlugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn transform_query(&self, stmt: Statement) -> Result<Statement> {
        let mut params: Vec<stmt::Value> = vec![];
        let sql = Serializer::sqlite().serialize(&stmt, &mut params);
        self.seen.lock().unwrap().push(sql);
        Ok(stmt)
    }

    fn transform_result(&self, rows: RowSet) -> Result<RowSet> {
        *self.rows.lock().unwrap() += rows.rows.len();
        Ok(rows)
    }
}

/// Refuses to run deletes.
#[derive(Debug)]
struct ReadOnlyDeletes;

impl QueryPlugin for ReadOnlyDeletes {
    fn name(&self) -> &str {
        "no-deletes"
    }

    fn transform_query(&self, stmt: Statement) -> Result<Statement> {
        if let Statement::Delete(_) = stmt {
            bail!("deletes are disabled");
        }
        Ok(stmt)
    }
}

/// Makes every read come back empty.
#[derive(Debug)]
struct HideRows;

impl QueryPlugin for HideRows {
    fn name(&self) -> &str {
        "hide-rows"
    }

    fn transform_query(&self, stmt: Statement) -> Result<Statement> {
        Ok(match stmt {
            Statement::Query(mut select) => {
                select.and_filter(stmt::Expr::FALSE);
                Statement::Query(select)
            }
            stmt => stmt,
        })
    }
}

async fn client_with(plugin: impl QueryPlugin) -> (Client, tests::SqlLog) {
    let mut builder = Client::builder();
    builder.schema(schema()).plugin(plugin);
    tests::setup_with(&mut builder, DDL).await
}

#[tokio::test]
async fn plugins_see_logical_names() {
    let recorder = Recorder::default();
    let (client, log) = client_with(recorder.clone()).await;
    let notes = client.model("Note");

    notes.create(json!({ "data": { "body": "first" } })).await.unwrap();
    let found = notes
        .find_many(json!({ "where": { "body": { "startsWith": "fi" } } }))
        .await
        .unwrap();
    assert_eq!(found.to_json(), json!([{ "id": 1, "body": "first" }]));

    let seen = recorder.seen.lock().unwrap().clone();
    assert!(seen.iter().any(|sql| sql.contains(r#""body""#)), "{seen:#?}");
    assert!(seen.iter().all(|sql| !sql.contains("note_body")), "{seen:#?}");

    // The driver gets the storage names.
    let executed = log.statements();
    assert!(executed.iter().any(|sql| sql.contains(r#""note_body""#)), "{executed:#?}");

    assert!(*recorder.rows.lock().unwrap() >= 2);
}

#[tokio::test]
async fn plugin_errors_abort_the_operation() {
    let (client, _) = client_with(ReadOnlyDeletes).await;
    let notes = client.model("Note");

    notes.create(json!({ "data": { "body": "keep me" } })).await.unwrap();

    let err = notes.delete(json!({ "where": { "id": 1 } })).await.unwrap_err();
    assert!(err.to_string().contains("deletes are disabled"), "{err}");
    assert_eq!(notes.count(json!({})).await.unwrap(), Value::Int(1));
}

#[tokio::test]
async fn unreadable_writes_roll_back() {
    let (client, log) = client_with(HideRows).await;

    let err = client
        .model("Note")
        .create(json!({ "data": { "body": "hidden" } }))
        .await
        .unwrap_err();
    assert!(err.is_rejected_by_policy(), "{err}");
    assert!(
        log.statements().iter().any(|sql| sql.starts_with("ROLLBACK")),
        "{:#?}",
        log.statements()
    );

    let stored = client.query_raw(r#"SELECT "id" FROM "notes""#, vec![]).await.unwrap();
    assert!(stored.is_empty(), "{stored:?}");
}
