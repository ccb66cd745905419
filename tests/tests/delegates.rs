use pretty_assertions::assert_eq;
use quill::{
    schema::{FieldDef, FieldDefault, ModelDef, Provider},
    Schema, Value,
};
use serde_json::json;

fn schema() -> Schema {
    Schema::new(Provider::Sqlite)
        .model(
            ModelDef::new("Asset")
                .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
                .field(FieldDef::new("kind", "String").discriminator())
                .delegate(),
        )
        .model(
            ModelDef::new("Video")
                .extends("Asset")
                .field(FieldDef::new("duration", "Int")),
        )
        .model(
            ModelDef::new("Image")
                .extends("Asset")
                .field(FieldDef::new("width", "Int")),
        )
}

const DDL: &[&str] = &[
    r#"CREATE TABLE "Asset" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "kind" TEXT NOT NULL)"#,
    r#"CREATE TABLE "Video" ("id" INTEGER PRIMARY KEY REFERENCES "Asset" ("id"), "duration" INTEGER NOT NULL)"#,
    r#"CREATE TABLE "Image" ("id" INTEGER PRIMARY KEY REFERENCES "Asset" ("id"), "width" INTEGER NOT NULL)"#,
];

#[tokio::test]
async fn sub_models_read_back_through_the_base() {
    let (client, _) = tests::setup(schema(), DDL).await;

    let video = client
        .model("Video")
        .create(json!({ "data": { "duration": 30 } }))
        .await
        .unwrap();
    assert_eq!(video.to_json(), json!({ "id": 1, "kind": "Video", "duration": 30 }));

    client
        .model("Image")
        .create(json!({ "data": { "width": 640 } }))
        .await
        .unwrap();

    // Each base table row records which sub-model it belongs to.
    let stored = client
        .query_raw(r#"SELECT "id", "kind" FROM "Asset" ORDER BY "id""#, vec![])
        .await
        .unwrap();
    assert_eq!(
        Value::List(stored).to_json(),
        json!([{ "id": 1, "kind": "Video" }, { "id": 2, "kind": "Image" }])
    );

    let assets = client
        .model("Asset")
        .find_many(json!({ "orderBy": { "id": "asc" } }))
        .await
        .unwrap();
    assert_eq!(
        assets.to_json(),
        json!([
            { "id": 1, "kind": "Video", "duration": 30 },
            { "id": 2, "kind": "Image", "width": 640 },
        ])
    );

    let videos = client
        .model("Video")
        .find_many(json!({ "where": { "duration": { "gt": 10 } } }))
        .await
        .unwrap();
    assert_eq!(videos.to_json(), json!([{ "id": 1, "kind": "Video", "duration": 30 }]));
}
