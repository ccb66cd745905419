use quill::Operation;
use serde_json::json;
use tests::blog;

/// Runs `op` and checks the result against the shape computed for the
/// same arguments.
async fn run_checked(client: &quill::Client, model: &str, op: Operation, args: serde_json::Value) {
    let shape = client.model(model).shape(op, args.clone()).unwrap();
    let result = client.run(model, op, args).await.unwrap();
    if let Err(err) = shape.check(&result) {
        panic!("{op} on {model}: {err}\nshape: {shape}\nresult: {:#}", result.to_json());
    }
}

#[tokio::test]
async fn results_match_their_shapes() {
    let (client, _) = blog().await;

    run_checked(
        &client,
        "User",
        Operation::Create,
        json!({
            "data": {
                "email": "ann@example.com",
                "posts": { "create": [{ "title": "a", "tags": { "create": { "name": "t" } } }] },
            },
            "include": { "posts": { "include": { "tags": true } }, "profile": true },
        }),
    )
    .await;

    run_checked(
        &client,
        "User",
        Operation::FindMany,
        json!({ "select": { "email": true, "name": true, "_count": { "select": { "posts": true } } } }),
    )
    .await;
    run_checked(&client, "User", Operation::FindUnique, json!({ "where": { "id": 9 } })).await;
    run_checked(&client, "Post", Operation::Exists, json!({ "where": { "title": "a" } })).await;
    run_checked(&client, "Post", Operation::UpdateMany, json!({ "data": { "views": { "increment": 1 } } })).await;
    run_checked(&client, "Post", Operation::Count, json!({ "select": { "_all": true, "title": true } })).await;
    run_checked(
        &client,
        "Post",
        Operation::Aggregate,
        json!({ "_count": true, "_avg": { "views": true }, "_max": { "title": true } }),
    )
    .await;
    run_checked(
        &client,
        "Post",
        Operation::GroupBy,
        json!({ "by": ["authorId", "published"], "_sum": { "views": true } }),
    )
    .await;
}
