use pretty_assertions::assert_eq;
use quill_sql::{
    stmt::{
        Assignment, BinaryOp, Delete, Expr, Insert, OnConflict, Select, SelectItem, Statement,
        TableName, TableRef, Update, Value,
    },
    Serializer,
};
use quill_core::driver::operation::Transaction;

fn table(name: &str) -> TableName {
    TableName {
        name: name.into(),
        schema: None,
        alias: None,
    }
}

fn serialize(serializer: Serializer, stmt: impl Into<Statement>) -> (String, Vec<Value>) {
    let mut params = vec![];
    let sql = serializer.serialize(&stmt.into(), &mut params);
    (sql, params)
}

fn insert_users() -> Insert {
    Insert {
        table: table("User"),
        columns: vec!["email".into(), "name".into()],
        rows: vec![
            vec![Expr::value("a@x.io"), Expr::value("A")],
            vec![Expr::value("b@x.io"), Expr::NULL],
        ],
        on_conflict: None,
        returning: vec![SelectItem::expr(Expr::unqualified("id"))],
    }
}

#[test]
fn multi_row_insert_with_returning() {
    let (sql, params) = serialize(Serializer::sqlite(), insert_users());
    assert_eq!(
        sql,
        r#"INSERT INTO "User" ("email", "name") VALUES (?1, ?2), (?3, NULL) RETURNING "id""#
    );
    assert_eq!(params.len(), 3);
}

#[test]
fn skip_duplicates() {
    let mut insert = insert_users();
    insert.on_conflict = Some(OnConflict::Ignore);
    insert.returning.clear();

    assert_eq!(
        serialize(Serializer::postgresql(), insert.clone()).0,
        r#"INSERT INTO "User" ("email", "name") VALUES ($1, $2), ($3, NULL) ON CONFLICT DO NOTHING"#
    );
    assert_eq!(
        serialize(Serializer::mysql(), insert).0,
        "INSERT IGNORE INTO `User` (`email`, `name`) VALUES (?, ?), (?, NULL)"
    );
}

#[test]
fn insert_default_values() {
    let insert = Insert {
        table: table("Counter"),
        columns: vec![],
        rows: vec![vec![]],
        on_conflict: None,
        returning: vec![],
    };

    assert_eq!(
        serialize(Serializer::sqlite(), insert.clone()).0,
        r#"INSERT INTO "Counter" DEFAULT VALUES"#
    );
    assert_eq!(
        serialize(Serializer::mysql(), insert).0,
        "INSERT INTO `Counter` () VALUES ()"
    );
}

#[test]
fn update_with_arithmetic_and_limit() {
    let update = Update {
        table: TableName {
            alias: Some("Post".into()),
            ..table("posts")
        },
        assignments: vec![Assignment {
            column: "views".into(),
            value: Expr::binary(Expr::column("Post", "views"), BinaryOp::Add, Expr::value(1)),
        }],
        filter: Some(Expr::eq(Expr::column("Post", "published"), Expr::TRUE)),
        limit: Some(3),
        returning: vec![],
    };

    assert_eq!(
        serialize(Serializer::mysql(), update).0,
        "UPDATE `posts` AS `Post` SET `views` = (`Post`.`views` + ?) WHERE `Post`.`published` = TRUE LIMIT 3"
    );
}

#[test]
fn delete_by_subquery_ids() {
    let mut ids = Select::from(TableRef::table("User", None)).item(Expr::column("User", "id"), None);
    ids.limit = Some(2);
    let wrapped = Select::from(TableRef::derived(ids, "$sub")).item(Expr::column("$sub", "id"), None);

    let delete = Delete {
        table: table("User"),
        filter: Some(Expr::in_subquery(vec![Expr::column("User", "id")], wrapped)),
        limit: None,
        returning: vec![],
    };

    assert_eq!(
        serialize(Serializer::sqlite(), delete).0,
        r#"DELETE FROM "User" WHERE "User"."id" IN (SELECT "$sub"."id" FROM (SELECT "User"."id" FROM "User" LIMIT 2) AS "$sub")"#
    );
}

#[test]
fn transactions() {
    let mysql = Serializer::mysql();
    let sqlite = Serializer::sqlite();

    assert_eq!(mysql.serialize_transaction(&Transaction::Start), "START TRANSACTION");
    assert_eq!(sqlite.serialize_transaction(&Transaction::Start), "BEGIN");
    assert_eq!(sqlite.serialize_transaction(&Transaction::Savepoint(2)), "SAVEPOINT sp_2");
    assert_eq!(
        sqlite.serialize_transaction(&Transaction::RollbackToSavepoint(1)),
        "ROLLBACK TO SAVEPOINT sp_1"
    );
}
