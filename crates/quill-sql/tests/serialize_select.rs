use pretty_assertions::assert_eq;
use quill_sql::{
    stmt::{
        CastType, Direction, Distinct, Expr, NullsOrder, OrderByExpr, Select, Statement, TableRef,
        Value,
    },
    Serializer,
};

fn users() -> Select {
    Select::from(TableRef::table("User", None))
}

fn serialize(serializer: Serializer, select: Select) -> (String, Vec<Value>) {
    let mut params = vec![];
    let sql = serializer.serialize(&Statement::Query(select), &mut params);
    (sql, params)
}

#[test]
fn placeholders_per_flavor() {
    let mut select = users().item(Expr::column("User", "id"), None);
    select.and_filter(Expr::and([
        Expr::eq(Expr::column("User", "email"), Expr::value("a@b.c")),
        Expr::gt(Expr::column("User", "age"), Expr::value(18)),
    ]));

    let (sql, params) = serialize(Serializer::sqlite(), select.clone());
    assert_eq!(
        sql,
        r#"SELECT "User"."id" FROM "User" WHERE ("User"."email" = ?1 AND "User"."age" > ?2)"#
    );
    assert_eq!(params, [Value::from("a@b.c"), Value::I64(18)]);

    let (sql, _) = serialize(Serializer::postgresql(), select.clone());
    assert_eq!(
        sql,
        r#"SELECT "User"."id" FROM "User" WHERE ("User"."email" = $1 AND "User"."age" > $2)"#
    );

    let (sql, _) = serialize(Serializer::mysql(), select);
    assert_eq!(
        sql,
        "SELECT `User`.`id` FROM `User` WHERE (`User`.`email` = ? AND `User`.`age` > ?)"
    );
}

#[test]
fn booleans_and_null_are_inlined() {
    let mut select = users().item(Expr::count_star(), Some("_count"));
    select.and_filter(Expr::or([
        Expr::eq(Expr::column("User", "active"), Expr::TRUE),
        Expr::is_null(Expr::column("User", "deletedAt")),
    ]));

    let (sql, params) = serialize(Serializer::sqlite(), select);
    assert_eq!(
        sql,
        r#"SELECT COUNT(*) AS "_count" FROM "User" WHERE ("User"."active" = TRUE OR "User"."deletedAt" IS NULL)"#
    );
    assert!(params.is_empty());
}

#[test]
fn offset_without_limit() {
    let mut select = users();
    select.offset = Some(5);

    assert_eq!(
        serialize(Serializer::sqlite(), select.clone()).0,
        r#"SELECT * FROM "User" LIMIT -1 OFFSET 5"#
    );
    assert_eq!(
        serialize(Serializer::postgresql(), select.clone()).0,
        r#"SELECT * FROM "User" OFFSET 5"#
    );
    assert_eq!(
        serialize(Serializer::mysql(), select).0,
        "SELECT * FROM `User` LIMIT 18446744073709551615 OFFSET 5"
    );
}

#[test]
fn nulls_ordering_is_emulated_on_mysql() {
    let mut select = users();
    select.order_by.push(OrderByExpr {
        expr: Expr::column("User", "name"),
        direction: Direction::Asc,
        nulls: Some(NullsOrder::Last),
    });
    select.limit = Some(10);

    assert_eq!(
        serialize(Serializer::postgresql(), select.clone()).0,
        r#"SELECT * FROM "User" ORDER BY "User"."name" ASC NULLS LAST LIMIT 10"#
    );
    assert_eq!(
        serialize(Serializer::mysql(), select).0,
        "SELECT * FROM `User` ORDER BY `User`.`name` IS NULL ASC, `User`.`name` ASC LIMIT 10"
    );
}

#[test]
fn distinct_on() {
    let mut select = users().item(Expr::column("User", "role"), None);
    select.distinct = Distinct::On(vec![Expr::column("User", "role")]);
    select
        .order_by
        .push(OrderByExpr::new(Expr::column("User", "role"), Direction::Asc));

    assert_eq!(
        serialize(Serializer::postgresql(), select).0,
        r#"SELECT DISTINCT ON ("User"."role") "User"."role" FROM "User" ORDER BY "User"."role" ASC"#
    );
}

#[test]
fn json_aggregation_per_flavor() {
    let inner = Select::from(TableRef::table("Post", Some("$t1".into()))).item(
        Expr::json_object(vec![("title".into(), Expr::column("$t1", "title"))]),
        Some("$j"),
    );
    let agg = Select::from(TableRef::derived(inner, "$t2"))
        .item(Expr::JsonAgg(Box::new(Expr::column("$t2", "$j"))), None);
    let select = users().item(Expr::subquery(agg), Some("posts"));

    assert_eq!(
        serialize(Serializer::sqlite(), select.clone()).0,
        r#"SELECT (SELECT json_group_array("$t2"."$j") FROM (SELECT json_object('title', "$t1"."title") AS "$j" FROM "Post" AS "$t1") AS "$t2") AS "posts" FROM "User""#
    );
    assert_eq!(
        serialize(Serializer::postgresql(), select.clone()).0,
        r#"SELECT (SELECT jsonb_agg("$t2"."$j") FROM (SELECT jsonb_build_object('title', "$t1"."title") AS "$j" FROM "Post" AS "$t1") AS "$t2") AS "posts" FROM "User""#
    );
    assert_eq!(
        serialize(Serializer::mysql(), select).0,
        "SELECT (SELECT JSON_ARRAYAGG(`$t2`.`$j`) FROM (SELECT JSON_OBJECT('title', `$t1`.`title`) AS `$j` FROM `Post` AS `$t1`) AS `$t2`) AS `posts` FROM `User`"
    );
}

#[test]
fn like_escape_per_flavor() {
    let mut select = users();
    select.and_filter(Expr::like(
        Expr::column("User", "name"),
        Expr::value("%a\\_b%"),
        true,
    ));

    assert_eq!(
        serialize(Serializer::postgresql(), select.clone()).0,
        r#"SELECT * FROM "User" WHERE "User"."name" ILIKE $1 ESCAPE '\'"#
    );
    assert_eq!(
        serialize(Serializer::mysql(), select).0,
        r"SELECT * FROM `User` WHERE `User`.`name` LIKE ? ESCAPE '\\'"
    );
}

#[test]
fn casts_and_json_text() {
    let select = users().item(Expr::cast(Expr::column("User", "meta"), CastType::Json), None);

    assert_eq!(
        serialize(Serializer::sqlite(), select.clone()).0,
        r#"SELECT json("User"."meta") FROM "User""#
    );
    assert_eq!(
        serialize(Serializer::postgresql(), select).0,
        r#"SELECT CAST("User"."meta" AS jsonb) FROM "User""#
    );
}

#[test]
fn empty_in_list_never_reaches_sql() {
    let mut select = users();
    select.and_filter(Expr::in_list(Expr::column("User", "id"), vec![]));

    assert_eq!(
        serialize(Serializer::sqlite(), select).0,
        r#"SELECT * FROM "User" WHERE FALSE"#
    );
}

#[test]
fn schema_qualified_alias() {
    let mut table = TableRef::table("users", Some("User".into()));
    if let TableRef::Table(name) = &mut table {
        name.schema = Some("auth".into());
    }
    let select = Select::from(table).item(Expr::column("User", "id"), None);

    assert_eq!(
        serialize(Serializer::postgresql(), select).0,
        r#"SELECT "User"."id" FROM "auth"."users" AS "User""#
    );
}
