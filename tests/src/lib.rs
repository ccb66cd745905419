//! Shared setup for the end-to-end tests: a blog schema, the SQLite tables
//! backing it, and a driver that records executed SQL.

mod logging_driver;
pub use logging_driver::{LoggingDriver, SqlLog};

use quill::{
    schema::{EnumDef, FieldDef, FieldDefault, ModelDef, Provider, RelationInfo},
    Client, Schema,
};
use quill_driver_sqlite::Sqlite;

use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to the test harness; `RUST_LOG=quill::sql=debug`
/// shows every statement.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds a client over a fresh in-memory database after running `ddl`.
pub async fn setup(schema: Schema, ddl: &[&str]) -> (Client, SqlLog) {
    setup_with(Client::builder().schema(schema), ddl).await
}

/// Like [`setup`], with a builder the caller has configured.
pub async fn setup_with(builder: &mut quill::Builder, ddl: &[&str]) -> (Client, SqlLog) {
    init_tracing();

    let driver = LoggingDriver::new(Sqlite::in_memory());
    let log = driver.log();
    let client = builder.build(driver).unwrap();

    for statement in ddl {
        client.execute_raw(statement, vec![]).await.unwrap();
    }
    log.clear();

    (client, log)
}

/// Users with an optional profile, posts and tags.
pub fn blog_schema() -> Schema {
    Schema::new(Provider::Sqlite)
        .model(
            ModelDef::new("User")
                .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
                .field(FieldDef::new("email", "String").unique())
                .field(FieldDef::new("name", "String").optional())
                .field(FieldDef::new("role", "Role").default(FieldDefault::Value("USER".into())))
                .field(FieldDef::new("createdAt", "DateTime").default(FieldDefault::Now))
                .field(FieldDef::new("posts", "Post").array().relation(RelationInfo::back()))
                .field(FieldDef::new("profile", "Profile").optional().relation(RelationInfo::back())),
        )
        .model(
            ModelDef::new("Profile")
                .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
                .field(FieldDef::new("bio", "String"))
                .field(FieldDef::new("user", "User").relation(RelationInfo::new(&["userId"], &["id"])))
                .field(FieldDef::new("userId", "Int").unique().foreign_key_for("user")),
        )
        .model(
            ModelDef::new("Post")
                .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
                .field(FieldDef::new("title", "String"))
                .field(FieldDef::new("published", "Boolean").default(FieldDefault::Value(false.into())))
                .field(FieldDef::new("views", "Int").default(FieldDefault::Value(0.into())))
                .field(FieldDef::new("author", "User").relation(RelationInfo::new(&["authorId"], &["id"])))
                .field(FieldDef::new("authorId", "Int").foreign_key_for("author"))
                .field(FieldDef::new("tags", "Tag").array().relation(RelationInfo::back())),
        )
        .model(
            ModelDef::new("Tag")
                .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
                .field(FieldDef::new("name", "String").unique())
                .field(FieldDef::new("posts", "Post").array().relation(RelationInfo::back())),
        )
        .enum_def(EnumDef::new("Role", &["USER", "ADMIN"]))
}

pub const BLOG_DDL: &[&str] = &[
    r#"CREATE TABLE "User" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "email" TEXT NOT NULL UNIQUE,
        "name" TEXT,
        "role" TEXT NOT NULL DEFAULT 'USER',
        "createdAt" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE "Profile" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "bio" TEXT NOT NULL,
        "userId" INTEGER NOT NULL UNIQUE REFERENCES "User" ("id") ON DELETE CASCADE
    )"#,
    r#"CREATE TABLE "Post" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "title" TEXT NOT NULL,
        "published" INTEGER NOT NULL DEFAULT 0,
        "views" INTEGER NOT NULL DEFAULT 0,
        "authorId" INTEGER NOT NULL REFERENCES "User" ("id") ON DELETE CASCADE
    )"#,
    r#"CREATE TABLE "Tag" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "name" TEXT NOT NULL UNIQUE
    )"#,
    r#"CREATE TABLE "_PostToTag" (
        "A" INTEGER NOT NULL REFERENCES "Post" ("id") ON DELETE CASCADE,
        "B" INTEGER NOT NULL REFERENCES "Tag" ("id") ON DELETE CASCADE,
        UNIQUE ("A", "B")
    )"#,
];

pub async fn blog() -> (Client, SqlLog) {
    setup(blog_schema(), BLOG_DDL).await
}
