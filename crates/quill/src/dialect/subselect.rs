//! Embeds related rows into a parent row as JSON.
//!
//! Each relation selection becomes a correlated scalar subquery. The inner
//! query selects one JSON object per related row under [`OBJECT`]; to-many
//! relations then aggregate those objects into an array.

use super::Dialect;

use quill_core::stmt::{Expr, Select, TableRef};

/// Column name of the per-row JSON object in the inner query.
pub(crate) const OBJECT: &str = "$j";

/// `(SELECT COALESCE(agg(alias.$j), []) FROM (inner) AS alias)`
///
/// Ordering and pagination stay on `inner` so the aggregate sees rows in
/// the requested order.
pub(crate) fn to_many(dialect: &dyn Dialect, inner: Select, alias: &str) -> Expr {
    let object = dialect.json_value(Expr::column(alias, OBJECT));
    let aggregate = Expr::coalesce(vec![
        Expr::JsonAgg(Box::new(object)),
        dialect.empty_json_array(),
    ]);

    Expr::subquery(Select::from(TableRef::derived(inner, alias)).item(aggregate, None))
}

/// `(SELECT $j FROM .. LIMIT 1)`: `NULL` when no row is related.
pub(crate) fn to_one(mut inner: Select) -> Expr {
    inner.limit = Some(1);
    Expr::subquery(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Sqlite;

    use quill_core::stmt::{Statement, Value};
    use quill_sql::Serializer;

    #[test]
    fn to_many_aggregates_the_inner_rows() {
        let inner = Select::from(TableRef::table("Post", Some("$t1".into()))).item(
            Expr::json_object(vec![("id".into(), Expr::column("$t1", "id"))]),
            Some(OBJECT),
        );

        let expr = to_many(&Sqlite, inner, "$t2");
        let outer = Select::from(TableRef::table("User", None)).item(expr, Some("posts"));

        let mut params: Vec<Value> = vec![];
        let sql = Serializer::sqlite().serialize(&Statement::Query(outer), &mut params);
        assert_eq!(
            sql,
            concat!(
                r#"SELECT (SELECT COALESCE(json_group_array(json("$t2"."$j")), json_array()) "#,
                r#"FROM (SELECT json_object('id', "$t1"."id") AS "$j" FROM "Post" AS "$t1") AS "$t2") "#,
                r#"AS "posts" FROM "User""#
            )
        );
        assert!(params.is_empty());
    }
}
