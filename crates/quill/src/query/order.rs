use super::{list_arg, ModelRef, QueryBuilder};

use quill_core::{
    bail, err,
    schema::{FieldDef, Provider},
    stmt::{BinaryOp, Direction, Distinct, Expr, NullsOrder, OrderByExpr, Select, SelectItem},
    Error, Result, Value,
};

impl<'a> QueryBuilder<'a> {
    /// Applies `orderBy`, `cursor`, `distinct`, `skip` and `take` to
    /// `select`.
    ///
    /// Returns `true` when `take` is negative: the ordering was flipped to
    /// fetch from the end and the caller must reverse the rows it gets back.
    pub(crate) fn paginate(
        &self,
        select: &mut Select,
        target: &ModelRef<'a>,
        args: &Value,
        to_many: bool,
    ) -> Result<bool> {
        let take = args.get("take").and_then(Value::as_i64);
        let reverse = take.is_some_and(|take| take < 0);
        let cursor = args.get("cursor").filter(|cursor| !cursor.is_null());

        let default_to_id = to_many || reverse || cursor.is_some();
        let mut keys = self.order_keys(select, target, args, default_to_id)?;

        if let Some(distinct) = args.get("distinct").filter(|d| !d.is_null()) {
            self.distinct(select, target, distinct, &mut keys)?;
        }

        if let Some(cursor) = cursor {
            let filter = self.cursor_filter(target, args, cursor, &keys, default_to_id, reverse)?;
            select.and_filter(filter);
        }

        select.order_by = if reverse {
            keys.into_iter().map(OrderByExpr::reverse).collect()
        } else {
            keys
        };

        if let Some(skip) = args.get("skip").and_then(Value::as_i64) {
            if skip > 0 {
                select.offset = Some(skip as u64);
            }
        }
        if let Some(take) = take {
            select.limit = Some(take.unsigned_abs());
        }

        Ok(reverse)
    }

    /// The ordering keys requested by `args`, defaulting to the id fields
    /// and followed by id tie-breakers when a cursor needs a total order.
    fn order_keys(
        &self,
        select: &mut Select,
        target: &ModelRef<'a>,
        args: &Value,
        default_to_id: bool,
    ) -> Result<Vec<OrderByExpr>> {
        let mut keys = match args.get("orderBy") {
            Some(order) if !order.is_null() => self.order_by(select, target, order)?,
            _ => vec![],
        };

        if keys.is_empty() && default_to_id {
            keys = self.id_order(target)?;
        }

        if args.get("cursor").is_some_and(|cursor| !cursor.is_null()) {
            for field in target.id_fields()? {
                let column = target.column(field);
                if !keys.iter().any(|key| key.expr == column) {
                    keys.push(OrderByExpr::new(column, Direction::Asc));
                }
            }
        }

        Ok(keys)
    }

    pub(crate) fn id_order(&self, target: &ModelRef<'a>) -> Result<Vec<OrderByExpr>> {
        Ok(target
            .id_fields()?
            .into_iter()
            .map(|field| OrderByExpr::new(target.column(field), Direction::Asc))
            .collect())
    }

    /// Compiles an `orderBy` argument: one object or a list of them, each
    /// key a field, a relation or an aggregate.
    pub(crate) fn order_by(
        &self,
        select: &mut Select,
        target: &ModelRef<'a>,
        order: &Value,
    ) -> Result<Vec<OrderByExpr>> {
        let mut keys = vec![];
        for entry in list_arg(order) {
            let Some(entry) = entry.as_object() else {
                bail!("`orderBy` entries must be objects");
            };
            for (key, value) in entry {
                self.order_entry(select, target, key, value, &mut keys)?;
            }
        }
        Ok(keys)
    }

    fn order_entry(
        &self,
        select: &mut Select,
        target: &ModelRef<'a>,
        key: &str,
        value: &Value,
        keys: &mut Vec<OrderByExpr>,
    ) -> Result<()> {
        if let Some(func) = aggregate_func(key) {
            let Some(fields) = value.as_object() else {
                bail!("`orderBy.{key}` must be an object");
            };
            for (name, spec) in fields {
                let expr = if key == "_count" && name == "_all" {
                    Expr::count_star()
                } else {
                    Expr::func(func, vec![self.field_expr(target, target.field(name)?)?])
                };
                keys.push(order_expr(expr, spec)?);
            }
            return Ok(());
        }

        let field = target.field(key)?;
        if !field.is_relation() {
            keys.push(order_expr(self.field_expr(target, field)?, value)?);
            return Ok(());
        }

        if field.array {
            let spec = value
                .get("_count")
                .ok_or_else(|| err!("list relation `{key}` can only be ordered by `_count`"))?;
            keys.push(order_expr(self.relation_count(target, field, None, false)?, spec)?);
            return Ok(());
        }

        let related = self.join_relation(select, target, field)?;
        let Some(entries) = value.as_object() else {
            bail!("`orderBy.{key}` must be an object");
        };
        for (key, value) in entries {
            self.order_entry(select, &related, key, value, keys)?;
        }
        Ok(())
    }

    /// `distinct` over the listed fields. Only Postgres can express it in
    /// SQL (`DISTINCT ON`), which also requires the ordering to lead with
    /// those fields.
    fn distinct(
        &self,
        select: &mut Select,
        target: &ModelRef<'a>,
        distinct: &Value,
        keys: &mut Vec<OrderByExpr>,
    ) -> Result<()> {
        if self.dialect.provider() != Provider::Postgresql {
            return Err(Error::not_supported("distinct", self.dialect.provider().name()));
        }

        let fields = list_arg(distinct)
            .into_iter()
            .map(|name| {
                let name = name.as_str().ok_or_else(|| err!("`distinct` takes field names"))?;
                target.field(name)
            })
            .collect::<Result<Vec<&FieldDef>>>()?;

        let columns: Vec<Expr> = fields.iter().map(|field| target.column(field)).collect();
        let leading: Vec<OrderByExpr> = columns
            .iter()
            .filter(|column| !keys.iter().any(|key| key.expr == **column))
            .map(|column| OrderByExpr::new(column.clone(), Direction::Asc))
            .collect();
        keys.splice(0..0, leading);

        select.distinct = Distinct::On(columns);
        Ok(())
    }

    /// Keyset condition selecting the rows at or after the cursor row.
    ///
    /// The cursor row's ordering values are read with correlated subqueries
    /// against a second reference to the model, so the condition also holds
    /// for keys over joined relations and relation counts.
    fn cursor_filter(
        &self,
        target: &ModelRef<'a>,
        args: &Value,
        cursor: &Value,
        keys: &[OrderByExpr],
        default_to_id: bool,
        reverse: bool,
    ) -> Result<Expr> {
        let (mut cursor_select, cursor_ref) =
            self.from_model(target.model, self.next_alias(), &[]);
        let cursor_keys = self.order_keys(&mut cursor_select, &cursor_ref, args, default_to_id)?;
        cursor_select.and_filter(self.filter(&cursor_ref, cursor)?);
        cursor_select.limit = Some(1);

        // Distinct fields are prepended to the main keys only
        let offset = keys.len() - cursor_keys.len().min(keys.len());
        let keys = &keys[offset..];

        let values: Vec<Expr> = cursor_keys
            .iter()
            .map(|key| {
                let mut select = cursor_select.clone();
                select.items = vec![SelectItem::expr(key.expr.clone())];
                Expr::subquery(select)
            })
            .collect();

        let mut clauses = vec![];
        for (i, key) in keys.iter().enumerate() {
            let mut clause: Vec<Expr> = keys[..i]
                .iter()
                .zip(&values)
                .map(|(prior, value)| ties(prior.expr.clone(), value.clone()))
                .collect();

            let direction = if reverse { key.direction.reverse() } else { key.direction };
            let last = i + 1 == keys.len();
            let op = match (direction, last) {
                (Direction::Asc, false) => BinaryOp::Gt,
                (Direction::Asc, true) => BinaryOp::Ge,
                (Direction::Desc, false) => BinaryOp::Lt,
                (Direction::Desc, true) => BinaryOp::Le,
            };
            clause.push(Expr::binary(key.expr.clone(), op, values[i].clone()));
            clauses.push(Expr::and(clause));
        }

        Ok(Expr::or(clauses))
    }
}

/// Null-safe equality for the tie prefix of a keyset comparison. Range
/// comparisons against a NULL cursor key are still unknown, so rows past a
/// NULL key are only reached through the keys that follow it.
fn ties(key: Expr, cursor: Expr) -> Expr {
    Expr::or([
        Expr::eq(key.clone(), cursor.clone()),
        Expr::and([Expr::is_null(key), Expr::is_null(cursor)]),
    ])
}

pub(crate) fn aggregate_func(key: &str) -> Option<&'static str> {
    Some(match key {
        "_count" => "COUNT",
        "_avg" => "AVG",
        "_sum" => "SUM",
        "_min" => "MIN",
        "_max" => "MAX",
        _ => return None,
    })
}

/// `"asc"`, `"desc"` or `{ sort, nulls }`.
fn order_expr(expr: Expr, spec: &Value) -> Result<OrderByExpr> {
    match spec {
        Value::String(direction) => Ok(OrderByExpr::new(expr, direction_from(direction)?)),
        Value::Object(entries) => {
            let direction = entries
                .get("sort")
                .and_then(Value::as_str)
                .ok_or_else(|| err!("ordering object requires `sort`"))?;
            let nulls = match entries.get("nulls").and_then(Value::as_str) {
                None => None,
                Some("first") => Some(NullsOrder::First),
                Some("last") => Some(NullsOrder::Last),
                Some(other) => bail!("invalid `nulls` ordering `{other}`"),
            };
            Ok(OrderByExpr {
                expr,
                direction: direction_from(direction)?,
                nulls,
            })
        }
        other => bail!("invalid sort order of type {}", other.type_name()),
    }
}

fn direction_from(direction: &str) -> Result<Direction> {
    match direction {
        "asc" => Ok(Direction::Asc),
        "desc" => Ok(Direction::Desc),
        other => bail!("invalid sort direction `{other}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::{PostgreSql, Sqlite},
        query::tests::{blog, sql, sql_for},
        Options,
    };

    use quill_core::stmt::TableRef;
    use serde_json::json;

    fn paginate(dialect: &dyn crate::Dialect, model: &str, args: serde_json::Value) -> (String, bool) {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, dialect, &options);
        let model = schema.get_model(model).unwrap();

        let (mut select, target) = builder.from_model(model, model.name.clone(), &[]);
        select.items = vec![SelectItem::expr(Expr::column(&model.name, "id"))];
        let reverse = builder
            .paginate(&mut select, &target, &Value::from(args), false)
            .unwrap();
        (sql_for(dialect, select), reverse)
    }

    #[test]
    fn negative_take_flips_the_order() {
        let (sql, reverse) = paginate(&Sqlite, "Post", json!({ "orderBy": { "views": "desc" }, "take": -2 }));
        assert_eq!(sql, r#"SELECT "Post"."id" FROM "Post" ORDER BY "Post"."views" ASC LIMIT 2"#);
        assert!(reverse);
    }

    #[test]
    fn negative_take_without_order_uses_the_id() {
        let (sql, _) = paginate(&Sqlite, "Post", json!({ "take": -1, "skip": 1 }));
        assert_eq!(
            sql,
            r#"SELECT "Post"."id" FROM "Post" ORDER BY "Post"."id" DESC LIMIT 1 OFFSET 1"#
        );
    }

    #[test]
    fn nulls_ordering() {
        let (sql, _) = paginate(
            &Sqlite,
            "User",
            json!({ "orderBy": [{ "name": { "sort": "asc", "nulls": "last" } }, { "id": "desc" }] }),
        );
        assert_eq!(
            sql,
            r#"SELECT "User"."id" FROM "User" ORDER BY "User"."name" ASC NULLS LAST, "User"."id" DESC"#
        );
    }

    #[test]
    fn ordering_by_a_to_one_relation_joins_it() {
        let (sql, _) = paginate(&Sqlite, "Post", json!({ "orderBy": { "author": { "email": "asc" } } }));
        assert_eq!(
            sql,
            concat!(
                r#"SELECT "Post"."id" FROM "Post" LEFT JOIN "User" AS "$t1" "#,
                r#"ON "$t1"."id" = "Post"."authorId" ORDER BY "$t1"."email" ASC"#
            )
        );
    }

    #[test]
    fn cursor_compares_against_the_cursor_row() {
        let (sql, _) = paginate(&Sqlite, "Post", json!({ "cursor": { "id": 3 } }));
        assert_eq!(
            sql,
            concat!(
                r#"SELECT "Post"."id" FROM "Post" WHERE "Post"."id" >= "#,
                r#"(SELECT "$t1"."id" FROM "Post" AS "$t1" WHERE "$t1"."id" = ?1 LIMIT 1) "#,
                r#"ORDER BY "Post"."id" ASC"#
            )
        );
    }

    #[test]
    fn cursor_ties_match_null_keys() {
        let (sql, _) = paginate(&Sqlite, "User", json!({ "cursor": { "id": 3 }, "orderBy": { "name": "asc" } }));
        let cursor_name =
            |n: usize| format!(r#"(SELECT "$t1"."name" FROM "User" AS "$t1" WHERE "$t1"."id" = ?{n} LIMIT 1)"#);
        let tie = format!(
            r#"(("User"."name" = {} OR ("User"."name" IS NULL AND {} IS NULL)) AND "User"."id" >= "#,
            cursor_name(2),
            cursor_name(3),
        );
        assert!(sql.contains(&tie), "{sql}");
    }

    #[test]
    fn distinct_is_postgres_only() {
        let (sql, _) = paginate(&PostgreSql, "Post", json!({ "distinct": ["title"] }));
        assert_eq!(
            sql,
            r#"SELECT DISTINCT ON ("Post"."title") "Post"."id" FROM "Post" ORDER BY "Post"."title" ASC"#
        );

        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let post = schema.get_model("Post").unwrap();
        let (mut select, target) = builder.from_model(post, "Post", &[]);
        let err = builder
            .paginate(&mut select, &target, &Value::from(json!({ "distinct": "title" })), false)
            .unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn aggregate_keys() {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let post = schema.get_model("Post").unwrap();
        let mut select = Select::from(TableRef::table("Post", None));
        let target = ModelRef::new(post, "Post");

        let keys = builder
            .order_by(&mut select, &target, &Value::from(json!({ "_count": { "_all": "desc" }, "_sum": { "views": "asc" } })))
            .unwrap();
        select.order_by = keys;
        assert_eq!(
            sql(select),
            r#"SELECT * FROM "Post" ORDER BY COUNT(*) DESC, SUM("Post"."views") ASC"#
        );
    }
}
