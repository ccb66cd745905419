use super::{list_arg, QueryBuilder};

use quill_core::{
    bail, err,
    schema::{FieldDef, ModelDef},
    stmt::{Expr, OrderByExpr, Select, SelectItem, TableRef},
    Result, Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AggregateKind {
    Count,
    Avg,
    Sum,
    Min,
    Max,
}

/// A column of an aggregate or group-by result.
#[derive(Debug, Clone)]
pub(crate) enum OutputColumn<'a> {
    /// A `by` field of a group
    Group(&'a FieldDef),

    /// `field: None` is `_count._all`
    Aggregate {
        kind: AggregateKind,
        field: Option<&'a FieldDef>,
    },
}

/// Maps result columns, by alias, to what they hold.
#[derive(Debug, Clone, Default)]
pub(crate) struct AggregatePlan<'a> {
    pub(crate) columns: Vec<(String, OutputColumn<'a>)>,

    /// Rows come back in reverse (negative `take`)
    pub(crate) reverse: bool,
}

impl AggregateKind {
    const ALL: [AggregateKind; 5] = [
        AggregateKind::Count,
        AggregateKind::Avg,
        AggregateKind::Sum,
        AggregateKind::Min,
        AggregateKind::Max,
    ];

    pub(crate) fn key(self) -> &'static str {
        match self {
            AggregateKind::Count => "_count",
            AggregateKind::Avg => "_avg",
            AggregateKind::Sum => "_sum",
            AggregateKind::Min => "_min",
            AggregateKind::Max => "_max",
        }
    }

    fn func(self) -> &'static str {
        match self {
            AggregateKind::Count => "COUNT",
            AggregateKind::Avg => "AVG",
            AggregateKind::Sum => "SUM",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
        }
    }
}

fn column_alias(kind: AggregateKind, field: Option<&FieldDef>) -> String {
    format!("{}.{}", kind.key(), field.map_or("_all", |field| &field.name))
}

impl<'a> QueryBuilder<'a> {
    /// Compiles `aggregate`: the aggregates run over a subquery holding the
    /// filtered and paginated rows.
    pub(crate) fn aggregate(&self, model: &'a ModelDef, args: &Value) -> Result<(Select, AggregatePlan<'a>)> {
        let requested = self.requested_aggregates(model, args)?;
        self.aggregate_over(model, args, requested)
    }

    /// Compiles `count`. Without `select` the count of rows is returned as
    /// `_count._all`; with it, one non-null count per selected field.
    pub(crate) fn count(&self, model: &'a ModelDef, args: &Value) -> Result<(Select, AggregatePlan<'a>)> {
        let requested = match args.get("select").and_then(Value::as_object) {
            None => vec![(AggregateKind::Count, None)],
            Some(fields) => fields
                .iter()
                .filter(|(_, flag)| flag.is_truthy())
                .map(|(name, _)| match name.as_str() {
                    "_all" => Ok((AggregateKind::Count, None)),
                    name => Ok((AggregateKind::Count, Some(model.get_field(name)?))),
                })
                .collect::<Result<Vec<_>>>()?,
        };
        self.aggregate_over(model, args, requested)
    }

    fn aggregate_over(
        &self,
        model: &'a ModelDef,
        args: &Value,
        requested: Vec<(AggregateKind, Option<&'a FieldDef>)>,
    ) -> Result<(Select, AggregatePlan<'a>)> {
        let (mut inner, target) = self.from_model(model, model.name.clone(), &[]);
        if let Some(filter) = args.get("where") {
            inner.and_filter(self.filter(&target, filter)?);
        }
        self.paginate(&mut inner, &target, args, false)?;

        let mut projected: Vec<&'a FieldDef> = vec![];
        for field in requested.iter().filter_map(|(_, field)| *field) {
            if !projected.iter().any(|p| p.name == field.name) {
                projected.push(field);
            }
        }

        inner.items = if projected.is_empty() {
            vec![SelectItem::expr(Expr::value(1))]
        } else {
            projected
                .iter()
                .map(|field| Ok(SelectItem::aliased(self.field_expr(&target, field)?, &field.name)))
                .collect::<Result<Vec<_>>>()?
        };

        let sub = self.next_alias();
        let mut outer = Select::from(TableRef::derived(inner, sub.clone()));
        let mut plan = AggregatePlan::default();

        for (kind, field) in requested {
            let expr = match field {
                None => Expr::count_star(),
                Some(field) => Expr::func(kind.func(), vec![Expr::column(&sub, &field.name)]),
            };
            let alias = column_alias(kind, field);
            outer.items.push(SelectItem::aliased(expr, &alias));
            plan.columns.push((alias, OutputColumn::Aggregate { kind, field }));
        }

        Ok((outer, plan))
    }

    /// Compiles `groupBy`.
    pub(crate) fn group_by(&self, model: &'a ModelDef, args: &Value) -> Result<(Select, AggregatePlan<'a>)> {
        let (mut select, target) = self.from_model(model, model.name.clone(), &[]);
        if let Some(filter) = args.get("where") {
            select.and_filter(self.filter(&target, filter)?);
        }

        let by = args.get("by").ok_or_else(|| err!("`groupBy` requires `by`"))?;
        let mut plan = AggregatePlan::default();

        for name in list_arg(by) {
            let name = name.as_str().ok_or_else(|| err!("`by` takes field names"))?;
            let field = target.field(name)?;
            let expr = self.field_expr(&target, field)?;

            select.group_by.push(expr.clone());
            select.items.push(SelectItem::aliased(expr, &field.name));
            plan.columns.push((field.name.clone(), OutputColumn::Group(field)));
        }

        for (kind, field) in self.requested_aggregates(model, args)? {
            let expr = match field {
                None => Expr::count_star(),
                Some(field) => Expr::func(kind.func(), vec![self.field_expr(&target, field)?]),
            };
            let alias = column_alias(kind, field);
            select.items.push(SelectItem::aliased(expr, &alias));
            plan.columns.push((alias, OutputColumn::Aggregate { kind, field }));
        }

        if let Some(having) = args.get("having") {
            let having = self.filter(&target, having)?;
            select.having = (!having.is_true()).then_some(having);
        }

        let mut keys = match args.get("orderBy") {
            Some(order) if !order.is_null() => self.order_by(&mut select, &target, order)?,
            _ => vec![],
        };

        let take = args.get("take").and_then(Value::as_i64);
        plan.reverse = take.is_some_and(|take| take < 0);
        if plan.reverse {
            keys = keys.into_iter().map(OrderByExpr::reverse).collect();
        }
        select.order_by = keys;

        if let Some(skip) = args.get("skip").and_then(Value::as_i64).filter(|skip| *skip > 0) {
            select.offset = Some(skip as u64);
        }
        if let Some(take) = take {
            select.limit = Some(take.unsigned_abs());
        }

        Ok((select, plan))
    }

    /// The `_count`, `_avg`, `_sum`, `_min` and `_max` selections of `args`.
    fn requested_aggregates(
        &self,
        model: &'a ModelDef,
        args: &Value,
    ) -> Result<Vec<(AggregateKind, Option<&'a FieldDef>)>> {
        let mut requested = vec![];

        for kind in AggregateKind::ALL {
            match args.get(kind.key()) {
                None | Some(Value::Null) | Some(Value::Bool(false)) => {}
                Some(Value::Bool(true)) if kind == AggregateKind::Count => {
                    requested.push((kind, None));
                }
                Some(Value::Object(fields)) => {
                    for (name, flag) in fields {
                        if !flag.is_truthy() {
                            continue;
                        }
                        if name == "_all" && kind == AggregateKind::Count {
                            requested.push((kind, None));
                        } else {
                            requested.push((kind, Some(model.get_field(name)?)));
                        }
                    }
                }
                Some(other) => bail!("invalid `{}` selection of type {}", kind.key(), other.type_name()),
            }
        }

        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::Sqlite,
        query::tests::{blog, sql},
        Options,
    };

    use serde_json::json;

    #[test]
    fn aggregates_run_over_the_paginated_rows() {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let post = schema.get_model("Post").unwrap();

        let args = Value::from(json!({ "_count": true, "_sum": { "views": true }, "take": 10 }));
        let (select, plan) = builder.aggregate(post, &args).unwrap();
        assert_eq!(
            sql(select),
            concat!(
                r#"SELECT COUNT(*) AS "_count._all", SUM("$t1"."views") AS "_sum.views" "#,
                r#"FROM (SELECT "Post"."views" AS "views" FROM "Post" LIMIT 10) AS "$t1""#
            )
        );
        let aliases: Vec<_> = plan.columns.iter().map(|(alias, _)| alias.as_str()).collect();
        assert_eq!(aliases, ["_count._all", "_sum.views"]);
    }

    #[test]
    fn count_without_select_counts_rows() {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let post = schema.get_model("Post").unwrap();

        let (select, _) = builder.count(post, &Value::from(json!({ "where": { "views": 0 } }))).unwrap();
        assert_eq!(
            sql(select),
            r#"SELECT COUNT(*) AS "_count._all" FROM (SELECT ?1 FROM "Post" WHERE "Post"."views" = ?2) AS "$t1""#
        );
    }

    #[test]
    fn group_by_with_having_and_order() {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let post = schema.get_model("Post").unwrap();

        let args = Value::from(json!({
            "by": ["authorId"],
            "_count": { "_all": true },
            "having": { "views": { "_avg": { "gt": 5 } } },
            "orderBy": { "authorId": "asc" },
        }));
        let (select, plan) = builder.group_by(post, &args).unwrap();
        assert_eq!(
            sql(select),
            concat!(
                r#"SELECT "Post"."authorId" AS "authorId", COUNT(*) AS "_count._all" FROM "Post" "#,
                r#"GROUP BY "Post"."authorId" HAVING AVG("Post"."views") > ?1 ORDER BY "Post"."authorId" ASC"#
            )
        );
        assert!(!plan.reverse);
    }
}
