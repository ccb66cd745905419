use super::{list_arg, ModelRef, QueryBuilder};
use crate::dialect::ScalarType;

use quill_core::{
    bail,
    schema::{BuiltinType, FieldDef, ModelDef},
    stmt::{Assignment, BinaryOp, Delete, Expr, Insert, OnConflict, SelectItem, TableName, Update},
    Result, Value,
};

use indexmap::IndexMap;

/// Encoded column values of one row to insert, keyed by field name.
pub(crate) type Row = IndexMap<String, Expr>;

fn table(model: &ModelDef) -> TableName {
    TableName {
        name: model.name.clone(),
        schema: None,
        alias: None,
    }
}

impl<'a> QueryBuilder<'a> {
    /// `INSERT INTO model (...) VALUES ...`
    ///
    /// The column list is the union of the rows' columns in first-seen
    /// order; rows missing a column get `DEFAULT`.
    pub(crate) fn insert(
        &self,
        model: &'a ModelDef,
        rows: Vec<Row>,
        skip_duplicates: bool,
        returning: &[&'a FieldDef],
    ) -> Insert {
        let mut columns: Vec<String> = vec![];
        for row in &rows {
            for column in row.keys() {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let rows = rows
            .into_iter()
            .map(|mut row| {
                columns
                    .iter()
                    .map(|column| row.shift_remove(column).unwrap_or(Expr::Default))
                    .collect()
            })
            .collect();

        Insert {
            table: table(model),
            columns,
            rows,
            on_conflict: skip_duplicates.then_some(OnConflict::Ignore),
            returning: returning
                .iter()
                .map(|field| SelectItem::expr(Expr::unqualified(&field.name)))
                .collect(),
        }
    }

    /// `UPDATE model SET ... WHERE filter`. Filters and values reference the
    /// table by its model name.
    pub(crate) fn update(&self, model: &'a ModelDef, assignments: Vec<Assignment>, filter: Expr) -> Update {
        Update {
            table: table(model),
            assignments,
            filter: Some(filter),
            limit: None,
            returning: vec![],
        }
    }

    pub(crate) fn delete(&self, model: &'a ModelDef, filter: Expr) -> Delete {
        Delete {
            table: table(model),
            filter: Some(filter),
            limit: None,
            returning: vec![],
        }
    }

    /// The new value of `field` for an update payload entry: a literal, or
    /// an operator object (`set`, `increment`, `decrement`, `multiply`,
    /// `divide`, `push`).
    pub(crate) fn update_value(&self, target: &ModelRef<'a>, field: &'a FieldDef, payload: &Value) -> Result<Expr> {
        let ty = self.value_type(field)?;
        let takes_objects = !ty.array
            && matches!(
                ty.scalar,
                ScalarType::Builtin(BuiltinType::Json) | ScalarType::TypeDef(_)
            );

        let ops = match payload {
            Value::Object(ops) if !takes_objects => ops,
            value => return self.param(field, value),
        };

        let [(op, value)] = ops.iter().collect::<Vec<_>>()[..] else {
            bail!("update of `{}` takes exactly one operator", field.name);
        };

        let column = target.column(field);
        let arithmetic = |op: BinaryOp| -> Result<Expr> {
            if value.is_null() {
                bail!("`{}` operand of `{}` is null", field.name, op_name(op));
            }
            Ok(Expr::binary(column.clone(), op, self.param(field, value)?))
        };

        match op.as_str() {
            "set" => self.param(field, value),
            "increment" => arithmetic(BinaryOp::Add),
            "decrement" => arithmetic(BinaryOp::Sub),
            "multiply" => arithmetic(BinaryOp::Mul),
            "divide" => arithmetic(BinaryOp::Div),
            "push" if ty.array => {
                let element = ty.element();
                let values = list_arg(value)
                    .into_iter()
                    .map(|value| self.dialect.transform_input(value, &element))
                    .collect::<Result<Vec<_>>>()?;
                self.dialect.array_push(column.clone(), values)
            }
            op => bail!("unknown update operator `{op}` on `{}`", field.name),
        }
    }
}

fn op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "increment",
        BinaryOp::Sub => "decrement",
        BinaryOp::Mul => "multiply",
        _ => "divide",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::{MySql, Sqlite},
        query::tests::{blog, sql, sql_for},
        Options,
    };

    use serde_json::json;

    #[test]
    fn rows_with_missing_columns_use_default() {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let post = schema.get_model("Post").unwrap();

        let rows = vec![
            Row::from([("title".to_string(), Expr::value("a"))]),
            Row::from([
                ("title".to_string(), Expr::value("b")),
                ("views".to_string(), Expr::value(3)),
            ]),
        ];
        let id = post.get_field("id").unwrap();
        let insert = builder.insert(post, rows, true, &[id]);
        assert_eq!(
            sql(insert),
            r#"INSERT INTO "Post" ("title", "views") VALUES (?1, DEFAULT), (?2, ?3) ON CONFLICT DO NOTHING RETURNING "id""#
        );
    }

    #[test]
    fn increments_reference_the_current_value() {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &MySql, &options);
        let post = schema.get_model("Post").unwrap();
        let target = ModelRef::new(post, "Post");
        let views = post.get_field("views").unwrap();

        let value = builder
            .update_value(&target, views, &Value::from(json!({ "increment": 2 })))
            .unwrap();
        let filter = Expr::eq(Expr::column("Post", "id"), Expr::value(1));
        let update = builder.update(
            post,
            vec![Assignment {
                column: "views".into(),
                value,
            }],
            filter,
        );
        assert_eq!(
            sql_for(&MySql, update),
            r#"UPDATE `Post` SET `views` = (`Post`.`views` + ?) WHERE `Post`.`id` = ?"#
        );
    }

    #[test]
    fn json_fields_take_objects_as_values() {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let post = schema.get_model("Post").unwrap();
        let target = ModelRef::new(post, "Post");
        let meta = post.get_field("meta").unwrap();

        let value = builder
            .update_value(&target, meta, &Value::from(json!({ "set": 1 })))
            .unwrap();
        assert_eq!(value, Expr::Value(quill_core::stmt::Value::Json(json!({ "set": 1 }))));
    }
}
