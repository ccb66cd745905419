use super::{dollar_path, value, Dialect, PathSegment, ValueType};

use quill_core::{
    driver::Capability,
    schema::{BuiltinType, Provider},
    stmt::{self, CastType, Expr},
    Result, Value,
};

/// MySQL has native JSON but no arrays; scalar lists live in JSON columns.
#[derive(Debug, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn provider(&self) -> Provider {
        Provider::Mysql
    }

    fn capability(&self) -> &'static Capability {
        &Capability::MYSQL
    }

    fn transform_input(&self, input: &Value, ty: &ValueType<'_>) -> Result<stmt::Value> {
        Ok(match value::input(input, ty)? {
            list @ stmt::Value::List(_) => value::list_to_json(list),
            other => other,
        })
    }

    fn json_embed(&self, expr: Expr, ty: &ValueType<'_>) -> Expr {
        if ty.array || ty.is_json() {
            return expr;
        }

        match ty.as_builtin() {
            Some(BuiltinType::Bytes) => Expr::func("HEX", vec![expr]),
            Some(BuiltinType::Decimal) => Expr::cast(expr, CastType::Text),
            _ => expr,
        }
    }

    fn empty_json_array(&self) -> Expr {
        Expr::func("JSON_ARRAY", vec![])
    }

    fn json_get(&self, expr: Expr, path: &[PathSegment]) -> Expr {
        if path.is_empty() {
            return expr;
        }
        let path = dollar_path(path, Provider::Mysql);
        Expr::func("JSON_EXTRACT", vec![expr, Expr::value(path)])
    }

    fn json_get_text(&self, expr: Expr, path: &[PathSegment]) -> Expr {
        let path = dollar_path(path, Provider::Mysql);
        Expr::func(
            "JSON_UNQUOTE",
            vec![Expr::func("JSON_EXTRACT", vec![expr, Expr::value(path)])],
        )
    }

    fn json_array_contains(
        &self,
        expr: Expr,
        path: &[PathSegment],
        values: &[serde_json::Value],
    ) -> Expr {
        let candidate = stmt::Value::Json(serde_json::Value::Array(values.to_vec()));
        Expr::func(
            "JSON_CONTAINS",
            vec![
                self.json_get(expr, path),
                Expr::cast(Expr::value(candidate), CastType::Json),
            ],
        )
    }

    fn array_push(&self, column: Expr, values: Vec<stmt::Value>) -> Result<Expr> {
        let mut args = vec![Expr::coalesce(vec![column, self.empty_json_array()])];
        for value in values {
            let value = match value {
                json @ stmt::Value::Json(_) => Expr::cast(Expr::value(json), CastType::Json),
                value => Expr::value(value),
            };
            args.push(Expr::value("$"));
            args.push(value);
        }
        Ok(Expr::func("JSON_ARRAY_APPEND", args))
    }
}
