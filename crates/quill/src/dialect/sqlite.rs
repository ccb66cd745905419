use super::{dollar_path, value, Dialect, PathSegment, ValueType};

use quill_core::{
    driver::Capability,
    schema::{BuiltinType, Provider},
    stmt::{self, BinaryOp, CastType, Expr, ExprFunc, Select, TableRef},
    Result, Value,
};

use chrono::SecondsFormat;

/// SQLite keeps booleans as integers, dates as ISO-8601 text and JSON
/// (including scalar lists) as text.
#[derive(Debug, Default)]
pub struct Sqlite;

const EACH_ALIAS: &str = "$je";

impl Dialect for Sqlite {
    fn provider(&self) -> Provider {
        Provider::Sqlite
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    fn transform_input(&self, input: &Value, ty: &ValueType<'_>) -> Result<stmt::Value> {
        Ok(match value::input(input, ty)? {
            stmt::Value::Bool(v) => stmt::Value::I64(v as i64),
            stmt::Value::DateTime(v) => {
                stmt::Value::String(v.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            list @ stmt::Value::List(_) => value::list_to_json(list),
            other => other,
        })
    }

    fn json_embed(&self, expr: Expr, ty: &ValueType<'_>) -> Expr {
        if ty.array || ty.is_json() {
            return Expr::cast(expr, CastType::Json);
        }

        match ty.as_builtin() {
            Some(BuiltinType::Bytes) => Expr::func("hex", vec![expr]),
            _ => expr,
        }
    }

    fn json_value(&self, expr: Expr) -> Expr {
        Expr::cast(expr, CastType::Json)
    }

    fn empty_json_array(&self) -> Expr {
        Expr::func("json_array", vec![])
    }

    fn json_get(&self, expr: Expr, path: &[PathSegment]) -> Expr {
        if path.is_empty() {
            return expr;
        }
        let path = dollar_path(path, Provider::Sqlite);
        Expr::binary(expr, BinaryOp::JsonGet, Expr::value(path))
    }

    fn json_get_text(&self, expr: Expr, path: &[PathSegment]) -> Expr {
        let path = dollar_path(path, Provider::Sqlite);
        Expr::binary(expr, BinaryOp::JsonGetText, Expr::value(path))
    }

    fn json_array_contains(
        &self,
        expr: Expr,
        path: &[PathSegment],
        values: &[serde_json::Value],
    ) -> Expr {
        let mut args = vec![expr];
        if !path.is_empty() {
            args.push(Expr::value(dollar_path(path, Provider::Sqlite)));
        }

        Expr::and(values.iter().map(|value| {
            let element = Expr::column(EACH_ALIAS, "value");
            let filter = match value {
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => Expr::eq(
                    element,
                    Expr::cast(Expr::value(stmt::Value::Json(value.clone())), CastType::Json),
                ),
                serde_json::Value::Null => Expr::is_null(element),
                serde_json::Value::Bool(v) => Expr::eq(element, Expr::value(*v as i64)),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(v) => Expr::eq(element, Expr::value(v)),
                    None => Expr::eq(element, Expr::value(n.as_f64().unwrap_or(f64::NAN))),
                },
                serde_json::Value::String(v) => Expr::eq(element, Expr::value(v.as_str())),
            };

            let mut select = Select::from(TableRef::Function {
                func: ExprFunc {
                    name: "json_each".to_string(),
                    args: args.clone(),
                    distinct: false,
                },
                alias: EACH_ALIAS.to_string(),
            })
            .item(Expr::value(1), None);
            select.and_filter(filter);
            Expr::exists(select)
        }))
    }

    fn array_push(&self, column: Expr, values: Vec<stmt::Value>) -> Result<Expr> {
        let mut args = vec![Expr::coalesce(vec![column, Expr::value("[]")])];
        for value in values {
            let value = match value {
                json @ stmt::Value::Json(_) => Expr::cast(Expr::value(json), CastType::Json),
                value => Expr::value(value),
            };
            args.push(Expr::value("$[#]"));
            args.push(value);
        }
        Ok(Expr::func("json_insert", args))
    }
}
