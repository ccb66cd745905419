use super::{value, ArrayOp, Dialect, PathSegment, ValueType};

use quill_core::{
    driver::Capability,
    schema::{BuiltinType, Provider},
    stmt::{self, BinaryOp, CastType, Expr},
    Result, Value,
};

#[derive(Debug, Default)]
pub struct PostgreSql;

impl PostgreSql {
    /// Paths are bound as a `text[]` parameter for `#>` / `#>>`.
    fn path_param(path: &[PathSegment]) -> Expr {
        let segments = path
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) => stmt::Value::String(key.clone()),
                PathSegment::Index(index) => stmt::Value::String(index.to_string()),
            })
            .collect();
        Expr::cast(Expr::value(stmt::Value::List(segments)), CastType::TextArray)
    }
}

impl Dialect for PostgreSql {
    fn provider(&self) -> Provider {
        Provider::Postgresql
    }

    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    fn transform_input(&self, input: &Value, ty: &ValueType<'_>) -> Result<stmt::Value> {
        value::input(input, ty)
    }

    fn json_embed(&self, expr: Expr, ty: &ValueType<'_>) -> Expr {
        if ty.array || ty.is_json() {
            return expr;
        }

        match ty.as_builtin() {
            Some(BuiltinType::Bytes) => {
                Expr::func("encode", vec![expr, Expr::value("hex")])
            }
            // Keep full precision; JSON numbers would round through f64
            Some(BuiltinType::Decimal) => Expr::cast(expr, CastType::Text),
            _ => expr,
        }
    }

    fn empty_json_array(&self) -> Expr {
        Expr::func("jsonb_build_array", vec![])
    }

    fn json_get(&self, expr: Expr, path: &[PathSegment]) -> Expr {
        if path.is_empty() {
            return expr;
        }
        Expr::binary(expr, BinaryOp::JsonPath, Self::path_param(path))
    }

    fn json_get_text(&self, expr: Expr, path: &[PathSegment]) -> Expr {
        Expr::binary(expr, BinaryOp::JsonPathText, Self::path_param(path))
    }

    fn json_array_contains(
        &self,
        expr: Expr,
        path: &[PathSegment],
        values: &[serde_json::Value],
    ) -> Expr {
        let candidate = stmt::Value::Json(serde_json::Value::Array(values.to_vec()));
        Expr::binary(
            self.json_get(expr, path),
            BinaryOp::Contains,
            Expr::cast(Expr::value(candidate), CastType::Json),
        )
    }

    fn array_filter(&self, column: Expr, op: ArrayOp, values: stmt::Value) -> Result<Expr> {
        Ok(match op {
            ArrayOp::Has => Expr::binary(
                column,
                BinaryOp::Contains,
                Expr::value(stmt::Value::List(vec![values])),
            ),
            ArrayOp::HasEvery => Expr::binary(column, BinaryOp::Contains, Expr::value(values)),
            ArrayOp::HasSome => Expr::binary(column, BinaryOp::Overlaps, Expr::value(values)),
        })
    }

    fn array_is_empty(&self, column: Expr, empty: bool) -> Result<Expr> {
        let cardinality = Expr::func("cardinality", vec![column]);
        Ok(if empty {
            Expr::eq(cardinality, Expr::value(0))
        } else {
            Expr::gt(cardinality, Expr::value(0))
        })
    }

    fn array_push(&self, column: Expr, values: Vec<stmt::Value>) -> Result<Expr> {
        Ok(Expr::func(
            "array_cat",
            vec![column, Expr::value(stmt::Value::List(values))],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_stay_native() {
        let ty = ValueType {
            array: true,
            ..ValueType::builtin(BuiltinType::Int)
        };
        let input = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            PostgreSql.transform_input(&input, &ty).unwrap(),
            stmt::Value::List(vec![stmt::Value::I64(1), stmt::Value::I64(2)])
        );
    }

    #[test]
    fn has_wraps_the_element() {
        let column = Expr::column("Post", "tags");
        let expr = PostgreSql
            .array_filter(column.clone(), ArrayOp::Has, stmt::Value::from("rust"))
            .unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                column,
                BinaryOp::Contains,
                Expr::value(stmt::Value::List(vec!["rust".into()]))
            )
        );
    }
}
